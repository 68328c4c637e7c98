use actix_web::{delete, get, post, put, web, Responder};
use chrono::Local;
use sea_orm::{ActiveValue::{Set, Unchanged}, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};

use crate::{
    auth::Staff,
    entity::{department, employee, prelude::*, user},
    error::ApiError,
    pages::{created_json, ok_json},
};

pub(super) fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .service(list_departments)
        .service(department_stats)
        .service(get_department)
        .service(create_department)
        .service(update_department)
        .service(delete_department);
}

#[derive(Debug, Serialize, Deserialize)]
struct ListFilter {
    is_active: Option<bool>,
}

#[get("")]
async fn list_departments(db: web::Data<DatabaseConnection>, _user: user::Model, filter: web::Query<ListFilter>) -> Result<impl Responder, ApiError> {
    let mut query = Department::find().order_by_asc(department::Column::Name);

    if let Some(is_active) = filter.is_active {
        query = query.filter(department::Column::IsActive.eq(is_active));
    }

    let departments = query.all(db.get_ref()).await?;

    Ok(ok_json("departments retrieved successfully", departments))
}

#[derive(Debug, Serialize)]
struct DepartmentCount {
    id: i32,
    name: String,
    employee_count: usize,
}

#[get("/stats")]
async fn department_stats(db: web::Data<DatabaseConnection>, _staff: Staff) -> Result<impl Responder, ApiError> {
    let departments = Department::find()
        .order_by_asc(department::Column::Name)
        .all(db.get_ref()).await?;

    let active_employees = Employee::find()
        .filter(employee::Column::IsActive.eq(true))
        .all(db.get_ref()).await?;

    let stats: Vec<_> = departments.into_iter()
        .map(|department| DepartmentCount {
            employee_count: active_employees.iter()
                .filter(|employee| employee.department_id == department.id)
                .count(),
            id: department.id,
            name: department.name,
        })
        .collect();

    Ok(ok_json("department statistics retrieved successfully", stats))
}

#[get("/{id}")]
async fn get_department(db: web::Data<DatabaseConnection>, _user: user::Model, path: web::Path<i32>) -> Result<impl Responder, ApiError> {
    let department = Department::find_by_id(path.into_inner())
        .one(db.get_ref()).await?
        .ok_or(ApiError::NotFound("department"))?;

    Ok(ok_json("department retrieved successfully", department))
}

#[derive(Debug, Serialize, Deserialize)]
struct CreateDepartment {
    name: String,
    description: Option<String>,
}

#[post("")]
async fn create_department(db: web::Data<DatabaseConnection>, _staff: Staff, payload: web::Json<CreateDepartment>) -> Result<impl Responder, ApiError> {
    if payload.name.trim().len() < 2 {
        return Err(ApiError::Validation("department name must be at least 2 characters".to_string()));
    }

    let taken = Department::find()
        .filter(department::Column::Name.eq(payload.name.trim()))
        .one(db.get_ref()).await?;

    if taken.is_some() {
        return Err(ApiError::Conflict("department name is already taken".to_string()));
    }

    let model = department::ActiveModel {
        created_at: Set(Local::now().fixed_offset()),
        updated_at: Set(Local::now().fixed_offset()),
        name: Set(payload.name.trim().to_string()),
        description: Set(payload.description.clone()),
        is_active: Set(true),
        ..Default::default()
    };

    let created = Department::insert(model)
        .exec_with_returning(db.get_ref()).await?;

    Ok(created_json("department created successfully", created))
}

#[derive(Debug, Serialize, Deserialize)]
struct UpdateDepartment {
    name: Option<String>,
    description: Option<String>,
}

#[put("/{id}")]
async fn update_department(db: web::Data<DatabaseConnection>, _staff: Staff, path: web::Path<i32>, payload: web::Json<UpdateDepartment>) -> Result<impl Responder, ApiError> {
    let department = Department::find_by_id(path.into_inner())
        .one(db.get_ref()).await?
        .ok_or(ApiError::NotFound("department"))?;

    if let Some(name) = &payload.name {
        if name.trim() != department.name {
            let taken = Department::find()
                .filter(department::Column::Name.eq(name.trim()))
                .one(db.get_ref()).await?;

            if taken.is_some() {
                return Err(ApiError::Conflict("department name is already taken".to_string()));
            }
        }
    }

    let mut model = department::ActiveModel {
        id: Unchanged(department.id),
        updated_at: Set(Local::now().fixed_offset()),
        ..Default::default()
    };

    if let Some(name) = &payload.name {
        model.name = Set(name.trim().to_string());
    }

    if let Some(description) = &payload.description {
        model.description = Set(Some(description.clone()));
    }

    let updated = Department::update(model).exec(db.get_ref()).await?;

    Ok(ok_json("department updated successfully", updated))
}

/// Soft delete; blocked while active employees still reference the department.
#[delete("/{id}")]
async fn delete_department(db: web::Data<DatabaseConnection>, _staff: Staff, path: web::Path<i32>) -> Result<impl Responder, ApiError> {
    let department = Department::find_by_id(path.into_inner())
        .one(db.get_ref()).await?
        .ok_or(ApiError::NotFound("department"))?;

    if !department.is_active {
        return Err(ApiError::State("department is already inactive".to_string()));
    }

    let active_employees = Employee::find()
        .filter(employee::Column::DepartmentId.eq(department.id))
        .filter(employee::Column::IsActive.eq(true))
        .count(db.get_ref()).await?;

    if active_employees > 0 {
        return Err(ApiError::State(format!(
            "cannot delete department with {active_employees} active employees"
        )));
    }

    let updated = Department::update(department::ActiveModel {
        id: Unchanged(department.id),
        updated_at: Set(Local::now().fixed_offset()),
        is_active: Set(false),
        ..Default::default()
    }).exec(db.get_ref()).await?;

    Ok(ok_json("department deleted successfully", updated))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::{Method, StatusCode}, test, App};
    use sea_orm::{DatabaseBackend, MockDatabase};

    use crate::{auth::{tests::test_user, Authority}, entity::sea_orm_active_enums::RoleType};

    use super::*;

    pub(crate) fn test_department(id: i32, name: &str) -> department::Model {
        department::Model {
            id,
            created_at: Local::now().into(),
            updated_at: Local::now().into(),
            name: name.to_string(),
            description: None,
            is_active: true,
        }
    }

    #[actix_web::test]
    async fn test_create_department_duplicate_name() {
        let secret = b"secret";
        let token = Authority::new(secret).issue_for(&test_user(1, RoleType::Hr));

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![test_department(1, "Engineering")]]);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(Authority::new(secret)))
                .app_data(web::Data::new(db.into_connection()))
                .service(web::scope("/departments").service(create_department))
        ).await;

        let req = test::TestRequest::default()
            .uri("/departments")
            .method(Method::POST)
            .insert_header(("Authorization", format!("JWT {token}")))
            .set_json(CreateDepartment {
                name: "Engineering".to_owned(),
                description: None,
            })
            .to_request();

        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[actix_web::test]
    async fn test_delete_department_with_active_employees() {
        let secret = b"secret";
        let token = Authority::new(secret).issue_for(&test_user(1, RoleType::Admin));

        let mut count_row = std::collections::BTreeMap::new();
        count_row.insert("num_items", sea_orm::Value::BigInt(Some(2)));

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![test_department(1, "Engineering")]])
            .append_query_results([vec![count_row]]);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(Authority::new(secret)))
                .app_data(web::Data::new(db.into_connection()))
                .service(delete_department)
        ).await;

        let req = test::TestRequest::default()
            .uri("/1")
            .method(Method::DELETE)
            .insert_header(("Authorization", format!("JWT {token}")))
            .to_request();

        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
