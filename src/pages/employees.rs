use std::collections::BTreeMap;

use actix_web::{delete, get, post, put, web, Responder};
use chrono::{Local, NaiveDate};
use sea_orm::{prelude::Decimal, ActiveValue::{Set, Unchanged}, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};

use crate::{
    auth::Staff,
    entity::{department, employee, prelude::*, user},
    error::ApiError,
    pages::{created_json, employee_of, ensure_staff_or_owner, ok_json},
};

pub(super) fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .service(list_employees)
        .service(employee_stats)
        .service(my_profile)
        .service(employees_by_department)
        .service(get_employee)
        .service(create_employee)
        .service(update_employee)
        .service(reactivate_employee)
        .service(delete_employee);
}

#[derive(Debug, Serialize, Deserialize)]
struct ListFilter {
    search: Option<String>,
    department_id: Option<i32>,
    is_active: Option<bool>,
}

#[get("")]
async fn list_employees(db: web::Data<DatabaseConnection>, _staff: Staff, filter: web::Query<ListFilter>) -> Result<impl Responder, ApiError> {
    let mut query = Employee::find().order_by_asc(employee::Column::Name);

    if let Some(search) = &filter.search {
        query = query.filter(
            Condition::any()
                .add(employee::Column::Name.contains(search))
                .add(employee::Column::Email.contains(search))
                .add(employee::Column::Designation.contains(search)),
        );
    }

    if let Some(department_id) = filter.department_id {
        query = query.filter(employee::Column::DepartmentId.eq(department_id));
    }

    if let Some(is_active) = filter.is_active {
        query = query.filter(employee::Column::IsActive.eq(is_active));
    }

    let employees = query.all(db.get_ref()).await?;

    Ok(ok_json("employees retrieved successfully", employees))
}

#[derive(Debug, Serialize)]
struct SalaryStats {
    minimum: Decimal,
    maximum: Decimal,
    average: Decimal,
}

#[derive(Debug, Serialize)]
struct EmployeeStats {
    total: usize,
    active: usize,
    inactive: usize,
    by_department: BTreeMap<String, usize>,
    by_designation: BTreeMap<String, usize>,
    salary: SalaryStats,
}

#[get("/stats")]
async fn employee_stats(db: web::Data<DatabaseConnection>, _staff: Staff) -> Result<impl Responder, ApiError> {
    let employees = Employee::find().all(db.get_ref()).await?;
    let departments = Department::find().all(db.get_ref()).await?;

    let department_names: BTreeMap<i32, String> = departments.into_iter()
        .map(|department| (department.id, department.name))
        .collect();

    let active = employees.iter().filter(|employee| employee.is_active).count();

    let mut by_department = BTreeMap::new();
    let mut by_designation = BTreeMap::new();

    for employee in employees.iter().filter(|employee| employee.is_active) {
        let department = department_names
            .get(&employee.department_id)
            .cloned()
            .unwrap_or_else(|| employee.department_id.to_string());

        *by_department.entry(department).or_insert(0) += 1;
        *by_designation.entry(employee.designation.clone()).or_insert(0) += 1;
    }

    let salaries: Vec<Decimal> = employees.iter()
        .filter(|employee| employee.is_active)
        .map(|employee| employee.salary)
        .collect();

    let salary = if salaries.is_empty() {
        SalaryStats {
            minimum: Decimal::ZERO,
            maximum: Decimal::ZERO,
            average: Decimal::ZERO,
        }
    } else {
        let sum: Decimal = salaries.iter().copied().sum();

        SalaryStats {
            minimum: salaries.iter().copied().min().unwrap_or(Decimal::ZERO),
            maximum: salaries.iter().copied().max().unwrap_or(Decimal::ZERO),
            average: (sum / Decimal::from(salaries.len() as u64)).round_dp(2),
        }
    };

    Ok(ok_json("employee statistics retrieved successfully", EmployeeStats {
        total: employees.len(),
        active,
        inactive: employees.len() - active,
        by_department,
        by_designation,
        salary,
    }))
}

#[derive(Debug, Serialize)]
struct EmployeeDetail {
    #[serde(flatten)]
    employee: employee::Model,
    department: Option<department::Model>,
}

#[get("/profile")]
async fn my_profile(db: web::Data<DatabaseConnection>, user: user::Model) -> Result<impl Responder, ApiError> {
    let employee = employee_of(db.get_ref(), &user).await?;

    let department = Department::find_by_id(employee.department_id)
        .one(db.get_ref()).await?;

    Ok(ok_json("profile retrieved successfully", EmployeeDetail { employee, department }))
}

#[get("/department/{department_id}")]
async fn employees_by_department(db: web::Data<DatabaseConnection>, _staff: Staff, path: web::Path<i32>) -> Result<impl Responder, ApiError> {
    let department_id = path.into_inner();

    Department::find_by_id(department_id)
        .one(db.get_ref()).await?
        .ok_or(ApiError::NotFound("department"))?;

    let employees = Employee::find()
        .filter(employee::Column::DepartmentId.eq(department_id))
        .order_by_asc(employee::Column::Name)
        .all(db.get_ref()).await?;

    Ok(ok_json("employees retrieved successfully", employees))
}

#[get("/{id}")]
async fn get_employee(db: web::Data<DatabaseConnection>, user: user::Model, path: web::Path<i32>) -> Result<impl Responder, ApiError> {
    let employee = Employee::find_by_id(path.into_inner())
        .one(db.get_ref()).await?
        .ok_or(ApiError::NotFound("employee"))?;

    ensure_staff_or_owner(db.get_ref(), &user, employee.id).await?;

    let department = Department::find_by_id(employee.department_id)
        .one(db.get_ref()).await?;

    Ok(ok_json("employee retrieved successfully", EmployeeDetail { employee, department }))
}

#[derive(Debug, Serialize, Deserialize)]
struct CreateEmployee {
    user_id: i32,
    department_id: i32,
    name: String,
    email: String,
    phone: Option<String>,
    address: Option<String>,
    designation: String,
    salary: Decimal,
    joining_date: NaiveDate,
}

#[post("")]
async fn create_employee(db: web::Data<DatabaseConnection>, _staff: Staff, payload: web::Json<CreateEmployee>) -> Result<impl Responder, ApiError> {
    if payload.salary < Decimal::ZERO {
        return Err(ApiError::Validation("salary must not be negative".to_string()));
    }

    User::find_by_id(payload.user_id)
        .one(db.get_ref()).await?
        .ok_or(ApiError::NotFound("user"))?;

    let linked = Employee::find()
        .filter(employee::Column::UserId.eq(payload.user_id))
        .one(db.get_ref()).await?;

    if linked.is_some() {
        return Err(ApiError::Conflict("user already has an employee record".to_string()));
    }

    let email_taken = Employee::find()
        .filter(employee::Column::Email.eq(&payload.email))
        .one(db.get_ref()).await?;

    if email_taken.is_some() {
        return Err(ApiError::Conflict("email is already taken by another employee".to_string()));
    }

    Department::find_by_id(payload.department_id)
        .one(db.get_ref()).await?
        .ok_or(ApiError::NotFound("department"))?;

    let model = employee::ActiveModel {
        created_at: Set(Local::now().fixed_offset()),
        updated_at: Set(Local::now().fixed_offset()),
        user_id: Set(payload.user_id),
        department_id: Set(payload.department_id),
        name: Set(payload.name.clone()),
        email: Set(payload.email.clone()),
        phone: Set(payload.phone.clone()),
        address: Set(payload.address.clone()),
        designation: Set(payload.designation.clone()),
        salary: Set(payload.salary),
        joining_date: Set(payload.joining_date),
        is_active: Set(true),
        ..Default::default()
    };

    let created = Employee::insert(model)
        .exec_with_returning(db.get_ref()).await?;

    Ok(created_json("employee created successfully", created))
}

#[derive(Debug, Serialize, Deserialize)]
struct UpdateEmployee {
    department_id: Option<i32>,
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    designation: Option<String>,
    salary: Option<Decimal>,
}

#[put("/{id}")]
async fn update_employee(db: web::Data<DatabaseConnection>, _staff: Staff, path: web::Path<i32>, payload: web::Json<UpdateEmployee>) -> Result<impl Responder, ApiError> {
    let employee = Employee::find_by_id(path.into_inner())
        .one(db.get_ref()).await?
        .ok_or(ApiError::NotFound("employee"))?;

    if let Some(salary) = payload.salary {
        if salary < Decimal::ZERO {
            return Err(ApiError::Validation("salary must not be negative".to_string()));
        }
    }

    if let Some(email) = &payload.email {
        if email != &employee.email {
            let taken = Employee::find()
                .filter(employee::Column::Email.eq(email))
                .one(db.get_ref()).await?;

            if taken.is_some() {
                return Err(ApiError::Conflict("email is already taken by another employee".to_string()));
            }
        }
    }

    if let Some(department_id) = payload.department_id {
        Department::find_by_id(department_id)
            .one(db.get_ref()).await?
            .ok_or(ApiError::NotFound("department"))?;
    }

    let mut model = employee::ActiveModel {
        id: Unchanged(employee.id),
        updated_at: Set(Local::now().fixed_offset()),
        ..Default::default()
    };

    if let Some(department_id) = payload.department_id {
        model.department_id = Set(department_id);
    }
    if let Some(name) = &payload.name {
        model.name = Set(name.clone());
    }
    if let Some(email) = &payload.email {
        model.email = Set(email.clone());
    }
    if let Some(phone) = &payload.phone {
        model.phone = Set(Some(phone.clone()));
    }
    if let Some(address) = &payload.address {
        model.address = Set(Some(address.clone()));
    }
    if let Some(designation) = &payload.designation {
        model.designation = Set(designation.clone());
    }
    if let Some(salary) = payload.salary {
        model.salary = Set(salary);
    }

    let updated = Employee::update(model).exec(db.get_ref()).await?;

    Ok(ok_json("employee updated successfully", updated))
}

#[put("/{id}/reactivate")]
async fn reactivate_employee(db: web::Data<DatabaseConnection>, _staff: Staff, path: web::Path<i32>) -> Result<impl Responder, ApiError> {
    let employee = Employee::find_by_id(path.into_inner())
        .one(db.get_ref()).await?
        .ok_or(ApiError::NotFound("employee"))?;

    if employee.is_active {
        return Err(ApiError::State("employee is already active".to_string()));
    }

    let updated = Employee::update(employee::ActiveModel {
        id: Unchanged(employee.id),
        updated_at: Set(Local::now().fixed_offset()),
        is_active: Set(true),
        ..Default::default()
    }).exec(db.get_ref()).await?;

    Ok(ok_json("employee reactivated successfully", updated))
}

/// Soft delete only; attendance, leave and payroll history stays attached.
#[delete("/{id}")]
async fn delete_employee(db: web::Data<DatabaseConnection>, _staff: Staff, path: web::Path<i32>) -> Result<impl Responder, ApiError> {
    let employee = Employee::find_by_id(path.into_inner())
        .one(db.get_ref()).await?
        .ok_or(ApiError::NotFound("employee"))?;

    if !employee.is_active {
        return Err(ApiError::State("employee is already inactive".to_string()));
    }

    let updated = Employee::update(employee::ActiveModel {
        id: Unchanged(employee.id),
        updated_at: Set(Local::now().fixed_offset()),
        is_active: Set(false),
        ..Default::default()
    }).exec(db.get_ref()).await?;

    Ok(ok_json("employee deactivated successfully", updated))
}
