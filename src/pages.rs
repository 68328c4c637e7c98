use actix_web::{web, HttpResponse};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::Serialize;

use crate::{
    entity::{employee, prelude::*, sea_orm_active_enums::RoleType, user},
    error::ApiError,
};

mod auth;
mod attendance;
mod departments;
mod employees;
mod leaves;
mod payroll;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .service(web::scope("/api")
            .service(web::scope("/auth")
                .configure(auth::config))
            .service(web::scope("/employees")
                .configure(employees::config))
            .service(web::scope("/departments")
                .configure(departments::config))
            .service(web::scope("/attendance")
                .configure(attendance::config))
            .service(web::scope("/leaves")
                .configure(leaves::config))
            .service(web::scope("/payroll")
                .configure(payroll::config)));
}

#[derive(Debug, Serialize)]
struct ApiResponse<T: Serialize> {
    success: bool,
    message: String,
    data: T,
}

pub(crate) fn ok_json<T: Serialize>(message: &str, data: T) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse {
        success: true,
        message: message.to_string(),
        data,
    })
}

pub(crate) fn created_json<T: Serialize>(message: &str, data: T) -> HttpResponse {
    HttpResponse::Created().json(ApiResponse {
        success: true,
        message: message.to_string(),
        data,
    })
}

/// Flattened employee reference embedded in detail and summary payloads.
#[derive(Debug, Serialize)]
pub(crate) struct EmployeeBrief {
    pub(crate) id: i32,
    pub(crate) name: String,
    pub(crate) designation: String,
}

impl From<&employee::Model> for EmployeeBrief {
    fn from(employee: &employee::Model) -> Self {
        Self {
            id: employee.id,
            name: employee.name.clone(),
            designation: employee.designation.clone(),
        }
    }
}

/// The employee profile behind the calling account; self-service endpoints
/// resolve through this.
pub(crate) async fn employee_of(
    db: &DatabaseConnection,
    user: &user::Model,
) -> Result<employee::Model, ApiError> {
    Employee::find()
        .filter(employee::Column::UserId.eq(user.id))
        .one(db)
        .await?
        .ok_or(ApiError::NotFound("employee profile"))
}

pub(crate) fn is_staff(user: &user::Model) -> bool {
    matches!(user.role, RoleType::Admin | RoleType::Hr)
}

/// By-id reads are open to staff and to the employee who owns the record.
pub(crate) async fn ensure_staff_or_owner(
    db: &DatabaseConnection,
    user: &user::Model,
    employee_id: i32,
) -> Result<(), ApiError> {
    if is_staff(user) {
        return Ok(());
    }

    let employee = employee_of(db, user).await?;

    if employee.id != employee_id {
        return Err(ApiError::Forbidden);
    }

    Ok(())
}
