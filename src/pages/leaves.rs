use actix_web::{delete, dev, get, post, put, web, FromRequest, HttpRequest, Responder};
use chrono::{Datelike as _, Local, NaiveDate};
use futures_util::future::LocalBoxFuture;
use sea_orm::{prelude::Decimal, ActiveEnum as _, ActiveValue::{Set, Unchanged}, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};

use crate::{
    auth::Staff,
    consts,
    entity::{leave, prelude::*, sea_orm_active_enums::{LeaveStatus, LeaveType}, user},
    error::ApiError,
    pages::{created_json, employee_of, ensure_staff_or_owner, is_staff, ok_json},
    utils,
};

use extractor::*;

mod extractor;

pub(super) fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .service(list_leaves)
        .service(leave_stats)
        .service(my_leaves)
        .service(get_leave)
        .service(request_leave)
        .service(update_leave)
        .service(approve_leave)
        .service(reject_leave)
        .service(delete_leave);
}

fn validate_reason(reason: &str) -> Result<(), ApiError> {
    if !consts::REASON_LEN.contains(&reason.trim().len()) {
        return Err(ApiError::Validation(format!(
            "reason must be between {} and {} characters",
            consts::REASON_LEN.start(), consts::REASON_LEN.end()
        )));
    }

    Ok(())
}

fn validate_range(start: NaiveDate, end: NaiveDate) -> Result<(), ApiError> {
    if start > end {
        return Err(ApiError::Validation("start date must not be after end date".to_string()));
    }

    Ok(())
}

/// Conflicts with any pending or approved request of the same employee whose
/// inclusive range touches the given one.
async fn overlapping_request(
    db: &DatabaseConnection,
    employee_id: i32,
    start: NaiveDate,
    end: NaiveDate,
    exclude_id: Option<i32>,
) -> Result<Option<leave::Model>, ApiError> {
    let mut query = Leave::find()
        .filter(leave::Column::EmployeeId.eq(employee_id))
        .filter(leave::Column::Status.is_in([LeaveStatus::Pending, LeaveStatus::Approved]))
        .filter(leave::Column::StartDate.lte(end))
        .filter(leave::Column::EndDate.gte(start));

    if let Some(id) = exclude_id {
        query = query.filter(leave::Column::Id.ne(id));
    }

    Ok(query.one(db).await?)
}

#[derive(Debug, Serialize, Deserialize)]
struct ListFilter {
    employee_id: Option<i32>,
    status: Option<LeaveStatus>,
    leave_type: Option<LeaveType>,
}

#[get("")]
async fn list_leaves(db: web::Data<DatabaseConnection>, _staff: Staff, filter: web::Query<ListFilter>) -> Result<impl Responder, ApiError> {
    let mut query = Leave::find().order_by_desc(leave::Column::StartDate);

    if let Some(employee_id) = filter.employee_id {
        query = query.filter(leave::Column::EmployeeId.eq(employee_id));
    }

    if let Some(status) = &filter.status {
        query = query.filter(leave::Column::Status.eq(status.clone()));
    }

    if let Some(leave_type) = &filter.leave_type {
        query = query.filter(leave::Column::LeaveType.eq(leave_type.clone()));
    }

    let leaves = query.all(db.get_ref()).await?;

    Ok(ok_json("leave requests retrieved successfully", leaves))
}

#[derive(Debug, Serialize, Deserialize)]
struct StatsFilter {
    year: Option<i32>,
}

#[derive(Debug, Serialize)]
struct LeaveStats {
    year: i32,
    total_requests: usize,
    pending: usize,
    approved: usize,
    rejected: usize,
    total_approved_days: i32,
    average_approved_days: Decimal,
    by_type: std::collections::BTreeMap<String, usize>,
}

#[get("/stats")]
async fn leave_stats(db: web::Data<DatabaseConnection>, _staff: Staff, filter: web::Query<StatsFilter>) -> Result<impl Responder, ApiError> {
    let year = filter.year.unwrap_or(Local::now().year());

    let first_day = NaiveDate::from_ymd_opt(year, 1, 1)
        .ok_or_else(|| ApiError::Validation("invalid year".to_string()))?;
    let last_day = NaiveDate::from_ymd_opt(year, 12, 31)
        .ok_or_else(|| ApiError::Validation("invalid year".to_string()))?;

    let leaves = Leave::find()
        .filter(leave::Column::StartDate.between(first_day, last_day))
        .all(db.get_ref()).await?;

    let count_status = |status: LeaveStatus| {
        leaves.iter().filter(|leave| leave.status == status).count()
    };

    let mut by_type = std::collections::BTreeMap::new();
    for leave in &leaves {
        *by_type.entry(leave.leave_type.to_value()).or_insert(0) += 1;
    }

    let approved = count_status(LeaveStatus::Approved);
    let total_approved_days: i32 = leaves.iter()
        .filter(|leave| leave.status == LeaveStatus::Approved)
        .map(|leave| leave.total_days)
        .sum();

    let average_approved_days = if approved == 0 {
        Decimal::ZERO
    } else {
        (Decimal::from(total_approved_days) / Decimal::from(approved as u64)).round_dp(2)
    };

    Ok(ok_json("leave statistics retrieved successfully", LeaveStats {
        year,
        total_requests: leaves.len(),
        pending: count_status(LeaveStatus::Pending),
        approved,
        rejected: count_status(LeaveStatus::Rejected),
        total_approved_days,
        average_approved_days,
        by_type,
    }))
}

#[get("/my")]
async fn my_leaves(db: web::Data<DatabaseConnection>, user: user::Model) -> Result<impl Responder, ApiError> {
    let employee = employee_of(db.get_ref(), &user).await?;

    let leaves = Leave::find()
        .filter(leave::Column::EmployeeId.eq(employee.id))
        .order_by_desc(leave::Column::StartDate)
        .all(db.get_ref()).await?;

    Ok(ok_json("your leave requests retrieved successfully", leaves))
}

#[get("/{id}")]
async fn get_leave(db: web::Data<DatabaseConnection>, user: user::Model, leave: leave::Model) -> Result<impl Responder, ApiError> {
    ensure_staff_or_owner(db.get_ref(), &user, leave.employee_id).await?;

    Ok(ok_json("leave request retrieved successfully", leave))
}

#[derive(Debug, Serialize, Deserialize)]
struct RequestLeave {
    /// Staff may file on behalf of another employee; everyone else files for
    /// their own profile.
    employee_id: Option<i32>,
    leave_type: LeaveType,
    start_date: NaiveDate,
    end_date: NaiveDate,
    reason: String,
    notes: Option<String>,
}

#[post("")]
async fn request_leave(db: web::Data<DatabaseConnection>, user: user::Model, payload: web::Json<RequestLeave>) -> Result<impl Responder, ApiError> {
    validate_reason(&payload.reason)?;
    validate_range(payload.start_date, payload.end_date)?;

    let employee_id = match payload.employee_id {
        Some(employee_id) if is_staff(&user) => {
            Employee::find_by_id(employee_id)
                .one(db.get_ref()).await?
                .ok_or(ApiError::NotFound("employee"))?
                .id
        }
        _ => employee_of(db.get_ref(), &user).await?.id,
    };

    if overlapping_request(db.get_ref(), employee_id, payload.start_date, payload.end_date, None).await?.is_some() {
        return Err(ApiError::Conflict("an overlapping leave request already exists".to_string()));
    }

    let model = leave::ActiveModel {
        created_at: Set(Local::now().fixed_offset()),
        updated_at: Set(Local::now().fixed_offset()),
        employee_id: Set(employee_id),
        start_date: Set(payload.start_date),
        end_date: Set(payload.end_date),
        reason: Set(payload.reason.trim().to_string()),
        leave_type: Set(payload.leave_type.clone()),
        status: Set(LeaveStatus::Pending),
        total_days: Set(utils::inclusive_days(payload.start_date, payload.end_date) as i32),
        notes: Set(payload.notes.clone()),
        ..Default::default()
    };

    let created = Leave::insert(model)
        .exec_with_returning(db.get_ref()).await?;

    Ok(created_json("leave request submitted successfully", created))
}

#[derive(Debug, Serialize, Deserialize)]
struct UpdateLeave {
    leave_type: Option<LeaveType>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    reason: Option<String>,
    notes: Option<String>,
}

#[put("/{id}")]
async fn update_leave(db: web::Data<DatabaseConnection>, user: user::Model, leave: PendingLeave, payload: web::Json<UpdateLeave>) -> Result<impl Responder, ApiError> {
    ensure_staff_or_owner(db.get_ref(), &user, leave.employee_id).await?;

    if let Some(reason) = &payload.reason {
        validate_reason(reason)?;
    }

    let start_date = payload.start_date.unwrap_or(leave.start_date);
    let end_date = payload.end_date.unwrap_or(leave.end_date);

    validate_range(start_date, end_date)?;

    if (start_date, end_date) != (leave.start_date, leave.end_date)
        && overlapping_request(db.get_ref(), leave.employee_id, start_date, end_date, Some(leave.id)).await?.is_some()
    {
        return Err(ApiError::Conflict("an overlapping leave request already exists".to_string()));
    }

    let mut model = leave::ActiveModel {
        id: Unchanged(leave.id),
        updated_at: Set(Local::now().fixed_offset()),
        start_date: Set(start_date),
        end_date: Set(end_date),
        total_days: Set(utils::inclusive_days(start_date, end_date) as i32),
        ..Default::default()
    };

    if let Some(leave_type) = &payload.leave_type {
        model.leave_type = Set(leave_type.clone());
    }

    if let Some(reason) = &payload.reason {
        model.reason = Set(reason.trim().to_string());
    }

    if let Some(notes) = &payload.notes {
        model.notes = Set(Some(notes.clone()));
    }

    let updated = Leave::update(model).exec(db.get_ref()).await?;

    Ok(ok_json("leave request updated successfully", updated))
}

#[put("/{id}/approve")]
async fn approve_leave(db: web::Data<DatabaseConnection>, staff: Staff, leave: PendingLeave) -> Result<impl Responder, ApiError> {
    let updated = Leave::update(leave::ActiveModel {
        id: Unchanged(leave.id),
        updated_at: Set(Local::now().fixed_offset()),
        status: Set(LeaveStatus::Approved),
        approved_by: Set(Some(staff.id)),
        approved_at: Set(Some(Local::now().fixed_offset())),
        ..Default::default()
    }).exec(db.get_ref()).await?;

    Ok(ok_json("leave request approved successfully", updated))
}

#[derive(Debug, Serialize, Deserialize)]
struct RejectLeave {
    rejection_reason: String,
}

#[put("/{id}/reject")]
async fn reject_leave(db: web::Data<DatabaseConnection>, staff: Staff, leave: PendingLeave, payload: web::Json<RejectLeave>) -> Result<impl Responder, ApiError> {
    if payload.rejection_reason.trim().len() < consts::MIN_REJECTION_REASON_LEN {
        return Err(ApiError::Validation(format!(
            "rejection reason must be at least {} characters",
            consts::MIN_REJECTION_REASON_LEN
        )));
    }

    let updated = Leave::update(leave::ActiveModel {
        id: Unchanged(leave.id),
        updated_at: Set(Local::now().fixed_offset()),
        status: Set(LeaveStatus::Rejected),
        approved_by: Set(Some(staff.id)),
        approved_at: Set(Some(Local::now().fixed_offset())),
        rejection_reason: Set(Some(payload.rejection_reason.trim().to_string())),
        ..Default::default()
    }).exec(db.get_ref()).await?;

    Ok(ok_json("leave request rejected successfully", updated))
}

/// Only pending requests may be withdrawn; processed ones stay for the record.
#[delete("/{id}")]
async fn delete_leave(db: web::Data<DatabaseConnection>, user: user::Model, leave: PendingLeave) -> Result<impl Responder, ApiError> {
    ensure_staff_or_owner(db.get_ref(), &user, leave.employee_id).await?;

    Leave::delete_by_id(leave.id).exec(db.get_ref()).await?;

    Ok(ok_json("leave request deleted successfully", ()))
}
