use actix_web::{get, post, put, web, Responder};
use chrono::{Datelike as _, Local, NaiveTime, Timelike as _};
use sea_orm::{prelude::Decimal, ActiveValue::{Set, Unchanged}, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Select};
use serde::{Deserialize, Serialize};

use crate::{
    auth::Staff,
    calc,
    entity::{attendance, prelude::*, sea_orm_active_enums::AttendanceStatus, user},
    error::ApiError,
    pages::{created_json, employee_of, ensure_staff_or_owner, ok_json, EmployeeBrief},
    utils,
};

use model::*;

mod model;

pub(super) fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .service(list_attendance)
        .service(attendance_stats)
        .service(monthly_summary)
        .service(my_records)
        .service(my_today)
        .service(check_in)
        .service(check_out)
        .service(mark_attendance)
        .service(get_attendance)
        .service(update_attendance);
}

fn apply_date_filters(
    mut query: Select<Attendance>,
    filter: &ListFilter,
) -> Result<Select<Attendance>, ApiError> {
    if let (Some(start), Some(end)) = (filter.start_date, filter.end_date) {
        query = query.filter(attendance::Column::Date.between(start, end));
    }

    if let (Some(month), Some(year)) = (filter.month, filter.year) {
        utils::validate_period(month, year)?;

        let (first_day, last_day) = utils::month_bounds(month, year)
            .ok_or_else(|| ApiError::Validation("invalid month/year".to_string()))?;

        query = query.filter(attendance::Column::Date.between(first_day, last_day));
    }

    Ok(query)
}

/// Checking in on a row marked earlier (for example half_day) records the
/// clock-in time and nothing else; the manual status stands.
fn check_in_update(record: &attendance::Model, now: NaiveTime) -> attendance::ActiveModel {
    attendance::ActiveModel {
        id: Unchanged(record.id),
        updated_at: Set(Local::now().fixed_offset()),
        check_in: Set(Some(now)),
        ..Default::default()
    }
}

/// Current wall-clock time truncated to the HH:MM granularity everything else
/// in attendance works at.
fn now_hhmm() -> NaiveTime {
    let now = Local::now().time();

    NaiveTime::from_hms_opt(now.hour(), now.minute(), 0).unwrap_or(now)
}

#[get("")]
async fn list_attendance(db: web::Data<DatabaseConnection>, _staff: Staff, filter: web::Query<ListFilter>) -> Result<impl Responder, ApiError> {
    let mut query = Attendance::find().order_by_desc(attendance::Column::Date);

    if let Some(employee_id) = filter.employee_id {
        query = query.filter(attendance::Column::EmployeeId.eq(employee_id));
    }

    if let Some(status) = &filter.status {
        query = query.filter(attendance::Column::Status.eq(status.clone()));
    }

    query = apply_date_filters(query, &filter)?;

    let records = query.all(db.get_ref()).await?;

    Ok(ok_json("attendance records retrieved successfully", records))
}

#[derive(Debug, Serialize, Deserialize)]
struct StatsFilter {
    month: Option<i32>,
    year: Option<i32>,
}

#[get("/stats")]
async fn attendance_stats(db: web::Data<DatabaseConnection>, _staff: Staff, filter: web::Query<StatsFilter>) -> Result<impl Responder, ApiError> {
    let today = Local::now().date_naive();
    let month = filter.month.unwrap_or(today.month() as i32);
    let year = filter.year.unwrap_or(today.year());

    utils::validate_period(month, year)?;

    let (first_day, last_day) = utils::month_bounds(month, year)
        .ok_or_else(|| ApiError::Validation("invalid month/year".to_string()))?;

    let records = Attendance::find()
        .filter(attendance::Column::Date.between(first_day, last_day))
        .all(db.get_ref()).await?;

    let count_status = |status: AttendanceStatus| {
        records.iter().filter(|record| record.status == status).count()
    };

    let with_hours: Vec<Decimal> = records.iter()
        .filter_map(|record| record.working_hours)
        .collect();

    let average_working_hours = if with_hours.is_empty() {
        Decimal::ZERO
    } else {
        let sum: Decimal = with_hours.iter().copied().sum();
        (sum / Decimal::from(with_hours.len() as u64)).round_dp(2)
    };

    Ok(ok_json("attendance statistics retrieved successfully", PeriodStats {
        month,
        year,
        total_records: records.len(),
        present: count_status(AttendanceStatus::Present),
        absent: count_status(AttendanceStatus::Absent),
        late: count_status(AttendanceStatus::Late),
        half_day: count_status(AttendanceStatus::HalfDay),
        average_working_hours,
    }))
}

#[get("/monthly/{employee_id}/{month}/{year}")]
async fn monthly_summary(db: web::Data<DatabaseConnection>, user: user::Model, path: web::Path<(i32, i32, i32)>) -> Result<impl Responder, ApiError> {
    let (employee_id, month, year) = path.into_inner();

    utils::validate_period(month, year)?;
    ensure_staff_or_owner(db.get_ref(), &user, employee_id).await?;

    let employee = Employee::find_by_id(employee_id)
        .one(db.get_ref()).await?
        .ok_or(ApiError::NotFound("employee"))?;

    let (first_day, last_day) = utils::month_bounds(month, year)
        .ok_or_else(|| ApiError::Validation("invalid month/year".to_string()))?;

    let records = Attendance::find()
        .filter(attendance::Column::EmployeeId.eq(employee_id))
        .filter(attendance::Column::Date.between(first_day, last_day))
        .order_by_asc(attendance::Column::Date)
        .all(db.get_ref()).await?;

    let count_status = |status: AttendanceStatus| {
        records.iter().filter(|record| record.status == status).count()
    };

    let total_working_hours: Decimal = records.iter()
        .filter_map(|record| record.working_hours)
        .sum();

    let average_working_hours = if records.is_empty() {
        Decimal::ZERO
    } else {
        (total_working_hours / Decimal::from(records.len() as u64)).round_dp(2)
    };

    Ok(ok_json("monthly attendance summary retrieved successfully", MonthlySummary {
        employee: EmployeeBrief::from(&employee),
        month,
        year,
        total_days: records.len(),
        present_days: count_status(AttendanceStatus::Present),
        absent_days: count_status(AttendanceStatus::Absent),
        late_days: count_status(AttendanceStatus::Late),
        half_days: count_status(AttendanceStatus::HalfDay),
        total_working_hours: total_working_hours.round_dp(2),
        average_working_hours,
        records,
    }))
}

#[get("/my/records")]
async fn my_records(db: web::Data<DatabaseConnection>, user: user::Model, filter: web::Query<MyFilter>) -> Result<impl Responder, ApiError> {
    let employee = employee_of(db.get_ref(), &user).await?;

    let mut query = Attendance::find()
        .filter(attendance::Column::EmployeeId.eq(employee.id))
        .order_by_desc(attendance::Column::Date);

    if let Some(status) = &filter.status {
        query = query.filter(attendance::Column::Status.eq(status.clone()));
    }

    query = apply_date_filters(query, &ListFilter {
        employee_id: None,
        status: None,
        start_date: filter.start_date,
        end_date: filter.end_date,
        month: filter.month,
        year: filter.year,
    })?;

    let records = query.all(db.get_ref()).await?;

    Ok(ok_json("your attendance records retrieved successfully", records))
}

#[get("/my/today")]
async fn my_today(db: web::Data<DatabaseConnection>, user: user::Model) -> Result<impl Responder, ApiError> {
    let employee = employee_of(db.get_ref(), &user).await?;
    let today = Local::now().date_naive();

    let record = Attendance::find()
        .filter(attendance::Column::EmployeeId.eq(employee.id))
        .filter(attendance::Column::Date.eq(today))
        .one(db.get_ref()).await?;

    Ok(ok_json("today's attendance status retrieved successfully", TodayStatus {
        date: today,
        marked: record.is_some(),
        record,
    }))
}

#[post("/checkin")]
async fn check_in(db: web::Data<DatabaseConnection>, user: user::Model, payload: web::Json<CheckNotes>) -> Result<impl Responder, ApiError> {
    let employee = employee_of(db.get_ref(), &user).await?;
    let today = Local::now().date_naive();
    let now = now_hhmm();

    let existing = Attendance::find()
        .filter(attendance::Column::EmployeeId.eq(employee.id))
        .filter(attendance::Column::Date.eq(today))
        .one(db.get_ref()).await?;

    let record = match existing {
        Some(record) if record.check_in.is_some() => {
            return Err(ApiError::Conflict("you have already checked in today".to_string()));
        }
        Some(record) => {
            Attendance::update(check_in_update(&record, now))
                .exec(db.get_ref()).await?
        }
        None => {
            Attendance::insert(attendance::ActiveModel {
                created_at: Set(Local::now().fixed_offset()),
                updated_at: Set(Local::now().fixed_offset()),
                employee_id: Set(employee.id),
                date: Set(today),
                check_in: Set(Some(now)),
                status: Set(AttendanceStatus::Present),
                is_late: Set(false),
                notes: Set(payload.notes.clone()),
                ..Default::default()
            }).exec_with_returning(db.get_ref()).await?
        }
    };

    Ok(created_json("check-in successful", record))
}

#[post("/checkout")]
async fn check_out(db: web::Data<DatabaseConnection>, user: user::Model, payload: web::Json<CheckNotes>) -> Result<impl Responder, ApiError> {
    let employee = employee_of(db.get_ref(), &user).await?;
    let today = Local::now().date_naive();
    let now = now_hhmm();

    let record = Attendance::find()
        .filter(attendance::Column::EmployeeId.eq(employee.id))
        .filter(attendance::Column::Date.eq(today))
        .one(db.get_ref()).await?
        .ok_or_else(|| ApiError::Validation("you must check in first before checking out".to_string()))?;

    let Some(check_in_time) = record.check_in else {
        return Err(ApiError::Validation("you must check in first before checking out".to_string()));
    };

    if record.check_out.is_some() {
        return Err(ApiError::Conflict("you have already checked out today".to_string()));
    }

    let day = calc::derive_work_day(check_in_time, now)?;

    let updated = Attendance::update(attendance::ActiveModel {
        id: Unchanged(record.id),
        updated_at: Set(Local::now().fixed_offset()),
        check_out: Set(Some(now)),
        working_hours: Set(Some(day.working_hours)),
        is_late: Set(day.is_late),
        late_minutes: Set(day.late_minutes),
        overtime_hours: Set(day.overtime_hours),
        notes: Set(payload.notes.clone().or(record.notes)),
        ..Default::default()
    }).exec(db.get_ref()).await?;

    Ok(ok_json("check-out successful", updated))
}

/// Manual marking by staff; derives hours, lateness and overtime when both
/// clock times are supplied.
#[post("")]
async fn mark_attendance(db: web::Data<DatabaseConnection>, _staff: Staff, payload: web::Json<MarkAttendance>) -> Result<impl Responder, ApiError> {
    Employee::find_by_id(payload.employee_id)
        .one(db.get_ref()).await?
        .ok_or(ApiError::NotFound("employee"))?;

    let existing = Attendance::find()
        .filter(attendance::Column::EmployeeId.eq(payload.employee_id))
        .filter(attendance::Column::Date.eq(payload.date))
        .one(db.get_ref()).await?;

    if existing.is_some() {
        return Err(ApiError::Conflict("attendance is already marked for this date".to_string()));
    }

    let check_in_time = payload.check_in.as_deref().map(utils::parse_hhmm).transpose()?;
    let check_out_time = payload.check_out.as_deref().map(utils::parse_hhmm).transpose()?;

    let day = match (check_in_time, check_out_time) {
        (Some(check_in_time), Some(check_out_time)) => Some(calc::derive_work_day(check_in_time, check_out_time)?),
        _ => None,
    };

    let model = attendance::ActiveModel {
        created_at: Set(Local::now().fixed_offset()),
        updated_at: Set(Local::now().fixed_offset()),
        employee_id: Set(payload.employee_id),
        date: Set(payload.date),
        check_in: Set(check_in_time),
        check_out: Set(check_out_time),
        status: Set(payload.status.clone()),
        working_hours: Set(day.as_ref().map(|day| day.working_hours)),
        is_late: Set(day.as_ref().is_some_and(|day| day.is_late)),
        late_minutes: Set(day.as_ref().and_then(|day| day.late_minutes)),
        overtime_hours: Set(day.as_ref().and_then(|day| day.overtime_hours)),
        notes: Set(payload.notes.clone()),
        ..Default::default()
    };

    let created = Attendance::insert(model)
        .exec_with_returning(db.get_ref()).await?;

    Ok(created_json("attendance marked successfully", created))
}

#[get("/{id}")]
async fn get_attendance(db: web::Data<DatabaseConnection>, user: user::Model, path: web::Path<i32>) -> Result<impl Responder, ApiError> {
    let record = Attendance::find_by_id(path.into_inner())
        .one(db.get_ref()).await?
        .ok_or(ApiError::NotFound("attendance record"))?;

    ensure_staff_or_owner(db.get_ref(), &user, record.employee_id).await?;

    Ok(ok_json("attendance record retrieved successfully", record))
}

/// Re-derives the computed fields whenever both clock times are present after
/// the update.
#[put("/{id}")]
async fn update_attendance(db: web::Data<DatabaseConnection>, _staff: Staff, path: web::Path<i32>, payload: web::Json<UpdateAttendance>) -> Result<impl Responder, ApiError> {
    let record = Attendance::find_by_id(path.into_inner())
        .one(db.get_ref()).await?
        .ok_or(ApiError::NotFound("attendance record"))?;

    let check_in_time = match &payload.check_in {
        Some(value) => Some(utils::parse_hhmm(value)?),
        None => record.check_in,
    };
    let check_out_time = match &payload.check_out {
        Some(value) => Some(utils::parse_hhmm(value)?),
        None => record.check_out,
    };

    let mut model = attendance::ActiveModel {
        id: Unchanged(record.id),
        updated_at: Set(Local::now().fixed_offset()),
        check_in: Set(check_in_time),
        check_out: Set(check_out_time),
        ..Default::default()
    };

    if let (Some(check_in_time), Some(check_out_time)) = (check_in_time, check_out_time) {
        let day = calc::derive_work_day(check_in_time, check_out_time)?;

        model.working_hours = Set(Some(day.working_hours));
        model.is_late = Set(day.is_late);
        model.late_minutes = Set(day.late_minutes);
        model.overtime_hours = Set(day.overtime_hours);
    }

    if let Some(status) = &payload.status {
        model.status = Set(status.clone());
    }

    if let Some(notes) = &payload.notes {
        model.notes = Set(Some(notes.clone()));
    }

    let updated = Attendance::update(model).exec(db.get_ref()).await?;

    Ok(ok_json("attendance updated successfully", updated))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::{Method, StatusCode}, test, App};
    use chrono::NaiveDate;
    use sea_orm::{DatabaseBackend, MockDatabase};

    use crate::{
        auth::{tests::test_user, Authority},
        entity::sea_orm_active_enums::RoleType,
        pages::employees::tests::test_employee,
    };

    use super::*;

    fn marked_attendance(id: i32, employee_id: i32) -> attendance::Model {
        attendance::Model {
            id,
            created_at: Local::now().into(),
            updated_at: Local::now().into(),
            employee_id,
            date: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
            check_in: Some(NaiveTime::from_hms_opt(9, 0, 0).unwrap()),
            check_out: None,
            status: AttendanceStatus::Present,
            working_hours: None,
            is_late: false,
            late_minutes: None,
            overtime_hours: None,
            notes: None,
        }
    }

    #[actix_web::test]
    async fn test_mark_attendance_duplicate_date() {
        let secret = b"secret";
        let token = Authority::new(secret).issue_for(&test_user(1, RoleType::Hr));

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![test_employee(3, 5, 3000)]])
            .append_query_results([vec![marked_attendance(1, 3)]]);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(Authority::new(secret)))
                .app_data(web::Data::new(db.into_connection()))
                .service(web::scope("/attendance").service(mark_attendance))
        ).await;

        let req = test::TestRequest::default()
            .uri("/attendance")
            .method(Method::POST)
            .insert_header(("Authorization", format!("JWT {token}")))
            .set_json(MarkAttendance {
                employee_id: 3,
                date: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
                check_in: None,
                check_out: None,
                status: AttendanceStatus::Absent,
                notes: None,
            })
            .to_request();

        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[actix_web::test]
    async fn test_mark_attendance_rejects_reversed_times() {
        let secret = b"secret";
        let token = Authority::new(secret).issue_for(&test_user(1, RoleType::Hr));

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![test_employee(3, 5, 3000)]])
            .append_query_results([Vec::<attendance::Model>::new()]);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(Authority::new(secret)))
                .app_data(web::Data::new(db.into_connection()))
                .service(web::scope("/attendance").service(mark_attendance))
        ).await;

        let req = test::TestRequest::default()
            .uri("/attendance")
            .method(Method::POST)
            .insert_header(("Authorization", format!("JWT {token}")))
            .set_json(MarkAttendance {
                employee_id: 3,
                date: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
                check_in: Some("17:00".to_string()),
                check_out: Some("09:00".to_string()),
                status: AttendanceStatus::Present,
                notes: None,
            })
            .to_request();

        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[::core::prelude::v1::test]
    fn test_check_in_keeps_manual_status() {
        let mut record = marked_attendance(1, 3);
        record.check_in = None;
        record.status = AttendanceStatus::HalfDay;

        let model = check_in_update(&record, NaiveTime::from_hms_opt(10, 0, 0).unwrap());

        assert!(model.status.is_not_set());
        assert_eq!(model.check_in.clone().unwrap(), Some(NaiveTime::from_hms_opt(10, 0, 0).unwrap()));
    }

    #[actix_web::test]
    async fn test_check_in_twice_is_rejected() {
        let secret = b"secret";
        let user = test_user(5, RoleType::Employee);
        let token = Authority::new(secret).issue_for(&user);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![test_employee(3, 5, 3000)]])
            .append_query_results([vec![marked_attendance(1, 3)]]);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(Authority::new(secret)))
                .app_data(web::Data::new(db.into_connection()))
                .service(web::scope("/attendance").service(check_in))
        ).await;

        let req = test::TestRequest::default()
            .uri("/attendance/checkin")
            .method(Method::POST)
            .insert_header(("Authorization", format!("JWT {token}")))
            .set_json(CheckNotes { notes: None })
            .to_request();

        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[actix_web::test]
    async fn test_check_out_without_check_in() {
        let secret = b"secret";
        let user = test_user(5, RoleType::Employee);
        let token = Authority::new(secret).issue_for(&user);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![test_employee(3, 5, 3000)]])
            .append_query_results([Vec::<attendance::Model>::new()]);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(Authority::new(secret)))
                .app_data(web::Data::new(db.into_connection()))
                .service(web::scope("/attendance").service(check_out))
        ).await;

        let req = test::TestRequest::default()
            .uri("/attendance/checkout")
            .method(Method::POST)
            .insert_header(("Authorization", format!("JWT {token}")))
            .set_json(CheckNotes { notes: None })
            .to_request();

        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
