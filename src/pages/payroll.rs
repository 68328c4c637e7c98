use actix_web::{dev, get, post, put, web, FromRequest, HttpRequest, Responder};
use chrono::{Datelike as _, Local, NaiveDate};
use futures_util::future::LocalBoxFuture;
use sea_orm::{prelude::Decimal, ActiveValue::{Set, Unchanged}, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};

use crate::{
    auth::Staff,
    calc,
    entity::{employee, payroll, prelude::*, sea_orm_active_enums::PayrollStatus, user},
    error::ApiError,
    pages::{created_json, employee_of, ensure_staff_or_owner, ok_json, EmployeeBrief},
    utils,
};

use extractor::*;
use model::*;

mod extractor;
mod model;

pub(super) fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .service(list_payroll)
        .service(payroll_stats)
        .service(my_payroll)
        .service(year_summary)
        .service(generate_payroll)
        .service(bulk_generate)
        .service(get_payroll)
        .service(update_payroll)
        .service(mark_paid)
        .service(cancel_payroll);
}

async fn existing_record(
    db: &DatabaseConnection,
    employee_id: i32,
    month: i32,
    year: i32,
) -> Result<Option<payroll::Model>, ApiError> {
    Ok(Payroll::find()
        .filter(payroll::Column::EmployeeId.eq(employee_id))
        .filter(payroll::Column::Month.eq(month))
        .filter(payroll::Column::Year.eq(year))
        .one(db).await?)
}

/// Builds the insert for one employee and period; the calculators degrade to
/// zero on lookup failure rather than aborting the whole generation.
async fn build_record(
    db: &DatabaseConnection,
    staff: &user::Model,
    employee: &employee::Model,
    payload: &GeneratePayroll,
) -> payroll::ActiveModel {
    let base_salary = payload.base_salary.unwrap_or(employee.salary);
    let bonus = payload.bonus.unwrap_or(Decimal::ZERO);
    let overtime = payload.overtime.unwrap_or(Decimal::ZERO);
    let allowances = payload.allowances.unwrap_or(Decimal::ZERO);
    let deductions = payload.deductions.unwrap_or(Decimal::ZERO);

    let leave_deductions = calc::leave_deductions(db, employee, payload.month, payload.year).await;
    let attendance_bonus = calc::attendance_bonus_for(db, employee.id, payload.month, payload.year).await;

    let total = calc::total_pay(
        base_salary,
        bonus,
        overtime,
        allowances,
        attendance_bonus,
        deductions,
        leave_deductions,
    );

    payroll::ActiveModel {
        created_at: Set(Local::now().fixed_offset()),
        updated_at: Set(Local::now().fixed_offset()),
        employee_id: Set(employee.id),
        month: Set(payload.month),
        year: Set(payload.year),
        base_salary: Set(base_salary),
        bonus: Set(bonus),
        overtime: Set(overtime),
        allowances: Set(allowances),
        deductions: Set(deductions),
        leave_deductions: Set(leave_deductions),
        attendance_bonus: Set(attendance_bonus),
        total_pay: Set(total),
        status: Set(PayrollStatus::Pending),
        notes: Set(payload.notes.clone()),
        generated_by: Set(Some(staff.id)),
        generated_at: Set(Some(Local::now().fixed_offset())),
        ..Default::default()
    }
}

async fn generate_for(
    db: &DatabaseConnection,
    staff: &user::Model,
    employee: &employee::Model,
    payload: &BulkGenerate,
) -> Result<payroll::Model, ApiError> {
    if existing_record(db, employee.id, payload.month, payload.year).await?.is_some() {
        return Err(ApiError::Conflict("payroll is already generated for this period".to_string()));
    }

    // Bulk always bases the period on the employee's own stored salary
    let model = build_record(db, staff, employee, &GeneratePayroll {
        employee_id: employee.id,
        month: payload.month,
        year: payload.year,
        base_salary: None,
        bonus: None,
        overtime: None,
        allowances: None,
        deductions: None,
        notes: None,
    }).await;

    Ok(Payroll::insert(model).exec_with_returning(db).await?)
}

#[get("")]
async fn list_payroll(db: web::Data<DatabaseConnection>, _staff: Staff, filter: web::Query<ListFilter>) -> Result<impl Responder, ApiError> {
    let mut query = Payroll::find()
        .order_by_desc(payroll::Column::Year)
        .order_by_desc(payroll::Column::Month);

    if let Some(employee_id) = filter.employee_id {
        query = query.filter(payroll::Column::EmployeeId.eq(employee_id));
    }

    if let Some(month) = filter.month {
        query = query.filter(payroll::Column::Month.eq(month));
    }

    if let Some(year) = filter.year {
        query = query.filter(payroll::Column::Year.eq(year));
    }

    if let Some(status) = &filter.status {
        query = query.filter(payroll::Column::Status.eq(status.clone()));
    }

    let records = query.all(db.get_ref()).await?;

    Ok(ok_json("payroll records retrieved successfully", records))
}

#[get("/stats")]
async fn payroll_stats(db: web::Data<DatabaseConnection>, _staff: Staff, filter: web::Query<StatsFilter>) -> Result<impl Responder, ApiError> {
    let today = Local::now().date_naive();
    let month = filter.month.unwrap_or(today.month() as i32);
    let year = filter.year.unwrap_or(today.year());

    utils::validate_period(month, year)?;

    let records = Payroll::find()
        .filter(payroll::Column::Month.eq(month))
        .filter(payroll::Column::Year.eq(year))
        .all(db.get_ref()).await?;

    let count_status = |status: PayrollStatus| {
        records.iter().filter(|record| record.status == status).count()
    };

    let counted: Vec<&payroll::Model> = records.iter()
        .filter(|record| record.status != PayrollStatus::Cancelled)
        .collect();

    let total_payout: Decimal = counted.iter().map(|record| record.total_pay).sum();

    let average_total_pay = if counted.is_empty() {
        Decimal::ZERO
    } else {
        (total_payout / Decimal::from(counted.len() as u64)).round_dp(2)
    };

    Ok(ok_json("payroll statistics retrieved successfully", PeriodStats {
        month,
        year,
        total_records: records.len(),
        pending: count_status(PayrollStatus::Pending),
        paid: count_status(PayrollStatus::Paid),
        cancelled: count_status(PayrollStatus::Cancelled),
        total_payout,
        total_paid: records.iter()
            .filter(|record| record.status == PayrollStatus::Paid)
            .map(|record| record.total_pay)
            .sum(),
        average_total_pay,
    }))
}

#[get("/my")]
async fn my_payroll(db: web::Data<DatabaseConnection>, user: user::Model) -> Result<impl Responder, ApiError> {
    let employee = employee_of(db.get_ref(), &user).await?;

    let records = Payroll::find()
        .filter(payroll::Column::EmployeeId.eq(employee.id))
        .order_by_desc(payroll::Column::Year)
        .order_by_desc(payroll::Column::Month)
        .all(db.get_ref()).await?;

    Ok(ok_json("your payroll records retrieved successfully", records))
}

#[get("/summary/{employee_id}")]
async fn year_summary(db: web::Data<DatabaseConnection>, user: user::Model, path: web::Path<i32>, filter: web::Query<SummaryFilter>) -> Result<impl Responder, ApiError> {
    let employee_id = path.into_inner();
    let year = filter.year.unwrap_or(Local::now().year());

    ensure_staff_or_owner(db.get_ref(), &user, employee_id).await?;

    let employee = Employee::find_by_id(employee_id)
        .one(db.get_ref()).await?
        .ok_or(ApiError::NotFound("employee"))?;

    let records = Payroll::find()
        .filter(payroll::Column::EmployeeId.eq(employee_id))
        .filter(payroll::Column::Year.eq(year))
        .order_by_asc(payroll::Column::Month)
        .all(db.get_ref()).await?;

    let count_status = |status: PayrollStatus| {
        records.iter().filter(|record| record.status == status).count()
    };

    let counted: Vec<&payroll::Model> = records.iter()
        .filter(|record| record.status != PayrollStatus::Cancelled)
        .collect();

    let total_earned: Decimal = counted.iter().map(|record| record.total_pay).sum();

    let average_monthly = if counted.is_empty() {
        Decimal::ZERO
    } else {
        (total_earned / Decimal::from(counted.len() as u64)).round_dp(2)
    };

    Ok(ok_json("payroll summary retrieved successfully", YearSummary {
        employee: EmployeeBrief::from(&employee),
        year,
        total_earned,
        months_paid: count_status(PayrollStatus::Paid),
        months_pending: count_status(PayrollStatus::Pending),
        average_monthly,
        monthly: records.iter()
            .map(|record| MonthlyPay {
                month: record.month,
                status: record.status.clone(),
                total_pay: record.total_pay,
            })
            .collect(),
    }))
}

#[get("/{id}")]
async fn get_payroll(db: web::Data<DatabaseConnection>, user: user::Model, record: payroll::Model) -> Result<impl Responder, ApiError> {
    ensure_staff_or_owner(db.get_ref(), &user, record.employee_id).await?;

    Ok(ok_json("payroll record retrieved successfully", record))
}

#[post("")]
async fn generate_payroll(db: web::Data<DatabaseConnection>, staff: Staff, payload: web::Json<GeneratePayroll>) -> Result<impl Responder, ApiError> {
    utils::validate_period(payload.month, payload.year)?;

    let employee = Employee::find_by_id(payload.employee_id)
        .one(db.get_ref()).await?
        .ok_or(ApiError::NotFound("employee"))?;

    if existing_record(db.get_ref(), employee.id, payload.month, payload.year).await?.is_some() {
        return Err(ApiError::Conflict("payroll is already generated for this period".to_string()));
    }

    let model = build_record(db.get_ref(), &staff, &employee, &payload).await;

    let created = Payroll::insert(model)
        .exec_with_returning(db.get_ref()).await?;

    Ok(created_json("payroll generated successfully", created))
}

/// Runs the full generation path for every active employee; failures are
/// collected per employee instead of aborting the batch.
#[post("/bulk")]
async fn bulk_generate(db: web::Data<DatabaseConnection>, staff: Staff, payload: web::Json<BulkGenerate>) -> Result<impl Responder, ApiError> {
    utils::validate_period(payload.month, payload.year)?;

    let employees = Employee::find()
        .filter(employee::Column::IsActive.eq(true))
        .all(db.get_ref()).await?;

    if employees.is_empty() {
        return Err(ApiError::Validation("no active employees to generate payroll for".to_string()));
    }

    let mut generated = Vec::new();
    let mut errors = Vec::new();

    for employee in &employees {
        match generate_for(db.get_ref(), &staff, employee, &payload).await {
            Ok(record) => generated.push(record),
            Err(err) => errors.push(format!("{}: {err}", employee.name)),
        }
    }

    Ok(created_json("bulk payroll generation finished", BulkOutcome { generated, errors }))
}

#[put("/{id}")]
async fn update_payroll(db: web::Data<DatabaseConnection>, _staff: Staff, record: payroll::Model, payload: web::Json<UpdatePayroll>) -> Result<impl Responder, ApiError> {
    if record.status == PayrollStatus::Paid {
        return Err(ApiError::State("cannot edit a paid payroll record".to_string()));
    }

    let base_salary = payload.base_salary.unwrap_or(record.base_salary);
    let bonus = payload.bonus.unwrap_or(record.bonus);
    let overtime = payload.overtime.unwrap_or(record.overtime);
    let allowances = payload.allowances.unwrap_or(record.allowances);
    let deductions = payload.deductions.unwrap_or(record.deductions);

    // Stored period derivations stay part of the recomputed total
    let total = calc::total_pay(
        base_salary,
        bonus,
        overtime,
        allowances,
        record.attendance_bonus,
        deductions,
        record.leave_deductions,
    );

    let mut model = payroll::ActiveModel {
        id: Unchanged(record.id),
        updated_at: Set(Local::now().fixed_offset()),
        base_salary: Set(base_salary),
        bonus: Set(bonus),
        overtime: Set(overtime),
        allowances: Set(allowances),
        deductions: Set(deductions),
        total_pay: Set(total),
        ..Default::default()
    };

    if let Some(notes) = &payload.notes {
        model.notes = Set(Some(notes.clone()));
    }

    let updated = Payroll::update(model).exec(db.get_ref()).await?;

    Ok(ok_json("payroll updated successfully", updated))
}

#[put("/{id}/mark-paid")]
async fn mark_paid(db: web::Data<DatabaseConnection>, staff: Staff, record: payroll::Model, payload: web::Json<MarkPaid>) -> Result<impl Responder, ApiError> {
    if record.status == PayrollStatus::Paid {
        return Err(ApiError::State("payroll record is already paid".to_string()));
    }

    let updated = Payroll::update(payroll::ActiveModel {
        id: Unchanged(record.id),
        updated_at: Set(Local::now().fixed_offset()),
        status: Set(PayrollStatus::Paid),
        paid_by: Set(Some(staff.id)),
        paid_at: Set(Some(Local::now().fixed_offset())),
        payment_date: Set(Some(payload.payment_date.unwrap_or(Local::now().date_naive()))),
        ..Default::default()
    }).exec(db.get_ref()).await?;

    Ok(ok_json("payroll marked as paid successfully", updated))
}

#[put("/{id}/cancel")]
async fn cancel_payroll(db: web::Data<DatabaseConnection>, _staff: Staff, record: payroll::Model, payload: web::Json<CancelPayroll>) -> Result<impl Responder, ApiError> {
    if record.status == PayrollStatus::Paid {
        return Err(ApiError::State("cannot cancel a paid payroll record".to_string()));
    }

    let mut model = payroll::ActiveModel {
        id: Unchanged(record.id),
        updated_at: Set(Local::now().fixed_offset()),
        status: Set(PayrollStatus::Cancelled),
        ..Default::default()
    };

    if let Some(reason) = &payload.reason {
        model.notes = Set(Some(reason.clone()));
    }

    let updated = Payroll::update(model).exec(db.get_ref()).await?;

    Ok(ok_json("payroll cancelled successfully", updated))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::{Method, StatusCode}, test, App};
    use sea_orm::{DatabaseBackend, MockDatabase};

    use crate::{
        auth::{tests::test_user, Authority},
        entity::sea_orm_active_enums::RoleType,
        pages::employees::tests::test_employee,
    };

    use super::*;

    pub(crate) fn test_record(id: i32, employee_id: i32, status: PayrollStatus) -> payroll::Model {
        payroll::Model {
            id,
            created_at: Local::now().into(),
            updated_at: Local::now().into(),
            employee_id,
            month: 6,
            year: 2024,
            base_salary: Decimal::from(3000),
            bonus: Decimal::ZERO,
            overtime: Decimal::ZERO,
            allowances: Decimal::ZERO,
            deductions: Decimal::ZERO,
            leave_deductions: Decimal::ZERO,
            attendance_bonus: Decimal::ZERO,
            total_pay: Decimal::from(3000),
            status,
            notes: None,
            generated_by: Some(1),
            generated_at: Some(Local::now().into()),
            paid_by: None,
            paid_at: None,
            payment_date: None,
        }
    }

    #[actix_web::test]
    async fn test_generate_duplicate_period() {
        let secret = b"secret";
        let token = Authority::new(secret).issue_for(&test_user(1, RoleType::Hr));

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![test_employee(3, 5, 3000)]])
            .append_query_results([vec![test_record(1, 3, PayrollStatus::Pending)]]);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(Authority::new(secret)))
                .app_data(web::Data::new(db.into_connection()))
                .service(web::scope("/payroll").service(generate_payroll))
        ).await;

        let req = test::TestRequest::default()
            .uri("/payroll")
            .method(Method::POST)
            .insert_header(("Authorization", format!("JWT {token}")))
            .set_json(GeneratePayroll {
                employee_id: 3,
                month: 6,
                year: 2024,
                base_salary: None,
                bonus: None,
                overtime: None,
                allowances: None,
                deductions: None,
                notes: None,
            })
            .to_request();

        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[actix_web::test]
    async fn test_generate_out_of_range_period() {
        let secret = b"secret";
        let token = Authority::new(secret).issue_for(&test_user(1, RoleType::Hr));

        let db = MockDatabase::new(DatabaseBackend::Postgres);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(Authority::new(secret)))
                .app_data(web::Data::new(db.into_connection()))
                .service(web::scope("/payroll").service(generate_payroll))
        ).await;

        let req = test::TestRequest::default()
            .uri("/payroll")
            .method(Method::POST)
            .insert_header(("Authorization", format!("JWT {token}")))
            .set_json(GeneratePayroll {
                employee_id: 3,
                month: 13,
                year: 2024,
                base_salary: None,
                bonus: None,
                overtime: None,
                allowances: None,
                deductions: None,
                notes: None,
            })
            .to_request();

        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_generate_with_supplied_base_salary() {
        let staff = test_user(1, RoleType::Hr);
        let employee = test_employee(3, 5, 3000);

        // No approved leaves, no attendance records for the period
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<crate::entity::leave::Model>::new()])
            .append_query_results([Vec::<crate::entity::attendance::Model>::new()])
            .into_connection();

        let model = build_record(&db, &staff, &employee, &GeneratePayroll {
            employee_id: 3,
            month: 6,
            year: 2024,
            base_salary: Some(Decimal::from(5000)),
            bonus: Some(Decimal::from(100)),
            overtime: None,
            allowances: None,
            deductions: None,
            notes: None,
        }).await;

        assert_eq!(model.base_salary.clone().unwrap(), Decimal::from(5000));
        assert_eq!(model.total_pay.clone().unwrap(), Decimal::from(5100));
    }

    #[actix_web::test]
    async fn test_generate_defaults_to_stored_salary() {
        let staff = test_user(1, RoleType::Hr);
        let employee = test_employee(3, 5, 3000);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<crate::entity::leave::Model>::new()])
            .append_query_results([Vec::<crate::entity::attendance::Model>::new()])
            .into_connection();

        let model = build_record(&db, &staff, &employee, &GeneratePayroll {
            employee_id: 3,
            month: 6,
            year: 2024,
            base_salary: None,
            bonus: None,
            overtime: None,
            allowances: None,
            deductions: None,
            notes: None,
        }).await;

        assert_eq!(model.base_salary.clone().unwrap(), Decimal::from(3000));
        assert_eq!(model.total_pay.clone().unwrap(), Decimal::from(3000));
    }

    #[actix_web::test]
    async fn test_bulk_generate_partial_success() {
        let secret = b"secret";
        let token = Authority::new(secret).issue_for(&test_user(1, RoleType::Hr));

        // First employee already has a record for the period, second generates
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![test_employee(3, 5, 3000), test_employee(4, 6, 4000)]])
            .append_query_results([vec![test_record(1, 3, PayrollStatus::Pending)]])
            .append_query_results([Vec::<payroll::Model>::new()])
            .append_query_results([Vec::<crate::entity::leave::Model>::new()])
            .append_query_results([Vec::<crate::entity::attendance::Model>::new()])
            .append_query_results([vec![test_record(2, 4, PayrollStatus::Pending)]]);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(Authority::new(secret)))
                .app_data(web::Data::new(db.into_connection()))
                .service(web::scope("/payroll").service(bulk_generate))
        ).await;

        let req = test::TestRequest::default()
            .uri("/payroll/bulk")
            .method(Method::POST)
            .insert_header(("Authorization", format!("JWT {token}")))
            .set_json(BulkGenerate { month: 6, year: 2024 })
            .to_request();

        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let body: serde_json::Value = test::read_body_json(response).await;
        assert_eq!(body["data"]["generated"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"]["errors"].as_array().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn test_cancel_paid_record() {
        let secret = b"secret";
        let token = Authority::new(secret).issue_for(&test_user(1, RoleType::Admin));

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![test_record(1, 3, PayrollStatus::Paid)]]);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(Authority::new(secret)))
                .app_data(web::Data::new(db.into_connection()))
                .service(cancel_payroll)
        ).await;

        let req = test::TestRequest::default()
            .uri("/1/cancel")
            .method(Method::PUT)
            .insert_header(("Authorization", format!("JWT {token}")))
            .set_json(CancelPayroll { reason: None })
            .to_request();

        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[actix_web::test]
    async fn test_mark_paid_cancelled_record_is_permitted() {
        let secret = b"secret";
        let token = Authority::new(secret).issue_for(&test_user(1, RoleType::Admin));

        let mut paid = test_record(1, 3, PayrollStatus::Paid);
        paid.paid_by = Some(1);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                vec![test_record(1, 3, PayrollStatus::Cancelled)],
                vec![paid],
            ]);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(Authority::new(secret)))
                .app_data(web::Data::new(db.into_connection()))
                .service(mark_paid)
        ).await;

        let req = test::TestRequest::default()
            .uri("/1/mark-paid")
            .method(Method::PUT)
            .insert_header(("Authorization", format!("JWT {token}")))
            .set_json(MarkPaid { payment_date: None })
            .to_request();

        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
