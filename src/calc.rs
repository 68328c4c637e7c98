//! Payroll and attendance derivations.
//!
//! Everything here operates on plain rows and values; the two period
//! calculators read their inputs through the passed-in connection and absorb
//! lookup failures, so payroll generation never aborts on a degraded bonus or
//! deduction figure.

use chrono::{NaiveTime, Timelike as _};
use sea_orm::{prelude::Decimal, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use tracing::warn;

use crate::{
    consts,
    entity::{attendance, employee, leave, prelude::*, sea_orm_active_enums::{AttendanceStatus, LeaveStatus}},
    error::ApiError,
    utils,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkDay {
    pub working_hours: Decimal,
    pub is_late: bool,
    pub late_minutes: Option<i32>,
    /// `None` when the day produced no overtime; distinct from a computed zero.
    pub overtime_hours: Option<Decimal>,
}

/// Derives worked hours, lateness and overtime from a same-day check-in /
/// check-out pair at HH:MM granularity.
pub fn derive_work_day(check_in: NaiveTime, check_out: NaiveTime) -> Result<WorkDay, ApiError> {
    if check_out < check_in {
        return Err(ApiError::Validation(
            "check-out time must be after check-in time".to_string(),
        ));
    }

    let worked_minutes = (check_out - check_in).num_minutes();
    let working_hours = (Decimal::from(worked_minutes) / Decimal::from(60)).round_dp(2);

    let check_in_minutes = i64::from(check_in.hour()) * 60 + i64::from(check_in.minute());
    let is_late = check_in_minutes > consts::STANDARD_START_MINUTES;
    let late_minutes = is_late.then(|| (check_in_minutes - consts::STANDARD_START_MINUTES) as i32);

    let standard = Decimal::from(consts::STANDARD_DAY_HOURS);
    let overtime_hours = (working_hours > standard).then(|| working_hours - standard);

    Ok(WorkDay {
        working_hours,
        is_late,
        late_minutes,
        overtime_hours,
    })
}

/// Sums the approved unpaid-leave days whose range *starts* in the given month
/// and converts them to money at salary / 30 per day.
///
/// A leave spanning a month boundary counts wholly against its start month.
pub async fn leave_deductions(
    db: &DatabaseConnection,
    employee: &employee::Model,
    month: i32,
    year: i32,
) -> Decimal {
    let Some((first_day, last_day)) = utils::month_bounds(month, year) else {
        return Decimal::ZERO;
    };

    let leaves = match Leave::find()
        .filter(leave::Column::EmployeeId.eq(employee.id))
        .filter(leave::Column::Status.eq(LeaveStatus::Approved))
        .filter(leave::Column::StartDate.between(first_day, last_day))
        .all(db)
        .await
    {
        Ok(leaves) => leaves,
        Err(err) => {
            warn!(%err, employee_id = employee.id, "leave lookup failed, deduction degraded to 0");
            return Decimal::ZERO;
        }
    };

    let unpaid_days: i64 = leaves
        .iter()
        .filter(|leave| consts::UNPAID_LEAVE_TYPES.contains(&leave.leave_type))
        .map(|leave| i64::from(leave.total_days))
        .sum();

    let daily_rate = employee.salary / Decimal::from(consts::DAILY_RATE_DIVISOR);

    (Decimal::from(unpaid_days) * daily_rate).round_dp(2)
}

/// Maps the month's present-day percentage to a flat bonus: 100% earns the
/// perfect tier, 90% and up the good tier, everything else nothing.
pub async fn attendance_bonus_for(
    db: &DatabaseConnection,
    employee_id: i32,
    month: i32,
    year: i32,
) -> Decimal {
    let Some((first_day, last_day)) = utils::month_bounds(month, year) else {
        return Decimal::ZERO;
    };

    let records = match Attendance::find()
        .filter(attendance::Column::EmployeeId.eq(employee_id))
        .filter(attendance::Column::Date.between(first_day, last_day))
        .all(db)
        .await
    {
        Ok(records) => records,
        Err(err) => {
            warn!(%err, employee_id, "attendance lookup failed, bonus degraded to 0");
            return Decimal::ZERO;
        }
    };

    let recorded_days = records.len() as i64;
    if recorded_days == 0 {
        return Decimal::ZERO;
    }

    let present_days = records
        .iter()
        .filter(|record| record.status == AttendanceStatus::Present)
        .count() as i64;

    if present_days == recorded_days {
        Decimal::from(consts::PERFECT_ATTENDANCE_BONUS)
    } else if present_days * 100 >= recorded_days * consts::GOOD_ATTENDANCE_PERCENT {
        Decimal::from(consts::GOOD_ATTENDANCE_BONUS)
    } else {
        Decimal::ZERO
    }
}

/// The one total-pay identity every payroll record satisfies. Totals may go
/// negative when manual deductions outweigh the rest; that is surfaced as-is.
pub fn total_pay(
    base_salary: Decimal,
    bonus: Decimal,
    overtime: Decimal,
    allowances: Decimal,
    attendance_bonus: Decimal,
    deductions: Decimal,
    leave_deductions: Decimal,
) -> Decimal {
    base_salary + bonus + overtime + allowances + attendance_bonus - deductions - leave_deductions
}

#[cfg(test)]
mod tests {
    use chrono::{Local, NaiveDate};
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase};

    use crate::entity::{attendance, sea_orm_active_enums::LeaveType};

    use super::*;

    fn time(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    fn test_employee(salary: i64) -> employee::Model {
        employee::Model {
            id: 1,
            created_at: Local::now().into(),
            updated_at: Local::now().into(),
            user_id: 1,
            department_id: 1,
            name: "Bob".to_string(),
            email: "bob@example.com".to_string(),
            phone: None,
            address: None,
            designation: "Engineer".to_string(),
            salary: Decimal::from(salary),
            joining_date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            is_active: true,
        }
    }

    fn test_leave(leave_type: LeaveType, total_days: i32) -> leave::Model {
        leave::Model {
            id: 1,
            created_at: Local::now().into(),
            updated_at: Local::now().into(),
            employee_id: 1,
            start_date: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 6, 14).unwrap(),
            reason: "a reason long enough".to_string(),
            leave_type,
            status: LeaveStatus::Approved,
            total_days,
            approved_by: Some(2),
            approved_at: Some(Local::now().into()),
            rejection_reason: None,
            notes: None,
        }
    }

    fn test_attendance(day: u32, status: AttendanceStatus) -> attendance::Model {
        attendance::Model {
            id: day as i32,
            created_at: Local::now().into(),
            updated_at: Local::now().into(),
            employee_id: 1,
            date: NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
            check_in: None,
            check_out: None,
            status,
            working_hours: None,
            is_late: false,
            late_minutes: None,
            overtime_hours: None,
            notes: None,
        }
    }

    #[test]
    fn test_working_hours() {
        let day = derive_work_day(time(9, 0), time(17, 0)).unwrap();
        assert_eq!(day.working_hours, Decimal::from(8));

        let day = derive_work_day(time(9, 0), time(13, 30)).unwrap();
        assert_eq!(day.working_hours, Decimal::new(450, 2));

        // Equal times are a valid zero-hour day, not an error
        let day = derive_work_day(time(9, 0), time(9, 0)).unwrap();
        assert_eq!(day.working_hours, Decimal::ZERO);
    }

    #[test]
    fn test_reversed_pair_is_rejected() {
        let err = derive_work_day(time(17, 0), time(9, 0)).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn test_lateness_boundary() {
        let on_time = derive_work_day(time(9, 0), time(17, 0)).unwrap();
        assert!(!on_time.is_late);
        assert_eq!(on_time.late_minutes, None);

        let late = derive_work_day(time(9, 25), time(17, 0)).unwrap();
        assert!(late.is_late);
        assert_eq!(late.late_minutes, Some(25));

        let early = derive_work_day(time(8, 15), time(17, 0)).unwrap();
        assert!(!early.is_late);
        assert_eq!(early.late_minutes, None);
    }

    #[test]
    fn test_overtime_presence() {
        let regular = derive_work_day(time(9, 0), time(17, 0)).unwrap();
        assert_eq!(regular.overtime_hours, None);

        let long = derive_work_day(time(9, 0), time(19, 30)).unwrap();
        assert_eq!(long.overtime_hours, Some(Decimal::new(250, 2)));
    }

    #[actix_web::test]
    async fn test_leave_deductions_unpaid_type() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![test_leave(LeaveType::Sick, 5)]])
            .into_connection();

        let deduction = leave_deductions(&db, &test_employee(3000), 6, 2024).await;
        assert_eq!(deduction, Decimal::from(500));
    }

    #[actix_web::test]
    async fn test_leave_deductions_paid_type() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![test_leave(LeaveType::Vacation, 5)]])
            .into_connection();

        let deduction = leave_deductions(&db, &test_employee(3000), 6, 2024).await;
        assert_eq!(deduction, Decimal::ZERO);
    }

    #[actix_web::test]
    async fn test_leave_deductions_absorbs_lookup_failure() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_errors([DbErr::Custom("connection lost".to_string())])
            .into_connection();

        let deduction = leave_deductions(&db, &test_employee(3000), 6, 2024).await;
        assert_eq!(deduction, Decimal::ZERO);
    }

    #[actix_web::test]
    async fn test_attendance_bonus_tiers() {
        let perfect: Vec<_> = (1..=20).map(|d| test_attendance(d, AttendanceStatus::Present)).collect();

        let mut good: Vec<_> = (1..=18).map(|d| test_attendance(d, AttendanceStatus::Present)).collect();
        good.push(test_attendance(19, AttendanceStatus::Absent));
        good.push(test_attendance(20, AttendanceStatus::Late));

        let mut poor: Vec<_> = (1..=17).map(|d| test_attendance(d, AttendanceStatus::Present)).collect();
        poor.extend((18..=20).map(|d| test_attendance(d, AttendanceStatus::Absent)));

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([perfect, good, poor, Vec::new()])
            .into_connection();

        assert_eq!(attendance_bonus_for(&db, 1, 6, 2024).await, Decimal::from(500));
        assert_eq!(attendance_bonus_for(&db, 1, 6, 2024).await, Decimal::from(200));
        assert_eq!(attendance_bonus_for(&db, 1, 6, 2024).await, Decimal::ZERO);
        // Zero recorded days must not divide by zero
        assert_eq!(attendance_bonus_for(&db, 1, 6, 2024).await, Decimal::ZERO);
    }

    #[actix_web::test]
    async fn test_attendance_bonus_absorbs_lookup_failure() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_errors([DbErr::Custom("connection lost".to_string())])
            .into_connection();

        assert_eq!(attendance_bonus_for(&db, 1, 6, 2024).await, Decimal::ZERO);
    }

    #[test]
    fn test_total_pay_identity() {
        let total = total_pay(
            Decimal::from(3000),
            Decimal::from(100),
            Decimal::from(50),
            Decimal::from(80),
            Decimal::from(200),
            Decimal::from(30),
            Decimal::from(500),
        );

        assert_eq!(total, Decimal::from(2900));
    }

    #[test]
    fn test_total_pay_may_go_negative() {
        let total = total_pay(
            Decimal::from(1000),
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::from(2000),
            Decimal::ZERO,
        );

        assert_eq!(total, Decimal::from(-1000));
    }
}
