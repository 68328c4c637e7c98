use chrono::NaiveDate;
use sea_orm::prelude::Decimal;

use crate::pages::EmployeeBrief;

use super::*;

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct ListFilter {
    pub(super) employee_id: Option<i32>,
    pub(super) status: Option<AttendanceStatus>,
    pub(super) start_date: Option<NaiveDate>,
    pub(super) end_date: Option<NaiveDate>,
    pub(super) month: Option<i32>,
    pub(super) year: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct MyFilter {
    pub(super) status: Option<AttendanceStatus>,
    pub(super) start_date: Option<NaiveDate>,
    pub(super) end_date: Option<NaiveDate>,
    pub(super) month: Option<i32>,
    pub(super) year: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct MarkAttendance {
    pub(super) employee_id: i32,
    pub(super) date: NaiveDate,
    pub(super) check_in: Option<String>,
    pub(super) check_out: Option<String>,
    pub(super) status: AttendanceStatus,
    pub(super) notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct UpdateAttendance {
    pub(super) check_in: Option<String>,
    pub(super) check_out: Option<String>,
    pub(super) status: Option<AttendanceStatus>,
    pub(super) notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct CheckNotes {
    pub(super) notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct PeriodStats {
    pub(super) month: i32,
    pub(super) year: i32,
    pub(super) total_records: usize,
    pub(super) present: usize,
    pub(super) absent: usize,
    pub(super) late: usize,
    pub(super) half_day: usize,
    pub(super) average_working_hours: Decimal,
}

#[derive(Debug, Serialize)]
pub(super) struct MonthlySummary {
    pub(super) employee: EmployeeBrief,
    pub(super) month: i32,
    pub(super) year: i32,
    pub(super) total_days: usize,
    pub(super) present_days: usize,
    pub(super) absent_days: usize,
    pub(super) late_days: usize,
    pub(super) half_days: usize,
    pub(super) total_working_hours: Decimal,
    pub(super) average_working_hours: Decimal,
    pub(super) records: Vec<attendance::Model>,
}

#[derive(Debug, Serialize)]
pub(super) struct TodayStatus {
    pub(super) date: NaiveDate,
    pub(super) marked: bool,
    pub(super) record: Option<attendance::Model>,
}
