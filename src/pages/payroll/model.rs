use super::*;

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct ListFilter {
    pub(super) employee_id: Option<i32>,
    pub(super) month: Option<i32>,
    pub(super) year: Option<i32>,
    pub(super) status: Option<PayrollStatus>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct GeneratePayroll {
    pub(super) employee_id: i32,
    pub(super) month: i32,
    pub(super) year: i32,
    /// Overrides the employee's stored salary as the base for this period.
    #[serde(default)]
    pub(super) base_salary: Option<Decimal>,
    #[serde(default)]
    pub(super) bonus: Option<Decimal>,
    #[serde(default)]
    pub(super) overtime: Option<Decimal>,
    #[serde(default)]
    pub(super) allowances: Option<Decimal>,
    #[serde(default)]
    pub(super) deductions: Option<Decimal>,
    pub(super) notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct BulkGenerate {
    pub(super) month: i32,
    pub(super) year: i32,
}

#[derive(Debug, Serialize)]
pub(super) struct BulkOutcome {
    pub(super) generated: Vec<payroll::Model>,
    pub(super) errors: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct UpdatePayroll {
    pub(super) base_salary: Option<Decimal>,
    pub(super) bonus: Option<Decimal>,
    pub(super) overtime: Option<Decimal>,
    pub(super) allowances: Option<Decimal>,
    pub(super) deductions: Option<Decimal>,
    pub(super) notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct MarkPaid {
    pub(super) payment_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct CancelPayroll {
    pub(super) reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct StatsFilter {
    pub(super) month: Option<i32>,
    pub(super) year: Option<i32>,
}

#[derive(Debug, Serialize)]
pub(super) struct PeriodStats {
    pub(super) month: i32,
    pub(super) year: i32,
    pub(super) total_records: usize,
    pub(super) pending: usize,
    pub(super) paid: usize,
    pub(super) cancelled: usize,
    pub(super) total_payout: Decimal,
    pub(super) total_paid: Decimal,
    pub(super) average_total_pay: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct SummaryFilter {
    pub(super) year: Option<i32>,
}

#[derive(Debug, Serialize)]
pub(super) struct MonthlyPay {
    pub(super) month: i32,
    pub(super) status: PayrollStatus,
    pub(super) total_pay: Decimal,
}

#[derive(Debug, Serialize)]
pub(super) struct YearSummary {
    pub(super) employee: EmployeeBrief,
    pub(super) year: i32,
    pub(super) total_earned: Decimal,
    pub(super) months_paid: usize,
    pub(super) months_pending: usize,
    pub(super) average_monthly: Decimal,
    pub(super) monthly: Vec<MonthlyPay>,
}
