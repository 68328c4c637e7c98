use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::PayrollStatus;

/// One row per (employee, month, year); the triple carries a unique index.
///
/// `leave_deductions` and `attendance_bonus` are derived once at generation
/// time and kept as stored components afterwards.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payroll")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub employee_id: i32,
    pub month: i32,
    pub year: i32,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub base_salary: Decimal,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub bonus: Decimal,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub overtime: Decimal,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub allowances: Decimal,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub deductions: Decimal,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub leave_deductions: Decimal,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub attendance_bonus: Decimal,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub total_pay: Decimal,
    pub status: PayrollStatus,
    pub notes: Option<String>,
    pub generated_by: Option<i32>,
    pub generated_at: Option<DateTimeWithTimeZone>,
    pub paid_by: Option<i32>,
    pub paid_at: Option<DateTimeWithTimeZone>,
    pub payment_date: Option<Date>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::employee::Entity",
        from = "Column::EmployeeId",
        to = "super::employee::Column::Id"
    )]
    Employee,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::GeneratedBy",
        to = "super::user::Column::Id"
    )]
    GeneratedBy,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::PaidBy",
        to = "super::user::Column::Id"
    )]
    PaidBy,
}

impl Related<super::employee::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Employee.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
