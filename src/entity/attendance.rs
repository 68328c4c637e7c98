use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::AttendanceStatus;

/// One row per (employee, calendar date); the pair carries a unique index.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "attendance")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub employee_id: i32,
    pub date: Date,
    pub check_in: Option<Time>,
    pub check_out: Option<Time>,
    pub status: AttendanceStatus,
    /// Never negative; a reversed check-in/check-out pair is rejected upstream.
    #[sea_orm(column_type = "Decimal(Some((4, 2)))", nullable)]
    pub working_hours: Option<Decimal>,
    pub is_late: bool,
    pub late_minutes: Option<i32>,
    #[sea_orm(column_type = "Decimal(Some((4, 2)))", nullable)]
    pub overtime_hours: Option<Decimal>,
    pub notes: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::employee::Entity",
        from = "Column::EmployeeId",
        to = "super::employee::Column::Id"
    )]
    Employee,
}

impl Related<super::employee::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Employee.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
