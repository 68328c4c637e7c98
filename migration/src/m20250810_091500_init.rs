use sea_orm_migration::{prelude::{extension::postgres::TypeDropStatement, *}, sea_orm::{ActiveEnum, ConnectionTrait as _, DbBackend, DeriveActiveEnum, EnumIter, Schema}};

use crate::util::{default_table_statement, DefaultColumn};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let schema = Schema::new(DbBackend::Postgres);

        manager.create_type(schema.create_enum_from_active_enum::<RoleType>()).await?;
        manager.create_type(schema.create_enum_from_active_enum::<AttendanceStatus>()).await?;
        manager.create_type(schema.create_enum_from_active_enum::<LeaveType>()).await?;
        manager.create_type(schema.create_enum_from_active_enum::<LeaveStatus>()).await?;
        manager.create_type(schema.create_enum_from_active_enum::<PayrollStatus>()).await?;

        manager
            .create_table(default_table_statement()
                .table(User::Table)
                .col(ColumnDef::new(User::Name)
                    .text()
                    .not_null())
                .col(ColumnDef::new(User::Email)
                    .text()
                    .unique_key()
                    .not_null())
                .col(ColumnDef::new(User::Password)
                    .binary()
                    .not_null()) // Password should be in a hashed format
                .col(ColumnDef::new(User::Role)
                    .custom(RoleType::name())
                    .not_null())
                .col(ColumnDef::new(User::IsActive)
                    .boolean()
                    .not_null()
                    .default(true))
                .take()
            ).await?;

        manager
            .create_table(default_table_statement()
                .table(Department::Table)
                .col(ColumnDef::new(Department::Name)
                    .text()
                    .unique_key()
                    .not_null())
                .col(ColumnDef::new(Department::Description)
                    .text())
                .col(ColumnDef::new(Department::IsActive)
                    .boolean()
                    .not_null()
                    .default(true))
                .take()
            ).await?;

        manager
            .create_table(default_table_statement()
                .table(Employee::Table)
                .col(ColumnDef::new(Employee::UserId)
                    .integer()
                    .unique_key()
                    .not_null())
                .col(ColumnDef::new(Employee::DepartmentId)
                    .integer()
                    .not_null())
                .col(ColumnDef::new(Employee::Name)
                    .text()
                    .not_null())
                .col(ColumnDef::new(Employee::Email)
                    .text()
                    .unique_key()
                    .not_null())
                .col(ColumnDef::new(Employee::Phone)
                    .text())
                .col(ColumnDef::new(Employee::Address)
                    .text())
                .col(ColumnDef::new(Employee::Designation)
                    .text()
                    .not_null())
                .col(ColumnDef::new(Employee::Salary)
                    .decimal_len(10, 2)
                    .not_null())
                .col(ColumnDef::new(Employee::JoiningDate)
                    .date()
                    .not_null())
                .col(ColumnDef::new(Employee::IsActive)
                    .boolean()
                    .not_null()
                    .default(true))
                .take()
            ).await?;

        manager.create_foreign_key(ForeignKeyCreateStatement::new()
            .from(Employee::Table, Employee::UserId)
            .to(User::Table, DefaultColumn::Id)
            .take()
        ).await?;

        manager.create_foreign_key(ForeignKeyCreateStatement::new()
            .from(Employee::Table, Employee::DepartmentId)
            .to(Department::Table, DefaultColumn::Id)
            .take()
        ).await?;

        manager
            .create_table(default_table_statement()
                .table(Attendance::Table)
                .col(ColumnDef::new(Attendance::EmployeeId)
                    .integer()
                    .not_null())
                .col(ColumnDef::new(Attendance::Date)
                    .date()
                    .not_null())
                .col(ColumnDef::new(Attendance::CheckIn)
                    .time())
                .col(ColumnDef::new(Attendance::CheckOut)
                    .time())
                .col(ColumnDef::new(Attendance::Status)
                    .custom(AttendanceStatus::name())
                    .not_null())
                .col(ColumnDef::new(Attendance::WorkingHours)
                    .decimal_len(4, 2))
                .col(ColumnDef::new(Attendance::IsLate)
                    .boolean()
                    .not_null()
                    .default(false))
                .col(ColumnDef::new(Attendance::LateMinutes)
                    .integer())
                .col(ColumnDef::new(Attendance::OvertimeHours)
                    .decimal_len(4, 2))
                .col(ColumnDef::new(Attendance::Notes)
                    .text())
                .take()
            ).await?;

        manager.create_foreign_key(ForeignKeyCreateStatement::new()
            .from(Attendance::Table, Attendance::EmployeeId)
            .to(Employee::Table, DefaultColumn::Id)
            .take()
        ).await?;

        // One attendance row per employee and calendar date
        manager.create_index(IndexCreateStatement::new()
            .name("idx_attendance_employee_date")
            .table(Attendance::Table)
            .col(Attendance::EmployeeId)
            .col(Attendance::Date)
            .unique()
            .take()
        ).await?;

        manager
            .create_table(default_table_statement()
                .table(Leave::Table)
                .col(ColumnDef::new(Leave::EmployeeId)
                    .integer()
                    .not_null())
                .col(ColumnDef::new(Leave::StartDate)
                    .date()
                    .not_null())
                .col(ColumnDef::new(Leave::EndDate)
                    .date()
                    .not_null())
                .col(ColumnDef::new(Leave::Reason)
                    .text()
                    .not_null())
                .col(ColumnDef::new(Leave::LeaveType)
                    .custom(LeaveType::name())
                    .not_null())
                .col(ColumnDef::new(Leave::Status)
                    .custom(LeaveStatus::name())
                    .not_null())
                .col(ColumnDef::new(Leave::TotalDays)
                    .integer()
                    .not_null())
                .col(ColumnDef::new(Leave::ApprovedBy)
                    .integer())
                .col(ColumnDef::new(Leave::ApprovedAt)
                    .timestamp_with_time_zone())
                .col(ColumnDef::new(Leave::RejectionReason)
                    .text())
                .col(ColumnDef::new(Leave::Notes)
                    .text())
                .take()
            ).await?;

        manager.create_foreign_key(ForeignKeyCreateStatement::new()
            .from(Leave::Table, Leave::EmployeeId)
            .to(Employee::Table, DefaultColumn::Id)
            .take()
        ).await?;

        manager.create_foreign_key(ForeignKeyCreateStatement::new()
            .from(Leave::Table, Leave::ApprovedBy)
            .to(User::Table, DefaultColumn::Id)
            .on_delete(ForeignKeyAction::SetNull)
            .take()
        ).await?;

        // Overlap checks scan by employee and range
        manager.create_index(IndexCreateStatement::new()
            .name("idx_leave_employee_range")
            .table(Leave::Table)
            .col(Leave::EmployeeId)
            .col(Leave::StartDate)
            .col(Leave::EndDate)
            .take()
        ).await?;

        // Storage-level backstop for the non-overlap invariant: two pending
        // or approved ranges of one employee must never intersect, even when
        // requests race past the handler's pre-check
        manager.get_connection().execute_unprepared(
            "CREATE EXTENSION IF NOT EXISTS btree_gist"
        ).await?;

        manager.get_connection().execute_unprepared(
            "ALTER TABLE \"leave\" ADD CONSTRAINT \"excl_leave_overlap\" \
             EXCLUDE USING gist (\"employee_id\" WITH =, daterange(\"start_date\", \"end_date\", '[]') WITH &&) \
             WHERE (\"status\" IN ('pending', 'approved'))"
        ).await?;

        manager
            .create_table(default_table_statement()
                .table(Payroll::Table)
                .col(ColumnDef::new(Payroll::EmployeeId)
                    .integer()
                    .not_null())
                .col(ColumnDef::new(Payroll::Month)
                    .integer()
                    .not_null())
                .col(ColumnDef::new(Payroll::Year)
                    .integer()
                    .not_null())
                .col(ColumnDef::new(Payroll::BaseSalary)
                    .decimal_len(10, 2)
                    .not_null())
                .col(ColumnDef::new(Payroll::Bonus)
                    .decimal_len(10, 2)
                    .not_null()
                    .default(0))
                .col(ColumnDef::new(Payroll::Overtime)
                    .decimal_len(10, 2)
                    .not_null()
                    .default(0))
                .col(ColumnDef::new(Payroll::Allowances)
                    .decimal_len(10, 2)
                    .not_null()
                    .default(0))
                .col(ColumnDef::new(Payroll::Deductions)
                    .decimal_len(10, 2)
                    .not_null()
                    .default(0))
                .col(ColumnDef::new(Payroll::LeaveDeductions)
                    .decimal_len(10, 2)
                    .not_null()
                    .default(0))
                .col(ColumnDef::new(Payroll::AttendanceBonus)
                    .decimal_len(10, 2)
                    .not_null()
                    .default(0))
                .col(ColumnDef::new(Payroll::TotalPay)
                    .decimal_len(10, 2)
                    .not_null())
                .col(ColumnDef::new(Payroll::Status)
                    .custom(PayrollStatus::name())
                    .not_null())
                .col(ColumnDef::new(Payroll::Notes)
                    .text())
                .col(ColumnDef::new(Payroll::GeneratedBy)
                    .integer())
                .col(ColumnDef::new(Payroll::GeneratedAt)
                    .timestamp_with_time_zone())
                .col(ColumnDef::new(Payroll::PaidBy)
                    .integer())
                .col(ColumnDef::new(Payroll::PaidAt)
                    .timestamp_with_time_zone())
                .col(ColumnDef::new(Payroll::PaymentDate)
                    .date())
                .take()
            ).await?;

        manager.create_foreign_key(ForeignKeyCreateStatement::new()
            .from(Payroll::Table, Payroll::EmployeeId)
            .to(Employee::Table, DefaultColumn::Id)
            .take()
        ).await?;

        manager.create_foreign_key(ForeignKeyCreateStatement::new()
            .from(Payroll::Table, Payroll::GeneratedBy)
            .to(User::Table, DefaultColumn::Id)
            .on_delete(ForeignKeyAction::SetNull)
            .take()
        ).await?;

        manager.create_foreign_key(ForeignKeyCreateStatement::new()
            .from(Payroll::Table, Payroll::PaidBy)
            .to(User::Table, DefaultColumn::Id)
            .on_delete(ForeignKeyAction::SetNull)
            .take()
        ).await?;

        // One payroll row per employee and period
        manager.create_index(IndexCreateStatement::new()
            .name("idx_payroll_employee_period")
            .table(Payroll::Table)
            .col(Payroll::EmployeeId)
            .col(Payroll::Month)
            .col(Payroll::Year)
            .unique()
            .take()
        ).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [Payroll::Table.into_iden(), Leave::Table.into_iden(), Attendance::Table.into_iden(), Employee::Table.into_iden(), Department::Table.into_iden(), User::Table.into_iden()] {
            manager.drop_table(
                TableDropStatement::new()
                    .table(table)
                    .take()
            ).await?;
        }

        for name in [PayrollStatus::name(), LeaveStatus::name(), LeaveType::name(), AttendanceStatus::name(), RoleType::name()] {
            manager.drop_type(
                TypeDropStatement::new()
                    .name(name)
                    .to_owned()
            ).await?;
        }

        Ok(())
    }
}

#[derive(Iden)]
pub(crate) enum User {
    Table,
    Name,
    Email,
    Password,
    Role,
    IsActive,
}

#[derive(Iden)]
pub(crate) enum Department {
    Table,
    Name,
    Description,
    IsActive,
}

#[derive(Iden)]
pub(crate) enum Employee {
    Table,
    UserId,
    DepartmentId,
    Name,
    Email,
    Phone,
    Address,
    Designation,
    Salary,
    JoiningDate,
    IsActive,
}

#[derive(Iden)]
enum Attendance {
    Table,
    EmployeeId,
    Date,
    CheckIn,
    CheckOut,
    Status,
    WorkingHours,
    IsLate,
    LateMinutes,
    OvertimeHours,
    Notes,
}

#[derive(Iden)]
enum Leave {
    Table,
    EmployeeId,
    StartDate,
    EndDate,
    Reason,
    LeaveType,
    Status,
    TotalDays,
    ApprovedBy,
    ApprovedAt,
    RejectionReason,
    Notes,
}

#[derive(Iden)]
enum Payroll {
    Table,
    EmployeeId,
    Month,
    Year,
    BaseSalary,
    Bonus,
    Overtime,
    Allowances,
    Deductions,
    LeaveDeductions,
    AttendanceBonus,
    TotalPay,
    Status,
    Notes,
    GeneratedBy,
    GeneratedAt,
    PaidBy,
    PaidAt,
    PaymentDate,
}

#[derive(EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "role_type")]
enum RoleType {
    #[sea_orm(string_value = "admin")]
    Admin,
    #[sea_orm(string_value = "hr")]
    Hr,
    #[sea_orm(string_value = "employee")]
    Employee,
}

#[derive(EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "attendance_status")]
enum AttendanceStatus {
    #[sea_orm(string_value = "present")]
    Present,
    #[sea_orm(string_value = "absent")]
    Absent,
    #[sea_orm(string_value = "late")]
    Late,
    #[sea_orm(string_value = "half_day")]
    HalfDay,
}

#[derive(EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "leave_type")]
enum LeaveType {
    #[sea_orm(string_value = "sick")]
    Sick,
    #[sea_orm(string_value = "vacation")]
    Vacation,
    #[sea_orm(string_value = "personal")]
    Personal,
    #[sea_orm(string_value = "maternity")]
    Maternity,
    #[sea_orm(string_value = "paternity")]
    Paternity,
    #[sea_orm(string_value = "emergency")]
    Emergency,
    #[sea_orm(string_value = "other")]
    Other,
}

#[derive(EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "leave_status")]
enum LeaveStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

#[derive(EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "payroll_status")]
enum PayrollStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "paid")]
    Paid,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}
