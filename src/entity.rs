pub mod prelude;
pub mod sea_orm_active_enums;

pub mod attendance;
pub mod department;
pub mod employee;
pub mod leave;
pub mod payroll;
pub mod user;
