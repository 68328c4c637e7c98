pub use super::attendance::Entity as Attendance;
pub use super::department::Entity as Department;
pub use super::employee::Entity as Employee;
pub use super::leave::Entity as Leave;
pub use super::payroll::Entity as Payroll;
pub use super::user::Entity as User;
