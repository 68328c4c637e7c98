use std::ops::RangeInclusive;

use crate::entity::sea_orm_active_enums::LeaveType;

/// Standard workday begins at 09:00; check-ins after this are late.
pub const STANDARD_START_MINUTES: i64 = 9 * 60;

/// Hours per full working day; anything beyond counts as overtime.
pub const STANDARD_DAY_HOURS: i64 = 8;

/// Daily rate is monthly salary divided by 30, regardless of calendar month length.
pub const DAILY_RATE_DIVISOR: i64 = 30;

/// Flat bonus for a month with 100% present days.
pub const PERFECT_ATTENDANCE_BONUS: i64 = 500;

/// Flat bonus for a month with at least 90% present days.
pub const GOOD_ATTENDANCE_BONUS: i64 = 200;

pub const GOOD_ATTENDANCE_PERCENT: i64 = 90;

/// Leave types that reduce pay. Everything else is paid leave.
pub const UNPAID_LEAVE_TYPES: [LeaveType; 2] = [LeaveType::Sick, LeaveType::Emergency];

pub const MONTH_RANGE: RangeInclusive<i32> = 1..=12;
pub const YEAR_RANGE: RangeInclusive<i32> = 2020..=2030;

pub const MIN_REJECTION_REASON_LEN: usize = 10;
pub const REASON_LEN: RangeInclusive<usize> = 10..=1000;
pub const MIN_PASSWORD_LEN: usize = 6;
