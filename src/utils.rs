use chrono::{Datelike as _, Days, NaiveDate, NaiveTime};

use crate::{consts, error::ApiError};

/// First and last calendar day of a month, both inclusive.
pub fn month_bounds(month: i32, year: i32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, u32::try_from(month).ok()?, 1)?;

    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, first.month() + 1, 1)?
    };

    Some((first, next_month.checked_sub_days(Days::new(1))?))
}

pub fn inclusive_days(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

/// Clock times arrive on the wire as "HH:MM"; a trailing seconds component is
/// tolerated.
pub fn parse_hhmm(value: &str) -> Result<NaiveTime, ApiError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| ApiError::Validation(format!("invalid time `{value}`, expected HH:MM")))
}

pub fn validate_period(month: i32, year: i32) -> Result<(), ApiError> {
    if !consts::MONTH_RANGE.contains(&month) {
        return Err(ApiError::Validation("month must be between 1 and 12".to_string()));
    }

    if !consts::YEAR_RANGE.contains(&year) {
        return Err(ApiError::Validation("year must be between 2020 and 2030".to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_bounds() {
        let (first, last) = month_bounds(6, 2024).unwrap();
        assert_eq!(first, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(last, NaiveDate::from_ymd_opt(2024, 6, 30).unwrap());

        let (first, last) = month_bounds(12, 2024).unwrap();
        assert_eq!(first, NaiveDate::from_ymd_opt(2024, 12, 1).unwrap());
        assert_eq!(last, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());

        let (_, last) = month_bounds(2, 2024).unwrap();
        assert_eq!(last, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());

        assert!(month_bounds(0, 2024).is_none());
        assert!(month_bounds(13, 2024).is_none());
    }

    #[test]
    fn test_inclusive_days() {
        let start = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 6, 14).unwrap();

        assert_eq!(inclusive_days(start, end), 5);
        assert_eq!(inclusive_days(start, start), 1);
    }

    #[test]
    fn test_parse_hhmm() {
        assert_eq!(parse_hhmm("09:00").unwrap(), NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(parse_hhmm("17:30:00").unwrap(), NaiveTime::from_hms_opt(17, 30, 0).unwrap());
        assert!(parse_hhmm("25:00").is_err());
        assert!(parse_hhmm("nine").is_err());
    }

    #[test]
    fn test_validate_period() {
        assert!(validate_period(6, 2024).is_ok());
        assert!(validate_period(0, 2024).is_err());
        assert!(validate_period(13, 2024).is_err());
        assert!(validate_period(6, 2019).is_err());
        assert!(validate_period(6, 2031).is_err());
    }
}
