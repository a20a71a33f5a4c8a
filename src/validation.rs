// src/validation.rs
//! Field checks applied at the handler boundary. Each returns the cleaned value
//! or an [`AppError::Validation`] naming the field.

use chrono::NaiveTime;

use crate::error::AppError;

pub const ZONE_NAME_MAX: usize = 120;
pub const NEWS_TITLE_MAX: usize = 200;

/// Trimmed, non-empty, at most `max` characters.
pub fn required_text(field: &str, value: Option<&str>, max: Option<usize>) -> Result<String, AppError> {
    let value = value.map(str::trim).unwrap_or_default();
    if value.is_empty() {
        return Err(AppError::validation(format!("{field} is required")));
    }
    if let Some(max) = max {
        if value.chars().count() > max {
            return Err(AppError::validation(format!(
                "{field} must be at most {max} characters"
            )));
        }
    }
    Ok(value.to_string())
}

pub fn optional_text(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

pub fn capacity(value: Option<i64>) -> Result<Option<u32>, AppError> {
    match value {
        None => Ok(None),
        Some(v) if v < 0 => Err(AppError::validation("capacity must be zero or greater")),
        Some(v) => u32::try_from(v)
            .map(Some)
            .map_err(|_| AppError::validation("capacity is too large")),
    }
}

pub fn day_of_week(value: Option<i64>) -> Result<u8, AppError> {
    match value {
        Some(v @ 0..=6) => Ok(v as u8),
        Some(_) => Err(AppError::validation("day_of_week must be between 0 and 6")),
        None => Err(AppError::validation("day_of_week is required")),
    }
}

/// `HH:MM` (24h).
pub fn clock_time(field: &str, value: Option<&str>) -> Result<NaiveTime, AppError> {
    let raw = value.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Err(AppError::validation(format!("{field} is required")));
    }
    NaiveTime::parse_from_str(raw, "%H:%M")
        .map_err(|_| AppError::validation(format!("{field} must use HH:MM")))
}

pub fn time_range(start: Option<&str>, end: Option<&str>) -> Result<(String, String), AppError> {
    let start = clock_time("start_time", start)?;
    let end = clock_time("end_time", end)?;
    if start >= end {
        return Err(AppError::validation("start_time must be before end_time"));
    }
    Ok((start.format("%H:%M").to_string(), end.format("%H:%M").to_string()))
}

pub fn rating(value: Option<i64>) -> Result<u8, AppError> {
    match value {
        Some(v @ 1..=5) => Ok(v as u8),
        Some(_) => Err(AppError::validation("rating must be between 1 and 5")),
        None => Err(AppError::validation("rating is required")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_text_trims_and_bounds() {
        assert_eq!(required_text("name", Some("  Hall A "), Some(10)).unwrap(), "Hall A");
        assert!(required_text("name", Some("   "), None).is_err());
        assert!(required_text("name", None, None).is_err());
        let long = "x".repeat(ZONE_NAME_MAX + 1);
        let err = required_text("name", Some(&long), Some(ZONE_NAME_MAX)).unwrap_err();
        assert_eq!(err.to_string(), "name must be at most 120 characters");
    }

    #[test]
    fn capacity_rules() {
        assert_eq!(capacity(None).unwrap(), None);
        assert_eq!(capacity(Some(0)).unwrap(), Some(0));
        assert!(capacity(Some(-1)).is_err());
    }

    #[test]
    fn day_of_week_bounds() {
        assert_eq!(day_of_week(Some(0)).unwrap(), 0);
        assert_eq!(day_of_week(Some(6)).unwrap(), 6);
        assert!(day_of_week(Some(7)).is_err());
        assert!(day_of_week(Some(-1)).is_err());
        assert!(day_of_week(None).is_err());
    }

    #[test]
    fn time_range_normalizes_and_orders() {
        assert_eq!(
            time_range(Some("9:05"), Some("10:30")).unwrap(),
            ("09:05".to_string(), "10:30".to_string())
        );
        assert!(time_range(Some("10:00"), Some("10:00")).is_err());
        assert!(time_range(Some("11:00"), Some("10:00")).is_err());
        assert!(time_range(Some("25:00"), Some("26:00")).is_err());
        assert!(time_range(Some("noon"), Some("13:00")).is_err());
    }

    #[test]
    fn rating_bounds() {
        assert_eq!(rating(Some(5)).unwrap(), 5);
        assert!(rating(Some(0)).is_err());
        assert!(rating(Some(6)).is_err());
    }
}
