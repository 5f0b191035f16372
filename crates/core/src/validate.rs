//! Field-level validation shared by the entity constructors.
//!
//! Every helper returns `DomainError::Validation` naming the offending field,
//! so HTTP callers get a message they can map back to a form input.

use chrono::NaiveDate;

use crate::error::{DomainError, DomainResult};

/// Upper bound for free-text names (family name, country, child name, staff name).
pub const MAX_NAME_LEN: usize = 100;

/// Trim `value` and require it to be non-empty and at most `max` characters.
pub fn required_text(field: &str, value: &str, max: usize) -> DomainResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} is required")));
    }
    if trimmed.chars().count() > max {
        return Err(DomainError::validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Optional free text: blank input collapses to `None`.
pub fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// A body measurement (height, weight): finite and strictly positive.
pub fn positive_measure(field: &str, value: f64) -> DomainResult<f64> {
    if !value.is_finite() || value <= 0.0 {
        return Err(DomainError::validation(format!(
            "{field} must be a positive number"
        )));
    }
    Ok(value)
}

/// A finite, non-negative number (bone age in years).
pub fn non_negative(field: &str, value: f64) -> DomainResult<f64> {
    if !value.is_finite() || value < 0.0 {
        return Err(DomainError::validation(format!(
            "{field} must be zero or greater"
        )));
    }
    Ok(value)
}

/// A calendar date that must not lie after `today`.
pub fn not_in_future(field: &str, value: NaiveDate, today: NaiveDate) -> DomainResult<NaiveDate> {
    if value > today {
        return Err(DomainError::validation(format!(
            "{field} cannot be in the future"
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn required_text_trims_and_rejects_blank() {
        assert_eq!(required_text("name", "  Ada ", 10).unwrap(), "Ada");
        assert!(matches!(
            required_text("name", "   ", 10),
            Err(DomainError::Validation(msg)) if msg == "name is required"
        ));
        assert!(required_text("name", "abcdefghijk", 10).is_err());
    }

    #[test]
    fn optional_text_collapses_blank() {
        assert_eq!(optional_text(Some("  ".into())), None);
        assert_eq!(optional_text(Some(" ok ".into())), Some("ok".into()));
        assert_eq!(optional_text(None), None);
    }

    #[test]
    fn measures_must_be_positive_and_finite() {
        assert!(positive_measure("height", 0.0).is_err());
        assert!(positive_measure("height", -1.0).is_err());
        assert!(positive_measure("height", f64::NAN).is_err());
        assert!(positive_measure("height", f64::INFINITY).is_err());
        assert_eq!(positive_measure("height", 101.5).unwrap(), 101.5);
        assert_eq!(non_negative("bone_age", 0.0).unwrap(), 0.0);
    }

    #[test]
    fn future_dates_rejected() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let tomorrow = NaiveDate::from_ymd_opt(2024, 6, 2).unwrap();
        assert!(not_in_future("birthday", today, today).is_ok());
        assert!(not_in_future("birthday", tomorrow, today).is_err());
    }

    proptest! {
        #[test]
        fn any_positive_finite_measure_is_accepted(v in 0.001f64..500.0) {
            prop_assert_eq!(positive_measure("weight", v).unwrap(), v);
        }
    }
}
