//! Validation utilities for raw record fields

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::str::FromStr;

use crate::types::*;

/// Date layouts seen in internal and custodian booking files
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y"];

/// Validate that an event key is usable for matching
pub fn validate_event_key(row_id: &str, field: &str, key: &str) -> Result<String, MalformedRecordError> {
    let key = key.trim();
    if key.is_empty() {
        return Err(MalformedRecordError::new(row_id, field, "cannot be empty"));
    }

    if key.len() > 64 {
        return Err(MalformedRecordError::new(
            row_id,
            field,
            "cannot exceed 64 characters",
        ));
    }

    if key.chars().any(|c| c.is_control()) {
        return Err(MalformedRecordError::new(
            row_id,
            field,
            "contains control characters",
        ));
    }

    Ok(key.to_string())
}

/// Validate a three-letter currency code; the trimmed code is kept verbatim
pub fn validate_currency_code(row_id: &str, field: &str, code: &str) -> Result<String, MalformedRecordError> {
    let code = code.trim();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(MalformedRecordError::new(
            row_id,
            field,
            format!("'{}' is not a three-letter currency code", code),
        ));
    }

    Ok(code.to_string())
}

/// Parse an exact decimal, accepting `,` as a thousands separator
pub fn parse_decimal(row_id: &str, field: &str, raw: &str) -> Result<BigDecimal, MalformedRecordError> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return Err(MalformedRecordError::new(row_id, field, "is empty"));
    }

    BigDecimal::from_str(&cleaned).map_err(|_| {
        MalformedRecordError::new(row_id, field, format!("'{}' is not a decimal", raw.trim()))
    })
}

/// Parse a percentage rate, with or without a trailing `%`
pub fn parse_rate(row_id: &str, field: &str, raw: &str) -> Result<BigDecimal, MalformedRecordError> {
    let trimmed = raw.trim();
    let without_sign = trimmed.strip_suffix('%').unwrap_or(trimmed);
    parse_decimal(row_id, field, without_sign)
}

/// Parse a date in any of the supported layouts
pub fn parse_date(row_id: &str, field: &str, raw: &str) -> Result<NaiveDate, MalformedRecordError> {
    let trimmed = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
        .ok_or_else(|| {
            MalformedRecordError::new(row_id, field, format!("'{}' is not a date", trimmed))
        })
}

/// Validate that a value is not negative
pub fn validate_non_negative(
    row_id: &str,
    field: &str,
    value: BigDecimal,
) -> Result<BigDecimal, MalformedRecordError> {
    if value < BigDecimal::from(0) {
        Err(MalformedRecordError::new(row_id, field, "cannot be negative"))
    } else {
        Ok(value)
    }
}

/// Validate that a value is strictly positive
pub fn validate_positive(
    row_id: &str,
    field: &str,
    value: BigDecimal,
) -> Result<BigDecimal, MalformedRecordError> {
    if value <= BigDecimal::from(0) {
        Err(MalformedRecordError::new(row_id, field, "must be positive"))
    } else {
        Ok(value)
    }
}
