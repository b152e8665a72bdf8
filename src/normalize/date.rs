//! Date normalization: reconciles the source date encodings into `NaiveDate`.
//!
//! Accepted inputs: `YYYYMMDD`, `YYYY-MM-DD`, `DD.MM.YYYY`. Empty or
//! whitespace-only values mean "no date" (e.g. unpaid installments) and map to
//! `None`. Anything else is rejected upstream by FORMAT validation.

use chrono::NaiveDate;

/// Parse a raw date value into a `NaiveDate`, or `None` for empty input.
///
/// Unrecognized non-empty input also yields `None`; field validation has
/// already flagged such rows, so this path only sees vetted values.
pub fn normalize_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if value.len() == 8 && value.bytes().all(|b| b.is_ascii_digit()) {
        return NaiveDate::parse_from_str(value, "%Y%m%d").ok();
    }
    if value.len() == 10 && value.as_bytes()[4] == b'-' {
        return NaiveDate::parse_from_str(value, "%Y-%m-%d").ok();
    }
    if value.len() == 10 && value.as_bytes()[2] == b'.' {
        return NaiveDate::parse_from_str(value, "%d.%m.%Y").ok();
    }
    None
}

/// True when the raw value is a well-formed date in an accepted format, with
/// in-range components. Empty input is acceptable (absent date).
pub fn is_valid_date(value: &str) -> bool {
    value.trim().is_empty() || normalize_date(value).is_some()
}
