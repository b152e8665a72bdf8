//! Rate normalization: every rate ends up as a decimal fraction.
//!
//! Sources disagree on encoding: some files carry `0.185`, others `18.5`.
//! Anything above 1.0 is treated as a percentage and divided by 100; values
//! at or below 1.0 pass through unchanged, which also makes the transform
//! idempotent.

/// Normalize a numeric rate into decimal form.
pub fn normalize_rate(value: f64) -> f64 {
    if value > 1.0 { value / 100.0 } else { value }
}

/// Normalize a raw rate string; empty input means a zero rate.
///
/// Assumes TYPE validation has already run; a non-numeric leftover maps to 0.
pub fn normalize_rate_str(value: &str) -> f64 {
    let value = value.trim();
    if value.is_empty() {
        return 0.0;
    }
    normalize_rate(value.parse().unwrap_or(0.0))
}
