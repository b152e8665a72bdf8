//! Category normalization: table-driven mapping of source codes to canonical
//! labels.
//!
//! Mappings:
//!   status codes:        A -> ACTIVE, K -> CLOSED
//!   customer type:       I -> INDIVIDUAL, T -> TRADE, V -> VIP
//!   insurance flag:      H -> 0, E -> 1
//!
//! Codes are case-sensitive. Unknown codes are rejected by VALUE validation
//! before normalization runs; the lookups here return `None` for anything
//! unmapped so callers can fail fast on a defect instead of storing garbage.
//! Already-canonical labels map to themselves, keeping the transform
//! idempotent.

/// Map a loan / installment status code to its canonical label.
pub fn map_status(code: &str) -> Option<&'static str> {
    match code {
        "A" | "ACTIVE" => Some("ACTIVE"),
        "K" | "CLOSED" => Some("CLOSED"),
        _ => None,
    }
}

/// Map a customer type code to its canonical label.
pub fn map_customer_type(code: &str) -> Option<&'static str> {
    match code {
        "I" | "INDIVIDUAL" => Some("INDIVIDUAL"),
        "T" | "TRADE" => Some("TRADE"),
        "V" | "VIP" => Some("VIP"),
        _ => None,
    }
}

/// Map a boolean-like insurance flag to 0/1.
pub fn map_insurance_flag(code: &str) -> Option<u8> {
    match code {
        "H" | "0" => Some(0),
        "E" | "1" => Some(1),
        _ => None,
    }
}

/// The code sets VALUE validation accepts, matching the tables above.
pub const STATUS_CODES: &[&str] = &["A", "K"];
pub const CUSTOMER_TYPE_CODES: &[&str] = &["I", "T", "V"];
pub const INSURANCE_FLAG_CODES: &[&str] = &["H", "E"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_status_codes() {
        assert_eq!(map_status("A"), Some("ACTIVE"));
        assert_eq!(map_status("K"), Some("CLOSED"));
        assert_eq!(map_status("X"), None);
    }

    #[test]
    fn maps_customer_types() {
        assert_eq!(map_customer_type("T"), Some("TRADE"));
        assert_eq!(map_customer_type("V"), Some("VIP"));
        assert_eq!(map_customer_type("I"), Some("INDIVIDUAL"));
        assert_eq!(map_customer_type("Z"), None);
    }

    #[test]
    fn maps_insurance_flags() {
        assert_eq!(map_insurance_flag("H"), Some(0));
        assert_eq!(map_insurance_flag("E"), Some(1));
        assert_eq!(map_insurance_flag("J"), None);
    }

    #[test]
    fn case_sensitive() {
        assert_eq!(map_status("a"), None);
        assert_eq!(map_customer_type("t"), None);
    }

    #[test]
    fn idempotent_on_canonical_labels() {
        assert_eq!(map_status("ACTIVE"), Some("ACTIVE"));
        assert_eq!(map_customer_type("TRADE"), Some("TRADE"));
        assert_eq!(map_insurance_flag("1"), Some(1));
    }
}
