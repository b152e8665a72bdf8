//! Normalizers reconciling heterogeneous source encodings into the typed
//! records written to warehouse staging.
//!
//! All transforms here are pure and idempotent, and they assume validated
//! input: rows reaching a builder have passed field validation, so numeric
//! parses cannot fail and category codes are in their accepted sets. An
//! unmapped code at this point is a defect, surfaced as
//! [`NormalizeError::UnmappedCode`] rather than silently coerced.

pub mod category;
pub mod date;
pub mod rate;

use thiserror::Error;

use crate::records::{CreditRecord, LoanType, PaymentRecord, RawRow};

pub use category::{map_customer_type, map_insurance_flag, map_status};
pub use date::normalize_date;
pub use rate::{normalize_rate, normalize_rate_str};

/// A defect escaping into normalization: validation let through a code that
/// has no canonical mapping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("unmapped {field} code after validation: {code:?}")]
    UnmappedCode { field: &'static str, code: String },
}

fn field<'a>(row: &'a RawRow, name: &str) -> &'a str {
    row.get(name).map(String::as_str).unwrap_or("").trim()
}

fn parse_u32(row: &RawRow, name: &str) -> u32 {
    field(row, name).parse().unwrap_or_default()
}

fn parse_f64(row: &RawRow, name: &str) -> f64 {
    field(row, name).parse().unwrap_or_default()
}

fn parse_opt_i32(row: &RawRow, name: &str) -> Option<i32> {
    let raw = field(row, name);
    if raw.is_empty() { None } else { raw.parse().ok() }
}

fn parse_opt_rate(row: &RawRow, name: &str) -> Option<f64> {
    let raw = field(row, name);
    if raw.is_empty() {
        None
    } else {
        Some(normalize_rate_str(raw))
    }
}

fn mapped_code(
    name: &'static str,
    raw: &str,
    lookup: impl Fn(&str) -> Option<&'static str>,
) -> Result<String, NormalizeError> {
    if raw.is_empty() {
        return Ok(String::new());
    }
    debug_assert!(lookup(raw).is_some(), "unvalidated {name} code {raw:?}");
    lookup(raw)
        .map(str::to_string)
        .ok_or_else(|| NormalizeError::UnmappedCode {
            field: name,
            code: raw.to_string(),
        })
}

/// Build the normalized staging record for a validated credit row.
pub fn normalize_credit(row: &RawRow, loan_type: LoanType) -> Result<CreditRecord, NormalizeError> {
    let insurance_included = if loan_type == LoanType::Retail {
        let raw = field(row, "insurance_included");
        if raw.is_empty() {
            None
        } else {
            Some(
                map_insurance_flag(raw).ok_or_else(|| NormalizeError::UnmappedCode {
                    field: "insurance_included",
                    code: raw.to_string(),
                })?,
            )
        }
    } else {
        None
    };

    let (sector_code, risk_class, customer_segment, default_probability) =
        if loan_type == LoanType::Commercial {
            (
                parse_opt_i32(row, "sector_code"),
                parse_opt_i32(row, "risk_class"),
                parse_opt_i32(row, "customer_segment"),
                parse_opt_rate(row, "default_probability"),
            )
        } else {
            (None, None, None, None)
        };

    Ok(CreditRecord {
        loan_type,
        loan_account_number: field(row, "loan_account_number").to_string(),
        customer_id: field(row, "customer_id").to_string(),
        customer_type: mapped_code("customer_type", field(row, "customer_type"), map_customer_type)?,
        loan_status_code: mapped_code("loan_status_code", field(row, "loan_status_code"), map_status)?,
        days_past_due: parse_u32(row, "days_past_due"),
        total_installment_count: parse_u32(row, "total_installment_count"),
        outstanding_installment_count: parse_u32(row, "outstanding_installment_count"),
        paid_installment_count: parse_u32(row, "paid_installment_count"),
        original_loan_amount: parse_f64(row, "original_loan_amount"),
        outstanding_principal_balance: parse_f64(row, "outstanding_principal_balance"),
        nominal_interest_rate: normalize_rate_str(field(row, "nominal_interest_rate")),
        total_interest_amount: parse_f64(row, "total_interest_amount"),
        fund_rate: normalize_rate_str(field(row, "fund_rate")),
        fund_amount: parse_f64(row, "fund_amount"),
        tax_rate: normalize_rate_str(field(row, "tax_rate")),
        tax_amount: parse_f64(row, "tax_amount"),
        grace_period_months: parse_u32(row, "grace_period_months"),
        installment_frequency: parse_u32(row, "installment_frequency"),
        loan_start_date: normalize_date(field(row, "loan_start_date")),
        loan_closing_date: normalize_date(field(row, "loan_closing_date")),
        first_payment_date: normalize_date(field(row, "first_payment_date")),
        final_maturity_date: normalize_date(field(row, "final_maturity_date")),
        internal_rating: parse_opt_i32(row, "internal_rating"),
        external_rating: parse_opt_i32(row, "external_rating"),
        sector_code,
        risk_class,
        customer_segment,
        default_probability,
        insurance_included,
    })
}

/// Build the normalized staging record for a validated payment row.
pub fn normalize_payment(
    row: &RawRow,
    loan_type: LoanType,
) -> Result<PaymentRecord, NormalizeError> {
    Ok(PaymentRecord {
        loan_type,
        loan_account_number: field(row, "loan_account_number").to_string(),
        installment_number: parse_u32(row, "installment_number"),
        installment_status: mapped_code(
            "installment_status",
            field(row, "installment_status"),
            map_status,
        )?,
        scheduled_payment_date: normalize_date(field(row, "scheduled_payment_date")),
        actual_payment_date: normalize_date(field(row, "actual_payment_date")),
        installment_amount: parse_f64(row, "installment_amount"),
        principal_component: parse_f64(row, "principal_component"),
        interest_component: parse_f64(row, "interest_component"),
        fund_component: parse_f64(row, "fund_component"),
        tax_component: parse_f64(row, "tax_component"),
        remaining_principal: parse_f64(row, "remaining_principal"),
        remaining_interest: parse_f64(row, "remaining_interest"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credit_row() -> RawRow {
        RawRow::from([
            ("loan_account_number".into(), "LN-1001".into()),
            ("customer_id".into(), "C-42".into()),
            ("customer_type".into(), "T".into()),
            ("loan_status_code".into(), "A".into()),
            ("original_loan_amount".into(), "150000".into()),
            ("outstanding_principal_balance".into(), "120000.5".into()),
            ("nominal_interest_rate".into(), "18.5".into()),
            ("loan_start_date".into(), "20240115".into()),
            ("final_maturity_date".into(), "15.01.2029".into()),
            ("days_past_due".into(), "0".into()),
            ("total_installment_count".into(), "60".into()),
            ("paid_installment_count".into(), "12".into()),
        ])
    }

    #[test]
    fn builds_normalized_credit_record() {
        let record = normalize_credit(&credit_row(), LoanType::Retail).unwrap();
        assert_eq!(record.loan_account_number, "LN-1001");
        assert_eq!(record.customer_type, "TRADE");
        assert_eq!(record.loan_status_code, "ACTIVE");
        assert_eq!(record.nominal_interest_rate, 0.185);
        assert_eq!(
            record.loan_start_date,
            chrono::NaiveDate::from_ymd_opt(2024, 1, 15)
        );
        assert_eq!(
            record.final_maturity_date,
            chrono::NaiveDate::from_ymd_opt(2029, 1, 15)
        );
        assert_eq!(record.loan_closing_date, None);
        assert_eq!(record.insurance_included, None);
        assert_eq!(record.sector_code, None);
    }

    #[test]
    fn commercial_only_fields_absent_for_retail() {
        let mut row = credit_row();
        row.insert("sector_code".into(), "12".into());
        row.insert("risk_class".into(), "3".into());
        let record = normalize_credit(&row, LoanType::Retail).unwrap();
        assert_eq!(record.sector_code, None);
        assert_eq!(record.risk_class, None);

        let record = normalize_credit(&row, LoanType::Commercial).unwrap();
        assert_eq!(record.sector_code, Some(12));
        assert_eq!(record.risk_class, Some(3));
    }

    #[test]
    fn retail_insurance_flag_mapped() {
        let mut row = credit_row();
        row.insert("insurance_included".into(), "E".into());
        let record = normalize_credit(&row, LoanType::Retail).unwrap();
        assert_eq!(record.insurance_included, Some(1));
    }

    #[test]
    fn normalization_is_idempotent_end_to_end() {
        let record = normalize_credit(&credit_row(), LoanType::Retail).unwrap();

        // Re-feed the canonical outputs; the record must not change.
        let mut replay = credit_row();
        replay.insert("customer_type".into(), record.customer_type.clone());
        replay.insert("loan_status_code".into(), record.loan_status_code.clone());
        replay.insert(
            "nominal_interest_rate".into(),
            record.nominal_interest_rate.to_string(),
        );
        let again = normalize_credit(&replay, LoanType::Retail).unwrap();
        assert_eq!(record, again);
    }

    #[test]
    fn payment_dates_absent_for_unpaid_installments() {
        let row = RawRow::from([
            ("loan_account_number".into(), "LN-1001".into()),
            ("installment_number".into(), "3".into()),
            ("installment_amount".into(), "2500".into()),
            ("installment_status".into(), "A".into()),
            ("scheduled_payment_date".into(), "2024-04-15".into()),
            ("actual_payment_date".into(), "".into()),
        ]);
        let record = normalize_payment(&row, LoanType::Retail).unwrap();
        assert_eq!(record.actual_payment_date, None);
        assert_eq!(
            record.scheduled_payment_date,
            chrono::NaiveDate::from_ymd_opt(2024, 4, 15)
        );
        assert_eq!(record.installment_status, "ACTIVE");
    }
}
