//! Field validators for credit and payment rows.
//!
//! Pure functions of a single row; no cross-row state. Optional fields are
//! only checked when present; an empty value fails only REQUIRED rules.

use crate::normalize::category::{CUSTOMER_TYPE_CODES, INSURANCE_FLAG_CODES, STATUS_CODES};
use crate::normalize::date::is_valid_date;
use crate::records::{ErrorKind, FileType, LoanType, RawRow, ValidationFinding};

use super::Findings;

const CREDIT_REQUIRED: &[&str] = &[
    "loan_account_number",
    "customer_id",
    "loan_status_code",
    "original_loan_amount",
    "loan_start_date",
];

const PAYMENT_REQUIRED: &[&str] = &[
    "loan_account_number",
    "installment_number",
    "installment_amount",
];

fn raw<'a>(row: &'a RawRow, name: &str) -> &'a str {
    row.get(name).map(String::as_str).unwrap_or("").trim()
}

fn check_required(findings: &mut Findings, row: &RawRow, name: &str) {
    if raw(row, name).is_empty() {
        findings.push(
            name,
            ErrorKind::Required,
            format!("{name} is required"),
            row.get(name).map(String::as_str),
        );
    }
}

fn check_integer(
    findings: &mut Findings,
    row: &RawRow,
    name: &str,
    min: Option<i64>,
) -> Option<i64> {
    let value = raw(row, name);
    if value.is_empty() {
        return None;
    }
    match value.parse::<i64>() {
        Ok(parsed) => {
            if let Some(min) = min
                && parsed < min
            {
                findings.push(
                    name,
                    ErrorKind::Range,
                    format!("{name} must be >= {min}, got {parsed}"),
                    Some(value),
                );
                return None;
            }
            Some(parsed)
        }
        Err(_) => {
            findings.push(
                name,
                ErrorKind::Type,
                format!("{name} must be an integer, got: {value}"),
                Some(value),
            );
            None
        }
    }
}

fn check_decimal(findings: &mut Findings, row: &RawRow, name: &str, min: Option<f64>) {
    let value = raw(row, name);
    if value.is_empty() {
        return;
    }
    match value.parse::<f64>() {
        Ok(parsed) => {
            if let Some(min) = min
                && parsed < min
            {
                findings.push(
                    name,
                    ErrorKind::Range,
                    format!("{name} must be >= {min}, got {parsed}"),
                    Some(value),
                );
            }
        }
        Err(_) => findings.push(
            name,
            ErrorKind::Type,
            format!("{name} must be a number, got: {value}"),
            Some(value),
        ),
    }
}

fn check_positive_decimal(findings: &mut Findings, row: &RawRow, name: &str) {
    let value = raw(row, name);
    if value.is_empty() {
        return;
    }
    match value.parse::<f64>() {
        Ok(parsed) => {
            if parsed <= 0.0 {
                findings.push(
                    name,
                    ErrorKind::Range,
                    format!("{name} must be > 0, got {parsed}"),
                    Some(value),
                );
            }
        }
        Err(_) => findings.push(
            name,
            ErrorKind::Type,
            format!("{name} must be a number, got: {value}"),
            Some(value),
        ),
    }
}

fn check_date(findings: &mut Findings, row: &RawRow, name: &str) {
    let value = raw(row, name);
    if !is_valid_date(value) {
        findings.push(
            name,
            ErrorKind::Format,
            format!("{name} must be YYYYMMDD, YYYY-MM-DD or DD.MM.YYYY, got: {value}"),
            Some(value),
        );
    }
}

fn check_in_set(findings: &mut Findings, row: &RawRow, name: &str, accepted: &[&str]) {
    let value = raw(row, name);
    if value.is_empty() {
        return;
    }
    if !accepted.contains(&value) {
        findings.push(
            name,
            ErrorKind::Value,
            format!("{name} must be one of {accepted:?}, got: {value}"),
            Some(value),
        );
    }
}

/// Validate a single credit row. Empty result means the row is valid.
pub fn validate_credit_row(
    row: &RawRow,
    row_number: u64,
    loan_type: LoanType,
) -> Vec<ValidationFinding> {
    let mut findings = Findings::new(row_number, FileType::Credit);

    for name in CREDIT_REQUIRED {
        check_required(&mut findings, row, name);
    }

    check_in_set(&mut findings, row, "customer_type", CUSTOMER_TYPE_CODES);
    check_in_set(&mut findings, row, "loan_status_code", STATUS_CODES);

    check_positive_decimal(&mut findings, row, "original_loan_amount");
    check_decimal(&mut findings, row, "outstanding_principal_balance", Some(0.0));
    check_decimal(&mut findings, row, "nominal_interest_rate", Some(0.0));
    check_decimal(&mut findings, row, "total_interest_amount", Some(0.0));
    check_decimal(&mut findings, row, "fund_rate", Some(0.0));
    check_decimal(&mut findings, row, "fund_amount", Some(0.0));
    check_decimal(&mut findings, row, "tax_rate", Some(0.0));
    check_decimal(&mut findings, row, "tax_amount", Some(0.0));

    check_integer(&mut findings, row, "days_past_due", Some(0));
    let total = check_integer(&mut findings, row, "total_installment_count", Some(0));
    check_integer(&mut findings, row, "outstanding_installment_count", Some(0));
    let paid = check_integer(&mut findings, row, "paid_installment_count", Some(0));
    check_integer(&mut findings, row, "grace_period_months", Some(0));
    check_integer(&mut findings, row, "installment_frequency", Some(0));
    check_integer(&mut findings, row, "internal_rating", None);
    check_integer(&mut findings, row, "external_rating", None);

    if let (Some(paid), Some(total)) = (paid, total)
        && paid > total
    {
        findings.push(
            "paid_installment_count",
            ErrorKind::Range,
            format!("paid_installment_count ({paid}) exceeds total_installment_count ({total})"),
            row.get("paid_installment_count").map(String::as_str),
        );
    }

    check_date(&mut findings, row, "loan_start_date");
    check_date(&mut findings, row, "loan_closing_date");
    check_date(&mut findings, row, "first_payment_date");
    check_date(&mut findings, row, "final_maturity_date");

    match loan_type {
        LoanType::Retail => {
            check_in_set(&mut findings, row, "insurance_included", INSURANCE_FLAG_CODES);
        }
        LoanType::Commercial => {
            check_integer(&mut findings, row, "sector_code", None);
            check_integer(&mut findings, row, "risk_class", None);
            check_integer(&mut findings, row, "customer_segment", None);
            check_decimal(&mut findings, row, "default_probability", Some(0.0));
        }
    }

    findings.into_vec()
}

/// Validate a single payment row. Empty result means the row is valid.
pub fn validate_payment_row(row: &RawRow, row_number: u64) -> Vec<ValidationFinding> {
    let mut findings = Findings::new(row_number, FileType::Payment);

    for name in PAYMENT_REQUIRED {
        check_required(&mut findings, row, name);
    }

    check_integer(&mut findings, row, "installment_number", Some(1));

    check_decimal(&mut findings, row, "installment_amount", Some(0.0));
    check_decimal(&mut findings, row, "principal_component", Some(0.0));
    check_decimal(&mut findings, row, "interest_component", Some(0.0));
    check_decimal(&mut findings, row, "fund_component", Some(0.0));
    check_decimal(&mut findings, row, "tax_component", Some(0.0));
    check_decimal(&mut findings, row, "remaining_principal", Some(0.0));
    check_decimal(&mut findings, row, "remaining_interest", Some(0.0));

    check_in_set(&mut findings, row, "installment_status", STATUS_CODES);

    check_date(&mut findings, row, "scheduled_payment_date");
    check_date(&mut findings, row, "actual_payment_date");

    findings.into_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_credit() -> RawRow {
        RawRow::from([
            ("loan_account_number".into(), "LN-1".into()),
            ("customer_id".into(), "C-1".into()),
            ("customer_type".into(), "I".into()),
            ("loan_status_code".into(), "A".into()),
            ("original_loan_amount".into(), "100000".into()),
            ("loan_start_date".into(), "20240101".into()),
            ("days_past_due".into(), "0".into()),
            ("total_installment_count".into(), "48".into()),
            ("paid_installment_count".into(), "10".into()),
        ])
    }

    fn valid_payment() -> RawRow {
        RawRow::from([
            ("loan_account_number".into(), "LN-1".into()),
            ("installment_number".into(), "1".into()),
            ("installment_amount".into(), "2500.00".into()),
            ("installment_status".into(), "A".into()),
        ])
    }

    #[test]
    fn valid_credit_row_has_no_findings() {
        assert!(validate_credit_row(&valid_credit(), 1, LoanType::Retail).is_empty());
    }

    #[test]
    fn missing_required_fields_each_produce_a_finding() {
        let findings = validate_credit_row(&RawRow::new(), 1, LoanType::Retail);
        let required: Vec<_> = findings
            .iter()
            .filter(|f| f.kind == ErrorKind::Required)
            .collect();
        assert_eq!(required.len(), CREDIT_REQUIRED.len());
    }

    #[test]
    fn one_row_can_produce_multiple_findings() {
        let mut row = valid_credit();
        row.insert("days_past_due".into(), "-4".into());
        row.insert("loan_status_code".into(), "Q".into());
        row.insert("loan_start_date".into(), "01/01/2024".into());

        let findings = validate_credit_row(&row, 7, LoanType::Retail);
        assert_eq!(findings.len(), 3);
        assert!(findings.iter().all(|f| f.row_number == 7));
        assert!(findings.iter().any(|f| f.kind == ErrorKind::Range));
        assert!(findings.iter().any(|f| f.kind == ErrorKind::Value));
        assert!(findings.iter().any(|f| f.kind == ErrorKind::Format));
    }

    #[test]
    fn non_numeric_amount_is_a_type_error() {
        let mut row = valid_credit();
        row.insert("original_loan_amount".into(), "lots".into());
        let findings = validate_credit_row(&row, 1, LoanType::Retail);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, ErrorKind::Type);
        assert_eq!(findings[0].raw_value.as_deref(), Some("lots"));
    }

    #[test]
    fn zero_loan_amount_is_out_of_range() {
        let mut row = valid_credit();
        row.insert("original_loan_amount".into(), "0".into());
        let findings = validate_credit_row(&row, 1, LoanType::Retail);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, ErrorKind::Range);
    }

    #[test]
    fn paid_exceeding_total_installments_is_out_of_range() {
        let mut row = valid_credit();
        row.insert("paid_installment_count".into(), "50".into());
        row.insert("total_installment_count".into(), "48".into());
        let findings = validate_credit_row(&row, 1, LoanType::Retail);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].field_name, "paid_installment_count");
        assert_eq!(findings[0].kind, ErrorKind::Range);
    }

    #[test]
    fn retail_rejects_unknown_insurance_flag() {
        let mut row = valid_credit();
        row.insert("insurance_included".into(), "X".into());
        let findings = validate_credit_row(&row, 1, LoanType::Retail);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, ErrorKind::Value);

        // The flag is not a commercial field; no finding there.
        assert!(validate_credit_row(&row, 1, LoanType::Commercial).is_empty());
    }

    #[test]
    fn commercial_numeric_fields_are_checked() {
        let mut row = valid_credit();
        row.insert("sector_code".into(), "finance".into());
        let findings = validate_credit_row(&row, 1, LoanType::Commercial);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, ErrorKind::Type);
    }

    #[test]
    fn valid_payment_row_has_no_findings() {
        assert!(validate_payment_row(&valid_payment(), 1).is_empty());
    }

    #[test]
    fn installment_number_must_be_at_least_one() {
        let mut row = valid_payment();
        row.insert("installment_number".into(), "0".into());
        let findings = validate_payment_row(&row, 1);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, ErrorKind::Range);
    }

    #[test]
    fn negative_monetary_component_is_out_of_range() {
        let mut row = valid_payment();
        row.insert("principal_component".into(), "-10".into());
        let findings = validate_payment_row(&row, 1);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].field_name, "principal_component");
        assert_eq!(findings[0].kind, ErrorKind::Range);
    }
}
