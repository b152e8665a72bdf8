//! Cross-file validation: referential integrity of payments against credits.
//!
//! A payment is valid iff its `loan_account_number` appears in the union of
//! this batch's valid credit ids and the ids already stored in the warehouse
//! partition. The warehouse set is a once-per-run snapshot, taken before any
//! staging write for the run, so a payment batch is not rejected merely
//! because its credit was loaded in a previous run.

use std::collections::HashSet;

use crate::records::{ErrorKind, FileType, RawRow, ValidationFinding};

/// The union of batch-valid and warehouse-existing loan account numbers.
#[derive(Debug)]
pub struct KnownLoans {
    ids: HashSet<String>,
}

impl KnownLoans {
    pub fn new(batch_ids: HashSet<String>, existing_ids: HashSet<String>) -> Self {
        let mut ids = batch_ids;
        ids.extend(existing_ids);
        Self { ids }
    }

    pub fn contains(&self, loan_account_number: &str) -> bool {
        self.ids.contains(loan_account_number)
    }

    /// Check one payment row; `Some` finding when the reference is dangling.
    ///
    /// Rows without a `loan_account_number` are the REQUIRED rule's problem,
    /// not a cross-reference failure.
    pub fn check(&self, row: &RawRow, row_number: u64) -> Option<ValidationFinding> {
        let loan_id = row
            .get("loan_account_number")
            .map(String::as_str)
            .unwrap_or("")
            .trim();
        if loan_id.is_empty() || self.ids.contains(loan_id) {
            return None;
        }
        Some(ValidationFinding {
            row_number,
            file_type: FileType::Payment,
            field_name: "loan_account_number".to_string(),
            kind: ErrorKind::CrossReference,
            message: format!("payment references unknown credit: {loan_id}"),
            raw_value: Some(loan_id.to_string()),
        })
    }
}

/// Validate every payment row's credit reference against the known-loan union.
pub fn validate_references(
    payment_rows: &[RawRow],
    valid_credit_ids: HashSet<String>,
    existing_warehouse_ids: HashSet<String>,
) -> Vec<ValidationFinding> {
    let known = KnownLoans::new(valid_credit_ids, existing_warehouse_ids);
    payment_rows
        .iter()
        .enumerate()
        .filter_map(|(idx, row)| known.check(row, idx as u64 + 1))
        .collect()
}
