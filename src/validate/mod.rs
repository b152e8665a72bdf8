//! Row-level and cross-file validation.
//!
//! Validation is exhaustive, never fail-fast: every rule is evaluated for
//! every row so a single run reports the complete error picture, and a row
//! can produce multiple findings. A row with zero findings is valid and
//! proceeds to normalization.

pub mod cross;
pub mod field;

use crate::records::{ErrorKind, FileType, ValidationFinding};

pub use cross::{KnownLoans, validate_references};
pub use field::{validate_credit_row, validate_payment_row};

/// Accumulates findings for one row while the rule set runs.
#[derive(Debug)]
pub struct Findings {
    row_number: u64,
    file_type: FileType,
    items: Vec<ValidationFinding>,
}

impl Findings {
    pub fn new(row_number: u64, file_type: FileType) -> Self {
        Self {
            row_number,
            file_type,
            items: Vec::new(),
        }
    }

    pub fn push(
        &mut self,
        field_name: &str,
        kind: ErrorKind,
        message: String,
        raw_value: Option<&str>,
    ) {
        self.items.push(ValidationFinding {
            row_number: self.row_number,
            file_type: self.file_type,
            field_name: field_name.to_string(),
            kind,
            message,
            raw_value: raw_value.map(str::to_string),
        });
    }

    pub fn is_valid(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_vec(self) -> Vec<ValidationFinding> {
        self.items
    }
}
