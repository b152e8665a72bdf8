//! Domain records for the sync pipeline.
//!
//! Raw source rows are string maps keyed by source field name; everything
//! downstream of validation is typed. `SyncRun` and `ValidationFinding` are
//! plain records handed to the run store, independent of any persistence
//! mechanics.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A raw source row: source field name to raw (possibly malformed) value.
///
/// Ordered map so error reports and test fixtures are deterministic.
pub type RawRow = BTreeMap<String, String>;

/// Loan portfolio segment; also the warehouse partition key within a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanType {
    Retail,
    Commercial,
}

impl LoanType {
    pub const fn as_str(self) -> &'static str {
        match self {
            LoanType::Retail => "RETAIL",
            LoanType::Commercial => "COMMERCIAL",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "RETAIL" => Some(LoanType::Retail),
            "COMMERCIAL" => Some(LoanType::Commercial),
            _ => None,
        }
    }
}

impl fmt::Display for LoanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source file kind within a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    Credit,
    Payment,
}

impl FileType {
    pub const fn as_str(self) -> &'static str {
        match self {
            FileType::Credit => "credit",
            FileType::Payment => "payment",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "credit" => Some(FileType::Credit),
            "payment" => Some(FileType::Payment),
            _ => None,
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sync run lifecycle states. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Started,
    Fetching,
    Validating,
    Normalizing,
    Storing,
    Completed,
    Failed,
}

impl RunStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            RunStatus::Started => "STARTED",
            RunStatus::Fetching => "FETCHING",
            RunStatus::Validating => "VALIDATING",
            RunStatus::Normalizing => "NORMALIZING",
            RunStatus::Storing => "STORING",
            RunStatus::Completed => "COMPLETED",
            RunStatus::Failed => "FAILED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "STARTED" => Some(RunStatus::Started),
            "FETCHING" => Some(RunStatus::Fetching),
            "VALIDATING" => Some(RunStatus::Validating),
            "NORMALIZING" => Some(RunStatus::Normalizing),
            "STORING" => Some(RunStatus::Storing),
            "COMPLETED" => Some(RunStatus::Completed),
            "FAILED" => Some(RunStatus::Failed),
            _ => None,
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of a single validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Required,
    Type,
    Range,
    Format,
    Value,
    CrossReference,
}

impl ErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Required => "REQUIRED",
            ErrorKind::Type => "TYPE",
            ErrorKind::Range => "RANGE",
            ErrorKind::Format => "FORMAT",
            ErrorKind::Value => "VALUE",
            ErrorKind::CrossReference => "CROSS_REFERENCE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "REQUIRED" => Some(ErrorKind::Required),
            "TYPE" => Some(ErrorKind::Type),
            "RANGE" => Some(ErrorKind::Range),
            "FORMAT" => Some(ErrorKind::Format),
            "VALUE" => Some(ErrorKind::Value),
            "CROSS_REFERENCE" => Some(ErrorKind::CrossReference),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One validation finding against one field of one source row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ValidationFinding {
    /// 1-based position of the row in its source file.
    pub row_number: u64,
    pub file_type: FileType,
    pub field_name: String,
    pub kind: ErrorKind,
    pub message: String,
    /// Original input value, preserved verbatim for inspection.
    pub raw_value: Option<String>,
}

/// Normalized credit row written to warehouse staging.
///
/// Commercial-only and retail-only columns are `None` for the other segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditRecord {
    pub loan_type: LoanType,
    pub loan_account_number: String,
    pub customer_id: String,
    pub customer_type: String,
    pub loan_status_code: String,
    pub days_past_due: u32,
    pub total_installment_count: u32,
    pub outstanding_installment_count: u32,
    pub paid_installment_count: u32,
    pub original_loan_amount: f64,
    pub outstanding_principal_balance: f64,
    pub nominal_interest_rate: f64,
    pub total_interest_amount: f64,
    pub fund_rate: f64,
    pub fund_amount: f64,
    pub tax_rate: f64,
    pub tax_amount: f64,
    pub grace_period_months: u32,
    pub installment_frequency: u32,
    pub loan_start_date: Option<NaiveDate>,
    pub loan_closing_date: Option<NaiveDate>,
    pub first_payment_date: Option<NaiveDate>,
    pub final_maturity_date: Option<NaiveDate>,
    pub internal_rating: Option<i32>,
    pub external_rating: Option<i32>,
    // Commercial-only
    pub sector_code: Option<i32>,
    pub risk_class: Option<i32>,
    pub customer_segment: Option<i32>,
    pub default_probability: Option<f64>,
    // Retail-only
    pub insurance_included: Option<u8>,
}

/// Normalized payment-plan row written to warehouse staging.
///
/// `loan_account_number` must resolve to a known credit (cross-file check).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub loan_type: LoanType,
    pub loan_account_number: String,
    pub installment_number: u32,
    pub installment_status: String,
    pub scheduled_payment_date: Option<NaiveDate>,
    pub actual_payment_date: Option<NaiveDate>,
    pub installment_amount: f64,
    pub principal_component: f64,
    pub interest_component: f64,
    pub fund_component: f64,
    pub tax_component: f64,
    pub remaining_principal: f64,
    pub remaining_interest: f64,
}

#[cfg(test)]
impl CreditRecord {
    pub(crate) fn sample(loan_type: LoanType) -> Self {
        Self {
            loan_type,
            loan_account_number: "LN-0001".to_string(),
            customer_id: "CUST-1".to_string(),
            customer_type: "INDIVIDUAL".to_string(),
            loan_status_code: "ACTIVE".to_string(),
            days_past_due: 0,
            total_installment_count: 12,
            outstanding_installment_count: 6,
            paid_installment_count: 6,
            original_loan_amount: 10_000.0,
            outstanding_principal_balance: 5_000.0,
            nominal_interest_rate: 0.185,
            total_interest_amount: 925.0,
            fund_rate: 0.15,
            fund_amount: 138.75,
            tax_rate: 0.05,
            tax_amount: 46.25,
            grace_period_months: 0,
            installment_frequency: 1,
            loan_start_date: NaiveDate::from_ymd_opt(2025, 1, 15),
            loan_closing_date: None,
            first_payment_date: NaiveDate::from_ymd_opt(2025, 2, 15),
            final_maturity_date: NaiveDate::from_ymd_opt(2026, 1, 15),
            internal_rating: Some(3),
            external_rating: None,
            sector_code: None,
            risk_class: None,
            customer_segment: None,
            default_probability: None,
            insurance_included: Some(1),
        }
    }
}

#[cfg(test)]
impl PaymentRecord {
    pub(crate) fn sample(loan_type: LoanType) -> Self {
        Self {
            loan_type,
            loan_account_number: "LN-0001".to_string(),
            installment_number: 1,
            installment_status: "ACTIVE".to_string(),
            scheduled_payment_date: NaiveDate::from_ymd_opt(2025, 2, 15),
            actual_payment_date: None,
            installment_amount: 900.0,
            principal_component: 750.0,
            interest_component: 120.0,
            fund_component: 18.0,
            tax_component: 12.0,
            remaining_principal: 4_250.0,
            remaining_interest: 805.0,
        }
    }
}

/// One pipeline execution for a (tenant, loan_type).
///
/// Created at orchestration start, mutated only by the orchestrator, immutable
/// once terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SyncRun {
    pub id: Uuid,
    pub tenant_id: String,
    pub loan_type: LoanType,
    /// Correlates with warehouse staging writes for this run.
    pub batch_id: Uuid,
    pub status: RunStatus,
    pub total_credit_rows: u64,
    pub valid_credit_rows: u64,
    pub total_payment_rows: u64,
    pub valid_payment_rows: u64,
    pub error_count: u64,
    /// Validation error counts grouped by error kind, plus a `reason` entry on
    /// failed runs.
    #[schema(value_type = Object)]
    pub error_summary: BTreeMap<String, serde_json::Value>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SyncRun {
    /// New run in its initial state.
    pub fn start(tenant_id: &str, loan_type: LoanType) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.to_string(),
            loan_type,
            batch_id: Uuid::new_v4(),
            status: RunStatus::Started,
            total_credit_rows: 0,
            valid_credit_rows: 0,
            total_payment_rows: 0,
            valid_payment_rows: 0,
            error_count: 0,
            error_summary: BTreeMap::new(),
            started_at: Utc::now(),
            completed_at: None,
        }
    }
}

/// Why a run ended in `FAILED`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FailureReason {
    /// Data-quality abort: the validation error ratio exceeded the configured
    /// threshold. Not retriable without corrected source data.
    ThresholdExceeded { error_ratio: f64 },
    /// Source, warehouse, or log-store trouble. Eligible for retry.
    Infrastructure { message: String },
}

/// Outcome of one `sync` invocation, returned to schedulers and the API layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub tenant_id: String,
    pub loan_type: LoanType,
    pub status: RunStatus,
    pub total_credit_rows: u64,
    pub valid_credit_rows: u64,
    pub total_payment_rows: u64,
    pub valid_payment_rows: u64,
    pub error_count: u64,
    #[schema(value_type = Object)]
    pub error_summary: BTreeMap<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureReason>,
}

impl SyncReport {
    pub fn from_run(run: &SyncRun, failure: Option<FailureReason>) -> Self {
        Self {
            run_id: run.id,
            tenant_id: run.tenant_id.clone(),
            loan_type: run.loan_type,
            status: run.status,
            total_credit_rows: run.total_credit_rows,
            valid_credit_rows: run.valid_credit_rows,
            total_payment_rows: run.total_payment_rows,
            valid_payment_rows: run.valid_payment_rows,
            error_count: run.error_count,
            error_summary: run.error_summary.clone(),
            failure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loan_type_round_trips_canonical_strings() {
        for lt in [LoanType::Retail, LoanType::Commercial] {
            assert_eq!(LoanType::parse(lt.as_str()), Some(lt));
        }
        assert_eq!(LoanType::parse("retail"), None);
    }

    #[test]
    fn run_status_terminality() {
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
        for status in [
            RunStatus::Started,
            RunStatus::Fetching,
            RunStatus::Validating,
            RunStatus::Normalizing,
            RunStatus::Storing,
        ] {
            assert!(!status.is_terminal());
        }
    }

    #[test]
    fn error_kind_round_trips_canonical_strings() {
        for kind in [
            ErrorKind::Required,
            ErrorKind::Type,
            ErrorKind::Range,
            ErrorKind::Format,
            ErrorKind::Value,
            ErrorKind::CrossReference,
        ] {
            assert_eq!(ErrorKind::parse(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn new_run_starts_non_terminal() {
        let run = SyncRun::start("acme", LoanType::Retail);
        assert_eq!(run.status, RunStatus::Started);
        assert!(run.completed_at.is_none());
        assert_ne!(run.id, run.batch_id);
    }
}
