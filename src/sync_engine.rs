//! Sync pipeline orchestrator.
//!
//! Drives one run per (tenant, loan_type) through FETCH, VALIDATE, NORMALIZE
//! and STORE under a lease, records every stage transition in the run log,
//! and aborts before touching the warehouse when the validation error ratio
//! exceeds the configured threshold. A started run always produces a terminal
//! run record; callers get `Err` only when no run could be started at all.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use metrics::{counter, histogram};
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::feed::{FeedError, SourceFeed};
use crate::lock::{LockError, LockManager, SyncLease};
use crate::normalize::{self, NormalizeError};
use crate::records::{
    CreditRecord, FailureReason, FileType, LoanType, PaymentRecord, RawRow, RunStatus, SyncReport,
    SyncRun, ValidationFinding,
};
use crate::runlog::{RunOutcome, RunStore, RunStoreError};
use crate::storage::StorageManager;
use crate::validate::{self, KnownLoans};
use crate::warehouse::{Warehouse, WarehouseError};

/// Tuning knobs for the engine, sourced from application config.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Abort the run when error_count / total_rows exceeds this.
    pub error_ratio_threshold: f64,
    /// Wall-clock budget for one run.
    pub run_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            error_ratio_threshold: 0.5,
            run_timeout: Duration::from_secs(1800),
        }
    }
}

/// A sync could not be started.
#[derive(Debug, Error)]
pub enum SyncFailure {
    #[error("A sync is already running for tenant {tenant_id}, {loan_type}")]
    Busy {
        tenant_id: String,
        loan_type: LoanType,
    },

    #[error(transparent)]
    Lease(#[from] LockError),

    #[error(transparent)]
    RunStore(#[from] RunStoreError),
}

/// Infrastructure failure inside a started run.
#[derive(Debug, Error)]
enum PipelineError {
    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error("Run exceeded the {0:?} execution budget")]
    Timeout(Duration),

    #[error(transparent)]
    RunStore(#[from] RunStoreError),
}

struct Execution {
    total_credit_rows: u64,
    valid_credit_rows: u64,
    total_payment_rows: u64,
    valid_payment_rows: u64,
    findings: Vec<ValidationFinding>,
    /// Set when the run aborted on the error-ratio threshold.
    threshold_failure: Option<FailureReason>,
}

/// Orchestrates sync runs over the feed, warehouse and run log.
pub struct SyncEngine {
    feed: Arc<dyn SourceFeed>,
    warehouse: Arc<dyn Warehouse>,
    storage: StorageManager,
    run_store: Arc<dyn RunStore>,
    locks: LockManager,
    config: EngineConfig,
}

impl SyncEngine {
    pub fn new(
        feed: Arc<dyn SourceFeed>,
        warehouse: Arc<dyn Warehouse>,
        storage: StorageManager,
        run_store: Arc<dyn RunStore>,
        locks: LockManager,
        config: EngineConfig,
    ) -> Self {
        Self {
            feed,
            warehouse,
            storage,
            run_store,
            locks,
            config,
        }
    }

    /// Run one sync for the (tenant, loan_type) pair.
    ///
    /// Returns `Err(SyncFailure::Busy)` without creating a run record when
    /// another run holds the lease. Once a run record exists the result is
    /// always `Ok(SyncReport)`; failures are reported through the record's
    /// terminal status and `failure` field.
    #[instrument(skip(self))]
    pub async fn sync(
        &self,
        tenant_id: &str,
        loan_type: LoanType,
    ) -> Result<SyncReport, SyncFailure> {
        let Some(lease) = self.locks.acquire(tenant_id, loan_type).await? else {
            counter!("loansync_sync_busy_total").increment(1);
            return Err(SyncFailure::Busy {
                tenant_id: tenant_id.to_string(),
                loan_type,
            });
        };

        let mut run = SyncRun::start(tenant_id, loan_type);
        if let Err(e) = self.run_store.append_run(&run).await {
            // No run record, nothing to finalize.
            self.release_quietly(&lease).await;
            return Err(e.into());
        }

        let started = std::time::Instant::now();
        let executed = match tokio::time::timeout(
            self.config.run_timeout,
            self.execute(&mut run, &lease),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(PipelineError::Timeout(self.config.run_timeout)),
        };

        let report = self.finalize(&mut run, executed).await;
        self.release_quietly(&lease).await;
        histogram!("loansync_sync_duration_seconds").record(started.elapsed().as_secs_f64());
        report.map_err(Into::into)
    }

    async fn execute(
        &self,
        run: &mut SyncRun,
        lease: &SyncLease,
    ) -> Result<Execution, PipelineError> {
        self.transition(run, RunStatus::Fetching).await?;

        // Preflight so an empty or unreachable export fails fast.
        let credit_count = self
            .feed
            .row_count(&run.tenant_id, run.loan_type, FileType::Credit)
            .await?;
        let payment_count = self
            .feed
            .row_count(&run.tenant_id, run.loan_type, FileType::Payment)
            .await?;
        info!(
            credit_count,
            payment_count,
            "source feed preflight completed"
        );

        let credit_rows = self
            .feed
            .fetch(&run.tenant_id, run.loan_type, FileType::Credit)
            .await?;
        let payment_rows = self
            .feed
            .fetch(&run.tenant_id, run.loan_type, FileType::Payment)
            .await?;

        self.transition(run, RunStatus::Validating).await?;

        // Snapshot the live partition once, before any staging write, so
        // payments may reference credits loaded by earlier runs.
        let existing_ids = self
            .warehouse
            .existing_loan_ids(&run.tenant_id, run.loan_type)
            .await?;

        let mut findings = Vec::new();
        let mut valid_credit_rows: Vec<&RawRow> = Vec::new();
        let mut valid_credit_ids: HashSet<String> = HashSet::new();

        for (idx, row) in credit_rows.iter().enumerate() {
            let row_number = idx as u64 + 1;
            let row_findings = validate::validate_credit_row(row, row_number, run.loan_type);
            if row_findings.is_empty() {
                if let Some(id) = row.get("loan_account_number") {
                    valid_credit_ids.insert(id.trim().to_string());
                }
                valid_credit_rows.push(row);
            } else {
                findings.extend(row_findings);
            }
        }

        let known = KnownLoans::new(valid_credit_ids, existing_ids);
        let mut valid_payment_rows: Vec<&RawRow> = Vec::new();
        for (idx, row) in payment_rows.iter().enumerate() {
            let row_number = idx as u64 + 1;
            let mut row_findings = validate::validate_payment_row(row, row_number);
            if let Some(finding) = known.check(row, row_number) {
                row_findings.push(finding);
            }
            if row_findings.is_empty() {
                valid_payment_rows.push(row);
            } else {
                findings.extend(row_findings);
            }
        }

        let total_rows = credit_rows.len() as u64 + payment_rows.len() as u64;
        let error_ratio = findings.len() as f64 / total_rows.max(1) as f64;
        let execution = Execution {
            total_credit_rows: credit_rows.len() as u64,
            valid_credit_rows: valid_credit_rows.len() as u64,
            total_payment_rows: payment_rows.len() as u64,
            valid_payment_rows: valid_payment_rows.len() as u64,
            findings,
            threshold_failure: None,
        };

        if error_ratio > self.config.error_ratio_threshold {
            warn!(
                error_ratio,
                threshold = self.config.error_ratio_threshold,
                "error ratio above threshold, keeping existing warehouse data"
            );
            counter!("loansync_sync_threshold_aborts_total").increment(1);
            return Ok(Execution {
                threshold_failure: Some(FailureReason::ThresholdExceeded { error_ratio }),
                ..execution
            });
        }

        self.transition(run, RunStatus::Normalizing).await?;

        let mut credits: Vec<CreditRecord> = Vec::with_capacity(valid_credit_rows.len());
        for row in &valid_credit_rows {
            credits.push(normalize::normalize_credit(row, run.loan_type)?);
        }
        let mut payments: Vec<PaymentRecord> = Vec::with_capacity(valid_payment_rows.len());
        for row in &valid_payment_rows {
            payments.push(normalize::normalize_payment(row, run.loan_type)?);
        }

        self.transition(run, RunStatus::Storing).await?;

        // Storing can outlast the remaining lease time on large batches.
        if !self.locks.renew(lease).await? {
            warn!("sync lease expired before store stage, continuing under contention risk");
        }

        self.storage
            .replace(&run.tenant_id, run.loan_type, &credits, &payments)
            .await?;

        Ok(execution)
    }

    /// Write the terminal run record and build the caller-facing report.
    async fn finalize(
        &self,
        run: &mut SyncRun,
        executed: Result<Execution, PipelineError>,
    ) -> Result<SyncReport, RunStoreError> {
        let (outcome, findings, failure) = match executed {
            Ok(execution) => {
                let failure = execution.threshold_failure;
                let summary = error_summary(&execution.findings, failure.as_ref());
                (
                    RunOutcome {
                        total_credit_rows: execution.total_credit_rows,
                        valid_credit_rows: execution.valid_credit_rows,
                        total_payment_rows: execution.total_payment_rows,
                        valid_payment_rows: execution.valid_payment_rows,
                        error_count: execution.findings.len() as u64,
                        error_summary: summary,
                        completed_at: Some(Utc::now()),
                    },
                    execution.findings,
                    failure,
                )
            }
            Err(e) => {
                error!("sync pipeline failed: {}", e);
                let failure = FailureReason::Infrastructure {
                    message: e.to_string(),
                };
                let summary = error_summary(&[], Some(&failure));
                (
                    RunOutcome {
                        error_summary: summary,
                        completed_at: Some(Utc::now()),
                        ..RunOutcome::default()
                    },
                    Vec::new(),
                    Some(failure),
                )
            }
        };

        let status = if failure.is_some() {
            RunStatus::Failed
        } else {
            RunStatus::Completed
        };
        counter!("loansync_sync_runs_total", "status" => status.as_str()).increment(1);

        self.run_store.finish_run(run.id, status, &outcome).await?;
        if !findings.is_empty() {
            self.run_store.append_errors(run.id, &findings).await?;
        }

        run.status = status;
        run.total_credit_rows = outcome.total_credit_rows;
        run.valid_credit_rows = outcome.valid_credit_rows;
        run.total_payment_rows = outcome.total_payment_rows;
        run.valid_payment_rows = outcome.valid_payment_rows;
        run.error_count = outcome.error_count;
        run.error_summary = outcome.error_summary.clone();
        run.completed_at = outcome.completed_at;

        info!(
            run_id = %run.id,
            status = %run.status,
            error_count = run.error_count,
            "sync run finished"
        );
        Ok(SyncReport::from_run(run, failure))
    }

    async fn transition(&self, run: &mut SyncRun, status: RunStatus) -> Result<(), PipelineError> {
        run.status = status;
        self.run_store.update_status(run.id, status).await?;
        Ok(())
    }

    async fn release_quietly(&self, lease: &SyncLease) {
        if let Err(e) = self.locks.release(lease).await {
            warn!("failed to release sync lease {}: {}", lease.key, e);
        }
    }
}

/// Error counts grouped by kind, plus a `reason` entry on failed runs.
fn error_summary(
    findings: &[ValidationFinding],
    failure: Option<&FailureReason>,
) -> BTreeMap<String, serde_json::Value> {
    let mut summary: BTreeMap<String, serde_json::Value> = BTreeMap::new();
    let mut counts: BTreeMap<&'static str, u64> = BTreeMap::new();
    for finding in findings {
        *counts.entry(finding.kind.as_str()).or_default() += 1;
    }
    for (kind, count) in counts {
        summary.insert(kind.to_string(), serde_json::json!(count));
    }
    if let Some(failure) = failure
        && let Ok(value) = serde_json::to_value(failure)
    {
        summary.insert("reason".to_string(), value);
    }
    summary
}
