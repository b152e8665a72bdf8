//! Persistence for sync run records and their validation errors.

mod memory;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::records::{RunStatus, SyncRun, ValidationFinding};

pub use memory::MemoryRunStore;

#[derive(Debug, Error)]
pub enum RunStoreError {
    #[error("Run {run_id} not found")]
    NotFound { run_id: Uuid },

    #[error("Database error: {0}")]
    Db(#[from] sea_orm::DbErr),

    #[error("Stored run record is not decodable: {message}")]
    Decode { message: String },
}

/// Final counters written when a run reaches a terminal state.
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    pub total_credit_rows: u64,
    pub valid_credit_rows: u64,
    pub total_payment_rows: u64,
    pub valid_payment_rows: u64,
    pub error_count: u64,
    pub error_summary: BTreeMap<String, serde_json::Value>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Append-only log of sync runs. Implemented against the relational store in
/// production and in memory for tests.
#[async_trait]
pub trait RunStore: Send + Sync {
    async fn append_run(&self, run: &SyncRun) -> Result<(), RunStoreError>;

    async fn update_status(&self, run_id: Uuid, status: RunStatus) -> Result<(), RunStoreError>;

    /// Set the terminal status and counters in one write.
    async fn finish_run(
        &self,
        run_id: Uuid,
        status: RunStatus,
        outcome: &RunOutcome,
    ) -> Result<(), RunStoreError>;

    /// Persist validation findings for the run.
    async fn append_errors(
        &self,
        run_id: Uuid,
        findings: &[ValidationFinding],
    ) -> Result<(), RunStoreError>;

    async fn get_run(&self, tenant_id: &str, run_id: Uuid) -> Result<SyncRun, RunStoreError>;

    /// Most recent runs for a tenant, newest first.
    async fn recent_runs(&self, tenant_id: &str, limit: u64) -> Result<Vec<SyncRun>, RunStoreError>;

    async fn run_errors(
        &self,
        tenant_id: &str,
        run_id: Uuid,
    ) -> Result<Vec<ValidationFinding>, RunStoreError>;
}
