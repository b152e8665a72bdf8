//! In-memory run log for tests and standalone deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::records::{RunStatus, SyncRun, ValidationFinding};

use super::{RunOutcome, RunStore, RunStoreError};

#[derive(Default)]
pub struct MemoryRunStore {
    runs: RwLock<Vec<SyncRun>>,
    errors: RwLock<HashMap<Uuid, Vec<ValidationFinding>>>,
}

impl MemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RunStore for MemoryRunStore {
    async fn append_run(&self, run: &SyncRun) -> Result<(), RunStoreError> {
        self.runs.write().await.push(run.clone());
        Ok(())
    }

    async fn update_status(&self, run_id: Uuid, status: RunStatus) -> Result<(), RunStoreError> {
        let mut runs = self.runs.write().await;
        let run = runs
            .iter_mut()
            .find(|r| r.id == run_id)
            .ok_or(RunStoreError::NotFound { run_id })?;
        run.status = status;
        Ok(())
    }

    async fn finish_run(
        &self,
        run_id: Uuid,
        status: RunStatus,
        outcome: &RunOutcome,
    ) -> Result<(), RunStoreError> {
        let mut runs = self.runs.write().await;
        let run = runs
            .iter_mut()
            .find(|r| r.id == run_id)
            .ok_or(RunStoreError::NotFound { run_id })?;
        run.status = status;
        run.total_credit_rows = outcome.total_credit_rows;
        run.valid_credit_rows = outcome.valid_credit_rows;
        run.total_payment_rows = outcome.total_payment_rows;
        run.valid_payment_rows = outcome.valid_payment_rows;
        run.error_count = outcome.error_count;
        run.error_summary = outcome.error_summary.clone();
        run.completed_at = outcome.completed_at;
        Ok(())
    }

    async fn append_errors(
        &self,
        run_id: Uuid,
        findings: &[ValidationFinding],
    ) -> Result<(), RunStoreError> {
        self.errors
            .write()
            .await
            .entry(run_id)
            .or_default()
            .extend_from_slice(findings);
        Ok(())
    }

    async fn get_run(&self, tenant_id: &str, run_id: Uuid) -> Result<SyncRun, RunStoreError> {
        let runs = self.runs.read().await;
        runs.iter()
            .find(|r| r.id == run_id && r.tenant_id == tenant_id)
            .cloned()
            .ok_or(RunStoreError::NotFound { run_id })
    }

    async fn recent_runs(
        &self,
        tenant_id: &str,
        limit: u64,
    ) -> Result<Vec<SyncRun>, RunStoreError> {
        let runs = self.runs.read().await;
        let mut matching: Vec<SyncRun> = runs
            .iter()
            .filter(|r| r.tenant_id == tenant_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        matching.truncate(limit as usize);
        Ok(matching)
    }

    async fn run_errors(
        &self,
        tenant_id: &str,
        run_id: Uuid,
    ) -> Result<Vec<ValidationFinding>, RunStoreError> {
        // Validate tenant ownership through the run itself.
        self.get_run(tenant_id, run_id).await?;
        let errors = self.errors.read().await;
        Ok(errors.get(&run_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{ErrorKind, FileType, LoanType};

    #[tokio::test]
    async fn run_lifecycle_is_persisted() {
        let store = MemoryRunStore::new();
        let run = SyncRun::start("bank-a", LoanType::Retail);
        store.append_run(&run).await.unwrap();

        store
            .update_status(run.id, RunStatus::Fetching)
            .await
            .unwrap();
        store
            .finish_run(
                run.id,
                RunStatus::Completed,
                &RunOutcome {
                    total_credit_rows: 10,
                    valid_credit_rows: 9,
                    error_count: 1,
                    completed_at: Some(chrono::Utc::now()),
                    ..RunOutcome::default()
                },
            )
            .await
            .unwrap();

        let loaded = store.get_run("bank-a", run.id).await.unwrap();
        assert_eq!(loaded.status, RunStatus::Completed);
        assert_eq!(loaded.valid_credit_rows, 9);
        assert!(loaded.completed_at.is_some());
    }

    #[tokio::test]
    async fn runs_are_tenant_scoped() {
        let store = MemoryRunStore::new();
        let run = SyncRun::start("bank-a", LoanType::Retail);
        store.append_run(&run).await.unwrap();

        assert!(store.get_run("bank-b", run.id).await.is_err());
        assert!(store.recent_runs("bank-b", 10).await.unwrap().is_empty());
        assert!(store.run_errors("bank-b", run.id).await.is_err());
    }

    #[tokio::test]
    async fn errors_round_trip() {
        let store = MemoryRunStore::new();
        let run = SyncRun::start("bank-a", LoanType::Retail);
        store.append_run(&run).await.unwrap();

        let finding = ValidationFinding {
            row_number: 3,
            file_type: FileType::Credit,
            field_name: "customer_id".to_string(),
            kind: ErrorKind::Required,
            message: "customer_id is required".to_string(),
            raw_value: None,
        };
        store.append_errors(run.id, &[finding.clone()]).await.unwrap();

        let loaded = store.run_errors("bank-a", run.id).await.unwrap();
        assert_eq!(loaded, vec![finding]);
    }
}
