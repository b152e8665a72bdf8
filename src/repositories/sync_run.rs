//! # SyncRun Repository
//!
//! Relational [`RunStore`] implementation over the sync_runs and
//! validation_errors tables, with tenant-aware access patterns.

use std::collections::BTreeMap;

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, sea_query::Expr,
};
use uuid::Uuid;

use crate::models::sync_run::{
    ActiveModel as RunActiveModel, Column as RunColumn, Entity as RunEntity, Model as RunModel,
};
use crate::models::validation_error::{
    ActiveModel as ErrorActiveModel, Column as ErrorColumn, Entity as ErrorEntity,
    Model as ErrorModel,
};
use crate::records::{ErrorKind, FileType, LoanType, RunStatus, SyncRun, ValidationFinding};
use crate::runlog::{RunOutcome, RunStore, RunStoreError};

/// Findings per INSERT when persisting validation errors.
const ERROR_INSERT_BATCH: usize = 1000;

/// Repository for sync run database operations
pub struct DbRunStore {
    db: DatabaseConnection,
}

impl DbRunStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn decode_run(model: RunModel) -> Result<SyncRun, RunStoreError> {
        let loan_type =
            LoanType::parse(&model.loan_type).ok_or_else(|| RunStoreError::Decode {
                message: format!("unknown loan_type {:?} on run {}", model.loan_type, model.id),
            })?;
        let status = RunStatus::parse(&model.status).ok_or_else(|| RunStoreError::Decode {
            message: format!("unknown status {:?} on run {}", model.status, model.id),
        })?;
        let error_summary: BTreeMap<String, serde_json::Value> = match model.error_summary {
            Some(value) => {
                serde_json::from_value(value).map_err(|e| RunStoreError::Decode {
                    message: format!("error_summary on run {}: {e}", model.id),
                })?
            }
            None => BTreeMap::new(),
        };
        Ok(SyncRun {
            id: model.id,
            tenant_id: model.tenant_id,
            loan_type,
            batch_id: model.batch_id,
            status,
            total_credit_rows: model.total_credit_rows.max(0) as u64,
            valid_credit_rows: model.valid_credit_rows.max(0) as u64,
            total_payment_rows: model.total_payment_rows.max(0) as u64,
            valid_payment_rows: model.valid_payment_rows.max(0) as u64,
            error_count: model.error_count.max(0) as u64,
            error_summary,
            started_at: model.started_at.into(),
            completed_at: model.completed_at.map(Into::into),
        })
    }

    fn decode_finding(model: ErrorModel) -> Result<ValidationFinding, RunStoreError> {
        let file_type =
            FileType::parse(&model.file_type).ok_or_else(|| RunStoreError::Decode {
                message: format!("unknown file_type {:?} on finding {}", model.file_type, model.id),
            })?;
        let kind = ErrorKind::parse(&model.error_type).ok_or_else(|| RunStoreError::Decode {
            message: format!(
                "unknown error_type {:?} on finding {}",
                model.error_type, model.id
            ),
        })?;
        Ok(ValidationFinding {
            row_number: model.row_number.max(0) as u64,
            file_type,
            field_name: model.field_name,
            kind,
            message: model.error_message,
            raw_value: model.raw_value,
        })
    }

    async fn find_tenant_run(
        &self,
        tenant_id: &str,
        run_id: Uuid,
    ) -> Result<RunModel, RunStoreError> {
        RunEntity::find_by_id(run_id)
            .filter(RunColumn::TenantId.eq(tenant_id))
            .one(&self.db)
            .await?
            .ok_or(RunStoreError::NotFound { run_id })
    }
}

#[async_trait]
impl RunStore for DbRunStore {
    async fn append_run(&self, run: &SyncRun) -> Result<(), RunStoreError> {
        let model = RunActiveModel {
            id: Set(run.id),
            tenant_id: Set(run.tenant_id.clone()),
            loan_type: Set(run.loan_type.as_str().to_string()),
            batch_id: Set(run.batch_id),
            status: Set(run.status.as_str().to_string()),
            total_credit_rows: Set(run.total_credit_rows as i64),
            valid_credit_rows: Set(run.valid_credit_rows as i64),
            total_payment_rows: Set(run.total_payment_rows as i64),
            valid_payment_rows: Set(run.valid_payment_rows as i64),
            error_count: Set(run.error_count as i64),
            error_summary: Set(None),
            started_at: Set(run.started_at.fixed_offset()),
            completed_at: Set(None),
        };
        model.insert(&self.db).await?;
        Ok(())
    }

    async fn update_status(&self, run_id: Uuid, status: RunStatus) -> Result<(), RunStoreError> {
        let updated = RunEntity::update_many()
            .col_expr(RunColumn::Status, Expr::value(status.as_str()))
            .filter(RunColumn::Id.eq(run_id))
            .exec(&self.db)
            .await?;
        if updated.rows_affected == 0 {
            return Err(RunStoreError::NotFound { run_id });
        }
        Ok(())
    }

    async fn finish_run(
        &self,
        run_id: Uuid,
        status: RunStatus,
        outcome: &RunOutcome,
    ) -> Result<(), RunStoreError> {
        let summary = if outcome.error_summary.is_empty() {
            None
        } else {
            Some(
                serde_json::to_value(&outcome.error_summary).map_err(|e| {
                    RunStoreError::Decode {
                        message: format!("error_summary for run {run_id}: {e}"),
                    }
                })?,
            )
        };

        let model = RunActiveModel {
            id: Set(run_id),
            status: Set(status.as_str().to_string()),
            total_credit_rows: Set(outcome.total_credit_rows as i64),
            valid_credit_rows: Set(outcome.valid_credit_rows as i64),
            total_payment_rows: Set(outcome.total_payment_rows as i64),
            valid_payment_rows: Set(outcome.valid_payment_rows as i64),
            error_count: Set(outcome.error_count as i64),
            error_summary: Set(summary),
            completed_at: Set(outcome.completed_at.map(|t| t.fixed_offset())),
            ..Default::default()
        };
        model.update(&self.db).await?;
        Ok(())
    }

    async fn append_errors(
        &self,
        run_id: Uuid,
        findings: &[ValidationFinding],
    ) -> Result<(), RunStoreError> {
        for batch in findings.chunks(ERROR_INSERT_BATCH) {
            let models: Vec<ErrorActiveModel> = batch
                .iter()
                .map(|f| ErrorActiveModel {
                    id: Set(Uuid::new_v4()),
                    sync_run_id: Set(run_id),
                    row_number: Set(f.row_number as i64),
                    file_type: Set(f.file_type.as_str().to_string()),
                    field_name: Set(f.field_name.clone()),
                    error_type: Set(f.kind.as_str().to_string()),
                    error_message: Set(f.message.clone()),
                    raw_value: Set(f.raw_value.clone()),
                })
                .collect();
            ErrorEntity::insert_many(models).exec(&self.db).await?;
        }
        Ok(())
    }

    async fn get_run(&self, tenant_id: &str, run_id: Uuid) -> Result<SyncRun, RunStoreError> {
        let model = self.find_tenant_run(tenant_id, run_id).await?;
        Self::decode_run(model)
    }

    async fn recent_runs(
        &self,
        tenant_id: &str,
        limit: u64,
    ) -> Result<Vec<SyncRun>, RunStoreError> {
        let models = RunEntity::find()
            .filter(RunColumn::TenantId.eq(tenant_id))
            .order_by_desc(RunColumn::StartedAt)
            .limit(limit)
            .all(&self.db)
            .await?;
        models.into_iter().map(Self::decode_run).collect()
    }

    async fn run_errors(
        &self,
        tenant_id: &str,
        run_id: Uuid,
    ) -> Result<Vec<ValidationFinding>, RunStoreError> {
        // Tenant ownership is enforced through the parent run.
        self.find_tenant_run(tenant_id, run_id).await?;
        let models = ErrorEntity::find()
            .filter(ErrorColumn::SyncRunId.eq(run_id))
            .order_by_asc(ErrorColumn::RowNumber)
            .all(&self.db)
            .await?;
        models.into_iter().map(Self::decode_finding).collect()
    }
}
