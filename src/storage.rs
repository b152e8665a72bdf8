//! Staged, atomic replacement of warehouse partitions.
//!
//! The manager writes normalized records into the partition's staging area
//! in fixed size chunks and then swaps each file's partition in one step. A file with
//! zero records is never swapped, so an empty upstream export cannot wipe a
//! previously loaded partition.

use std::sync::Arc;

use metrics::histogram;
use tracing::{info, instrument, warn};

use crate::records::{CreditRecord, FileType, LoanType, PaymentRecord};
use crate::warehouse::{Warehouse, WarehouseError};

pub const DEFAULT_CHUNK_SIZE: usize = 10_000;

/// Writes normalized batches through the staging/swap protocol.
pub struct StorageManager {
    warehouse: Arc<dyn Warehouse>,
    chunk_size: usize,
}

impl StorageManager {
    pub fn new(warehouse: Arc<dyn Warehouse>, chunk_size: usize) -> Self {
        Self {
            warehouse,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Replace the tenant's live partitions with the given batch.
    ///
    /// Swap order is credit first, then payment, so payments never become
    /// visible before the credits they reference. On any failure the staging
    /// areas are cleared on a best-effort basis and the error is returned;
    /// live partitions that were not yet swapped stay as they were.
    #[instrument(skip(self, credits, payments))]
    pub async fn replace(
        &self,
        tenant_id: &str,
        loan_type: LoanType,
        credits: &[CreditRecord],
        payments: &[PaymentRecord],
    ) -> Result<(), WarehouseError> {
        let started = std::time::Instant::now();

        let result = self
            .replace_inner(tenant_id, loan_type, credits, payments)
            .await;

        if result.is_err() {
            for file_type in [FileType::Credit, FileType::Payment] {
                if let Err(e) = self
                    .warehouse
                    .clear_staging(tenant_id, loan_type, file_type)
                    .await
                {
                    warn!("Failed to clear {} staging after error: {}", file_type, e);
                }
            }
        }

        histogram!("loansync_storage_replace_seconds")
            .record(started.elapsed().as_secs_f64());
        result
    }

    async fn replace_inner(
        &self,
        tenant_id: &str,
        loan_type: LoanType,
        credits: &[CreditRecord],
        payments: &[PaymentRecord],
    ) -> Result<(), WarehouseError> {
        self.warehouse
            .clear_staging(tenant_id, loan_type, FileType::Credit)
            .await?;
        self.warehouse
            .clear_staging(tenant_id, loan_type, FileType::Payment)
            .await?;

        for chunk in credits.chunks(self.chunk_size) {
            self.warehouse
                .write_staging_credits(tenant_id, loan_type, chunk)
                .await?;
        }
        for chunk in payments.chunks(self.chunk_size) {
            self.warehouse
                .write_staging_payments(tenant_id, loan_type, chunk)
                .await?;
        }

        if credits.is_empty() {
            info!(tenant_id, %loan_type, "no credit records, keeping existing partition");
        } else {
            self.warehouse
                .swap_partition(tenant_id, loan_type, FileType::Credit)
                .await?;
        }

        if payments.is_empty() {
            info!(tenant_id, %loan_type, "no payment records, keeping existing partition");
        } else {
            self.warehouse
                .swap_partition(tenant_id, loan_type, FileType::Payment)
                .await?;
        }

        info!(
            tenant_id,
            %loan_type,
            credits = credits.len(),
            payments = payments.len(),
            "partition replacement completed"
        );
        Ok(())
    }
}
