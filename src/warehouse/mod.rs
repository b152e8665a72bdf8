//! Analytical warehouse abstraction.
//!
//! The warehouse stores normalized credit and payment records per tenant in
//! live partitions keyed by loan type. Writes go to staging areas scoped to
//! one (tenant, loan type, file type) partition and become visible only
//! through an atomic partition swap, so readers never observe a half-loaded
//! batch and concurrent loads of different partitions never touch each
//! other's staging.

mod memory;

use std::collections::HashSet;

use async_trait::async_trait;
use thiserror::Error;

use crate::records::{CreditRecord, FileType, LoanType, PaymentRecord};

pub use memory::MemoryWarehouse;

#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error("Warehouse write failed: {message}")]
    WriteFailed { message: String },

    #[error("Partition swap failed for tenant {tenant_id}, {loan_type} {file_type}: {message}")]
    SwapFailed {
        tenant_id: String,
        loan_type: LoanType,
        file_type: FileType,
        message: String,
    },
}

/// Tenant-scoped warehouse operations used by the storage manager and the
/// cross-file validator.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Loan account numbers currently in the live credit partition.
    async fn existing_loan_ids(
        &self,
        tenant_id: &str,
        loan_type: LoanType,
    ) -> Result<HashSet<String>, WarehouseError>;

    /// Drop all staged rows of one file type for the tenant.
    async fn clear_staging(
        &self,
        tenant_id: &str,
        loan_type: LoanType,
        file_type: FileType,
    ) -> Result<(), WarehouseError>;

    /// Append a chunk of credit records to the partition's staging area.
    async fn write_staging_credits(
        &self,
        tenant_id: &str,
        loan_type: LoanType,
        chunk: &[CreditRecord],
    ) -> Result<(), WarehouseError>;

    /// Append a chunk of payment records to the partition's staging area.
    async fn write_staging_payments(
        &self,
        tenant_id: &str,
        loan_type: LoanType,
        chunk: &[PaymentRecord],
    ) -> Result<(), WarehouseError>;

    /// Atomically replace the live partition with the staged rows.
    ///
    /// After a successful swap the staged rows ARE the live partition; the
    /// previous live content is gone. On failure the live partition must be
    /// left untouched.
    async fn swap_partition(
        &self,
        tenant_id: &str,
        loan_type: LoanType,
        file_type: FileType,
    ) -> Result<(), WarehouseError>;

    /// Row count of the live partition, for reporting and tests.
    async fn live_count(
        &self,
        tenant_id: &str,
        loan_type: LoanType,
        file_type: FileType,
    ) -> Result<u64, WarehouseError>;
}
