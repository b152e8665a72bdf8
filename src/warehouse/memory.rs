//! In-memory warehouse with the same staging/swap protocol as a real
//! partitioned store. Used by the default deployment profile and by tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::records::{CreditRecord, FileType, LoanType, PaymentRecord};

use super::{Warehouse, WarehouseError};

// Staging is keyed by loan type so concurrent runs for different loan
// types of one tenant never see each other's staged rows.
#[derive(Default)]
struct TenantData {
    live_credits: HashMap<LoanType, Vec<CreditRecord>>,
    live_payments: HashMap<LoanType, Vec<PaymentRecord>>,
    staging_credits: HashMap<LoanType, Vec<CreditRecord>>,
    staging_payments: HashMap<LoanType, Vec<PaymentRecord>>,
}

/// Thread-safe in-memory warehouse keyed by tenant.
#[derive(Default)]
pub struct MemoryWarehouse {
    tenants: RwLock<HashMap<String, TenantData>>,
    fail_writes: AtomicBool,
    fail_swaps: AtomicBool,
}

impl MemoryWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent staging writes fail. Fault injection for tests.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent partition swaps fail. Fault injection for tests.
    pub fn fail_swaps(&self, fail: bool) {
        self.fail_swaps.store(fail, Ordering::SeqCst);
    }

    pub async fn live_credits(&self, tenant_id: &str, loan_type: LoanType) -> Vec<CreditRecord> {
        let tenants = self.tenants.read().await;
        tenants
            .get(tenant_id)
            .and_then(|t| t.live_credits.get(&loan_type))
            .cloned()
            .unwrap_or_default()
    }

    pub async fn live_payments(&self, tenant_id: &str, loan_type: LoanType) -> Vec<PaymentRecord> {
        let tenants = self.tenants.read().await;
        tenants
            .get(tenant_id)
            .and_then(|t| t.live_payments.get(&loan_type))
            .cloned()
            .unwrap_or_default()
    }

    /// Seed a live credit partition directly, bypassing staging.
    pub async fn seed_credits(
        &self,
        tenant_id: &str,
        loan_type: LoanType,
        records: Vec<CreditRecord>,
    ) {
        let mut tenants = self.tenants.write().await;
        tenants
            .entry(tenant_id.to_string())
            .or_default()
            .live_credits
            .insert(loan_type, records);
    }
}

#[async_trait]
impl Warehouse for MemoryWarehouse {
    async fn existing_loan_ids(
        &self,
        tenant_id: &str,
        loan_type: LoanType,
    ) -> Result<HashSet<String>, WarehouseError> {
        let tenants = self.tenants.read().await;
        Ok(tenants
            .get(tenant_id)
            .and_then(|t| t.live_credits.get(&loan_type))
            .map(|records| {
                records
                    .iter()
                    .map(|r| r.loan_account_number.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn clear_staging(
        &self,
        tenant_id: &str,
        loan_type: LoanType,
        file_type: FileType,
    ) -> Result<(), WarehouseError> {
        let mut tenants = self.tenants.write().await;
        let tenant = tenants.entry(tenant_id.to_string()).or_default();
        match file_type {
            FileType::Credit => {
                tenant.staging_credits.remove(&loan_type);
            }
            FileType::Payment => {
                tenant.staging_payments.remove(&loan_type);
            }
        }
        Ok(())
    }

    async fn write_staging_credits(
        &self,
        tenant_id: &str,
        loan_type: LoanType,
        chunk: &[CreditRecord],
    ) -> Result<(), WarehouseError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(WarehouseError::WriteFailed {
                message: "injected write failure".to_string(),
            });
        }
        let mut tenants = self.tenants.write().await;
        tenants
            .entry(tenant_id.to_string())
            .or_default()
            .staging_credits
            .entry(loan_type)
            .or_default()
            .extend_from_slice(chunk);
        Ok(())
    }

    async fn write_staging_payments(
        &self,
        tenant_id: &str,
        loan_type: LoanType,
        chunk: &[PaymentRecord],
    ) -> Result<(), WarehouseError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(WarehouseError::WriteFailed {
                message: "injected write failure".to_string(),
            });
        }
        let mut tenants = self.tenants.write().await;
        tenants
            .entry(tenant_id.to_string())
            .or_default()
            .staging_payments
            .entry(loan_type)
            .or_default()
            .extend_from_slice(chunk);
        Ok(())
    }

    async fn swap_partition(
        &self,
        tenant_id: &str,
        loan_type: LoanType,
        file_type: FileType,
    ) -> Result<(), WarehouseError> {
        if self.fail_swaps.load(Ordering::SeqCst) {
            return Err(WarehouseError::SwapFailed {
                tenant_id: tenant_id.to_string(),
                loan_type,
                file_type,
                message: "injected swap failure".to_string(),
            });
        }
        let mut tenants = self.tenants.write().await;
        let tenant = tenants.entry(tenant_id.to_string()).or_default();
        match file_type {
            FileType::Credit => {
                let staged = tenant.staging_credits.remove(&loan_type).unwrap_or_default();
                tenant.live_credits.insert(loan_type, staged);
            }
            FileType::Payment => {
                let staged = tenant.staging_payments.remove(&loan_type).unwrap_or_default();
                tenant.live_payments.insert(loan_type, staged);
            }
        }
        Ok(())
    }

    async fn live_count(
        &self,
        tenant_id: &str,
        loan_type: LoanType,
        file_type: FileType,
    ) -> Result<u64, WarehouseError> {
        let tenants = self.tenants.read().await;
        let count = tenants
            .get(tenant_id)
            .map(|t| match file_type {
                FileType::Credit => t.live_credits.get(&loan_type).map_or(0, Vec::len),
                FileType::Payment => t.live_payments.get(&loan_type).map_or(0, Vec::len),
            })
            .unwrap_or(0);
        Ok(count as u64)
    }
}
