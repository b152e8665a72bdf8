//! Test utilities: in-memory SQLite setup and engine harness builders.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use sea_orm::{Database, DatabaseConnection};

use loansync::feed::MemoryFeed;
use loansync::lock::{LeaseStore, LockManager, MemoryLeaseStore};
use loansync::migration::{Migrator, MigratorTrait};
use loansync::records::RawRow;
use loansync::runlog::{MemoryRunStore, RunStore};
use loansync::storage::StorageManager;
use loansync::sync_engine::{EngineConfig, SyncEngine};
use loansync::warehouse::MemoryWarehouse;

/// Sets up an in-memory SQLite database with all migrations applied.
#[allow(dead_code)]
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

/// All in-memory collaborators of one engine, exposed for assertions.
pub struct EngineHarness {
    pub feed: Arc<MemoryFeed>,
    pub warehouse: Arc<MemoryWarehouse>,
    pub run_store: Arc<MemoryRunStore>,
    pub leases: Arc<MemoryLeaseStore>,
    pub engine: Arc<SyncEngine>,
}

/// Builds an engine over in-memory collaborators with the given chunk size.
pub fn engine_harness(config: EngineConfig, chunk_size: usize) -> EngineHarness {
    let feed = Arc::new(MemoryFeed::new());
    let warehouse = Arc::new(MemoryWarehouse::new());
    let run_store = Arc::new(MemoryRunStore::new());
    let leases = Arc::new(MemoryLeaseStore::new());
    let engine = Arc::new(SyncEngine::new(
        feed.clone(),
        warehouse.clone(),
        StorageManager::new(warehouse.clone(), chunk_size),
        run_store.clone() as Arc<dyn RunStore>,
        LockManager::new(
            leases.clone() as Arc<dyn LeaseStore>,
            Duration::from_secs(600),
        ),
        config,
    ));
    EngineHarness {
        feed,
        warehouse,
        run_store,
        leases,
        engine,
    }
}

/// A raw retail credit row that passes every field validation.
#[allow(dead_code)]
pub fn valid_credit_row(loan_id: &str) -> RawRow {
    RawRow::from([
        ("loan_account_number".to_string(), loan_id.to_string()),
        ("customer_id".to_string(), format!("CUST-{loan_id}")),
        ("customer_type".to_string(), "I".to_string()),
        ("loan_status_code".to_string(), "A".to_string()),
        ("days_past_due".to_string(), "0".to_string()),
        ("total_installment_count".to_string(), "12".to_string()),
        ("outstanding_installment_count".to_string(), "6".to_string()),
        ("paid_installment_count".to_string(), "6".to_string()),
        ("original_loan_amount".to_string(), "10000".to_string()),
        (
            "outstanding_principal_balance".to_string(),
            "5000".to_string(),
        ),
        ("nominal_interest_rate".to_string(), "18.5".to_string()),
        ("loan_start_date".to_string(), "20250115".to_string()),
        ("first_payment_date".to_string(), "2025-02-15".to_string()),
        ("insurance_included".to_string(), "E".to_string()),
    ])
}

/// A raw payment row that passes every field validation.
#[allow(dead_code)]
pub fn valid_payment_row(loan_id: &str, installment: u32) -> RawRow {
    RawRow::from([
        ("loan_account_number".to_string(), loan_id.to_string()),
        ("installment_number".to_string(), installment.to_string()),
        ("installment_status".to_string(), "A".to_string()),
        ("installment_amount".to_string(), "900".to_string()),
        ("principal_component".to_string(), "750".to_string()),
        ("interest_component".to_string(), "150".to_string()),
        (
            "scheduled_payment_date".to_string(),
            "15.02.2025".to_string(),
        ),
    ])
}
