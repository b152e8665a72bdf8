//! # Loan Sync Service Entry Point
//!
//! Wires configuration, telemetry, the database-backed run log, the sync
//! engine and the optional background scheduler, then serves the API.

use std::sync::Arc;
use std::time::Duration;

use sea_orm_migration::MigratorTrait;
use tokio_util::sync::CancellationToken;

use loansync::config::ConfigLoader;
use loansync::db::init_pool;
use loansync::feed::{FeedRetryConfig, HttpFeed, MemoryFeed, SourceFeed};
use loansync::lock::{LockManager, MemoryLeaseStore};
use loansync::migration::Migrator;
use loansync::repositories::DbRunStore;
use loansync::scheduler::SyncScheduler;
use loansync::server::{AppState, run_server};
use loansync::storage::StorageManager;
use loansync::sync_engine::{EngineConfig, SyncEngine};
use loansync::telemetry;
use loansync::warehouse::MemoryWarehouse;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigLoader::new().load()?;

    telemetry::init_tracing(&config)?;
    tracing::info!(profile = config.profile, "Loaded configuration");

    let db = init_pool(&config).await?;
    Migrator::up(&db, None).await?;

    let feed: Arc<dyn SourceFeed> = match &config.source_feed_base_url {
        Some(base) => Arc::new(HttpFeed::new(
            base.parse()?,
            FeedRetryConfig {
                max_attempts: config.feed_retry.max_attempts,
                backoff_ms: config.feed_retry.backoff_ms,
                jitter_factor: config.feed_retry.jitter_factor,
            },
        )),
        None => {
            tracing::warn!("No source feed configured, serving an empty in-memory feed");
            Arc::new(MemoryFeed::new())
        }
    };

    let warehouse = Arc::new(MemoryWarehouse::new());
    let run_store = Arc::new(DbRunStore::new(db.clone()));
    let engine = Arc::new(SyncEngine::new(
        feed,
        warehouse.clone(),
        StorageManager::new(warehouse, config.staging_chunk_size),
        run_store.clone(),
        LockManager::new(
            Arc::new(MemoryLeaseStore::new()),
            Duration::from_secs(config.lock_ttl_seconds),
        ),
        EngineConfig {
            error_ratio_threshold: config.error_ratio_threshold,
            run_timeout: Duration::from_secs(config.run_timeout_seconds),
        },
    ));

    let shutdown = CancellationToken::new();
    if config.scheduler.enabled {
        let scheduler = SyncScheduler::new(config.scheduler.clone(), engine.clone());
        tokio::spawn(scheduler.run(shutdown.clone()));
    }

    let state = AppState {
        engine,
        run_store,
        db: Some(db),
    };
    let result = run_server(&config, state).await;
    shutdown.cancel();
    result
}
