//! # Sync Scheduler
//!
//! Background task that walks the configured (tenant, loan_type) targets on a
//! fixed tick and triggers a sync run for each. A pair whose lease is held by
//! another run is skipped for that tick; the lock manager keeps the at-most-
//! once guarantee, the scheduler only provides cadence.

use std::sync::Arc;

use metrics::{counter, histogram};
use tokio::time::{Duration as TokioDuration, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::SchedulerConfig;
use crate::sync_engine::{SyncEngine, SyncFailure};

/// Background scheduler service.
pub struct SyncScheduler {
    config: SchedulerConfig,
    engine: Arc<SyncEngine>,
}

impl SyncScheduler {
    /// Create a new scheduler instance.
    pub fn new(config: SchedulerConfig, engine: Arc<SyncEngine>) -> Self {
        Self { config, engine }
    }

    /// Run the scheduler loop until the provided shutdown token fires.
    #[instrument(skip_all)]
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            targets = self.config.targets.len(),
            tick_interval_seconds = self.config.tick_interval_seconds,
            "Starting sync scheduler"
        );
        let tick_interval = TokioDuration::from_secs(self.config.tick_interval_seconds);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Sync scheduler shutting down");
                    return;
                }
                _ = sleep(tick_interval) => {
                    self.tick().await;
                }
            }
        }
    }

    async fn tick(&self) {
        let started = std::time::Instant::now();
        for target in &self.config.targets {
            match self
                .engine
                .sync(&target.tenant_id, target.loan_type)
                .await
            {
                Ok(report) => {
                    info!(
                        tenant_id = target.tenant_id,
                        loan_type = %target.loan_type,
                        run_id = %report.run_id,
                        status = %report.status,
                        error_count = report.error_count,
                        "Scheduled sync finished"
                    );
                }
                Err(SyncFailure::Busy { .. }) => {
                    // A manual or previous scheduled run is still in flight.
                    debug!(
                        tenant_id = target.tenant_id,
                        loan_type = %target.loan_type,
                        "Skipping scheduled sync, pair is busy"
                    );
                    counter!("loansync_scheduler_skipped_busy_total").increment(1);
                }
                Err(e) => {
                    warn!(
                        tenant_id = target.tenant_id,
                        loan_type = %target.loan_type,
                        "Scheduled sync could not start: {}",
                        e
                    );
                    counter!("loansync_scheduler_start_failures_total").increment(1);
                }
            }
        }
        histogram!("loansync_scheduler_tick_seconds").record(started.elapsed().as_secs_f64());
    }
}
