use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

use watchsync_config::SchedulerConfig;

use crate::sync::{SyncEngine, SyncError};

/// Cron-driven background runner for full reconciliation passes.
pub struct SyncScheduler {
    scheduler: JobScheduler,
    engine: Arc<SyncEngine>,
    config: SchedulerConfig,
}

impl SyncScheduler {
    pub async fn new(engine: Arc<SyncEngine>, config: SchedulerConfig) -> Result<Self> {
        let scheduler = JobScheduler::new()
            .await
            .context("Failed to create job scheduler")?;
        Ok(Self {
            scheduler,
            engine,
            config,
        })
    }

    /// Register the cron job and start the scheduler. Optionally runs one
    /// pass immediately so a fresh deployment converges without waiting
    /// for the first tick.
    pub async fn start(&self) -> Result<()> {
        if self.config.run_on_startup {
            run_pass(&self.engine).await;
        }

        let engine = self.engine.clone();
        let job = Job::new_async(self.config.schedule.as_str(), move |_id, _scheduler| {
            let engine = engine.clone();
            Box::pin(async move {
                run_pass(&engine).await;
            })
        })
        .with_context(|| format!("Invalid cron schedule: {}", self.config.schedule))?;

        self.scheduler
            .add(job)
            .await
            .context("Failed to register sync job")?;
        self.scheduler
            .start()
            .await
            .context("Failed to start scheduler")?;

        info!(
            schedule = %self.config.schedule,
            run_on_startup = self.config.run_on_startup,
            "Sync scheduler started"
        );
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        self.engine.cancel();
        self.scheduler
            .shutdown()
            .await
            .context("Failed to shut down scheduler")?;
        info!("Sync scheduler stopped");
        Ok(())
    }
}

async fn run_pass(engine: &SyncEngine) {
    match engine.run_full_sync().await {
        Ok(summary) => info!("Scheduled sync finished: {}", summary.line()),
        // A still-running previous pass is normal under slow networks
        Err(SyncError::AlreadyRunning) => {
            warn!("Scheduled sync skipped: previous pass still running")
        }
        Err(SyncError::Cancelled) => info!("Scheduled sync cancelled"),
        Err(e) => error!("Scheduled sync failed: {}", e),
    }
}
