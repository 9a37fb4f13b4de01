//! Cron-driven run loop. Runs never overlap: a tick that finds the previous
//! run still in progress is skipped.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tracing::{error, info, warn};

use crate::services::pipeline::Pipeline;

pub struct RunScheduler {
    pipeline: Arc<Pipeline>,
    cron: String,
    running: Arc<Mutex<()>>,
}

/// Whether a tick started a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Ran,
    Skipped,
}

impl RunScheduler {
    pub fn new(pipeline: Arc<Pipeline>, cron: impl Into<String>) -> Self {
        Self {
            pipeline,
            cron: cron.into(),
            running: Arc::new(Mutex::new(())),
        }
    }

    /// One scheduled tick. Errors are logged; the schedule keeps going.
    pub async fn tick(pipeline: &Pipeline, running: &Mutex<()>) -> TickOutcome {
        let Ok(_guard) = running.try_lock() else {
            warn!("⏭️ [SCHEDULER] Previous run still in progress, skipping this tick");
            return TickOutcome::Skipped;
        };

        let now = Utc::now();
        match pipeline.run(now.date_naive(), now).await {
            Ok(summary) => info!(
                "✅ [SCHEDULER] Run {} finished: {} new, {} still buyable",
                summary.run_id,
                summary.outcome.new.len(),
                summary.outcome.still_buyable.len()
            ),
            Err(e) => error!("❌ [SCHEDULER] Run failed: {}", e),
        }
        TickOutcome::Ran
    }

    /// Registers the cron job and starts the scheduler. The returned handle
    /// keeps running in the background until shut down.
    pub async fn start(&self) -> Result<JobScheduler, JobSchedulerError> {
        let scheduler = JobScheduler::new().await?;

        let pipeline = self.pipeline.clone();
        let running = self.running.clone();
        let job = Job::new_async(self.cron.as_str(), move |_uuid, _l| {
            let pipeline = pipeline.clone();
            let running = running.clone();

            Box::pin(async move {
                Self::tick(&pipeline, &running).await;
            })
        })?;

        scheduler.add(job).await?;
        scheduler.start().await?;

        info!("🔔 [SCHEDULER] Cron job started with schedule: {}", self.cron);
        Ok(scheduler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Dispatcher;
    use crate::services::classifier::FractionalClassifier;

    fn pipeline(dir: &tempfile::TempDir) -> Pipeline {
        Pipeline::new(
            Vec::new(),
            FractionalClassifier::disabled(),
            Dispatcher::new(true),
            dir.path().join("db.json"),
        )
    }

    #[tokio::test]
    async fn test_tick_runs_when_idle() {
        let dir = tempfile::tempdir().unwrap();
        let running = Mutex::new(());
        assert_eq!(RunScheduler::tick(&pipeline(&dir), &running).await, TickOutcome::Ran);
    }

    #[tokio::test]
    async fn test_overlapping_tick_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let running = Mutex::new(());
        let _held = running.lock().await;
        assert_eq!(RunScheduler::tick(&pipeline(&dir), &running).await, TickOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_invalid_cron_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let scheduler = RunScheduler::new(Arc::new(pipeline(&dir)), "not a cron");
        assert!(scheduler.start().await.is_err());
    }
}
