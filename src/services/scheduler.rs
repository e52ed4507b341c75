use std::sync::Arc;
use tokio::sync::mpsc;

use crate::db::store::JobStore;
use crate::services::vision::VisionModel;
use crate::services::worker;

/// Work item handed from the intake endpoint to the runner.
#[derive(Debug, Clone)]
pub struct ScheduledJob {
    pub job_id: String,
    pub image_url: String,
}

/// Producer half of the in-process work queue.
///
/// The intake endpoint only ever touches this handle; the consuming
/// [`JobRunner`] is spawned once at startup. Keeping the two halves separate
/// leaves room for cancellation or retry policies without changing the
/// intake contract.
pub struct Scheduler {
    tx: mpsc::UnboundedSender<ScheduledJob>,
}

/// Consumer half of the work queue. Spawns one detached task per job; jobs
/// run independently with no coordination between them.
pub struct JobRunner {
    rx: mpsc::UnboundedReceiver<ScheduledJob>,
}

/// Create a connected scheduler/runner pair.
pub fn work_queue() -> (Scheduler, JobRunner) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Scheduler { tx }, JobRunner { rx })
}

impl Scheduler {
    /// Enqueue a job for background analysis. Fails only if the runner task
    /// has shut down, which the intake endpoint treats as a server error.
    pub fn schedule(&self, job: ScheduledJob) -> Result<(), ScheduleError> {
        self.tx
            .send(job)
            .map_err(|e| ScheduleError::Unavailable(e.0.job_id))?;
        metrics::gauge!("analysis_queue_depth").increment(1.0);
        Ok(())
    }
}

impl JobRunner {
    /// Consume the queue until every `Scheduler` handle is dropped.
    pub async fn run(mut self, store: Arc<dyn JobStore>, model: Arc<dyn VisionModel>) {
        while let Some(job) = self.rx.recv().await {
            metrics::gauge!("analysis_queue_depth").decrement(1.0);
            tokio::spawn(worker::run_analysis(store.clone(), model.clone(), job));
        }
        tracing::info!("job runner shutting down, queue closed");
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("job runner unavailable, could not schedule job {0}")]
    Unavailable(String),
}
