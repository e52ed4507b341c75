use async_trait::async_trait;
use sqlx::postgres::PgListener;
use sqlx::PgPool;
use tokio::sync::mpsc;

use crate::models::job::AnalysisJob;

/// Channel published by the `analysis_jobs` update trigger.
const UPDATE_CHANNEL: &str = "analysis_job_updates";

/// Source of raw row-change payloads, so the forwarding loop can be
/// exercised without a live listener connection.
#[async_trait]
trait NotificationSource: Send {
    async fn recv_payload(&mut self) -> Result<String, sqlx::Error>;
}

#[async_trait]
impl NotificationSource for PgListener {
    async fn recv_payload(&mut self) -> Result<String, sqlx::Error> {
        Ok(self.recv().await?.payload().to_string())
    }
}

/// Subscriber to row-change notifications for a single job.
///
/// Each update replaces the subscriber's view of the job wholesale. The
/// subscription ends after the first terminal status; if the listener
/// connection drops, the stream simply ends — there is no reconnection or
/// missed-event replay.
pub struct JobObserver;

impl JobObserver {
    /// Start listening for updates to `job_id`. Returns a receiver yielding
    /// the new row for each update, closed after a terminal status.
    pub async fn subscribe(
        pool: &PgPool,
        job_id: String,
    ) -> Result<mpsc::Receiver<AnalysisJob>, sqlx::Error> {
        let mut listener = PgListener::connect_with(pool).await?;
        listener.listen(UPDATE_CHANNEL).await?;

        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(forward_updates(listener, tx, job_id));

        Ok(rx)
    }
}

/// Pump notifications into the subscriber channel until the job reaches a
/// terminal status, the source errors, or the subscriber goes away.
///
/// A stuck job may never notify again, so waiting on the source alone would
/// park this task (and its pooled listener connection) forever after the
/// subscriber disconnects. Racing against `tx.closed()` releases both as
/// soon as the receiver is dropped.
async fn forward_updates<S: NotificationSource>(
    mut source: S,
    tx: mpsc::Sender<AnalysisJob>,
    job_id: String,
) {
    loop {
        let payload = tokio::select! {
            payload = source.recv_payload() => payload,
            _ = tx.closed() => {
                tracing::debug!(job_id = %job_id, "job update subscriber dropped");
                break;
            }
        };

        let payload = match payload {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "job update listener dropped");
                break;
            }
        };

        let job: AnalysisJob = match serde_json::from_str(&payload) {
            Ok(job) => job,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring malformed job update payload");
                continue;
            }
        };

        if job.id != job_id {
            continue;
        }

        let terminal = job.status.is_terminal();
        if tx.send(job).await.is_err() {
            // Subscriber went away.
            break;
        }
        if terminal {
            break;
        }
    }
}
