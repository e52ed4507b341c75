use std::sync::Arc;
use std::time::Instant;

use crate::db::store::JobStore;
use crate::services::scheduler::ScheduledJob;
use crate::services::vision::{VisionError, VisionModel};

/// Stored error messages are capped at this many characters.
pub const MAX_ERROR_CHARS: usize = 1000;

/// Run one analysis job to completion.
///
/// Each step writes to the store independently; nothing is transactional.
/// A failed `processing` write is logged and skipped over, and a failed
/// terminal write leaves the job stuck in whatever state the last successful
/// write produced. Observers see that as a job that never finishes, which is
/// the accepted failure mode here.
pub async fn run_analysis(
    store: Arc<dyn JobStore>,
    model: Arc<dyn VisionModel>,
    job: ScheduledJob,
) {
    let start = Instant::now();
    tracing::info!(job_id = %job.job_id, "starting background analysis");

    if let Err(e) = store.mark_processing(&job.job_id).await {
        tracing::warn!(
            job_id = %job.job_id,
            error = %e,
            "could not mark job as processing, attempting analysis anyway"
        );
    }

    match analyze(model.as_ref(), &job.image_url).await {
        Ok(text) => {
            if let Err(e) = store.complete(&job.job_id, &text).await {
                tracing::error!(job_id = %job.job_id, error = %e, "failed to record completed job");
            } else {
                metrics::counter!("analysis_jobs_completed").increment(1);
                tracing::info!(
                    job_id = %job.job_id,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "analysis completed"
                );
            }
        }
        Err(e) => {
            let message = truncate_error(&e.to_string(), MAX_ERROR_CHARS);
            if let Err(db_err) = store.fail(&job.job_id, &message).await {
                tracing::error!(
                    job_id = %job.job_id,
                    error = %db_err,
                    "failed to record failed job, leaving it in its last written state"
                );
            } else {
                metrics::counter!("analysis_jobs_failed").increment(1);
            }
            tracing::error!(
                job_id = %job.job_id,
                error = %e,
                duration_ms = start.elapsed().as_millis() as u64,
                "analysis failed"
            );
        }
    }

    metrics::histogram!("analysis_processing_seconds").record(start.elapsed().as_secs_f64());
}

/// Call the model, treating an empty reply as a failure rather than a
/// silently completed job.
async fn analyze(model: &dyn VisionModel, image_url: &str) -> Result<String, VisionError> {
    let text = model.analyze_image(image_url).await?;
    if text.trim().is_empty() {
        return Err(VisionError::EmptyResponse);
    }
    Ok(text)
}

/// Cap an error message at `max` characters, respecting char boundaries.
pub fn truncate_error(message: &str, max: usize) -> String {
    message.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_messages_pass_through() {
        assert_eq!(truncate_error("model timed out", MAX_ERROR_CHARS), "model timed out");
    }

    #[test]
    fn long_messages_truncate_to_exactly_max_chars() {
        let long = "x".repeat(MAX_ERROR_CHARS + 500);
        let truncated = truncate_error(&long, MAX_ERROR_CHARS);
        assert_eq!(truncated.chars().count(), MAX_ERROR_CHARS);
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let long = "é".repeat(MAX_ERROR_CHARS + 1);
        let truncated = truncate_error(&long, MAX_ERROR_CHARS);
        assert_eq!(truncated.chars().count(), MAX_ERROR_CHARS);
    }
}
