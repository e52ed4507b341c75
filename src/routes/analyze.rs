use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use garde::Validate;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};

use crate::app_state::AppState;
use crate::db::store::{JobStore, StoreError};
use crate::models::analysis::{AcceptedResponse, AnalyzeRequest, JobStatusResponse};
use crate::models::job::NewJob;
use crate::routes::ApiError;
use crate::services::observer::JobObserver;
use crate::services::scheduler::{ScheduledJob, Scheduler};
use crate::services::worker::{self, MAX_ERROR_CHARS};

/// POST /api/v1/analyze — accept an image analysis job.
///
/// Inserts a pending row and schedules the background worker, replying 202
/// without waiting for the analysis to finish.
pub async fn submit_analysis(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AcceptedResponse>), ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::Validation(e.body_text()))?;
    request
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let accepted = accept_job(state.store.as_ref(), &state.scheduler, request).await?;
    Ok((StatusCode::ACCEPTED, Json(accepted)))
}

/// Core intake logic, separated from the axum plumbing.
///
/// Ordering matters: validation has already happened, so the only side
/// effects are the pending insert and, on success, the enqueue. A failed
/// enqueue makes a best-effort attempt to mark the just-created job failed
/// before surfacing a server error.
pub async fn accept_job(
    store: &dyn JobStore,
    scheduler: &Scheduler,
    request: AnalyzeRequest,
) -> Result<AcceptedResponse, ApiError> {
    let job = NewJob {
        id: request.job_id.clone(),
        user_id: request.user_id.clone(),
        image_url: request.image_url.clone(),
    };

    match store.insert_pending(&job).await {
        Ok(()) => {}
        Err(StoreError::Duplicate { details }) => {
            tracing::warn!(job_id = %job.id, "rejecting duplicate job id");
            return Err(ApiError::Conflict {
                message: "Failed to create job record: a job with this id already exists"
                    .to_string(),
                details,
            });
        }
        Err(e) => {
            tracing::error!(job_id = %job.id, error = %e, "failed to insert job record");
            return Err(ApiError::Internal("Failed to initialize job.".to_string()));
        }
    }

    metrics::counter!("analysis_jobs_submitted").increment(1);
    tracing::info!(job_id = %job.id, user_id = %job.user_id, "job record created");

    let scheduled = ScheduledJob {
        job_id: job.id.clone(),
        image_url: job.image_url,
    };

    if let Err(e) = scheduler.schedule(scheduled) {
        tracing::error!(job_id = %job.id, error = %e, "failed to schedule background task");

        let message = worker::truncate_error(
            &format!("Failed to schedule background task: {e}"),
            MAX_ERROR_CHARS,
        );
        if let Err(db_err) = store.fail(&job.id, &message).await {
            tracing::error!(
                job_id = %job.id,
                error = %db_err,
                "failed to mark job as failed after scheduling error"
            );
        }

        return Err(ApiError::Internal("Failed to schedule job.".to_string()));
    }

    Ok(AcceptedResponse {
        message: "Job accepted for processing".to_string(),
        job_id: job.id,
    })
}

/// GET /api/v1/analyze/{job_id} — look up a job's current state.
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobStatusResponse>, ApiError> {
    let job = state
        .store
        .get(&job_id)
        .await
        .map_err(|e| {
            tracing::error!(job_id = %job_id, error = %e, "failed to load job");
            ApiError::Internal("Failed to load job.".to_string())
        })?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(JobStatusResponse {
        job_id: job.id,
        status: job.status.to_string(),
        result: job.result,
        error: job.error,
    }))
}

/// GET /api/v1/analyze/{job_id}/events — stream row updates for one job as
/// server-sent events. The stream ends once the job reaches a terminal
/// status, or silently if the underlying listener drops.
pub async fn job_events(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    let updates = JobObserver::subscribe(&state.db, job_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to subscribe to job updates");
            ApiError::Internal("Failed to subscribe to job updates.".to_string())
        })?;

    let stream = ReceiverStream::new(updates)
        .map(|job| Event::default().event("update").json_data(&job));

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
