use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::str::FromStr;

use crate::models::job::{AnalysisJob, JobStatus, NewJob};

/// Postgres unique_violation error code, raised on duplicate job ids.
const UNIQUE_VIOLATION: &str = "23505";

/// Persistence seam for analysis jobs.
///
/// The production implementation is [`PgJobStore`]; tests substitute an
/// in-memory store. No method spans more than one write — the worker's
/// insert -> process -> update sequence is deliberately unsynchronized.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new job with status `pending`. A duplicate id is a
    /// [`StoreError::Duplicate`] conflict, not a retryable failure.
    async fn insert_pending(&self, job: &NewJob) -> Result<(), StoreError>;

    /// Fetch a job by id.
    async fn get(&self, job_id: &str) -> Result<Option<AnalysisJob>, StoreError>;

    /// Move the job to `processing`.
    async fn mark_processing(&self, job_id: &str) -> Result<(), StoreError>;

    /// Move the job to `completed`, storing the model output and clearing
    /// any previous error.
    async fn complete(&self, job_id: &str, result: &str) -> Result<(), StoreError>;

    /// Move the job to `failed`, storing the error message and clearing any
    /// previous result.
    async fn fail(&self, job_id: &str, error: &str) -> Result<(), StoreError>;
}

/// PostgreSQL-backed job store.
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn insert_pending(&self, job: &NewJob) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO analysis_jobs (id, user_id, image_url, status)
            VALUES ($1, $2, $3, 'pending')
            "#,
        )
        .bind(&job.id)
        .bind(&job.user_id)
        .bind(&job.image_url)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
                    return StoreError::Duplicate {
                        details: db_err.message().to_string(),
                    };
                }
            }
            StoreError::Database(e)
        })?;

        Ok(())
    }

    async fn get(&self, job_id: &str) -> Result<Option<AnalysisJob>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, image_url, status, result, error, created_at, updated_at
            FROM analysis_jobs
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match row {
            Some(r) => {
                let status_str: String = r.try_get("status")?;
                // The CHECK constraint keeps this unreachable; if it ever
                // fires, a corrupted row must not read as never-started.
                let status = JobStatus::from_str(&status_str).map_err(|_| {
                    StoreError::InvalidStatus {
                        job_id: job_id.to_string(),
                        status: status_str.clone(),
                    }
                })?;

                Some(AnalysisJob {
                    id: r.try_get("id")?,
                    user_id: r.try_get("user_id")?,
                    image_url: r.try_get("image_url")?,
                    status,
                    result: r.try_get("result")?,
                    error: r.try_get("error")?,
                    created_at: r.try_get("created_at")?,
                    updated_at: r.try_get("updated_at")?,
                })
            }
            None => None,
        })
    }

    async fn mark_processing(&self, job_id: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE analysis_jobs
            SET status = 'processing', updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn complete(&self, job_id: &str, result: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE analysis_jobs
            SET status = 'completed', result = $2, error = NULL, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .bind(result)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn fail(&self, job_id: &str, error: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE analysis_jobs
            SET status = 'failed', error = $2, result = NULL, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .bind(error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("duplicate job id: {details}")]
    Duplicate { details: String },

    #[error("job {job_id} has unrecognized status {status:?}")]
    InvalidStatus { job_id: String, status: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
