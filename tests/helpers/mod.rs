//! Test doubles for the job store and vision model.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use roomsight::db::store::{JobStore, StoreError};
use roomsight::models::job::{AnalysisJob, JobStatus, NewJob};
use roomsight::services::vision::{VisionError, VisionModel};

/// In-memory job store mirroring the semantics of the Postgres table:
/// duplicate ids conflict, terminal writes clear the opposite field.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: Mutex<HashMap<String, AnalysisJob>>,
    history: Mutex<HashMap<String, Vec<JobStatus>>>,

    /// Simulate a failed `processing` write (worker must proceed anyway).
    pub fail_mark_processing: AtomicBool,

    /// Simulate failed `completed`/`failed` writes (job stays stuck).
    pub fail_terminal_writes: AtomicBool,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn job(&self, job_id: &str) -> Option<AnalysisJob> {
        self.jobs.lock().unwrap().get(job_id).cloned()
    }

    /// Sequence of statuses the job has moved through, insert included.
    pub fn status_history(&self, job_id: &str) -> Vec<JobStatus> {
        self.history
            .lock()
            .unwrap()
            .get(job_id)
            .cloned()
            .unwrap_or_default()
    }

    fn record(&self, job_id: &str, status: JobStatus) {
        self.history
            .lock()
            .unwrap()
            .entry(job_id.to_string())
            .or_default()
            .push(status);
    }

    fn write_status(
        &self,
        job_id: &str,
        status: JobStatus,
        result: Option<String>,
        error: Option<String>,
    ) {
        if let Some(job) = self.jobs.lock().unwrap().get_mut(job_id) {
            job.status = status;
            job.result = result;
            job.error = error;
            job.updated_at = Utc::now();
        }
        self.record(job_id, status);
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn insert_pending(&self, job: &NewJob) -> Result<(), StoreError> {
        let mut jobs = self.jobs.lock().unwrap();
        if jobs.contains_key(&job.id) {
            return Err(StoreError::Duplicate {
                details: format!("Key (id)=({}) already exists.", job.id),
            });
        }

        let now = Utc::now();
        jobs.insert(
            job.id.clone(),
            AnalysisJob {
                id: job.id.clone(),
                user_id: job.user_id.clone(),
                image_url: job.image_url.clone(),
                status: JobStatus::Pending,
                result: None,
                error: None,
                created_at: now,
                updated_at: now,
            },
        );
        drop(jobs);

        self.record(&job.id, JobStatus::Pending);
        Ok(())
    }

    async fn get(&self, job_id: &str) -> Result<Option<AnalysisJob>, StoreError> {
        Ok(self.job(job_id))
    }

    async fn mark_processing(&self, job_id: &str) -> Result<(), StoreError> {
        if self.fail_mark_processing.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolClosed));
        }
        self.write_status(job_id, JobStatus::Processing, None, None);
        Ok(())
    }

    async fn complete(&self, job_id: &str, result: &str) -> Result<(), StoreError> {
        if self.fail_terminal_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolClosed));
        }
        self.write_status(job_id, JobStatus::Completed, Some(result.to_string()), None);
        Ok(())
    }

    async fn fail(&self, job_id: &str, error: &str) -> Result<(), StoreError> {
        if self.fail_terminal_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolClosed));
        }
        self.write_status(job_id, JobStatus::Failed, None, Some(error.to_string()));
        Ok(())
    }
}

/// What the stub model should hand back.
pub enum StubReply {
    Text(String),
    Empty,
    Fail(String),
}

/// Scripted vision model that counts how often it is called.
pub struct StubModel {
    reply: StubReply,
    calls: AtomicUsize,
}

impl StubModel {
    pub fn new(reply: StubReply) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisionModel for StubModel {
    async fn analyze_image(&self, _image_url: &str) -> Result<String, VisionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            StubReply::Text(text) => Ok(text.clone()),
            StubReply::Empty => Ok(String::new()),
            StubReply::Fail(message) => Err(VisionError::Api {
                status: 500,
                message: message.clone(),
            }),
        }
    }
}

/// Vision model that blocks every call on a shared barrier. A reply is only
/// produced once `parties` calls are in flight at the same time, so a test
/// using it can only finish if jobs run concurrently rather than one after
/// another.
pub struct BarrierModel {
    barrier: tokio::sync::Barrier,
}

impl BarrierModel {
    pub fn new(parties: usize) -> Self {
        Self {
            barrier: tokio::sync::Barrier::new(parties),
        }
    }
}

#[async_trait]
impl VisionModel for BarrierModel {
    async fn analyze_image(&self, image_url: &str) -> Result<String, VisionError> {
        self.barrier.wait().await;
        Ok(format!("analysis of {image_url}"))
    }
}
