use sqlx::PgPool;
use std::sync::Arc;

use crate::db::store::JobStore;
use crate::services::{scheduler::Scheduler, storage::StorageClient, vision::OpenAiClient};

/// Shared application state passed to all route handlers.
///
/// Every collaborator is constructed once in `main` and injected here; there
/// are no process-wide singletons.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub store: Arc<dyn JobStore>,
    pub model: Arc<OpenAiClient>,
    pub scheduler: Arc<Scheduler>,
    pub storage: Arc<StorageClient>,
}

impl AppState {
    pub fn new(
        db: PgPool,
        store: Arc<dyn JobStore>,
        model: Arc<OpenAiClient>,
        scheduler: Scheduler,
        storage: StorageClient,
    ) -> Self {
        Self {
            db,
            store,
            model,
            scheduler: Arc::new(scheduler),
            storage: Arc::new(storage),
        }
    }
}
