mod app_state;
mod config;
mod db;
mod models;
mod routes;
mod services;

use axum::{routing::get, routing::post, Router};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use app_state::AppState;
use config::AppConfig;
use db::store::{JobStore, PgJobStore};
use services::{
    scheduler,
    storage::StorageClient,
    vision::{OpenAiClient, VisionModel},
};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing roomsight server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    // Register application metrics
    metrics::describe_counter!(
        "analysis_jobs_submitted",
        "Total image analysis jobs accepted"
    );
    metrics::describe_counter!(
        "analysis_jobs_completed",
        "Total image analysis jobs completed"
    );
    metrics::describe_counter!("analysis_jobs_failed", "Total image analysis jobs that failed");
    metrics::describe_histogram!(
        "analysis_processing_seconds",
        "Time to process an image analysis job"
    );
    metrics::describe_gauge!(
        "analysis_queue_depth",
        "Jobs scheduled but not yet picked up by the runner"
    );

    // Initialize database connection pool
    tracing::info!("Connecting to PostgreSQL database");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Run database migrations
    tracing::info!("Running database migrations");
    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run database migrations");

    // Initialize object storage client
    tracing::info!("Initializing object storage client");
    let storage = StorageClient::new(
        &config.storage_bucket,
        &config.storage_endpoint,
        &config.storage_access_key,
        &config.storage_secret_key,
        &config.storage_public_url,
    )
    .expect("Failed to initialize storage client");

    // Initialize OpenAI client
    tracing::info!("Initializing OpenAI client");
    let model = Arc::new(OpenAiClient::new(
        &config.openai_api_key,
        &config.openai_base_url,
        &config.vision_model,
        &config.chat_model,
    ));

    // Job store and in-process work queue
    let store: Arc<dyn JobStore> = Arc::new(PgJobStore::new(db_pool.clone()));
    let (job_scheduler, runner) = scheduler::work_queue();
    tokio::spawn(runner.run(store.clone(), model.clone() as Arc<dyn VisionModel>));

    // Create shared application state
    let state = AppState::new(db_pool, store, model, job_scheduler, storage);

    // Build API routes
    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api/v1/analyze", post(routes::analyze::submit_analysis))
        .route(
            "/api/v1/analyze/{job_id}",
            get(routes::analyze::get_job_status),
        )
        .route(
            "/api/v1/analyze/{job_id}/events",
            get(routes::analyze::job_events),
        )
        .route("/api/v1/chat", post(routes::chat::relay_prompt))
        .route("/api/v1/upload", post(routes::upload::upload_image))
        .with_state(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(10 * 1024 * 1024)); // 10 MB limit

    tracing::info!("Starting roomsight on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
