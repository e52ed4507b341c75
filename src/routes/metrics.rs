use axum::extract::State;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// GET /metrics — Prometheus scrape endpoint in text exposition format.
///
/// Serves the analysis job counters and histograms registered at startup
/// (`analysis_jobs_submitted`, `analysis_processing_seconds`, queue depth)
/// along with whatever the exporter collects on its own.
pub async fn prometheus_metrics(State(handle): State<Arc<PrometheusHandle>>) -> impl IntoResponse {
    handle.render()
}
