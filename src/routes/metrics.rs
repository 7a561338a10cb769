use std::sync::Arc;

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;

/// GET /metrics — Prometheus text exposition of the job counters.
pub async fn prometheus_metrics(State(handle): State<Arc<PrometheusHandle>>) -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    )
}

/// Register descriptions for every metric the service emits.
pub fn describe_metrics() {
    metrics::describe_counter!("scan_jobs_submitted_total", "Scan jobs accepted for upload");
    metrics::describe_counter!(
        "scan_jobs_completed_total",
        "Callbacks that completed a scan job"
    );
    metrics::describe_counter!(
        "scan_jobs_failed_total",
        "Scan jobs that failed during image upload"
    );
    metrics::describe_counter!(
        "scan_callbacks_unknown_total",
        "Callbacks for unknown, evicted or unauthorised job ids"
    );
    metrics::describe_counter!(
        "scan_callbacks_rejected_total",
        "Callbacks for jobs that had already failed"
    );
    metrics::describe_counter!(
        "workflow_dispatch_failures_total",
        "Workflow webhook deliveries that failed"
    );
    metrics::describe_counter!("scan_jobs_evicted_total", "Jobs removed by the expiry sweeper");
    metrics::describe_histogram!("scan_upload_seconds", "Time to store one image");
    metrics::describe_gauge!("scan_jobs_tracked", "Jobs currently held in memory");
}
