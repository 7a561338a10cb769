use axum::routing::get;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use scan_relay::app_state::AppState;
use scan_relay::config::AppConfig;
use scan_relay::routes;
use scan_relay::services::{
    lifecycle::JobController, registry::JobRegistry, storage::S3BlobStore, sweeper,
    webhook::WebhookNotifier,
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
    config.validate().expect("Invalid configuration");

    tracing::info!("Initializing scan-relay server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);
    routes::metrics::describe_metrics();

    if let Some(base) = &config.public_base_url {
        reqwest::Url::parse(base).expect("PUBLIC_BASE_URL is not a valid URL");
    }
    if config.callback_token.is_none() {
        tracing::warn!("CALLBACK_TOKEN not set; callbacks are authorised by job id alone");
    }

    tracing::info!(bucket = %config.storage_bucket, "Initializing blob storage client");
    let storage = S3BlobStore::new(
        &config.storage_bucket,
        &config.storage_endpoint,
        &config.storage_region,
        &config.storage_access_key,
        &config.storage_secret_key,
        config.signed_url_expiry_secs,
    )
    .expect("Failed to initialize blob storage client");

    tracing::info!("Initializing workflow webhook client");
    let notifier = WebhookNotifier::new(&config.make_webhook_url, config.webhook_timeout())
        .expect("Failed to initialize workflow webhook client");

    let registry = Arc::new(JobRegistry::new());
    let controller = JobController::new(
        Arc::clone(&registry),
        Arc::new(storage),
        Arc::new(notifier),
        config.upload_timeout(),
        config.callback_token.clone(),
    );

    match config.job_ttl() {
        Some(ttl) => {
            tracing::info!(ttl_secs = ttl.as_secs(), "Job expiry sweeper enabled");
            sweeper::spawn_sweeper(Arc::clone(&registry), ttl, config.sweep_interval());
        }
        None => tracing::info!("JOB_TTL_SECS not set; jobs are kept for the life of the process"),
    }

    // Create shared application state
    let state = AppState::new(controller, config.public_base_url.clone());

    let app = routes::build_router(state, config.body_limit_bytes)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        );

    tracing::info!("Starting scan-relay on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
