mod app_state;
mod config;
mod db;
mod error;
mod models;
mod routes;
mod services;

use axum::{routing::get, routing::post, Router};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use app_state::AppState;
use config::AppConfig;
use services::{
    bridge::EventBusBridge, dispatcher::TaskDispatcher, media::MediaSplitter, storage::ObjectStore,
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

    tracing::info!("Initializing reprint-video server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    // Register application metrics
    metrics::describe_counter!(
        "register_jobs_submitted",
        "Total video registration jobs submitted"
    );
    metrics::describe_counter!(
        "verify_sessions_submitted",
        "Total verification sessions submitted"
    );
    metrics::describe_counter!(
        "chunk_tasks_dispatched",
        "Total chunk task envelopes pushed to the broker"
    );
    metrics::describe_counter!(
        "stream_sessions_opened",
        "Total progress stream sessions opened"
    );
    metrics::describe_counter!(
        "stream_sessions_closed",
        "Total progress stream sessions closed"
    );
    metrics::describe_counter!(
        "stream_sessions_timed_out",
        "Progress stream sessions that ended on the deadline"
    );
    metrics::describe_gauge!(
        "broker_queue_depth",
        "Current number of task envelopes waiting on the broker queue"
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

    // Initialize object store client
    tracing::info!("Initializing object store client");
    let storage = ObjectStore::new(
        &config.s3_bucket,
        &config.s3_endpoint,
        &config.s3_region,
        &config.s3_access_key,
        &config.s3_secret_key,
    )
    .expect("Failed to initialize object store client");

    // Initialize broker dispatcher and status bus bridge
    tracing::info!("Connecting to Redis broker and status bus");
    let dispatcher =
        TaskDispatcher::new(&config.redis_url).expect("Failed to initialize task dispatcher");
    let bridge =
        EventBusBridge::new(&config.redis_url).expect("Failed to initialize event bus bridge");

    let media = MediaSplitter::new(config.chunk_duration_seconds);

    // Create shared application state
    let state = AppState::new(
        db_pool,
        storage,
        dispatcher,
        bridge,
        media,
        Duration::from_secs(config.stream_timeout_seconds),
    );

    // Build API routes
    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api/v1/register", post(routes::register::register_video))
        .route("/api/v1/verify", post(routes::verify::verify_video))
        .route("/api/v1/videos", get(routes::jobs::list_videos))
        .route("/api/v1/jobs/{video_id}", get(routes::jobs::get_jobs))
        .route("/api/v1/sessions/{id}", get(routes::jobs::get_session))
        .route(
            "/api/v1/session/{id}/stream",
            get(routes::stream::session_stream),
        )
        .route(
            "/api/v1/videos/{id}/stream",
            get(routes::stream::video_stream),
        )
        .route(
            "/api/v1/chunk/{session_id}/{index}",
            get(routes::chunk::get_chunk_media),
        )
        .with_state(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(500 * 1024 * 1024)); // 500 MB upload limit

    tracing::info!("Starting reprint-video on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
