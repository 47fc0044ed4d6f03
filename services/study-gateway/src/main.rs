//! Study Assistant Gateway
//!
//! Single-binary service that:
//! 1. Loads the API key pool from API_KEY (or a keys file)
//! 2. Serves text generation, quiz and worksheet solving, assignments, reports
//!    and presentation outlines over HTTP
//! 3. Runs every backend call through key rotation and overload retry
//! 4. Exposes /health and Prometheus /metrics

mod assistant;
mod config;
mod documents;
mod error;
mod metrics;
mod routes;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::{DefaultBodyLimit, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use generative::GeminiClient;
use key_rotation::{KeyRotator, ResilientInvoker, RetryPolicy};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::assistant::{Models, StudyAssistant};
use crate::config::Config;

/// How long in-flight requests get to finish after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Uploaded sheets arrive base64-encoded inside JSON.
const MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

/// Request counters for the health endpoint.
#[derive(Debug, Clone)]
pub(crate) struct ServiceMetrics {
    pub requests_total: Arc<AtomicU64>,
    pub errors_total: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl ServiceMetrics {
    fn new() -> Self {
        Self {
            requests_total: Arc::new(AtomicU64::new(0)),
            errors_total: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }
}

/// Shared application state accessible from all handlers
#[derive(Clone)]
pub(crate) struct AppState {
    pub assistant: Arc<StudyAssistant>,
    pub metrics: ServiceMetrics,
    pub prometheus: PrometheusHandle,
}

impl AppState {
    fn new(assistant: StudyAssistant, prometheus: PrometheusHandle) -> Self {
        Self {
            assistant: Arc::new(assistant),
            metrics: ServiceMetrics::new(),
            prometheus,
        }
    }
}

/// Build the axum router with all routes and shared state.
fn build_router(state: AppState, max_connections: usize) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/v1/text", post(routes::text_handler))
        .route("/v1/quiz", post(routes::quiz_handler))
        .route("/v1/sheet", post(routes::sheet_handler))
        .route("/v1/assignment", post(routes::assignment_handler))
        .route("/v1/report", post(routes::report_handler))
        .route("/v1/presentation", post(routes::presentation_handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

/// Wire the key pool, backend client and assistant from config.
fn build_assistant(config: &Config) -> StudyAssistant {
    let rotator = Arc::new(KeyRotator::from_delimited(config.gemini.api_keys_raw()));
    let policy = RetryPolicy {
        overload_delay: config.gemini.overload_delay(),
        ..RetryPolicy::default()
    };
    let invoker = ResilientInvoker::with_policy(rotator, policy);
    let client = GeminiClient::new(
        reqwest::Client::new(),
        config.gemini.base_url.clone(),
        Duration::from_secs(config.server.timeout_secs),
    );
    let models = Models {
        text: config.gemini.text_model.clone(),
        quiz: config.gemini.quiz_model.clone(),
        sheet: config.gemini.sheet_model.clone(),
    };
    StudyAssistant::new(Arc::new(client), invoker, models)
}

#[tokio::main]
async fn main() -> Result<()> {
    // JSON logs; LOG_LEVEL wins over RUST_LOG
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting study-gateway");

    // Install before anything records a metric
    let prometheus_handle =
        metrics::install_recorder().context("failed to install Prometheus recorder")?;

    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let (config_path, explicit) = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), explicit, "loading configuration");

    let config = Config::load_or_default(&config_path, explicit)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let assistant = build_assistant(&config);
    info!(
        listen_addr = %config.server.listen_addr,
        base_url = %config.gemini.base_url,
        keys = assistant.invoker().rotator().len(),
        text_model = %config.gemini.text_model,
        "configuration loaded"
    );

    let app = build_router(
        AppState::new(assistant, prometheus_handle),
        config.server.max_connections,
    );

    let listen_addr = config.server.listen_addr;
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind to {listen_addr}"))?;
    info!(addr = %listen_addr, "accepting requests");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    shutdown_signal().await;
    let _ = shutdown_tx.send(());

    // The drain timer starts at signal receipt, not at server start
    match tokio::time::timeout(DRAIN_TIMEOUT, server_handle).await {
        Ok(Ok(Ok(()))) => info!("all in-flight requests drained"),
        Ok(Ok(Err(e))) => error!(error = %e, "server error during shutdown"),
        Ok(Err(e)) => error!(error = %e, "server task panicked"),
        Err(_) => warn!(
            drain_timeout_secs = DRAIN_TIMEOUT.as_secs(),
            "drain timeout exceeded, forcing shutdown"
        ),
    }

    info!("shutdown complete");
    Ok(())
}

/// Health endpoint: 200 when at least one key is configured, 503 otherwise.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let rotator = state.assistant.invoker().rotator();
    let keys = rotator.len();
    let (status_code, status) = if keys > 0 {
        (axum::http::StatusCode::OK, "healthy")
    } else {
        (axum::http::StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    let body = serde_json::json!({
        "status": status,
        "backend": state.assistant.backend_id(),
        "keys_configured": keys,
        "active_key_index": (!rotator.is_empty()).then(|| rotator.cursor()),
        "uptime_seconds": state.metrics.started_at.elapsed().as_secs(),
        "requests_served": state.metrics.requests_total.load(Ordering::Relaxed),
        "errors_total": state.metrics.errors_total.load(Ordering::Relaxed),
    });

    (status_code, axum::Json(body))
}

/// Prometheus metrics endpoint in text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        axum::http::StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
