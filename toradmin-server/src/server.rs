use std::{
    error::Error,
    sync::{Arc, OnceLock},
    time::Duration,
};

use axum::{
    Extension, Router,
    http::{HeaderValue, StatusCode, header},
    response::IntoResponse,
    routing::get,
    serve,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use shared::config::server::{Config, LogFormat};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use crate::{
    app_state::AppState,
    auth::{
        credentials::CredentialError,
        session::{SessionError, SessionManager},
    },
    middleware::{
        request_context::{self, RequestIdState},
        security,
    },
    routes,
    services::control::SystemServiceController,
    tracer,
};

const DEFAULT_LOG_DIRECTIVE: &str = "info";

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("session key: {0}")]
    Session(#[from] SessionError),
    #[error("admin credentials: {0}")]
    Credentials(#[from] CredentialError),
}

/// Handle of the process-wide Prometheus recorder, installed on first use.
pub fn metrics_handle() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let recorder = PrometheusBuilder::new().build_recorder();
            let handle = recorder.handle();
            if metrics::set_global_recorder(recorder).is_err() {
                warn!("a metrics recorder is already installed; /metrics will be empty");
            }
            handle
        })
        .clone()
}

async fn metrics_endpoint(Extension(handle): Extension<PrometheusHandle>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; version=0.0.4"),
        )],
        handle.render(),
    )
}

/// Installs the global subscriber in the configured format.
///
/// `RUST_LOG` wins over the configured level. Returns the configured level.
pub fn initialize_tracing(config: &Config) -> String {
    let builder = fmt::fmt()
        .with_env_filter(build_env_filter(config))
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false);

    let installed = if matches!(config.logging.format, LogFormat::Json) {
        builder.json().with_ansi(false).try_init()
    } else {
        builder.with_ansi(true).try_init()
    };
    if installed.is_err() {
        warn!("tracing subscriber already installed; keeping the existing one");
    }

    config.logging.level.clone()
}

fn build_env_filter(config: &Config) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVE))
}

/// Builds the shared state: session keys, the service controller and the
/// admin account loaded from disk.
///
/// # Errors
/// Fails on an unusable session key or an unreadable credentials file.
pub fn create_app_state(config: Arc<Config>) -> Result<Arc<AppState>, StartupError> {
    let sessions = SessionManager::from_config(&config.session)?;
    let services = Arc::new(SystemServiceController::new(Duration::from_secs(
        config.service.timeout_seconds,
    )));
    let state = AppState::new(config, sessions, services)?;
    Ok(Arc::new(state))
}

/// The complete application: API, health, metrics and OpenAPI routes wrapped
/// in the security, tracing and request id layers.
pub fn create_app_router(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let request_id_state = RequestIdState::from_config(&state.config);

    Router::new()
        .merge(routes::api::create_api_router(state.clone()))
        .merge(routes::health::create_health_router())
        .merge(routes::openapi::openapi_routes())
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .layer(Extension(metrics_handle))
        .layer(axum::middleware::from_fn(security::apply_security_headers))
        .layer(tracer::create_trace_layer())
        .layer(axum::middleware::from_fn_with_state(
            request_id_state,
            request_context::assign_request_id,
        ))
}

/// Resolves on Ctrl-C.
pub async fn create_shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for Ctrl-C; shutting down");
    }
    info!("Shutting down...");
}

/// Starts the server and serves until Ctrl-C.
///
/// # Errors
/// Returns an error if the state cannot be built or the listener fails.
pub async fn run(config: Config) -> Result<(), Box<dyn Error>> {
    initialize_tracing(&config);
    info!("Starting toradmin...");

    let metrics_handle = metrics_handle();
    let config = Arc::new(config);
    if config.auth.disabled {
        warn!("authentication is disabled; every API request is accepted");
    }

    let state = create_app_state(config.clone())?;
    let app = create_app_router(state, metrics_handle);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(
        addr = %addr,
        torrc = %config.torrc.path.display(),
        service = %config.service.name,
        "Listening"
    );

    serve(listener, app)
        .with_graceful_shutdown(create_shutdown_signal())
        .await?;

    Ok(())
}
