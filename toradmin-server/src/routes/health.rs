use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
};
use serde::Serialize;
use tracing::warn;

use crate::app_state::AppState;

#[derive(Serialize)]
struct HealthResponse<'a> {
    status: &'a str,
}

async fn healthz() -> impl IntoResponse {
    metrics::counter!("health_checks_total", "endpoint" => "healthz", "status" => "ok")
        .increment(1);
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

/// Ready once the torrc can be opened for reading.
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let path = &state.config.torrc.path;
    match tokio::fs::File::open(path).await {
        Ok(_) => {
            metrics::counter!("health_checks_total", "endpoint" => "readyz", "status" => "ok")
                .increment(1);
            (StatusCode::OK, Json(HealthResponse { status: "ready" }))
        }
        Err(err) => {
            metrics::counter!(
                "health_checks_total",
                "endpoint" => "readyz",
                "status" => "error"
            )
            .increment(1);
            warn!(path = %path.display(), error = %err, "torrc is not readable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse { status: "degraded" }),
            )
        }
    }
}

pub fn create_health_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{Body, to_bytes},
        http::Request,
    };
    use cookie::Key;
    use serde_json::Value;
    use shared::config::server::Config;
    use std::time::Duration;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::{auth::session::SessionManager, services::control::SystemServiceController};

    fn router(dir: &TempDir) -> Router {
        let mut config = Config::default();
        config.torrc.path = dir.path().join("torrc");
        config.auth.credentials_path = dir.path().join("credentials.json");
        let sessions = SessionManager::new(Key::generate(), &config.session);
        let services = Arc::new(SystemServiceController::new(Duration::from_secs(1)));
        let state = AppState::new(Arc::new(config), sessions, services).unwrap();
        create_health_router().with_state(Arc::new(state))
    }

    async fn get(router: Router, uri: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn healthz_is_ok_without_a_torrc() {
        let dir = TempDir::new().unwrap();
        let (status, body) = get(router(&dir), "/healthz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn readyz_tracks_torrc_readability() {
        let dir = TempDir::new().unwrap();
        let app = router(&dir);

        let (status, body) = get(app.clone(), "/readyz").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "degraded");

        std::fs::write(dir.path().join("torrc"), "SocksPort 9050\n").unwrap();
        let (status, body) = get(app, "/readyz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ready");
    }
}
