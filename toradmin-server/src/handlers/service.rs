use std::sync::Arc;

use axum::{
    Router,
    extract::{Json, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use shared::models::{ServiceActionResponse, StatusQuery};
use tracing::instrument;

use crate::{
    app_state::AppState,
    http::{
        error::{ApiError, AppResult},
        problem::ProblemDetails,
    },
    services::control::ServiceAction,
};

async fn run_action(state: &AppState, action: &str) -> AppResult<Json<ServiceActionResponse>> {
    let action: ServiceAction = action.parse()?;
    let result = state.services.run(&state.config.service.name, action).await;

    let outcome_label = match &result {
        Ok(outcome) if outcome.success => "ok",
        Ok(_) => "failed",
        Err(_) => "error",
    };
    metrics::counter!(
        "service_actions_total",
        "action" => action.as_str(),
        "outcome" => outcome_label
    )
    .increment(1);

    let outcome = result?;
    Ok(Json(ServiceActionResponse {
        action: action.to_string(),
        success: outcome.success,
        output: outcome.output,
        error: outcome.error,
    }))
}

/// Runs a service manager action against the tor service.
///
/// A non-zero exit is reported with `success: false`, not as an HTTP error.
#[utoipa::path(
    post,
    path = "/api/service/{action}",
    params(
        ("action" = String, Path, description = "start, stop, restart or status")
    ),
    responses(
        (status = 200, description = "Command ran; see success", body = ServiceActionResponse),
        (status = 422, description = "Unknown action", body = ProblemDetails),
        (status = 500, description = "Command could not be started", body = ProblemDetails),
        (status = 501, description = "No supported service manager", body = ProblemDetails),
        (status = 504, description = "Command timed out", body = ProblemDetails)
    ),
    tag = "Service"
)]
#[instrument(skip(state))]
pub async fn post_service_action(
    State(state): State<Arc<AppState>>,
    Path(action): Path<String>,
) -> AppResult<Json<ServiceActionResponse>> {
    run_action(&state, &action).await
}

/// Query-string form of the status action, kept for older clients.
///
/// Only `status` is served here; start, stop and restart change the daemon's
/// state and must go through `POST /api/service/{action}`.
#[utoipa::path(
    get,
    path = "/api/status",
    params(StatusQuery),
    responses(
        (status = 200, description = "Command ran; see success", body = ServiceActionResponse),
        (status = 405, description = "State-changing action requested over GET", body = ProblemDetails),
        (status = 422, description = "Unknown action", body = ProblemDetails)
    ),
    tag = "Service"
)]
#[instrument(skip(state))]
pub async fn get_status(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StatusQuery>,
) -> AppResult<Json<ServiceActionResponse>> {
    let action: ServiceAction = query
        .action
        .as_deref()
        .unwrap_or(ServiceAction::Status.as_str())
        .parse()?;
    if action != ServiceAction::Status {
        return Err(ApiError::new(
            StatusCode::METHOD_NOT_ALLOWED,
            "method_not_allowed",
            format!("use POST /api/service/{action} to {action} the service"),
        ));
    }
    run_action(&state, action.as_str()).await
}

pub fn service_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/service/{action}", post(post_service_action))
        .route("/api/status", get(get_status))
}
