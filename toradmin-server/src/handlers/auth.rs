use std::sync::Arc;

use axum::{
    Extension, Router,
    extract::{Json, State},
    http::header,
    response::{AppendHeaders, IntoResponse},
    routing::{get, post},
};
use shared::models::{LoginRequest, MeResponse};
use tracing::{info, instrument, warn};

use crate::{
    app_state::AppState,
    http::{
        error::{ApiError, AppResult},
        problem::ProblemDetails,
    },
    middleware::request_context::RequestContext,
    services::setup::authenticate,
};

/// Exchanges the admin username and password for a session cookie.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; session cookie set", body = MeResponse),
        (status = 401, description = "Invalid username or password", body = ProblemDetails)
    ),
    tag = "Auth"
)]
#[instrument(skip_all)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    if !authenticate(&state, &payload.username, &payload.password).await? {
        metrics::counter!("auth_logins_total", "result" => "rejected").increment(1);
        warn!(username = %payload.username, "login rejected");
        return Err(ApiError::invalid_credentials());
    }

    let username = payload.username.trim().to_string();
    let cookie = state.sessions.issue(&username)?;
    metrics::counter!("auth_logins_total", "result" => "ok").increment(1);
    info!(username = %username, "login succeeded");
    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie.to_string())]),
        Json(MeResponse { username }),
    ))
}

/// Drops the session cookie. Succeeds whether or not a session existed.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 204, description = "Session cookie cleared")
    ),
    tag = "Auth"
)]
#[instrument(skip(state))]
pub async fn logout(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        axum::http::StatusCode::NO_CONTENT,
        AppendHeaders([(header::SET_COOKIE, state.sessions.clear().to_string())]),
    )
}

/// The caller identified by the auth layer.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Authenticated caller", body = MeResponse),
        (status = 401, description = "Not authenticated", body = ProblemDetails)
    ),
    tag = "Auth"
)]
pub async fn me(context: Option<Extension<RequestContext>>) -> AppResult<Json<MeResponse>> {
    context
        .and_then(|Extension(context)| context.username)
        .map(|username| Json(MeResponse { username }))
        .ok_or_else(|| ApiError::unauthorized("no authenticated user"))
}

/// Login and logout, reachable without a session.
pub fn session_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
}

pub fn identity_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/auth/me", get(me))
}
