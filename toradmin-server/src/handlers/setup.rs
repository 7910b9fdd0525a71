use std::sync::Arc;

use axum::{
    Router,
    extract::{Json, State},
    routing::get,
};
use shared::models::{SetupRequest, SetupResponse, SetupStatus};
use tracing::{info, instrument};

use crate::{
    app_state::AppState,
    http::{error::AppResult, problem::ProblemDetails},
    services::setup::{init_setup, is_setup},
};

/// Whether the admin account has been created.
#[utoipa::path(
    get,
    path = "/api/setup",
    responses(
        (status = 200, description = "Setup status", body = SetupStatus)
    ),
    tag = "Setup"
)]
#[instrument(skip(state))]
pub async fn get_setup(State(state): State<Arc<AppState>>) -> Json<SetupStatus> {
    Json(SetupStatus {
        is_setup: is_setup(&state).await,
    })
}

/// Creates the admin account. Only the first call succeeds.
#[utoipa::path(
    post,
    path = "/api/setup",
    request_body = SetupRequest,
    responses(
        (status = 200, description = "Admin account created", body = SetupResponse),
        (status = 409, description = "Setup already completed", body = ProblemDetails),
        (status = 422, description = "Username or password too short", body = ProblemDetails)
    ),
    tag = "Setup"
)]
#[instrument(skip_all)]
pub async fn post_setup(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SetupRequest>,
) -> AppResult<Json<SetupResponse>> {
    let credentials = init_setup(&state, &payload).await?;
    info!(username = %credentials.username, "admin account created");
    Ok(Json(SetupResponse {
        username: credentials.username.clone(),
        api_token: credentials.api_token.clone(),
    }))
}

pub fn setup_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/setup", get(get_setup).post(post_setup))
}
