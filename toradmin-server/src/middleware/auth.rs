use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::{
    app_state::AppState,
    auth::token::{presented_token, tokens_match},
    http::error::{ApiError, AppResult},
    middleware::request_context::RequestContext,
};

/// Admits a request carrying a valid session cookie or the admin API token.
///
/// With authentication disabled every request passes unidentified.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> AppResult<Response> {
    if state.config.auth.disabled {
        return Ok(next.run(request).await);
    }

    let username = match state.sessions.username(request.headers()) {
        Some(username) => Some(username),
        None => token_user(&state, request.headers()).await,
    };
    let Some(username) = username else {
        metrics::counter!("auth_rejections_total").increment(1);
        debug!(path = %request.uri().path(), "rejected unauthenticated request");
        return Err(ApiError::unauthorized("authentication required"));
    };

    match request.extensions_mut().get_mut::<RequestContext>() {
        Some(context) => context.username = Some(username),
        None => {
            request.extensions_mut().insert(RequestContext {
                request_id: String::new(),
                username: Some(username),
            });
        }
    }
    Ok(next.run(request).await)
}

async fn token_user(state: &AppState, headers: &HeaderMap) -> Option<String> {
    let presented = presented_token(headers)?;
    let admin = state.admin().await?;
    tokens_match(&presented, &admin.api_token).then(|| admin.username.clone())
}
