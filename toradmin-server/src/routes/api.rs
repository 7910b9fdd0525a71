use std::sync::Arc;

use axum::{Router, middleware};

use crate::{
    app_state::AppState,
    handlers::{
        auth::{identity_routes, session_routes},
        bandwidth::bandwidth_routes,
        service::service_routes,
        setup::setup_routes,
        torrc::torrc_routes,
    },
    middleware::auth::require_auth,
};

/// Setup and login stay public; everything else needs a session or the API token.
pub fn create_api_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let protected = Router::new()
        .merge(identity_routes())
        .merge(torrc_routes())
        .merge(bandwidth_routes())
        .merge(service_routes())
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    Router::new()
        .merge(setup_routes())
        .merge(session_routes())
        .merge(protected)
}
