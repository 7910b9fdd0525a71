use std::{collections::BTreeMap, sync::Arc};

use axum::{
    Router,
    extract::{Json, State},
    routing::get,
};
use serde_json::{Map, Value, json};
use shared::{
    models::{HiddenServicesResponse, OptionDescriptor, TorrcEntryView, UpdateTorrcResponse},
    torrc::options,
};
use tracing::instrument;

use crate::{
    app_state::AppState,
    http::{
        error::{ApiError, AppResult},
        problem::ProblemDetails,
    },
    services::torrc_service,
};

/// Every known option, grouped by category.
#[utoipa::path(
    get,
    path = "/api/options",
    responses(
        (status = 200, description = "Option catalog grouped by category", body = BTreeMap<String, Vec<OptionDescriptor>>)
    ),
    tag = "Torrc"
)]
pub async fn get_options() -> Json<BTreeMap<String, Vec<OptionDescriptor>>> {
    let catalog = options::options_by_category()
        .into_iter()
        .map(|(category, options)| {
            let descriptors = options.into_iter().map(OptionDescriptor::from).collect();
            (category.to_string(), descriptors)
        })
        .collect();
    Json(catalog)
}

/// Every key/value entry of the torrc in file order.
#[utoipa::path(
    get,
    path = "/api/torrc",
    responses(
        (status = 200, description = "Torrc entries", body = [TorrcEntryView]),
        (status = 404, description = "Torrc file not found", body = ProblemDetails)
    ),
    tag = "Torrc"
)]
#[instrument(skip(state))]
pub async fn get_torrc(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<TorrcEntryView>>> {
    let entries = torrc_service::entries(state.config.torrc.path.clone()).await?;
    Ok(Json(entries))
}

/// Validates and writes a set of options in one save.
///
/// Values may be JSON strings or numbers. The first invalid pair rejects the
/// whole request and is named in `details.key`.
#[utoipa::path(
    post,
    path = "/api/torrc",
    request_body(content = BTreeMap<String, String>, description = "Option names mapped to new values"),
    responses(
        (status = 200, description = "Options saved", body = UpdateTorrcResponse),
        (status = 404, description = "Torrc file not found", body = ProblemDetails),
        (status = 422, description = "An option failed validation", body = ProblemDetails)
    ),
    tag = "Torrc"
)]
#[instrument(skip(state, payload))]
pub async fn post_torrc(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Map<String, Value>>,
) -> AppResult<Json<UpdateTorrcResponse>> {
    if payload.is_empty() {
        return Err(ApiError::validation("at least one option is required"));
    }
    let updates = payload
        .into_iter()
        .map(|(key, value)| match value {
            Value::String(text) => Ok((key, text)),
            Value::Number(number) => Ok((key, number.to_string())),
            _ => Err(ApiError::validation("value must be a string or a number")
                .with_details(json!({ "key": key }))),
        })
        .collect::<AppResult<Vec<_>>>()?;

    let updated = torrc_service::apply_updates(state.config.torrc.path.clone(), updates).await?;
    Ok(Json(UpdateTorrcResponse {
        saved: true,
        updated,
    }))
}

/// Configured hidden services and their onion hostnames.
#[utoipa::path(
    get,
    path = "/api/hidden",
    responses(
        (status = 200, description = "Hidden services", body = HiddenServicesResponse),
        (status = 404, description = "Torrc file not found", body = ProblemDetails)
    ),
    tag = "Torrc"
)]
#[instrument(skip(state))]
pub async fn get_hidden(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<HiddenServicesResponse>> {
    let services = torrc_service::hidden_services(state.config.torrc.path.clone()).await?;
    Ok(Json(services))
}

pub fn torrc_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/options", get(get_options))
        .route("/api/torrc", get(get_torrc).post(post_torrc))
        .route("/api/hidden", get(get_hidden))
}
