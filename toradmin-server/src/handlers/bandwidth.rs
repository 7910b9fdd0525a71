use std::sync::Arc;

use axum::{Router, extract::Json, routing::post};
use shared::{
    bandwidth::{self, Interval, Unit},
    models::{BandwidthRequest, BandwidthResponse},
};
use tracing::instrument;

use crate::{
    app_state::AppState,
    http::{
        error::{ApiError, AppResult},
        problem::ProblemDetails,
    },
};

/// Converts a traffic budget into an average rate.
#[utoipa::path(
    post,
    path = "/api/bandwidth",
    request_body = BandwidthRequest,
    responses(
        (status = 200, description = "Average bytes per second", body = BandwidthResponse),
        (status = 422, description = "Negative amount, unknown unit or interval", body = ProblemDetails)
    ),
    tag = "Bandwidth"
)]
#[instrument]
pub async fn post_bandwidth(
    Json(payload): Json<BandwidthRequest>,
) -> AppResult<Json<BandwidthResponse>> {
    if payload.amount < 0 {
        return Err(ApiError::validation("amount must not be negative"));
    }
    let unit: Unit = payload.unit.parse()?;
    let interval: Interval = payload.interval.parse()?;
    let bps = bandwidth::to_bytes_per_second(payload.amount, unit, interval)?;

    Ok(Json(BandwidthResponse {
        bps,
        human: bandwidth::pretty_print(bps),
    }))
}

pub fn bandwidth_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/bandwidth", post(post_bandwidth))
}
