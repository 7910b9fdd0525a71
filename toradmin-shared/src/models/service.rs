use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Query string of the legacy `GET /api/status` endpoint.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StatusQuery {
    /// One of start, stop, restart or status. Defaults to status.
    pub action: Option<String>,
}

/// Outcome of a service manager invocation.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, ToSchema)]
pub struct ServiceActionResponse {
    pub action: String,
    pub success: bool,
    /// Captured stdout followed by stderr.
    pub output: String,
    /// Why the command failed, e.g. its exit status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
