use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// First-time setup: the admin account to create.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, ToSchema)]
pub struct SetupRequest {
    pub username: String,
    pub password: String,
}

/// Whether an admin account already exists.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, ToSchema)]
pub struct SetupStatus {
    pub is_setup: bool,
}

/// Returned once, when setup completes.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, ToSchema)]
pub struct SetupResponse {
    pub username: String,
    /// Bearer token for scripted access. Not shown again.
    pub api_token: String,
}
