use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// The authenticated caller.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, ToSchema)]
pub struct MeResponse {
    pub username: String,
}
