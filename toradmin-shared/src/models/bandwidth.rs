use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A traffic budget such as "5 GB monthly". Unit and interval are free text.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, ToSchema)]
pub struct BandwidthRequest {
    pub amount: i64,
    #[schema(example = "GB")]
    pub unit: String,
    #[schema(example = "monthly")]
    pub interval: String,
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, ToSchema)]
pub struct BandwidthResponse {
    /// Bytes per second, truncated.
    pub bps: i64,
    #[schema(example = "2.02 KB/s")]
    pub human: String,
}
