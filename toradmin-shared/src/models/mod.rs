//! Request and response bodies of the HTTP API.

pub mod auth;
pub mod bandwidth;
pub mod service;
pub mod setup;
pub mod torrc;

pub use auth::{LoginRequest, MeResponse};
pub use bandwidth::{BandwidthRequest, BandwidthResponse};
pub use service::{ServiceActionResponse, StatusQuery};
pub use setup::{SetupRequest, SetupResponse, SetupStatus};
pub use torrc::{
    HiddenService, HiddenServicesResponse, OptionCatalog, OptionDescriptor, TorrcEntryView,
    UpdateTorrcResponse,
};
