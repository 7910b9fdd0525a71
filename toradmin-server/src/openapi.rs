#![allow(clippy::needless_for_each)] // Derive macro emits a for_each internally

use shared::models::{
    BandwidthRequest, BandwidthResponse, HiddenService, HiddenServicesResponse, LoginRequest,
    MeResponse, OptionDescriptor, ServiceActionResponse, SetupRequest, SetupResponse, SetupStatus,
    TorrcEntryView, UpdateTorrcResponse,
};
use utoipa::OpenApi;

use crate::{http::problem::ProblemDetails, services::control::ServiceAction};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "toradmin API",
        version = "0.1.0",
        description = "Edit the tor daemon's torrc, list hidden services and control the tor service"
    ),
    paths(
        crate::handlers::setup::get_setup,
        crate::handlers::setup::post_setup,
        crate::handlers::auth::login,
        crate::handlers::auth::logout,
        crate::handlers::auth::me,
        crate::handlers::torrc::get_options,
        crate::handlers::torrc::get_torrc,
        crate::handlers::torrc::post_torrc,
        crate::handlers::torrc::get_hidden,
        crate::handlers::bandwidth::post_bandwidth,
        crate::handlers::service::post_service_action,
        crate::handlers::service::get_status,
    ),
    components(
        schemas(
            SetupRequest,
            SetupResponse,
            SetupStatus,
            LoginRequest,
            MeResponse,
            OptionDescriptor,
            TorrcEntryView,
            UpdateTorrcResponse,
            HiddenService,
            HiddenServicesResponse,
            BandwidthRequest,
            BandwidthResponse,
            ServiceAction,
            ServiceActionResponse,
            ProblemDetails,
        )
    ),
    tags(
        (name = "Setup", description = "First-run admin account creation"),
        (name = "Auth", description = "Session login and identity"),
        (name = "Torrc", description = "Reading and editing the torrc"),
        (name = "Bandwidth", description = "Traffic budget conversion"),
        (name = "Service", description = "Controlling the tor service")
    )
)]
pub struct ApiDoc;
