use axum::{http::StatusCode, response::IntoResponse};
use serde_json::json;
use shared::{bandwidth::BandwidthError, torrc::TorrcError};
use thiserror::Error;

use super::problem::ProblemDetails;
use crate::{
    auth::{credentials::CredentialError, session::SessionError},
    services::{control::ServiceError, setup::SetupError},
};

pub type AppResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
#[error("{code}: {message}")]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "validation_failed", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized", message)
    }

    pub fn invalid_credentials() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "invalid_credentials",
            "invalid username or password",
        )
    }

    pub fn already_configured() -> Self {
        Self::new(
            StatusCode::CONFLICT,
            "already_configured",
            "setup has already been completed",
        )
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "forbidden", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }

    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub const fn status(&self) -> StatusCode {
        self.status
    }

    pub const fn code(&self) -> &'static str {
        self.code
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let mut problem = ProblemDetails::new(self.status, self.code, self.message);
        if let Some(details) = self.details {
            problem = problem.with_details(details);
        }

        problem.into_response()
    }
}

impl From<http::Error> for ApiError {
    fn from(err: http::Error) -> Self {
        Self::internal_server_error(err.to_string())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::not_found(err.to_string()),
            std::io::ErrorKind::PermissionDenied => Self::forbidden(err.to_string()),
            _ => Self::internal_server_error(err.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::internal_server_error(format!("background task failed: {err}"))
    }
}

impl From<TorrcError> for ApiError {
    fn from(err: TorrcError) -> Self {
        match err {
            TorrcError::Io(io) => Self::from(io),
            TorrcError::NoSuchKey(key) => {
                Self::not_found(format!("no {key} entries found")).with_details(json!({ "key": key }))
            }
            TorrcError::InvalidFormat(reason) => Self::validation(reason),
        }
    }
}

impl From<BandwidthError> for ApiError {
    fn from(err: BandwidthError) -> Self {
        Self::validation(err.to_string())
    }
}

impl From<CredentialError> for ApiError {
    fn from(err: CredentialError) -> Self {
        Self::internal_server_error(err.to_string())
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        Self::internal_server_error(err.to_string())
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::UnknownAction(_) => Self::validation(err.to_string()),
            ServiceError::Timeout { .. } => {
                Self::new(StatusCode::GATEWAY_TIMEOUT, "service_timeout", err.to_string())
            }
            ServiceError::UnsupportedPlatform(_) => {
                Self::new(StatusCode::NOT_IMPLEMENTED, "unsupported_platform", err.to_string())
            }
            ServiceError::Spawn { .. } => Self::internal_server_error(err.to_string()),
        }
    }
}

impl From<SetupError> for ApiError {
    fn from(err: SetupError) -> Self {
        match err {
            SetupError::AlreadyConfigured => Self::already_configured(),
            SetupError::Invalid(reason) => Self::validation(reason),
            SetupError::Credentials(err) => Self::from(err),
            SetupError::Task(err) => Self::from(err),
        }
    }
}
