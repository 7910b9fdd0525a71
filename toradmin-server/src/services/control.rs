//! Starting, stopping and querying the tor daemon through the host's service
//! manager.

use std::{fmt, io, process::Stdio, str::FromStr, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::process::Command;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

const SYSTEMCTL: &str = "systemctl";
const LAUNCHCTL: &str = "launchctl";
const NOT_FOUND: &str = "Not found";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ServiceAction {
    Start,
    Stop,
    Restart,
    Status,
}

impl ServiceAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
            Self::Status => "status",
        }
    }
}

impl fmt::Display for ServiceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceAction {
    type Err = ServiceError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            "restart" => Ok(Self::Restart),
            "status" => Ok(Self::Status),
            _ => Err(ServiceError::UnknownAction(input.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("unknown service action {0:?}; expected start, stop, restart or status")]
    UnknownAction(String),

    #[error("service control is not supported on {0}")]
    UnsupportedPlatform(&'static str),

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("service command timed out after {seconds} seconds")]
    Timeout { seconds: u64 },
}

/// Result of a command that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceOutcome {
    pub success: bool,
    /// Captured stdout followed by stderr.
    pub output: String,
    /// Why the command counts as failed, when it does.
    pub error: Option<String>,
}

impl ServiceOutcome {
    fn from_output(program: &str, output: &std::process::Output) -> Self {
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        let success = output.status.success();
        Self {
            success,
            output: text,
            error: (!success).then(|| format!("{program} exited with {}", output.status)),
        }
    }

    /// Joins two sequential steps: outputs by a newline, errors by `"; "`.
    fn then(self, next: Self) -> Self {
        let error = match (self.error, next.error) {
            (Some(first), Some(second)) => Some(format!("{first}; {second}")),
            (first, second) => first.or(second),
        };
        Self {
            success: self.success && next.success,
            output: format!("{}\n{}", self.output, next.output),
            error,
        }
    }
}

#[async_trait]
pub trait ServiceController: Send + Sync {
    /// Runs `action` against `service`.
    ///
    /// A command that exits non-zero is a normal outcome with `success: false`;
    /// only failing to run the command at all is an error.
    async fn run(&self, service: &str, action: ServiceAction)
    -> Result<ServiceOutcome, ServiceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ServiceManager {
    Systemd,
    Launchd,
    Unsupported(&'static str),
}

impl ServiceManager {
    fn detect() -> Self {
        match std::env::consts::OS {
            "linux" => Self::Systemd,
            "macos" => Self::Launchd,
            other => Self::Unsupported(other),
        }
    }
}

/// Shells out to `systemctl` on Linux and `launchctl` on macOS.
#[derive(Debug, Clone)]
pub struct SystemServiceController {
    manager: ServiceManager,
    timeout: Duration,
}

impl SystemServiceController {
    pub fn new(timeout: Duration) -> Self {
        Self {
            manager: ServiceManager::detect(),
            timeout,
        }
    }

    async fn exec(&self, program: &'static str, args: &[&str]) -> Result<ServiceOutcome, ServiceError> {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| ServiceError::Timeout {
                seconds: self.timeout.as_secs(),
            })?
            .map_err(|source| ServiceError::Spawn { program, source })?;

        Ok(ServiceOutcome::from_output(program, &output))
    }

    async fn launchd(&self, service: &str, action: ServiceAction) -> Result<ServiceOutcome, ServiceError> {
        match action {
            ServiceAction::Start | ServiceAction::Stop => {
                self.exec(LAUNCHCTL, &[action.as_str(), service]).await
            }
            ServiceAction::Restart => {
                let stopped = self.exec(LAUNCHCTL, &["stop", service]).await?;
                let started = self.exec(LAUNCHCTL, &["start", service]).await?;
                Ok(stopped.then(started))
            }
            ServiceAction::Status => {
                let listing = self.exec(LAUNCHCTL, &["list"]).await?;
                Ok(ServiceOutcome {
                    success: true,
                    output: filter_listing(&listing.output, service),
                    error: None,
                })
            }
        }
    }
}

#[async_trait]
impl ServiceController for SystemServiceController {
    #[instrument(skip(self))]
    async fn run(&self, service: &str, action: ServiceAction) -> Result<ServiceOutcome, ServiceError> {
        let result = match self.manager {
            ServiceManager::Systemd => self.exec(SYSTEMCTL, &[action.as_str(), service]).await,
            ServiceManager::Launchd => self.launchd(service, action).await,
            ServiceManager::Unsupported(os) => Err(ServiceError::UnsupportedPlatform(os)),
        };

        match &result {
            Ok(outcome) => info!(
                service,
                action = %action,
                success = outcome.success,
                "service action finished"
            ),
            Err(err) => warn!(service, action = %action, error = %err, "service action failed"),
        }
        result
    }
}

/// Lines of a `launchctl list` listing that mention `service`.
/// Every `launchctl list` line mentioning `service`, in listing order.
fn filter_listing(listing: &str, service: &str) -> String {
    let matches: Vec<&str> = listing
        .lines()
        .filter(|line| line.contains(service))
        .collect();
    if matches.is_empty() {
        NOT_FOUND.to_string()
    } else {
        matches.join("\n")
    }
}
