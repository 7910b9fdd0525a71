use serde::{Deserialize, Serialize};
use std::{
    env, fs, io,
    path::{Path, PathBuf},
    str::FromStr,
};
use thiserror::Error;

pub const PORT_ENV: &str = "TORADMIN_PORT";
pub const HOST_ENV: &str = "TORADMIN_HOST";
pub const LOG_LEVEL_ENV: &str = "TORADMIN_LOG_LEVEL";
pub const TORRC_PATH_ENV: &str = "TORADMIN_TORRC_PATH";
pub const SERVICE_NAME_ENV: &str = "TORADMIN_SERVICE_NAME";
pub const CREDENTIALS_PATH_ENV: &str = "TORADMIN_CREDENTIALS_PATH";
pub const DISABLE_AUTH_ENV: &str = "TORADMIN_DISABLE_AUTH";
pub const API_TOKEN_ENV: &str = "TORADMIN_API_TOKEN";
pub const SESSION_KEY_ENV: &str = "TORADMIN_SESSION_KEY";

/// Every variable `load_config` reads, handy for tests that reset the environment.
pub const ENV_VARS: [&str; 9] = [
    PORT_ENV,
    HOST_ENV,
    LOG_LEVEL_ENV,
    TORRC_PATH_ENV,
    SERVICE_NAME_ENV,
    CREDENTIALS_PATH_ENV,
    DISABLE_AUTH_ENV,
    API_TOKEN_ENV,
    SESSION_KEY_ENV,
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid YAML configuration: {0}")]
    Yaml(#[from] serde_yml::Error),

    #[error("invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("unsupported configuration format {0:?}; use yaml, yml, json or toml")]
    UnsupportedFormat(String),

    #[error("invalid {var} value {value:?}: {reason}")]
    InvalidEnv {
        var: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    /// Header used to read and echo the per-request id.
    pub request_id_header: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_id_header: "x-request-id".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TorrcSection {
    pub path: PathBuf,
}

impl Default for TorrcSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/etc/tor/torrc"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSection {
    /// Unit or launchd label handed to the service manager.
    pub name: String,
    pub timeout_seconds: u64,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            name: "tor".to_string(),
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    pub credentials_path: PathBuf,
    /// Skips every authentication check. Development only.
    pub disabled: bool,
    /// Token adopted at setup time instead of a generated one. Environment only.
    #[serde(skip)]
    pub api_token: Option<String>,
}

impl Default for AuthSection {
    fn default() -> Self {
        Self {
            credentials_path: default_credentials_path(),
            disabled: false,
            api_token: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    pub cookie_name: String,
    pub secure: bool,
    pub max_age_seconds: u64,
    /// Base64 cookie key from `TORADMIN_SESSION_KEY`. Never read from or written to files.
    #[serde(skip)]
    pub secret: Option<String>,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            cookie_name: "toradmin_session".to_string(),
            secure: false,
            max_age_seconds: 86_400,
            secret: None,
        }
    }
}

/// Settings of the control panel itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerSection,
    pub logging: LoggingSection,
    pub torrc: TorrcSection,
    pub service: ServiceSection,
    pub auth: AuthSection,
    pub session: SessionSection,
}

fn default_credentials_path() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from(".toradmin"),
        |dirs| dirs.config_dir().join("toradmin"),
    )
    .join("credentials.json")
}

fn env_value(var: &str) -> Option<String> {
    env::var(var).ok().filter(|value| !value.trim().is_empty())
}

fn parse_flag(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            var,
            value: value.to_string(),
            reason: "expected true or false",
        }),
    }
}

impl Config {
    /// Generates a default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::default()
    }

    /// Resolves the configuration: defaults, then the optional file, then
    /// environment variables for values still at their default, then the CLI
    /// port override. The result is validated before it is returned.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when the file cannot be read or parsed, an
    /// environment value is malformed, or validation fails.
    pub fn load_config(
        config_path: Option<&Path>,
        port_override: Option<u16>,
    ) -> Result<Self, ConfigError> {
        let mut config = match config_path {
            Some(path) => Self::from_file(path)?,
            None => Self::with_defaults(),
        };

        config.apply_env_overrides()?;

        if let Some(port) = port_override {
            config.server.port = port;
        }

        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    /// Parses a configuration file, picking the format from its extension.
    ///
    /// # Errors
    /// Returns [`ConfigError`] for unreadable files, parse failures, or an
    /// unknown extension.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        if !matches!(extension.as_str(), "yaml" | "yml" | "json" | "toml") {
            return Err(ConfigError::UnsupportedFormat(extension));
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config = match extension.as_str() {
            "json" => serde_json::from_str(&content)?,
            "toml" => toml::from_str(&content)?,
            _ => serde_yml::from_str(&content)?,
        };
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        let defaults = Self::with_defaults();

        if self.server.port == defaults.server.port
            && let Some(port) = env_value(PORT_ENV)
        {
            self.server.port = port.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: PORT_ENV,
                value: port.clone(),
                reason: "must be a number between 1 and 65535",
            })?;
        }
        if self.server.host == defaults.server.host
            && let Some(host) = env_value(HOST_ENV)
        {
            self.server.host = host;
        }
        if self.logging.level == defaults.logging.level
            && let Some(level) = env_value(LOG_LEVEL_ENV)
        {
            self.logging.level = level;
        }
        if self.torrc.path == defaults.torrc.path
            && let Some(path) = env_value(TORRC_PATH_ENV)
        {
            self.torrc.path = PathBuf::from(path);
        }
        if self.service.name == defaults.service.name
            && let Some(name) = env_value(SERVICE_NAME_ENV)
        {
            self.service.name = name;
        }
        if self.auth.credentials_path == defaults.auth.credentials_path
            && let Some(path) = env_value(CREDENTIALS_PATH_ENV)
        {
            self.auth.credentials_path = PathBuf::from(path);
        }
        if self.auth.disabled == defaults.auth.disabled
            && let Some(flag) = env_value(DISABLE_AUTH_ENV)
        {
            self.auth.disabled = parse_flag(DISABLE_AUTH_ENV, &flag)?;
        }

        self.auth.api_token = env_value(API_TOKEN_ENV);
        self.session.secret = env_value(SESSION_KEY_ENV);
        Ok(())
    }

    /// Collects every problem instead of stopping at the first.
    ///
    /// # Errors
    /// Returns the list of human-readable problems when any check fails.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push("Invalid server port. Must be greater than 0.".to_string());
        }
        if self.server.host.trim().is_empty() {
            errors.push("Server host must not be empty.".to_string());
        }
        if self.server.request_id_header.trim().is_empty() {
            errors.push("Request id header must not be empty.".to_string());
        }
        let level = self.logging.level.trim();
        if tracing::Level::from_str(level).is_err() && !level.contains('=') {
            errors.push(format!("Unknown log level: {level:?}"));
        }
        if self.torrc.path.as_os_str().is_empty() {
            errors.push("torrc path must not be empty.".to_string());
        }
        if self.service.name.trim().is_empty() {
            errors.push("Service name must not be empty.".to_string());
        }
        if self.service.timeout_seconds == 0 {
            errors.push("Service timeout must be greater than 0 seconds.".to_string());
        }
        if self.auth.credentials_path.as_os_str().is_empty() {
            errors.push("Credentials path must not be empty.".to_string());
        }
        if self.session.cookie_name.trim().is_empty() {
            errors.push("Session cookie name must not be empty.".to_string());
        }
        if self.session.max_age_seconds == 0 {
            errors.push("Session max age must be greater than 0 seconds.".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
