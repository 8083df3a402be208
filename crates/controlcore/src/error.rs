//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use controlcore_config::ConfigError;
use controlcore_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to broker at {url}")]
    #[diagnostic(
        code(controlcore::connection_failed),
        help(
            "Check that the broker is running and reachable.\n\
             Reason: {reason}\n\
             Try: controlcore --broker mqtt://<host>:1883 snapshot"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    // ── Lookups ──────────────────────────────────────────────────────
    #[error("No reading from sensor '{sensor_id}'")]
    #[diagnostic(
        code(controlcore::not_found),
        help(
            "The sensor has not published since the client connected.\n\
             Run: controlcore snapshot --group none  to see which sensors are live,\n\
             or raise --wait."
        )
    )]
    SensorNotFound { sensor_id: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(controlcore::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(controlcore::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: controlcore --broker <url> config init --name {name}"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration file already exists at {path}")]
    #[diagnostic(
        code(controlcore::config_exists),
        help("Pass --force to overwrite it.")
    )]
    ConfigExists { path: String },

    #[error(transparent)]
    #[diagnostic(code(controlcore::config))]
    Config(ConfigError),

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Timed out after {seconds}s waiting for {waiting_for}")]
    #[diagnostic(
        code(controlcore::timeout),
        help("Increase --wait or check that the broker is reachable.")
    )]
    Timeout { seconds: u64, waiting_for: String },

    // ── Internal ─────────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    #[diagnostic(code(controlcore::internal))]
    Internal(String),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Output serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Output serialization failed: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Config serialization failed: {0}")]
    Toml(#[from] toml::ser::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::SensorNotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. }
            | Self::ConfigExists { .. }
            | Self::Config(ConfigError::Validation { .. }) => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed { url, reason },

            CoreError::Disconnected => CliError::ConnectionFailed {
                url: "(disconnected)".into(),
                reason: "the broker connection was lost".into(),
            },

            CoreError::PublishFailed { topic, reason } => CliError::ConnectionFailed {
                url: topic,
                reason: format!("publish was not queued: {reason}"),
            },

            CoreError::Timeout {
                timeout_secs,
                waiting_for,
            } => CliError::Timeout {
                seconds: timeout_secs,
                waiting_for,
            },

            CoreError::SensorNotFound { sensor_id } => CliError::SensorNotFound { sensor_id },

            CoreError::InvalidAction { action, expected } => CliError::Validation {
                field: "action".into(),
                reason: format!("'{action}' is not one of: {expected}"),
            },

            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::Config { message } => CliError::Validation {
                field: "broker".into(),
                reason: message,
            },

            CoreError::Decode { message } => CliError::Validation {
                field: "payload".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::ProfileNotFound { name } => CliError::ProfileNotFound {
                name,
                available: String::new(),
            },
            other => CliError::Config(other),
        }
    }
}
