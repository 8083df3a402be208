// ── Core error types ──
//
// User-facing errors from controlcore-core. Consumers never see MQTT
// client errors or JSON parse failures directly; the
// `From<controlcore_api::Error>` impl translates them.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach broker at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Not connected to the broker")]
    Disconnected,

    #[error("Publish to {topic} was not queued: {reason}")]
    PublishFailed { topic: String, reason: String },

    #[error("Timed out after {timeout_secs}s waiting for {waiting_for}")]
    Timeout {
        timeout_secs: u64,
        waiting_for: String,
    },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Sensor not found: {sensor_id}")]
    SensorNotFound { sensor_id: String },

    #[error("Malformed telemetry payload: {message}")]
    Decode { message: String },

    // ── Command errors ───────────────────────────────────────────────
    #[error("Unknown command action '{action}' (expected one of: {expected})")]
    InvalidAction { action: String, expected: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Returns `true` when the operation may succeed once the bus is back.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. }
                | Self::Disconnected
                | Self::PublishFailed { .. }
                | Self::Timeout { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<controlcore_api::Error> for CoreError {
    fn from(err: controlcore_api::Error) -> Self {
        use controlcore_api::Error as Api;

        match err {
            Api::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid broker URL: {e}"),
            },
            Api::InvalidEndpoint { url, reason } => CoreError::Config {
                message: format!("Invalid broker endpoint {url}: {reason}"),
            },
            Api::Client(e) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: e.to_string(),
            },
            Api::Connection(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason,
            },
            Api::Decode { message, body: _ } => CoreError::Decode { message },
            Api::TimestampOutOfRange { seconds } => CoreError::Decode {
                message: format!("timestamp {seconds} is out of range"),
            },
            Api::Encode(e) => CoreError::Internal(format!("Command encoding failed: {e}")),
        }
    }
}
