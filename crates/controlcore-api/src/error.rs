use thiserror::Error;

/// Top-level error type for the `controlcore-api` crate.
///
/// Covers every failure mode of the transport layer: endpoint parsing,
/// the MQTT request channel, and wire payload encoding/decoding.
/// `controlcore-core` maps these into domain errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Endpoint ────────────────────────────────────────────────────
    /// Broker URL could not be parsed.
    #[error("Invalid broker URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Broker URL parsed but cannot be used (scheme, missing host, ...).
    #[error("Invalid broker endpoint {url}: {reason}")]
    InvalidEndpoint { url: String, reason: String },

    // ── Transport ───────────────────────────────────────────────────
    /// The MQTT client rejected a request (request channel full or closed).
    #[error("MQTT request failed: {0}")]
    Client(#[from] rumqttc::ClientError),

    /// The MQTT event loop reported a connection failure.
    #[error("MQTT connection error: {0}")]
    Connection(String),

    // ── Data ────────────────────────────────────────────────────────
    /// Inbound payload was not a valid telemetry record, with the raw body for debugging.
    #[error("Payload decode error: {message}")]
    Decode { message: String, body: String },

    /// Outbound payload could not be serialized.
    #[error("Payload encode error: {0}")]
    Encode(#[from] serde_json::Error),

    /// Embedded epoch timestamp does not map to a representable instant.
    #[error("Timestamp {seconds} is out of range")]
    TimestampOutOfRange { seconds: i64 },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Client(_) | Self::Connection(_))
    }

    /// Returns `true` if the error concerns a single malformed message
    /// rather than the connection.
    pub fn is_payload_error(&self) -> bool {
        matches!(
            self,
            Self::Decode { .. } | Self::TimestampOutOfRange { .. }
        )
    }
}
