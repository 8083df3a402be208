//! Wire payloads exchanged on the bus.
//!
//! Both directions are JSON objects with snake_case keys. Telemetry carries
//! the reading as published by the controller; commands carry the operator's
//! instruction back to it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Error;

/// Pin value used by sensors that are not wired to a physical pin.
pub const NO_PIN: i32 = -1;

// ── TelemetryPayload ─────────────────────────────────────────────────

/// A sensor reading as published on `<root>/data/...`.
///
/// Uses `#[serde(flatten)]` to capture every field beyond the core set
/// (`source_config`, `uptime`, ...), so nothing the controller sends is
/// silently dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireTelemetry")]
pub struct TelemetryPayload {
    /// Globally unique sensor id, also the dedup key. Required.
    pub sensor_id: String,

    /// Logical sensor kind. Firmware sends this as `type`.
    pub sensor_type: String,

    pub station: String,

    pub controller: String,

    pub unit: String,

    pub value: f64,

    /// Physical pin, or [`NO_PIN`].
    pub pin: i32,

    /// Capture time in epoch seconds.
    pub timestamp: i64,

    /// All remaining fields the controller sends.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Inbound shape. `sensor_type` and the firmware's `type` may both be
/// present; `sensor_type` wins.
#[derive(Deserialize)]
struct WireTelemetry {
    sensor_id: String,
    #[serde(default)]
    sensor_type: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    station: String,
    #[serde(default)]
    controller: String,
    #[serde(default)]
    unit: String,
    value: f64,
    #[serde(default = "no_pin")]
    pin: i32,
    #[serde(deserialize_with = "epoch_seconds")]
    timestamp: i64,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

impl From<WireTelemetry> for TelemetryPayload {
    fn from(wire: WireTelemetry) -> Self {
        Self {
            sensor_id: wire.sensor_id,
            sensor_type: wire.sensor_type.or(wire.kind).unwrap_or_default(),
            station: wire.station,
            controller: wire.controller,
            unit: wire.unit,
            value: wire.value,
            pin: wire.pin,
            timestamp: wire.timestamp,
            extra: wire.extra,
        }
    }
}

impl TelemetryPayload {
    /// Decode a raw MQTT payload.
    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        serde_json::from_slice(bytes).map_err(|e| Error::Decode {
            message: e.to_string(),
            body: String::from_utf8_lossy(bytes).into_owned(),
        })
    }

    /// Capture instant derived from the embedded epoch seconds.
    pub fn captured_at(&self) -> Result<DateTime<Utc>, Error> {
        self.timestamp
            .checked_mul(1000)
            .and_then(DateTime::from_timestamp_millis)
            .ok_or(Error::TimestampOutOfRange {
                seconds: self.timestamp,
            })
    }
}

fn no_pin() -> i32 {
    NO_PIN
}

/// Accept integer or fractional epoch seconds; fractions are truncated.
fn epoch_seconds<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Seconds {
        Int(i64),
        Float(f64),
    }

    match Seconds::deserialize(deserializer)? {
        Seconds::Int(s) => Ok(s),
        #[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
        Seconds::Float(f) if f.is_finite() => Ok(f.trunc() as i64),
        Seconds::Float(f) => Err(serde::de::Error::custom(format!(
            "timestamp {f} is not a finite number"
        ))),
    }
}

// ── CommandPayload ───────────────────────────────────────────────────

/// A control command as published on `<root>/command/<sensor_id>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandPayload {
    pub station: String,
    pub controller: String,
    pub sensor_id: String,
    pub sensor_type: String,
    pub unit: String,
    pub value: f64,
    pub command: String,
    pub source: String,
    pub requestor_id: String,
    /// Issue time in epoch seconds.
    pub timestamp: i64,
}

impl CommandPayload {
    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        Ok(serde_json::to_vec(self)?)
    }
}

// ── Tests ────────────────────────────────────────────────────────────
