use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use controlcore_api::TelemetryPayload;
use controlcore_api::payload::NO_PIN;

use crate::error::CoreError;
use crate::freshness;
use crate::identifier::SensorIdentifier;

/// Latest observation for one sensor.
///
/// The store keeps at most one `Reading` per [`sensor_id`](Self::sensor_id);
/// a newer message replaces the older one wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub station: String,
    pub controller: String,
    pub sensor_id: String,
    pub sensor_type: String,
    pub unit: String,
    pub value: f64,
    /// Physical pin, `-1` when not applicable. See [`pin_number`](Self::pin_number).
    pub pin: i32,
    /// When the controller took the measurement (not when it was received).
    pub captured_at: DateTime<Utc>,
    /// Parts decomposed from `sensor_id`.
    #[serde(flatten)]
    pub identifier: SensorIdentifier,
    /// Payload fields outside the core set, kept verbatim.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Reading {
    /// Build a reading from a decoded telemetry payload.
    ///
    /// Fails only when the embedded timestamp is out of range.
    pub fn from_payload(payload: TelemetryPayload) -> Result<Self, CoreError> {
        let captured_at = payload.captured_at()?;
        let identifier = SensorIdentifier::parse(&payload.sensor_id);

        Ok(Self {
            station: payload.station,
            controller: payload.controller,
            sensor_id: payload.sensor_id,
            sensor_type: payload.sensor_type,
            unit: payload.unit,
            value: payload.value,
            pin: payload.pin,
            captured_at,
            identifier,
            extra: payload.extra,
        })
    }

    /// The pin as an unsigned number, or `None` for the `-1` sentinel
    /// (and any other negative value).
    pub fn pin_number(&self) -> Option<u32> {
        if self.pin == NO_PIN {
            return None;
        }
        u32::try_from(self.pin).ok()
    }

    /// Age relative to `now`. Negative when the capture time is in the future.
    pub fn age_at(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.captured_at
    }

    /// Whether the reading is fresh right now.
    pub fn is_fresh(&self, max_age_minutes: f64) -> bool {
        freshness::is_fresh(self.captured_at, max_age_minutes)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn payload(json: &str) -> TelemetryPayload {
        TelemetryPayload::decode(json.as_bytes()).unwrap()
    }

    #[test]
    fn from_payload_parses_identifier_and_time() {
        let reading = Reading::from_payload(payload(
            r#"{"sensor_id":"north_pad7_ctrl3_flow_tank1","sensor_type":"flow",
                "station":"pad7","controller":"ctrl3","unit":"L/min",
                "value":3.5,"pin":-1,"timestamp":1760000000}"#,
        ))
        .unwrap();

        assert_eq!(reading.identifier.display_name, "tank1");
        assert_eq!(reading.identifier.location_nickname, "north");
        assert_eq!(reading.captured_at.timestamp(), 1_760_000_000);
        assert_eq!(reading.pin_number(), None);
    }

    #[test]
    fn empty_sensor_id_still_builds() {
        let reading =
            Reading::from_payload(payload(r#"{"sensor_id":"","value":1,"timestamp":1}"#)).unwrap();
        assert_eq!(reading.identifier, SensorIdentifier::default());
    }

    #[test]
    fn pin_number_maps_sentinel() {
        let mut reading =
            Reading::from_payload(payload(r#"{"sensor_id":"x","value":1,"timestamp":1,"pin":7}"#))
                .unwrap();
        assert_eq!(reading.pin_number(), Some(7));
        reading.pin = -1;
        assert_eq!(reading.pin_number(), None);
    }

    #[test]
    fn serialized_reading_flattens_identifier() {
        let reading = Reading::from_payload(payload(
            r#"{"sensor_id":"a_b_c_d_e","value":1,"timestamp":1,"uptime":12}"#,
        ))
        .unwrap();
        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(json["display_name"], "e");
        assert_eq!(json["controller_name"], "c");
        assert_eq!(json["extra"]["uptime"], 12);
    }
}
