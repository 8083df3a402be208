// ── Domain model ──
//
// Canonical types shared by the store, the views and the command path.

pub mod command;
pub mod reading;

pub use command::Command;
pub use reading::Reading;

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{DateTime, Utc};

    use super::Reading;
    use crate::identifier::SensorIdentifier;

    /// A reading with the given placement and type, captured at `captured_at`.
    pub(crate) fn reading_at(
        sensor_id: &str,
        station: &str,
        controller: &str,
        sensor_type: &str,
        captured_at: DateTime<Utc>,
    ) -> Reading {
        Reading {
            station: station.into(),
            controller: controller.into(),
            sensor_id: sensor_id.into(),
            sensor_type: sensor_type.into(),
            unit: "C".into(),
            value: 21.5,
            pin: 4,
            captured_at,
            identifier: SensorIdentifier::parse(sensor_id),
            extra: serde_json::Map::new(),
        }
    }

    pub(crate) fn reading(
        sensor_id: &str,
        station: &str,
        controller: &str,
        sensor_type: &str,
    ) -> Reading {
        reading_at(
            sensor_id,
            station,
            controller,
            sensor_type,
            DateTime::from_timestamp(1_760_000_000, 0).unwrap_or_default(),
        )
    }
}
