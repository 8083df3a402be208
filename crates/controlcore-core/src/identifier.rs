//! Sensor identifier decomposition.
//!
//! Field controllers build ids as
//! `<location>_<station>_<controller>_<type>_<name>`, e.g.
//! `north_pad7_ctrl3_flow_tank1`. The trailing name may itself contain
//! underscores.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Separator between identifier segments.
pub const DELIMITER: char = '_';

/// Structural parts of a sensor id.
///
/// Missing segments are empty strings: short or malformed ids degrade to
/// partially filled values instead of failing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SensorIdentifier {
    pub location_nickname: String,
    pub station_location: String,
    pub controller_name: String,
    pub sensor_type_parsed: String,
    /// Everything from the fifth segment on, rejoined with `_`.
    pub display_name: String,
}

impl SensorIdentifier {
    /// Split `id` into its positional parts. Never fails.
    pub fn parse(id: &str) -> Self {
        let mut segments = id.split(DELIMITER);
        let mut next = || segments.next().unwrap_or_default().to_owned();

        let location_nickname = next();
        let station_location = next();
        let controller_name = next();
        let sensor_type_parsed = next();
        let display_name = segments.collect::<Vec<_>>().join("_");

        Self {
            location_nickname,
            station_location,
            controller_name,
            sensor_type_parsed,
            display_name,
        }
    }

    /// Label for UIs: the display name, or the parsed type when the id has no name segment.
    pub fn label(&self) -> &str {
        if self.display_name.is_empty() {
            &self.sensor_type_parsed
        } else {
            &self.display_name
        }
    }

    /// Returns `true` if all five segments are present and non-empty.
    pub fn is_complete(&self) -> bool {
        [
            &self.location_nickname,
            &self.station_location,
            &self.controller_name,
            &self.sensor_type_parsed,
            &self.display_name,
        ]
        .iter()
        .all(|s| !s.is_empty())
    }
}

/// Recomposes the id the way firmware builds it. Trailing empty segments are omitted.
impl fmt::Display for SensorIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = [
            self.location_nickname.as_str(),
            self.station_location.as_str(),
            self.controller_name.as_str(),
            self.sensor_type_parsed.as_str(),
            self.display_name.as_str(),
        ];
        let used = parts
            .iter()
            .rposition(|p| !p.is_empty())
            .map_or(0, |i| i + 1);
        write!(f, "{}", parts.get(..used).unwrap_or_default().join("_"))
    }
}

impl From<&str> for SensorIdentifier {
    fn from(id: &str) -> Self {
        Self::parse(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn five_segment_id() {
        let id = SensorIdentifier::parse("north_pad7_ctrl3_flow_tank1");
        assert_eq!(
            id,
            SensorIdentifier {
                location_nickname: "north".into(),
                station_location: "pad7".into(),
                controller_name: "ctrl3".into(),
                sensor_type_parsed: "flow".into(),
                display_name: "tank1".into(),
            }
        );
        assert!(id.is_complete());
    }

    #[test]
    fn short_id_leaves_missing_fields_empty() {
        let id = SensorIdentifier::parse("a_b");
        assert_eq!(id.location_nickname, "a");
        assert_eq!(id.station_location, "b");
        assert_eq!(id.controller_name, "");
        assert_eq!(id.sensor_type_parsed, "");
        assert_eq!(id.display_name, "");
        assert!(!id.is_complete());
    }

    #[test]
    fn trailing_segments_are_rejoined() {
        let id = SensorIdentifier::parse("home_garden-hydrant_uno-r4_temperature_soil_bed_2");
        assert_eq!(id.sensor_type_parsed, "temperature");
        assert_eq!(id.display_name, "soil_bed_2");
    }

    #[test]
    fn empty_id_is_all_empty() {
        assert_eq!(SensorIdentifier::parse(""), SensorIdentifier::default());
    }

    #[test]
    fn empty_segments_are_preserved_positionally() {
        let id = SensorIdentifier::parse("__ctrl__name");
        assert_eq!(id.location_nickname, "");
        assert_eq!(id.station_location, "");
        assert_eq!(id.controller_name, "ctrl");
        assert_eq!(id.sensor_type_parsed, "");
        assert_eq!(id.display_name, "name");
    }

    #[test]
    fn parse_is_idempotent_through_display() {
        for raw in [
            "north_pad7_ctrl3_flow_tank1",
            "a_b",
            "x_y_z_w_long_tail_name",
            "__ctrl__name",
        ] {
            let once = SensorIdentifier::parse(raw);
            assert_eq!(once.to_string(), raw);
            assert_eq!(SensorIdentifier::parse(&once.to_string()), once);
        }
    }

    #[test]
    fn label_falls_back_to_type() {
        assert_eq!(SensorIdentifier::parse("a_b_c_flow").label(), "flow");
        assert_eq!(SensorIdentifier::parse("a_b_c_flow_main").label(), "main");
    }
}
