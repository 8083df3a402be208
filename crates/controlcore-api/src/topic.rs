//! Topic namespace for the telemetry bus.
//!
//! Every topic lives under a single root segment:
//!
//! - `<root>/data/...` carries sensor readings published by field
//!   controllers. Firmware publishes `<root>/data/<station>/<sensor_id>`,
//!   older nodes publish `<root>/data/<sensor_id>`; both are accepted.
//! - `<root>/command/<sensor_id>` carries control commands addressed to a
//!   single sensor or actuator.

use serde::{Deserialize, Serialize};

/// Root segment used when none is configured.
pub const DEFAULT_ROOT: &str = "controlcore";

const DATA_SEGMENT: &str = "data";
const COMMAND_SEGMENT: &str = "command";

/// Topic scheme rooted at a configurable first segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TopicNamespace {
    root: String,
}

impl TopicNamespace {
    /// Build a namespace from a root segment. Surrounding slashes are trimmed.
    pub fn new(root: impl AsRef<str>) -> Self {
        Self {
            root: root.as_ref().trim_matches('/').to_owned(),
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Wildcard filter covering every telemetry topic: `<root>/data/#`.
    pub fn data_filter(&self) -> String {
        format!("{}/{DATA_SEGMENT}/#", self.root)
    }

    /// Prefix shared by all telemetry topics, including the trailing slash.
    pub fn data_prefix(&self) -> String {
        format!("{}/{DATA_SEGMENT}/", self.root)
    }

    /// Returns `true` if `topic` belongs to the telemetry sub-namespace.
    ///
    /// The bare prefix (`<root>/data/`) with nothing after it is rejected.
    pub fn is_data_topic(&self, topic: &str) -> bool {
        self.strip(topic, DATA_SEGMENT)
            .is_some_and(|rest| !rest.is_empty())
    }

    /// Destination for commands targeting `sensor_id`: `<root>/command/<sensor_id>`.
    pub fn command_topic(&self, sensor_id: &str) -> String {
        format!("{}/{COMMAND_SEGMENT}/{sensor_id}", self.root)
    }

    /// Returns `true` if `topic` belongs to the command sub-namespace.
    pub fn is_command_topic(&self, topic: &str) -> bool {
        self.strip(topic, COMMAND_SEGMENT)
            .is_some_and(|rest| !rest.is_empty())
    }

    /// Last topic level of a telemetry topic, which firmware sets to the sensor id.
    pub fn sensor_id_from_topic<'a>(&self, topic: &'a str) -> Option<&'a str> {
        let rest = self.strip(topic, DATA_SEGMENT)?;
        rest.rsplit('/').next().filter(|s| !s.is_empty())
    }

    fn strip<'a>(&self, topic: &'a str, segment: &str) -> Option<&'a str> {
        topic
            .strip_prefix(self.root.as_str())?
            .strip_prefix('/')?
            .strip_prefix(segment)?
            .strip_prefix('/')
    }
}

impl Default for TopicNamespace {
    fn default() -> Self {
        Self::new(DEFAULT_ROOT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_root_builds_expected_topics() {
        let ns = TopicNamespace::default();
        assert_eq!(ns.data_filter(), "controlcore/data/#");
        assert_eq!(ns.data_prefix(), "controlcore/data/");
        assert_eq!(
            ns.command_topic("north_pad7_ctrl3_valve_main"),
            "controlcore/command/north_pad7_ctrl3_valve_main"
        );
    }

    #[test]
    fn root_slashes_are_trimmed() {
        let ns = TopicNamespace::new("/plant/");
        assert_eq!(ns.root(), "plant");
        assert_eq!(ns.data_filter(), "plant/data/#");
    }

    #[test]
    fn data_topics_at_any_depth_match() {
        let ns = TopicNamespace::default();
        assert!(ns.is_data_topic("controlcore/data/s1_temp"));
        assert!(ns.is_data_topic("controlcore/data/garden-hydrant/s1_temp"));
        assert!(!ns.is_data_topic("controlcore/data/"));
        assert!(!ns.is_data_topic("controlcore/command/s1_temp"));
        assert!(!ns.is_data_topic("controlcore/database/x"));
        assert!(!ns.is_data_topic("other/data/s1_temp"));
        assert!(!ns.is_data_topic("controlcorex/data/s1_temp"));
    }

    #[test]
    fn command_topics_match() {
        let ns = TopicNamespace::default();
        assert!(ns.is_command_topic("controlcore/command/abc"));
        assert!(!ns.is_command_topic("controlcore/command/"));
        assert!(!ns.is_command_topic("controlcore/data/abc"));
    }

    #[test]
    fn sensor_id_is_last_level() {
        let ns = TopicNamespace::default();
        assert_eq!(
            ns.sensor_id_from_topic("controlcore/data/garden-hydrant/home_gh_uno_flow_main"),
            Some("home_gh_uno_flow_main")
        );
        assert_eq!(ns.sensor_id_from_topic("controlcore/data/abc"), Some("abc"));
        assert_eq!(ns.sensor_id_from_topic("controlcore/data/abc/"), None);
        assert_eq!(ns.sensor_id_from_topic("controlcore/command/abc"), None);
    }
}
