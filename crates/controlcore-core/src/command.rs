// ── Command construction ──
//
// Turns an operator action on a known reading into a `Command` and the
// topic it is published on. Validation happens here, before anything
// reaches the bus.

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

use controlcore_api::{CommandPayload, TopicNamespace};

use crate::clock::{Clock, SystemClock};
use crate::error::CoreError;
use crate::model::{Command, Reading};

/// Provenance tag stamped on every operator-issued command.
pub const MANUAL_SOURCE: &str = "manual_override";

const OPEN_UNIT: &str = "seconds";
const CLOSE_UNIT: &str = "state";

/// What the operator asks the actuator to do.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Open for a number of seconds.
    Open,
    Close,
    /// Drive to a setpoint.
    SetValue,
}

impl ActionKind {
    /// Parse an action name, rejecting anything outside the known set.
    pub fn parse(name: &str) -> Result<Self, CoreError> {
        Self::from_str(name).map_err(|_| CoreError::InvalidAction {
            action: name.to_owned(),
            expected: Self::iter()
                .map(|a| a.as_ref().to_owned())
                .collect::<Vec<_>>()
                .join(", "),
        })
    }
}

/// Operator-supplied parameters. Which fields matter depends on the action.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandParams {
    pub duration_seconds: Option<u32>,
    pub value: Option<f64>,
    pub unit: Option<String>,
}

impl CommandParams {
    pub fn open_for(seconds: u32) -> Self {
        Self {
            duration_seconds: Some(seconds),
            ..Self::default()
        }
    }

    pub fn set_value(value: f64, unit: Option<String>) -> Self {
        Self {
            value: Some(value),
            unit,
            ..Self::default()
        }
    }

    /// Unit and value for `action`, or why the parameters don't fit it.
    ///
    /// `set_value` without an explicit unit takes `default_unit`.
    pub fn resolve(
        &self,
        action: ActionKind,
        default_unit: &str,
    ) -> Result<(String, f64), CoreError> {
        match action {
            ActionKind::Open => {
                let seconds = self
                    .duration_seconds
                    .filter(|s| *s > 0)
                    .ok_or_else(|| CoreError::ValidationFailed {
                        message: "open requires a duration greater than zero".into(),
                    })?;
                Ok((OPEN_UNIT.to_owned(), f64::from(seconds)))
            }
            ActionKind::Close => Ok((CLOSE_UNIT.to_owned(), 0.0)),
            ActionKind::SetValue => {
                let value = self.value.ok_or_else(|| CoreError::ValidationFailed {
                    message: "set_value requires a value".into(),
                })?;
                if !value.is_finite() {
                    return Err(CoreError::ValidationFailed {
                        message: format!("set_value requires a finite value, got {value}"),
                    });
                }
                let unit = self.unit.as_deref().unwrap_or(default_unit).to_owned();
                Ok((unit, value))
            }
        }
    }
}

/// Builds commands on behalf of one client instance.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    namespace: TopicNamespace,
    requestor_id: String,
    clock: Arc<dyn Clock>,
}

impl CommandBuilder {
    pub fn new(namespace: TopicNamespace, requestor_id: impl Into<String>) -> Self {
        Self {
            namespace,
            requestor_id: requestor_id.into(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock used for `issued_at`.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn requestor_id(&self) -> &str {
        &self.requestor_id
    }

    /// Construct a command for `reading`.
    ///
    /// Placement and type are copied from the reading. Unit and value
    /// follow the action:
    ///
    /// | action      | unit                        | value                       |
    /// |-------------|-----------------------------|-----------------------------|
    /// | `open`      | `seconds`                   | `duration_seconds` (> 0)    |
    /// | `close`     | `state`                     | `0`                         |
    /// | `set_value` | `params.unit` or reading's  | `params.value`              |
    pub fn build(
        &self,
        reading: &Reading,
        action: ActionKind,
        params: &CommandParams,
    ) -> Result<Command, CoreError> {
        let (unit, value) = params.resolve(action, &reading.unit)?;

        Ok(Command {
            station: reading.station.clone(),
            controller: reading.controller.clone(),
            sensor_id: reading.sensor_id.clone(),
            sensor_type: reading.sensor_type.clone(),
            unit,
            value,
            action,
            source: MANUAL_SOURCE.to_owned(),
            requestor_id: self.requestor_id.clone(),
            issued_at: self.clock.now().timestamp(),
        })
    }

    /// `<root>/command/<sensor_id>`.
    pub fn destination_topic(&self, reading: &Reading) -> String {
        self.namespace.command_topic(&reading.sensor_id)
    }

    /// Serialize a command into its destination topic and JSON body.
    pub fn encode(&self, command: &Command) -> Result<(String, Vec<u8>), CoreError> {
        let body = CommandPayload::from(command).encode()?;
        Ok((self.namespace.command_topic(&command.sensor_id), body))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::DateTime;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::clock::ManualClock;
    use crate::model::fixtures::reading;

    fn builder() -> CommandBuilder {
        let clock = ManualClock::new(DateTime::from_timestamp(1_760_000_123, 0).unwrap());
        CommandBuilder::new(TopicNamespace::default(), "requestor-1").with_clock(Arc::new(clock))
    }

    fn valve() -> Reading {
        reading("north_pad7_ctrl3_valve_main", "pad7", "ctrl3", "valve")
    }

    #[test]
    fn action_names_round_trip() {
        assert_eq!(ActionKind::parse("open").unwrap(), ActionKind::Open);
        assert_eq!(ActionKind::parse("set_value").unwrap(), ActionKind::SetValue);
        assert_eq!(ActionKind::SetValue.to_string(), "set_value");
    }

    #[test]
    fn unknown_action_is_rejected() {
        let err = ActionKind::parse("explode").unwrap_err();
        match err {
            CoreError::InvalidAction { action, expected } => {
                assert_eq!(action, "explode");
                assert_eq!(expected, "open, close, set_value");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn open_uses_seconds() {
        let cmd = builder()
            .build(&valve(), ActionKind::Open, &CommandParams::open_for(30))
            .unwrap();

        assert_eq!(cmd.unit, "seconds");
        assert!((cmd.value - 30.0).abs() < f64::EPSILON);
        assert_eq!(cmd.station, "pad7");
        assert_eq!(cmd.controller, "ctrl3");
        assert_eq!(cmd.sensor_type, "valve");
        assert_eq!(cmd.source, MANUAL_SOURCE);
        assert_eq!(cmd.requestor_id, "requestor-1");
        assert_eq!(cmd.issued_at, 1_760_000_123);
    }

    #[test]
    fn open_without_duration_fails() {
        let b = builder();
        assert!(matches!(
            b.build(&valve(), ActionKind::Open, &CommandParams::default()),
            Err(CoreError::ValidationFailed { .. })
        ));
        assert!(matches!(
            b.build(&valve(), ActionKind::Open, &CommandParams::open_for(0)),
            Err(CoreError::ValidationFailed { .. })
        ));
    }

    #[test]
    fn close_ignores_params() {
        let cmd = builder()
            .build(&valve(), ActionKind::Close, &CommandParams::set_value(9.0, None))
            .unwrap();
        assert_eq!(cmd.unit, "state");
        assert!(cmd.value.abs() < f64::EPSILON);
    }

    #[test]
    fn set_value_falls_back_to_reading_unit() {
        let b = builder();
        let cmd = b
            .build(&valve(), ActionKind::SetValue, &CommandParams::set_value(42.0, None))
            .unwrap();
        assert_eq!(cmd.unit, "C");

        let cmd = b
            .build(
                &valve(),
                ActionKind::SetValue,
                &CommandParams::set_value(42.0, Some("pct".into())),
            )
            .unwrap();
        assert_eq!(cmd.unit, "pct");

        assert!(matches!(
            b.build(&valve(), ActionKind::SetValue, &CommandParams::default()),
            Err(CoreError::ValidationFailed { .. })
        ));
    }

    #[test]
    fn destination_and_wire_format() {
        let b = builder();
        let reading = valve();
        assert_eq!(
            b.destination_topic(&reading),
            "controlcore/command/north_pad7_ctrl3_valve_main"
        );

        let cmd = b.build(&reading, ActionKind::Close, &CommandParams::default()).unwrap();
        let (topic, body) = b.encode(&cmd).unwrap();
        assert_eq!(topic, b.destination_topic(&reading));

        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["command"], "close");
        assert_eq!(json["source"], "manual_override");
        assert_eq!(json["timestamp"], 1_760_000_123);
        assert_eq!(json["sensor_id"], "north_pad7_ctrl3_valve_main");
    }
}
