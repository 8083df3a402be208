use serde::{Deserialize, Serialize};

use controlcore_api::CommandPayload;

use crate::command::ActionKind;

/// An outbound instruction for one sensor or actuator.
///
/// Built by [`CommandBuilder`](crate::CommandBuilder); published once and
/// never tracked afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub station: String,
    pub controller: String,
    pub sensor_id: String,
    pub sensor_type: String,
    pub unit: String,
    pub value: f64,
    pub action: ActionKind,
    /// Provenance tag, always [`MANUAL_SOURCE`](crate::MANUAL_SOURCE) for operator commands.
    pub source: String,
    pub requestor_id: String,
    /// Epoch seconds at build time.
    pub issued_at: i64,
}

impl From<&Command> for CommandPayload {
    fn from(cmd: &Command) -> Self {
        Self {
            station: cmd.station.clone(),
            controller: cmd.controller.clone(),
            sensor_id: cmd.sensor_id.clone(),
            sensor_type: cmd.sensor_type.clone(),
            unit: cmd.unit.clone(),
            value: cmd.value,
            command: cmd.action.to_string(),
            source: cmd.source.clone(),
            requestor_id: cmd.requestor_id.clone(),
            timestamp: cmd.issued_at,
        }
    }
}
