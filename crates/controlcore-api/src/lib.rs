// controlcore-api: MQTT transport for ControlCore sensor telemetry.

pub mod endpoint;
pub mod error;
pub mod mqtt;
pub mod payload;
pub mod topic;

pub use endpoint::{BrokerEndpoint, BrokerTransport};
pub use error::Error;
pub use mqtt::{LinkState, MqttHandle, ReconnectConfig, TransportSink};
pub use payload::{CommandPayload, TelemetryPayload};
pub use topic::TopicNamespace;
