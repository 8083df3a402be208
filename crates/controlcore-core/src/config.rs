// ── Runtime client configuration ──
//
// Describes *how* to reach the bus. Never touches disk: the CLI (or any
// other embedder) builds a `ClientConfig` and hands it in.

use std::time::Duration;

use controlcore_api::TopicNamespace;
use controlcore_api::topic::DEFAULT_ROOT;

/// Broker used when nothing else is configured.
pub const DEFAULT_BROKER: &str = "mqtt://localhost:1883";

/// Configuration for one [`Client`](crate::Client).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Broker URL: `mqtt://host:port`, `tcp://host:port` or `ws://host:port/path`.
    pub broker: String,
    /// First topic segment shared by telemetry and commands.
    pub root: String,
    /// Prefix for the generated MQTT client id (`<prefix>-<uuid>`).
    pub client_id_prefix: String,
    pub keep_alive: Duration,
    /// Fixed delay between reconnect attempts.
    pub reconnect_interval: Duration,
}

impl ClientConfig {
    pub fn new(broker: impl Into<String>) -> Self {
        Self {
            broker: broker.into(),
            ..Self::default()
        }
    }

    pub fn namespace(&self) -> TopicNamespace {
        TopicNamespace::new(&self.root)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            broker: DEFAULT_BROKER.into(),
            root: DEFAULT_ROOT.into(),
            client_id_prefix: "controlcore".into(),
            keep_alive: Duration::from_secs(30),
            reconnect_interval: Duration::from_secs(1),
        }
    }
}
