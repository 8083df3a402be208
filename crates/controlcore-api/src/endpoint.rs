//! Broker endpoint parsing.
//!
//! Brokers are addressed by URL. `mqtt://` and `tcp://` select a plain TCP
//! session (default port 1883); `ws://` selects MQTT over WebSocket
//! (default port 9001), which is what browser dashboards on the same bus use.

use std::fmt;
use std::time::Duration;

use rumqttc::{MqttOptions, Transport};
use url::Url;

use crate::error::Error;

pub const DEFAULT_TCP_PORT: u16 = 1883;
pub const DEFAULT_WS_PORT: u16 = 9001;

/// Wire transport used to reach the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerTransport {
    Tcp,
    WebSocket,
}

/// A validated broker address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerEndpoint {
    url: Url,
    transport: BrokerTransport,
    host: String,
    port: u16,
}

impl BrokerEndpoint {
    /// Parse and validate a broker URL such as `mqtt://10.0.0.5:1883`
    /// or `ws://192.168.100.60:9001`.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let url = Url::parse(raw)?;
        Self::from_url(url)
    }

    pub fn from_url(url: Url) -> Result<Self, Error> {
        let transport = match url.scheme() {
            "mqtt" | "tcp" => BrokerTransport::Tcp,
            "ws" => BrokerTransport::WebSocket,
            other => {
                return Err(Error::InvalidEndpoint {
                    url: url.to_string(),
                    reason: format!("unsupported scheme '{other}' (expected mqtt, tcp or ws)"),
                });
            }
        };

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::InvalidEndpoint {
                url: url.to_string(),
                reason: "missing host".into(),
            })?
            .to_owned();

        let port = url.port().unwrap_or(match transport {
            BrokerTransport::Tcp => DEFAULT_TCP_PORT,
            BrokerTransport::WebSocket => DEFAULT_WS_PORT,
        });

        Ok(Self {
            url,
            transport,
            host,
            port,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn transport(&self) -> BrokerTransport {
        self.transport
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Build rumqttc session options for this endpoint.
    ///
    /// `keep_alive` is clamped to at least one second, the broker protocol
    /// resolution.
    pub fn mqtt_options(&self, client_id: &str, keep_alive: Duration) -> MqttOptions {
        let mut options = match self.transport {
            BrokerTransport::Tcp => MqttOptions::new(client_id, self.host.as_str(), self.port),
            BrokerTransport::WebSocket => {
                // rumqttc takes the full URL as the "host" for WebSocket sessions.
                let mut opts = MqttOptions::new(client_id, self.url.as_str(), self.port);
                opts.set_transport(Transport::Ws);
                opts
            }
        };
        options.set_keep_alive(keep_alive.max(Duration::from_secs(1)));
        options.set_clean_session(true);
        options
    }
}

impl fmt::Display for BrokerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn mqtt_scheme_defaults_to_1883() {
        let ep = BrokerEndpoint::parse("mqtt://broker.local").unwrap();
        assert_eq!(ep.transport(), BrokerTransport::Tcp);
        assert_eq!(ep.host(), "broker.local");
        assert_eq!(ep.port(), DEFAULT_TCP_PORT);
    }

    #[test]
    fn ws_scheme_keeps_explicit_port() {
        let ep = BrokerEndpoint::parse("ws://192.168.100.60:9001").unwrap();
        assert_eq!(ep.transport(), BrokerTransport::WebSocket);
        assert_eq!(ep.host(), "192.168.100.60");
        assert_eq!(ep.port(), 9001);
    }

    #[test]
    fn tcp_alias_is_accepted() {
        let ep = BrokerEndpoint::parse("tcp://127.0.0.1:18830").unwrap();
        assert_eq!(ep.transport(), BrokerTransport::Tcp);
        assert_eq!(ep.port(), 18830);
    }

    #[test]
    fn http_scheme_is_rejected() {
        let err = BrokerEndpoint::parse("http://broker.local").unwrap_err();
        assert!(matches!(err, Error::InvalidEndpoint { .. }), "{err}");
    }

    #[test]
    fn garbage_is_an_url_error() {
        let err = BrokerEndpoint::parse("not a url").unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)), "{err}");
    }

    #[test]
    fn options_carry_client_id_and_keep_alive() {
        let ep = BrokerEndpoint::parse("mqtt://broker.local:1884").unwrap();
        let opts = ep.mqtt_options("controlcore-test", Duration::from_millis(10));
        assert_eq!(opts.client_id(), "controlcore-test");
        assert_eq!(opts.broker_address(), ("broker.local".to_owned(), 1884));
        assert_eq!(opts.keep_alive(), Duration::from_secs(1));
    }
}
