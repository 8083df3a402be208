//! MQTT session with auto-reconnect.
//!
//! Owns one rumqttc [`AsyncClient`]/[`EventLoop`] pair. The event loop runs in
//! a background task that delivers link-state changes and inbound publishes
//! to a [`TransportSink`], one at a time and in arrival order. Connection
//! failures are retried forever at a fixed interval.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use controlcore_api::{BrokerEndpoint, MqttHandle, ReconnectConfig, TopicNamespace};
//! use tokio_util::sync::CancellationToken;
//!
//! let endpoint = BrokerEndpoint::parse("mqtt://192.168.100.60:1883")?;
//! let options = endpoint.mqtt_options("controlcore-cli", Duration::from_secs(30));
//! let (handle, task) = MqttHandle::spawn(
//!     options,
//!     TopicNamespace::default().data_filter(),
//!     Arc::new(MySink),
//!     ReconnectConfig::default(),
//!     CancellationToken::new(),
//! );
//!
//! handle.publish("controlcore/command/x", b"{}".to_vec())?;
//! handle.shutdown();
//! task.await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::Error;

// ── Request channel capacity ─────────────────────────────────────────

const REQUEST_CHANNEL_CAPACITY: usize = 64;

// ── LinkState ────────────────────────────────────────────────────────

/// Transport-level link state reported to the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// A (re)connection attempt is about to be made.
    Connecting { attempt: u32 },
    /// The broker acknowledged the session and the telemetry filter was requested.
    Up,
    /// The connection dropped or could not be established.
    Down,
}

// ── TransportSink ────────────────────────────────────────────────────

/// Receiver of everything the event loop observes.
///
/// Called from the event loop task only, so calls never overlap. Slow
/// implementations delay the next inbound message.
pub trait TransportSink: Send + Sync + 'static {
    /// The link changed state.
    fn on_link_state(&self, state: LinkState);

    /// An application message arrived on `topic`.
    fn on_message(&self, topic: &str, payload: &[u8]);

    /// An outbound publish was written to the network.
    fn on_published(&self) {}
}

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Fixed-interval reconnection policy.
///
/// The interval never grows and attempts never stop; a dropped bus is
/// expected to come back.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay between a failure and the next attempt. Default: 1s.
    pub interval: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
        }
    }
}

// ── MqttHandle ───────────────────────────────────────────────────────

/// Handle to a running MQTT session.
///
/// Publishing goes through rumqttc's request channel, so the handle can be
/// shared across threads and used concurrently with inbound delivery.
#[derive(Debug)]
pub struct MqttHandle {
    client: AsyncClient,
    cancel: CancellationToken,
}

impl MqttHandle {
    /// Create the session and spawn the event loop task.
    ///
    /// Returns immediately; the first connection attempt happens in the
    /// background. Must be called within a tokio runtime.
    pub fn spawn(
        options: MqttOptions,
        subscribe_filter: String,
        sink: Arc<dyn TransportSink>,
        reconnect: ReconnectConfig,
        cancel: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let (client, eventloop) = AsyncClient::new(options, REQUEST_CHANNEL_CAPACITY);

        let task_client = client.clone();
        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            event_loop(
                eventloop,
                task_client,
                subscribe_filter,
                sink,
                reconnect,
                task_cancel,
            )
            .await;
        });

        (Self { client, cancel }, task)
    }

    /// Queue a publish without waiting. QoS 0, not retained.
    pub fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), Error> {
        self.client
            .try_publish(topic, QoS::AtMostOnce, false, payload)?;
        Ok(())
    }

    /// Signal the event loop task to stop.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

// ── Background event loop ────────────────────────────────────────────

/// Main loop: poll → dispatch → on error, wait → poll again (rumqttc
/// reconnects on the next poll).
async fn event_loop(
    mut eventloop: EventLoop,
    client: AsyncClient,
    subscribe_filter: String,
    sink: Arc<dyn TransportSink>,
    reconnect: ReconnectConfig,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;
    sink.on_link_state(LinkState::Connecting { attempt });

    loop {
        let event = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            event = eventloop.poll() => event,
        };

        match event {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                tracing::info!(
                    session_present = ack.session_present,
                    "MQTT broker accepted connection"
                );
                attempt = 0;

                // Clean sessions drop subscriptions, so request the filter on every CONNACK.
                match client.try_subscribe(subscribe_filter.as_str(), QoS::AtMostOnce) {
                    Ok(()) => tracing::info!(filter = %subscribe_filter, "Subscribing to telemetry"),
                    Err(e) => tracing::warn!(error = %e, filter = %subscribe_filter, "Subscribe request failed"),
                }

                sink.on_link_state(LinkState::Up);
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                sink.on_message(&publish.topic, &publish.payload);
            }
            Ok(Event::Incoming(Packet::SubAck(ack))) => {
                tracing::debug!(pkid = ack.pkid, codes = ?ack.return_codes, "Subscription acknowledged");
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                tracing::info!("MQTT broker sent disconnect");
                sink.on_link_state(LinkState::Down);
            }
            Ok(Event::Outgoing(Outgoing::Publish(_))) => sink.on_published(),
            Ok(_) => {
                // Pings, acks for our own requests -- nothing to do
            }
            Err(e) => {
                attempt = attempt.saturating_add(1);
                tracing::warn!(error = %e, attempt, "MQTT connection error");
                sink.on_link_state(LinkState::Down);

                tracing::debug!(
                    delay_ms = u64::try_from(reconnect.interval.as_millis()).unwrap_or(u64::MAX),
                    attempt,
                    "Waiting before reconnect"
                );

                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(reconnect.interval) => {}
                }

                sink.on_link_state(LinkState::Connecting { attempt });
            }
        }
    }

    // Best effort: the loop is no longer polled, so this only reaches the
    // broker if the request happens to be flushed by a concurrent poll.
    let _ = client.try_disconnect();
    sink.on_link_state(LinkState::Down);
    tracing::debug!("MQTT event loop exiting");
}

// ── Tests ────────────────────────────────────────────────────────────
