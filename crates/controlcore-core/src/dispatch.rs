// ── Inbound pipeline ──
//
// Receives everything the MQTT event loop observes: maps link states onto
// the public `ConnectionState`, and turns telemetry publishes into readings
// (decode → enrich → store → fan-out).

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::{broadcast, watch};

use controlcore_api::{LinkState, TelemetryPayload, TopicNamespace, TransportSink};

use crate::client::ConnectionState;
use crate::error::CoreError;
use crate::model::Reading;
use crate::store::ReadingStore;
use crate::subscribers::SubscriberRegistry;

/// Capacity of the async reading broadcast. Lagging receivers skip ahead.
pub(crate) const READING_CHANNEL_CAPACITY: usize = 256;

/// What happened to one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Topic outside the telemetry namespace.
    Ignored,
    /// Payload could not be decoded; nobody was notified.
    Dropped,
    /// Stored and handed to subscribers; `subscribers` is how many ran cleanly.
    Delivered { subscribers: usize },
}

// ── TransportStats ───────────────────────────────────────────────────

/// Running counters for one client. Never reset while the client lives.
#[derive(Debug, Default)]
pub struct TransportStats {
    delivered: AtomicU64,
    decode_failures: AtomicU64,
    ignored_topics: AtomicU64,
    reconnects: AtomicU64,
    queued: AtomicU64,
    published: AtomicU64,
}

/// Point-in-time copy of [`TransportStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub delivered: u64,
    pub decode_failures: u64,
    pub ignored_topics: u64,
    pub reconnects: u64,
    /// Publishes accepted into the outbound queue.
    pub queued: u64,
    /// Publishes written to the network.
    pub published: u64,
}

impl TransportStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            delivered: self.delivered.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            ignored_topics: self.ignored_topics.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
            queued: self.queued.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn record_queued(&self) {
        self.queued.fetch_add(1, Ordering::Relaxed);
    }

    /// Queued publishes not yet written to the network.
    pub(crate) fn pending_publishes(&self) -> u64 {
        self.queued
            .load(Ordering::Relaxed)
            .saturating_sub(self.published.load(Ordering::Relaxed))
    }
}

// ── Pipeline ─────────────────────────────────────────────────────────

pub(crate) struct Pipeline {
    namespace: TopicNamespace,
    store: Arc<ReadingStore>,
    subscribers: Arc<SubscriberRegistry>,
    state: Arc<watch::Sender<ConnectionState>>,
    readings: broadcast::Sender<Arc<Reading>>,
    stats: Arc<TransportStats>,
    published: Arc<watch::Sender<u64>>,
}

impl Pipeline {
    pub(crate) fn new(
        namespace: TopicNamespace,
        store: Arc<ReadingStore>,
        subscribers: Arc<SubscriberRegistry>,
        state: Arc<watch::Sender<ConnectionState>>,
        readings: broadcast::Sender<Arc<Reading>>,
        stats: Arc<TransportStats>,
        published: Arc<watch::Sender<u64>>,
    ) -> Self {
        Self {
            namespace,
            store,
            subscribers,
            state,
            readings,
            stats,
            published,
        }
    }

    /// Process one inbound message.
    pub(crate) fn handle_message(&self, topic: &str, payload: &[u8]) -> Delivery {
        if !self.namespace.is_data_topic(topic) {
            tracing::trace!(topic, "Ignoring message outside telemetry namespace");
            self.stats.ignored_topics.fetch_add(1, Ordering::Relaxed);
            return Delivery::Ignored;
        }

        let reading = match decode(payload) {
            Ok(reading) => reading,
            Err(e) => {
                tracing::warn!(topic, error = %e, "Dropping malformed telemetry");
                self.stats.decode_failures.fetch_add(1, Ordering::Relaxed);
                return Delivery::Dropped;
            }
        };

        if let Some(from_topic) = self.namespace.sensor_id_from_topic(topic) {
            if from_topic != reading.sensor_id {
                tracing::debug!(
                    topic,
                    sensor_id = %reading.sensor_id,
                    "Topic suffix differs from payload sensor_id; using payload"
                );
            }
        }

        let is_new = self.store.upsert(reading.clone());
        if is_new {
            tracing::debug!(sensor_id = %reading.sensor_id, "New sensor");
        }

        let subscribers = self.subscribers.dispatch(&reading);
        // Err only means no async receivers are listening.
        let _ = self.readings.send(Arc::new(reading));
        self.stats.delivered.fetch_add(1, Ordering::Relaxed);

        Delivery::Delivered { subscribers }
    }

    fn set_state(&self, next: ConnectionState) {
        self.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            tracing::debug!(from = ?*current, to = ?next, "Connection state changed");
            *current = next;
            true
        });
    }
}

fn decode(payload: &[u8]) -> Result<Reading, CoreError> {
    let payload = TelemetryPayload::decode(payload)?;
    Reading::from_payload(payload)
}

impl TransportSink for Pipeline {
    fn on_link_state(&self, state: LinkState) {
        let next = match state {
            LinkState::Connecting { attempt } => {
                if attempt > 0 {
                    self.stats.reconnects.fetch_add(1, Ordering::Relaxed);
                }
                ConnectionState::Connecting
            }
            LinkState::Up => ConnectionState::Connected,
            LinkState::Down => ConnectionState::Disconnected,
        };
        self.set_state(next);
    }

    fn on_message(&self, topic: &str, payload: &[u8]) {
        self.handle_message(topic, payload);
    }

    fn on_published(&self) {
        let total = self.stats.published.fetch_add(1, Ordering::Relaxed) + 1;
        self.published.send_replace(total);
    }
}
