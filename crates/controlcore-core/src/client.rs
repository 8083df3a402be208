// ── Client ──
//
// Lifecycle of one bus connection. Owns the MQTT session task, the reading
// store and the subscriber registry, and routes commands back onto the bus.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use serde::Serialize;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use controlcore_api::{BrokerEndpoint, MqttHandle, ReconnectConfig, TopicNamespace};

use crate::command::{ActionKind, CommandBuilder, CommandParams};
use crate::config::ClientConfig;
use crate::dispatch::{Delivery, Pipeline, READING_CHANNEL_CAPACITY, TransportStats};
use crate::error::CoreError;
use crate::model::{Command, Reading};
use crate::store::ReadingStore;
use crate::subscribers::{SubscriberRegistry, Subscription};

// ── ConnectionState ──────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

// ── Client ───────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ClientInner>`; every clone drives the same
/// connection. Created disconnected: call [`connect()`](Self::connect) to
/// start the background session.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    client_id: String,
    store: Arc<ReadingStore>,
    subscribers: Arc<SubscriberRegistry>,
    connection_state: Arc<watch::Sender<ConnectionState>>,
    reading_tx: broadcast::Sender<Arc<Reading>>,
    stats: Arc<TransportStats>,
    published: Arc<watch::Sender<u64>>,
    pipeline: Arc<Pipeline>,
    commands: CommandBuilder,
    outbound: ArcSwapOption<MqttHandle>,
    session: Mutex<Option<Session>>,
}

struct Session {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Client {
    /// Create a client from configuration. Does NOT connect.
    pub fn new(config: ClientConfig) -> Self {
        let namespace = config.namespace();
        let client_id = format!(
            "{}-{}",
            config.client_id_prefix,
            uuid::Uuid::new_v4().simple()
        );

        let store = Arc::new(ReadingStore::new());
        let subscribers = Arc::new(SubscriberRegistry::default());
        let (connection_state, _) = watch::channel(ConnectionState::Disconnected);
        let connection_state = Arc::new(connection_state);
        let (reading_tx, _) = broadcast::channel(READING_CHANNEL_CAPACITY);
        let stats = Arc::new(TransportStats::default());
        let (published, _) = watch::channel(0);
        let published = Arc::new(published);

        let pipeline = Arc::new(Pipeline::new(
            namespace.clone(),
            Arc::clone(&store),
            Arc::clone(&subscribers),
            Arc::clone(&connection_state),
            reading_tx.clone(),
            Arc::clone(&stats),
            Arc::clone(&published),
        ));
        let commands = CommandBuilder::new(namespace, client_id.clone());

        Self {
            inner: Arc::new(ClientInner {
                config,
                client_id,
                store,
                subscribers,
                connection_state,
                reading_tx,
                stats,
                published,
                pipeline,
                commands,
                outbound: ArcSwapOption::empty(),
                session: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn namespace(&self) -> TopicNamespace {
        self.inner.config.namespace()
    }

    /// MQTT client id, also stamped on commands as `requestor_id`.
    pub fn requestor_id(&self) -> &str {
        &self.inner.client_id
    }

    pub fn store(&self) -> &Arc<ReadingStore> {
        &self.inner.store
    }

    pub fn command_builder(&self) -> &CommandBuilder {
        &self.inner.commands
    }

    pub fn stats(&self) -> &TransportStats {
        &self.inner.stats
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Start the background session.
    ///
    /// Returns once the session task is running, not once the broker has
    /// answered; watch [`connection_state()`](Self::connection_state) or
    /// use [`wait_until_connected()`](Self::wait_until_connected). Calling it
    /// while a session is running is a no-op. Fails only on an unusable
    /// broker URL.
    pub async fn connect(&self) -> Result<(), CoreError> {
        let mut session = self.inner.session.lock().await;
        if session.as_ref().is_some_and(|s| !s.task.is_finished()) {
            debug!("connect called with a session already running");
            return Ok(());
        }

        let config = &self.inner.config;
        let endpoint = BrokerEndpoint::parse(&config.broker)?;
        let options = endpoint.mqtt_options(&self.inner.client_id, config.keep_alive);
        let reconnect = ReconnectConfig {
            interval: config.reconnect_interval,
        };
        let cancel = CancellationToken::new();

        info!(
            broker = %endpoint,
            client_id = %self.inner.client_id,
            "Starting MQTT session"
        );

        let (handle, task) = MqttHandle::spawn(
            options,
            config.namespace().data_filter(),
            Arc::clone(&self.inner.pipeline) as Arc<dyn controlcore_api::TransportSink>,
            reconnect,
            cancel.clone(),
        );
        self.inner.outbound.store(Some(Arc::new(handle)));
        *session = Some(Session { cancel, task });

        Ok(())
    }

    /// Stop the session and wait for its task to exit.
    ///
    /// Queued publishes that have not been written are discarded; call
    /// [`flush()`](Self::flush) first to avoid that.
    pub async fn shutdown(&self) {
        let session = self.inner.session.lock().await.take();
        self.inner.outbound.store(None);

        if let Some(Session { cancel, task }) = session {
            cancel.cancel();
            if let Err(e) = task.await {
                warn!(error = %e, "MQTT session task ended abnormally");
            }
        }

        self.inner
            .connection_state
            .send_replace(ConnectionState::Disconnected);
        debug!("client shut down");
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.inner.connection_state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state().is_connected()
    }

    /// Subscribe to connection state changes.
    pub fn watch_connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection_state.subscribe()
    }

    /// Wait until the broker has accepted the session.
    pub async fn wait_until_connected(&self, timeout: Duration) -> Result<(), CoreError> {
        let mut rx = self.watch_connection_state();
        match tokio::time::timeout(timeout, rx.wait_for(|s| s.is_connected())).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(_)) => Err(CoreError::Disconnected),
            Err(_) => Err(CoreError::Timeout {
                timeout_secs: timeout.as_secs(),
                waiting_for: format!("connection to {}", self.inner.config.broker),
            }),
        }
    }

    // ── Inbound ──────────────────────────────────────────────────

    /// Register a callback invoked for every delivered reading, in
    /// registration order, on the session task.
    ///
    /// Callbacks must return quickly; for async work use
    /// [`readings()`](Self::readings) instead. Safe to call while
    /// disconnected.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Reading) + Send + Sync + 'static,
    {
        let id = self.inner.subscribers.register(Arc::new(callback));
        Subscription::new(id, &self.inner.subscribers)
    }

    /// Receiver of every delivered reading, for consumers that must not
    /// block the delivery path.
    pub fn readings(&self) -> broadcast::Receiver<Arc<Reading>> {
        self.inner.reading_tx.subscribe()
    }

    /// Feed one message through the inbound path as if it had arrived on
    /// `topic`. Used for replaying captured traffic.
    pub fn handle_message(&self, topic: &str, payload: &[u8]) -> Delivery {
        self.inner.pipeline.handle_message(topic, payload)
    }

    /// Wait until a reading for `sensor_id` is in the store.
    pub async fn wait_for_reading(
        &self,
        sensor_id: &str,
        timeout: Duration,
    ) -> Result<Arc<Reading>, CoreError> {
        let mut stream = self.inner.store.subscribe();

        let wait = async {
            loop {
                if let Some(reading) = self.inner.store.get(sensor_id) {
                    return Some(reading);
                }
                stream.changed().await?;
            }
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(Some(reading)) => Ok(reading),
            Ok(None) | Err(_) => Err(CoreError::SensorNotFound {
                sensor_id: sensor_id.to_owned(),
            }),
        }
    }

    // ── Outbound ─────────────────────────────────────────────────

    /// Queue a publish. Never blocks and never fails: while not connected,
    /// or when the outbound queue is full, the message is dropped with a
    /// log line.
    pub fn publish(&self, topic: &str, payload: impl Into<Vec<u8>>) {
        match self.enqueue(topic, payload.into()) {
            Ok(()) => {}
            Err(CoreError::Disconnected) => debug!(topic, "Not connected; dropping publish"),
            Err(e) => warn!(topic, error = %e, "Publish dropped"),
        }
    }

    /// Build a command for `reading` and publish it to the sensor's command topic.
    ///
    /// Validation errors are returned before anything is sent. Unlike
    /// [`publish()`](Self::publish) this reports a dropped message, as
    /// [`CoreError::Disconnected`] or [`CoreError::PublishFailed`], so
    /// operators learn the command went nowhere.
    pub fn send_command(
        &self,
        reading: &Reading,
        action: ActionKind,
        params: &CommandParams,
    ) -> Result<Command, CoreError> {
        let command = self.inner.commands.build(reading, action, params)?;
        let (topic, body) = self.inner.commands.encode(&command)?;

        info!(
            sensor_id = %command.sensor_id,
            action = %command.action,
            topic = %topic,
            "Sending command"
        );
        self.enqueue(&topic, body)?;
        Ok(command)
    }

    /// Hand `payload` to the session's outbound queue.
    fn enqueue(&self, topic: &str, payload: Vec<u8>) -> Result<(), CoreError> {
        if !self.is_connected() {
            return Err(CoreError::Disconnected);
        }
        let handle = self
            .inner
            .outbound
            .load_full()
            .ok_or(CoreError::Disconnected)?;

        handle
            .publish(topic, payload)
            .map_err(|e| CoreError::PublishFailed {
                topic: topic.to_owned(),
                reason: e.to_string(),
            })?;
        self.inner.stats.record_queued();
        Ok(())
    }

    /// Wait until every queued publish has been written to the network.
    pub async fn flush(&self, timeout: Duration) -> Result<(), CoreError> {
        let stats = Arc::clone(&self.inner.stats);
        let mut rx = self.inner.published.subscribe();

        let drained = tokio::time::timeout(timeout, async move {
            while stats.pending_publishes() > 0 {
                if rx.changed().await.is_err() {
                    break;
                }
            }
        })
        .await;

        drained.map_err(|_| CoreError::Timeout {
            timeout_secs: timeout.as_secs(),
            waiting_for: "outbound publishes to flush".into(),
        })
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("broker", &self.inner.config.broker)
            .field("client_id", &self.inner.client_id)
            .field("state", &self.connection_state())
            .finish_non_exhaustive()
    }
}
