//! Telemetry engine for ControlCore sensor networks.
//!
//! Sits between the MQTT transport (`controlcore-api`) and whatever presents
//! the data (CLI, dashboards):
//!
//! - **[`Client`]**: Explicit, cheaply clonable handle owning one bus
//!   connection. [`connect()`](Client::connect) starts the background event
//!   loop; inbound telemetry is decoded, enriched by the identifier parser,
//!   merged into the [`ReadingStore`], then fanned out to every subscriber.
//!   [`publish()`](Client::publish) and [`send_command()`](Client::send_command)
//!   go the other way.
//!
//! - **[`ReadingStore`]**: Latest reading per `sensor_id` (`DashMap` +
//!   `tokio::sync::watch` snapshots ordered newest first).
//!
//! - **Pure views**: [`group_by_physical`], [`group_by_logical`],
//!   [`is_fresh`] and [`SensorIdentifier::parse`] derive everything a
//!   consumer renders from a snapshot, recomputed on demand.
//!
//! - **[`CommandBuilder`]**: Maps an [`ActionKind`] plus operator
//!   parameters to a [`Command`] and its destination topic.

pub mod clock;
pub mod command;
pub mod config;
pub mod error;
pub mod freshness;
pub mod group;
pub mod identifier;
pub mod model;
pub mod store;
pub mod stream;

mod client;
mod dispatch;
mod subscribers;

// ── Primary re-exports ──────────────────────────────────────────────
pub use client::{Client, ConnectionState};
pub use clock::{Clock, ManualClock, SystemClock};
pub use command::{ActionKind, CommandBuilder, CommandParams, MANUAL_SOURCE};
pub use config::ClientConfig;
pub use dispatch::{Delivery, StatsSnapshot, TransportStats};
pub use error::CoreError;
pub use freshness::{DEFAULT_MAX_AGE_MINUTES, Freshness, is_fresh, is_fresh_at};
pub use group::{LogicalGroups, PhysicalGroups, group_by_logical, group_by_physical};
pub use identifier::SensorIdentifier;
pub use model::{Command, Reading};
pub use store::ReadingStore;
pub use stream::ReadingStream;
pub use subscribers::{Subscription, SubscriptionId};

pub use controlcore_api::TopicNamespace;
