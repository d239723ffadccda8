//! Real-time event distribution for WebSocket clients
//!
//! This module provides:
//! - `Topic`: typed topic names (`order:<id>`, `table:<id>`, `table:*`, `kitchen`, ...)
//! - `DomainEvent`: the fixed set of order, table, kitchen, payment and stock events
//! - `encode`: DomainEvent → wire message (event name + ordered args)
//! - `TopicRegistry`: concurrent topic ↔ connection membership
//! - `Broadcaster`: fan-out into bounded, drop-oldest per-connection outboxes
//! - `RealtimeNotifier`: the facade order/payment/inventory services call
//! - `HttpNotifier`: the same facade for services in another process

mod broadcaster;
mod connection;
mod encoder;
mod http;
mod metrics;
mod notifier;
mod registry;
mod topic;
mod types;

pub use broadcaster::{Broadcaster, PublishReport, DEFAULT_OUTBOX_CAPACITY};
pub use connection::{
    Connection, ConnectionId, ConnectionStats, MessageSink, Offer, TransportError,
};
pub use encoder::{encode, EncodedMessage};
pub use http::{HttpNotifier, INTERNAL_EVENTS_PATH};
pub use metrics::{HubMetrics, HubMetricsSnapshot};
pub use notifier::{topics_for, RealtimeNotifier};
pub use registry::TopicRegistry;
pub use topic::{EntityId, Topic, TopicParseError};
pub use types::{
    DomainEvent, OrderItemStatus, OrderItemUpdate, OrderStatus, PaymentMethod, TableStatus,
};
