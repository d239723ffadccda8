//! Broadcaster: topic fan-out to per-connection outboxes
//!
//! Fire-and-forget: publishing never blocks, never fails. A topic with no
//! subscribers costs one map lookup. Each event is encoded once per publish and
//! the same `Arc<EncodedMessage>` is handed to every subscriber.

use super::connection::{Connection, Offer};
use super::encoder::encode;
use super::metrics::HubMetrics;
use super::registry::TopicRegistry;
use super::topic::Topic;
use super::types::DomainEvent;
use std::sync::Arc;
use tracing::{debug, info};

/// Default per-connection outbox capacity
pub const DEFAULT_OUTBOX_CAPACITY: usize = 256;

/// Outcome of one `publish` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Live subscribers resolved for the topic
    pub recipients: usize,
    /// Subscribers the message was enqueued for
    pub queued: usize,
    /// Of those, how many had to drop an older message first
    pub dropped: usize,
    /// Subscribers that closed between lookup and delivery
    pub closed: usize,
}

pub struct Broadcaster {
    registry: TopicRegistry,
    metrics: HubMetrics,
    outbox_capacity: usize,
}

impl Broadcaster {
    pub fn new(outbox_capacity: usize) -> Self {
        Self {
            registry: TopicRegistry::new(),
            metrics: HubMetrics::new(),
            outbox_capacity: outbox_capacity.max(1),
        }
    }

    pub fn registry(&self) -> &TopicRegistry {
        &self.registry
    }

    pub fn metrics(&self) -> &HubMetrics {
        &self.metrics
    }

    pub fn outbox_capacity(&self) -> usize {
        self.outbox_capacity
    }

    /// Open a new client session
    pub fn connect(&self) -> Arc<Connection> {
        let connection = Connection::new(self.outbox_capacity);
        self.metrics.connection_opened();
        debug!(
            connection_id = %connection.id(),
            active = self.metrics.active_connections(),
            "Connection registered"
        );
        connection
    }

    /// Close a session and remove it from every topic
    ///
    /// Safe to call more than once; only the first call has an effect.
    pub fn disconnect(&self, connection: &Connection) {
        if !connection.close() {
            return;
        }
        let left = self.registry.unsubscribe_all(connection.id());
        self.metrics.connection_closed();

        let stats = connection.stats();
        info!(
            connection_id = %connection.id(),
            topics = left.len(),
            sent = stats.sent,
            dropped = stats.dropped,
            transport_failures = stats.transport_failures,
            active = self.metrics.active_connections(),
            "Connection closed"
        );
    }

    pub fn subscribe(&self, topic: Topic, connection: &Arc<Connection>) -> bool {
        let added = self.registry.subscribe(topic.clone(), connection);
        debug!(
            connection_id = %connection.id(),
            topic = %topic,
            added,
            "Subscribe"
        );
        added
    }

    pub fn unsubscribe(&self, topic: &Topic, connection: &Connection) -> bool {
        let removed = self.registry.unsubscribe(topic, connection.id());
        debug!(
            connection_id = %connection.id(),
            topic = %topic,
            removed,
            "Unsubscribe"
        );
        removed
    }

    /// Deliver `event` to every current subscriber of `topic`
    pub fn publish(&self, topic: &Topic, event: &DomainEvent) -> PublishReport {
        self.metrics.event_published();

        let subscribers = self.registry.subscribers_of(topic);
        if subscribers.is_empty() {
            return PublishReport::default();
        }

        let message = Arc::new(encode(event));
        let mut report = PublishReport {
            recipients: subscribers.len(),
            ..Default::default()
        };

        for connection in &subscribers {
            match connection.offer(message.clone()) {
                Offer::Queued => report.queued += 1,
                Offer::DroppedOldest => {
                    report.queued += 1;
                    report.dropped += 1;
                    debug!(
                        connection_id = %connection.id(),
                        topic = %topic,
                        dropped_total = connection.dropped_count(),
                        "Outbox full, dropped oldest message"
                    );
                }
                Offer::Closed => report.closed += 1,
            }
        }

        self.metrics
            .record_fanout(report.queued, report.dropped, report.closed);
        debug!(
            topic = %topic,
            family = topic.family(),
            event = message.event,
            recipients = report.recipients,
            dropped = report.dropped,
            "Event published"
        );
        report
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_OUTBOX_CAPACITY)
    }
}
