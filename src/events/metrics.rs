//! Hub-level delivery counters

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Aggregate counters across all connections (thread-safe)
#[derive(Debug, Default)]
pub struct HubMetrics {
    events_published: AtomicU64,
    deliveries: AtomicU64,
    messages_dropped: AtomicU64,
    closed_recipients: AtomicU64,
    transport_failures: AtomicU64,
    connections_opened: AtomicU64,
    connections_closed: AtomicU64,
}

impl HubMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event_published(&self) {
        self.events_published.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of one publish fan-out
    pub fn record_fanout(&self, queued: usize, dropped: usize, closed: usize) {
        self.deliveries.fetch_add(queued as u64, Ordering::Relaxed);
        self.messages_dropped
            .fetch_add(dropped as u64, Ordering::Relaxed);
        self.closed_recipients
            .fetch_add(closed as u64, Ordering::Relaxed);
    }

    pub fn transport_failure(&self) {
        self.transport_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_opened(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.connections_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn active_connections(&self) -> u64 {
        let opened = self.connections_opened.load(Ordering::Relaxed);
        let closed = self.connections_closed.load(Ordering::Relaxed);
        opened.saturating_sub(closed)
    }

    /// Get snapshot for API
    pub fn snapshot(&self) -> HubMetricsSnapshot {
        HubMetricsSnapshot {
            events_published: self.events_published.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
            closed_recipients: self.closed_recipients.load(Ordering::Relaxed),
            transport_failures: self.transport_failures.load(Ordering::Relaxed),
            connections_total: self.connections_opened.load(Ordering::Relaxed),
            active_connections: self.active_connections(),
        }
    }
}

/// Metrics snapshot (serializable)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HubMetricsSnapshot {
    pub events_published: u64,
    pub deliveries: u64,
    pub messages_dropped: u64,
    pub closed_recipients: u64,
    pub transport_failures: u64,
    pub connections_total: u64,
    pub active_connections: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let metrics = HubMetrics::new();
        metrics.connection_opened();
        metrics.connection_opened();
        metrics.connection_closed();
        metrics.event_published();
        metrics.record_fanout(3, 1, 2);
        metrics.transport_failure();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.events_published, 1);
        assert_eq!(snapshot.deliveries, 3);
        assert_eq!(snapshot.messages_dropped, 1);
        assert_eq!(snapshot.closed_recipients, 2);
        assert_eq!(snapshot.transport_failures, 1);
        assert_eq!(snapshot.connections_total, 2);
        assert_eq!(snapshot.active_connections, 1);
    }

    #[test]
    fn test_active_connections_never_underflows() {
        let metrics = HubMetrics::new();
        metrics.connection_closed();
        assert_eq!(metrics.active_connections(), 0);
    }
}
