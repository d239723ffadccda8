//! Live client sessions and their outbound queues
//!
//! A `Connection` is owned by the transport task that serves it. The broadcaster
//! only offers messages to its outbox; the transport drains the outbox and writes
//! to the wire through a [`MessageSink`].
//!
//! The outbox is bounded. When it is full the oldest queued message is dropped
//! in favour of the new one, so a stalled client always catches up to the
//! current state instead of a backlog.

use super::encoder::EncodedMessage;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Notify;
use uuid::Uuid;

/// Unique identity of one client session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Failure writing to a client at the transport layer
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("send failed: {0}")]
    Send(String),
}

/// Transport capability: write one encoded message to the client
#[async_trait]
pub trait MessageSink: Send {
    async fn deliver(&mut self, message: &EncodedMessage) -> Result<(), TransportError>;
}

/// Result of offering a message to an outbox
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    /// Appended without displacing anything
    Queued,
    /// Appended after dropping the oldest queued message
    DroppedOldest,
    /// The connection is closed, nothing was queued
    Closed,
}

/// Per-connection counters (serializable)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionStats {
    pub id: ConnectionId,
    pub connected_at: DateTime<Utc>,
    pub queued: u64,
    pub dropped: u64,
    pub sent: u64,
    pub transport_failures: u64,
    pub pending: usize,
}

/// One live client session
pub struct Connection {
    id: ConnectionId,
    connected_at: DateTime<Utc>,
    capacity: usize,
    outbox: Mutex<VecDeque<Arc<EncodedMessage>>>,
    ready: Notify,
    closed: AtomicBool,
    queued: AtomicU64,
    dropped: AtomicU64,
    sent: AtomicU64,
    transport_failures: AtomicU64,
}

impl Connection {
    /// Create a connection whose outbox holds at most `capacity` messages (min 1)
    pub fn new(capacity: usize) -> Arc<Self> {
        let capacity = capacity.max(1);
        Arc::new(Self {
            id: ConnectionId::new(),
            connected_at: Utc::now(),
            capacity,
            outbox: Mutex::new(VecDeque::with_capacity(capacity)),
            ready: Notify::new(),
            closed: AtomicBool::new(false),
            queued: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            sent: AtomicU64::new(0),
            transport_failures: AtomicU64::new(0),
        })
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Enqueue a message without blocking
    pub fn offer(&self, message: Arc<EncodedMessage>) -> Offer {
        if self.is_closed() {
            return Offer::Closed;
        }

        let outcome = {
            let mut outbox = self.outbox.lock();
            let outcome = if outbox.len() >= self.capacity {
                outbox.pop_front();
                Offer::DroppedOldest
            } else {
                Offer::Queued
            };
            outbox.push_back(message);
            outcome
        };

        self.queued.fetch_add(1, Ordering::Relaxed);
        if outcome == Offer::DroppedOldest {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        self.ready.notify_one();
        outcome
    }

    /// Take the next queued message, if any
    pub fn try_recv(&self) -> Option<Arc<EncodedMessage>> {
        self.outbox.lock().pop_front()
    }

    /// Wait for the next queued message. Returns `None` once the connection is closed.
    pub async fn recv(&self) -> Option<Arc<EncodedMessage>> {
        loop {
            if self.is_closed() {
                return None;
            }
            if let Some(message) = self.try_recv() {
                return Some(message);
            }
            self.ready.notified().await;
        }
    }

    /// Pop the next message and write it to `sink`
    ///
    /// Returns `Ok(false)` once the connection is closed. A sink failure is
    /// counted here and returned to the transport, which ends the session.
    pub async fn forward_next<S: MessageSink + ?Sized>(
        &self,
        sink: &mut S,
    ) -> Result<bool, TransportError> {
        let Some(message) = self.recv().await else {
            return Ok(false);
        };
        self.deliver_to(sink, &message).await?;
        Ok(true)
    }

    /// Write one already-dequeued message to `sink`, updating counters
    pub async fn deliver_to<S: MessageSink + ?Sized>(
        &self,
        sink: &mut S,
        message: &EncodedMessage,
    ) -> Result<(), TransportError> {
        match sink.deliver(message).await {
            Ok(()) => {
                self.sent.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(e) => {
                self.transport_failures.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    /// Stop accepting messages and wake the transport task
    ///
    /// Returns `true` only for the call that actually closed the connection.
    pub fn close(&self) -> bool {
        let was_open = !self.closed.swap(true, Ordering::AcqRel);
        if was_open {
            self.outbox.lock().clear();
            self.ready.notify_one();
        }
        was_open
    }

    /// Number of messages dropped under backpressure
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Number of messages waiting in the outbox
    pub fn pending(&self) -> usize {
        self.outbox.lock().len()
    }

    pub fn stats(&self) -> ConnectionStats {
        ConnectionStats {
            id: self.id,
            connected_at: self.connected_at,
            queued: self.queued.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            sent: self.sent.load(Ordering::Relaxed),
            transport_failures: self.transport_failures.load(Ordering::Relaxed),
            pending: self.pending(),
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("capacity", &self.capacity)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::events::encoder::encode;
    use crate::events::types::DomainEvent;
    use tokio_test::{assert_pending, assert_ready, task};

    pub(crate) fn cancelled(order_id: i64) -> Arc<EncodedMessage> {
        Arc::new(encode(&DomainEvent::OrderCancelled { order_id }))
    }

    /// Collects frames in memory, optionally failing every write
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub frames: Vec<String>,
        pub fail: bool,
    }

    #[async_trait]
    impl MessageSink for RecordingSink {
        async fn deliver(&mut self, message: &EncodedMessage) -> Result<(), TransportError> {
            if self.fail {
                return Err(TransportError::Send("broken pipe".into()));
            }
            self.frames.push(message.frame().to_string());
            Ok(())
        }
    }

    #[test]
    fn test_ids_are_unique() {
        let a = Connection::new(4);
        let b = Connection::new(4);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_fifo_order() {
        let conn = Connection::new(8);
        for id in 1..=3 {
            assert_eq!(conn.offer(cancelled(id)), Offer::Queued);
        }
        let got: Vec<_> = std::iter::from_fn(|| conn.try_recv())
            .map(|m| m.args[0].as_i64().unwrap())
            .collect();
        assert_eq!(got, vec![1, 2, 3]);
    }

    #[test]
    fn test_full_outbox_drops_oldest() {
        let conn = Connection::new(2);
        assert_eq!(conn.offer(cancelled(1)), Offer::Queued);
        assert_eq!(conn.offer(cancelled(2)), Offer::Queued);
        assert_eq!(conn.offer(cancelled(3)), Offer::DroppedOldest);
        assert_eq!(conn.offer(cancelled(4)), Offer::DroppedOldest);

        assert_eq!(conn.dropped_count(), 2);
        assert_eq!(conn.pending(), 2);
        assert_eq!(conn.try_recv().unwrap().args[0], 3);
        assert_eq!(conn.try_recv().unwrap().args[0], 4);
        assert!(conn.try_recv().is_none());
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let conn = Connection::new(0);
        assert_eq!(conn.capacity(), 1);
        assert_eq!(conn.offer(cancelled(1)), Offer::Queued);
        assert_eq!(conn.offer(cancelled(2)), Offer::DroppedOldest);
        assert_eq!(conn.try_recv().unwrap().args[0], 2);
    }

    #[test]
    fn test_closed_connection_rejects_offers() {
        let conn = Connection::new(4);
        conn.offer(cancelled(1));
        assert!(conn.close());
        assert!(!conn.close());
        assert_eq!(conn.offer(cancelled(2)), Offer::Closed);
        assert_eq!(conn.pending(), 0);
    }

    #[test]
    fn test_recv_wakes_on_offer() {
        let conn = Connection::new(4);
        let mut recv = task::spawn(conn.recv());
        assert_pending!(recv.poll());

        conn.offer(cancelled(5));
        assert!(recv.is_woken());
        let message = assert_ready!(recv.poll()).unwrap();
        assert_eq!(message.args[0], 5);
    }

    #[test]
    fn test_recv_returns_none_after_close() {
        let conn = Connection::new(4);
        let mut recv = task::spawn(conn.recv());
        assert_pending!(recv.poll());

        conn.close();
        assert!(recv.is_woken());
        assert!(assert_ready!(recv.poll()).is_none());
    }

    #[tokio::test]
    async fn test_forward_next_counts_sent() {
        let conn = Connection::new(4);
        let mut sink = RecordingSink::default();
        conn.offer(cancelled(9));

        assert!(conn.forward_next(&mut sink).await.unwrap());
        assert_eq!(sink.frames, vec![r#"{"event":"OrderCancelled","args":[9]}"#]);
        assert_eq!(conn.stats().sent, 1);

        conn.close();
        assert!(!conn.forward_next(&mut sink).await.unwrap());
    }

    #[tokio::test]
    async fn test_forward_next_counts_transport_failure() {
        let conn = Connection::new(4);
        let mut sink = RecordingSink {
            fail: true,
            ..Default::default()
        };
        conn.offer(cancelled(9));

        let err = conn.forward_next(&mut sink).await.unwrap_err();
        assert!(matches!(err, TransportError::Send(_)));
        let stats = conn.stats();
        assert_eq!(stats.sent, 0);
        assert_eq!(stats.transport_failures, 1);
    }
}
