//! Topic registry: who is subscribed to what
//!
//! Two indices are kept in `DashMap`s so unrelated topics never contend on a
//! single lock:
//! - `topics`: topic → subscribers (weak handles, the transport owns connections)
//! - `memberships`: connection → topics, so `unsubscribe_all` touches only the
//!   topics a connection actually joined
//!
//! `subscribe` writes the topic index before the membership index, then checks
//! the connection's closed flag again. `close` happens before `unsubscribe_all`,
//! and both indices are updated under the same shard locks, so a subscribe
//! racing a disconnect either has its membership removed by `unsubscribe_all`
//! or sees the connection closed and rolls itself back.

use super::connection::{Connection, ConnectionId};
use super::topic::Topic;
use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};

#[derive(Default)]
pub struct TopicRegistry {
    topics: DashMap<Topic, HashMap<ConnectionId, Weak<Connection>>>,
    memberships: DashMap<ConnectionId, HashSet<Topic>>,
}

impl TopicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `connection` to `topic`
    ///
    /// Idempotent. Returns `true` if the connection was not subscribed yet.
    /// Closed connections are never added.
    pub fn subscribe(&self, topic: Topic, connection: &Arc<Connection>) -> bool {
        if connection.is_closed() {
            return false;
        }
        let id = connection.id();
        let added = self
            .topics
            .entry(topic.clone())
            .or_default()
            .insert(id, Arc::downgrade(connection))
            .is_none();
        self.memberships.entry(id).or_default().insert(topic.clone());

        // Closed while we were inserting; unsubscribe_all may have missed us
        if connection.is_closed() {
            self.unsubscribe(&topic, id);
            return false;
        }
        added
    }

    /// Remove a connection from one topic. No-op if it was not subscribed.
    pub fn unsubscribe(&self, topic: &Topic, id: ConnectionId) -> bool {
        let removed = match self.topics.get_mut(topic) {
            Some(mut subscribers) => subscribers.remove(&id).is_some(),
            None => false,
        };
        self.topics.remove_if(topic, |_, subscribers| subscribers.is_empty());

        if let Some(mut joined) = self.memberships.get_mut(&id) {
            joined.remove(topic);
        }
        self.memberships.remove_if(&id, |_, joined| joined.is_empty());

        removed
    }

    /// Remove a connection from every topic it joined
    ///
    /// Returns the topics it was removed from.
    pub fn unsubscribe_all(&self, id: ConnectionId) -> Vec<Topic> {
        let joined = self
            .memberships
            .remove(&id)
            .map(|(_, joined)| joined)
            .unwrap_or_default();

        for topic in &joined {
            if let Some(mut subscribers) = self.topics.get_mut(topic) {
                subscribers.remove(&id);
            }
            self.topics.remove_if(topic, |_, subscribers| subscribers.is_empty());
        }

        joined.into_iter().collect()
    }

    /// Point-in-time snapshot of the live subscribers of `topic`
    pub fn subscribers_of(&self, topic: &Topic) -> Vec<Arc<Connection>> {
        self.topics
            .get(topic)
            .map(|subscribers| {
                subscribers
                    .values()
                    .filter_map(Weak::upgrade)
                    .filter(|connection| !connection.is_closed())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Topics a connection is currently subscribed to
    pub fn topics_of(&self, id: ConnectionId) -> Vec<Topic> {
        self.memberships
            .get(&id)
            .map(|joined| joined.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_subscribed(&self, topic: &Topic, id: ConnectionId) -> bool {
        self.topics
            .get(topic)
            .is_some_and(|subscribers| subscribers.contains_key(&id))
    }

    /// Number of topics with at least one subscriber
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    /// Number of live, open subscribers of `topic`
    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        self.topics.get(topic).map_or(0, |subscribers| {
            subscribers
                .values()
                .filter_map(Weak::upgrade)
                .filter(|connection| !connection.is_closed())
                .count()
        })
    }
}
