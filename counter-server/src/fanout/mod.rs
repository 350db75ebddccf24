//! Event Fan-out
//!
//! Topic-indexed delivery of live events to WebSocket connections. Each
//! connection owns one bounded queue; [`FanoutHub::publish`] pushes a
//! frame to every connection subscribed to at least one of the event's
//! topics, once per connection. Delivery is best-effort and at-most-once:
//! a full queue drops the frame for that connection and the publisher
//! never blocks or fails because of a stalled consumer. Consumers refetch
//! authoritative state over REST after a reconnect.
//!
//! A small ring of recent notifications is kept for on-demand replay.

pub mod ws;

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use parking_lot::Mutex;
use shared::message::{EventFrame, Topic};
use shared::models::Notification;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::auth::Claims;
use crate::utils::{AppError, AppResult};

/// One registered connection
struct Subscriber {
    tx: mpsc::Sender<EventFrame>,
    claims: Claims,
    topics: HashSet<Topic>,
}

/// Topic-indexed subscriber registry
pub struct FanoutHub {
    /// Per-connection bounded queue capacity
    queue_capacity: usize,
    connections: DashMap<Uuid, Subscriber>,
    /// Topic -> subscribed connection ids; avoids an all-connections scan
    /// per event
    topics: DashMap<Topic, HashSet<Uuid>>,
    recent: Mutex<VecDeque<Notification>>,
    recent_capacity: usize,
    dropped: AtomicU64,
}

impl FanoutHub {
    pub fn new(queue_capacity: usize, recent_capacity: usize) -> Self {
        Self {
            queue_capacity: queue_capacity.max(1),
            connections: DashMap::new(),
            topics: DashMap::new(),
            recent: Mutex::new(VecDeque::with_capacity(recent_capacity)),
            recent_capacity: recent_capacity.max(1),
            dropped: AtomicU64::new(0),
        }
    }

    /// Register a connection, returning its id and the queue to drain
    pub fn register(&self, claims: Claims) -> (Uuid, mpsc::Receiver<EventFrame>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        self.connections.insert(
            id,
            Subscriber {
                tx,
                claims,
                topics: HashSet::new(),
            },
        );
        tracing::debug!(connection = %id, total = self.connections.len(), "connection registered");
        (id, rx)
    }

    /// Drop a connection and clear it from every topic index
    pub fn unregister(&self, id: Uuid) {
        if let Some((_, subscriber)) = self.connections.remove(&id) {
            for topic in subscriber.topics {
                if let Some(mut set) = self.topics.get_mut(&topic) {
                    set.remove(&id);
                }
            }
        }
        tracing::debug!(connection = %id, total = self.connections.len(), "connection removed");
    }

    /// Subscribe a connection to topics
    ///
    /// The admin topic is restricted to manager/admin roles; one rejected
    /// topic fails the whole frame and none of its topics are applied.
    pub fn subscribe(&self, id: Uuid, topics: &[Topic]) -> AppResult<()> {
        let mut subscriber = self
            .connections
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("connection {id} not registered")))?;

        for topic in topics {
            if *topic == Topic::Admin && !subscriber.claims.can_subscribe_admin() {
                return Err(AppError::Forbidden(format!(
                    "role {} may not subscribe to the admin topic",
                    subscriber.claims.role
                )));
            }
        }

        for topic in topics {
            subscriber.topics.insert(topic.clone());
            self.topics.entry(topic.clone()).or_default().insert(id);
        }
        Ok(())
    }

    /// Unsubscribe a connection from topics; unknown topics are a no-op
    pub fn unsubscribe(&self, id: Uuid, topics: &[Topic]) -> AppResult<()> {
        let mut subscriber = self
            .connections
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("connection {id} not registered")))?;

        for topic in topics {
            subscriber.topics.remove(topic);
            if let Some(mut set) = self.topics.get_mut(topic) {
                set.remove(&id);
            }
        }
        Ok(())
    }

    /// Deliver a frame to every connection subscribed to any of `topics`
    ///
    /// Connections subscribed to several of the topics still receive one
    /// copy. A full queue drops the frame for that connection only.
    pub fn publish(&self, topics: &[Topic], frame: EventFrame) {
        let mut targets: HashSet<Uuid> = HashSet::new();
        for topic in topics {
            if let Some(set) = self.topics.get(topic) {
                targets.extend(set.iter().copied());
            }
        }

        for id in targets {
            let Some(subscriber) = self.connections.get(&id) else {
                continue;
            };
            match subscriber.tx.try_send(frame.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(connection = %id, kind = %frame.event_type, "queue full, frame dropped");
                }
                // Receiver gone; the session task unregisters on exit
                Err(mpsc::error::TrySendError::Closed(_)) => {}
            }
        }
    }

    /// Record a notification in the replay ring, oldest evicted first
    pub fn push_notification(&self, notification: Notification) {
        let mut recent = self.recent.lock();
        if recent.len() == self.recent_capacity {
            recent.pop_front();
        }
        recent.push_back(notification);
    }

    /// Recent notifications, oldest first
    pub fn recent_notifications(&self) -> Vec<Notification> {
        self.recent.lock().iter().cloned().collect()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Frames dropped on full queues since startup
    pub fn dropped_frames(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    fn topic_members(&self, topic: &Topic) -> usize {
        self.topics.get(topic).map(|set| set.len()).unwrap_or(0)
    }
}
