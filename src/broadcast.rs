//! Log Broadcast
//!
//! In-process pub/sub fan-out of log lines. The relay publishes every
//! operator-visible state change here and the status API replays them to SSE
//! clients. Sends never block: a subscriber that stops draining loses
//! messages, not the producer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Buffered capacity of each subscriber channel. Broadcasts beyond a full
/// buffer are dropped for that subscriber only.
pub const SUBSCRIBER_BUFFER: usize = 100;

/// Fan-out of log lines to any number of subscribers.
#[derive(Clone, Default)]
pub struct LogBroadcaster {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    subscribers: Mutex<HashMap<u64, mpsc::Sender<String>>>,
    next_id: AtomicU64,
}

impl LogBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber. The subscription unsubscribes itself when
    /// dropped, so an SSE client disconnect cleans up automatically.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.subscribers.lock().unwrap().insert(id, tx);
        Subscription {
            id,
            rx,
            inner: Arc::clone(&self.inner),
        }
    }

    /// Deliver a message to every current subscriber without blocking.
    /// Subscribers with a full buffer miss this message; subscribers that
    /// went away are pruned.
    pub fn broadcast(&self, msg: &str) {
        let mut subscribers = self.inner.subscribers.lock().unwrap();
        let mut dead = Vec::new();
        for (id, tx) in subscribers.iter() {
            match tx.try_send(msg.to_string()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {}
                Err(TrySendError::Closed(_)) => dead.push(*id),
            }
        }
        for id in dead {
            subscribers.remove(&id);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().unwrap().len()
    }
}

impl Inner {
    fn unsubscribe(&self, id: u64) {
        // dropping the sender closes the channel; removal happens at most once
        self.subscribers.lock().unwrap().remove(&id);
    }
}

/// Handle to a live log subscription. Receives every line broadcast after
/// `subscribe`, minus any dropped while the buffer was full.
pub struct Subscription {
    id: u64,
    rx: mpsc::Receiver<String>,
    inner: Arc<Inner>,
}

impl Subscription {
    /// Receive the next log line; `None` once unsubscribed and drained.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    pub fn poll_recv(&mut self, cx: &mut Context<'_>) -> Poll<Option<String>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.inner.unsubscribe(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[tokio::test]
    async fn test_broadcast_fanout() {
        let broadcaster = LogBroadcaster::new();
        let mut a = broadcaster.subscribe();
        let mut b = broadcaster.subscribe();

        broadcaster.broadcast("hello");

        assert_eq!(a.recv().await, Some("hello".to_string()));
        assert_eq!(b.recv().await, Some("hello".to_string()));
    }

    #[tokio::test]
    async fn test_messages_before_subscribe_are_not_replayed() {
        let broadcaster = LogBroadcaster::new();
        broadcaster.broadcast("early");

        let mut sub = broadcaster.subscribe();
        broadcaster.broadcast("late");

        assert_eq!(sub.recv().await, Some("late".to_string()));
    }

    #[tokio::test]
    async fn test_full_buffer_drops_for_that_subscriber_only() {
        let broadcaster = LogBroadcaster::new();
        let mut slow = broadcaster.subscribe();
        let mut fast = broadcaster.subscribe();

        for i in 0..SUBSCRIBER_BUFFER + 5 {
            broadcaster.broadcast(&format!("msg-{i}"));
            // keep the fast subscriber drained
            assert_eq!(fast.recv().await, Some(format!("msg-{i}")));
        }

        // the slow subscriber got exactly the first SUBSCRIBER_BUFFER messages
        for i in 0..SUBSCRIBER_BUFFER {
            assert_eq!(slow.recv().await, Some(format!("msg-{i}")));
        }
        broadcaster.broadcast("after");
        assert_eq!(slow.recv().await, Some("after".to_string()));
    }

    #[tokio::test]
    async fn test_broadcast_is_nonblocking_with_stalled_subscriber() {
        let broadcaster = LogBroadcaster::new();
        let _stalled = broadcaster.subscribe();

        let start = Instant::now();
        for i in 0..1000 {
            broadcaster.broadcast(&format!("msg-{i}"));
        }
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_dropped_subscription_is_pruned() {
        let broadcaster = LogBroadcaster::new();
        let sub = broadcaster.subscribe();
        assert_eq!(broadcaster.subscriber_count(), 1);

        drop(sub);
        assert_eq!(broadcaster.subscriber_count(), 0);

        // broadcasting after the subscriber went away must not panic
        broadcaster.broadcast("orphan");
    }

    #[tokio::test]
    async fn test_unsubscribed_channel_is_closed() {
        let broadcaster = LogBroadcaster::new();
        let mut sub = broadcaster.subscribe();
        broadcaster.broadcast("one");

        broadcaster.inner.unsubscribe(sub.id);

        // buffered message still delivered, then the closed channel ends
        assert_eq!(sub.recv().await, Some("one".to_string()));
        assert_eq!(sub.recv().await, None);
    }
}
