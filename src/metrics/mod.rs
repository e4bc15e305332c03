//! Traffic Counters
//!
//! Process-wide counters surfaced by `GET /status`. Writers are the per-player
//! copy tasks and the Bedrock session tasks; readers are the status handlers.

use std::sync::atomic::{AtomicI64, Ordering};

/// Player and traffic counters shared by every forwarding task.
#[derive(Debug, Default)]
pub struct Metrics {
    active_players: AtomicI64,
    bytes_transferred: AtomicI64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn player_connected(&self) {
        self.active_players.fetch_add(1, Ordering::Relaxed);
    }

    pub fn player_disconnected(&self) {
        self.active_players.fetch_sub(1, Ordering::Relaxed);
    }

    /// Credit forwarded traffic; for Bedrock this includes the 2-byte frame
    /// overhead, counted once per datagram per direction.
    pub fn add_bytes(&self, bytes: u64) {
        self.bytes_transferred
            .fetch_add(bytes as i64, Ordering::Relaxed);
    }

    pub fn active_players(&self) -> i64 {
        self.active_players.load(Ordering::Relaxed)
    }

    pub fn bytes_transferred(&self) -> i64 {
        self.bytes_transferred.load(Ordering::Relaxed)
    }
}
