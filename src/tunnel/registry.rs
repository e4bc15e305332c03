//! Session Registry
//!
//! Holds the at-most-one active tunnel session. A host reconnect overwrites
//! the previous session rather than being rejected.

use std::sync::Mutex;

use anyhow::anyhow;
use tokio_yamux::stream::StreamHandle;

use super::TunnelSession;

/// Relay-side holder of the single active tunnel session.
#[derive(Default)]
pub struct SessionRegistry {
    current: Mutex<Option<TunnelSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a session as the active tunnel, closing any previous one
    /// first. Player copies still bridged over the old session fail as their
    /// I/O errors out; bytes in flight at the overwrite moment are dropped in
    /// favor of making the new host available immediately.
    ///
    /// Returns `true` when an existing session was overwritten.
    pub fn install(&self, session: TunnelSession) -> bool {
        let mut current = self.current.lock().unwrap();
        let overwrote = match current.take() {
            Some(previous) => {
                previous.close();
                true
            }
            None => false,
        };
        *current = Some(session);
        overwrote
    }

    /// Snapshot of the active session. The handle may race a concurrent
    /// `install`; opening a stream on a stale handle simply fails.
    pub fn current(&self) -> Option<TunnelSession> {
        self.current.lock().unwrap().clone()
    }

    /// Whether a live tunnel is installed.
    pub fn is_connected(&self) -> bool {
        self.current
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|session| !session.is_closed())
    }

    /// Open a stream on the active session.
    pub async fn open(&self) -> crate::Result<StreamHandle> {
        let session = self.current().ok_or_else(|| anyhow!("no active tunnel"))?;
        session.open_stream().await
    }
}
