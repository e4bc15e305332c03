//! Tunnel Session Handle
//!
//! Cheap-clone handle to one multiplexed host connection. The yamux session
//! itself lives in a driver task (see `relay::control`); this handle can open
//! streams on it and ask the driver to tear it down.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::Notify;
use tokio_yamux::Control;
use tokio_yamux::stream::StreamHandle;

#[derive(Clone)]
pub struct TunnelSession {
    control: Control,
    remote_addr: SocketAddr,
    closed: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
}

impl TunnelSession {
    pub fn new(control: Control, remote_addr: SocketAddr) -> Self {
        Self {
            control,
            remote_addr,
            closed: Arc::new(AtomicBool::new(false)),
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Address of the host that dialed in.
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Close the session: the driver task drops the yamux session, which
    /// closes the underlying connection and fails every stream on it.
    /// Idempotent; bytes in flight on player streams may be lost.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.shutdown.notify_one();
    }

    /// Open a new stream toward the host. Fails once the session is closed.
    pub async fn open_stream(&self) -> crate::Result<StreamHandle> {
        let mut control = self.control.clone();
        control
            .open_stream()
            .await
            .map_err(|e| anyhow!("failed to open tunnel stream: {e}"))
    }

    /// Set by the driver task when the session ends for any reason.
    pub(crate) fn mark_closed(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub(crate) fn shutdown_signal(&self) -> Arc<Notify> {
        Arc::clone(&self.shutdown)
    }
}
