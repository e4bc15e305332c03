//! Relay Dialer
//!
//! Outbound connection loop: dial the relay control port, run a yamux
//! session in client role, and spawn a handler per accepted stream. The loop
//! retries forever with a fixed delay; the relay never retries anything.

use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::{broadcast, watch};
use tokio::time::sleep;
use tokio_stream::StreamExt;
use tokio_yamux::config::Config as YamuxConfig;
use tokio_yamux::session::Session;
use tracing::{info, warn};

use crate::config::HostConfig;

use super::stream;

/// Delay between reconnect attempts.
pub const RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Connection state surfaced to the embedding UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostStatus {
    Connecting,
    Connected,
    Disconnected,
}

/// Host-side state and entry point.
pub struct Host {
    config: HostConfig,
    status_tx: watch::Sender<HostStatus>,
}

impl Host {
    pub fn new(config: HostConfig) -> Self {
        let (status_tx, _) = watch::channel(HostStatus::Connecting);
        Self { config, status_tx }
    }

    /// Watch the connection state transitions.
    pub fn status(&self) -> watch::Receiver<HostStatus> {
        self.status_tx.subscribe()
    }

    /// Dial the relay and serve player streams until shut down.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) -> crate::Result<()> {
        loop {
            self.set_status(HostStatus::Connecting);
            info!("Connecting to relay {}", self.config.relay_addr);

            tokio::select! {
                _ = shutdown.recv() => return Ok(()),
                dialed = TcpStream::connect(&self.config.relay_addr) => match dialed {
                    Ok(conn) => {
                        info!("Connected to relay {}", self.config.relay_addr);
                        self.set_status(HostStatus::Connected);
                        if self.serve_session(conn, &mut shutdown).await {
                            return Ok(());
                        }
                    }
                    Err(e) => warn!("Failed to reach relay {}: {e}", self.config.relay_addr),
                },
            }

            self.set_status(HostStatus::Disconnected);
            info!("Disconnected, retrying in {}s", RETRY_INTERVAL.as_secs());
            tokio::select! {
                _ = shutdown.recv() => return Ok(()),
                _ = sleep(RETRY_INTERVAL) => {}
            }
        }
    }

    /// Accept streams until the session ends. Returns `true` when shutdown
    /// was requested rather than the session dying.
    async fn serve_session(&self, conn: TcpStream, shutdown: &mut broadcast::Receiver<()>) -> bool {
        let mut session = Session::new_client(conn, YamuxConfig::default());
        loop {
            tokio::select! {
                _ = shutdown.recv() => return true,
                inbound = session.next() => match inbound {
                    Some(Ok(player_stream)) => {
                        tokio::spawn(stream::handle(player_stream, self.config.clone()));
                    }
                    Some(Err(e)) => {
                        warn!("Tunnel session error: {e}");
                        return false;
                    }
                    None => {
                        info!("Tunnel session closed by relay");
                        return false;
                    }
                },
            }
        }
    }

    fn set_status(&self, status: HostStatus) {
        self.status_tx.send_replace(status);
    }
}
