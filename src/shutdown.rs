//! Graceful Shutdown Handling
//!
//! SIGTERM/SIGINT wiring shared by the relay and host binaries. Tasks
//! subscribe to a broadcast channel and unwind when the signal lands.

use tokio::signal;
use tokio::sync::broadcast;
use tracing::info;

use crate::Result;

/// Broadcasts a shutdown signal to every subscribed task.
pub struct ShutdownCoordinator {
    shutdown_tx: broadcast::Sender<()>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self { shutdown_tx }
    }

    /// Get a receiver for components to listen for the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Trigger shutdown without an OS signal (tests and embedders).
    pub fn trigger(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Wait for SIGTERM/SIGINT, then broadcast the shutdown signal.
    pub async fn listen_for_signals(&self) -> Result<()> {
        #[cfg(unix)]
        {
            let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, initiating graceful shutdown");
                }
                _ = signal::ctrl_c() => {
                    info!("Received Ctrl+C, initiating graceful shutdown");
                }
            }
        }

        #[cfg(windows)]
        {
            signal::ctrl_c().await?;
            info!("Received Ctrl+C, initiating graceful shutdown");
        }

        self.trigger();
        Ok(())
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
