//! Relay Core
//!
//! The `Relay` value owns all relay-side state: the session registry, the
//! traffic counters, the log broadcaster, and the configuration. `start`
//! binds every configured listener and spawns the accept loops.

mod bedrock;
mod control;
pub mod forward;
mod game;

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use anyhow::Context;
use tokio::net::{TcpListener, UdpSocket};
use tokio::task::JoinHandle;
use tracing::info;

use crate::api;
use crate::api::StatusResponse;
use crate::broadcast::LogBroadcaster;
use crate::config::RelayConfig;
use crate::metrics::Metrics;
use crate::shutdown::ShutdownCoordinator;
use crate::tunnel::SessionRegistry;

/// Addresses actually bound by [`Relay::start`]; these differ from the
/// configuration when a port was configured as 0.
#[derive(Debug, Clone, Copy)]
pub struct RelayAddrs {
    pub control: SocketAddr,
    pub game: SocketAddr,
    pub bedrock: Option<SocketAddr>,
    pub api: SocketAddr,
}

/// The bound addresses plus the spawned accept-loop tasks. After triggering
/// shutdown, await [`RelayTasks::wait`] to let every loop unwind before the
/// process exits.
pub struct RelayTasks {
    pub addrs: RelayAddrs,
    tasks: Vec<JoinHandle<()>>,
}

impl RelayTasks {
    /// Wait for the control, game, bedrock, and API loops to finish.
    pub async fn wait(self) {
        for task in self.tasks {
            let _ = task.await;
        }
    }
}

/// Relay-side state and entry point.
pub struct Relay {
    config: RelayConfig,
    registry: SessionRegistry,
    metrics: Metrics,
    logs: LogBroadcaster,
    public_ip: Mutex<String>,
    started_at: Instant,
}

impl Relay {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            config,
            registry: SessionRegistry::new(),
            metrics: Metrics::new(),
            logs: LogBroadcaster::new(),
            public_ip: Mutex::new("Unknown".to_string()),
            started_at: Instant::now(),
        }
    }

    /// Bind every configured listener and spawn the accept loops, each
    /// subscribed to the shutdown signal. A bind failure here is fatal for
    /// the process; accept errors later are not.
    pub async fn start(
        self: &Arc<Self>,
        shutdown: &ShutdownCoordinator,
    ) -> crate::Result<RelayTasks> {
        let bind = self.config.bind_addr;

        let control = TcpListener::bind((bind, self.config.control_port))
            .await
            .with_context(|| {
                format!("failed to bind control listener on port {}", self.config.control_port)
            })?;
        let game = TcpListener::bind((bind, self.config.game_port))
            .await
            .with_context(|| {
                format!("failed to bind game listener on port {}", self.config.game_port)
            })?;
        let bedrock = match self.config.bedrock_port {
            Some(port) => Some(
                UdpSocket::bind((bind, port))
                    .await
                    .with_context(|| format!("failed to bind bedrock listener on port {port}"))?,
            ),
            None => None,
        };
        let api_listener = TcpListener::bind((bind, self.config.api_port))
            .await
            .with_context(|| {
                format!("failed to bind api listener on port {}", self.config.api_port)
            })?;

        let addrs = RelayAddrs {
            control: control.local_addr()?,
            game: game.local_addr()?,
            bedrock: match &bedrock {
                Some(socket) => Some(socket.local_addr()?),
                None => None,
            },
            api: api_listener.local_addr()?,
        };

        self.log(format!("[control] Listening on :{}", addrs.control.port()));
        self.log(format!("[game] Listening on :{}", addrs.game.port()));
        if let Some(bedrock_addr) = addrs.bedrock {
            self.log(format!("[bedrock] Listening on :{} (UDP)", bedrock_addr.port()));
        }
        self.log(format!("[api] Listening on :{}", addrs.api.port()));

        let mut tasks = Vec::new();
        tasks.push(tokio::spawn(control::run(
            Arc::clone(self),
            control,
            shutdown.subscribe(),
        )));
        tasks.push(tokio::spawn(game::run(
            Arc::clone(self),
            game,
            shutdown.subscribe(),
        )));
        if let Some(socket) = bedrock {
            tasks.push(tokio::spawn(bedrock::run(
                Arc::clone(self),
                socket,
                shutdown.subscribe(),
            )));
        }
        tasks.push(tokio::spawn(api::serve(
            Arc::clone(self),
            api_listener,
            shutdown.subscribe(),
        )));

        Ok(RelayTasks { addrs, tasks })
    }

    /// Snapshot for `GET /status`, computed on demand from live counters.
    pub fn status(&self) -> StatusResponse {
        StatusResponse {
            public_ip: self.public_ip(),
            control_port: self.config.control_port,
            game_port: self.config.game_port,
            active_players: self.metrics.active_players(),
            bytes_transferred: self.metrics.bytes_transferred(),
            tunnel_connected: self.registry.is_connected(),
            uptime_seconds: self.started_at.elapsed().as_secs() as i64,
        }
    }

    /// Emit an operator-visible log line: to tracing and to the SSE feed.
    pub fn log(&self, msg: impl Into<String>) {
        let msg = msg.into();
        info!("{msg}");
        self.logs.broadcast(&msg);
    }

    /// Record the public IP discovered by the external supervisor.
    pub fn set_public_ip(&self, ip: impl Into<String>) {
        *self.public_ip.lock().unwrap() = ip.into();
    }

    pub fn public_ip(&self) -> String {
        self.public_ip.lock().unwrap().clone()
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn logs(&self) -> &LogBroadcaster {
        &self.logs
    }

    /// Whether the Bedrock path is configured; controls the player header
    /// form on game streams.
    pub fn bedrock_enabled(&self) -> bool {
        self.config.bedrock_port.is_some()
    }
}
