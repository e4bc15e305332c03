//! Status API Types

use serde::{Deserialize, Serialize};

/// Snapshot of relay state served by `GET /status`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StatusResponse {
    pub public_ip: String,
    pub control_port: u16,
    pub game_port: u16,
    pub active_players: i64,
    pub bytes_transferred: i64,
    pub tunnel_connected: bool,
    pub uptime_seconds: i64,
}
