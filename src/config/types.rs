//! Configuration Types

use std::net::{IpAddr, Ipv4Addr};

use anyhow::bail;
use serde::{Deserialize, Serialize};

/// Relay-side configuration.
///
/// Port 0 asks the OS for an ephemeral port, which integration tests rely on.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayConfig {
    /// Address all listeners bind to
    pub bind_addr: IpAddr,
    /// TCP port the host agent dials
    pub control_port: u16,
    /// Public TCP port for Java Edition players
    pub game_port: u16,
    /// Public UDP port for Bedrock Edition players; `None` disables the UDP path
    pub bedrock_port: Option<u16>,
    /// HTTP status/log API port
    pub api_port: u16,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            control_port: 8080,
            game_port: 25565,
            bedrock_port: None,
            api_port: 6060,
        }
    }
}

impl RelayConfig {
    /// Reject configurations where two TCP listeners share a fixed port.
    pub fn validate(&self) -> crate::Result<()> {
        let tcp_ports = [
            ("control", self.control_port),
            ("game", self.game_port),
            ("api", self.api_port),
        ];
        for (i, (name_a, port_a)) in tcp_ports.iter().enumerate() {
            for (name_b, port_b) in &tcp_ports[i + 1..] {
                if port_a == port_b && *port_a != 0 {
                    bail!("{name_a} and {name_b} listeners both configured on port {port_a}");
                }
            }
        }
        Ok(())
    }
}

/// Host-side configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HostConfig {
    /// Relay control address, e.g. `203.0.113.7:8080`
    pub relay_addr: String,
    /// Local Java Edition server address
    pub local_addr: String,
    /// Local Bedrock Edition server address; `None` rejects `udp:` streams
    pub bedrock_local_addr: Option<String>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            relay_addr: "127.0.0.1:8080".to_string(),
            local_addr: "localhost:25565".to_string(),
            bedrock_local_addr: None,
        }
    }
}

impl HostConfig {
    pub fn validate(&self) -> crate::Result<()> {
        if self.relay_addr.is_empty() {
            bail!("relay address must not be empty");
        }
        if self.local_addr.is_empty() {
            bail!("local server address must not be empty");
        }
        if let Some(addr) = &self.bedrock_local_addr {
            if addr.is_empty() {
                bail!("local Bedrock server address must not be empty when set");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_defaults() {
        let config = RelayConfig::default();
        assert_eq!(config.control_port, 8080);
        assert_eq!(config.game_port, 25565);
        assert_eq!(config.bedrock_port, None);
        assert_eq!(config.api_port, 6060);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_relay_rejects_colliding_ports() {
        let config = RelayConfig {
            game_port: 8080,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_relay_allows_multiple_ephemeral_ports() {
        let config = RelayConfig {
            control_port: 0,
            game_port: 0,
            api_port: 0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_host_rejects_empty_addresses() {
        let config = HostConfig {
            relay_addr: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        assert!(HostConfig::default().validate().is_ok());
    }
}
