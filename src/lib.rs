//! Minetunnel Library
//!
//! NAT-traversal relay for Minecraft servers.
//!
//! A host behind NAT dials a single outbound TCP connection to a publicly
//! reachable relay. The relay accepts player connections on the public game
//! port and multiplexes every player session over that one connection, so
//! players reach the private server as if the relay were hosting it.
//! Java Edition players are bridged over TCP; Bedrock Edition players are
//! carried as length-framed UDP datagrams over dedicated streams.

pub mod api;
pub mod broadcast;
pub mod config;
pub mod host;
pub mod metrics;
pub mod protocol;
pub mod relay;
pub mod shutdown;
pub mod tunnel;

pub use broadcast::LogBroadcaster;
pub use config::{HostConfig, RelayConfig};
pub use host::Host;
pub use relay::Relay;
pub use shutdown::ShutdownCoordinator;

/// Common error type for both binaries
pub type Result<T> = anyhow::Result<T>;
