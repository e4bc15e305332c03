//! Minetunnel Host
//!
//! The behind-NAT side of the tunnel: dials out to a minetunnel-relay and
//! bridges every player stream to the local Minecraft server. Needs no
//! inbound ports at all.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use minetunnel::{Host, HostConfig, ShutdownCoordinator};

/// CLI arguments for the host agent
#[derive(Parser, Debug)]
#[command(name = "minetunnel-host")]
#[command(about = "Minetunnel host agent - expose a LAN Minecraft server through a relay")]
#[command(version)]
#[command(long_about = "
Minetunnel host agent.

Dials the relay's control port over a single outbound TCP connection and
keeps retrying every 5 seconds until the relay is reachable. Each player
that connects to the relay arrives here as one multiplexed stream and is
bridged to the local server: Java Edition streams to --local over TCP,
Bedrock Edition streams to --bedrock-local as UDP datagrams.
")]
pub struct CliArgs {
    /// Relay control address
    #[arg(long, help = "Relay control address, e.g. 203.0.113.7:8080")]
    pub relay: String,

    /// Local Java Edition server address
    #[arg(long, default_value = "localhost:25565", help = "Local Java Edition server address")]
    pub local: String,

    /// Local Bedrock Edition server address
    #[arg(long, help = "Local Bedrock Edition server address (required for Bedrock streams)")]
    pub bedrock_local: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", help = "Log level")]
    pub log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(&args.log_level)?;

    let config = HostConfig {
        relay_addr: args.relay,
        local_addr: args.local,
        bedrock_local_addr: args.bedrock_local,
    };
    config.validate().context("invalid configuration")?;

    info!("Starting minetunnel-host v{}", env!("CARGO_PKG_VERSION"));
    info!("Relay: {}", config.relay_addr);
    info!("Local server: {}", config.local_addr);
    if let Some(bedrock_addr) = &config.bedrock_local_addr {
        info!("Local Bedrock server: {bedrock_addr}");
    }

    let shutdown = ShutdownCoordinator::new();
    let shutdown_rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = shutdown.listen_for_signals().await;
    });

    let host = Host::new(config);
    host.run(shutdown_rx).await?;

    info!("Host shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_ansi(true),
        )
        .with(env_filter)
        .init();

    Ok(())
}
