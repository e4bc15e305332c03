//! Minetunnel Relay
//!
//! The publicly reachable side of the tunnel: accepts the host's control
//! connection, bridges players on the public game ports, and serves the
//! status API.

use std::net::IpAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use minetunnel::{Relay, RelayConfig, ShutdownCoordinator};

/// CLI arguments for the relay
#[derive(Parser, Debug)]
#[command(name = "minetunnel-relay")]
#[command(about = "Minetunnel relay - public entry point for tunneled Minecraft servers")]
#[command(version)]
#[command(long_about = "
Minetunnel relay.

Accepts a single outbound connection from a minetunnel-host agent and
exposes the host's private Minecraft server on the public game ports.
Java Edition players connect over TCP; Bedrock Edition players connect
over UDP when a Bedrock port is configured. A read-only HTTP API serves
a status snapshot and a live log feed for external monitors.
")]
pub struct CliArgs {
    /// Address to bind all listeners to
    #[arg(long, default_value = "0.0.0.0", help = "Bind address for all listeners")]
    pub bind: IpAddr,

    /// Control port the host agent dials
    #[arg(long, default_value_t = 8080, help = "TCP port the host agent dials")]
    pub control_port: u16,

    /// Public game port for Java Edition players
    #[arg(long, default_value_t = 25565, help = "Public TCP port for Java Edition players")]
    pub game_port: u16,

    /// Public game port for Bedrock Edition players (0 disables UDP support)
    #[arg(long, default_value_t = 0, help = "Public UDP port for Bedrock Edition players (0 disables)")]
    pub bedrock_port: u16,

    /// Status API port
    #[arg(long, default_value_t = 6060, help = "HTTP status API port")]
    pub api_port: u16,

    /// Public IP reported by /status (discovery is the supervisor's job)
    #[arg(long, help = "Public IP to report in /status")]
    pub public_ip: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", help = "Log level")]
    pub log_level: String,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration and exit")]
    pub validate_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(&args.log_level)?;

    let config = RelayConfig {
        bind_addr: args.bind,
        control_port: args.control_port,
        game_port: args.game_port,
        bedrock_port: (args.bedrock_port > 0).then_some(args.bedrock_port),
        api_port: args.api_port,
    };
    config.validate().context("invalid configuration")?;

    if args.validate_config {
        info!("Configuration is valid");
        info!("  Bind address: {}", config.bind_addr);
        info!("  Control port: {}", config.control_port);
        info!("  Game port: {}", config.game_port);
        info!(
            "  Bedrock port: {}",
            config
                .bedrock_port
                .map(|p| p.to_string())
                .unwrap_or_else(|| "disabled".to_string())
        );
        info!("  API port: {}", config.api_port);
        return Ok(());
    }

    info!("Starting minetunnel-relay v{}", env!("CARGO_PKG_VERSION"));

    let relay = Arc::new(Relay::new(config));
    if let Some(public_ip) = args.public_ip {
        relay.set_public_ip(public_ip);
    }

    let shutdown = ShutdownCoordinator::new();

    // a bind failure of any required listener is fatal
    let tasks = relay
        .start(&shutdown)
        .await
        .context("failed to start relay listeners")?;
    info!(
        "Relay ready: control {}, game {}, api {}",
        tasks.addrs.control, tasks.addrs.game, tasks.addrs.api
    );

    shutdown.listen_for_signals().await?;
    // let the accept loops unwind and the tunnel close before the runtime
    // goes away
    tasks.wait().await;

    info!("Relay shutdown complete");
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
