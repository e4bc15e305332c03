//! Player Header
//!
//! The first bytes on every tunnel stream form a single LF-terminated line
//! identifying the player: `[tcp:|udp:]<ip:port>\n`. Relays that predate
//! Bedrock support write the bare form, which means TCP.

use std::net::SocketAddr;

use anyhow::{bail, Context};

/// Transport the player reached the relay over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Tcp,
    Udp,
}

/// Parsed per-stream preamble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerHeader {
    pub transport: Transport,
    pub remote_addr: SocketAddr,
}

impl PlayerHeader {
    pub fn new(transport: Transport, remote_addr: SocketAddr) -> Self {
        Self {
            transport,
            remote_addr,
        }
    }

    /// Wire form carrying the transport tag, used when the relay has Bedrock
    /// support enabled.
    pub fn to_tagged_line(&self) -> String {
        let tag = match self.transport {
            Transport::Tcp => "tcp",
            Transport::Udp => "udp",
        };
        format!("{}:{}\n", tag, self.remote_addr)
    }

    /// Untagged wire form for TCP-only relays.
    pub fn to_bare_line(&self) -> String {
        format!("{}\n", self.remote_addr)
    }

    /// Parse a header line. A trailing LF is tolerated; an absent tag means
    /// TCP for compatibility with untagged relays.
    pub fn parse(line: &str) -> crate::Result<Self> {
        let line = line.strip_suffix('\n').unwrap_or(line);
        if line.is_empty() {
            bail!("empty player header");
        }

        let (transport, addr) = if let Some(rest) = line.strip_prefix("tcp:") {
            (Transport::Tcp, rest)
        } else if let Some(rest) = line.strip_prefix("udp:") {
            (Transport::Udp, rest)
        } else {
            (Transport::Tcp, line)
        };

        let remote_addr = addr
            .parse()
            .with_context(|| format!("invalid player address in header: {addr:?}"))?;

        Ok(Self {
            transport,
            remote_addr,
        })
    }
}
