//! Game Acceptor
//!
//! Accepts Java Edition player connections on the public game port and
//! bridges each one over a dedicated tunnel stream.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

use crate::protocol::header::{PlayerHeader, Transport};
use crate::tunnel::TunnelSession;

use super::{forward, Relay};

pub(crate) async fn run(
    relay: Arc<Relay>,
    listener: TcpListener,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = shutdown.recv() => break,
            accepted = listener.accept() => match accepted {
                Ok((socket, peer)) => {
                    tokio::spawn(handle_player(Arc::clone(&relay), socket, peer));
                }
                Err(e) => relay.log(format!("[game] Accept error: {e}")),
            },
        }
    }
    relay.log("[game] Listener shut down");
}

async fn handle_player(relay: Arc<Relay>, player: TcpStream, peer: SocketAddr) {
    // No tunnel: nothing to bridge to, close the socket without touching
    // the player counter.
    let Some(session) = relay.registry().current() else {
        relay.log(format!("[game] Player dropped, no tunnel: {peer}"));
        return;
    };

    relay.log(format!("[game] Player connected: {peer}"));
    relay.metrics().player_connected();

    if let Err(e) = bridge(&relay, &session, player, peer).await {
        relay.log(format!("[game] Player session {peer} failed: {e:#}"));
    }

    relay.metrics().player_disconnected();
    relay.log(format!("[game] Player disconnected: {peer}"));
}

async fn bridge(
    relay: &Relay,
    session: &TunnelSession,
    player: TcpStream,
    peer: SocketAddr,
) -> crate::Result<()> {
    let stream = session.open_stream().await?;

    let header = PlayerHeader::new(Transport::Tcp, peer);
    let line = if relay.bedrock_enabled() {
        header.to_tagged_line()
    } else {
        // untagged form keeps old host agents working
        header.to_bare_line()
    };

    let (stream_read, mut stream_write) = tokio::io::split(stream);
    stream_write
        .write_all(line.as_bytes())
        .await
        .context("failed to send player header")?;

    let (player_read, player_write) = player.into_split();
    forward::bidirectional(
        player_read,
        player_write,
        stream_read,
        stream_write,
        relay.metrics(),
    )
    .await
    .context("relay copy failed")?;

    Ok(())
}
