//! Control Acceptor
//!
//! Accepts the host's single TCP connection and promotes it to a yamux
//! session in server role. Only one host is useful at a time, but the
//! acceptor never rejects: a new connection overwrites the previous session.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_stream::StreamExt;
use tokio_yamux::config::Config as YamuxConfig;
use tokio_yamux::session::Session;

use crate::tunnel::TunnelSession;

use super::Relay;

/// Application-level keepalive probing the host link; a dead host is
/// detected within this interval and the session cascades closed.
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(10);

pub(crate) async fn run(
    relay: Arc<Relay>,
    listener: TcpListener,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        let (conn, peer) = tokio::select! {
            _ = shutdown.recv() => break,
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    relay.log(format!("[control] Accept error: {e}"));
                    continue;
                }
            },
        };
        relay.log(format!("[control] Connection from {peer}"));

        let mut config = YamuxConfig::default();
        config.enable_keepalive = true;
        config.keepalive_interval = KEEPALIVE_INTERVAL;

        let session = Session::new_server(conn, config);
        let handle = TunnelSession::new(session.control(), peer);

        if relay.registry().install(handle.clone()) {
            relay.log("[control] Overwriting existing session");
        }
        tokio::spawn(drive_session(Arc::clone(&relay), session, handle));
        relay.log("[control] Tunnel established");
    }

    // shutdown: the active tunnel moves to Closed, which cascades to every
    // player stream bridged over it
    if let Some(session) = relay.registry().current() {
        session.close();
    }
    relay.log("[control] Listener shut down");
}

/// Own the yamux session: polling it moves frames and keepalives. Exits on
/// peer close, keepalive failure, or a `close` request, and dropping the
/// session then closes the underlying connection and every player stream.
async fn drive_session(relay: Arc<Relay>, mut session: Session<TcpStream>, handle: TunnelSession) {
    let shutdown = handle.shutdown_signal();
    loop {
        tokio::select! {
            _ = shutdown.notified() => break,
            inbound = session.next() => match inbound {
                Some(Ok(stream)) => {
                    // streams are relay-initiated only
                    relay.log("[control] Dropping unexpected stream opened by host");
                    drop(stream);
                }
                Some(Err(e)) => {
                    relay.log(format!("[control] Tunnel error: {e}"));
                    break;
                }
                None => {
                    relay.log("[control] Tunnel closed by host");
                    break;
                }
            },
        }
    }
    handle.mark_closed();
}
