//! Bedrock Acceptor
//!
//! UDP has no connections, so one is synthesized per source address: the
//! first datagram from a new `(ip, port)` opens a dedicated tunnel stream and
//! later datagrams from that source ride it as length-prefixed frames.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::UdpSocket;
use tokio::sync::{broadcast, mpsc};
use tokio_yamux::stream::StreamHandle;

use crate::protocol::framing::{read_frame, write_frame, MAX_DATAGRAM};
use crate::protocol::header::{PlayerHeader, Transport};

use super::Relay;

/// Datagrams queued toward the tunnel per session before the read loop
/// backpressures.
const SESSION_QUEUE: usize = 64;

/// Live Bedrock sessions keyed by player source address. The map holds the
/// sending side of each session's datagram queue; removing an entry drops the
/// sender, which terminates that session's writer task.
#[derive(Default)]
struct BedrockRegistry {
    sessions: Mutex<HashMap<SocketAddr, mpsc::Sender<Vec<u8>>>>,
}

impl BedrockRegistry {
    fn get(&self, key: &SocketAddr) -> Option<mpsc::Sender<Vec<u8>>> {
        self.sessions.lock().unwrap().get(key).cloned()
    }

    fn insert(&self, key: SocketAddr, tx: mpsc::Sender<Vec<u8>>) {
        self.sessions.lock().unwrap().insert(key, tx);
    }

    fn remove(&self, key: &SocketAddr) {
        self.sessions.lock().unwrap().remove(key);
    }
}

pub(crate) async fn run(
    relay: Arc<Relay>,
    socket: UdpSocket,
    mut shutdown: broadcast::Receiver<()>,
) {
    let socket = Arc::new(socket);
    let registry = Arc::new(BedrockRegistry::default());
    let mut buf = vec![0u8; MAX_DATAGRAM];

    loop {
        let (n, peer) = tokio::select! {
            _ = shutdown.recv() => break,
            received = socket.recv_from(&mut buf) => match received {
                Ok(received) => received,
                Err(e) => {
                    relay.log(format!("[bedrock] Read error: {e}"));
                    continue;
                }
            },
        };

        // The single read loop is the only inserter, so a miss here cannot
        // race another create for the same source.
        let tx = match registry.get(&peer) {
            Some(tx) => tx,
            None => match open_session(&relay, &socket, peer, &registry).await {
                Some(tx) => tx,
                // no tunnel, or the stream could not be opened
                None => continue,
            },
        };

        if tx.send(buf[..n].to_vec()).await.is_err() {
            // session tore down between lookup and send; this datagram is lost
        }
    }
    relay.log("[bedrock] Listener shut down");
}

/// Open the tunnel stream for a new source and start its two tasks. Returns
/// `None` (datagram dropped, counters reconciled) when there is no tunnel or
/// the stream cannot be set up.
async fn open_session(
    relay: &Arc<Relay>,
    socket: &Arc<UdpSocket>,
    peer: SocketAddr,
    registry: &Arc<BedrockRegistry>,
) -> Option<mpsc::Sender<Vec<u8>>> {
    let tunnel = relay.registry().current()?;

    relay.log(format!("[bedrock] Player connected: {peer}"));
    relay.metrics().player_connected();

    let stream = match tunnel.open_stream().await {
        Ok(stream) => stream,
        Err(e) => {
            relay.log(format!("[bedrock] Failed to open stream: {e}"));
            relay.metrics().player_disconnected();
            return None;
        }
    };

    let (stream_read, mut stream_write) = tokio::io::split(stream);
    let header = PlayerHeader::new(Transport::Udp, peer).to_tagged_line();
    if let Err(e) = stream_write.write_all(header.as_bytes()).await {
        relay.log(format!("[bedrock] Failed to send header: {e}"));
        relay.metrics().player_disconnected();
        return None;
    }

    let (tx, rx) = mpsc::channel(SESSION_QUEUE);
    registry.insert(peer, tx.clone());
    tokio::spawn(write_to_tunnel(Arc::clone(relay), rx, stream_write));
    tokio::spawn(read_from_tunnel(
        Arc::clone(relay),
        stream_read,
        Arc::clone(socket),
        peer,
        Arc::clone(registry),
    ));

    Some(tx)
}

/// Drain the session's datagram queue into frames. Ends when the registry
/// entry is removed (sender dropped) or the stream dies.
async fn write_to_tunnel(
    relay: Arc<Relay>,
    mut rx: mpsc::Receiver<Vec<u8>>,
    mut stream_write: WriteHalf<StreamHandle>,
) {
    while let Some(datagram) = rx.recv().await {
        let len = datagram.len() as u64;
        if let Err(e) = write_frame(&mut stream_write, &datagram).await {
            relay.log(format!("[bedrock] Tunnel write error: {e}"));
            break;
        }
        relay.metrics().add_bytes(len + 2);
    }
}

/// Reflect frames from the tunnel back to the player as datagrams. Exactly
/// one reader runs per live session; its exit is the single cleanup point:
/// registry removal, counter decrement, and (via the dropped queue sender)
/// writer termination.
async fn read_from_tunnel(
    relay: Arc<Relay>,
    mut stream_read: ReadHalf<StreamHandle>,
    socket: Arc<UdpSocket>,
    peer: SocketAddr,
    registry: Arc<BedrockRegistry>,
) {
    loop {
        match read_frame(&mut stream_read).await {
            Ok(Some(payload)) => {
                relay.metrics().add_bytes(payload.len() as u64 + 2);
                if let Err(e) = socket.send_to(&payload, peer).await {
                    relay.log(format!("[bedrock] UDP write error: {e}"));
                }
            }
            Ok(None) => break,
            Err(e) => {
                relay.log(format!("[bedrock] Tunnel read error: {e}"));
                break;
            }
        }
    }

    registry.remove(&peer);
    relay.metrics().player_disconnected();
    relay.log(format!("[bedrock] Player disconnected: {peer}"));
}
