//! Tests for the relay's control and game plane: header delivery, counter
//! accounting, tunnel-absent behavior, and host session overwrite.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tokio_stream::StreamExt;
use tokio_yamux::config::Config as YamuxConfig;
use tokio_yamux::session::Session;
use tokio_yamux::stream::StreamHandle;

use minetunnel::relay::RelayAddrs;
use minetunnel::{Relay, RelayConfig, ShutdownCoordinator};

fn test_config() -> RelayConfig {
    RelayConfig {
        bind_addr: "127.0.0.1".parse().unwrap(),
        control_port: 0,
        game_port: 0,
        bedrock_port: None,
        api_port: 0,
    }
}

async fn start_relay(config: RelayConfig) -> (Arc<Relay>, RelayAddrs, ShutdownCoordinator) {
    let relay = Arc::new(Relay::new(config));
    let shutdown = ShutdownCoordinator::new();
    let tasks = relay.start(&shutdown).await.unwrap();
    // the coordinator must outlive the test: dropping it reads as shutdown
    // to the accept loops
    (relay, tasks.addrs, shutdown)
}

/// Dial the relay control port as a host agent would and surface accepted
/// streams over a channel. The session is driven by the spawned task.
async fn fake_host(control_addr: SocketAddr) -> (SocketAddr, mpsc::Receiver<StreamHandle>) {
    let conn = TcpStream::connect(control_addr).await.unwrap();
    let local_addr = conn.local_addr().unwrap();
    let mut session = Session::new_client(conn, YamuxConfig::default());

    let (tx, rx) = mpsc::channel(8);
    tokio::spawn(async move {
        loop {
            match session.next().await {
                Some(Ok(stream)) => {
                    if tx.send(stream).await.is_err() {
                        break;
                    }
                }
                _ => break,
            }
        }
    });
    (local_addr, rx)
}

async fn wait_until(mut condition: impl FnMut() -> bool, what: &str) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}

#[tokio::test]
async fn test_tcp_player_bridged_with_bare_header() {
    let (relay, addrs, _shutdown) = start_relay(test_config()).await;

    let (_, mut streams) = fake_host(addrs.control).await;
    wait_until(|| relay.registry().is_connected(), "tunnel install").await;

    let mut player = TcpStream::connect(addrs.game).await.unwrap();
    let player_addr = player.local_addr().unwrap();
    player.write_all(b"HELLO").await.unwrap();

    let stream = timeout(Duration::from_secs(5), streams.recv())
        .await
        .unwrap()
        .unwrap();
    let (read_half, mut write_half) = tokio::io::split(stream);
    let mut reader = BufReader::new(read_half);

    // Bedrock disabled, so the header is the untagged back-compat form
    let mut line = String::new();
    reader.read_line(&mut line).await.unwrap();
    assert_eq!(line, format!("{player_addr}\n"));

    // bytes after the LF are player payload, delivered verbatim
    let mut payload = [0u8; 5];
    reader.read_exact(&mut payload).await.unwrap();
    assert_eq!(&payload, b"HELLO");

    let status = relay.status();
    assert_eq!(status.active_players, 1);
    assert!(status.tunnel_connected);
    assert!(status.bytes_transferred >= 5);

    write_half.write_all(b"WORLD").await.unwrap();
    let mut reply = [0u8; 5];
    player.read_exact(&mut reply).await.unwrap();
    assert_eq!(&reply, b"WORLD");

    drop(player);
    wait_until(|| relay.status().active_players == 0, "player count to drop").await;
    assert!(relay.status().bytes_transferred >= 10);
}

#[tokio::test]
async fn test_tagged_header_when_bedrock_enabled() {
    let config = RelayConfig {
        bedrock_port: Some(0),
        ..test_config()
    };
    let (relay, addrs, _shutdown) = start_relay(config).await;

    let (_, mut streams) = fake_host(addrs.control).await;
    wait_until(|| relay.registry().is_connected(), "tunnel install").await;

    let player = TcpStream::connect(addrs.game).await.unwrap();
    let player_addr = player.local_addr().unwrap();

    let stream = timeout(Duration::from_secs(5), streams.recv())
        .await
        .unwrap()
        .unwrap();
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    reader.read_line(&mut line).await.unwrap();
    assert_eq!(line, format!("tcp:{player_addr}\n"));
}

#[tokio::test]
async fn test_player_without_tunnel_is_dropped() {
    let (relay, addrs, _shutdown) = start_relay(test_config()).await;

    let mut player = TcpStream::connect(addrs.game).await.unwrap();
    // the relay may already have closed the socket, so the write is best-effort
    let _ = player.write_all(b"anyone there?").await;

    // the relay closes the socket without bridging anywhere
    let mut buf = [0u8; 16];
    match timeout(Duration::from_secs(5), player.read(&mut buf)).await.unwrap() {
        Ok(0) | Err(_) => {}
        Ok(n) => panic!("unexpected {n} bytes from relay"),
    }

    let status = relay.status();
    assert_eq!(status.active_players, 0);
    assert_eq!(status.bytes_transferred, 0);
    assert!(!status.tunnel_connected);
}

#[tokio::test]
async fn test_new_host_overwrites_previous_session() {
    let (relay, addrs, _shutdown) = start_relay(test_config()).await;

    let (host_a_addr, mut host_a_streams) = fake_host(addrs.control).await;
    wait_until(|| relay.registry().is_connected(), "first tunnel install").await;
    let session_a = relay.registry().current().unwrap();
    assert_eq!(session_a.remote_addr(), host_a_addr);

    let (host_b_addr, _host_b_streams) = fake_host(addrs.control).await;
    wait_until(|| session_a.is_closed(), "first session to close").await;
    wait_until(
        || {
            relay
                .registry()
                .current()
                .is_some_and(|s| s.remote_addr() == host_b_addr && !s.is_closed())
        },
        "second session install",
    )
    .await;

    // host A's connection is torn down, so its stream feed ends
    let ended = timeout(Duration::from_secs(5), host_a_streams.recv()).await;
    assert!(matches!(ended, Ok(None)));
}

#[tokio::test]
async fn test_players_reach_new_session_after_overwrite() {
    let (relay, addrs, _shutdown) = start_relay(test_config()).await;

    let (_, _host_a_streams) = fake_host(addrs.control).await;
    wait_until(|| relay.registry().is_connected(), "first tunnel install").await;
    let session_a = relay.registry().current().unwrap();

    let (_, mut host_b_streams) = fake_host(addrs.control).await;
    wait_until(|| session_a.is_closed(), "first session to close").await;

    let mut player = TcpStream::connect(addrs.game).await.unwrap();
    player.write_all(b"ping").await.unwrap();

    let stream = timeout(Duration::from_secs(5), host_b_streams.recv())
        .await
        .unwrap()
        .unwrap();
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    reader.read_line(&mut line).await.unwrap();
    assert_eq!(line, format!("{}\n", player.local_addr().unwrap()));
}

#[tokio::test]
async fn test_shutdown_unwinds_all_relay_loops() {
    let config = RelayConfig {
        bedrock_port: Some(0),
        ..test_config()
    };
    let relay = Arc::new(Relay::new(config));
    let shutdown = ShutdownCoordinator::new();
    let tasks = relay.start(&shutdown).await.unwrap();
    let addrs = tasks.addrs;

    let (_, _host_streams) = fake_host(addrs.control).await;
    wait_until(|| relay.registry().is_connected(), "tunnel install").await;
    let session = relay.registry().current().unwrap();

    shutdown.trigger();
    timeout(Duration::from_secs(5), tasks.wait())
        .await
        .expect("accept loops should unwind after shutdown");

    // the active tunnel moved to Closed on the way out
    assert!(session.is_closed());

    // the listeners are gone
    assert!(TcpStream::connect(addrs.control).await.is_err());
    assert!(TcpStream::connect(addrs.game).await.is_err());
}

#[tokio::test]
async fn test_shutdown_twice_is_safe() {
    let relay = Arc::new(Relay::new(test_config()));
    let shutdown = ShutdownCoordinator::new();
    let tasks = relay.start(&shutdown).await.unwrap();

    // a second trigger while the loops unwind must not panic anything
    shutdown.trigger();
    shutdown.trigger();
    timeout(Duration::from_secs(5), tasks.wait())
        .await
        .expect("accept loops should unwind after shutdown");

    // and neither must one after they are gone
    shutdown.trigger();
}
