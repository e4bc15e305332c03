//! Stream Handlers
//!
//! Each accepted stream carries exactly one player. The first line is the
//! player header; everything after it is player traffic, bridged to the local
//! game server over TCP or, for `udp:` streams, reflected to the local
//! Bedrock server as datagrams.

use anyhow::{bail, Context};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tokio::net::{TcpStream, UdpSocket};
use tokio_yamux::stream::StreamHandle;
use tracing::{info, warn};

use crate::config::HostConfig;
use crate::protocol::framing::{read_frame, write_frame, MAX_DATAGRAM};
use crate::protocol::header::{PlayerHeader, Transport};

pub(crate) async fn handle(stream: StreamHandle, config: HostConfig) {
    if let Err(e) = serve(stream, &config).await {
        warn!("Stream handler failed: {e:#}");
    }
}

async fn serve(stream: StreamHandle, config: &HostConfig) -> crate::Result<()> {
    let (read_half, write_half) = tokio::io::split(stream);

    // The header line and the first player bytes may arrive together; the
    // BufReader that consumed the line stays the read side of the bridge so
    // nothing buffered past the LF is lost.
    let mut reader = BufReader::new(read_half);
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .await
        .context("failed to read player header")?;
    if line.is_empty() {
        bail!("stream closed before a player header arrived");
    }
    let header = PlayerHeader::parse(&line)?;
    info!("Player connected: {}", header.remote_addr);

    let result = match header.transport {
        Transport::Tcp => bridge_tcp(reader, write_half, &config.local_addr).await,
        Transport::Udp => {
            let Some(bedrock_addr) = config.bedrock_local_addr.as_deref() else {
                bail!(
                    "received a Bedrock stream for {} but no local Bedrock server is configured",
                    header.remote_addr
                );
            };
            bridge_udp(reader, write_half, bedrock_addr).await
        }
    };

    info!("Player disconnected: {}", header.remote_addr);
    result
}

/// Bridge the stream to the local Java Edition server. Ends when either
/// direction finishes; dropping the halves closes both sides.
async fn bridge_tcp<R, W>(mut reader: R, mut writer: W, origin_addr: &str) -> crate::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let origin = TcpStream::connect(origin_addr)
        .await
        .with_context(|| format!("failed to dial local server {origin_addr}"))?;
    let (mut origin_read, mut origin_write) = origin.into_split();

    tokio::select! {
        result = tokio::io::copy(&mut reader, &mut origin_write) => result.map(|_| ()),
        result = tokio::io::copy(&mut origin_read, &mut writer) => result.map(|_| ()),
    }
    .context("player copy failed")?;

    Ok(())
}

/// Reflect a `udp:` stream to the local Bedrock server: frames from the
/// tunnel become datagrams and vice versa.
async fn bridge_udp<R, W>(mut reader: R, mut writer: W, origin_addr: &str) -> crate::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let socket = UdpSocket::bind("0.0.0.0:0")
        .await
        .context("failed to bind local UDP socket")?;
    socket
        .connect(origin_addr)
        .await
        .with_context(|| format!("failed to connect UDP socket to {origin_addr}"))?;

    tokio::select! {
        result = frames_to_datagrams(&mut reader, &socket) => result,
        result = datagrams_to_frames(&socket, &mut writer) => result,
    }
    .context("bedrock reflection failed")?;

    Ok(())
}

async fn frames_to_datagrams<R>(reader: &mut R, socket: &UdpSocket) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    while let Some(payload) = read_frame(reader).await? {
        socket.send(&payload).await?;
    }
    Ok(())
}

async fn datagrams_to_frames<W>(socket: &UdpSocket, writer: &mut W) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; MAX_DATAGRAM];
    loop {
        let n = socket.recv(&mut buf).await?;
        write_frame(writer, &buf[..n]).await?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_bridge_tcp_preserves_buffered_bytes() {
        let origin_listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let origin_addr = origin_listener.local_addr().unwrap().to_string();

        let origin_task = tokio::spawn(async move {
            let (mut conn, _) = origin_listener.accept().await.unwrap();
            let mut received = vec![0u8; 5];
            conn.read_exact(&mut received).await.unwrap();
            conn.write_all(b"WORLD").await.unwrap();
            received
        });

        // header and first player bytes arrive in one segment
        let (mut relay_side, stream) = tokio::io::duplex(4096);
        relay_side
            .write_all(b"tcp:1.2.3.4:55555\nHELLO")
            .await
            .unwrap();

        let (read_half, write_half) = tokio::io::split(stream);
        let mut reader = BufReader::new(read_half);
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        assert_eq!(line, "tcp:1.2.3.4:55555\n");

        let bridge = tokio::spawn(async move {
            bridge_tcp(reader, write_half, &origin_addr).await.unwrap();
        });

        assert_eq!(origin_task.await.unwrap(), b"HELLO");

        let mut reply = vec![0u8; 5];
        relay_side.read_exact(&mut reply).await.unwrap();
        assert_eq!(reply, b"WORLD");

        drop(relay_side);
        bridge.await.unwrap();
    }

    #[tokio::test]
    async fn test_bridge_udp_reflects_both_directions() {
        let origin = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let origin_addr = origin.local_addr().unwrap().to_string();

        let (mut relay_side, stream) = tokio::io::duplex(4096);
        let (read_half, write_half) = tokio::io::split(stream);

        let bridge = tokio::spawn(async move {
            let _ = bridge_udp(read_half, write_half, &origin_addr).await;
        });

        // tunnel frame becomes a datagram at the origin
        write_frame(&mut relay_side, b"ping-frame").await.unwrap();
        let mut buf = vec![0u8; MAX_DATAGRAM];
        let (n, from) = origin.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"ping-frame");

        // origin datagram comes back as a frame
        origin.send_to(b"pong-frame", from).await.unwrap();
        let reply = read_frame(&mut relay_side).await.unwrap().unwrap();
        assert_eq!(reply, b"pong-frame");

        drop(relay_side);
        bridge.await.unwrap();
    }
}
