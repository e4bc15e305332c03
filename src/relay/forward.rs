//! Bidirectional Forwarder
//!
//! Byte copy between a player socket and its tunnel stream, crediting the
//! process-wide traffic counter with everything read.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::metrics::Metrics;

const COPY_BUFFER: usize = 32 * 1024;

/// Copy until EOF or error, counting each chunk as it is read. Returns the
/// total number of bytes copied.
pub async fn copy_counted<R, W>(reader: &mut R, writer: &mut W, metrics: &Metrics) -> io::Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buf = vec![0u8; COPY_BUFFER];
    let mut total = 0u64;
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            writer.flush().await?;
            return Ok(total);
        }
        metrics.add_bytes(n as u64);
        writer.write_all(&buf[..n]).await?;
        total += n as u64;
    }
}

/// Race both copy directions; the bridge ends as soon as either direction
/// finishes. All four halves are dropped on return, which closes both the
/// player socket and the tunnel stream and unblocks the peer.
pub async fn bidirectional<PR, PW, SR, SW>(
    mut player_read: PR,
    mut player_write: PW,
    mut stream_read: SR,
    mut stream_write: SW,
    metrics: &Metrics,
) -> io::Result<()>
where
    PR: AsyncRead + Unpin,
    PW: AsyncWrite + Unpin,
    SR: AsyncRead + Unpin,
    SW: AsyncWrite + Unpin,
{
    tokio::select! {
        result = copy_counted(&mut player_read, &mut stream_write, metrics) => result.map(|_| ()),
        result = copy_counted(&mut stream_read, &mut player_write, metrics) => result.map(|_| ()),
    }
}
