//! Datagram Framing
//!
//! Bedrock UDP datagrams ride a tunnel stream as `u16` big-endian length
//! followed by that many payload bytes. Length 0 is a valid (empty) datagram;
//! the 16-bit length caps frames at the maximum UDP payload by construction.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest datagram a frame can carry.
pub const MAX_DATAGRAM: usize = u16::MAX as usize;

/// Read one frame. Returns `Ok(None)` on a clean end of stream at a frame
/// boundary; an EOF inside a frame is an `UnexpectedEof` error.
pub async fn read_frame<R>(reader: &mut R) -> io::Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 2];
    if reader.read(&mut len_buf[..1]).await? == 0 {
        return Ok(None);
    }
    reader.read_exact(&mut len_buf[1..]).await?;

    let len = u16::from_be_bytes(len_buf) as usize;
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(Some(payload))
}

/// Write one frame. The payload must fit the 16-bit length field.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > MAX_DATAGRAM {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("datagram of {} bytes exceeds frame capacity", payload.len()),
        ));
    }
    writer.write_all(&(payload.len() as u16).to_be_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await
}
