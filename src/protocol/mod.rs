//! Tunnel Wire Protocol
//!
//! The per-stream player header line and the length framing used to carry
//! Bedrock datagrams over a byte stream.

pub mod framing;
pub mod header;

pub use framing::{read_frame, write_frame, MAX_DATAGRAM};
pub use header::{PlayerHeader, Transport};
