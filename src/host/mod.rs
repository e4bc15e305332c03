//! Host Agent
//!
//! The behind-NAT side: dials the relay, accepts one stream per player, and
//! bridges each to the local game server.

pub mod dialer;
pub mod stream;

pub use dialer::{Host, HostStatus, RETRY_INTERVAL};
