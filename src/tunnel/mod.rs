//! Tunnel Plane
//!
//! The multiplexed host connection and the registry that holds the single
//! active session.

pub mod registry;
pub mod session;

pub use registry::SessionRegistry;
pub use session::TunnelSession;
