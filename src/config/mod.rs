//! Configuration Module
//!
//! Configuration accepted from the outer CLI/supervisor layers.

pub mod types;

pub use types::*;
