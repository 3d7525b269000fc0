//! Data Relay Module
//!
//! Outbound connection setup and bidirectional byte pumping.

pub mod engine;
pub mod session;

pub use engine::{RelayEngine, RELAY_BUFFER_SIZE};
pub use session::RelayStats;
