//! Connection Management Module
//!
//! Accepts clients and drives each through the SOCKS5 session state machine.

pub mod manager;
pub mod session;

pub use manager::{ConnectionCounters, ConnectionManager, ConnectionStats};
pub use session::{Session, SessionContext, SessionOutcome, SessionState};
