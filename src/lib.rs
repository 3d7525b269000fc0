//! ifsocks Library
//!
//! SOCKS5 proxy core that authenticates every client against the live set of
//! host network interfaces plus a shared secret, then relays the TCP stream to
//! the requested destination through the interface named by the client.

pub mod auth;
pub mod config;
pub mod connection;
pub mod control;
pub mod error;
pub mod management;
pub mod protocol;
pub mod relay;
pub mod shutdown;

pub use config::Config;
pub use connection::ConnectionManager;
pub use control::ControlState;
pub use error::SessionError;
pub use shutdown::ShutdownCoordinator;

/// Common error type for the proxy server
pub type Result<T> = anyhow::Result<T>;
