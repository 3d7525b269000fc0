//! SOCKS5 Protocol Implementation
//!
//! Wire types and frame codec for the server side of RFC 1928 and RFC 1929.

pub mod constants;
pub mod handler;
pub mod types;

pub use constants::*;
pub use handler::Socks5Handler;
pub use types::*;
