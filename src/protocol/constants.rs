//! SOCKS5 Protocol Constants

// SOCKS5 Protocol Version
pub const SOCKS5_VERSION: u8 = 0x05;

// SOCKS5 Commands
pub const SOCKS5_CMD_CONNECT: u8 = 0x01;
pub const SOCKS5_CMD_BIND: u8 = 0x02;
pub const SOCKS5_CMD_UDP_ASSOCIATE: u8 = 0x03;

// Address Types
pub const SOCKS5_ADDR_IPV4: u8 = 0x01;
pub const SOCKS5_ADDR_DOMAIN: u8 = 0x03;
pub const SOCKS5_ADDR_IPV6: u8 = 0x04;

// Authentication Methods. Username/password is the only one this server selects.
pub const SOCKS5_AUTH_USERPASS: u8 = 0x02;

// Reply codes. Every outbound connect failure is reported as 0x05.
pub const SOCKS5_REPLY_SUCCESS: u8 = 0x00;
pub const SOCKS5_REPLY_CONNECTION_REFUSED: u8 = 0x05;

// Reserved field value
pub const SOCKS5_RESERVED: u8 = 0x00;

// Username/Password sub-negotiation (RFC 1929)
pub const SOCKS5_USERPASS_VERSION: u8 = 0x01;
pub const SOCKS5_USERPASS_SUCCESS: u8 = 0x00;
pub const SOCKS5_USERPASS_FAILURE: u8 = 0xFF;

/// Largest reply frame: header, IPv6 address and port.
pub const SOCKS5_MAX_REPLY_LEN: usize = 4 + 16 + 2;
