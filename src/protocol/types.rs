//! SOCKS5 Protocol Types

use crate::protocol::constants::*;
use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

/// Request command as sent by the client. Only `Connect` is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Connect,
    Bind,
    UdpAssociate,
    Unknown(u8),
}

impl Command {
    /// Create from command code
    pub fn from_code(code: u8) -> Self {
        match code {
            SOCKS5_CMD_CONNECT => Command::Connect,
            SOCKS5_CMD_BIND => Command::Bind,
            SOCKS5_CMD_UDP_ASSOCIATE => Command::UdpAssociate,
            other => Command::Unknown(other),
        }
    }

    /// Get the command code
    pub fn code(&self) -> u8 {
        match self {
            Command::Connect => SOCKS5_CMD_CONNECT,
            Command::Bind => SOCKS5_CMD_BIND,
            Command::UdpAssociate => SOCKS5_CMD_UDP_ASSOCIATE,
            Command::Unknown(code) => *code,
        }
    }
}

/// Target address types supported by SOCKS5
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetAddr {
    Ipv4(Ipv4Addr),
    Ipv6(Ipv6Addr),
    Domain(String),
}

impl TargetAddr {
    /// Get the address type code for this address
    pub fn address_type(&self) -> u8 {
        match self {
            TargetAddr::Ipv4(_) => SOCKS5_ADDR_IPV4,
            TargetAddr::Ipv6(_) => SOCKS5_ADDR_IPV6,
            TargetAddr::Domain(_) => SOCKS5_ADDR_DOMAIN,
        }
    }

    /// Create from socket address
    pub fn from_socket_addr(addr: &SocketAddr) -> Self {
        match addr {
            SocketAddr::V4(v4) => TargetAddr::Ipv4(*v4.ip()),
            SocketAddr::V6(v6) => TargetAddr::Ipv6(*v6.ip()),
        }
    }

    /// The all-zero address of the given address type, used in failure replies.
    /// Unknown types fall back to IPv4.
    pub fn unspecified(address_type: u8) -> Self {
        match address_type {
            SOCKS5_ADDR_IPV6 => TargetAddr::Ipv6(Ipv6Addr::UNSPECIFIED),
            SOCKS5_ADDR_DOMAIN => TargetAddr::Domain(String::new()),
            _ => TargetAddr::Ipv4(Ipv4Addr::UNSPECIFIED),
        }
    }

    /// Append ATYP and address bytes
    fn encode_into(&self, buf: &mut BytesMut) {
        buf.put_u8(self.address_type());
        match self {
            TargetAddr::Ipv4(ip) => buf.put_slice(&ip.octets()),
            TargetAddr::Ipv6(ip) => buf.put_slice(&ip.octets()),
            TargetAddr::Domain(domain) => {
                // Length is a single byte on the wire.
                let name = &domain.as_bytes()[..domain.len().min(u8::MAX as usize)];
                buf.put_u8(name.len() as u8);
                buf.put_slice(name);
            }
        }
    }
}

impl fmt::Display for TargetAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetAddr::Ipv4(ip) => write!(f, "{}", ip),
            TargetAddr::Ipv6(ip) => write!(f, "{}", ip),
            TargetAddr::Domain(domain) => f.write_str(domain),
        }
    }
}

/// SOCKS5 Greeting message from client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Greeting {
    pub version: u8,
    pub methods: Vec<u8>,
}

impl Greeting {
    /// Whether the client offered the given authentication method
    pub fn offers(&self, method: u8) -> bool {
        self.methods.contains(&method)
    }
}

/// Username/password pair from the RFC 1929 sub-negotiation.
/// The username carries the interface name the client wants to egress through.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub identity: String,
    pub secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identity", &self.identity)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// SOCKS5 Connection request from client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub command: Command,
    pub target_addr: TargetAddr,
    pub target_port: u16,
}

impl Request {
    /// `host:port` form used in log lines and error messages
    pub fn destination(&self) -> String {
        match &self.target_addr {
            TargetAddr::Ipv6(ip) => format!("[{}]:{}", ip, self.target_port),
            other => format!("{}:{}", other, self.target_port),
        }
    }
}

/// SOCKS5 Reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub reply_code: u8,
    pub bind_addr: TargetAddr,
    pub bind_port: u16,
}

impl Reply {
    /// Success reply carrying the local address of the outbound socket
    pub fn success(bound: SocketAddr) -> Self {
        Self {
            reply_code: SOCKS5_REPLY_SUCCESS,
            bind_addr: TargetAddr::from_socket_addr(&bound),
            bind_port: bound.port(),
        }
    }

    /// Failure reply echoing the request's address type with a zeroed address
    pub fn failure(address_type: u8) -> Self {
        Self {
            reply_code: SOCKS5_REPLY_CONNECTION_REFUSED,
            bind_addr: TargetAddr::unspecified(address_type),
            bind_port: 0,
        }
    }

    /// Wire form: `VER | REP | RSV | ATYP | BND.ADDR | BND.PORT`
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(SOCKS5_MAX_REPLY_LEN);
        buf.put_u8(SOCKS5_VERSION);
        buf.put_u8(self.reply_code);
        buf.put_u8(SOCKS5_RESERVED);
        self.bind_addr.encode_into(&mut buf);
        buf.put_u16(self.bind_port);
        buf.freeze()
    }
}
