//! SOCKS5 Protocol Handler
//!
//! Frame-level reads and writes for the server side of a SOCKS5 handshake.
//! The handler knows nothing about sessions or authentication decisions; it
//! only turns bytes into typed frames and back.

use super::{Command, Credentials, Greeting, Reply, Request, TargetAddr};
use crate::error::SessionError;
use crate::protocol::constants::*;
use std::net::{Ipv4Addr, Ipv6Addr};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

type FrameResult<T> = std::result::Result<T, SessionError>;

/// SOCKS5 protocol handler for a client connection
pub struct Socks5Handler<S> {
    stream: S,
}

impl<S> Socks5Handler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Create a new SOCKS5 handler for the given stream
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Read the client greeting: `VER | NMETHODS | METHODS`
    pub async fn read_greeting(&mut self) -> FrameResult<Greeting> {
        let mut header = [0u8; 2];
        self.stream.read_exact(&mut header).await?;
        let [version, n_methods] = header;

        if version != SOCKS5_VERSION {
            return Err(SessionError::protocol(format!(
                "unsupported SOCKS version {} in greeting",
                version
            )));
        }
        if n_methods == 0 {
            return Err(SessionError::protocol("no authentication methods offered"));
        }

        let mut methods = vec![0u8; n_methods as usize];
        self.stream.read_exact(&mut methods).await?;

        Ok(Greeting { version, methods })
    }

    /// Send the method selection reply
    pub async fn send_method_selection(&mut self, method: u8) -> FrameResult<()> {
        self.write_frame(&[SOCKS5_VERSION, method]).await
    }

    /// Read the username/password sub-negotiation (RFC 1929)
    pub async fn read_credentials(&mut self) -> FrameResult<Credentials> {
        // +----+------+----------+------+----------+
        // |VER | ULEN |  UNAME   | PLEN |  PASSWD  |
        // +----+------+----------+------+----------+
        let version = self.stream.read_u8().await?;
        if version != SOCKS5_USERPASS_VERSION {
            return Err(SessionError::protocol(format!(
                "unsupported sub-negotiation version {}",
                version
            )));
        }

        let identity = self.read_short_string("username").await?;
        let secret = self.read_short_string("password").await?;

        Ok(Credentials { identity, secret })
    }

    /// Send the sub-negotiation status reply
    pub async fn send_auth_status(&mut self, success: bool) -> FrameResult<()> {
        let status = if success {
            SOCKS5_USERPASS_SUCCESS
        } else {
            SOCKS5_USERPASS_FAILURE
        };
        self.write_frame(&[SOCKS5_USERPASS_VERSION, status]).await
    }

    /// Read the connection request: `VER | CMD | RSV | ATYP | DST.ADDR | DST.PORT`
    pub async fn read_request(&mut self) -> FrameResult<Request> {
        let mut header = [0u8; 4];
        self.stream.read_exact(&mut header).await?;
        let [version, command, _reserved, address_type] = header;

        if version != SOCKS5_VERSION {
            return Err(SessionError::protocol(format!(
                "unsupported SOCKS version {} in request",
                version
            )));
        }

        let target_addr = match address_type {
            SOCKS5_ADDR_IPV4 => {
                let mut octets = [0u8; 4];
                self.stream.read_exact(&mut octets).await?;
                TargetAddr::Ipv4(Ipv4Addr::from(octets))
            }
            SOCKS5_ADDR_IPV6 => {
                let mut octets = [0u8; 16];
                self.stream.read_exact(&mut octets).await?;
                TargetAddr::Ipv6(Ipv6Addr::from(octets))
            }
            SOCKS5_ADDR_DOMAIN => {
                let domain = self.read_short_string("domain name").await?;
                if domain.is_empty() {
                    return Err(SessionError::protocol("domain name length cannot be zero"));
                }
                TargetAddr::Domain(domain)
            }
            other => {
                return Err(SessionError::protocol(format!(
                    "unsupported address type {}",
                    other
                )))
            }
        };

        let target_port = self.stream.read_u16().await?;

        Ok(Request {
            command: Command::from_code(command),
            target_addr,
            target_port,
        })
    }

    /// Send a reply to the connection request
    pub async fn send_reply(&mut self, reply: &Reply) -> FrameResult<()> {
        self.write_frame(&reply.encode()).await
    }

    /// Mutable access to the client stream, used once the relay starts
    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Read a length-prefixed UTF-8 field
    async fn read_short_string(&mut self, field: &str) -> FrameResult<String> {
        let len = self.stream.read_u8().await? as usize;
        let mut bytes = vec![0u8; len];
        self.stream.read_exact(&mut bytes).await?;

        String::from_utf8(bytes)
            .map_err(|e| SessionError::protocol(format!("invalid UTF-8 in {}: {}", field, e)))
    }

    async fn write_frame(&mut self, frame: &[u8]) -> FrameResult<()> {
        self.stream.write_all(frame).await?;
        self.stream.flush().await?;
        Ok(())
    }
}
