//! Relay Engine
//!
//! Opens the outbound connection for a CONNECT request, pinned to the
//! client's interface, and pumps bytes between the two sockets until either
//! side closes.

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{lookup_host, TcpSocket, TcpStream};
use tokio::time::timeout;
use tracing::{debug, warn};

use super::session::{RelayCounters, RelayStats};
use crate::config::Config;
use crate::protocol::types::TargetAddr;

/// Size of the read buffer for each direction
pub const RELAY_BUFFER_SIZE: usize = 4096;

/// Establishes outbound connections and relays data
#[derive(Debug, Clone)]
pub struct RelayEngine {
    connect_timeout: Duration,
    bind_interface: bool,
}

/// Which side a completed read came from
enum Transfer {
    Upstream(io::Result<usize>),
    Downstream(io::Result<usize>),
}

impl RelayEngine {
    /// Create a new relay engine
    pub fn new(connect_timeout: Duration, bind_interface: bool) -> Self {
        Self {
            connect_timeout,
            bind_interface,
        }
    }

    /// Create a new relay engine from configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.server.connect_timeout, config.server.bind_interface)
    }

    /// Establish connection to the destination.
    ///
    /// Domains are resolved and each address is tried in turn. When interface
    /// binding is on, every attempt egresses through `interface`.
    pub async fn connect_to_target(
        &self,
        target_addr: &TargetAddr,
        port: u16,
        interface: &str,
    ) -> io::Result<TcpStream> {
        let socket_addrs = self.resolve_target_address(target_addr, port).await?;

        let mut last_error = None;
        for addr in socket_addrs {
            match self.try_connect_to_address(addr, interface).await {
                Ok(stream) => {
                    debug!("Connected to {} via {}", addr, interface);
                    return Ok(stream);
                }
                Err(e) => {
                    debug!("Failed to connect to {}: {}", addr, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "no addresses resolved")
        }))
    }

    /// Resolve target address to socket addresses
    async fn resolve_target_address(
        &self,
        target_addr: &TargetAddr,
        port: u16,
    ) -> io::Result<Vec<SocketAddr>> {
        match target_addr {
            TargetAddr::Ipv4(ip) => Ok(vec![SocketAddr::new(IpAddr::V4(*ip), port)]),
            TargetAddr::Ipv6(ip) => Ok(vec![SocketAddr::new(IpAddr::V6(*ip), port)]),
            TargetAddr::Domain(domain) => {
                let lookup = lookup_host((domain.as_str(), port));
                match timeout(self.connect_timeout, lookup).await {
                    Ok(Ok(addrs)) => {
                        let resolved: Vec<SocketAddr> = addrs.collect();
                        debug!("Resolved {} to {} addresses", domain, resolved.len());
                        Ok(resolved)
                    }
                    Ok(Err(e)) => {
                        warn!("DNS resolution failed for {}: {}", domain, e);
                        Err(e)
                    }
                    Err(_) => Err(io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("DNS resolution timed out for {}", domain),
                    )),
                }
            }
        }
    }

    /// Try to connect to a specific socket address
    async fn try_connect_to_address(
        &self,
        addr: SocketAddr,
        interface: &str,
    ) -> io::Result<TcpStream> {
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };

        if self.bind_interface {
            bind_to_interface(&socket, interface)?;
        }

        match timeout(self.connect_timeout, socket.connect(addr)).await {
            Ok(result) => result,
            Err(_) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("connect to {} timed out", addr),
            )),
        }
    }

    /// Copy bytes in both directions until either side reaches EOF or fails.
    ///
    /// Each read is forwarded in full before the next read on that side.
    /// Both sockets are shut down on exit.
    pub async fn relay<C, T>(&self, client: &mut C, target: &mut T) -> io::Result<RelayStats>
    where
        C: AsyncRead + AsyncWrite + Unpin,
        T: AsyncRead + AsyncWrite + Unpin,
    {
        let mut up = [0u8; RELAY_BUFFER_SIZE];
        let mut down = [0u8; RELAY_BUFFER_SIZE];
        let mut counters = RelayCounters::start();

        let outcome = loop {
            let transfer = tokio::select! {
                read = client.read(&mut up) => Transfer::Upstream(read),
                read = target.read(&mut down) => Transfer::Downstream(read),
            };

            match transfer {
                Transfer::Upstream(Ok(0)) | Transfer::Downstream(Ok(0)) => break Ok(()),
                Transfer::Upstream(Ok(n)) => {
                    if let Err(e) = target.write_all(&up[..n]).await {
                        break Err(e);
                    }
                    counters.add_up(n);
                }
                Transfer::Downstream(Ok(n)) => {
                    if let Err(e) = client.write_all(&down[..n]).await {
                        break Err(e);
                    }
                    counters.add_down(n);
                }
                Transfer::Upstream(Err(e)) | Transfer::Downstream(Err(e)) => break Err(e),
            }
        };

        let _ = client.shutdown().await;
        let _ = target.shutdown().await;

        outcome.map(|()| counters.finish())
    }
}

#[cfg(any(target_os = "linux", target_os = "android", target_os = "fuchsia"))]
fn bind_to_interface(socket: &TcpSocket, interface: &str) -> io::Result<()> {
    socket.bind_device(Some(interface.as_bytes()))
}

#[cfg(not(any(target_os = "linux", target_os = "android", target_os = "fuchsia")))]
fn bind_to_interface(_socket: &TcpSocket, interface: &str) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("cannot bind to interface {} on this platform", interface),
    ))
}
