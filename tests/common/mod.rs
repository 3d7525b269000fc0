//! Shared helpers for the integration tests: an in-process proxy, a few
//! destination servers and a raw-byte SOCKS5 client.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use ifsocks::auth::StaticIdentities;
use ifsocks::connection::ConnectionCounters;
use ifsocks::{Config, ConnectionManager, ControlState};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;

pub const IO_TIMEOUT: Duration = Duration::from_secs(5);

pub struct TestProxy {
    pub addr: SocketAddr,
    pub control: Arc<ControlState>,
    pub counters: Arc<ConnectionCounters>,
    handle: JoinHandle<()>,
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Start a proxy on an ephemeral port with a fixed identity set.
/// Interface binding is off so tests need no extra privileges.
pub async fn start_proxy(identities: &[&str], secret: &str) -> TestProxy {
    let mut config = Config::default();
    config.server.bind_addr = "127.0.0.1:0".parse().unwrap();
    config.server.connect_timeout = Duration::from_secs(2);
    config.server.bind_interface = false;

    let control = Arc::new(ControlState::new(secret, false));
    let provider = Arc::new(StaticIdentities::new(identities.iter().copied()));

    let mut manager = ConnectionManager::new(Arc::new(config), provider, Arc::clone(&control));
    let addr = manager.bind().await.unwrap();
    let counters = manager.counters();

    let handle = tokio::spawn(async move {
        let _ = manager.start().await;
    });

    TestProxy {
        addr,
        control,
        counters,
        handle,
    }
}

/// Echo server on 127.0.0.1; every accepted connection echoes until EOF
pub async fn start_echo_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (mut reader, mut writer) = stream.split();
                let _ = tokio::io::copy(&mut reader, &mut writer).await;
            });
        }
    });

    addr
}

/// Destination that hands every accepted stream and its peer address to the test
pub async fn start_capture_server() -> (SocketAddr, mpsc::Receiver<(TcpStream, SocketAddr)>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::channel(8);

    tokio::spawn(async move {
        while let Ok(accepted) = listener.accept().await {
            if tx.send(accepted).await.is_err() {
                break;
            }
        }
    });

    (addr, rx)
}

/// A port on 127.0.0.1 with nothing listening
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

pub fn credentials_frame(identity: &str, secret: &str) -> Vec<u8> {
    let mut frame = vec![1, identity.len() as u8];
    frame.extend_from_slice(identity.as_bytes());
    frame.push(secret.len() as u8);
    frame.extend_from_slice(secret.as_bytes());
    frame
}

pub fn connect_frame(target: SocketAddr) -> Vec<u8> {
    request_frame(1, target)
}

pub fn request_frame(command: u8, target: SocketAddr) -> Vec<u8> {
    let mut frame = vec![5, command, 0];
    match target {
        SocketAddr::V4(v4) => {
            frame.push(1);
            frame.extend_from_slice(&v4.ip().octets());
        }
        SocketAddr::V6(v6) => {
            frame.push(4);
            frame.extend_from_slice(&v6.ip().octets());
        }
    }
    frame.extend_from_slice(&target.port().to_be_bytes());
    frame
}

pub fn domain_connect_frame(domain: &str, port: u16) -> Vec<u8> {
    let mut frame = vec![5, 1, 0, 3, domain.len() as u8];
    frame.extend_from_slice(domain.as_bytes());
    frame.extend_from_slice(&port.to_be_bytes());
    frame
}

pub async fn read_exact_timeout<const N: usize>(stream: &mut TcpStream) -> [u8; N] {
    let mut buf = [0u8; N];
    timeout(IO_TIMEOUT, stream.read_exact(&mut buf))
        .await
        .expect("timed out waiting for proxy")
        .expect("proxy closed the connection early");
    buf
}

/// Everything the peer sends before closing
pub async fn read_until_close(stream: &mut TcpStream) -> Vec<u8> {
    let mut rest = Vec::new();
    // A reset after the proxy closes is as good as EOF here.
    let _ = timeout(IO_TIMEOUT, stream.read_to_end(&mut rest))
        .await
        .expect("proxy did not close the connection");
    rest
}

/// Greeting plus sub-negotiation; returns the sub-negotiation status byte
pub async fn authenticate(stream: &mut TcpStream, identity: &str, secret: &str) -> u8 {
    stream.write_all(&[5, 1, 2]).await.unwrap();
    assert_eq!(read_exact_timeout::<2>(stream).await, [5, 2]);

    stream
        .write_all(&credentials_frame(identity, secret))
        .await
        .unwrap();
    let [version, status] = read_exact_timeout::<2>(stream).await;
    assert_eq!(version, 1);
    status
}

/// Open a client connection and complete authentication successfully
pub async fn authenticated_client(proxy: &TestProxy, identity: &str, secret: &str) -> TcpStream {
    let mut stream = TcpStream::connect(proxy.addr).await.unwrap();
    assert_eq!(authenticate(&mut stream, identity, secret).await, 0x00);
    stream
}

/// Read an IPv4 reply: (REP, bound address, bound port)
pub async fn read_ipv4_reply(stream: &mut TcpStream) -> (u8, [u8; 4], u16) {
    let reply = read_exact_timeout::<10>(stream).await;
    assert_eq!(reply[0], 5);
    assert_eq!(reply[2], 0);
    assert_eq!(reply[3], 1);
    (
        reply[1],
        [reply[4], reply[5], reply[6], reply[7]],
        u16::from_be_bytes([reply[8], reply[9]]),
    )
}

/// Poll until the counters report no active sessions
pub async fn wait_for_idle(counters: &ConnectionCounters) {
    timeout(IO_TIMEOUT, async {
        while counters.active() > 0 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("sessions did not finish");
}
