//! Connection log stream: per-connection lines appear only while the toggle
//! is on, and the toggle is read per session.

mod common;

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use common::*;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::subscriber::DefaultGuard;

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Route this thread's events at info and above into a buffer. The
/// single-threaded test runtime polls the proxy tasks on this thread too.
fn capture_logs() -> (CapturedLogs, DefaultGuard) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();

    (logs, tracing::subscriber::set_default(subscriber))
}

/// CONNECT to `target`, push one message through and close
async fn relay_once(proxy: &TestProxy, target: SocketAddr) {
    let mut client = authenticated_client(proxy, "tun0", "password").await;
    client.write_all(&connect_frame(target)).await.unwrap();
    let (rep, _, _) = read_ipv4_reply(&mut client).await;
    assert_eq!(rep, 0x00);

    client.write_all(b"hello").await.unwrap();
    assert_eq!(&read_exact_timeout::<5>(&mut client).await, b"hello");

    drop(client);
    wait_for_idle(&proxy.counters).await;
}

/// Present a wrong secret and wait for the session to end
async fn rejected_once(proxy: &TestProxy) {
    let mut client = TcpStream::connect(proxy.addr).await.unwrap();
    assert_eq!(authenticate(&mut client, "tun0", "wrong").await, 0xff);
    read_until_close(&mut client).await;
    wait_for_idle(&proxy.counters).await;
}

#[tokio::test]
async fn test_log_stream_off_is_quiet() {
    let (logs, _guard) = capture_logs();
    let proxy = start_proxy(&["tun0"], "password").await;
    let echo = start_echo_server().await;

    relay_once(&proxy, echo).await;

    let output = logs.contents();
    assert!(!output.contains("New connection -"), "{}", output);
    assert!(!output.contains("Connected -"), "{}", output);
}

#[tokio::test]
async fn test_log_stream_on_reports_peer_and_destination() {
    let (logs, _guard) = capture_logs();
    let proxy = start_proxy(&["tun0"], "password").await;
    let echo = start_echo_server().await;
    proxy.control.set_log_stream(true);

    relay_once(&proxy, echo).await;

    let output = logs.contents();
    assert!(output.contains("New connection - 127.0.0.1:"), "{}", output);
    assert!(output.contains(&format!("Connected - {}", echo)), "{}", output);
}

#[tokio::test]
async fn test_toggle_applies_to_later_sessions() {
    let (logs, _guard) = capture_logs();
    let proxy = start_proxy(&["tun0"], "password").await;
    let echo = start_echo_server().await;

    relay_once(&proxy, echo).await;
    proxy.control.set_log_stream(true);
    relay_once(&proxy, echo).await;
    proxy.control.set_log_stream(false);
    relay_once(&proxy, echo).await;

    let output = logs.contents();
    assert_eq!(output.matches("New connection -").count(), 1, "{}", output);
    assert_eq!(output.matches("Connected -").count(), 1, "{}", output);
}

#[tokio::test]
async fn test_session_errors_surface_only_with_log_stream() {
    let (logs, _guard) = capture_logs();
    let proxy = start_proxy(&["tun0"], "password").await;

    rejected_once(&proxy).await;
    assert!(!logs.contents().contains("Session failed"));

    proxy.control.set_log_stream(true);
    rejected_once(&proxy).await;

    let output = logs.contents();
    assert!(output.contains("Session failed"), "{}", output);
    assert!(output.contains("WARN"), "{}", output);
}
