//! Connection Manager Implementation
//!
//! Owns the listening socket, spawns one task per accepted client and keeps
//! the session counters the management API reports.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::time::Duration;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::session::{Session, SessionContext, SessionOutcome};
use crate::auth::{Authenticator, IdentityProvider};
use crate::config::Config;
use crate::control::ControlState;
use crate::relay::RelayEngine;
use crate::Result;

/// Session counters shared with the management API
#[derive(Debug, Default)]
pub struct ConnectionCounters {
    active: AtomicUsize,
    total: AtomicU64,
}

impl ConnectionCounters {
    pub fn active(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> ConnectionStats {
        ConnectionStats {
            active_connections: self.active(),
            total_connections_served: self.total(),
        }
    }

    fn open(self: &Arc<Self>) -> ActiveConnectionGuard {
        self.active.fetch_add(1, Ordering::Relaxed);
        self.total.fetch_add(1, Ordering::Relaxed);
        ActiveConnectionGuard {
            counters: Arc::clone(self),
        }
    }
}

/// Decrements the active count when the session task ends, however it ends
struct ActiveConnectionGuard {
    counters: Arc<ConnectionCounters>,
}

impl Drop for ActiveConnectionGuard {
    fn drop(&mut self) {
        self.counters.active.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Connection statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConnectionStats {
    pub active_connections: usize,
    pub total_connections_served: u64,
}

/// Accepts SOCKS5 clients and runs a session for each
pub struct ConnectionManager {
    listener: Option<TcpListener>,
    config: Arc<Config>,
    context: SessionContext,
    counters: Arc<ConnectionCounters>,
    shutdown_flag: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl ConnectionManager {
    /// Create a new ConnectionManager
    pub fn new(
        config: Arc<Config>,
        identities: Arc<dyn IdentityProvider>,
        control: Arc<ControlState>,
    ) -> Self {
        let authenticator = Arc::new(Authenticator::new(identities, Arc::clone(&control)));
        let relay_engine = Arc::new(RelayEngine::from_config(&config));
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            listener: None,
            config,
            context: SessionContext {
                authenticator,
                control,
                relay_engine,
            },
            counters: Arc::new(ConnectionCounters::default()),
            shutdown_flag: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    /// Bind the listening socket without accepting yet
    pub async fn bind(&mut self) -> Result<SocketAddr> {
        let bind_addr = self.config.server.bind_addr;

        info!("Binding TCP listener to {}", bind_addr);
        let listener = TcpListener::bind(bind_addr).await?;
        let local_addr = listener.local_addr()?;
        info!("Successfully bound to {}", local_addr);

        self.listener = Some(listener);
        Ok(local_addr)
    }

    /// Start the connection manager and begin accepting connections
    pub async fn start(&mut self) -> Result<()> {
        if self.listener.is_none() {
            self.bind().await?;
        }
        self.accept_connections().await
    }

    /// Main connection acceptance loop
    async fn accept_connections(&self) -> Result<()> {
        let listener = self
            .listener
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Listener not initialized"))?;

        info!("Starting connection acceptance loop");
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            if self.shutdown_flag.load(Ordering::Relaxed) {
                info!("Shutdown flag set, stopping connection acceptance");
                break;
            }

            tokio::select! {
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, addr)) => {
                            if self.shutdown_flag.load(Ordering::Relaxed) {
                                debug!("Rejecting connection from {} due to shutdown", addr);
                                continue;
                            }
                            self.spawn_session(stream, addr);
                        }
                        Err(e) => {
                            error!("Error accepting connection: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Received shutdown signal, stopping connection acceptance");
                    self.shutdown_flag.store(true, Ordering::Relaxed);
                    break;
                }
            }
        }

        info!("Connection acceptance loop stopped");
        Ok(())
    }

    /// Run a session on its own task. Nothing it does can reach the acceptor.
    fn spawn_session(&self, stream: TcpStream, addr: SocketAddr) {
        let session_id = Uuid::new_v4();
        let span = info_span!("session", session_id = %session_id, peer = %addr);
        let context = self.context.clone();
        let counters = Arc::clone(&self.counters);

        tokio::spawn(
            async move {
                let _guard = counters.open();
                let started = Instant::now();
                let control = Arc::clone(&context.control);

                if let Err(e) = stream.set_nodelay(true) {
                    debug!("Failed to set TCP_NODELAY: {}", e);
                }

                match Session::new(stream, addr, context).run().await {
                    Ok(SessionOutcome::Relayed(_)) => {}
                    Ok(outcome) => debug!(?outcome, "Session closed without relaying"),
                    Err(e) if control.log_stream() => {
                        warn!(kind = e.kind(), "Session failed: {}", e)
                    }
                    Err(e) => debug!(kind = e.kind(), "Session failed: {}", e),
                }

                debug!("Connection closed after {:?}", started.elapsed());
            }
            .instrument(span),
        );
    }

    /// Get the number of active connections
    pub fn get_active_connections(&self) -> usize {
        self.counters.active()
    }

    /// Counters to hand to the management API
    pub fn counters(&self) -> Arc<ConnectionCounters> {
        Arc::clone(&self.counters)
    }

    /// Initiate graceful shutdown
    pub fn initiate_shutdown(&self) {
        info!("Initiating graceful shutdown of connection manager");
        self.shutdown_flag.store(true, Ordering::Relaxed);

        if let Err(e) = self.shutdown_tx.send(()) {
            debug!("No acceptor listening for shutdown: {}", e);
        }
    }

    /// Wait for in-flight sessions to finish, up to the configured timeout
    pub async fn wait_for_connections_to_close(&self) -> Result<()> {
        let shutdown_timeout = self.config.server.shutdown_timeout;
        let start_time = Instant::now();

        info!(
            "Waiting for {} active connections to close (timeout: {})",
            self.get_active_connections(),
            humantime::format_duration(shutdown_timeout)
        );

        while self.get_active_connections() > 0 && start_time.elapsed() < shutdown_timeout {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        let remaining = self.get_active_connections();
        if remaining == 0 {
            info!("All connections closed gracefully in {:?}", start_time.elapsed());
        } else {
            warn!(
                "Shutdown timeout reached with {} connections still active",
                remaining
            );
        }

        Ok(())
    }

    /// Gracefully shutdown the connection manager
    pub async fn shutdown(&self) -> Result<()> {
        self.initiate_shutdown();
        self.wait_for_connections_to_close().await
    }
}
