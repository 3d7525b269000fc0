//! Runtime Control State
//!
//! The two values an operator may change while the proxy is running: the
//! shared secret every client must present, and the log-stream toggle that
//! turns on per-connection event lines. Sessions read both without locking,
//! so a reader racing an update sees either the old or the new value.

use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

pub struct ControlState {
    secret: ArcSwap<String>,
    log_stream: AtomicBool,
}

impl ControlState {
    /// Create control state with an initial secret and log-stream setting
    pub fn new(secret: impl Into<String>, log_stream: bool) -> Self {
        Self {
            secret: ArcSwap::from_pointee(secret.into()),
            log_stream: AtomicBool::new(log_stream),
        }
    }

    /// The secret in effect right now
    pub fn secret(&self) -> Arc<String> {
        self.secret.load_full()
    }

    /// Replace the shared secret. Sessions that already authenticated are unaffected.
    pub fn set_secret(&self, secret: impl Into<String>) {
        self.secret.store(Arc::new(secret.into()));
        info!("Shared secret replaced");
    }

    pub fn log_stream(&self) -> bool {
        self.log_stream.load(Ordering::Relaxed)
    }

    pub fn set_log_stream(&self, enabled: bool) {
        let previous = self.log_stream.swap(enabled, Ordering::Relaxed);
        if previous != enabled {
            info!("Connection log stream {}", if enabled { "enabled" } else { "disabled" });
        }
    }
}

impl std::fmt::Debug for ControlState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlState")
            .field("secret", &"<redacted>")
            .field("log_stream", &self.log_stream())
            .finish()
    }
}
