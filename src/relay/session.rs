//! Relay Statistics

use std::time::{Duration, Instant};
use tracing::info;

/// Byte counts for one relayed connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayStats {
    /// Client to destination
    pub bytes_up: u64,
    /// Destination to client
    pub bytes_down: u64,
    pub duration: Duration,
}

impl RelayStats {
    pub fn total_bytes(&self) -> u64 {
        self.bytes_up + self.bytes_down
    }

    /// Log the totals at the end of a session
    pub fn log(&self, destination: &str) {
        info!(
            destination = %destination,
            bytes_up = self.bytes_up,
            bytes_down = self.bytes_down,
            total_bytes = self.total_bytes(),
            duration = %humantime::format_duration(self.duration),
            "Relay finished"
        );
    }
}

/// Running counters while the pump is active
#[derive(Debug)]
pub(crate) struct RelayCounters {
    started: Instant,
    bytes_up: u64,
    bytes_down: u64,
}

impl RelayCounters {
    pub(crate) fn start() -> Self {
        Self {
            started: Instant::now(),
            bytes_up: 0,
            bytes_down: 0,
        }
    }

    pub(crate) fn add_up(&mut self, bytes: usize) {
        self.bytes_up += bytes as u64;
    }

    pub(crate) fn add_down(&mut self, bytes: usize) {
        self.bytes_down += bytes as u64;
    }

    pub(crate) fn finish(self) -> RelayStats {
        RelayStats {
            bytes_up: self.bytes_up,
            bytes_down: self.bytes_down,
            duration: self.started.elapsed(),
        }
    }
}
