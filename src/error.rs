//! Session Error Taxonomy
//!
//! Every failure that can end a SOCKS5 session. None of these ever leave the
//! task that owns the session; the acceptor only logs them.

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    /// Malformed frame or wrong protocol version.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Bad secret or identity not present in the live identity set.
    #[error("authentication failed for identity {identity:?}")]
    AuthFailure { identity: String },

    /// Outbound connect failed (refused, unreachable, timeout, DNS, interface bind).
    #[error("failed to connect to {target}: {source}")]
    Destination {
        target: String,
        #[source]
        source: io::Error,
    },

    /// Read or write failure on either socket.
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),
}

impl SessionError {
    pub fn protocol(message: impl Into<String>) -> Self {
        SessionError::Protocol(message.into())
    }

    /// Short label used as a structured logging field.
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::Protocol(_) => "protocol",
            SessionError::AuthFailure { .. } => "auth",
            SessionError::Destination { .. } => "destination",
            SessionError::Transport(_) => "transport",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_errors_become_transport_errors() {
        let err: SessionError = io::Error::from(io::ErrorKind::UnexpectedEof).into();
        assert!(matches!(err, SessionError::Transport(_)));
        assert_eq!(err.kind(), "transport");
    }

    #[test]
    fn test_destination_error_display() {
        let err = SessionError::Destination {
            target: "example.com:443".to_string(),
            source: io::Error::from(io::ErrorKind::ConnectionRefused),
        };
        assert!(err.to_string().starts_with("failed to connect to example.com:443"));
        assert_eq!(err.kind(), "destination");
    }
}
