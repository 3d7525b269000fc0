//! SOCKS5 Session State Machine
//!
//! One session per accepted client connection:
//!
//! ```text
//! Greeting -> Authenticated -> RequestReceived -> Relaying -> Closed
//! ```
//!
//! Any stage may jump straight to `Closed`; errors pass through `Failed`
//! first. The session owns its client socket and, once connected, the
//! destination socket; both are closed when `run` returns.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

use crate::auth::Authenticator;
use crate::control::ControlState;
use crate::error::SessionError;
use crate::protocol::{Command, Reply, Request, Socks5Handler, SOCKS5_AUTH_USERPASS};
use crate::relay::{RelayEngine, RelayStats};

/// Where a session is in its lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Greeting,
    Authenticated { identity: String },
    RequestReceived { identity: String },
    Relaying { identity: String },
    Failed,
    Closed,
}

/// How a session ended when no error occurred
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Client did not offer username/password; closed without a reply
    NoAcceptableMethod,
    /// Request carried a command other than CONNECT; closed without a reply
    UnsupportedCommand(u8),
    /// Relay ran until one side closed
    Relayed(RelayStats),
}

/// Shared collaborators every session needs
#[derive(Clone)]
pub struct SessionContext {
    pub authenticator: Arc<Authenticator>,
    pub control: Arc<ControlState>,
    pub relay_engine: Arc<RelayEngine>,
}

/// A single client session
pub struct Session<S> {
    peer: SocketAddr,
    handler: Socks5Handler<S>,
    state: SessionState,
    context: SessionContext,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, peer: SocketAddr, context: SessionContext) -> Self {
        Self {
            peer,
            handler: Socks5Handler::new(stream),
            state: SessionState::Greeting,
            context,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Drive the session to completion
    pub async fn run(mut self) -> Result<SessionOutcome, SessionError> {
        if self.context.control.log_stream() {
            info!("New connection - {}:{}", self.peer.ip(), self.peer.port());
        }

        let result = self.drive().await;
        if result.is_err() {
            self.transition(SessionState::Failed);
        }
        self.transition(SessionState::Closed);
        result
    }

    async fn drive(&mut self) -> Result<SessionOutcome, SessionError> {
        let greeting = self.handler.read_greeting().await?;
        if !greeting.offers(SOCKS5_AUTH_USERPASS) {
            debug!(methods = ?greeting.methods, "No acceptable authentication method");
            return Ok(SessionOutcome::NoAcceptableMethod);
        }
        self.handler.send_method_selection(SOCKS5_AUTH_USERPASS).await?;

        let identity = self.authenticate().await?;
        self.transition(SessionState::Authenticated {
            identity: identity.clone(),
        });

        let request = self.handler.read_request().await?;
        self.transition(SessionState::RequestReceived {
            identity: identity.clone(),
        });

        if request.command != Command::Connect {
            debug!(command = request.command.code(), "Unsupported command");
            return Ok(SessionOutcome::UnsupportedCommand(request.command.code()));
        }

        self.connect_and_relay(&request, identity).await
    }

    /// Sub-negotiation. Replies success or failure, failure ends the session.
    async fn authenticate(&mut self) -> Result<String, SessionError> {
        let credentials = self.handler.read_credentials().await?;
        let accepted = self.context.authenticator.authenticate(&credentials);
        self.handler.send_auth_status(accepted).await?;

        if accepted {
            Ok(credentials.identity)
        } else {
            Err(SessionError::AuthFailure {
                identity: credentials.identity,
            })
        }
    }

    async fn connect_and_relay(
        &mut self,
        request: &Request,
        identity: String,
    ) -> Result<SessionOutcome, SessionError> {
        let destination = request.destination();
        let engine = Arc::clone(&self.context.relay_engine);

        let connected = engine
            .connect_to_target(&request.target_addr, request.target_port, &identity)
            .await
            .and_then(|stream| stream.local_addr().map(|bound| (stream, bound)));

        let (mut target, bound) = match connected {
            Ok(connected) => connected,
            Err(source) => {
                let reply = Reply::failure(request.target_addr.address_type());
                if let Err(e) = self.handler.send_reply(&reply).await {
                    debug!("Failed to send failure reply: {}", e);
                }
                return Err(SessionError::Destination {
                    target: destination,
                    source,
                });
            }
        };

        self.handler.send_reply(&Reply::success(bound)).await?;
        if self.context.control.log_stream() {
            info!("Connected - {}", destination);
        }

        self.transition(SessionState::Relaying { identity });
        let stats = engine.relay(self.handler.stream_mut(), &mut target).await?;
        stats.log(&destination);

        Ok(SessionOutcome::Relayed(stats))
    }

    fn transition(&mut self, next: SessionState) {
        debug!(from = ?self.state, to = ?next, "Session state change");
        self.state = next;
    }
}
