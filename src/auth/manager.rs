//! Authentication Manager

use super::IdentityProvider;
use crate::control::ControlState;
use crate::protocol::Credentials;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Decide whether a credential pair is acceptable.
///
/// Valid iff the secret equals the current secret and the identity is a
/// member of the live identity set. Pure, so it can be checked in isolation.
pub fn authenticate(
    identity: &str,
    secret: &str,
    live_identities: &HashSet<String>,
    current_secret: &str,
) -> bool {
    secret == current_secret && live_identities.contains(identity)
}

/// Checks client credentials against the identity provider and the shared secret
pub struct Authenticator {
    provider: Arc<dyn IdentityProvider>,
    control: Arc<ControlState>,
}

impl Authenticator {
    /// Create a new authenticator
    pub fn new(provider: Arc<dyn IdentityProvider>, control: Arc<ControlState>) -> Self {
        Self { provider, control }
    }

    /// Authenticate a client. Provider failures count as a rejection.
    pub fn authenticate(&self, credentials: &Credentials) -> bool {
        let identities = match self.provider.current_identities() {
            Ok(identities) => identities,
            Err(e) => {
                warn!("Failed to query live identities: {}", e);
                return false;
            }
        };

        let secret = self.control.secret();
        let accepted = authenticate(
            &credentials.identity,
            &credentials.secret,
            &identities,
            &secret,
        );
        debug!(
            identity = %credentials.identity,
            accepted,
            "Authentication attempt"
        );
        accepted
    }

    /// Snapshot of the identities that would be accepted right now
    pub fn identities(&self) -> std::io::Result<HashSet<String>> {
        self.provider.current_identities()
    }
}
