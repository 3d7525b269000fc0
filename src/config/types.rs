//! Configuration Types

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{IdentityProvider, StaticIdentities, SystemInterfaces};
use crate::management::types::ApiAuthConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub monitoring: MonitoringConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Applies to DNS resolution and to each outbound connect attempt
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
    /// Bind outbound sockets to the interface named by the client identity
    pub bind_interface: bool,
}

/// Where the set of acceptable identities comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentitySource {
    /// Live network interfaces of the host
    System,
    /// The `identities` list below
    Static,
}

/// Authentication configuration
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Initial shared secret; replaceable at runtime through the management API
    pub secret: String,
    pub identity_source: IdentitySource,
    pub identities: Vec<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"<redacted>")
            .field("identity_source", &self.identity_source)
            .field("identities", &self.identities)
            .finish()
    }
}

/// Monitoring configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub log_level: String,
    /// Initial state of the per-connection log stream
    pub log_stream: bool,
    pub management_api: ManagementApiConfig,
}

/// Management API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ManagementApiConfig {
    /// Off unless configured; the API can replace the shared secret
    pub enabled: bool,
    pub bind_addr: SocketAddr,
    pub auth: ApiAuthConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 9011)),
            connect_timeout: Duration::from_secs(10),
            shutdown_timeout: Duration::from_secs(30),
            bind_interface: true,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: "password".to_string(),
            identity_source: IdentitySource::System,
            identities: vec![],
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_stream: false,
            management_api: ManagementApiConfig::default(),
        }
    }
}

impl Default for ManagementApiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 9012)),
            auth: ApiAuthConfig::default(),
        }
    }
}

impl Config {
    /// Build the identity provider selected by `auth.identity_source`
    pub fn identity_provider(&self) -> Arc<dyn IdentityProvider> {
        match self.auth.identity_source {
            IdentitySource::System => Arc::new(SystemInterfaces),
            IdentitySource::Static => Arc::new(StaticIdentities::new(self.auth.identities.clone())),
        }
    }
}
