//! Management API Server

use super::{
    api::ManagementApi,
    handlers::AppState,
    types::{ApiAuthConfig, DEFAULT_API_KEY},
};
use crate::auth::IdentityProvider;
use crate::connection::ConnectionCounters;
use crate::control::ControlState;
use crate::Result;
use anyhow::Context;
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Management API server
pub struct ManagementServer {
    bind_addr: SocketAddr,
    app_state: AppState,
    auth_config: ApiAuthConfig,
}

impl ManagementServer {
    /// Create a new management server
    pub fn new(
        bind_addr: SocketAddr,
        control: Arc<ControlState>,
        identities: Arc<dyn IdentityProvider>,
        counters: Arc<ConnectionCounters>,
        auth_config: ApiAuthConfig,
    ) -> Self {
        let app_state = AppState {
            control,
            identities,
            counters,
            start_time: SystemTime::now(),
        };

        Self {
            bind_addr,
            app_state,
            auth_config,
        }
    }

    /// Start the management API server; returns once `shutdown` resolves
    pub async fn start<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!("Starting management API server on {}", self.bind_addr);
        if !self.auth_config.enabled {
            warn!("Management API authentication is disabled");
        } else if self.auth_config.api_key.as_deref() == Some(DEFAULT_API_KEY) {
            warn!("Management API is using the default API key; set monitoring.management_api.auth.api_key");
        }

        let app = self.router();

        let listener = TcpListener::bind(self.bind_addr)
            .await
            .with_context(|| format!("Failed to bind management API server to {}", self.bind_addr))?;

        info!("Management API server listening on {}", self.bind_addr);

        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await;
        if let Err(e) = served {
            error!("Management API server error: {}", e);
            return Err(e.into());
        }

        Ok(())
    }

    /// Build the router this server would serve
    pub fn router(&self) -> Router {
        ManagementApi::create_router(self.app_state.clone(), self.auth_config.clone())
    }
}
