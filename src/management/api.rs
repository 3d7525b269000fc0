//! Management API Routes

use super::{
    auth::{auth_middleware, ApiAuth},
    handlers::*,
    types::ApiAuthConfig,
};
use axum::{
    middleware,
    routing::{get, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Management API router
pub struct ManagementApi;

impl ManagementApi {
    /// Create the management API router
    pub fn create_router(state: AppState, auth_config: ApiAuthConfig) -> Router {
        let auth = Arc::new(ApiAuth::new(auth_config));

        let public_routes = Router::new().route("/health", get(health_check));

        let protected_routes = Router::new()
            .route("/status", get(get_server_status))
            .route("/identities", get(get_identities))
            .route("/secret", put(update_secret))
            .route("/log-stream", get(get_log_stream).put(update_log_stream))
            .layer(middleware::from_fn_with_state(auth, auth_middleware))
            .with_state(state);

        Router::new()
            .nest("/api/v1", public_routes.merge(protected_routes))
            .layer(TraceLayer::new_for_http())
    }
}
