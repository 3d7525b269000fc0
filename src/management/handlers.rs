//! Management API Handlers

use super::types::*;
use crate::auth::IdentityProvider;
use crate::config::validate_secret;
use crate::connection::ConnectionCounters;
use crate::control::ControlState;
use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{error, info};

/// Shared application state for handlers
#[derive(Clone)]
pub struct AppState {
    pub control: Arc<ControlState>,
    pub identities: Arc<dyn IdentityProvider>,
    pub counters: Arc<ConnectionCounters>,
    pub start_time: SystemTime,
}

type ApiResult<T> = (StatusCode, Json<ApiResponse<T>>);

fn ok<T>(data: T) -> ApiResult<T> {
    (StatusCode::OK, Json(ApiResponse::success(data)))
}

fn fail<T>(status: StatusCode, message: String) -> ApiResult<T> {
    (status, Json(ApiResponse::error(message)))
}

/// Health check handler
pub async fn health_check() -> Json<ApiResponse<HealthStatus>> {
    Json(ApiResponse::success(HealthStatus {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

/// Get server status
pub async fn get_server_status(State(state): State<AppState>) -> Json<ApiResponse<ServerStatus>> {
    let uptime = SystemTime::now()
        .duration_since(state.start_time)
        .unwrap_or_default()
        .as_secs();

    let sessions = state.counters.snapshot();

    Json(ApiResponse::success(ServerStatus {
        uptime_seconds: uptime,
        active_sessions: sessions.active_connections,
        total_sessions: sessions.total_connections_served,
        log_stream: state.control.log_stream(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

/// List the identities that would be accepted right now
pub async fn get_identities(State(state): State<AppState>) -> ApiResult<IdentityList> {
    match state.identities.current_identities() {
        Ok(identities) => {
            let mut identities: Vec<String> = identities.into_iter().collect();
            identities.sort();
            ok(IdentityList { identities })
        }
        Err(e) => {
            error!("Failed to query identities: {}", e);
            fail(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to query identities: {}", e),
            )
        }
    }
}

/// Replace the shared secret
pub async fn update_secret(
    State(state): State<AppState>,
    Json(request): Json<SecretUpdateRequest>,
) -> ApiResult<String> {
    if let Err(e) = validate_secret(&request.secret) {
        return fail(StatusCode::BAD_REQUEST, e.to_string());
    }

    state.control.set_secret(request.secret);
    info!("Shared secret updated via management API");
    ok("secret updated".to_string())
}

/// Current state of the connection log stream
pub async fn get_log_stream(State(state): State<AppState>) -> Json<ApiResponse<LogStreamState>> {
    Json(ApiResponse::success(LogStreamState {
        enabled: state.control.log_stream(),
    }))
}

/// Turn the connection log stream on or off
pub async fn update_log_stream(
    State(state): State<AppState>,
    Json(request): Json<LogStreamState>,
) -> Json<ApiResponse<LogStreamState>> {
    state.control.set_log_stream(request.enabled);
    Json(ApiResponse::success(LogStreamState {
        enabled: state.control.log_stream(),
    }))
}
