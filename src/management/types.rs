//! Management API Types

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: SystemTime,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: SystemTime::now(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: SystemTime::now(),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
}

/// Server status information
#[derive(Debug, Serialize, Deserialize)]
pub struct ServerStatus {
    pub uptime_seconds: u64,
    pub active_sessions: usize,
    pub total_sessions: u64,
    pub log_stream: bool,
    pub version: String,
}

/// Identities a client may currently authenticate as
#[derive(Debug, Serialize, Deserialize)]
pub struct IdentityList {
    pub identities: Vec<String>,
}

/// Shared secret replacement request
#[derive(Deserialize)]
pub struct SecretUpdateRequest {
    pub secret: String,
}

/// Log-stream toggle, used both as request and response body
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LogStreamState {
    pub enabled: bool,
}

/// API authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiAuthConfig {
    pub enabled: bool,
    pub api_key: Option<String>,
    pub basic_auth: Option<BasicAuthConfig>,
}

/// Basic authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BasicAuthConfig {
    pub username: String,
    pub password: String,
}

/// Key shipped in the default configuration; startup warns when it is still in use
pub const DEFAULT_API_KEY: &str = "default-api-key-change-me";

impl Default for ApiAuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: Some(DEFAULT_API_KEY.to_string()),
            basic_auth: None,
        }
    }
}
