//! Management API Module
//!
//! Operator REST API for replacing the shared secret, toggling the
//! connection log stream and inspecting live sessions.

pub mod api;
pub mod auth;
pub mod handlers;
pub mod server;
pub mod types;

pub use api::ManagementApi;
pub use auth::ApiAuth;
pub use handlers::AppState;
pub use server::ManagementServer;
pub use types::*;
