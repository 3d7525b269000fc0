//! Management API Integration Tests

use std::collections::HashSet;
use std::io;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use ifsocks::{
    auth::{IdentityProvider, StaticIdentities},
    connection::ConnectionCounters,
    management::{
        types::{ApiAuthConfig, ApiResponse, IdentityList, LogStreamState, ServerStatus},
        ManagementServer,
    },
    ControlState,
};
use serde::de::DeserializeOwned;
use tower::ServiceExt;

const API_KEY: &str = "test-key";

fn server_with(identities: Arc<dyn IdentityProvider>) -> (ManagementServer, Arc<ControlState>) {
    let control = Arc::new(ControlState::new("password", false));
    let auth_config = ApiAuthConfig {
        enabled: true,
        api_key: Some(API_KEY.to_string()),
        basic_auth: None,
    };

    let server = ManagementServer::new(
        "127.0.0.1:0".parse().unwrap(),
        Arc::clone(&control),
        identities,
        Arc::new(ConnectionCounters::default()),
        auth_config,
    );
    (server, control)
}

fn test_router() -> (Router, Arc<ControlState>) {
    let (server, control) = server_with(Arc::new(StaticIdentities::new(["wg0", "tun0"])));
    (server.router(), control)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-api-key", API_KEY)
        .body(Body::empty())
        .unwrap()
}

fn put_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header("x-api-key", API_KEY)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn read_json<T: DeserializeOwned>(response: axum::response::Response) -> ApiResponse<T> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_is_public() {
    let (app, _) = test_router();

    let request = Request::builder()
        .uri("/api/v1/health")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_protected_routes_require_api_key() {
    let (app, _) = test_router();

    let request = Request::builder()
        .uri("/api/v1/status")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_status_reports_sessions_and_log_stream() {
    let (app, control) = test_router();
    control.set_log_stream(true);

    let response = app.oneshot(get("/api/v1/status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: ApiResponse<ServerStatus> = read_json(response).await;
    let status = body.data.unwrap();
    assert!(status.log_stream);
    assert_eq!(status.active_sessions, 0);
    assert_eq!(status.total_sessions, 0);
}

#[tokio::test]
async fn test_identities_are_sorted() {
    let (app, _) = test_router();

    let response = app.oneshot(get("/api/v1/identities")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: ApiResponse<IdentityList> = read_json(response).await;
    assert_eq!(body.data.unwrap().identities, vec!["tun0", "wg0"]);
}

#[tokio::test]
async fn test_identity_provider_failure_is_server_error() {
    let failing = || Err::<HashSet<String>, _>(io::Error::from(io::ErrorKind::PermissionDenied));
    let (server, _) = server_with(Arc::new(failing));

    let response = server
        .router()
        .oneshot(get("/api/v1/identities"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: ApiResponse<IdentityList> = read_json(response).await;
    assert!(!body.success);
    assert!(body.error.is_some());
}

#[tokio::test]
async fn test_secret_update() {
    let (app, control) = test_router();

    let response = app
        .oneshot(put_json("/api/v1/secret", r#"{"secret": "rotated"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(control.secret().as_str(), "rotated");

    // The new secret is never echoed back.
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(!String::from_utf8_lossy(&bytes).contains("rotated"));
}

#[tokio::test]
async fn test_empty_secret_rejected() {
    let (app, control) = test_router();

    let response = app
        .oneshot(put_json("/api/v1/secret", r#"{"secret": ""}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(control.secret().as_str(), "password");
}

#[tokio::test]
async fn test_log_stream_toggle() {
    let (app, control) = test_router();

    let response = app
        .clone()
        .oneshot(put_json("/api/v1/log-stream", r#"{"enabled": true}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(control.log_stream());

    let response = app.oneshot(get("/api/v1/log-stream")).await.unwrap();
    let body: ApiResponse<LogStreamState> = read_json(response).await;
    assert!(body.data.unwrap().enabled);
}
