//! HTTP router and handlers

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    BoxError, Extension, Json, Router,
    body::{Body, Bytes},
    error_handling::HandleErrorLayer,
    extract::State,
    http::{HeaderMap, header::CONTENT_LENGTH},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use serde_json::{Value, json};
use tower::{
    ServiceBuilder,
    timeout::{TimeoutLayer, error::Elapsed},
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::debug;

use super::auth::{AuthContext, auth_middleware};
use super::cors::cors_middleware;
use super::credentials::CredentialSet;
use super::tools::{self, ToolInvocation, ToolResult};
use crate::config::{Config, ServerConfig};
use crate::{Error, Result, SERVER_DESCRIPTION, SERVER_NAME, timestamp};

/// Shared application state
#[derive(Debug)]
pub struct AppState {
    /// Valid credentials, read-only for the lifetime of the process
    pub credentials: Arc<CredentialSet>,
    /// Maximum accepted `/execute` body size (bytes)
    pub max_body_size: usize,
    /// Per-request deadline
    pub request_timeout: Duration,
}

impl AppState {
    /// State with default server limits
    #[must_use]
    pub fn new(credentials: CredentialSet) -> Self {
        Self::with_limits(credentials, &ServerConfig::default())
    }

    /// State built from the loaded configuration
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::with_limits(config.credential_set(), &config.server)
    }

    fn with_limits(credentials: CredentialSet, server: &ServerConfig) -> Self {
        Self {
            credentials: Arc::new(credentials),
            max_body_size: server.max_body_size,
            request_timeout: server.request_timeout,
        }
    }
}

/// Create the router
///
/// Layer order, outermost first: request id, tracing, CORS (answers
/// preflights), panic guard, timeout, authorization, then the route table.
/// Only GET and POST are routed; `get` would otherwise also answer HEAD.
pub fn create_router(state: Arc<AppState>) -> Router {
    let credentials = Arc::clone(&state.credentials);
    let request_timeout = state.request_timeout;

    Router::new()
        .route(
            "/",
            get(root_handler).head(not_found_handler).fallback(not_found_handler),
        )
        .route(
            "/health",
            get(health_handler).head(not_found_handler).fallback(not_found_handler),
        )
        .route(
            "/tools",
            get(tools_handler).head(not_found_handler).fallback(not_found_handler),
        )
        .route(
            "/auth-test",
            get(auth_test_handler).head(not_found_handler).fallback(not_found_handler),
        )
        .route(
            "/execute",
            post(execute_handler).fallback(not_found_handler),
        )
        .fallback(not_found_handler)
        .layer(middleware::from_fn_with_state(credentials, auth_middleware))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(timeout_response))
                .layer(TimeoutLayer::new(request_timeout)),
        )
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::from_fn(cors_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}

/// GET / - server metadata
async fn root_handler() -> impl IntoResponse {
    Json(json!({
        "name": SERVER_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "description": SERVER_DESCRIPTION,
        "authorization_methods": [
            "Authorization header (Bearer <token>)",
            "Authorization header (ApiKey <key>)",
            "Authorization header (<key>)",
            "URL parameter (?key=<key>)",
            "URL parameter (?auth=<key>)"
        ],
        "endpoints": {
            "/": "Server information",
            "/health": "Health check",
            "/tools": "Available tools",
            "/auth-test": "Test authorization",
            "/execute": "Execute a tool (POST)"
        }
    }))
}

/// GET /health - liveness
async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": timestamp(),
        "authorized": true
    }))
}

/// GET /tools - static tool registry
async fn tools_handler() -> impl IntoResponse {
    Json(json!({ "tools": tools::registry() }))
}

/// GET /auth-test - how the gate saw this request
async fn auth_test_handler(Extension(auth): Extension<AuthContext>) -> impl IntoResponse {
    Json(json!({
        "authorized": true,
        "method_used": auth.source.as_str(),
        "key_present": auth.key_present,
        "key_valid": auth.key_valid()
    }))
}

/// POST /execute - parse the body and dispatch to a tool
async fn execute_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<ToolResult>> {
    let bytes = read_body(&headers, body, state.max_body_size).await?;

    let value: Value = serde_json::from_slice(&bytes).map_err(|e| {
        debug!(error = %e, "Rejecting /execute body");
        Error::bad_request("Invalid JSON in request body")
    })?;

    let invocation = ToolInvocation::from_json(value)?;
    let result = tools::execute(&invocation, &auth)?;
    Ok(Json(result))
}

/// Unknown path, or a known path with an unsupported method
async fn not_found_handler() -> Error {
    Error::not_found()
}

/// Map a deadline overrun into the 408 envelope
async fn timeout_response(err: BoxError) -> Error {
    if err.is::<Elapsed>() {
        debug!("Request deadline elapsed");
        Error::Timeout
    } else {
        Error::Internal(format!("Unhandled middleware error: {err}"))
    }
}

/// Read the request body, refusing anything over `limit`.
///
/// A declared `Content-Length` above the limit is rejected before reading;
/// undeclared bodies are cut off once they cross it.
async fn read_body(headers: &HeaderMap, body: Body, limit: usize) -> Result<Bytes> {
    let declared = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    if let Some(size) = declared {
        if size > u64::try_from(limit).unwrap_or(u64::MAX) {
            return Err(Error::PayloadTooLarge { limit });
        }
    }

    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            Err(Error::PayloadTooLarge { limit })
        }
        Err(e) => Err(Error::Internal(format!("Failed to read request body: {e}"))),
    }
}

/// Turn a handler panic into the 500 envelope
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| panic.downcast_ref::<&str>().map(|s| (*s).to_string()))
        .unwrap_or_else(|| "unknown panic payload".to_string());
    Error::Internal(format!("Handler panicked: {detail}")).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn read_body_rejects_declared_oversize() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, "2048".parse().unwrap());
        let err = read_body(&headers, Body::from("{}"), 1024)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn read_body_cuts_off_undeclared_oversize() {
        let err = read_body(&HeaderMap::new(), Body::from("x".repeat(2048)), 1024)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn read_body_returns_bytes_within_limit() {
        let bytes = read_body(&HeaderMap::new(), Body::from("{\"a\":1}"), 1024)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"{\"a\":1}");
    }

    #[tokio::test]
    async fn elapsed_deadline_maps_to_timeout() {
        let err = timeout_response(Box::new(Elapsed::new())).await;
        assert_eq!(err.status_code(), StatusCode::REQUEST_TIMEOUT);

        let err = timeout_response("boom".into()).await;
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn panic_payload_becomes_internal_error() {
        let response = panic_response(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn state_uses_server_defaults() {
        let state = AppState::new(CredentialSet::open());
        let defaults = ServerConfig::default();
        assert_eq!(state.max_body_size, defaults.max_body_size);
        assert_eq!(state.request_timeout, defaults.request_timeout);
        assert!(state.credentials.is_open());
    }
}
