//! Permissive CORS and response headers
//!
//! Runs outside the authorization gate: `OPTIONS` preflights are answered
//! here and never reach [`super::auth::auth_middleware`].

use axum::{
    body::Body,
    http::{
        HeaderMap, HeaderValue, Method, Request, StatusCode,
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE,
        },
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

/// Methods advertised to browsers
pub const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";

/// Request headers advertised to browsers
pub const ALLOWED_HEADERS: &str = "Content-Type, Authorization";

/// Answer preflights and stamp CORS/content-type headers on every response
pub async fn cors_middleware(request: Request<Body>, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        debug!(path = %request.uri().path(), "CORS preflight");
        let mut response = StatusCode::OK.into_response();
        apply_headers(response.headers_mut());
        return response;
    }

    let mut response = next.run(request).await;
    apply_headers(response.headers_mut());
    response
}

/// Insert the fixed header set. An existing content type is kept.
pub fn apply_headers(headers: &mut HeaderMap) {
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );
    headers
        .entry(CONTENT_TYPE)
        .or_insert(HeaderValue::from_static("application/json"));
}
