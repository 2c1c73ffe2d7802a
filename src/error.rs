//! Error types for MCP Authgate
//!
//! Every failure that reaches a client is rendered as the error envelope
//! `{"error": <message>, "status": <code>}`, where `status` repeats the
//! HTTP status code of the response.

use std::io;

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Result type alias for MCP Authgate
pub type Result<T> = std::result::Result<T, Error>;

/// Message returned to clients for any 500-class failure
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// MCP Authgate errors
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Missing or invalid credential while access control is active
    #[error("{0}")]
    Unauthorized(String),

    /// Malformed request body, unknown tool or bad tool parameter
    #[error("{0}")]
    BadRequest(String),

    /// Unknown path or method
    #[error("{0}")]
    NotFound(String),

    /// Request body exceeds the configured limit
    #[error("Request body exceeds limit of {limit} bytes")]
    PayloadTooLarge {
        /// Configured maximum
        limit: usize,
    },

    /// Request did not complete within the configured deadline
    #[error("Request timed out")]
    Timeout,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an unauthorized error with the standard message
    #[must_use]
    pub fn unauthorized() -> Self {
        Self::Unauthorized("Unauthorized: Invalid or missing authorization key".to_string())
    }

    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Create a not found error with the standard message
    #[must_use]
    pub fn not_found() -> Self {
        Self::NotFound("Not Found".to_string())
    }

    /// HTTP status code this error is reported with
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Timeout => StatusCode::REQUEST_TIMEOUT,
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Build the envelope for this error.
    ///
    /// Server-side faults keep their detail out of the response body.
    #[must_use]
    pub fn envelope(&self) -> ErrorEnvelope {
        let status = self.status_code();
        let message = if status.is_server_error() {
            INTERNAL_ERROR_MESSAGE.to_string()
        } else {
            self.to_string()
        };
        ErrorEnvelope {
            error: message,
            status: status.as_u16(),
        }
    }
}

/// Uniform JSON shape for all non-success responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEnvelope {
    /// Human-readable message
    pub error: String,
    /// HTTP status code, repeated in the body
    pub status: u16,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        let mut response = (status, Json(self.envelope())).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(Error::unauthorized().status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(Error::bad_request("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(Error::not_found().status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            Error::PayloadTooLarge { limit: 5 }.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(Error::Timeout.status_code(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(
            Error::Internal("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn envelope_repeats_status_code() {
        let envelope = Error::bad_request("Unknown tool: nope").envelope();
        assert_eq!(envelope.error, "Unknown tool: nope");
        assert_eq!(envelope.status, 400);
    }

    #[test]
    fn timeout_renders_envelope() {
        let envelope = Error::Timeout.envelope();
        assert_eq!(envelope.error, "Request timed out");
        assert_eq!(envelope.status, 408);
    }

    #[test]
    fn internal_detail_is_not_exposed() {
        let envelope = Error::Io(io::Error::other("disk on fire")).envelope();
        assert_eq!(envelope.error, INTERNAL_ERROR_MESSAGE);
        assert_eq!(envelope.status, 500);
    }

    #[test]
    fn unauthorized_response_carries_challenge() {
        let response = Error::unauthorized().into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );
    }
}
