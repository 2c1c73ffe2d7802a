//! MCP Authgate Library
//!
//! Model Context Protocol server with a layered authorization fallback:
//! credentials are taken from the `Authorization` header when the client
//! can send one, and from the `key` / `auth` URL parameters when it cannot.
//!
//! # Features
//!
//! - **Credential fallback**: `Bearer`, `ApiKey` or raw header values, then `?key=`, then `?auth=`
//! - **Open mode**: an empty key set disables access control (and says so loudly)
//! - **Tool execution**: fixed registry (`echo`, `auth_info`) behind `POST /execute`
//! - **Uniform errors**: every failure is `{"error": ..., "status": ...}`
//! - **Browser friendly**: permissive CORS, ungated preflights
//!
//! # Security
//!
//! URL parameters end up in server logs and browser history. Prefer the
//! header, and terminate TLS in front of this server when keys travel in URLs.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;

pub use error::{Error, ErrorEnvelope, Result};

use chrono::{SecondsFormat, Utc};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Server name reported on `GET /`
pub const SERVER_NAME: &str = "MCP Server with Authorization Fallback";

/// Server description reported on `GET /`
pub const SERVER_DESCRIPTION: &str =
    "Model Context Protocol server with header and URL parameter authorization fallback";

/// Setup tracing/logging
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => subscriber
            .with(fmt::layer().json())
            .try_init()
            .map_err(|e| Error::Config(format!("Failed to install tracing subscriber: {e}"))),
        _ => subscriber
            .with(fmt::layer())
            .try_init()
            .map_err(|e| Error::Config(format!("Failed to install tracing subscriber: {e}"))),
    }
}

/// Current UTC time as RFC 3339 with millisecond precision
#[must_use]
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
