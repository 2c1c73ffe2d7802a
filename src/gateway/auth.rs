//! Authorization gate for MCP Authgate
//!
//! The decision itself ([`authorize`]) is a pure function of the configured
//! [`CredentialSet`] and the request's [`Extraction`]. Emitting the log
//! event for a decision is a separate step ([`record`]), and the axum
//! middleware glues the two together and short-circuits denials.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::credentials::{
    CredentialSet, CredentialSource, Extraction, IncomingRequest, extract_credential,
};
use crate::Error;

/// Result of the authorization check, tagged with the reason
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthDecision {
    /// No credentials configured; everything is allowed
    OpenMode,
    /// Credential matched a configured key
    Allowed,
    /// No credential in the request (or an empty one)
    DeniedMissing,
    /// Credential present but not configured
    DeniedInvalid,
}

impl AuthDecision {
    /// Whether the request may proceed
    #[must_use]
    pub fn is_allowed(self) -> bool {
        matches!(self, Self::OpenMode | Self::Allowed)
    }

    /// Short tag used in log events
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenMode => "open_mode",
            Self::Allowed => "allowed",
            Self::DeniedMissing => "denied_missing",
            Self::DeniedInvalid => "denied_invalid",
        }
    }
}

/// Decide whether a request is authorized.
///
/// An extracted empty string counts as no credential.
#[must_use]
pub fn authorize(credentials: &CredentialSet, extraction: &Extraction) -> AuthDecision {
    if credentials.is_open() {
        return AuthDecision::OpenMode;
    }

    match extraction.credential.as_deref() {
        None | Some("") => AuthDecision::DeniedMissing,
        Some(candidate) if credentials.contains(candidate) => AuthDecision::Allowed,
        Some(_) => AuthDecision::DeniedInvalid,
    }
}

/// Authorization state of the in-flight request.
///
/// Inserted into request extensions by [`auth_middleware`] so handlers
/// (`/auth-test`, the `auth_info` tool) report what the gate saw instead of
/// re-deriving it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    /// Transport the credential came from
    pub source: CredentialSource,
    /// Whether any credential was extracted
    pub key_present: bool,
    /// Gate decision
    pub decision: AuthDecision,
}

impl AuthContext {
    /// Run extraction and the decision for one request
    #[must_use]
    pub fn evaluate(request: &IncomingRequest<'_>, credentials: &CredentialSet) -> Self {
        let extraction = extract_credential(request);
        Self {
            source: extraction.source,
            key_present: extraction.is_present(),
            decision: authorize(credentials, &extraction),
        }
    }

    /// Whether the credential is acceptable; always true in open mode
    #[must_use]
    pub fn key_valid(&self) -> bool {
        self.decision.is_allowed()
    }
}

/// Emit the observability event for a decision
pub fn record(context: &AuthContext, path: &str) {
    let decision = context.decision.as_str();
    let source = context.source.as_str();

    match context.decision {
        AuthDecision::OpenMode => {
            warn!(decision, path = %path, "No authorization keys configured - allowing request");
        }
        AuthDecision::Allowed => {
            debug!(decision, source, path = %path, "Request authorized");
        }
        AuthDecision::DeniedMissing => {
            info!(decision, source, path = %path, "Request denied: no authorization key provided");
        }
        AuthDecision::DeniedInvalid => {
            info!(decision, source, path = %path, "Request denied: invalid authorization key");
        }
    }

    if context.source.is_url_parameter() {
        warn!(
            source,
            path = %path,
            "Authorization key found in URL parameter - consider using headers for better security"
        );
    }
}

/// Authorization middleware
pub async fn auth_middleware(
    State(credentials): State<Arc<CredentialSet>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let context = AuthContext::evaluate(&IncomingRequest::from_request(&request), &credentials);
    record(&context, request.uri().path());

    if !context.decision.is_allowed() {
        return Error::unauthorized().into_response();
    }

    request.extensions_mut().insert(context);
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, HeaderValue, Method, Uri, header};

    fn evaluate(set: &CredentialSet, uri: &str, authorization: Option<&str>) -> AuthContext {
        let method = Method::GET;
        let uri: Uri = uri.parse().unwrap();
        let mut headers = HeaderMap::new();
        if let Some(value) = authorization {
            headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        }
        AuthContext::evaluate(&IncomingRequest::from_parts(&method, &uri, &headers), set)
    }

    fn keys() -> CredentialSet {
        CredentialSet::new(["abc123", "xyz"])
    }

    #[test]
    fn open_mode_allows_everything() {
        let open = CredentialSet::open();
        for (uri, header) in [
            ("/", None),
            ("/?key=wrong", None),
            ("/tools", Some("Bearer whatever")),
        ] {
            let context = evaluate(&open, uri, header);
            assert_eq!(context.decision, AuthDecision::OpenMode);
            assert!(context.key_valid());
        }
    }

    #[test]
    fn missing_credential_is_denied() {
        let context = evaluate(&keys(), "/tools", None);
        assert_eq!(context.decision, AuthDecision::DeniedMissing);
        assert!(!context.key_present);
        assert_eq!(context.source, CredentialSource::None);
    }

    #[test]
    fn empty_credential_counts_as_missing() {
        let context = evaluate(&keys(), "/", Some("Bearer "));
        assert_eq!(context.decision, AuthDecision::DeniedMissing);
        assert!(context.key_present);
    }

    #[test]
    fn invalid_credential_is_denied() {
        let context = evaluate(&keys(), "/", Some("Bearer nope"));
        assert_eq!(context.decision, AuthDecision::DeniedInvalid);
        assert!(!context.key_valid());
    }

    #[test]
    fn each_transport_can_authorize() {
        for (uri, header) in [
            ("/", Some("Bearer abc123")),
            ("/", Some("ApiKey xyz")),
            ("/", Some("xyz")),
            ("/?key=abc123", None),
            ("/?auth=xyz", None),
        ] {
            let context = evaluate(&keys(), uri, header);
            assert_eq!(context.decision, AuthDecision::Allowed, "{uri} {header:?}");
        }
    }

    #[test]
    fn invalid_header_shadows_valid_query_key() {
        let context = evaluate(&keys(), "/?key=abc123", Some("Bearer wrong"));
        assert_eq!(context.source, CredentialSource::Header);
        assert_eq!(context.decision, AuthDecision::DeniedInvalid);
    }

    #[test]
    fn comparison_is_exact() {
        assert_eq!(
            evaluate(&keys(), "/", Some("Bearer ABC123")).decision,
            AuthDecision::DeniedInvalid
        );
        assert_eq!(
            evaluate(&keys(), "/", Some("Bearer abc123 ")).decision,
            AuthDecision::DeniedInvalid
        );
    }

    #[test]
    fn decision_tags_are_distinct() {
        let tags = [
            AuthDecision::OpenMode,
            AuthDecision::Allowed,
            AuthDecision::DeniedMissing,
            AuthDecision::DeniedInvalid,
        ]
        .map(AuthDecision::as_str);
        assert_eq!(tags, ["open_mode", "allowed", "denied_missing", "denied_invalid"]);
    }
}
