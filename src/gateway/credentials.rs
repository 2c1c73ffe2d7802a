//! Credential set and per-request credential extraction
//!
//! A request may carry its credential in one of three places, consulted in
//! a fixed order (first hit wins):
//!
//! 1. `Authorization` header: `Bearer <token>`, `ApiKey <token>` or the raw token
//! 2. `?key=<token>` query parameter
//! 3. `?auth=<token>` query parameter
//!
//! Extraction is pure. Logging about the transport used happens in the
//! authorization gate, not here.

use std::collections::BTreeSet;
use std::fmt;

use axum::http::{HeaderMap, Method, Request, Uri, header};
use serde::Serialize;
use subtle::ConstantTimeEq;

/// Header scheme prefixes stripped from the `Authorization` value.
/// Matching is case-sensitive and includes the trailing space.
const SCHEME_PREFIXES: [&str; 2] = ["Bearer ", "ApiKey "];

/// Query parameter names consulted when no header is present, in order
const QUERY_PARAMS: [(&str, CredentialSource); 2] = [
    ("key", CredentialSource::UrlParameterKey),
    ("auth", CredentialSource::UrlParameterAuth),
];

/// Immutable set of valid credentials, fixed at startup.
///
/// An empty set means access control is off (open mode).
#[derive(Debug, Clone, Default)]
pub struct CredentialSet {
    keys: Vec<String>,
}

impl CredentialSet {
    /// Build a set from configured keys. Duplicates collapse.
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let unique: BTreeSet<String> = keys.into_iter().map(Into::into).collect();
        Self {
            keys: unique.into_iter().collect(),
        }
    }

    /// The empty set: every request is allowed
    #[must_use]
    pub fn open() -> Self {
        Self::default()
    }

    /// Whether no credentials are configured
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.keys.is_empty()
    }

    /// Number of configured credentials
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the set is empty (same as [`CredentialSet::is_open`])
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Exact membership test.
    ///
    /// Every configured key is compared in constant time so the scan does
    /// not stop at the first match.
    #[must_use]
    pub fn contains(&self, candidate: &str) -> bool {
        let candidate = candidate.as_bytes();
        let hits = self
            .keys
            .iter()
            .fold(0u8, |acc, key| acc | key.as_bytes().ct_eq(candidate).unwrap_u8());
        hits == 1
    }
}

impl<S: Into<String>> FromIterator<S> for CredentialSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Decoded query string, multi-valued, keys in order of first occurrence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    entries: Vec<(String, Vec<String>)>,
}

impl QueryParams {
    /// Parse an `application/x-www-form-urlencoded` query string.
    ///
    /// Blank values are dropped, so `?key=&auth=x` has no `key` entry.
    #[must_use]
    pub fn parse(query: Option<&str>) -> Self {
        let mut params = Self::default();
        let Some(query) = query else {
            return params;
        };

        for (name, value) in url::form_urlencoded::parse(query.as_bytes()) {
            if value.is_empty() {
                continue;
            }
            match params.entries.iter_mut().find(|(k, _)| *k == name) {
                Some((_, values)) => values.push(value.into_owned()),
                None => params
                    .entries
                    .push((name.into_owned(), vec![value.into_owned()])),
            }
        }
        params
    }

    /// First value recorded for `name`
    #[must_use]
    pub fn first(&self, name: &str) -> Option<&str> {
        self.get_all(name).first().map(String::as_str)
    }

    /// All values recorded for `name`, in request order
    #[must_use]
    pub fn get_all(&self, name: &str) -> &[String] {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, values)| values.as_slice())
            .unwrap_or_default()
    }

    /// Parameter names in order of first occurrence
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

/// Borrowed view of the request parts that matter for authorization
#[derive(Debug)]
pub struct IncomingRequest<'a> {
    /// HTTP method
    pub method: &'a Method,
    /// URL path without the query string
    pub path: &'a str,
    /// Decoded query parameters
    pub query: QueryParams,
    /// Header map (case-insensitive keys)
    pub headers: &'a HeaderMap,
}

impl<'a> IncomingRequest<'a> {
    /// Build a view from the raw request parts
    #[must_use]
    pub fn from_parts(method: &'a Method, uri: &'a Uri, headers: &'a HeaderMap) -> Self {
        Self {
            method,
            path: uri.path(),
            query: QueryParams::parse(uri.query()),
            headers,
        }
    }

    /// Build a view over an HTTP request, ignoring its body
    #[must_use]
    pub fn from_request<B>(request: &'a Request<B>) -> Self {
        Self::from_parts(request.method(), request.uri(), request.headers())
    }
}

/// Where the credential for a request came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialSource {
    /// `Authorization` header
    Header,
    /// `?key=` query parameter
    UrlParameterKey,
    /// `?auth=` query parameter
    UrlParameterAuth,
    /// No credential found
    None,
}

impl CredentialSource {
    /// Wire name reported by `/auth-test` and `auth_info`
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::UrlParameterKey => "url_parameter_key",
            Self::UrlParameterAuth => "url_parameter_auth",
            Self::None => "none",
        }
    }

    /// Whether the credential travelled in the URL
    #[must_use]
    pub fn is_url_parameter(self) -> bool {
        matches!(self, Self::UrlParameterKey | Self::UrlParameterAuth)
    }
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of credential extraction: at most one candidate per request
#[derive(Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Transport the credential was found in
    pub source: CredentialSource,
    /// The candidate credential, if any
    pub credential: Option<String>,
}

impl Extraction {
    fn found(source: CredentialSource, credential: impl Into<String>) -> Self {
        Self {
            source,
            credential: Some(credential.into()),
        }
    }

    /// Nothing found in any transport
    #[must_use]
    pub fn absent() -> Self {
        Self {
            source: CredentialSource::None,
            credential: None,
        }
    }

    /// Whether a candidate was found (it may still be empty)
    #[must_use]
    pub fn is_present(&self) -> bool {
        self.credential.is_some()
    }
}

// Credential values stay out of debug output.
impl fmt::Debug for Extraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extraction")
            .field("source", &self.source)
            .field("present", &self.is_present())
            .finish()
    }
}

/// Extract the single candidate credential for a request.
///
/// The header wins whenever it is present and non-empty; query parameters
/// are consulted only without it.
#[must_use]
pub fn extract_credential(request: &IncomingRequest<'_>) -> Extraction {
    let header_value = request
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty());

    if let Some(value) = header_value {
        return Extraction::found(CredentialSource::Header, strip_scheme(value));
    }

    QUERY_PARAMS
        .iter()
        .find_map(|(name, source)| {
            request
                .query
                .first(name)
                .map(|value| Extraction::found(*source, value))
        })
        .unwrap_or_else(Extraction::absent)
}

/// Drop a recognised scheme prefix, or keep the value verbatim
fn strip_scheme(value: &str) -> &str {
    SCHEME_PREFIXES
        .iter()
        .find_map(|prefix| value.strip_prefix(*prefix))
        .unwrap_or(value)
}
