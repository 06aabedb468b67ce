//! Origin allow-list and CORS response headers.

use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    ORIGIN, VARY,
};
use axum::http::{HeaderMap, HeaderValue};

pub const ALLOW_METHODS: &str = "POST, OPTIONS";
pub const ALLOW_HEADERS: &str = "Content-Type, Authorization";

/// Value used when a request carries no `Origin` header, matching what
/// browsers send for opaque origins.
pub const NULL_ORIGIN: &str = "null";

/// Exact-match origin allow-list.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    allowed: Vec<String>,
}

impl OriginPolicy {
    pub fn new(allowed: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_allowed(&self, origin: &str) -> bool {
        self.allowed.iter().any(|o| o == origin)
    }

    /// Origin to echo back: the caller's when allowed, otherwise the first
    /// allow-listed entry.
    pub fn echo_origin<'a>(&'a self, origin: &'a str) -> Option<&'a str> {
        if self.is_allowed(origin) {
            Some(origin)
        } else {
            self.allowed.first().map(String::as_str)
        }
    }

    /// CORS headers attached to every relay response, rejected ones included.
    pub fn headers(&self, origin: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(value) = self
            .echo_origin(origin)
            .and_then(|o| HeaderValue::from_str(o).ok())
        {
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, value);
        }
        headers.insert(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        );
        headers.insert(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        );
        headers.insert(VARY, HeaderValue::from_static("Origin"));
        headers
    }
}

/// The request's `Origin`, or `"null"` when absent or not valid text.
pub fn request_origin(headers: &HeaderMap) -> String {
    headers
        .get(ORIGIN)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(NULL_ORIGIN)
        .to_string()
}
