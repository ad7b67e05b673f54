//! HTTP transport abstraction for the Twitch API.
//!
//! Every remote call made by an [`Account`](crate::account::Account) goes
//! through the [`Transport`] trait. Production code uses [`HttpTransport`]
//! (a blocking `reqwest` client); tests script responses with
//! [`MockTransport`].

mod endpoints;
mod http;
mod mock;

pub use endpoints::Endpoints;
pub use http::HttpTransport;
pub use mock::MockTransport;

use std::fmt;

/// HTTP methods used against the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Read requests (validation, listings, lookups).
    Get,
    /// Create a follow.
    Put,
    /// Remove a follow.
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Put => write!(f, "PUT"),
            Method::Delete => write!(f, "DELETE"),
        }
    }
}

/// A single outgoing API request.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Fully-qualified URL including query string.
    pub url: String,
    /// Header name/value pairs, in insertion order.
    pub headers: Vec<(String, String)>,
}

impl ApiRequest {
    /// Create a request with no headers.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
        }
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Look up a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

// Authorization headers carry the token, so they are masked here.
impl fmt::Debug for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: Vec<(&str, &str)> = self
            .headers
            .iter()
            .map(|(n, v)| {
                if n.eq_ignore_ascii_case("authorization") {
                    (n.as_str(), "<redacted>")
                } else {
                    (n.as_str(), v.as_str())
                }
            })
            .collect();
        f.debug_struct("ApiRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &headers)
            .finish()
    }
}

/// Response returned by a [`Transport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: String,
}

impl ApiResponse {
    /// Create a response.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the body is empty (ignoring surrounding whitespace).
    pub fn is_empty(&self) -> bool {
        self.body.trim().is_empty()
    }
}

/// Error type for transport operations.
///
/// Only I/O-level failures are reported here. Non-2xx statuses are returned
/// as ordinary [`ApiResponse`] values; callers decide from the body.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Client(String),
    /// The request could not be sent or the connection failed.
    #[error("{method} {url} failed: {reason}")]
    Request {
        /// Request method.
        method: Method,
        /// Request URL.
        url: String,
        /// Underlying failure.
        reason: String,
    },
    /// The response body could not be read.
    #[error("Failed to read response body from {url}: {reason}")]
    Body {
        /// Request URL.
        url: String,
        /// Underlying failure.
        reason: String,
    },
    /// A scripted transport had nothing left to answer with.
    #[error("No scripted response for {method} {url}")]
    Unscripted {
        /// Request method.
        method: Method,
        /// Request URL.
        url: String,
    },
}

/// Something that can execute [`ApiRequest`]s.
///
/// Implementations must be thread-safe so a single transport can be shared
/// between accounts.
pub trait Transport: Send + Sync {
    /// Execute one request, blocking until the full body has been read.
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError>;
}
