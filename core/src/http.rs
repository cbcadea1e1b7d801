//! Request and response values plus the transport seam the host implements.
//!
//! # Design
//! Requests and responses are plain data. `FeedbackClient` builds
//! `HttpRequest` values and parses `HttpResponse` values; the host executes
//! the round-trip through an `HttpTransport`, which is the only place I/O
//! happens. On mobile that is the platform's URL session or OkHttp, reached
//! through the C callback in `feedback-ffi`.
//!
//! Fields are owned so a request can be handed to a C callback and a
//! response filled in later without borrowing from the client.

use crate::error::Result;

/// HTTP method for a request. The feedback API only uses these two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Executes one HTTP round-trip on behalf of the core.
///
/// Implementations must return non-2xx responses as `Ok`; only failures to
/// obtain a response at all (DNS, TLS, connection reset) are
/// `FeedbackError::Transport`. No retries are expected.
pub trait HttpTransport: Send + Sync {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

impl<F> HttpTransport for F
where
    F: Fn(HttpRequest) -> Result<HttpResponse> + Send + Sync,
{
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self(request)
    }
}
