//! Stateless HTTP request builder and response parser for the feedback API.
//!
//! # Design
//! `FeedbackClient` holds only the base URL and the ingestion secret, taken
//! from a `Configuration` snapshot. Each endpoint is split into a `build_*`
//! method that produces an `HttpRequest` and a `parse_*` method that consumes
//! an `HttpResponse`. The façade in `sdk` glues the two halves together with
//! a host transport; hosts that prefer to drive I/O themselves can use this
//! type directly.

use crate::error::{FeedbackError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{
    FeedbackSubmission, IngestInfo, PublicItem, PublicItemsResponse, UpvoteRequest, UpvoteResponse,
};

/// Header carrying the ingestion secret on authenticated calls.
pub const SECRET_HEADER: &str = "x-ingest-secret";

pub const INGEST_INFO_PATH: &str = "/api/ingest-info";
pub const FEEDBACK_PATH: &str = "/api/feedback";
pub const PUBLIC_FEEDBACK_PATH: &str = "/api/public-feedback";
pub const PUBLIC_UPVOTE_PATH: &str = "/api/public-upvote";

/// Synchronous, stateless client for the feedback API.
#[derive(Clone)]
pub struct FeedbackClient {
    base_url: String,
    secret: String,
}

impl std::fmt::Debug for FeedbackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedbackClient")
            .field("base_url", &self.base_url)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl FeedbackClient {
    pub fn new(base_url: &str, secret: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            secret: secret.to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_ingest_info(&self) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: format!("{}{INGEST_INFO_PATH}", self.base_url),
            headers: vec![self.secret_header()],
            body: None,
        }
    }

    pub fn build_send_feedback(&self, submission: &FeedbackSubmission) -> Result<HttpRequest> {
        let body = serde_json::to_string(submission)
            .map_err(|e| FeedbackError::Serialization(e.to_string()))?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: format!("{}{FEEDBACK_PATH}", self.base_url),
            headers: vec![json_content_type(), self.secret_header()],
            body: Some(body),
        })
    }

    /// The list endpoint is public; the secret is deliberately not attached.
    pub fn build_public_items(&self, board_slug: &str, limit: usize) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: format!(
                "{}{PUBLIC_FEEDBACK_PATH}?slug={}&limit={limit}",
                self.base_url,
                urlencoding::encode(board_slug)
            ),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn build_upvote(&self, feedback_id: &str, board_slug: Option<&str>) -> Result<HttpRequest> {
        let payload = UpvoteRequest {
            feedback_id: feedback_id.to_string(),
            board_slug: board_slug.map(str::to_string),
        };
        let body = serde_json::to_string(&payload)
            .map_err(|e| FeedbackError::Serialization(e.to_string()))?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: format!("{}{PUBLIC_UPVOTE_PATH}", self.base_url),
            headers: vec![json_content_type(), self.secret_header()],
            body: Some(body),
        })
    }

    /// Extract the board slug. A 2xx without a usable slug is `InvalidResponse`.
    pub fn parse_ingest_info(&self, response: HttpResponse) -> Result<String> {
        check_status(&response)?;
        let info: IngestInfo = serde_json::from_str(&response.body)
            .map_err(|e| FeedbackError::Decode(e.to_string()))?;
        match info.slug {
            Some(slug) if !slug.trim().is_empty() => Ok(slug),
            _ => Err(FeedbackError::InvalidResponse),
        }
    }

    /// Any 2xx is success; the body is ignored.
    pub fn parse_send_feedback(&self, response: HttpResponse) -> Result<()> {
        check_status(&response)
    }

    /// Decode the public list, keeping at most `limit` items.
    ///
    /// Unlike the other endpoints, every failure here is `InvalidResponse`:
    /// the list view shows a generic banner rather than server text.
    pub fn parse_public_items(&self, response: HttpResponse, limit: usize) -> Result<Vec<PublicItem>> {
        if !response.is_success() {
            return Err(FeedbackError::InvalidResponse);
        }
        let parsed: PublicItemsResponse =
            serde_json::from_str(&response.body).map_err(|_| FeedbackError::InvalidResponse)?;
        let mut items = parsed.items;
        items.truncate(limit);
        Ok(items)
    }

    /// Returns the server-reported vote count, if the server sent one.
    pub fn parse_upvote(&self, response: HttpResponse) -> Result<Option<u32>> {
        if !response.is_success() {
            if let Ok(UpvoteResponse { error: Some(message), .. }) = serde_json::from_str::<UpvoteResponse>(&response.body) {
                return Err(FeedbackError::ServerError(message));
            }
        }
        check_status(&response)?;
        let parsed: UpvoteResponse = serde_json::from_str(&response.body)
            .map_err(|e| FeedbackError::Decode(e.to_string()))?;
        if !parsed.ok {
            return Err(FeedbackError::ServerError(
                parsed.error.unwrap_or_else(|| "upvote was not accepted".to_string()),
            ));
        }
        Ok(parsed.votes)
    }

    fn secret_header(&self) -> (String, String) {
        (SECRET_HEADER.to_string(), self.secret.clone())
    }
}

fn json_content_type() -> (String, String) {
    ("content-type".to_string(), "application/json".to_string())
}

/// Map non-2xx responses to `ServerError` (readable body) or `InvalidResponse`.
fn check_status(response: &HttpResponse) -> Result<()> {
    if response.is_success() {
        return Ok(());
    }
    let body = response.body.trim();
    if body.is_empty() {
        return Err(FeedbackError::InvalidResponse);
    }
    Err(FeedbackError::ServerError(body.to_string()))
}
