//! Wire DTOs for the feedback service.
//!
//! # Design
//! These types mirror the backend's JSON but are defined independently from
//! the mock-server crate; the integration test catches schema drift.
//! Response types ignore unknown fields so additive backend changes do not
//! break deployed apps.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The `source` tag attached to every submission from this SDK.
pub const SOURCE_MOBILE: &str = "mobile";

/// Kind of feedback being submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Feature,
    Bug,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Feature => "feature",
            Category::Bug => "bug",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "feature" => Ok(Category::Feature),
            "bug" => Ok(Category::Bug),
            other => Err(format!("unknown category: {other}")),
        }
    }
}

/// Static identifiers of the host app and device, read at submission time.
///
/// Every field is optional; absent fields are left out of the request body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

impl DeviceMetadata {
    pub fn is_empty(&self) -> bool {
        *self == DeviceMetadata::default()
    }
}

/// Request payload for `POST /api/feedback`.
///
/// Device metadata fields are flattened into the top-level object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackSubmission {
    pub title: String,
    pub description: Option<String>,
    pub source: String,
    pub category: Category,
    #[serde(flatten)]
    pub device_metadata: Option<DeviceMetadata>,
}

impl FeedbackSubmission {
    pub fn new(title: impl Into<String>, description: Option<String>, category: Category) -> Self {
        Self {
            title: title.into(),
            description,
            source: SOURCE_MOBILE.to_string(),
            category,
            device_metadata: None,
        }
    }

    pub fn with_device_metadata(mut self, metadata: DeviceMetadata) -> Self {
        self.device_metadata = if metadata.is_empty() { None } else { Some(metadata) };
        self
    }
}

/// A feedback item as listed on the public board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: String,
    #[serde(default)]
    pub source: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub votes: Option<u32>,
}

/// Response body of `GET /api/public-feedback`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublicItemsResponse {
    pub items: Vec<PublicItem>,
}

/// Response body of `GET /api/ingest-info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestInfo {
    #[serde(default)]
    pub slug: Option<String>,
}

/// Request payload for `POST /api/public-upvote`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpvoteRequest {
    pub feedback_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub board_slug: Option<String>,
}

/// Response body of `POST /api/public-upvote`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpvoteResponse {
    pub ok: bool,
    #[serde(default)]
    pub votes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
