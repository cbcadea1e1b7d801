//! Client core for the feedback service.
//!
//! # Overview
//! Lets a mobile app submit feature requests and bug reports, list the public
//! board and upvote items. The backend owns storage and vote counting; this
//! crate is the client side of four HTTP endpoints plus the small amount of
//! state around them.
//!
//! # Design
//! - `FeedbackClient` is stateless: `build_*` produces an `HttpRequest`,
//!   `parse_*` consumes an `HttpResponse`. It never touches the network.
//! - The host executes requests through `HttpTransport` (host-does-IO).
//! - `ConfigHolder` is the one shared mutable resource: secret, endpoint and
//!   the cached board slug behind a single mutex, one instance per process.
//! - `FeedbackKit` ties configuration, transport and device metadata together
//!   and is what host apps call.
//! - `presentation` holds the form and board state machines headlessly.

pub mod client;
pub mod config;
pub mod device;
pub mod error;
pub mod http;
pub mod presentation;
pub mod sdk;
pub mod types;
pub mod votes;

pub use client::FeedbackClient;
pub use config::{ConfigHolder, Configuration, DEFAULT_BASE_URL};
pub use device::{DeviceMetadataProvider, HostDeviceMetadata, NoDeviceMetadata, StaticDeviceMetadata};
pub use error::{FeedbackError, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};
pub use presentation::{Draft, PublicListModel, SubmissionForm, SubmissionState, DISMISS_DELAY};
pub use sdk::{FeedbackKit, DEFAULT_PAGE_LIMIT};
pub use types::{Category, DeviceMetadata, FeedbackSubmission, PublicItem};
pub use votes::{JsonFileStore, KeyValueStore, MemoryStore, VotedIds, VOTED_IDS_KEY};
