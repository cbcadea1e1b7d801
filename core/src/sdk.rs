//! Request façade: configuration plus transport plus device metadata.
//!
//! # Design
//! `FeedbackKit` is the object hosts talk to. Each operation takes a
//! configuration snapshot from the shared `ConfigHolder`, builds a request
//! with `FeedbackClient`, hands it to the host transport and parses the
//! response. Operations fail with `NotConfigured` before any I/O when
//! `configure` has not been called. There is no retry or offline queue; the
//! user re-triggers failed actions.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::ConfigHolder;
use crate::device::{DeviceMetadataProvider, NoDeviceMetadata};
use crate::error::Result;
use crate::http::HttpTransport;
use crate::types::{Category, FeedbackSubmission, PublicItem};

/// Default number of items requested from the public board.
pub const DEFAULT_PAGE_LIMIT: usize = 50;

pub struct FeedbackKit<T: HttpTransport> {
    config: Arc<ConfigHolder>,
    transport: T,
    device: Box<dyn DeviceMetadataProvider>,
}

impl<T: HttpTransport> FeedbackKit<T> {
    /// A kit bound to the process-wide configuration.
    pub fn new(transport: T) -> Self {
        Self::with_config(ConfigHolder::global(), transport)
    }

    pub fn with_config(config: Arc<ConfigHolder>, transport: T) -> Self {
        Self {
            config,
            transport,
            device: Box::new(NoDeviceMetadata),
        }
    }

    pub fn with_device_metadata(mut self, provider: impl DeviceMetadataProvider + 'static) -> Self {
        self.device = Box::new(provider);
        self
    }

    pub fn config_holder(&self) -> &Arc<ConfigHolder> {
        &self.config
    }

    pub fn configure(&self, secret: &str, base_url: Option<&str>) {
        self.config.configure(secret, base_url);
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Submit one piece of feedback. Inputs are sent as given.
    pub fn send_feedback(&self, title: &str, description: Option<&str>, category: Category) -> Result<()> {
        let config = self.config.current()?;
        let client = config.client();
        let submission = FeedbackSubmission::new(title, description.map(str::to_string), category)
            .with_device_metadata(self.device.collect());
        let request = client.build_send_feedback(&submission)?;

        debug!(category = %category, "sending feedback");
        let result = self
            .transport
            .execute(request)
            .and_then(|response| client.parse_send_feedback(response));
        if let Err(e) = &result {
            warn!(error = %e, "send feedback failed");
        }
        result
    }

    /// Fetch the public board. `limit` is forwarded and enforced locally.
    pub fn fetch_public_items(&self, limit: usize) -> Result<Vec<PublicItem>> {
        let (config, slug) = self.config.board_snapshot(&self.transport)?;
        let client = config.client();

        debug!(slug = %slug, limit, "fetching public items");
        let result = self
            .transport
            .execute(client.build_public_items(&slug, limit))
            .and_then(|response| client.parse_public_items(response, limit));
        match &result {
            Ok(items) => debug!(count = items.len(), "fetched public items"),
            Err(e) => warn!(error = %e, "fetch public items failed"),
        }
        result
    }

    /// Upvote one item and return the server's new count, if reported.
    pub fn upvote(&self, feedback_id: &str) -> Result<Option<u32>> {
        let config = self.config.current()?;
        let client = config.client();
        let request = client.build_upvote(feedback_id, config.cached_slug.as_deref())?;

        debug!(feedback_id, "upvoting");
        let result = self
            .transport
            .execute(request)
            .and_then(|response| client.parse_upvote(response));
        if let Err(e) = &result {
            warn!(feedback_id, error = %e, "upvote failed");
        }
        result
    }

    pub fn resolve_board_slug(&self) -> Result<String> {
        self.config.ensure_board_slug(&self.transport)
    }
}
