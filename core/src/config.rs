//! Process-wide configuration holder.
//!
//! # Design
//! A single `Mutex` serializes configure, read and slug-cache updates. The
//! lock is never held across I/O: `ensure_board_slug` snapshots the
//! configuration together with a generation counter, resolves the slug
//! without the lock, and only caches the result if no `configure` happened in
//! between. Concurrent first resolutions may each hit the network; they all
//! store the same value.

use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use tracing::{debug, info, warn};

use crate::client::FeedbackClient;
use crate::error::{FeedbackError, Result};
use crate::http::HttpTransport;

/// Placeholder endpoint used when `configure` is called without an override.
///
/// No hosted address is published for the service; hosts should always pass
/// their own `base_url`.
pub const DEFAULT_BASE_URL: &str = "https://feedbackkit.app";

/// Credentials and endpoint for the feedback service.
#[derive(Clone, PartialEq, Eq)]
pub struct Configuration {
    pub base_url: String,
    pub secret: String,
    pub cached_slug: Option<String>,
}

impl Configuration {
    pub fn client(&self) -> FeedbackClient {
        FeedbackClient::new(&self.base_url, &self.secret)
    }
}

impl std::fmt::Debug for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Configuration")
            .field("base_url", &self.base_url)
            .field("secret", &"<redacted>")
            .field("cached_slug", &self.cached_slug)
            .finish()
    }
}

#[derive(Debug, Default)]
struct State {
    config: Option<Configuration>,
    generation: u64,
}

/// Mutex-guarded configuration shared by every `FeedbackKit` in the process.
#[derive(Debug, Default)]
pub struct ConfigHolder {
    state: Mutex<State>,
}

static GLOBAL: OnceLock<Arc<ConfigHolder>> = OnceLock::new();

impl ConfigHolder {
    /// A standalone holder. Apps should normally use `global()`.
    pub fn new() -> Self {
        Self::default()
    }

    /// The single process-wide holder.
    pub fn global() -> Arc<ConfigHolder> {
        GLOBAL.get_or_init(|| Arc::new(ConfigHolder::new())).clone()
    }

    /// Set or replace the configuration. Last write wins.
    ///
    /// The cached slug survives only if both secret and endpoint are unchanged.
    pub fn configure(&self, secret: &str, base_url: Option<&str>) {
        let base_url = match base_url.map(str::trim).filter(|url| !url.is_empty()) {
            Some(url) => url,
            None => {
                warn!(default = DEFAULT_BASE_URL, "no base_url given; using placeholder endpoint");
                DEFAULT_BASE_URL
            }
        }
        .trim_end_matches('/')
        .to_string();

        info!(base_url = %base_url, "feedback kit configured");
        let mut state = self.lock();
        let cached_slug = state
            .config
            .as_ref()
            .filter(|old| old.secret == secret && old.base_url == base_url)
            .and_then(|old| old.cached_slug.clone());
        state.config = Some(Configuration {
            base_url,
            secret: secret.to_string(),
            cached_slug,
        });
        state.generation += 1;
    }

    pub fn is_configured(&self) -> bool {
        self.lock().config.is_some()
    }

    /// Snapshot of the current configuration.
    pub fn current(&self) -> Result<Configuration> {
        self.lock().config.clone().ok_or(FeedbackError::NotConfigured)
    }

    pub fn update_cached_slug(&self, slug: &str) -> Result<()> {
        let mut state = self.lock();
        let config = state.config.as_mut().ok_or(FeedbackError::NotConfigured)?;
        config.cached_slug = Some(slug.to_string());
        Ok(())
    }

    /// Return the cached board slug, resolving it through `transport` once.
    pub fn ensure_board_slug<T: HttpTransport + ?Sized>(&self, transport: &T) -> Result<String> {
        self.board_snapshot(transport).map(|(_, slug)| slug)
    }

    /// Like `ensure_board_slug`, but also returns the configuration the slug
    /// belongs to, so follow-up requests go to the same endpoint.
    pub fn board_snapshot<T: HttpTransport + ?Sized>(&self, transport: &T) -> Result<(Configuration, String)> {
        let (config, generation) = {
            let state = self.lock();
            let config = state.config.clone().ok_or(FeedbackError::NotConfigured)?;
            if let Some(slug) = config.cached_slug.clone() {
                return Ok((config, slug));
            }
            (config, state.generation)
        };

        debug!("resolving board slug");
        let client = config.client();
        let response = transport.execute(client.build_ingest_info())?;
        let slug = client.parse_ingest_info(response)?;

        let mut state = self.lock();
        if state.generation == generation {
            if let Some(current) = state.config.as_mut() {
                current.cached_slug = Some(slug.clone());
            }
        } else {
            debug!("configuration changed during slug resolution; not caching");
        }
        Ok((config, slug))
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
