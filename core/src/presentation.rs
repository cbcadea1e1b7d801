//! Headless view models for the submission form and the public board.
//!
//! # Design
//! The UI toolkit belongs to the host. These models hold the state machines
//! the views render so iOS and Android behave identically:
//!
//! - submission: `Idle -> Submitting -> Success | Failed`, where `Failed`
//!   accepts a new submit and `Success` auto-dismisses after `DISMISS_DELAY`;
//! - per item vote: `NotVoted -> Voting -> Voted | NotVoted`, where `Voted` is
//!   persisted and terminal for that id on this device.
//!
//! Each action is split into `begin_*` and `finish_*` so hosts can run the
//! request on their own executor; `submit`, `refresh` and `upvote` run the
//! whole cycle inline.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::warn;

use crate::error::Result;
use crate::http::HttpTransport;
use crate::sdk::{FeedbackKit, DEFAULT_PAGE_LIMIT};
use crate::types::{Category, PublicItem};
use crate::votes::{KeyValueStore, VotedIds};

/// How long the success state stays visible before the form closes.
pub const DISMISS_DELAY: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Submitting,
    Success { at: Instant },
    Failed(String),
}

/// Trimmed form contents ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub title: String,
    pub description: Option<String>,
    pub category: Category,
}

#[derive(Debug, Clone)]
pub struct SubmissionForm {
    pub title: String,
    pub description: String,
    pub category: Category,
    state: SubmissionState,
}

impl Default for SubmissionForm {
    fn default() -> Self {
        Self::new()
    }
}

impl SubmissionForm {
    pub fn new() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            category: Category::Feature,
            state: SubmissionState::Idle,
        }
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    /// Whether the submit control is enabled.
    pub fn can_submit(&self) -> bool {
        !self.title.trim().is_empty() && self.state != SubmissionState::Submitting
    }

    pub fn begin_submit(&mut self) -> Option<Draft> {
        if !self.can_submit() {
            return None;
        }
        let description = self.description.trim();
        let draft = Draft {
            title: self.title.trim().to_string(),
            description: (!description.is_empty()).then(|| description.to_string()),
            category: self.category,
        };
        self.state = SubmissionState::Submitting;
        Some(draft)
    }

    pub fn finish_submit(&mut self, result: Result<()>) {
        self.state = match result {
            Ok(()) => SubmissionState::Success { at: Instant::now() },
            Err(e) => SubmissionState::Failed(e.to_string()),
        };
    }

    /// Run a full submission. Returns `true` on success.
    pub fn submit<T: HttpTransport>(&mut self, kit: &FeedbackKit<T>) -> bool {
        let Some(draft) = self.begin_submit() else {
            return false;
        };
        let result = kit.send_feedback(&draft.title, draft.description.as_deref(), draft.category);
        let ok = result.is_ok();
        self.finish_submit(result);
        ok
    }

    pub fn should_dismiss(&self, now: Instant) -> bool {
        match self.state {
            SubmissionState::Success { at } => now.saturating_duration_since(at) >= DISMISS_DELAY,
            _ => false,
        }
    }

    /// Inline error text for the last failed submission.
    pub fn error_text(&self) -> Option<&str> {
        match &self.state {
            SubmissionState::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// The public board: items, error banner and vote bookkeeping.
#[derive(Debug)]
pub struct PublicListModel {
    items: Vec<PublicItem>,
    error: Option<String>,
    /// In-flight upvotes, keyed by id, with the count shown before the bump.
    voting: HashMap<String, Option<u32>>,
    voted: VotedIds,
    limit: usize,
}

impl PublicListModel {
    /// Loads the persisted voted ids from `store`.
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self {
            items: Vec::new(),
            error: None,
            voting: HashMap::new(),
            voted: VotedIds::load(store),
            limit: DEFAULT_PAGE_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn items(&self) -> &[PublicItem] {
        &self.items
    }

    pub fn item(&self, id: &str) -> Option<&PublicItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Error banner text, if the last refresh or upvote failed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_voting(&self, id: &str) -> bool {
        self.voting.contains_key(id)
    }

    pub fn has_voted(&self, id: &str) -> bool {
        self.voted.contains(id)
    }

    /// Whether the upvote button for `id` is enabled.
    pub fn can_upvote(&self, id: &str) -> bool {
        !self.is_voting(id) && !self.has_voted(id)
    }

    /// Replace the items, or keep them and show the banner on failure.
    ///
    /// Items with an upvote still in flight take the fresh count as their
    /// rollback point and keep showing the optimistic bump on top of it.
    pub fn apply_refresh(&mut self, result: Result<Vec<PublicItem>>) -> Result<()> {
        match result {
            Ok(mut items) => {
                for item in &mut items {
                    if let Some(before) = self.voting.get_mut(&item.id) {
                        *before = item.votes;
                        item.votes = Some(bumped(item.votes));
                    }
                }
                self.items = items;
                self.error = None;
                Ok(())
            }
            Err(e) => {
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    pub fn refresh<T: HttpTransport>(&mut self, kit: &FeedbackKit<T>) -> Result<()> {
        let result = kit.fetch_public_items(self.limit);
        self.apply_refresh(result)
    }

    /// Optimistically count the vote. Returns `false` if the button should
    /// not have been enabled or the item is not listed.
    pub fn begin_upvote(&mut self, id: &str) -> bool {
        if !self.can_upvote(id) {
            return false;
        }
        let Some(item) = self.items.iter_mut().find(|item| item.id == id) else {
            return false;
        };
        let before = item.votes;
        item.votes = Some(bumped(before));
        self.voting.insert(id.to_string(), before);
        true
    }

    /// Reconcile with the server count, or restore the pre-vote count.
    pub fn finish_upvote(&mut self, id: &str, result: Result<Option<u32>>) -> Result<()> {
        let before = self.voting.remove(id);
        let item = self.items.iter_mut().find(|item| item.id == id);
        match result {
            Ok(server_votes) => {
                if let (Some(item), Some(votes)) = (item, server_votes) {
                    item.votes = Some(votes);
                }
                if let Err(e) = self.voted.record(id) {
                    warn!(feedback_id = id, error = %e, "could not persist voted id");
                }
                Ok(())
            }
            Err(e) => {
                if let (Some(item), Some(before)) = (item, before) {
                    item.votes = before;
                }
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Run a full upvote. `Ok(false)` means no request was made.
    pub fn upvote<T: HttpTransport>(&mut self, kit: &FeedbackKit<T>, id: &str) -> Result<bool> {
        if !self.begin_upvote(id) {
            return Ok(false);
        }
        let result = kit.upvote(id);
        self.finish_upvote(id, result).map(|()| true)
    }
}

fn bumped(votes: Option<u32>) -> u32 {
    votes.unwrap_or(0).saturating_add(1)
}
