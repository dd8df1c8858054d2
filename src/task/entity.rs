//! The task entity and its externally visible snapshot

use crate::pipeline::ParsedPage;
use crate::state::TaskState;
use crate::task::handle::StageHandle;
use crate::{RelayError, StageError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;
use uuid::Uuid;

/// Unique task identifier, generated at creation and never reused
pub type TaskId = Uuid;

/// URL namespace under which saved images are exposed to clients
pub const IMAGE_NAMESPACE: &str = "images";

/// One URL's processing record
///
/// Mutated only while the registry lock is held. `stage_seq` increases every
/// time a stage is dispatched or cancelled; stage completions carry the
/// sequence number they were dispatched with and are dropped on mismatch.
#[derive(Debug)]
pub struct Task {
    pub id: TaskId,
    pub url: Url,
    pub scheduled_at: DateTime<Utc>,
    pub state: TaskState,
    pub title: Option<String>,
    pub heading: Option<String>,
    pub image_url: Option<Url>,
    pub image_path: Option<PathBuf>,
    pub error: Option<String>,
    pub(crate) content: Option<String>,
    pub(crate) handle: StageHandle,
    pub(crate) stage_seq: u64,
}

impl Task {
    /// Creates a task in the `Fetching` state with a fresh identifier
    pub fn new(url: Url, scheduled_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            url,
            scheduled_at,
            state: TaskState::Fetching,
            title: None,
            heading: None,
            image_url: None,
            image_path: None,
            error: None,
            content: None,
            handle: StageHandle::None,
            stage_seq: 0,
        }
    }

    /// Moves the task to `next` if the transition is legal
    pub fn transition(&mut self, next: TaskState) -> Result<(), RelayError> {
        if !self.state.can_transition_to(next) {
            return Err(RelayError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }

        tracing::debug!("Task {}: {} -> {}", self.id, self.state, next);
        self.state = next;
        Ok(())
    }

    /// Moves the task to `Error`, recording the stage failure
    pub fn fail(&mut self, error: &StageError) -> Result<(), RelayError> {
        self.transition(TaskState::Error)?;
        self.error = Some(error.to_string());
        self.content = None;
        Ok(())
    }

    /// Stores the extraction result, resolving the image reference against the task URL
    pub fn apply_extraction(&mut self, parsed: ParsedPage) {
        self.image_url = parsed
            .image_src
            .as_deref()
            .and_then(|src| resolve_image_url(src, &self.url));
        self.title = parsed.title;
        self.heading = parsed.heading;
    }

    /// Returns true if a completion dispatched at `seq` for a stage that
    /// runs in `expected` may still act on this task
    pub(crate) fn is_current(&self, seq: u64, expected: TaskState) -> bool {
        self.stage_seq == seq && self.state == expected
    }

    /// Starts a new stage generation and returns its sequence number
    pub(crate) fn next_stage(&mut self) -> u64 {
        self.stage_seq += 1;
        self.stage_seq
    }

    /// Builds the client-facing view of this task
    pub fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            id: self.id,
            url: self.url.to_string(),
            state: self.state,
            scheduled_at: self.scheduled_at,
            title: self.title.clone(),
            heading: self.heading.clone(),
            image_url: self.image_url.as_ref().map(Url::to_string),
            image_path: self.image_path.as_deref().and_then(public_image_path),
            error: self.error.clone(),
        }
    }
}

/// Serializable, point-in-time view of a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub url: String,
    pub state: TaskState,
    pub scheduled_at: DateTime<Utc>,
    pub title: Option<String>,
    pub heading: Option<String>,
    pub image_url: Option<String>,
    pub image_path: Option<String>,
    pub error: Option<String>,
}

/// Resolves an image `src` against the page URL
///
/// Empty references yield None; absolute references are kept as they are.
pub fn resolve_image_url(src: &str, base: &Url) -> Option<Url> {
    let src = src.trim();
    if src.is_empty() {
        return None;
    }

    match base.join(src) {
        Ok(url) => Some(url),
        Err(e) => {
            tracing::debug!("Unresolvable image reference '{}' on {}: {}", src, base, e);
            None
        }
    }
}

/// Maps a saved file to its relative path under the image namespace
fn public_image_path(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    Some(format!("{}/{}", IMAGE_NAMESPACE, file_name))
}
