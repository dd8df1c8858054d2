/// Task state definitions for tracking pipeline progress
///
/// This module defines every state a task can occupy on its way through the
/// fetch, extract and image stages, plus the cancellation branch.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the current state of a task in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    // ===== Pipeline States =====
    /// Page body is being downloaded
    Fetching,

    /// Page body is downloaded and waits for its scheduled time
    Fetched,

    /// Page body is being parsed on the extraction pool
    Extracting,

    /// Title, heading and image reference have been extracted
    Extracted,

    /// The referenced image is being downloaded and saved
    ImageFetching,

    // ===== Cancellation Branch =====
    /// Cancellation was requested, outcome not yet known
    Cancelling,

    // ===== Terminal States =====
    /// Every stage ran to completion
    Done,

    /// The live stage was stopped before it finished
    Cancelled,

    /// The live stage was already past the point of interruption
    FailedToCancel,

    /// A stage failed; the task's error field holds the cause
    Error,
}

impl TaskState {
    /// Returns true if this is a terminal state (no stage will act on the task again)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Done | Self::Cancelled | Self::FailedToCancel | Self::Error
        )
    }

    /// Returns true if tasks in this state count against the admission cap
    pub fn occupies_fetch_window(&self) -> bool {
        matches!(self, Self::Fetching | Self::Fetched)
    }

    /// Returns true if cancellation may be requested from this state
    pub fn is_cancellable(&self) -> bool {
        !self.is_terminal() && *self != Self::Cancelling
    }

    /// Returns true if moving from `self` to `next` is a legal transition
    ///
    /// Pipeline states only move forward. Any non-terminal pipeline state may
    /// branch into `Cancelling`, and the stages that can fail may branch into
    /// `Error`. `Extracted -> Done` covers documents without an image.
    pub fn can_transition_to(&self, next: TaskState) -> bool {
        use TaskState::*;

        match (*self, next) {
            (Fetching, Fetched) | (Fetching, Error) => true,
            (Fetched, Extracting) => true,
            (Extracting, Extracted) | (Extracting, Error) => true,
            (Extracted, ImageFetching) | (Extracted, Done) => true,
            (ImageFetching, Done) => true,
            (Cancelling, Cancelled) | (Cancelling, FailedToCancel) => true,
            (from, Cancelling) => from.is_cancellable(),
            _ => false,
        }
    }

    /// Converts the state to its wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetching => "fetching",
            Self::Fetched => "fetched",
            Self::Extracting => "extracting",
            Self::Extracted => "extracted",
            Self::ImageFetching => "image_fetching",
            Self::Cancelling => "cancelling",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
            Self::FailedToCancel => "failed_to_cancel",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
