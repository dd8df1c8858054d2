//! Event types carried on the bus and pushed to observers

use crate::state::TaskState;
use crate::task::{Task, TaskId, TaskSnapshot};
use serde::Serialize;

/// Kind of a broadcast message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A task changed state
    StatusChange,

    /// A task was admitted; carries the full snapshot
    UrlAdd,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StatusChange => "status_change",
            Self::UrlAdd => "url_add",
        }
    }
}

/// Payload of an event
///
/// Most transitions carry only the identifier and new state. Extraction adds
/// the extracted fields and the final transition carries the whole snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EventPayload {
    Status {
        id: TaskId,
        state: TaskState,
    },
    Extracted {
        id: TaskId,
        state: TaskState,
        title: Option<String>,
        heading: Option<String>,
        image_url: Option<String>,
    },
    Snapshot(TaskSnapshot),
}

impl EventPayload {
    pub fn task_id(&self) -> TaskId {
        match self {
            Self::Status { id, .. } | Self::Extracted { id, .. } => *id,
            Self::Snapshot(snapshot) => snapshot.id,
        }
    }

    pub fn state(&self) -> TaskState {
        match self {
            Self::Status { state, .. } | Self::Extracted { state, .. } => *state,
            Self::Snapshot(snapshot) => snapshot.state,
        }
    }
}

/// A message on the event bus, serialized as `{"kind": .., "payload": ..}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    pub kind: EventKind,
    pub payload: EventPayload,
}

impl Event {
    /// Minimal status change for a task
    pub fn status(task: &Task) -> Self {
        Self {
            kind: EventKind::StatusChange,
            payload: EventPayload::Status {
                id: task.id,
                state: task.state,
            },
        }
    }

    /// Status change carrying the freshly extracted fields
    pub fn extracted(task: &Task) -> Self {
        Self {
            kind: EventKind::StatusChange,
            payload: EventPayload::Extracted {
                id: task.id,
                state: task.state,
                title: task.title.clone(),
                heading: task.heading.clone(),
                image_url: task.image_url.as_ref().map(|url| url.to_string()),
            },
        }
    }

    /// Status change carrying the full snapshot
    pub fn finished(task: &Task) -> Self {
        Self {
            kind: EventKind::StatusChange,
            payload: EventPayload::Snapshot(task.snapshot()),
        }
    }

    /// Announcement of a newly admitted task
    pub fn url_added(snapshot: TaskSnapshot) -> Self {
        Self {
            kind: EventKind::UrlAdd,
            payload: EventPayload::Snapshot(snapshot),
        }
    }

    pub fn task_id(&self) -> TaskId {
        self.payload.task_id()
    }

    pub fn state(&self) -> TaskState {
        self.payload.state()
    }

    /// Returns true if this event announces a task entering `Fetching`
    pub fn is_admission(&self) -> bool {
        self.kind == EventKind::StatusChange && self.state() == TaskState::Fetching
    }
}
