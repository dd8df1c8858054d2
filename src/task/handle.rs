//! Live stage handles
//!
//! A task holds exactly one handle at a time, for whichever stage currently
//! owns it. Each variant knows how to attempt its own cancellation.

use crate::pipeline::ExtractionTicket;
use tokio::task::AbortHandle;

/// The unit of work currently running for a task
#[derive(Debug, Default)]
pub enum StageHandle {
    /// No stage is running
    #[default]
    None,

    /// Page download running on the async runtime
    Fetch(AbortHandle),

    /// Parse job queued on or running in the extraction pool
    Extract(ExtractionTicket),

    /// Image download and save running on the async runtime
    Image(AbortHandle),
}

impl StageHandle {
    /// Attempts to stop the work behind this handle
    ///
    /// Returns true if the work was stopped before it could finish. Async
    /// stages can be interrupted at any await point until they complete; an
    /// extraction job can only be withdrawn while it is still queued.
    pub fn attempt_cancel(&self) -> bool {
        match self {
            Self::None => true,
            Self::Fetch(handle) | Self::Image(handle) => {
                if handle.is_finished() {
                    false
                } else {
                    handle.abort();
                    true
                }
            }
            Self::Extract(ticket) => ticket.try_cancel(),
        }
    }

    /// Stops the underlying work without reporting an outcome
    ///
    /// Used at shutdown, where the task state is left as it is.
    pub fn abort(&self) {
        match self {
            Self::None => {}
            Self::Fetch(handle) | Self::Image(handle) => handle.abort(),
            Self::Extract(ticket) => {
                ticket.try_cancel();
            }
        }
    }

    /// Short name of the stage this handle belongs to, for logging
    pub fn stage_name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Fetch(_) => "fetch",
            Self::Extract(_) => "extract",
            Self::Image(_) => "image",
        }
    }
}
