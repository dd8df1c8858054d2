//! Sumi-Relay: a URL harvesting pipeline with live status streaming
//!
//! This crate takes URLs, fetches their pages, extracts the title, first
//! heading and first image on a dedicated worker pool, saves that image to
//! disk, and broadcasts every state change to connected observers.

pub mod config;
pub mod events;
pub mod http;
pub mod pipeline;
pub mod relay;
pub mod state;
pub mod task;

use thiserror::Error;

/// Main error type for Sumi-Relay operations
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        source: ::url::ParseError,
    },

    #[error("Invalid schedule date '{0}'")]
    InvalidDate(String),

    #[error("Too many URLs are being processed at once ({active} of {limit})")]
    CapacityExceeded { active: usize, limit: usize },

    #[error("Task not found: {id}")]
    NotFound { id: String },

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::TaskState,
        to: state::TaskState,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures captured by a pipeline stage and recorded on the task
///
/// These never cross a stage boundary as errors. Their `Display` output is
/// what observers see in the task's `error` field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageError {
    #[error("Failed to fetch URL content ({0})")]
    Fetch(String),

    #[error("Failed to parse URL content ({0})")]
    Extraction(String),

    #[error("Failed to download image ({0})")]
    ImageHttp(String),

    #[error("Failed to save image ({0})")]
    ImageIo(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid listen address: {0}")]
    InvalidAddr(String),
}

/// Result type alias for Sumi-Relay operations
pub type Result<T> = std::result::Result<T, RelayError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use events::{Broadcaster, Event, EventBus, EventKind, Subscription};
pub use pipeline::{CancelOutcome, Pipeline};
pub use relay::Relay;
pub use state::TaskState;
pub use task::{TaskId, TaskRegistry, TaskSnapshot};
