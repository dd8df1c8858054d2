//! HTTP API Request/Response Types
//!
//! JSON-serializable types for the HTTP API.

use serde::{Deserialize, Serialize};

/// One entry of a submission batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlEntry {
    pub url: String,
}

/// Task submission body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTasksRequest {
    /// URLs to process, in order
    pub urls: Vec<UrlEntry>,
    /// When extraction may start; RFC 3339 or a naive date-time read as UTC
    pub date: String,
}

/// Cancellation acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelResponse {
    pub accepted: bool,
}

/// Error body returned by every failing endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error_message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error_message: message.into(),
        }
    }

    /// Body sent when the admission cap rejects a batch
    pub fn too_many_urls() -> Self {
        Self::new("Too many URLs are being processed at once")
    }
}
