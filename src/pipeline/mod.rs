//! Pipeline module: the stages every submitted URL goes through
//!
//! This module contains the core processing logic, including:
//! - HTTP fetching of pages and images
//! - HTML parsing on a dedicated extraction pool
//! - Periodic scheduling of deferred extraction
//! - Stage coordination, admission control and cancellation

mod coordinator;
mod fetcher;
mod parser;
mod scheduler;
mod worker_pool;

pub use coordinator::{CancelOutcome, Pipeline};
pub use fetcher::{build_http_client, download_image, fetch_content, image_file_name};
pub use parser::{parse_html, ParsedPage};
pub use scheduler::PollScheduler;
pub use worker_pool::{ExtractionPool, ExtractionResult, ExtractionTicket};
