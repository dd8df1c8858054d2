//! State module for tracking pipeline progress
//!
//! # Components
//!
//! - `TaskState`: the state of one task (fetching, extracting, done, cancelled, etc.)
//!   together with the table of legal transitions between states

mod task_state;

pub use task_state::TaskState;
