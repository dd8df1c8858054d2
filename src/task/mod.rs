//! Task module: the per-URL record and the registry that owns it
//!
//! # Components
//!
//! - `Task` / `TaskSnapshot`: the mutable entity and its serializable view
//! - `StageHandle`: the live, cancellable unit of work for a task's current stage
//! - `TaskRegistry`: the shared identifier-to-task table
//! - `parse_scheduled_at`: schedule date parsing for incoming requests

mod entity;
mod handle;
mod registry;
mod schedule;

pub use entity::{resolve_image_url, Task, TaskId, TaskSnapshot, IMAGE_NAMESPACE};
pub use handle::StageHandle;
pub use registry::{TaskRegistry, TaskTable};
pub use schedule::parse_scheduled_at;
