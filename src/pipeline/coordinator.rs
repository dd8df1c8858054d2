//! Pipeline coordinator - stage orchestration for every task
//!
//! This module owns the per-task state machine:
//! - Admission control against the fetch-window cap
//! - Dispatching the fetch, extraction and image stages
//! - Applying stage completions behind the stage guard
//! - Cancelling whichever stage currently holds a task
//!
//! Every mutation of a task and the event announcing it happen while the
//! registry lock is held, so the event bus sees mutations in the order they
//! were applied. Completions only act if the task's stage sequence number
//! and state still match what they were dispatched with.

use crate::events::{Event, EventBus};
use crate::pipeline::fetcher::{download_image, fetch_content};
use crate::pipeline::worker_pool::{ExtractionPool, ExtractionResult, ExtractionTicket};
use crate::state::TaskState;
use crate::task::{StageHandle, Task, TaskId, TaskRegistry, TaskSnapshot};
use crate::{RelayError, StageError};
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

/// Result of a cancellation request on an existing task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The live stage was stopped
    Cancelled,

    /// The live stage could no longer be interrupted
    FailedToCancel,

    /// Nothing to do; the task was already in this state
    Ignored(TaskState),
}

struct PipelineInner {
    registry: TaskRegistry,
    bus: EventBus,
    client: Client,
    pool: ExtractionPool,
    image_dir: PathBuf,
    max_active: usize,
}

/// Cheaply cloneable handle to the task pipeline
#[derive(Clone)]
pub struct Pipeline {
    inner: Arc<PipelineInner>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("image_dir", &self.inner.image_dir)
            .field("max_active", &self.inner.max_active)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Creates a pipeline over the given collaborators
    ///
    /// # Arguments
    ///
    /// * `registry` - Task table shared with the scheduler and broadcaster
    /// * `bus` - Producer side of the event bus
    /// * `client` - HTTP client for page and image downloads
    /// * `pool` - Extraction worker pool
    /// * `image_dir` - Existing directory where images are written
    /// * `max_active` - Admission cap on tasks in `Fetching`/`Fetched`
    pub fn new(
        registry: TaskRegistry,
        bus: EventBus,
        client: Client,
        pool: ExtractionPool,
        image_dir: PathBuf,
        max_active: usize,
    ) -> Self {
        Self {
            inner: Arc::new(PipelineInner {
                registry,
                bus,
                client,
                pool,
                image_dir,
                max_active,
            }),
        }
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.inner.registry
    }

    pub fn image_dir(&self) -> &Path {
        &self.inner.image_dir
    }

    pub fn max_active(&self) -> usize {
        self.inner.max_active
    }

    /// Admits a batch of URLs and starts fetching them
    ///
    /// The cap is checked once for the whole batch: if fewer than
    /// `max_active` tasks occupy the fetch window, every URL in the batch is
    /// admitted. Must be called from within a Tokio runtime.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<TaskSnapshot>)` - One snapshot per admitted URL, in input order
    /// * `Err(RelayError::CapacityExceeded)` - Rejected; no task was created
    pub fn submit(
        &self,
        urls: &[Url],
        scheduled_at: DateTime<Utc>,
    ) -> Result<Vec<TaskSnapshot>, RelayError> {
        let mut table = self.inner.registry.lock();

        let active = table.count_in_fetch_window();
        if active >= self.inner.max_active {
            tracing::info!(
                "Rejecting {} URL(s): {} of {} fetch slots in use",
                urls.len(),
                active,
                self.inner.max_active
            );
            return Err(RelayError::CapacityExceeded {
                active,
                limit: self.inner.max_active,
            });
        }

        let snapshots = urls
            .iter()
            .map(|url| {
                let task = table.create(url.clone(), scheduled_at);
                tracing::info!("Task {} admitted for {}", task.id, task.url);
                self.inner.bus.emit(Event::status(task));
                self.start_fetch(task);
                task.snapshot()
            })
            .collect();

        Ok(snapshots)
    }

    /// Spawns the content fetch for a task that has just entered `Fetching`
    fn start_fetch(&self, task: &mut Task) {
        let seq = task.next_stage();
        let id = task.id;
        let url = task.url.clone();
        let pipeline = self.clone();

        let join = tokio::spawn(async move {
            let result = fetch_content(&pipeline.inner.client, &url).await;
            pipeline.complete_fetch(id, seq, result);
        });
        task.handle = StageHandle::Fetch(join.abort_handle());
    }

    fn complete_fetch(&self, id: TaskId, seq: u64, result: Result<String, StageError>) {
        let mut table = self.inner.registry.lock();
        let Some(task) = table.get_mut(&id) else {
            return;
        };
        if !task.is_current(seq, TaskState::Fetching) {
            tracing::debug!("Task {}: discarding stale fetch result", id);
            return;
        }
        task.handle = StageHandle::None;

        let outcome = match result {
            Ok(body) => {
                tracing::debug!("Task {}: fetched {} bytes", id, body.len());
                task.content = Some(body);
                task.transition(TaskState::Fetched)
            }
            Err(e) => {
                tracing::warn!("Task {}: {}", id, e);
                task.fail(&e)
            }
        };
        self.announce(task, outcome, Event::status);
    }

    /// Moves a due `Fetched` task into extraction
    ///
    /// Returns false if the task is unknown or no longer `Fetched`.
    pub fn begin_extraction(&self, id: &TaskId) -> bool {
        let mut table = self.inner.registry.lock();
        let Some(task) = table.get_mut(id) else {
            return false;
        };
        if task.state != TaskState::Fetched {
            return false;
        }

        let outcome = task.transition(TaskState::Extracting);
        self.announce(task, outcome, Event::status);

        let content = task.content.take().unwrap_or_default();
        let ticket = ExtractionTicket::new();
        let seq = task.next_stage();
        let id = task.id;
        let pipeline = self.clone();
        task.handle = StageHandle::Extract(ticket.clone());

        tokio::spawn(async move {
            // None means the job was withdrawn before it ran
            if let Some(result) = pipeline.inner.pool.extract(ticket, content).await {
                pipeline.complete_extraction(id, seq, result);
            }
        });
        true
    }

    fn complete_extraction(&self, id: TaskId, seq: u64, result: ExtractionResult) {
        let mut table = self.inner.registry.lock();
        let Some(task) = table.get_mut(&id) else {
            return;
        };
        if !task.is_current(seq, TaskState::Extracting) {
            tracing::debug!("Task {}: discarding stale extraction result", id);
            return;
        }
        task.handle = StageHandle::None;

        let parsed = match result {
            Ok(parsed) => parsed,
            Err(message) => {
                tracing::warn!("Task {}: extraction failed: {}", id, message);
                let outcome = task.fail(&StageError::Extraction(message));
                self.announce(task, outcome, Event::status);
                return;
            }
        };

        task.apply_extraction(parsed);
        let outcome = task.transition(TaskState::Extracted);
        self.announce(task, outcome, Event::extracted);

        match task.image_url.clone() {
            Some(image_url) => self.start_image_fetch(task, image_url),
            None => {
                let outcome = task.transition(TaskState::Done);
                self.announce(task, outcome, Event::finished);
            }
        }
    }

    /// Moves an `Extracted` task into the image stage and spawns the download
    fn start_image_fetch(&self, task: &mut Task, image_url: Url) {
        let outcome = task.transition(TaskState::ImageFetching);
        self.announce(task, outcome, Event::status);

        let seq = task.next_stage();
        let id = task.id;
        let pipeline = self.clone();

        let join = tokio::spawn(async move {
            let result = download_image(
                &pipeline.inner.client,
                &pipeline.inner.image_dir,
                &id,
                &image_url,
            )
            .await;
            if let Some(orphan) = pipeline.complete_image_fetch(id, seq, result) {
                remove_orphaned_image(&orphan).await;
            }
        });
        task.handle = StageHandle::Image(join.abort_handle());
    }

    /// Applies a finished image download
    ///
    /// Returns the saved file's path if the task has moved on in the
    /// meantime, so the caller can delete it.
    fn complete_image_fetch(
        &self,
        id: TaskId,
        seq: u64,
        result: Result<PathBuf, StageError>,
    ) -> Option<PathBuf> {
        let mut table = self.inner.registry.lock();
        let Some(task) = table
            .get_mut(&id)
            .filter(|task| task.is_current(seq, TaskState::ImageFetching))
        else {
            tracing::debug!("Task {}: discarding stale image result", id);
            return result.ok();
        };
        task.handle = StageHandle::None;

        // Image failures are recorded but never keep the task from finishing
        match result {
            Ok(path) => {
                tracing::debug!("Task {}: image saved to {}", id, path.display());
                task.image_path = Some(path);
            }
            Err(e) => {
                tracing::warn!("Task {}: {}", id, e);
                task.error = Some(e.to_string());
            }
        }

        let outcome = task.transition(TaskState::Done);
        if outcome.is_ok() {
            tracing::info!("Task {} done", id);
        }
        self.announce(task, outcome, Event::finished);
        None
    }

    /// Attempts to stop a task
    ///
    /// The task is announced as `Cancelling` before its live stage handle is
    /// asked to stop, then settles in `Cancelled` or `FailedToCancel`.
    /// Terminal tasks and tasks already being cancelled are left untouched
    /// and no event is emitted.
    ///
    /// # Returns
    ///
    /// * `Ok(CancelOutcome)` - What happened to the task
    /// * `Err(RelayError::NotFound)` - No task with this identifier
    pub fn cancel(&self, id: &TaskId) -> Result<CancelOutcome, RelayError> {
        let mut table = self.inner.registry.lock();
        let task = table
            .get_mut(id)
            .ok_or_else(|| RelayError::NotFound { id: id.to_string() })?;

        if !task.state.is_cancellable() {
            tracing::debug!("Task {}: cancel ignored in state {}", id, task.state);
            return Ok(CancelOutcome::Ignored(task.state));
        }

        let outcome = task.transition(TaskState::Cancelling);
        self.announce(task, outcome, Event::status);

        // Invalidate any completion still in flight for the current stage
        task.next_stage();
        let handle = std::mem::take(&mut task.handle);
        let stopped = handle.attempt_cancel();
        task.content = None;

        let (next, result) = if stopped {
            (TaskState::Cancelled, CancelOutcome::Cancelled)
        } else {
            (TaskState::FailedToCancel, CancelOutcome::FailedToCancel)
        };
        let outcome = task.transition(next);
        self.announce(task, outcome, Event::status);

        tracing::info!(
            "Task {}: {} stage handle -> {}",
            id,
            handle.stage_name(),
            next
        );
        Ok(result)
    }

    /// Stops every live stage without changing task states
    ///
    /// Used at process shutdown.
    pub fn abort_all(&self) {
        self.inner.pool.close();

        let table = self.inner.registry.lock();
        let mut aborted = 0;
        for task in table.iter().filter(|task| !task.state.is_terminal()) {
            task.handle.abort();
            aborted += 1;
        }
        if aborted > 0 {
            tracing::info!("Aborted {} in-flight task(s)", aborted);
        }
    }

    /// Emits the event for a transition that succeeded, logs one that did not
    fn announce(
        &self,
        task: &Task,
        outcome: Result<(), RelayError>,
        event: impl FnOnce(&Task) -> Event,
    ) {
        match outcome {
            Ok(()) => self.inner.bus.emit(event(task)),
            Err(e) => tracing::error!("Task {}: {}", task.id, e),
        }
    }
}

/// Deletes an image whose task was cancelled while it was being saved
async fn remove_orphaned_image(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!("Removed orphaned image {}", path.display()),
        Err(e) => tracing::warn!("Failed to remove orphaned image {}: {}", path.display(), e),
    }
}
