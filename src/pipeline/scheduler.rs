//! Poll scheduler for deferred extraction
//!
//! Fetched documents wait until their scheduled time. The scheduler wakes
//! on a fixed interval, scans the registry and hands every due `Fetched`
//! task to the extraction stage. Nothing else moves a task out of
//! `Fetched`, so extraction starts at most one interval late.

use crate::pipeline::Pipeline;
use crate::state::TaskState;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::broadcast;

/// Periodic sweep over fetched tasks
#[derive(Debug, Clone)]
pub struct PollScheduler {
    pipeline: Pipeline,
    interval: Duration,
}

impl PollScheduler {
    pub fn new(pipeline: Pipeline, interval: Duration) -> Self {
        Self { pipeline, interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Runs one sweep at `now`
    ///
    /// # Returns
    ///
    /// The number of tasks moved into extraction
    pub fn tick(&self, now: DateTime<Utc>) -> usize {
        // Collect first so the registry lock is not held across dispatches
        let due: Vec<_> = self
            .pipeline
            .registry()
            .list()
            .into_iter()
            .filter(|task| task.state == TaskState::Fetched && task.scheduled_at <= now)
            .map(|task| task.id)
            .collect();

        let started = due
            .iter()
            .filter(|id| self.pipeline.begin_extraction(id))
            .count();

        if started > 0 {
            tracing::debug!("Scheduler started extraction for {} task(s)", started);
        }
        started
    }

    /// Sweeps every interval until `shutdown` fires
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::debug!("Scheduler polling every {:?}", self.interval);

        loop {
            self.tick(Utc::now());

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.recv() => {
                    tracing::debug!("Scheduler stopping");
                    break;
                }
            }
        }
    }
}
