//! Relay runtime: wires the pipeline, scheduler and broadcaster together
//!
//! `Relay::start` builds every long-lived component from a [`Config`] and
//! spawns the two background loops (event broadcasting and extraction
//! polling). `Relay::shutdown` stops them again and aborts whatever stage
//! work is still in flight.

use crate::config::Config;
use crate::events::{Broadcaster, EventBus};
use crate::pipeline::{build_http_client, ExtractionPool, Pipeline, PollScheduler};
use crate::task::TaskRegistry;
use crate::RelayError;
use std::path::Path;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// A running relay instance
pub struct Relay {
    pipeline: Pipeline,
    broadcaster: Broadcaster,
    shutdown_tx: broadcast::Sender<()>,
    scheduler_task: JoinHandle<()>,
    broadcaster_task: JoinHandle<()>,
}

impl Relay {
    /// Builds all components and starts the background loops
    ///
    /// Creates the image directory if it does not exist yet. Must be called
    /// from within a Tokio runtime.
    ///
    /// # Returns
    ///
    /// * `Ok(Relay)` - All components are running
    /// * `Err(RelayError)` - The image directory or HTTP client could not be
    ///   set up
    pub fn start(config: &Config) -> Result<Self, RelayError> {
        let image_dir = config.storage.image_dir.clone();
        std::fs::create_dir_all(&image_dir)?;
        tracing::info!("Saving images under {}", image_dir.display());

        let client = build_http_client(&config.user_agent)?;
        let pool = ExtractionPool::new(config.pipeline.extraction_workers);

        let registry = TaskRegistry::new();
        let (bus, bus_rx) = EventBus::new();
        let broadcaster = Broadcaster::new(registry.clone());
        let pipeline = Pipeline::new(
            registry,
            bus,
            client,
            pool,
            image_dir,
            config.pipeline.max_active,
        );

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let broadcaster_task = tokio::spawn(broadcaster.clone().run(bus_rx));

        let scheduler = PollScheduler::new(
            pipeline.clone(),
            Duration::from_millis(config.pipeline.poll_interval_ms),
        );
        let scheduler_task = tokio::spawn(scheduler.run(shutdown_rx));

        tracing::info!(
            "Relay started: max {} active, {} extraction worker(s), polling every {}ms",
            config.pipeline.max_active,
            config.pipeline.extraction_workers,
            config.pipeline.poll_interval_ms
        );

        Ok(Self {
            pipeline,
            broadcaster,
            shutdown_tx,
            scheduler_task,
            broadcaster_task,
        })
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    pub fn image_dir(&self) -> &Path {
        self.pipeline.image_dir()
    }

    /// Returns a receiver that fires when the relay shuts down
    pub fn shutdown_signal(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Stops the background loops and aborts in-flight stage work
    ///
    /// Task states are left as they are. Every observer subscription ends.
    pub async fn shutdown(self) {
        tracing::info!("Shutting down relay");

        // Receivers may already be gone; that is fine
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.scheduler_task.await {
            tracing::warn!("Scheduler task ended abnormally: {}", e);
        }

        self.pipeline.abort_all();
        self.broadcaster.close();

        // The bus stays open while pipeline handles exist, so stop the drain loop directly
        self.broadcaster_task.abort();
        let _ = self.broadcaster_task.await;

        tracing::info!("Relay stopped");
    }
}
