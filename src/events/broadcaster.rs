//! Fan-out of bus events to connected observers
//!
//! The broadcaster drains the event bus in FIFO order and pushes every event
//! to each observer registered at the time of delivery. Delivery is
//! best-effort: an observer whose receiving side is gone is dropped from the
//! set and the remaining observers are unaffected.

use crate::events::{Event, EventReceiver};
use crate::task::TaskRegistry;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Identifier of a connected observer
pub type ObserverId = u64;

#[derive(Debug, Default)]
struct ObserverSet {
    next_id: ObserverId,
    observers: Vec<(ObserverId, UnboundedSender<Event>)>,
}

/// Shared broadcaster handle
#[derive(Debug, Clone)]
pub struct Broadcaster {
    observers: Arc<Mutex<ObserverSet>>,
    registry: TaskRegistry,
}

impl Broadcaster {
    /// Creates a broadcaster that reads task snapshots from `registry`
    pub fn new(registry: TaskRegistry) -> Self {
        Self {
            observers: Arc::new(Mutex::new(ObserverSet::default())),
            registry,
        }
    }

    fn observers(&self) -> MutexGuard<'_, ObserverSet> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a new observer
    ///
    /// The observer receives every event delivered after this call; nothing
    /// broadcast earlier is replayed.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = unbounded_channel();
        let mut set = self.observers();
        set.next_id += 1;
        let id = set.next_id;
        set.observers.push((id, tx));

        tracing::info!(
            "Observer {} connected ({} active)",
            id,
            set.observers.len()
        );
        Subscription { id, rx }
    }

    /// Number of observers currently in the active set
    pub fn observer_count(&self) -> usize {
        self.observers().observers.len()
    }

    /// Pushes one event to every observer, dropping those that are gone
    pub fn publish(&self, event: &Event) {
        let mut set = self.observers();
        set.observers.retain(|(id, tx)| match tx.send(event.clone()) {
            Ok(()) => true,
            Err(_) => {
                tracing::info!("Observer {} disconnected", id);
                false
            }
        });
    }

    /// Handles one event drained from the bus
    ///
    /// A status change into `Fetching` is followed by a `url_add` event with
    /// the full snapshot, so observers other than the submitter learn about
    /// the new task.
    pub fn dispatch(&self, event: Event) {
        self.publish(&event);

        if event.is_admission() {
            match self.registry.get(&event.task_id()) {
                Ok(snapshot) => self.publish(&Event::url_added(snapshot)),
                Err(e) => tracing::warn!("Cannot announce new task: {}", e),
            }
        }
    }

    /// Drains the bus until every producer is gone
    pub async fn run(self, mut rx: EventReceiver) {
        tracing::debug!("Broadcaster started");

        while let Some(event) = rx.recv().await {
            tracing::trace!(
                "Broadcasting {} for task {} ({})",
                event.kind.as_str(),
                event.task_id(),
                event.state()
            );
            self.dispatch(event);
        }

        tracing::debug!("Event bus closed, broadcaster stopping");
        self.close();
    }

    /// Disconnects every observer, ending their subscriptions
    pub fn close(&self) {
        let mut set = self.observers();
        if !set.observers.is_empty() {
            tracing::info!("Closing {} observer connection(s)", set.observers.len());
        }
        set.observers.clear();
    }
}

/// Receiving side of one observer
#[derive(Debug)]
pub struct Subscription {
    id: ObserverId,
    rx: UnboundedReceiver<Event>,
}

impl Subscription {
    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Waits for the next event; None once the broadcaster has closed
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    /// Returns the next event if one is already queued
    pub fn try_recv(&mut self) -> Result<Event, TryRecvError> {
        self.rx.try_recv()
    }

    pub fn into_stream(self) -> UnboundedReceiverStream<Event> {
        UnboundedReceiverStream::new(self.rx)
    }
}
