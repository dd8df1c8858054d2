//! The internal event bus
//!
//! An unbounded FIFO queue from every pipeline stage to the single
//! broadcaster loop. Producers never wait on capacity.

use crate::events::Event;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Receiving side of the bus, owned by the broadcaster loop
pub type EventReceiver = UnboundedReceiver<Event>;

/// Producer handle onto the bus
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: UnboundedSender<Event>,
}

impl EventBus {
    /// Creates a bus and the receiver its consumer drains
    pub fn new() -> (Self, EventReceiver) {
        let (tx, rx) = unbounded_channel();
        (Self { tx }, rx)
    }

    /// Places an event on the bus
    ///
    /// Once the consumer is gone (during shutdown) events are dropped.
    pub fn emit(&self, event: Event) {
        if let Err(e) = self.tx.send(event) {
            tracing::trace!(
                "Event bus closed, dropping {} for task {}",
                e.0.kind.as_str(),
                e.0.task_id()
            );
        }
    }
}
