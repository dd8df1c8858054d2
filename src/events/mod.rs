//! Event module: the internal bus and the observer broadcaster
//!
//! Every state change is emitted onto the [`EventBus`] while the registry lock
//! is held, so the bus order matches the order of mutations. A single
//! [`Broadcaster`] loop drains the bus and fans events out to observers.

mod broadcaster;
mod bus;
mod event;

pub use broadcaster::{Broadcaster, ObserverId, Subscription};
pub use bus::{EventBus, EventReceiver};
pub use event::{Event, EventKind, EventPayload};
