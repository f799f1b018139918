//! # Event bus for broadcasting lifecycle events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`]. Every task
//! thread, the message bus and the supervisor publish into it; the supervisor
//! runs the single listener that fans events out to subscribers.
//!
//! ```text
//! Controller ──┐
//! Injectors  ──┤
//! Watcher    ──┼──► Bus ──► subscriber_listener ──► SubscriberSet
//! MessageBus ──┤  (broadcast)    (in Supervisor)
//! Supervisor ──┘
//! ```
//!
//! ## Rules
//! - `publish()` never blocks and works from any thread or runtime.
//! - One ring buffer of `capacity` events is shared by all receivers.
//! - Slow receivers get `RecvError::Lagged(n)` and skip `n` oldest events.
//! - Events published with no receiver are lost.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for runtime events. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus; capacity is clamped to a minimum of 1.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active receivers (fire-and-forget).
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a receiver observing events sent from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
