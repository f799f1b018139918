//! # SubscriberSet: non-blocking fan-out over multiple subscribers
//!
//! ```text
//!    emit(&Event)
//!        │                        (Arc-clone per subscriber)
//!        ├────────────────► [queue S1] ─► worker S1 ─► on_event()
//!        ├────────────────► [queue S2] ─► worker S2 ─► on_event()
//!        └────────────────► [queue SN] ─► worker SN ─► on_event()
//! ```
//!
//! - `emit(&Event)` returns immediately; per-subscriber FIFO.
//! - A full queue drops the event for that subscriber only and reports
//!   `SubscriberOverflow` on the bus.
//! - Panics inside `on_event` are caught and reported as `SubscriberPanicked`.
//! - Overflow/panic reports are never re-emitted, so they cannot loop.

use std::sync::Arc;

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use super::Subscribe;
use crate::events::{Bus, Event, EventKind};

struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Composite fan-out with per-subscriber bounded queues and worker tasks.
pub struct SubscriberSet {
    channels: Vec<SubscriberChannel>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker per subscriber on the current runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(sub.queue_capacity().max(1));
            let worker_bus = bus.clone();

            let handle = tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let fut = sub.on_event(ev.as_ref());
                    if let Err(panic) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                        let info = panic
                            .downcast_ref::<&str>()
                            .map(|s| (*s).to_string())
                            .or_else(|| panic.downcast_ref::<String>().cloned())
                            .unwrap_or_else(|| "unknown panic".to_string());
                        tracing::error!(subscriber = name, %info, "subscriber panicked");
                        worker_bus.publish(Event::subscriber_panicked(name, info));
                    }
                }
            });

            channels.push(SubscriberChannel { name, sender: tx });
            workers.push(handle);
        }

        Self {
            channels,
            workers,
            bus,
        }
    }

    /// Fans one event out to every subscriber without waiting.
    pub fn emit(&self, event: &Event) {
        let ev = Arc::new(event.clone());
        for channel in &self.channels {
            let reason = match channel.sender.try_send(Arc::clone(&ev)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            tracing::warn!(subscriber = channel.name, reason, "subscriber dropped event");
            if !matches!(
                event.kind,
                EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
            ) {
                self.bus
                    .publish(Event::subscriber_overflow(channel.name, reason));
            }
        }
    }

    /// Closes all queues and waits for the workers to drain them.
    pub async fn shutdown(self) {
        drop(self.channels);
        for h in self.workers {
            let _ = h.await;
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Recorder(Mutex<Vec<EventKind>>);

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, ev: &Event) {
            self.0.lock().unwrap().push(ev.kind);
        }
        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    struct Panicker;

    #[async_trait]
    impl Subscribe for Panicker {
        async fn on_event(&self, _ev: &Event) {
            panic!("boom");
        }
        fn name(&self) -> &'static str {
            "panicker"
        }
    }

    #[tokio::test]
    async fn test_emit_reaches_every_subscriber_in_order() {
        let rec = Arc::new(Recorder(Mutex::new(Vec::new())));
        let set = SubscriberSet::new(vec![rec.clone() as Arc<dyn Subscribe>], Bus::new(8));
        assert_eq!(set.len(), 1);

        set.emit(&Event::new(EventKind::TaskStarting));
        set.emit(&Event::new(EventKind::TaskTerminated));
        set.shutdown().await;

        assert_eq!(
            *rec.0.lock().unwrap(),
            vec![EventKind::TaskStarting, EventKind::TaskTerminated]
        );
    }

    #[tokio::test]
    async fn test_panicking_subscriber_is_isolated_and_reported() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        let rec = Arc::new(Recorder(Mutex::new(Vec::new())));
        let set = SubscriberSet::new(
            vec![
                Arc::new(Panicker) as Arc<dyn Subscribe>,
                rec.clone() as Arc<dyn Subscribe>,
            ],
            bus,
        );

        set.emit(&Event::new(EventKind::HaltBroadcast));
        set.shutdown().await;

        assert_eq!(*rec.0.lock().unwrap(), vec![EventKind::HaltBroadcast]);
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::SubscriberPanicked);
        assert_eq!(ev.task.as_deref(), Some("panicker"));
        assert_eq!(ev.reason.as_deref(), Some("boom"));
    }
}
