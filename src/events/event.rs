//! # Lifecycle events emitted by the supervisor, tasks and message bus.
//!
//! [`EventKind`] groups events into:
//! - **Task lifecycle**: a task thread starting, reaching its terminal state, failing
//! - **Delivery**: dropped messages and `HALT` retry/escalation
//! - **Shutdown**: signal observed, halt broadcast, join outcome
//! - **Subscriber**: overflow and panic reports
//!
//! Events are observability only. Control never depends on them.
//!
//! ## Ordering guarantees
//! Each event gets a globally unique, monotonically increasing `seq`.
//!
//! ## Example
//! ```rust
//! use glycovisor::{ChannelId, Event, EventKind};
//!
//! let ev = Event::new(EventKind::MessageDropped)
//!     .with_task("controller")
//!     .with_channel(ChannelId::Display)
//!     .with_reason("queue full");
//!
//! assert_eq!(ev.kind, EventKind::MessageDropped);
//! assert_eq!(ev.task.as_deref(), Some("controller"));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::messaging::{ChannelId, Priority};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(1);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked while handling an event.
    ///
    /// Sets: `task` (subscriber name), `reason` (panic info).
    SubscriberPanicked,

    /// Subscriber queue was full; the event was dropped for it only.
    ///
    /// Sets: `task` (subscriber name), `reason`.
    SubscriberOverflow,

    // === Task lifecycle ===
    /// Task thread is up and about to run.
    ///
    /// Sets: `task`, `priority`.
    TaskStarting,

    /// Task reached its terminal state.
    ///
    /// Sets: `task`.
    TaskTerminated,

    /// Task ended with an error instead of its terminal state.
    ///
    /// Sets: `task`, `reason`.
    TaskFailed,

    /// Real-time priority could not be applied; the task runs at the default policy.
    ///
    /// Sets: `task`, `priority`, `reason` (OS error).
    PriorityDegraded,

    // === Delivery ===
    /// A message was refused by a full channel and dropped.
    ///
    /// Sets: `task` (sender), `channel`, `priority`, `reason`.
    MessageDropped,

    /// `HALT` was refused; another attempt is scheduled.
    ///
    /// Sets: `channel`, `attempt`, `delay_ms`, `reason`.
    HaltRetry,

    /// `HALT` retries were exhausted and the message was forced in.
    ///
    /// Sets: `channel`, `attempt`, `reason`.
    HaltForced,

    // === Shutdown ===
    /// OS termination signal observed; the controller is asked to halt early.
    ShutdownRequested,

    /// Controller finished its cycles (or was cancelled) and broadcast `HALT`.
    ///
    /// Sets: `attempt` (cycles completed).
    HaltBroadcast,

    /// Every task terminated within the grace period.
    AllStoppedWithin,

    /// Grace period elapsed with tasks still alive.
    ///
    /// Sets: `reason` (stuck task names).
    GraceExceeded,
}

impl EventKind {
    /// Returns a short stable label (kebab-case) for log lines.
    pub fn as_label(self) -> &'static str {
        match self {
            EventKind::SubscriberPanicked => "subscriber-panicked",
            EventKind::SubscriberOverflow => "subscriber-overflow",
            EventKind::TaskStarting => "starting",
            EventKind::TaskTerminated => "terminated",
            EventKind::TaskFailed => "failed",
            EventKind::PriorityDegraded => "priority-degraded",
            EventKind::MessageDropped => "message-dropped",
            EventKind::HaltRetry => "halt-retry",
            EventKind::HaltForced => "halt-forced",
            EventKind::ShutdownRequested => "shutdown-requested",
            EventKind::HaltBroadcast => "halt-broadcast",
            EventKind::AllStoppedWithin => "all-stopped-within-grace",
            EventKind::GraceExceeded => "grace-exceeded",
        }
    }
}

/// Runtime event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Name of the task (or subscriber) concerned.
    pub task: Option<Arc<str>>,
    /// Human-readable reason (errors, dropped message, ...).
    pub reason: Option<Arc<str>>,
    /// Attempt or cycle counter.
    pub attempt: Option<u32>,
    /// Retry delay in milliseconds.
    pub delay_ms: Option<u32>,
    /// Message channel concerned.
    pub channel: Option<ChannelId>,
    /// Priority band concerned.
    pub priority: Option<Priority>,
}

impl Event {
    /// Creates an event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            reason: None,
            attempt: None,
            delay_ms: None,
            channel: None,
            priority: None,
        }
    }

    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a delay (stored as milliseconds, saturating).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(d.as_millis().min(u128::from(u32::MAX)) as u32);
        self
    }

    #[inline]
    pub fn with_channel(mut self, channel: ChannelId) -> Self {
        self.channel = Some(channel);
        self
    }

    #[inline]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_task(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_reason(info)
    }

    /// True for events that describe a task reaching the end of its thread.
    #[inline]
    pub fn is_task_exit(&self) -> bool {
        matches!(self.kind, EventKind::TaskTerminated | EventKind::TaskFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::new(EventKind::TaskStarting);
        let b = Event::new(EventKind::TaskStarting);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_delay_saturates() {
        let ev = Event::new(EventKind::HaltRetry).with_delay(Duration::from_secs(u64::MAX));
        assert_eq!(ev.delay_ms, Some(u32::MAX));
    }

    #[test]
    fn test_task_exit_kinds() {
        assert!(Event::new(EventKind::TaskTerminated).is_task_exit());
        assert!(Event::new(EventKind::TaskFailed).is_task_exit());
        assert!(!Event::new(EventKind::TaskStarting).is_task_exit());
    }
}
