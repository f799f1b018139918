//! # LogWriter: renders lifecycle events through `tracing`
//!
//! ## Example output
//! ```text
//! INFO  [starting] task="controller" priority=very_critical
//! WARN  [message-dropped] task="glucose" channel=display err="channel display is full (50 slots)"
//! WARN  [halt-retry] channel=display attempt=1 delay_ms=5
//! INFO  [halt-broadcast] cycles=600
//! INFO  [terminated] task="syringe-watcher"
//! INFO  [all-stopped-within-grace]
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let label = e.kind.as_label();
        let task = e.task.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::TaskStarting => {
                tracing::info!(task, priority = ?e.priority, "[{label}]");
            }
            EventKind::TaskTerminated => {
                tracing::info!(task, "[{label}]");
            }
            EventKind::TaskFailed => {
                tracing::error!(task, err = reason, "[{label}]");
            }
            EventKind::PriorityDegraded => {
                tracing::warn!(task, priority = ?e.priority, err = reason, "[{label}]");
            }
            EventKind::MessageDropped => {
                tracing::warn!(task, channel = ?e.channel, err = reason, "[{label}]");
            }
            EventKind::HaltRetry => {
                tracing::warn!(channel = ?e.channel, attempt = ?e.attempt, delay_ms = ?e.delay_ms, "[{label}]");
            }
            EventKind::HaltForced => {
                tracing::error!(channel = ?e.channel, attempt = ?e.attempt, err = reason, "[{label}]");
            }
            EventKind::HaltBroadcast => {
                tracing::info!(cycles = ?e.attempt, "[{label}]");
            }
            EventKind::ShutdownRequested | EventKind::AllStoppedWithin => {
                tracing::info!("[{label}]");
            }
            EventKind::GraceExceeded => {
                tracing::error!(stuck = reason, "[{label}]");
            }
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked => {
                tracing::warn!(subscriber = task, info = reason, "[{label}]");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
