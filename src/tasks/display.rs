//! # DisplayTask: renders alerts for the operator.
//!
//! Blocks on the display channel, renders every message through an
//! [`AlertSink`], and stops right after rendering `HALT`.

use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::core::Context;
use crate::error::TaskError;
use crate::messaging::{ChannelId, Priority};
use crate::tasks::Task;

/// Destination of rendered alert lines.
pub trait AlertSink: Send + Sync + 'static {
    fn write_line(&self, line: &str);
}

/// Writes one line per alert to standard output.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl AlertSink for StdoutSink {
    fn write_line(&self, line: &str) {
        let mut out = std::io::stdout().lock();
        if let Err(err) = writeln!(out, "{line}") {
            tracing::warn!(error = %err, "failed to write alert line");
        }
    }
}

/// Keeps rendered lines in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every line written so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AlertSink for MemorySink {
    fn write_line(&self, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_string());
    }
}

pub struct DisplayTask {
    ctx: Context,
    sink: Arc<dyn AlertSink>,
    priority: Priority,
}

impl DisplayTask {
    pub const NAME: &'static str = "display";

    pub fn new(ctx: Context, sink: Arc<dyn AlertSink>) -> Self {
        let priority = ctx.config.priorities.display;
        Self {
            ctx,
            sink,
            priority,
        }
    }
}

#[async_trait]
impl Task for DisplayTask {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn priority(&self) -> Priority {
        self.priority
    }

    async fn run(&self, _shutdown: CancellationToken) -> Result<(), TaskError> {
        loop {
            let msg = self.ctx.messages.recv(ChannelId::Display).await;
            match msg.render() {
                Some(line) => self.sink.write_line(line),
                None => tracing::warn!(%msg, "control directive on display channel"),
            }
            if msg.is_halt() {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Config;
    use crate::messaging::{Alert, Message, Reservoir};
    use std::time::Duration;

    #[tokio::test]
    async fn test_renders_in_priority_order_and_stops_on_halt() {
        let ctx = Context::new(Config::default());
        let sink = Arc::new(MemorySink::new());
        let task = DisplayTask::new(ctx.clone(), sink.clone());

        let bus = &ctx.messages;
        bus.send(ChannelId::Display, Alert::AntibioticDue.into(), Priority::Weak)
            .unwrap();
        bus.send(ChannelId::Display, Alert::GlycemiaNormal.into(), Priority::Normal)
            .unwrap();
        bus.send(
            ChannelId::Display,
            Alert::SyringeCritical(Reservoir::Two).into(),
            Priority::Urgent,
        )
        .unwrap();
        bus.send(ChannelId::Display, Message::Halt, Priority::Normal)
            .unwrap();

        tokio::time::timeout(Duration::from_secs(1), task.run(CancellationToken::new()))
            .await
            .expect("display should stop after HALT")
            .unwrap();

        assert_eq!(
            sink.lines(),
            vec![
                "Solution level in syringe 2 reaches 1%",
                "Glycemia normal",
                "Stopping the system",
            ]
        );
        assert_eq!(
            ctx.messages.try_drain_latest(ChannelId::Display),
            Some(Message::Alert(Alert::AntibioticDue))
        );
    }

    #[tokio::test]
    async fn test_waits_for_messages() {
        let ctx = Context::new(Config::default());
        let sink = Arc::new(MemorySink::new());
        let task = DisplayTask::new(ctx.clone(), sink.clone());

        let producer = {
            let ctx = ctx.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                ctx.messages
                    .send(ChannelId::Display, Alert::Switch.into(), Priority::Normal)
                    .unwrap();
                ctx.messages
                    .send(ChannelId::Display, Message::Halt, Priority::Normal)
                    .unwrap();
            })
        };

        task.run(CancellationToken::new()).await.unwrap();
        producer.await.unwrap();
        assert_eq!(
            sink.lines(),
            vec!["Switch between syringe", "Stopping the system"]
        );
    }
}
