//! # Periodic medication reminders.
//!
//! Two independent alarms feed the display channel at [`Priority::Weak`]:
//! antibiotic and anticoagulant. Each waits its initial delay, then fires on a
//! fixed period until the halt token is cancelled. A saturated display channel
//! drops the reminder (logged, never retried).

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::core::Context;
use crate::error::TaskError;
use crate::messaging::{Alert, ChannelId, Message, Priority};
use crate::tasks::Task;

pub struct AlarmTask {
    name: &'static str,
    alert: Alert,
    delay: Duration,
    period: Duration,
    ctx: Context,
    priority: Priority,
}

impl AlarmTask {
    /// Antibiotic reminder (`antibio_delay`, then every `antibio_period`).
    pub fn antibiotic(ctx: Context) -> Self {
        let (delay, period) = (ctx.config.antibio_delay, ctx.config.antibio_period);
        Self::new("antibiotic-alarm", Alert::AntibioticDue, delay, period, ctx)
    }

    /// Anticoagulant reminder (`anticoag_delay`, then every `anticoag_period`).
    pub fn anticoagulant(ctx: Context) -> Self {
        let (delay, period) = (ctx.config.anticoag_delay, ctx.config.anticoag_period);
        Self::new(
            "anticoagulant-alarm",
            Alert::AnticoagulantDue,
            delay,
            period,
            ctx,
        )
    }

    /// Custom alarm; `delay` and `period` are simulated durations.
    pub fn new(
        name: &'static str,
        alert: Alert,
        delay: Duration,
        period: Duration,
        ctx: Context,
    ) -> Self {
        let priority = ctx.config.priorities.alarms;
        Self {
            name,
            alert,
            delay,
            period,
            ctx,
            priority,
        }
    }
}

#[async_trait]
impl Task for AlarmTask {
    fn name(&self) -> &str {
        self.name
    }

    fn priority(&self) -> Priority {
        self.priority
    }

    async fn run(&self, shutdown: CancellationToken) -> Result<(), TaskError> {
        let cfg = &self.ctx.config;
        let start = Instant::now() + cfg.scaled(self.delay);
        let period = cfg.scaled(self.period).max(Duration::from_millis(1));

        let mut ticker = time::interval_at(start, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = self.ctx.halt.cancelled() => return Ok(()),
                _ = shutdown.cancelled() => return Ok(()),
                _ = ticker.tick() => {
                    tracing::debug!(alarm = self.name, "reminder due");
                    self.ctx.post(
                        self.name,
                        ChannelId::Display,
                        Message::Alert(self.alert),
                        Priority::Weak,
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Config;
    use crate::events::EventKind;

    fn fast_ctx(capacity: usize) -> Context {
        Context::new(Config {
            time_factor: 1.0,
            queue_capacity: capacity,
            ..Config::default()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_delay_then_every_period() {
        let ctx = fast_ctx(50);
        let alarm = AlarmTask::new(
            "test-alarm",
            Alert::AnticoagulantDue,
            Duration::from_secs(10),
            Duration::from_secs(60),
            ctx.clone(),
        );
        let handle = {
            let ctx = ctx.clone();
            tokio::spawn(async move {
                time::sleep(Duration::from_secs(135)).await;
                ctx.halt.cancel();
            })
        };

        alarm.run(CancellationToken::new()).await.unwrap();
        handle.await.unwrap();

        // t = 10, 70, 130
        assert_eq!(ctx.messages.channel(ChannelId::Display).len(), 3);
        assert_eq!(
            ctx.messages.try_drain_latest(ChannelId::Display),
            Some(Message::Alert(Alert::AnticoagulantDue))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_display_drops_reminder() {
        let ctx = fast_ctx(1);
        let mut rx = ctx.events.subscribe();
        ctx.messages
            .send(ChannelId::Display, Alert::GlycemiaNormal.into(), Priority::Normal)
            .unwrap();

        let alarm = AlarmTask::antibiotic(ctx.clone());
        let handle = {
            let ctx = ctx.clone();
            tokio::spawn(async move {
                time::sleep(Duration::from_secs(131)).await;
                ctx.halt.cancel();
            })
        };
        alarm.run(CancellationToken::new()).await.unwrap();
        handle.await.unwrap();

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::MessageDropped);
        assert_eq!(ev.task.as_deref(), Some("antibiotic-alarm"));
        assert_eq!(
            ctx.messages.try_drain_latest(ChannelId::Display),
            Some(Message::Alert(Alert::GlycemiaNormal))
        );
    }

    #[tokio::test]
    async fn test_stops_when_halted() {
        let ctx = fast_ctx(50);
        ctx.halt.cancel();
        let alarm = AlarmTask::anticoagulant(ctx.clone());
        time::timeout(Duration::from_secs(1), alarm.run(CancellationToken::new()))
            .await
            .expect("halted alarm should return")
            .unwrap();
        assert!(ctx.messages.channel(ChannelId::Display).is_empty());
    }
}
