//! # ControllerTask: the regulation heartbeat.
//!
//! ```text
//! Running:  every cycle
//!             glycemia <= crit ─► glucose_ctrl START, insulin_ctrl STOP, display GLYCEMIA_CRITICAL  (all CRITICAL)
//!             glycemia >= ref  ─► glucose_ctrl STOP,  insulin_ctrl START (URGENT), display GLYCEMIA_NORMAL (NORMAL)
//!             otherwise        ─► nothing (hysteresis band)
//! Halting:  after total_cycles (or on shutdown)
//!             HALT ─► glucose_ctrl, insulin_ctrl, display   (retried, then forced)
//!             syringe.stop() + notify
//!             halt token cancelled (alarms stop)
//! Terminated
//! ```

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::core::Context;
use crate::error::TaskError;
use crate::events::{Event, EventKind};
use crate::messaging::{Alert, ChannelId, Message, Priority};
use crate::tasks::Task;

/// Outcome of one controller cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Glycemia at or below the critical threshold: glucose on, insulin off.
    Critical,
    /// Glycemia at or above the reference threshold: glucose off, insulin on.
    Normal,
    /// Between the thresholds: directives unchanged.
    Hold,
}

impl Decision {
    /// Classifies `glycemia` against the two thresholds.
    pub fn classify(glycemia: f64, ref_threshold: f64, crit_threshold: f64) -> Self {
        if glycemia <= crit_threshold {
            Decision::Critical
        } else if glycemia >= ref_threshold {
            Decision::Normal
        } else {
            Decision::Hold
        }
    }
}

pub struct ControllerTask {
    ctx: Context,
    priority: Priority,
}

impl ControllerTask {
    pub const NAME: &'static str = "controller";

    pub fn new(ctx: Context) -> Self {
        let priority = ctx.config.priorities.controller;
        Self { ctx, priority }
    }

    /// Samples the patient once and posts the resulting directives.
    pub fn step(&self) -> Decision {
        let patient = &self.ctx.patient;
        let glycemia = patient.compute_glycemia();
        let decision =
            Decision::classify(glycemia, patient.ref_threshold(), patient.crit_threshold());
        tracing::debug!(glycemia, ?decision, "controller cycle");

        match decision {
            Decision::Critical => {
                self.post(ChannelId::GlucoseCtrl, Message::Start, Priority::Critical);
                self.post(ChannelId::InsulinCtrl, Message::Stop, Priority::Critical);
                self.post(
                    ChannelId::Display,
                    Alert::GlycemiaCritical.into(),
                    Priority::Critical,
                );
            }
            Decision::Normal => {
                self.post(ChannelId::GlucoseCtrl, Message::Stop, Priority::Urgent);
                self.post(ChannelId::InsulinCtrl, Message::Start, Priority::Urgent);
                self.post(
                    ChannelId::Display,
                    Alert::GlycemiaNormal.into(),
                    Priority::Normal,
                );
            }
            Decision::Hold => {}
        }
        decision
    }

    /// Broadcasts `HALT`, stops the syringe bank and fires the halt token.
    pub async fn halt(&self, cycles: u32) {
        let cfg = &self.ctx.config;
        tracing::info!(cycles, "controller halting");
        self.ctx
            .events
            .publish(Event::new(EventKind::HaltBroadcast).with_attempt(cycles));

        for id in ChannelId::ALL {
            let delivery = self
                .ctx
                .messages
                .send_halt(id, &cfg.halt_backoff, cfg.halt_retries, &self.ctx.events)
                .await;
            tracing::debug!(channel = %id, ?delivery, "halt delivered");
        }

        self.ctx.syringe.stop();
        self.ctx.halt.cancel();
    }

    fn post(&self, id: ChannelId, msg: Message, priority: Priority) {
        self.ctx.post(Self::NAME, id, msg, priority);
    }
}

#[async_trait]
impl Task for ControllerTask {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn priority(&self) -> Priority {
        self.priority
    }

    async fn run(&self, shutdown: CancellationToken) -> Result<(), TaskError> {
        let cycle = self.ctx.config.cycle_wall();
        let total = self.ctx.config.total_cycles;
        let mut completed: u32 = 0;

        while completed < total {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!(completed, "shutdown requested, skipping remaining cycles");
                    break;
                }
                _ = tokio::time::sleep(cycle) => {}
            }
            self.step();
            completed += 1;
        }

        self.halt(completed).await;
        Ok(())
    }
}
