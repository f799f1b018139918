//! # Glucose and insulin infusion tasks.
//!
//! Both run the same level-triggered loop over their control channel:
//!
//! ```text
//! loop {
//!   match try_drain_latest(channel) {
//!     START ─► injecting = true,  alert *_START (URGENT)
//!     STOP  ─► injecting = false, alert *_STOP  (NORMAL)
//!     HALT  ─► terminated
//!     none  ─► keep previous state
//!   }
//!   if injecting { apply one dose }
//!   sleep(cycle)
//! }
//! ```
//!
//! A dose of glucose goes straight to the patient. A dose of insulin is pumped
//! from the syringe bank first: pump under the bank lock, signal the watcher,
//! release, then inject into the patient. Nothing is injected when the pump is
//! refused.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::core::Context;
use crate::error::{SyringeError, TaskError};
use crate::messaging::{Alert, ChannelId, Message, Priority};
use crate::tasks::Task;

/// What an [`InfusionTask`] delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drug {
    Glucose,
    Insulin,
}

impl Drug {
    pub fn name(self) -> &'static str {
        match self {
            Drug::Glucose => "glucose",
            Drug::Insulin => "insulin",
        }
    }

    pub fn channel(self) -> ChannelId {
        match self {
            Drug::Glucose => ChannelId::GlucoseCtrl,
            Drug::Insulin => ChannelId::InsulinCtrl,
        }
    }

    fn start_alert(self) -> Alert {
        match self {
            Drug::Glucose => Alert::GlucoseStart,
            Drug::Insulin => Alert::InsulinStart,
        }
    }

    fn stop_alert(self) -> Alert {
        match self {
            Drug::Glucose => Alert::GlucoseStop,
            Drug::Insulin => Alert::InsulinStop,
        }
    }
}

/// Periodic consumer of one control channel.
pub struct InfusionTask {
    drug: Drug,
    ctx: Context,
    priority: Priority,
    starts_injecting: bool,
}

impl InfusionTask {
    /// Glucose task; idle until told to start.
    pub fn glucose(ctx: Context) -> Self {
        let priority = ctx.config.priorities.glucose;
        Self {
            drug: Drug::Glucose,
            ctx,
            priority,
            starts_injecting: false,
        }
    }

    /// Insulin task; initial state from `Config::insulin_starts_injecting`.
    pub fn insulin(ctx: Context) -> Self {
        let priority = ctx.config.priorities.insulin;
        let starts_injecting = ctx.config.insulin_starts_injecting;
        Self {
            drug: Drug::Insulin,
            ctx,
            priority,
            starts_injecting,
        }
    }

    pub fn drug(&self) -> Drug {
        self.drug
    }

    /// Applies the latest directive to `injecting`.
    ///
    /// Returns `false` once `HALT` is received.
    fn apply_directive(&self, injecting: &mut bool) -> bool {
        let name = self.drug.name();
        match self.ctx.messages.try_drain_latest(self.drug.channel()) {
            Some(Message::Start) => {
                *injecting = true;
                self.ctx.post(
                    name,
                    ChannelId::Display,
                    self.drug.start_alert().into(),
                    Priority::Urgent,
                );
            }
            Some(Message::Stop) => {
                *injecting = false;
                self.ctx.post(
                    name,
                    ChannelId::Display,
                    self.drug.stop_alert().into(),
                    Priority::Normal,
                );
            }
            Some(Message::Halt) => return false,
            Some(other) => {
                tracing::warn!(task = name, msg = %other, "ignoring non-control message");
            }
            None => {}
        }
        true
    }

    /// Delivers one dose.
    fn dose(&self) {
        match self.drug {
            Drug::Glucose => self.ctx.patient.inject_glucose(),
            Drug::Insulin => {
                let pumped = {
                    let mut bank = self.ctx.syringe.lock();
                    let pumped = bank.pump();
                    self.ctx.syringe.notify_changed();
                    pumped
                };
                match pumped {
                    Ok(level) => {
                        tracing::trace!(level, "insulin pumped");
                        self.ctx.patient.inject_insulin();
                    }
                    Err(err @ SyringeError::Empty { .. }) => {
                        tracing::warn!(error = %err, "insulin dose skipped");
                    }
                    Err(SyringeError::Halted) => {
                        tracing::debug!("syringe bank halted, insulin dose skipped");
                    }
                }
            }
        }
    }
}

#[async_trait]
impl Task for InfusionTask {
    fn name(&self) -> &str {
        self.drug.name()
    }

    fn priority(&self) -> Priority {
        self.priority
    }

    async fn run(&self, _shutdown: CancellationToken) -> Result<(), TaskError> {
        let cycle = self.ctx.config.cycle_wall();
        let mut injecting = self.starts_injecting;

        loop {
            tokio::time::sleep(cycle).await;
            if !self.apply_directive(&mut injecting) {
                tracing::debug!(task = self.drug.name(), "halt received");
                return Ok(());
            }
            if injecting {
                self.dose();
            }
        }
    }
}
