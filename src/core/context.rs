//! # Shared context handed to every task.
//!
//! [`Context`] replaces process-wide globals: the patient model, the syringe
//! bank, the message channels, the lifecycle event bus and the halt token are
//! built once, before any task exists, and each task holds a cheap clone.
//!
//! ```text
//! Context::new(config)
//!   ├─ patient:  Arc<dyn Physiology>
//!   ├─ syringe:  Arc<SyringeBank>
//!   ├─ messages: Arc<MessageBus>   (glucose_ctrl, insulin_ctrl, display)
//!   ├─ events:   Bus               (lifecycle events, observability only)
//!   ├─ halt:     CancellationToken (fired by the controller after HALT)
//!   └─ config:   Arc<Config>
//! ```

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::config::Config;
use crate::events::{Bus, Event, EventKind};
use crate::messaging::{ChannelId, Message, MessageBus, Priority};
use crate::model::{LinearPatient, Physiology, SyringeBank};

/// Everything a task needs to talk to the rest of the system.
#[derive(Clone)]
pub struct Context {
    pub patient: Arc<dyn Physiology>,
    pub syringe: Arc<SyringeBank>,
    pub messages: Arc<MessageBus>,
    pub events: Bus,
    pub halt: CancellationToken,
    pub config: Arc<Config>,
}

impl Context {
    /// Builds a context around a [`LinearPatient`] seeded from `config`.
    pub fn new(config: Config) -> Self {
        let patient = LinearPatient::new(
            config.initial_glucose,
            config.initial_insulin,
            config.patient,
        );
        Self::with_patient(config, Arc::new(patient))
    }

    /// Builds a context around a custom physiology.
    pub fn with_patient(config: Config, patient: Arc<dyn Physiology>) -> Self {
        Self {
            patient,
            syringe: Arc::new(SyringeBank::new(config.syringe)),
            messages: Arc::new(MessageBus::new(config.queue_capacity_clamped())),
            events: Bus::new(config.bus_capacity_clamped()),
            halt: CancellationToken::new(),
            config: Arc::new(config),
        }
    }

    /// Sends `msg` and reports a refused send instead of failing.
    ///
    /// A full channel drops the message: it is logged at warn level and a
    /// `MessageDropped` event is published. Returns whether the message was
    /// enqueued.
    pub fn post(&self, sender: &str, id: ChannelId, msg: Message, priority: Priority) -> bool {
        match self.messages.send(id, msg, priority) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(task = sender, channel = %id, %msg, error = %err, "message dropped");
                self.events.publish(
                    Event::new(EventKind::MessageDropped)
                        .with_task(sender)
                        .with_channel(id)
                        .with_priority(priority)
                        .with_reason(err.to_string()),
                );
                false
            }
        }
    }
}
