//! # Tasks of the regulation loop.
//!
//! | Task                   | Wakes on                | Talks to                               |
//! |------------------------|-------------------------|----------------------------------------|
//! | [`ControllerTask`]     | cycle timer             | glucose_ctrl, insulin_ctrl, display    |
//! | [`InfusionTask`] (x2)  | cycle timer             | its control channel, display, patient  |
//! | [`SyringeWatcherTask`] | syringe change signal   | syringe bank, display                  |
//! | [`DisplayTask`]        | display channel         | [`AlertSink`]                          |
//! | [`AlarmTask`] (x2)     | delay + period timer    | display                                |
//!
//! [`standard_tasks`] builds the full set over one [`Context`].

use std::sync::Arc;

use crate::core::Context;

mod alarm;
mod controller;
mod display;
mod infusion;
mod task;
mod watcher;

pub use alarm::AlarmTask;
pub use controller::{ControllerTask, Decision};
pub use display::{AlertSink, DisplayTask, MemorySink, StdoutSink};
pub use infusion::{Drug, InfusionTask};
pub use task::{Task, TaskRef};
pub use watcher::{inspect_and_act, SyringeWatcherTask, WatchOutcome};

/// Controller, both infusion tasks, the watcher, the display and both alarms.
pub fn standard_tasks(ctx: &Context, sink: Arc<dyn AlertSink>) -> Vec<TaskRef> {
    vec![
        Arc::new(ControllerTask::new(ctx.clone())),
        Arc::new(SyringeWatcherTask::new(ctx.clone())),
        Arc::new(InfusionTask::insulin(ctx.clone())),
        Arc::new(InfusionTask::glucose(ctx.clone())),
        Arc::new(DisplayTask::new(ctx.clone(), sink)),
        Arc::new(AlarmTask::antibiotic(ctx.clone())),
        Arc::new(AlarmTask::anticoagulant(ctx.clone())),
    ]
}
