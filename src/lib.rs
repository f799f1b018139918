//! # glycovisor
//!
//! **Glycovisor** is a simulated closed-loop glycemia regulator. A controller
//! samples a patient model every cycle and drives glucose and insulin infusion
//! through prioritized message channels. A watcher keeps the insulin syringes
//! supplied, and the operator sees alerts on a display.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  ┌───────────────────────────────────────────────────────────────────┐
//!  │ Context (built once, cloned into every task)                      │
//!  │  - Physiology (patient)    - SyringeBank (lock + change signal)   │
//!  │  - MessageBus (3 channels) - Bus (lifecycle events) - halt token  │
//!  └───────────────────────────────────────────────────────────────────┘
//!
//!   ControllerTask ──START/STOP──► glucose_ctrl ──► InfusionTask(glucose) ──► patient
//!         │        ──START/STOP──► insulin_ctrl ──► InfusionTask(insulin) ──► syringe ─┐
//!         │                                                 │             ──► patient  │
//!         │                                                 │                          │
//!         └─ alerts ──┐            alerts ──────────────────┘      change signal ◄─────┘
//!                     ▼                                                  │
//!   AlarmTask (x2) ──► display ──► DisplayTask ──► AlertSink             ▼
//!                        ▲                                       SyringeWatcherTask
//!                        └──────────────── alerts ───────────────────────┘
//! ```
//!
//! ### Supervision
//! ```text
//! Supervisor::run()
//!   ├─► one TaskActor per task: OS thread + current-thread runtime (+ SCHED_FIFO)
//!   ├─► Bus ─► subscriber_listener ─► SubscriberSet ─► LogWriter, AliveTracker, ...
//!   └─► join: every task terminated ─► Ok, grace exceeded ─► RuntimeError::GraceExceeded
//! ```
//!
//! ### Shutdown
//! ```text
//! controller: total_cycles done (or OS signal)
//!   ├─► HALT ─► glucose_ctrl, insulin_ctrl, display   (retried with backoff, then forced)
//!   ├─► SyringeBank::stop() + change signal           (watcher sees the -1 sentinel)
//!   └─► halt token                                    (alarms stop)
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                          |
//! |-------------------|--------------------------------------------------------------|---------------------------------------------|
//! | **Messaging**     | Bounded priority channels, latest-wins drain, HALT delivery. | [`MessageBus`], [`Message`], [`Priority`]   |
//! | **Model**         | Patient physiology and the two-reservoir syringe bank.       | [`Physiology`], [`SyringeBank`]             |
//! | **Tasks**         | Controller, infusion, watcher, display, alarms.              | [`Task`], [`standard_tasks`]                |
//! | **Supervision**   | Threads, priorities, grace-bounded shutdown.                 | [`Supervisor`], [`Config`]                  |
//! | **Subscriber API**| Hook into lifecycle events (logging, custom subscribers).    | [`Subscribe`], [`LogWriter`]                |
//! | **Errors**        | Typed errors for the runtime, tasks, channels and syringes.  | [`RuntimeError`], [`BusError`]              |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use glycovisor::{Config, MemorySink, Supervisor};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config {
//!         cycle: Duration::from_millis(2),
//!         time_factor: 1.0,
//!         total_cycles: 20,
//!         handle_signals: false,
//!         ..Config::default()
//!     };
//!
//!     let sink = Arc::new(MemorySink::new());
//!     let sup = Supervisor::builder(cfg).with_sink(sink.clone()).build();
//!     sup.run().await?;
//!
//!     assert_eq!(sink.lines().last().map(String::as_str), Some("Stopping the system"));
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod messaging;
mod model;
mod policies;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use core::{Config, Context, Supervisor, SupervisorBuilder, TaskPriorities};
pub use error::{BusError, RuntimeError, SyringeError, TaskError};
pub use events::{Bus, Event, EventKind};
pub use messaging::{
    Alert, ChannelId, HaltDelivery, Message, MessageBus, MessageFamily, Priority, PriorityChannel,
    Reservoir, DEFAULT_CAPACITY,
};
pub use model::{
    LinearPatient, PatientParams, Physiology, Reading, SyringeBank, SyringeGuard, SyringeParams,
    HALTED,
};
pub use policies::{BackoffPolicy, JitterPolicy};
pub use subscribers::{AliveTracker, LogWriter, Subscribe, SubscriberSet};
pub use tasks::{
    inspect_and_act, standard_tasks, AlarmTask, AlertSink, ControllerTask, Decision, DisplayTask,
    Drug, InfusionTask, MemorySink, StdoutSink, SyringeWatcherTask, Task, TaskRef, WatchOutcome,
};
