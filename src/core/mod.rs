//! Runtime core: context, configuration and supervision.
//!
//! Public API from this module: [`Supervisor`] (with its builder), [`Config`],
//! [`TaskPriorities`] and [`Context`].
//!
//! Internal modules:
//! - [`actor`]: runs one task on its own thread and runtime, publishing lifecycle events;
//! - [`supervisor`]: spawns actors, fans events out, bounds shutdown by the grace period;
//! - [`sched`]: real-time thread priorities;
//! - [`shutdown`]: OS termination signals.

mod actor;
mod builder;
mod config;
mod context;
mod sched;
mod shutdown;
mod supervisor;

pub use builder::SupervisorBuilder;
pub use config::{Config, TaskPriorities};
pub use context::Context;
pub use supervisor::Supervisor;
