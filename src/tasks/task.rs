//! # Task abstraction.
//!
//! Every component of the regulation loop implements [`Task`]. The supervisor
//! gives each task its own OS thread and runtime, applies its [`Priority`] to
//! that thread, and calls [`Task::run`] once.
//!
//! The [`CancellationToken`] passed to `run` is the runtime shutdown token. It
//! fires on an OS termination signal. Only the controller and the alarms react
//! to it directly; every consumer task stops on `HALT`, which the controller
//! sends once it sees the token.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::messaging::Priority;

/// Shared handle to a task.
pub type TaskRef = Arc<dyn Task>;

/// # Long-running component of the regulation loop.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
/// use glycovisor::{Priority, Task, TaskError};
///
/// struct Heartbeat;
///
/// #[async_trait]
/// impl Task for Heartbeat {
///     fn name(&self) -> &str { "heartbeat" }
///     fn priority(&self) -> Priority { Priority::Weak }
///
///     async fn run(&self, shutdown: CancellationToken) -> Result<(), TaskError> {
///         shutdown.cancelled().await;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Task: Send + Sync + 'static {
    /// Stable name, also used for the thread name.
    fn name(&self) -> &str;

    /// Scheduling band of the task's thread.
    fn priority(&self) -> Priority;

    /// Runs until the task reaches its terminal state.
    async fn run(&self, shutdown: CancellationToken) -> Result<(), TaskError>;
}
