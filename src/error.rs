//! Error types used by the regulation kernel and its tasks.
//!
//! This module defines four enums:
//!
//! - [`RuntimeError`]: errors raised by the supervisor itself.
//! - [`TaskError`]: errors raised by individual task executions.
//! - [`BusError`]: failures of a message-bus send.
//! - [`SyringeError`]: refused syringe bank operations.
//!
//! All of them provide `as_label` for logs/metrics. None of the message or
//! syringe failures are fatal during normal operation: a dropped control
//! directive is corrected by the next controller cycle and a dropped alert is a
//! missed notification. The one delivery that must never be lost is `HALT`,
//! which the bus retries and finally forces instead of dropping.

use std::time::Duration;
use thiserror::Error;

use crate::messaging::ChannelId;

/// # Errors produced by the supervisor runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some tasks never reached their terminal state.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Names of the tasks that did not terminate in time.
        stuck: Vec<String>,
    },

    /// A task thread or its runtime could not be created.
    #[error("failed to spawn task '{task}': {error}")]
    Spawn {
        /// Name of the task that failed to start.
        task: String,
        /// The underlying OS error message.
        error: String,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use glycovisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::Spawn { .. } => "runtime_spawn_failed",
        }
    }
}

/// # Errors produced by task execution.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TaskError {
    /// Task hit an unexpected condition but the system as a whole can continue.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Non-recoverable error; the task is gone for the rest of the run.
    #[error("fatal error: {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// Task observed cancellation before reaching its own terminal state.
    #[error("context cancelled")]
    Canceled,
}

impl TaskError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Fatal { .. } => "task_fatal",
            TaskError::Canceled => "task_canceled",
        }
    }
}

/// # Message-bus send failures.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// The channel already holds `capacity` messages; the send was not enqueued.
    #[error("channel {channel} is full ({capacity} slots)")]
    QueueFull {
        /// Channel that refused the message.
        channel: ChannelId,
        /// Bounded capacity of that channel.
        capacity: usize,
    },

    /// Nothing was queued. Benign: expected whenever a control channel has no backlog.
    #[error("channel {channel} is empty")]
    QueueEmpty {
        /// Channel that was polled.
        channel: ChannelId,
    },
}

impl BusError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            BusError::QueueFull { .. } => "bus_queue_full",
            BusError::QueueEmpty { .. } => "bus_queue_empty",
        }
    }
}

/// # Refused syringe bank operations.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyringeError {
    /// The bank was stopped; no further pump/switch/reset is allowed.
    #[error("syringe bank is halted")]
    Halted,

    /// The active reservoir cannot deliver another step.
    #[error("reservoir {reservoir} is empty")]
    Empty {
        /// 1-based reservoir number.
        reservoir: u8,
    },
}

impl SyringeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SyringeError::Halted => "syringe_halted",
            SyringeError::Empty { .. } => "syringe_empty",
        }
    }
}
