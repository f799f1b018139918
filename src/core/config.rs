//! # Global runtime configuration.
//!
//! Provides [`Config`], the settings shared by the supervisor and every task,
//! and [`TaskPriorities`], the priority band of each task.
//!
//! ## Simulated vs. wall time
//! Periods (`cycle`, alarm delays and periods) are given in *simulated* time.
//! The supervisor sleeps `period × time_factor` of wall time; see
//! [`Config::scaled`]. With the defaults one 500 ms cycle lasts 50 ms.
//!
//! ## Sentinel values
//! - `time_factor <= 0` or non-finite → treated as `1.0`
//! - `queue_capacity = 0` / `bus_capacity = 0` → clamped to 1
//! - `grace = 0s` → wait forever for tasks to terminate

use std::time::Duration;

use crate::messaging::{Priority, DEFAULT_CAPACITY};
use crate::model::{PatientParams, SyringeParams};
use crate::policies::BackoffPolicy;

/// Priority band assigned to each task.
///
/// Used for the OS scheduling priority of the task's thread when
/// [`Config::realtime`] is set, and reported in `TaskStarting` events.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TaskPriorities {
    pub controller: Priority,
    pub watcher: Priority,
    pub insulin: Priority,
    pub glucose: Priority,
    pub display: Priority,
    pub alarms: Priority,
}

impl Default for TaskPriorities {
    /// Controller > watcher > insulin > glucose > display > alarms.
    fn default() -> Self {
        Self {
            controller: Priority::VeryCritical,
            watcher: Priority::Critical,
            insulin: Priority::VeryUrgent,
            glucose: Priority::Urgent,
            display: Priority::Normal,
            alarms: Priority::Weak,
        }
    }
}

/// Global configuration.
///
/// ## Field semantics
/// - `cycle`: simulated period of the controller and infusion loops
/// - `total_cycles`: controller cycles before the halting protocol starts
/// - `grace`: maximum wall-clock wait for all tasks after `HALT` (`0s` = unbounded)
/// - `halt_backoff`/`halt_retries`: `HALT` resend schedule before it is forced
/// - `realtime`: request `SCHED_FIFO` priorities for task threads
/// - `handle_signals`: stop early on SIGINT/SIGTERM/SIGQUIT
#[derive(Clone, Debug)]
pub struct Config {
    /// Simulated duration of one control cycle.
    pub cycle: Duration,

    /// Wall time per unit of simulated time.
    pub time_factor: f64,

    /// Number of controller cycles in one run.
    pub total_cycles: u32,

    /// Slots per message channel.
    pub queue_capacity: usize,

    /// Patient glucose at startup.
    pub initial_glucose: i64,

    /// Patient insulin at startup.
    pub initial_insulin: i64,

    /// Simulated delay before the first antibiotic reminder.
    pub antibio_delay: Duration,

    /// Simulated period between antibiotic reminders.
    pub antibio_period: Duration,

    /// Simulated delay before the first anticoagulant reminder.
    pub anticoag_delay: Duration,

    /// Simulated period between anticoagulant reminders.
    pub anticoag_period: Duration,

    /// Maximum wait for every task to terminate once `HALT` is out.
    pub grace: Duration,

    /// Capacity of the lifecycle event bus.
    pub bus_capacity: usize,

    /// Delay schedule between `HALT` resends.
    pub halt_backoff: BackoffPolicy,

    /// Resends before `HALT` is forced into a saturated channel.
    pub halt_retries: u32,

    /// Initial injecting state of the insulin task.
    pub insulin_starts_injecting: bool,

    /// Apply real-time thread priorities.
    pub realtime: bool,

    /// Listen for OS termination signals.
    pub handle_signals: bool,

    /// Priority band of each task.
    pub priorities: TaskPriorities,

    /// Linear patient model constants.
    pub patient: PatientParams,

    /// Syringe bank constants.
    pub syringe: SyringeParams,
}

impl Config {
    /// Converts a simulated duration to wall time.
    #[inline]
    pub fn scaled(&self, simulated: Duration) -> Duration {
        simulated.mul_f64(self.time_factor_clamped())
    }

    /// Wall-clock duration of one control cycle.
    #[inline]
    pub fn cycle_wall(&self) -> Duration {
        self.scaled(self.cycle)
    }

    #[inline]
    pub fn time_factor_clamped(&self) -> f64 {
        if self.time_factor.is_finite() && self.time_factor > 0.0 {
            self.time_factor
        } else {
            1.0
        }
    }

    #[inline]
    pub fn queue_capacity_clamped(&self) -> usize {
        self.queue_capacity.max(1)
    }

    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns the grace period as an `Option` (`None` = wait forever).
    #[inline]
    pub fn grace_limit(&self) -> Option<Duration> {
        if self.grace == Duration::ZERO {
            None
        } else {
            Some(self.grace)
        }
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `cycle = 500ms`, `time_factor = 0.1`, `total_cycles = 600`
    /// - `queue_capacity = 50`, patient `100/0`
    /// - antibiotic `130s` then every `4h`, anticoagulant `10s` then every `24h`
    /// - `grace = 5s`, `bus_capacity = 1024`, `halt_retries = 5`
    /// - insulin starts injecting, no real-time priorities, signals handled
    fn default() -> Self {
        Self {
            cycle: Duration::from_millis(500),
            time_factor: 0.1,
            total_cycles: 600,
            queue_capacity: DEFAULT_CAPACITY,
            initial_glucose: 100,
            initial_insulin: 0,
            antibio_delay: Duration::from_secs(130),
            antibio_period: Duration::from_secs(4 * 3600),
            anticoag_delay: Duration::from_secs(10),
            anticoag_period: Duration::from_secs(24 * 3600),
            grace: Duration::from_secs(5),
            bus_capacity: 1024,
            halt_backoff: BackoffPolicy::default(),
            halt_retries: 5,
            insulin_starts_injecting: true,
            realtime: false,
            handle_signals: true,
            priorities: TaskPriorities::default(),
            patient: PatientParams::default(),
            syringe: SyringeParams::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cycle_is_fifty_ms_of_wall_time() {
        let cfg = Config::default();
        assert_eq!(cfg.cycle_wall(), Duration::from_millis(50));
        assert_eq!(cfg.scaled(cfg.anticoag_delay), Duration::from_secs(1));
    }

    #[test]
    fn test_sentinels() {
        let cfg = Config {
            time_factor: 0.0,
            queue_capacity: 0,
            grace: Duration::ZERO,
            ..Config::default()
        };
        assert_eq!(cfg.time_factor_clamped(), 1.0);
        assert_eq!(cfg.cycle_wall(), Duration::from_millis(500));
        assert_eq!(cfg.queue_capacity_clamped(), 1);
        assert_eq!(cfg.grace_limit(), None);
    }

    #[test]
    fn test_default_priority_order() {
        let p = TaskPriorities::default();
        assert!(p.controller > p.watcher);
        assert!(p.watcher > p.insulin);
        assert!(p.insulin > p.glucose);
        assert!(p.glucose > p.display);
        assert!(p.display > p.alarms);
    }
}
