//! # Priority bands.
//!
//! A [`Priority`] is attached to every enqueue and orders dequeue inside a
//! channel. The same scale is used for task scheduling: each task is spawned on
//! a thread whose `SCHED_FIFO` priority is [`Priority::rt_value`].
//!
//! ```text
//! VeryCritical (20) > Critical (18) > VeryUrgent (15) > Urgent (13) > Normal (10) > Weak (5)
//! ```

use std::fmt;

/// Ordered priority band. Higher bands are dequeued and scheduled first.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Priority {
    Weak = 5,
    #[default]
    Normal = 10,
    Urgent = 13,
    VeryUrgent = 15,
    Critical = 18,
    VeryCritical = 20,
}

impl Priority {
    /// All bands, lowest first.
    pub const ALL: [Priority; 6] = [
        Priority::Weak,
        Priority::Normal,
        Priority::Urgent,
        Priority::VeryUrgent,
        Priority::Critical,
        Priority::VeryCritical,
    ];

    /// Real-time scheduling priority for this band (`sched_param.sched_priority`).
    #[inline]
    pub fn rt_value(self) -> i32 {
        self as i32
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(self) -> &'static str {
        match self {
            Priority::Weak => "weak",
            Priority::Normal => "normal",
            Priority::Urgent => "urgent",
            Priority::VeryUrgent => "very_urgent",
            Priority::Critical => "critical",
            Priority::VeryCritical => "very_critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}
