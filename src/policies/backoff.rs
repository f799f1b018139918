//! # Backoff policy for re-sending `HALT`.
//!
//! When a channel is saturated at shutdown the halt is retried after a delay
//! computed as `first × factor^attempt`, clamped to `max`, then jittered.
//! The base is derived from the attempt number alone, so jitter never feeds
//! back into later delays.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use glycovisor::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(5),
//!     max: Duration::from_millis(100),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(backoff.next(0), Duration::from_millis(5));
//! assert_eq!(backoff.next(2), Duration::from_millis(20));
//! assert_eq!(backoff.next(10), Duration::from_millis(100));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Retry backoff policy.
#[derive(Clone, Copy, Debug)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    pub first: Duration,
    /// Upper bound for any delay.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
    /// Randomization applied to the clamped delay.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// `first = 5ms`, `factor = 2.0`, `max = 200ms`, equal jitter.
    ///
    /// Short enough that a stuck display queue cannot hold shutdown for more
    /// than a few controller cycles.
    fn default() -> Self {
        Self {
            first: Duration::from_millis(5),
            max: Duration::from_millis(200),
            factor: 2.0,
            jitter: JitterPolicy::Equal,
        }
    }
}

impl BackoffPolicy {
    /// Delay before retry number `attempt` (0-indexed).
    pub fn next(&self, attempt: u32) -> Duration {
        let exp = attempt.min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);

        let base = if !secs.is_finite() || secs < 0.0 || secs > self.max.as_secs_f64() {
            self.max
        } else {
            Duration::from_secs_f64(secs)
        };
        self.jitter.apply(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(first_ms: u64, max_ms: u64, factor: f64, jitter: JitterPolicy) -> BackoffPolicy {
        BackoffPolicy {
            first: Duration::from_millis(first_ms),
            max: Duration::from_millis(max_ms),
            factor,
            jitter,
        }
    }

    #[test]
    fn test_attempt_zero_returns_first() {
        let p = policy(10, 1_000, 2.0, JitterPolicy::None);
        assert_eq!(p.next(0), Duration::from_millis(10));
    }

    #[test]
    fn test_exponential_growth_then_cap() {
        let p = policy(10, 100, 2.0, JitterPolicy::None);
        assert_eq!(p.next(1), Duration::from_millis(20));
        assert_eq!(p.next(2), Duration::from_millis(40));
        assert_eq!(p.next(3), Duration::from_millis(80));
        assert_eq!(p.next(4), Duration::from_millis(100));
    }

    #[test]
    fn test_first_above_max_is_clamped() {
        let p = policy(500, 50, 1.0, JitterPolicy::None);
        assert_eq!(p.next(0), Duration::from_millis(50));
    }

    #[test]
    fn test_overflowing_attempt_clamps_to_max() {
        let p = policy(10, 300, 2.0, JitterPolicy::None);
        assert_eq!(p.next(u32::MAX), Duration::from_millis(300));
    }

    #[test]
    fn test_equal_jitter_stays_in_upper_half() {
        let p = policy(100, 10_000, 1.0, JitterPolicy::Equal);
        for attempt in 0..50 {
            let d = p.next(attempt);
            assert!(d >= Duration::from_millis(50), "attempt {attempt}: {d:?}");
            assert!(d <= Duration::from_millis(100), "attempt {attempt}: {d:?}");
        }
    }

    #[test]
    fn test_default_is_bounded() {
        let p = BackoffPolicy::default();
        for attempt in 0..20 {
            assert!(p.next(attempt) <= p.max);
        }
    }
}
