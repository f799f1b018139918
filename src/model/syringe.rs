//! # SyringeBank: two interchangeable insulin reservoirs.
//!
//! Exactly one reservoir is active and drains on every pump. The watcher task
//! switches to the other one when the active level turns critical and refills
//! the drained one. [`SyringeBank::stop`] is terminal: both levels become the
//! [`HALTED`] sentinel and every later mutation is refused with
//! [`SyringeError::Halted`].
//!
//! ## Access
//! Levels are only reachable through a [`SyringeGuard`], obtained from
//! [`SyringeBank::lock`]. Holding the guard is holding the bank lock, so a read
//! followed by a switch/reset on the same guard is atomic with respect to pumps.
//!
//! ## Change signal
//! ```text
//! InsulinTask: lock ─► pump ─► notify_changed ─► unlock ─► inject insulin
//! Watcher:     loop { lock ─► inspect/switch/reset ─► unlock ─► changed().await }
//! ```
//! The signal stores a permit when nobody waits, so a notification sent between
//! the watcher's unlock and its next wait is never lost. Wakes are frequent and
//! mostly spurious (the level is still comfortable); the watcher re-reads state
//! every time.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::{futures::Notified, Notify};

use crate::error::SyringeError;
use crate::messaging::Reservoir;

/// Level reported for both reservoirs once the bank is stopped.
pub const HALTED: f64 = -1.0;

/// Reservoir constants, in percent of a full syringe.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SyringeParams {
    /// Level restored by a reset.
    pub full: f64,
    /// Levels at startup, indexed by reservoir.
    pub initial: [f64; 2],
    /// Amount drained by one pump.
    pub step: f64,
    /// At or below this level the watcher raises a low alert.
    pub level_weak: f64,
    /// At or below this level the watcher switches reservoirs.
    pub level_critical: f64,
}

impl Default for SyringeParams {
    fn default() -> Self {
        Self {
            full: 100.0,
            initial: [100.0, 100.0],
            step: 1.0,
            level_weak: 5.0,
            level_critical: 1.0,
        }
    }
}

/// Active reservoir and its level, read under one lock.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reading {
    pub active: Reservoir,
    pub level: f64,
}

impl Reading {
    #[inline]
    pub fn is_halted(&self) -> bool {
        self.level < 0.0
    }
}

#[derive(Debug)]
struct State {
    level: [f64; 2],
    active: Reservoir,
    low_reported: [bool; 2],
}

/// Shared pair of reservoirs with a change signal.
#[derive(Debug)]
pub struct SyringeBank {
    state: Mutex<State>,
    changed: Notify,
    params: SyringeParams,
}

impl SyringeBank {
    pub fn new(params: SyringeParams) -> Self {
        Self {
            state: Mutex::new(State {
                level: params.initial,
                active: Reservoir::One,
                low_reported: [false; 2],
            }),
            changed: Notify::new(),
            params,
        }
    }

    pub fn params(&self) -> &SyringeParams {
        &self.params
    }

    /// Acquires the bank lock.
    pub fn lock(&self) -> SyringeGuard<'_> {
        SyringeGuard {
            state: self.state.lock().unwrap_or_else(PoisonError::into_inner),
            params: &self.params,
        }
    }

    /// Wakes the watcher (or leaves a permit for its next wait).
    pub fn notify_changed(&self) {
        self.changed.notify_one();
    }

    /// Resolves on the next [`notify_changed`](Self::notify_changed).
    pub fn changed(&self) -> Notified<'_> {
        self.changed.notified()
    }

    /// Stops the bank for good and wakes the watcher so it sees the sentinel.
    pub fn stop(&self) {
        self.lock().stop();
        self.notify_changed();
    }

    /// Convenience for [`SyringeGuard::inspect`] under a short-lived lock.
    pub fn inspect(&self) -> Reading {
        self.lock().inspect()
    }
}

impl Default for SyringeBank {
    fn default() -> Self {
        Self::new(SyringeParams::default())
    }
}

/// Exclusive access to the bank state.
pub struct SyringeGuard<'a> {
    state: MutexGuard<'a, State>,
    params: &'a SyringeParams,
}

impl SyringeGuard<'_> {
    #[inline]
    pub fn is_halted(&self) -> bool {
        self.state.level[0] < 0.0
    }

    pub fn inspect(&self) -> Reading {
        let active = self.state.active;
        Reading {
            active,
            level: self.state.level[active.index()],
        }
    }

    pub fn level(&self, reservoir: Reservoir) -> f64 {
        self.state.level[reservoir.index()]
    }

    pub fn active(&self) -> Reservoir {
        self.state.active
    }

    /// Drains one step from the active reservoir and returns its new level.
    ///
    /// Never drives a level below zero: an exhausted reservoir is reported as
    /// [`SyringeError::Empty`] and left untouched.
    pub fn pump(&mut self) -> Result<f64, SyringeError> {
        if self.is_halted() {
            return Err(SyringeError::Halted);
        }
        let active = self.state.active;
        let level = &mut self.state.level[active.index()];
        if *level < self.params.step {
            return Err(SyringeError::Empty {
                reservoir: active.number(),
            });
        }
        *level -= self.params.step;
        Ok(*level)
    }

    /// Makes the other reservoir active and returns it.
    pub fn switch(&mut self) -> Result<Reservoir, SyringeError> {
        if self.is_halted() {
            return Err(SyringeError::Halted);
        }
        self.state.active = self.state.active.other();
        Ok(self.state.active)
    }

    /// Refills the inactive reservoir.
    pub fn reset(&mut self) -> Result<(), SyringeError> {
        if self.is_halted() {
            return Err(SyringeError::Halted);
        }
        let inactive = self.state.active.other();
        self.state.level[inactive.index()] = self.params.full;
        self.state.low_reported[inactive.index()] = false;
        Ok(())
    }

    /// Returns `true` the first time it is called for `reservoir` since its last refill.
    pub fn first_low_report(&mut self, reservoir: Reservoir) -> bool {
        let seen = &mut self.state.low_reported[reservoir.index()];
        !std::mem::replace(seen, true)
    }

    /// Sets both levels to [`HALTED`]. Idempotent.
    pub fn stop(&mut self) {
        self.state.level = [HALTED, HALTED];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_pump_drains_active_only() {
        let bank = SyringeBank::default();
        let mut g = bank.lock();
        assert_eq!(g.pump(), Ok(99.0));
        assert_eq!(g.pump(), Ok(98.0));
        assert_eq!(g.level(Reservoir::One), 98.0);
        assert_eq!(g.level(Reservoir::Two), 100.0);
    }

    #[test]
    fn test_switch_then_reset_refills_drained_reservoir() {
        let bank = SyringeBank::new(SyringeParams {
            initial: [1.0, 40.0],
            ..SyringeParams::default()
        });
        let mut g = bank.lock();
        assert_eq!(g.switch(), Ok(Reservoir::Two));
        g.reset().unwrap();
        assert_eq!(g.level(Reservoir::One), 100.0);
        assert_eq!(g.level(Reservoir::Two), 40.0);
        assert_eq!(
            g.inspect(),
            Reading {
                active: Reservoir::Two,
                level: 40.0
            }
        );
    }

    #[test]
    fn test_critical_cycles_alternate_active() {
        let params = SyringeParams::default();
        let bank = SyringeBank::new(params);
        let mut seen = Vec::new();

        for _ in 0..(4 * 100) {
            let mut g = bank.lock();
            g.pump().unwrap();
            let r = g.inspect();
            if r.level <= params.level_critical {
                seen.push(g.switch().unwrap());
                g.reset().unwrap();
            }
        }

        assert!(seen.len() >= 3);
        for pair in seen.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
    }

    #[test]
    fn test_empty_reservoir_never_goes_negative() {
        let bank = SyringeBank::new(SyringeParams {
            initial: [1.0, 100.0],
            ..SyringeParams::default()
        });
        let mut g = bank.lock();
        assert_eq!(g.pump(), Ok(0.0));
        assert_eq!(g.pump(), Err(SyringeError::Empty { reservoir: 1 }));
        assert_eq!(g.level(Reservoir::One), 0.0);
        assert!(!g.is_halted());
    }

    #[test]
    fn test_stop_is_terminal() {
        let bank = SyringeBank::default();
        bank.stop();
        let mut g = bank.lock();
        assert!(g.is_halted());
        assert!(g.inspect().is_halted());
        assert_eq!(g.level(Reservoir::One), HALTED);
        assert_eq!(g.level(Reservoir::Two), HALTED);
        assert_eq!(g.pump(), Err(SyringeError::Halted));
        assert_eq!(g.switch(), Err(SyringeError::Halted));
        assert_eq!(g.reset(), Err(SyringeError::Halted));
        assert_eq!(g.level(Reservoir::Two), HALTED);
    }

    #[test]
    fn test_low_report_rearmed_by_reset() {
        let bank = SyringeBank::default();
        let mut g = bank.lock();
        assert!(g.first_low_report(Reservoir::One));
        assert!(!g.first_low_report(Reservoir::One));
        g.switch().unwrap();
        g.reset().unwrap();
        assert!(g.first_low_report(Reservoir::One));
    }

    #[tokio::test]
    async fn test_notification_before_wait_is_kept() {
        let bank = Arc::new(SyringeBank::default());
        bank.notify_changed();
        tokio::time::timeout(Duration::from_secs(1), bank.changed())
            .await
            .expect("stored permit should resolve the wait");
    }

    #[tokio::test]
    async fn test_stop_wakes_waiter() {
        let bank = Arc::new(SyringeBank::default());
        let waiter = {
            let bank = Arc::clone(&bank);
            tokio::spawn(async move {
                bank.changed().await;
                bank.inspect()
            })
        };
        tokio::task::yield_now().await;
        bank.stop();
        let reading = waiter.await.unwrap();
        assert!(reading.is_halted());
    }
}
