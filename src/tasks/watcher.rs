//! # SyringeWatcherTask: reacts to syringe level changes.
//!
//! ```text
//! loop {
//!   lock bank
//!     level < 0              ─► terminated
//!     level <= critical      ─► switch + reset (same lock)  ─► SYRINGE_n_CRITICAL (URGENT), SWITCH, RESET (NORMAL)
//!     level <= weak (1st)    ─► SYRINGE_n_LOW (NORMAL)
//!     otherwise              ─► nothing
//!   unlock
//!   wait for the change signal
//! }
//! ```
//!
//! Every pump signals the bank, so most wakes find a comfortable level and do
//! nothing. The low alert fires once per fill of a reservoir.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::core::Context;
use crate::error::{SyringeError, TaskError};
use crate::messaging::{Alert, ChannelId, Message, Priority, Reservoir};
use crate::model::{SyringeGuard, SyringeParams};
use crate::tasks::Task;

/// What one inspection of the bank decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// The bank was stopped.
    Halted,
    /// `drained` hit the critical level; the bank now draws from the other one.
    Switched { drained: Reservoir },
    /// `reservoir` reached the weak level for the first time since its last fill.
    Low { reservoir: Reservoir },
    /// Nothing to report.
    Idle,
}

/// Inspects the bank under `guard` and switches reservoirs if needed.
pub fn inspect_and_act(
    guard: &mut SyringeGuard<'_>,
    params: &SyringeParams,
) -> Result<WatchOutcome, SyringeError> {
    let reading = guard.inspect();
    if reading.is_halted() {
        return Ok(WatchOutcome::Halted);
    }
    if reading.level <= params.level_critical {
        guard.switch()?;
        guard.reset()?;
        return Ok(WatchOutcome::Switched {
            drained: reading.active,
        });
    }
    if reading.level <= params.level_weak && guard.first_low_report(reading.active) {
        return Ok(WatchOutcome::Low {
            reservoir: reading.active,
        });
    }
    Ok(WatchOutcome::Idle)
}

pub struct SyringeWatcherTask {
    ctx: Context,
    priority: Priority,
}

impl SyringeWatcherTask {
    pub const NAME: &'static str = "syringe-watcher";

    pub fn new(ctx: Context) -> Self {
        let priority = ctx.config.priorities.watcher;
        Self { ctx, priority }
    }

    fn post(&self, alert: Alert, priority: Priority) {
        self.ctx
            .post(Self::NAME, ChannelId::Display, Message::Alert(alert), priority);
    }
}

#[async_trait]
impl Task for SyringeWatcherTask {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn priority(&self) -> Priority {
        self.priority
    }

    async fn run(&self, _shutdown: CancellationToken) -> Result<(), TaskError> {
        let syringe = &self.ctx.syringe;
        loop {
            let outcome = {
                let mut guard = syringe.lock();
                inspect_and_act(&mut guard, syringe.params())
            };

            match outcome {
                Ok(WatchOutcome::Halted) | Err(SyringeError::Halted) => {
                    tracing::debug!("syringe bank stopped");
                    return Ok(());
                }
                Ok(WatchOutcome::Switched { drained }) => {
                    tracing::info!(drained = drained.number(), "reservoir switched");
                    self.post(Alert::SyringeCritical(drained), Priority::Urgent);
                    self.post(Alert::Switch, Priority::Normal);
                    self.post(Alert::Reset, Priority::Normal);
                }
                Ok(WatchOutcome::Low { reservoir }) => {
                    self.post(Alert::SyringeLow(reservoir), Priority::Normal);
                }
                Ok(WatchOutcome::Idle) => {}
                Err(err) => {
                    return Err(TaskError::Fail {
                        error: err.to_string(),
                    });
                }
            }

            syringe.changed().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Config;
    use crate::model::SyringeBank;
    use std::sync::Arc;
    use std::time::Duration;

    fn bank_at(levels: [f64; 2]) -> SyringeBank {
        SyringeBank::new(SyringeParams {
            initial: levels,
            ..SyringeParams::default()
        })
    }

    #[test]
    fn test_comfortable_level_is_idle() {
        let bank = bank_at([50.0, 100.0]);
        let mut g = bank.lock();
        assert_eq!(
            inspect_and_act(&mut g, bank.params()),
            Ok(WatchOutcome::Idle)
        );
    }

    #[test]
    fn test_low_level_reported_once() {
        let bank = bank_at([5.0, 100.0]);
        let mut g = bank.lock();
        assert_eq!(
            inspect_and_act(&mut g, bank.params()),
            Ok(WatchOutcome::Low {
                reservoir: Reservoir::One
            })
        );
        assert_eq!(
            inspect_and_act(&mut g, bank.params()),
            Ok(WatchOutcome::Idle)
        );
    }

    #[test]
    fn test_critical_level_switches_and_refills() {
        let bank = bank_at([1.0, 70.0]);
        let mut g = bank.lock();
        assert_eq!(
            inspect_and_act(&mut g, bank.params()),
            Ok(WatchOutcome::Switched {
                drained: Reservoir::One
            })
        );
        assert_eq!(g.active(), Reservoir::Two);
        assert_eq!(g.level(Reservoir::Two), 70.0);
        assert_eq!(g.level(Reservoir::One), 100.0);
    }

    #[test]
    fn test_stopped_bank_is_halted() {
        let bank = bank_at([1.0, 70.0]);
        bank.stop();
        let mut g = bank.lock();
        assert_eq!(
            inspect_and_act(&mut g, bank.params()),
            Ok(WatchOutcome::Halted)
        );
    }

    #[tokio::test]
    async fn test_run_reports_switch_and_stops_with_bank() {
        let ctx = Context::new(Config {
            syringe: SyringeParams {
                initial: [3.0, 100.0],
                ..SyringeParams::default()
            },
            ..Config::default()
        });
        let task = Arc::new(SyringeWatcherTask::new(ctx.clone()));
        let handle = {
            let task = Arc::clone(&task);
            tokio::spawn(async move { task.run(CancellationToken::new()).await })
        };

        for _ in 0..2 {
            {
                let mut g = ctx.syringe.lock();
                g.pump().unwrap();
            }
            ctx.syringe.notify_changed();
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let reading = ctx.syringe.inspect();
        assert_eq!(reading.active, Reservoir::Two);
        assert_eq!(reading.level, 100.0);

        ctx.syringe.stop();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("watcher should stop with the bank")
            .unwrap()
            .unwrap();

        let alerts: Vec<Message> =
            std::iter::from_fn(|| ctx.messages.channel(ChannelId::Display).try_recv().ok())
                .collect();
        assert_eq!(
            alerts,
            vec![
                Message::Alert(Alert::SyringeCritical(Reservoir::One)),
                Message::Alert(Alert::SyringeLow(Reservoir::One)),
                Message::Alert(Alert::Switch),
                Message::Alert(Alert::Reset),
            ]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_switches_alternate_under_concurrent_pumping() {
        const SWITCHES: usize = 6;
        let params = SyringeParams {
            full: 10.0,
            initial: [10.0, 10.0],
            ..SyringeParams::default()
        };
        let ctx = Context::new(Config {
            syringe: params,
            ..Config::default()
        });
        let task = SyringeWatcherTask::new(ctx.clone());
        let watcher = tokio::spawn(async move { task.run(CancellationToken::new()).await });

        let bank = Arc::clone(&ctx.syringe);
        let pumper = std::thread::spawn(move || {
            let mut trace = Vec::new();
            let mut switches = 0;
            while switches < SWITCHES {
                let pumped = {
                    let mut g = bank.lock();
                    g.pump().map(|level| (g.active(), level))
                };
                bank.notify_changed();
                match pumped {
                    Ok(sample) => {
                        if trace.last().is_some_and(|(prev, _)| *prev != sample.0) {
                            switches += 1;
                        }
                        trace.push(sample);
                    }
                    Err(SyringeError::Empty { .. }) => {}
                    Err(err) => panic!("unexpected pump error: {err}"),
                }
                std::thread::sleep(Duration::from_micros(200));
            }
            trace
        });
        let trace = tokio::task::spawn_blocking(move || pumper.join().unwrap())
            .await
            .unwrap();

        ctx.syringe.stop();
        tokio::time::timeout(Duration::from_secs(1), watcher)
            .await
            .expect("watcher should stop with the bank")
            .unwrap()
            .unwrap();

        for pair in trace.windows(2) {
            let ((prev, prev_level), (next, level)) = (pair[0], pair[1]);
            if prev == next {
                assert_eq!(level, prev_level - params.step);
            } else {
                assert_eq!(next, prev.other());
                assert_eq!(level, params.full - params.step, "switched to an unrefilled reservoir");
            }
        }

        let drained: Vec<Reservoir> =
            std::iter::from_fn(|| ctx.messages.channel(ChannelId::Display).try_recv().ok())
                .filter_map(|m| match m {
                    Message::Alert(Alert::SyringeCritical(r)) => Some(r),
                    _ => None,
                })
                .collect();
        assert_eq!(drained.len(), SWITCHES);
        for pair in drained.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
    }
}
