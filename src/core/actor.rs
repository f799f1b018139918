//! # TaskActor: one task on one OS thread.
//!
//! ```text
//! TaskActor::spawn(shutdown)
//!   └─► std::thread "<task name>"
//!         ├─► [realtime] SCHED_FIFO(priority) ── Err ──► PriorityDegraded (keeps going)
//!         ├─► current-thread tokio runtime
//!         ├─► publish TaskStarting
//!         ├─► block_on(task.run(shutdown))
//!         │     ├─ Ok  ─► publish TaskTerminated
//!         │     └─ Err ─► publish TaskFailed
//!         └─► completion sent on the oneshot
//! ```
//!
//! A panicking task drops the oneshot sender; the supervisor sees the closed
//! channel, reports the failure and halts the system if it was not halting yet.

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use super::sched;
use crate::error::{RuntimeError, TaskError};
use crate::events::{Bus, Event, EventKind};
use crate::messaging::Priority;
use crate::tasks::TaskRef;

/// Receiver side of a task's completion report.
pub type Completion = oneshot::Receiver<Result<(), TaskError>>;

type ApplyPriority = fn(Priority) -> std::io::Result<()>;

/// Runs a single [`Task`](crate::Task) on a dedicated thread.
pub struct TaskActor {
    task: TaskRef,
    bus: Bus,
    realtime: bool,
    apply_priority: ApplyPriority,
}

impl TaskActor {
    pub fn new(task: TaskRef, bus: Bus, realtime: bool) -> Self {
        Self {
            task,
            bus,
            realtime,
            apply_priority: sched::apply_realtime,
        }
    }

    #[cfg(test)]
    fn with_apply_priority(mut self, apply: ApplyPriority) -> Self {
        self.apply_priority = apply;
        self
    }

    /// Starts the thread. Returns the completion receiver.
    pub fn spawn(self, shutdown: CancellationToken) -> Result<Completion, RuntimeError> {
        let name = self.task.name().to_string();
        let (tx, rx) = oneshot::channel();

        std::thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let outcome = self.run_blocking(shutdown);
                let _ = tx.send(outcome);
            })
            .map_err(|e| RuntimeError::Spawn {
                task: name,
                error: e.to_string(),
            })?;
        Ok(rx)
    }

    fn run_blocking(&self, shutdown: CancellationToken) -> Result<(), TaskError> {
        let name = self.task.name();
        let priority = self.task.priority();

        if self.realtime {
            if let Err(err) = (self.apply_priority)(priority) {
                tracing::warn!(task = name, %priority, error = %err, "real-time priority unavailable");
                self.bus.publish(
                    Event::new(EventKind::PriorityDegraded)
                        .with_task(name)
                        .with_priority(priority)
                        .with_reason(err.to_string()),
                );
            }
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| TaskError::Fatal {
                error: format!("runtime build failed: {e}"),
            });
        let runtime = match runtime {
            Ok(rt) => rt,
            Err(err) => {
                self.publish_failure(&err);
                return Err(err);
            }
        };

        self.bus.publish(
            Event::new(EventKind::TaskStarting)
                .with_task(name)
                .with_priority(priority),
        );

        let res = runtime.block_on(self.task.run(shutdown));
        match &res {
            Ok(()) => {
                self.bus
                    .publish(Event::new(EventKind::TaskTerminated).with_task(name));
            }
            Err(err) => self.publish_failure(err),
        }
        res
    }

    fn publish_failure(&self, err: &TaskError) {
        let name = self.task.name();
        tracing::error!(task = name, error = %err, label = err.as_label(), "task failed");
        self.bus.publish(
            Event::new(EventKind::TaskFailed)
                .with_task(name)
                .with_reason(err.to_string()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::Task;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Once(bool);

    #[async_trait]
    impl Task for Once {
        fn name(&self) -> &str {
            "once"
        }
        fn priority(&self) -> Priority {
            Priority::Weak
        }
        async fn run(&self, _shutdown: CancellationToken) -> Result<(), TaskError> {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
            if self.0 {
                Ok(())
            } else {
                Err(TaskError::Fail {
                    error: "boom".into(),
                })
            }
        }
    }

    #[tokio::test]
    async fn test_successful_task_reports_lifecycle() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let done = TaskActor::new(Arc::new(Once(true)), bus, false)
            .spawn(CancellationToken::new())
            .unwrap();

        assert!(done.await.unwrap().is_ok());
        let starting = rx.recv().await.unwrap();
        assert_eq!(starting.kind, EventKind::TaskStarting);
        assert_eq!(starting.priority, Some(Priority::Weak));
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::TaskTerminated);
    }

    #[tokio::test]
    async fn test_failing_task_reports_failure() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let done = TaskActor::new(Arc::new(Once(false)), bus, false)
            .spawn(CancellationToken::new())
            .unwrap();

        assert!(matches!(done.await.unwrap(), Err(TaskError::Fail { .. })));
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::TaskStarting);
        let failed = rx.recv().await.unwrap();
        assert_eq!(failed.kind, EventKind::TaskFailed);
        assert_eq!(failed.reason.as_deref(), Some("execution failed: boom"));
    }

    #[tokio::test]
    async fn test_refused_priority_degrades_and_keeps_running() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let done = TaskActor::new(Arc::new(Once(true)), bus, true)
            .with_apply_priority(|_| Err(std::io::ErrorKind::PermissionDenied.into()))
            .spawn(CancellationToken::new())
            .unwrap();

        assert!(done.await.unwrap().is_ok());
        let degraded = rx.recv().await.unwrap();
        assert_eq!(degraded.kind, EventKind::PriorityDegraded);
        assert_eq!(degraded.task.as_deref(), Some("once"));
        assert_eq!(degraded.priority, Some(Priority::Weak));
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::TaskStarting);
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::TaskTerminated);
    }

    #[tokio::test]
    async fn test_priority_not_applied_without_realtime() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let done = TaskActor::new(Arc::new(Once(true)), bus, false)
            .with_apply_priority(|_| panic!("must not be called"))
            .spawn(CancellationToken::new())
            .unwrap();

        assert!(done.await.unwrap().is_ok());
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::TaskStarting);
    }
}
