//! # Supervisor: spawns the regulation tasks and waits for a clean stop.
//!
//! The [`Supervisor`] owns the shared [`Context`], the subscribers and the
//! alert sink. [`Supervisor::run`] starts every task on its own thread and
//! returns once all of them reached their terminal state.
//!
//! ## High-level architecture
//! ```text
//! run()
//!   ├─ subscriber_listener: Bus.subscribe() ─► SubscriberSet::emit(&Event)
//!   ├─ signal_listener (optional):
//!   │     SIGINT/SIGTERM/SIGQUIT ─► publish ShutdownRequested ─► runtime_token.cancel()
//!   ├─ spawn: one TaskActor (thread + runtime) per task
//!   │     controller, syringe-watcher, insulin, glucose, display, alarms
//!   └─ join:
//!         every completion ─► pending.remove(name)
//!         task failed or controller gone before halt ─► force_halt()
//!         ctx.halt fired   ─► deadline = now + grace
//!         all joined       ─► publish AllStoppedWithin ─► Ok(())
//!         deadline hit     ─► publish GraceExceeded    ─► Err(GraceExceeded { stuck })
//!
//! Shutdown path (normal):
//!   controller finishes total_cycles ─► HALT on all channels ─► syringe.stop()
//!   ─► halt token ─► consumers, watcher and alarms terminate
//!
//! Shutdown path (signal):
//!   runtime_token.cancel() ─► controller skips remaining cycles ─► same as above
//! ```
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use glycovisor::{Config, LogWriter, Subscribe, Supervisor};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
//!     let sup = Supervisor::new(Config::default(), subs);
//!     sup.run().await?;
//!     Ok(())
//! }
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::{
    sync::{broadcast, oneshot::error::RecvError},
    task::{JoinHandle, JoinSet},
    time::{self, Instant},
};
use tokio_util::sync::CancellationToken;

use super::{
    actor::TaskActor, builder::SupervisorBuilder, config::Config, context::Context, shutdown,
};
use crate::error::{RuntimeError, TaskError};
use crate::events::{Event, EventKind};
use crate::messaging::{ChannelId, Message, Priority};
use crate::subscribers::{AliveTracker, Subscribe, SubscriberSet};
use crate::tasks::{standard_tasks, AlertSink, ControllerTask, TaskRef};

/// Task name and what its thread reported (`Err` if the thread died).
type Joined = (String, Result<Result<(), TaskError>, RecvError>);

/// Runs the regulation tasks and coordinates their shutdown.
pub struct Supervisor {
    ctx: Context,
    subscribers: Vec<Arc<dyn Subscribe>>,
    alive: Arc<AliveTracker>,
    sink: Arc<dyn AlertSink>,
}

impl Supervisor {
    /// Creates a supervisor with the linear patient model and standard output as sink.
    pub fn new(cfg: Config, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        Self::builder(cfg).with_subscribers(subscribers).build()
    }

    pub fn builder(cfg: Config) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg)
    }

    pub(super) fn new_internal(
        ctx: Context,
        mut subscribers: Vec<Arc<dyn Subscribe>>,
        sink: Arc<dyn AlertSink>,
    ) -> Self {
        let alive = Arc::new(AliveTracker::new());
        subscribers.push(alive.clone());
        Self {
            ctx,
            subscribers,
            alive,
            sink,
        }
    }

    /// Shared context the tasks are built from.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Tracker of running tasks, fed from the event bus.
    pub fn alive(&self) -> Arc<AliveTracker> {
        Arc::clone(&self.alive)
    }

    /// Runs the standard task set until every task terminated.
    pub async fn run(self) -> Result<(), RuntimeError> {
        let tasks = standard_tasks(&self.ctx, Arc::clone(&self.sink));
        self.run_tasks(tasks).await
    }

    /// Runs `tasks` until every one of them terminated.
    ///
    /// The grace period starts when the halt token fires. One of the tasks is
    /// expected to fire it (the controller does).
    pub async fn run_tasks(self, tasks: Vec<TaskRef>) -> Result<(), RuntimeError> {
        let runtime_token = CancellationToken::new();
        let events = self.ctx.events.clone();

        let listener_stop = CancellationToken::new();
        let listener = self.subscriber_listener(listener_stop.clone());
        let signals = self.signal_listener(runtime_token.clone());

        let mut set = JoinSet::new();
        let mut pending = BTreeSet::new();
        let mut res = Ok(());

        for task in tasks {
            let name = task.name().to_string();
            let actor = TaskActor::new(task, events.clone(), self.ctx.config.realtime);
            match actor.spawn(runtime_token.clone()) {
                Ok(done) => {
                    pending.insert(name.clone());
                    set.spawn(async move { (name, done.await) });
                }
                Err(err) => {
                    tracing::error!(error = %err, "aborting run");
                    self.force_halt();
                    res = Err(err);
                    break;
                }
            }
        }

        let joined = self.join_all(&mut set, &mut pending).await;
        if res.is_ok() {
            res = joined;
        }

        if let Some(handle) = signals {
            handle.abort();
        }
        listener_stop.cancel();
        if let Ok(subs) = listener.await {
            subs.shutdown().await;
        }
        res
    }

    /// Waits for every task, bounded by the grace period once halting started.
    async fn join_all(
        &self,
        set: &mut JoinSet<Joined>,
        pending: &mut BTreeSet<String>,
    ) -> Result<(), RuntimeError> {
        let grace = self.ctx.config.grace_limit();
        let mut deadline: Option<Instant> = None;

        loop {
            tokio::select! {
                joined = set.join_next() => match joined {
                    None => break,
                    Some(Ok((name, outcome))) => {
                        pending.remove(&name);
                        let failed = !matches!(outcome, Ok(Ok(())));
                        if outcome.is_err() {
                            tracing::error!(task = %name, "task thread panicked");
                            self.ctx.events.publish(
                                Event::new(EventKind::TaskFailed)
                                    .with_task(name.as_str())
                                    .with_reason("task thread panicked"),
                            );
                        }
                        // Consumers only stop on HALT; release them if its sender is gone.
                        if !self.ctx.halt.is_cancelled()
                            && (failed || name == ControllerTask::NAME)
                        {
                            tracing::warn!(task = %name, "task exited before halting, forcing halt");
                            self.force_halt();
                        }
                    }
                    Some(Err(err)) => {
                        tracing::error!(error = %err, "completion watcher failed");
                    }
                },
                _ = self.ctx.halt.cancelled(), if deadline.is_none() && grace.is_some() => {
                    deadline = grace.map(|g| Instant::now() + g);
                }
                _ = time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    let stuck: Vec<String> = pending.iter().cloned().collect();
                    let grace = grace.unwrap_or_default();
                    tracing::error!(?stuck, ?grace, "tasks still running after grace period");
                    self.ctx.events.publish(
                        Event::new(EventKind::GraceExceeded).with_reason(stuck.join(",")),
                    );
                    return Err(RuntimeError::GraceExceeded { grace, stuck });
                }
            }
        }

        self.ctx
            .events
            .publish(Event::new(EventKind::AllStoppedWithin));
        Ok(())
    }

    /// Forwards bus events to the subscribers until `stop` fires, then hands the set back.
    fn subscriber_listener(&self, stop: CancellationToken) -> JoinHandle<SubscriberSet> {
        let mut rx = self.ctx.events.subscribe();
        let set = SubscriberSet::new(self.subscribers.clone(), self.ctx.events.clone());

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    ev = rx.recv() => match ev {
                        Ok(ev) => set.emit(&ev),
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            tracing::warn!(skipped = n, "event listener lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = stop.cancelled() => {
                        while let Ok(ev) = rx.try_recv() {
                            set.emit(&ev);
                        }
                        break;
                    }
                }
            }
            set
        })
    }

    /// Cancels `runtime_token` on the first termination signal.
    fn signal_listener(&self, runtime_token: CancellationToken) -> Option<JoinHandle<()>> {
        if !self.ctx.config.handle_signals {
            return None;
        }
        let events = self.ctx.events.clone();
        let halt = self.ctx.halt.clone();

        Some(tokio::spawn(async move {
            tokio::select! {
                sig = shutdown::wait_for_shutdown_signal() => match sig {
                    Ok(name) => {
                        tracing::info!(signal = name, "shutdown requested");
                        events.publish(Event::new(EventKind::ShutdownRequested).with_reason(name));
                        runtime_token.cancel();
                    }
                    Err(err) => tracing::warn!(error = %err, "signal handlers unavailable"),
                },
                _ = halt.cancelled() => {}
            }
        }))
    }

    /// Stops whatever already started when the task set could not be spawned
    /// or a task died before the controller halted the system.
    fn force_halt(&self) {
        for id in ChannelId::ALL {
            self.ctx
                .messages
                .channel(id)
                .force_send(Message::Halt, Priority::Normal);
        }
        self.ctx.syringe.stop();
        self.ctx.halt.cancel();
    }
}
