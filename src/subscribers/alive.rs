//! # Task lifecycle tracker with sequence-based ordering.
//!
//! [`AliveTracker`] remembers which tasks are running by listening to
//! `TaskStarting` and `TaskTerminated`/`TaskFailed`. The supervisor exposes it
//! through [`Supervisor::alive`](crate::Supervisor::alive) for callers that want
//! to observe which tasks are still running.
//!
//! ## Rules
//! - Events with `seq <= last_seq` for the same task are rejected (stale).
//! - Reads are eventually consistent with the bus.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

#[derive(Debug, Clone, Copy)]
struct TaskState {
    last_seq: u64,
    alive: bool,
}

/// Thread-safe tracker of alive tasks.
#[derive(Default)]
pub struct AliveTracker {
    state: RwLock<HashMap<String, TaskState>>,
}

impl AliveTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `ev` if it is newer than the last one seen for its task.
    ///
    /// Returns `true` when the alive flag was updated.
    pub async fn update(&self, ev: &Event) -> bool {
        let Some(name) = ev.task.as_deref() else {
            return false;
        };
        let alive = if ev.kind == EventKind::TaskStarting {
            true
        } else if ev.is_task_exit() {
            false
        } else {
            return false;
        };

        let mut state = self.state.write().await;
        let entry = state.entry(name.to_string()).or_insert(TaskState {
            last_seq: 0,
            alive: false,
        });
        if ev.seq <= entry.last_seq {
            return false;
        }
        entry.last_seq = ev.seq;
        entry.alive = alive;
        true
    }

    /// Sorted names of the tasks currently alive.
    pub async fn snapshot(&self) -> Vec<String> {
        let state = self.state.read().await;
        let mut alive: Vec<String> = state
            .iter()
            .filter(|(_, ts)| ts.alive)
            .map(|(name, _)| name.clone())
            .collect();
        alive.sort_unstable();
        alive
    }

    pub async fn is_alive(&self, name: &str) -> bool {
        self.state
            .read()
            .await
            .get(name)
            .is_some_and(|ts| ts.alive)
    }
}

#[async_trait]
impl Subscribe for AliveTracker {
    async fn on_event(&self, ev: &Event) {
        self.update(ev).await;
    }

    fn name(&self) -> &'static str {
        "alive-tracker"
    }

    fn queue_capacity(&self) -> usize {
        2048
    }
}
