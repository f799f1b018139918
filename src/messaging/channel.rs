//! # Bounded priority channel.
//!
//! [`PriorityChannel`] is one named queue of the [`MessageBus`](super::MessageBus).
//! It is internally synchronized; callers never lock around it.
//!
//! ## Ordering
//! Dequeue order is priority first, then arrival order (FIFO inside a band):
//! ```text
//! send(A, Normal) send(B, Urgent) send(C, Normal) send(D, Urgent)
//! try_recv → B, D, A, C
//! ```
//!
//! ## Consumption modes
//! - [`try_drain_latest`](PriorityChannel::try_drain_latest): control channels.
//!   Empties the queue and keeps only the most recently enqueued message.
//! - [`recv`](PriorityChannel::recv): the display channel. Waits until a message
//!   is available and returns the highest-priority one; nothing is discarded.
//!
//! ## Capacity
//! `send` fails with [`BusError::QueueFull`] once `capacity` messages are queued.
//! [`force_send`](PriorityChannel::force_send) is reserved for `HALT` escalation
//! and makes room by evicting the least important queued message.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use super::{Message, Priority};
use crate::error::BusError;

/// Default number of slots per channel.
pub const DEFAULT_CAPACITY: usize = 50;

/// Identifier of one of the three fixed channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelId {
    GlucoseCtrl,
    InsulinCtrl,
    Display,
}

impl ChannelId {
    pub const ALL: [ChannelId; 3] = [
        ChannelId::GlucoseCtrl,
        ChannelId::InsulinCtrl,
        ChannelId::Display,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ChannelId::GlucoseCtrl => "glucose_ctrl",
            ChannelId::InsulinCtrl => "insulin_ctrl",
            ChannelId::Display => "display",
        }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Queued message with its band and arrival sequence.
#[derive(Debug, Clone, Copy)]
struct Entry {
    priority: Priority,
    seq: u64,
    msg: Message,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    /// Greater = dequeued first: higher band, then earlier arrival.
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Default)]
struct State {
    heap: BinaryHeap<Entry>,
    next_seq: u64,
}

impl State {
    fn push(&mut self, msg: Message, priority: Priority) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Entry { priority, seq, msg });
    }
}

/// Bounded, priority-ordered, internally synchronized message queue.
pub struct PriorityChannel {
    id: ChannelId,
    capacity: usize,
    state: Mutex<State>,
    ready: Notify,
}

impl PriorityChannel {
    /// Creates a channel; capacity is clamped to a minimum of 1.
    pub fn new(id: ChannelId, capacity: usize) -> Self {
        Self {
            id,
            capacity: capacity.max(1),
            state: Mutex::new(State::default()),
            ready: Notify::new(),
        }
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().heap.is_empty()
    }

    /// Enqueues `msg` with `priority`. Never blocks.
    pub fn send(&self, msg: Message, priority: Priority) -> Result<(), BusError> {
        {
            let mut st = self.lock();
            if st.heap.len() >= self.capacity {
                return Err(BusError::QueueFull {
                    channel: self.id,
                    capacity: self.capacity,
                });
            }
            st.push(msg, priority);
        }
        self.ready.notify_one();
        Ok(())
    }

    /// Enqueues `msg` even when full, evicting the lowest-priority, newest entry.
    ///
    /// Returns the evicted message, if any.
    pub fn force_send(&self, msg: Message, priority: Priority) -> Option<Message> {
        let evicted = {
            let mut st = self.lock();
            let evicted = if st.heap.len() >= self.capacity {
                let mut entries = std::mem::take(&mut st.heap).into_vec();
                let victim = entries
                    .iter()
                    .enumerate()
                    .min_by(|(_, a), (_, b)| a.cmp(b))
                    .map(|(i, _)| i);
                let evicted = victim.map(|i| entries.swap_remove(i).msg);
                st.heap = BinaryHeap::from(entries);
                evicted
            } else {
                None
            };
            st.push(msg, priority);
            evicted
        };
        self.ready.notify_one();
        evicted
    }

    /// Dequeues the highest-priority message without waiting.
    pub fn try_recv(&self) -> Result<Message, BusError> {
        self.lock()
            .heap
            .pop()
            .map(|e| e.msg)
            .ok_or(BusError::QueueEmpty { channel: self.id })
    }

    /// Consumes every queued message and returns the most recently enqueued one.
    ///
    /// Returns `None` when the channel is empty; never waits.
    pub fn try_drain_latest(&self) -> Option<Message> {
        let mut st = self.lock();
        let latest = st.heap.iter().max_by_key(|e| e.seq).map(|e| e.msg);
        st.heap.clear();
        latest
    }

    /// Waits until a message is available and returns the highest-priority one.
    pub async fn recv(&self) -> Message {
        loop {
            match self.try_recv() {
                Ok(msg) => return msg,
                Err(_) => self.ready.notified().await,
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for PriorityChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PriorityChannel")
            .field("id", &self.id)
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}
