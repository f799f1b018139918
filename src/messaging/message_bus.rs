//! # MessageBus: the three fixed channels between tasks.
//!
//! ```text
//!   Controller ──► glucose_ctrl ──► GlucoseTask       (latest wins)
//!   Controller ──► insulin_ctrl ──► InsulinTask       (latest wins)
//!   Controller ┐
//!   Glucose    │
//!   Insulin    ├─► display ──────► DisplayTask        (lossless, priority/FIFO)
//!   Watcher    │
//!   Alarms     ┘
//! ```
//!
//! Channels are created once with the same capacity and never resized.
//!
//! ## HALT delivery
//! A dropped control directive is harmless and a dropped alert is only a missed
//! notification, but `HALT` is the sole signal that lets consumers terminate.
//! [`MessageBus::send_halt`] therefore retries with a [`BackoffPolicy`] and,
//! once retries are exhausted, forces the message in by evicting the least
//! important queued entry.

use std::time::Duration;

use tokio::time;

use super::{ChannelId, Message, PriorityChannel, Priority};
use crate::{
    error::BusError,
    events::{Bus, Event, EventKind},
    policies::BackoffPolicy,
};

/// How a `HALT` reached its channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltDelivery {
    /// Enqueued normally after `attempts` tries.
    Delivered { attempts: u32 },
    /// Retries were exhausted; `evicted` was dropped to make room.
    Forced { evicted: Option<Message> },
}

/// Bundle of the glucose-control, insulin-control and display channels.
#[derive(Debug)]
pub struct MessageBus {
    glucose: PriorityChannel,
    insulin: PriorityChannel,
    display: PriorityChannel,
}

impl MessageBus {
    /// Creates the three channels, each with `capacity` slots (min 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            glucose: PriorityChannel::new(ChannelId::GlucoseCtrl, capacity),
            insulin: PriorityChannel::new(ChannelId::InsulinCtrl, capacity),
            display: PriorityChannel::new(ChannelId::Display, capacity),
        }
    }

    pub fn channel(&self, id: ChannelId) -> &PriorityChannel {
        match id {
            ChannelId::GlucoseCtrl => &self.glucose,
            ChannelId::InsulinCtrl => &self.insulin,
            ChannelId::Display => &self.display,
        }
    }

    /// Non-blocking send; fails with [`BusError::QueueFull`] when the channel is full.
    #[inline]
    pub fn send(&self, id: ChannelId, msg: Message, priority: Priority) -> Result<(), BusError> {
        self.channel(id).send(msg, priority)
    }

    /// Collapses the channel backlog into its newest message. `None` if empty.
    #[inline]
    pub fn try_drain_latest(&self, id: ChannelId) -> Option<Message> {
        self.channel(id).try_drain_latest()
    }

    /// Waits for the next message on `id` in priority/arrival order.
    #[inline]
    pub async fn recv(&self, id: ChannelId) -> Message {
        self.channel(id).recv().await
    }

    /// Delivers `HALT` on `id` at [`Priority::Normal`], never dropping it.
    ///
    /// ### Flow
    /// ```text
    /// attempt = 0
    /// loop {
    ///   send(HALT) ── Ok ──► Delivered { attempts }
    ///        └─ QueueFull:
    ///             attempt == retries ──► force_send ──► publish HaltForced ──► Forced
    ///             else: publish HaltRetry, sleep(backoff.next(attempt)), attempt += 1
    /// }
    /// ```
    pub async fn send_halt(
        &self,
        id: ChannelId,
        backoff: &BackoffPolicy,
        retries: u32,
        events: &Bus,
    ) -> HaltDelivery {
        let channel = self.channel(id);
        let mut attempt: u32 = 0;

        loop {
            match channel.send(Message::Halt, Priority::Normal) {
                Ok(()) => {
                    return HaltDelivery::Delivered {
                        attempts: attempt + 1,
                    };
                }
                Err(err) if attempt >= retries => {
                    let evicted = channel.force_send(Message::Halt, Priority::Normal);
                    tracing::error!(
                        channel = %id,
                        error = %err,
                        evicted = ?evicted,
                        "halt forced into saturated channel"
                    );
                    events.publish(
                        Event::new(EventKind::HaltForced)
                            .with_channel(id)
                            .with_attempt(attempt + 1)
                            .with_reason(err.to_string()),
                    );
                    return HaltDelivery::Forced { evicted };
                }
                Err(err) => {
                    let delay: Duration = backoff.next(attempt);
                    tracing::warn!(channel = %id, ?delay, error = %err, "halt send refused, retrying");
                    events.publish(
                        Event::new(EventKind::HaltRetry)
                            .with_channel(id)
                            .with_attempt(attempt + 1)
                            .with_delay(delay)
                            .with_reason(err.to_string()),
                    );
                    time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::Alert;
    use crate::policies::JitterPolicy;
    use std::sync::Arc;

    fn fast_backoff() -> BackoffPolicy {
        BackoffPolicy {
            first: Duration::from_millis(1),
            max: Duration::from_millis(5),
            factor: 2.0,
            jitter: JitterPolicy::None,
        }
    }

    #[test]
    fn test_channels_are_independent() {
        let bus = MessageBus::new(2);
        bus.send(ChannelId::GlucoseCtrl, Message::Start, Priority::Urgent)
            .unwrap();
        bus.send(ChannelId::GlucoseCtrl, Message::Stop, Priority::Urgent)
            .unwrap();
        assert!(bus
            .send(ChannelId::GlucoseCtrl, Message::Start, Priority::Urgent)
            .is_err());
        bus.send(ChannelId::InsulinCtrl, Message::Start, Priority::Urgent)
            .unwrap();

        assert_eq!(bus.try_drain_latest(ChannelId::GlucoseCtrl), Some(Message::Stop));
        assert_eq!(bus.try_drain_latest(ChannelId::InsulinCtrl), Some(Message::Start));
        assert_eq!(bus.try_drain_latest(ChannelId::Display), None);
    }

    #[tokio::test]
    async fn test_send_halt_on_free_channel_is_delivered_first_try() {
        let bus = MessageBus::new(4);
        let events = Bus::new(16);
        let res = bus
            .send_halt(ChannelId::InsulinCtrl, &fast_backoff(), 3, &events)
            .await;
        assert_eq!(res, HaltDelivery::Delivered { attempts: 1 });
        assert_eq!(bus.try_drain_latest(ChannelId::InsulinCtrl), Some(Message::Halt));
    }

    #[tokio::test]
    async fn test_send_halt_retries_until_room_appears() {
        let bus = Arc::new(MessageBus::new(1));
        let events = Bus::new(16);
        let mut rx = events.subscribe();
        bus.send(
            ChannelId::Display,
            Message::Alert(Alert::GlycemiaNormal),
            Priority::Normal,
        )
        .unwrap();

        let drainer = {
            let bus = Arc::clone(&bus);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(3)).await;
                bus.recv(ChannelId::Display).await
            })
        };

        let backoff = BackoffPolicy {
            first: Duration::from_millis(2),
            max: Duration::from_millis(2),
            factor: 1.0,
            jitter: JitterPolicy::None,
        };
        let res = bus
            .send_halt(ChannelId::Display, &backoff, 1_000, &events)
            .await;
        assert!(matches!(res, HaltDelivery::Delivered { attempts } if attempts > 1));
        assert_eq!(
            drainer.await.unwrap(),
            Message::Alert(Alert::GlycemiaNormal)
        );
        assert_eq!(bus.recv(ChannelId::Display).await, Message::Halt);

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::HaltRetry);
        assert_eq!(ev.channel, Some(ChannelId::Display));
    }

    #[tokio::test]
    async fn test_send_halt_escalates_when_retries_exhausted() {
        let bus = MessageBus::new(2);
        let events = Bus::new(16);
        let mut rx = events.subscribe();
        bus.send(ChannelId::GlucoseCtrl, Message::Start, Priority::Critical)
            .unwrap();
        bus.send(ChannelId::GlucoseCtrl, Message::Stop, Priority::Urgent)
            .unwrap();

        let res = bus
            .send_halt(ChannelId::GlucoseCtrl, &fast_backoff(), 2, &events)
            .await;
        assert_eq!(
            res,
            HaltDelivery::Forced {
                evicted: Some(Message::Stop)
            }
        );
        assert_eq!(bus.try_drain_latest(ChannelId::GlucoseCtrl), Some(Message::Halt));

        let kinds: Vec<EventKind> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| e.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![EventKind::HaltRetry, EventKind::HaltRetry, EventKind::HaltForced]
        );
    }
}
