//! Inter-task messaging.
//!
//! ## Contents
//! - [`Message`], [`Alert`], [`Reservoir`] the closed message set
//! - [`Priority`] ordered bands for dequeue and scheduling
//! - [`PriorityChannel`] one bounded, priority-ordered queue
//! - [`MessageBus`] the three fixed channels and `HALT` escalation

mod channel;
mod message;
mod message_bus;
mod priority;

pub use channel::{ChannelId, PriorityChannel, DEFAULT_CAPACITY};
pub use message::{Alert, Message, MessageFamily, Reservoir};
pub use message_bus::{HaltDelivery, MessageBus};
pub use priority::Priority;
