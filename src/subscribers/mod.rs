//! # Event subscribers.
//!
//! ```text
//!   Bus ──► subscriber_listener ──► SubscriberSet
//!                                      ├──► LogWriter     (tracing output)
//!                                      ├──► AliveTracker  (stuck-task detection)
//!                                      └──► custom Subscribe impls
//! ```

mod alive;
mod log;
mod set;
mod subscriber;

pub use alive::AliveTracker;
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
