//! Retry policies.
//!
//! Used for one thing only: re-sending `HALT` when a channel is saturated.
//!
//! ## Contents
//! - [`BackoffPolicy`] how retry delays evolve (first / factor / max + jitter)
//! - [`JitterPolicy`]  randomization applied to each delay
//!
//! ## Wiring
//! ```text
//! Config { halt_backoff: BackoffPolicy, halt_retries }
//!      └─► MessageBus::send_halt uses backoff.next(attempt) between retries
//! ```

mod backoff;
mod jitter;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
