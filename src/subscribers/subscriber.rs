//! # Event subscriber trait.
//!
//! [`Subscribe`] is the extension point for plugging event handlers into the
//! supervisor. Each subscriber gets a dedicated worker and a bounded queue
//! (see [`SubscriberSet`](super::SubscriberSet)); a slow or panicking
//! subscriber only affects itself.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use glycovisor::{Event, EventKind, Subscribe};
//!
//! struct DropCounter(std::sync::atomic::AtomicUsize);
//!
//! #[async_trait]
//! impl Subscribe for DropCounter {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::MessageDropped {
//!             self.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "drop-counter" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Event subscriber for runtime observability.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes a single event, called from the subscriber's own worker in FIFO order.
    async fn on_event(&self, event: &Event);

    /// Name used in overflow/panic reports.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred queue capacity (clamped to at least 1). Default: 1024.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
