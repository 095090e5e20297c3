//! # Subscriber trait
//!
//! `Subscribe` is the extension point for observing the coffee house: order
//! flow, process lifecycle, overload and shutdown all arrive here as
//! [`Event`]s. Each subscriber is driven by its own worker loop fed by a
//! bounded queue owned by the [`SubscriberSet`](crate::SubscriberSet).
//!
//! ## Contract
//! - Implementations may be slow; they never block processes or other subscribers.
//! - If a subscriber's queue overflows, events for that subscriber are dropped
//!   and a `SubscriberOverflow` event is published.
//!
//! ## Example
//! ```rust
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use coffeehouse::{Event, EventKind, Subscribe};
//!
//! #[derive(Default)]
//! struct ServedCounter(AtomicU64);
//!
//! #[async_trait::async_trait]
//! impl Subscribe for ServedCounter {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::OrderServed {
//!             self.0.fetch_add(1, Ordering::Relaxed);
//!         }
//!     }
//!     fn name(&self) -> &'static str { "served-counter" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Contract for event subscribers.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles one event.
    async fn on_event(&self, event: &Event);

    /// Human-readable name (for logs and overflow events).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred capacity of this subscriber's queue.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
