//! # Event bus for broadcasting events.
//!
//! [`Bus`] wraps [`tokio::sync::broadcast`]. Every process cell, the pool,
//! the waiter, the monitor and the subscriber workers publish to it; the
//! [`System`](crate::System) listener fans events out to subscribers.
//!
//! ```text
//! Publishers (many):                   Receivers:
//!   process cells ──┐
//!   house / waiter ─┼──► Bus ──► System listener ──► AliveTracker + SubscriberSet
//!   pool / monitor ─┘      └───► ad-hoc receivers (tests, CoffeeHouse::subscribe)
//! ```
//!
//! ## Rules
//! - `publish()` never blocks and never fails, even with no receivers.
//! - One ring buffer of `capacity` events is shared by all receivers; a
//!   receiver that falls behind gets `RecvError::Lagged(n)` and skips `n` events.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for events. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus; capacity is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all current receivers. Dropped if there are none.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a receiver that observes events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn receiver_sees_events_published_after_subscribe() {
        let bus = Bus::new(0);
        bus.publish(Event::new(EventKind::ShutdownRequested));

        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::AllStoppedWithin));

        let ev = rx.recv().await.expect("event");
        assert_eq!(ev.kind, EventKind::AllStoppedWithin);
    }
}
