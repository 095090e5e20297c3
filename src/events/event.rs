//! # Events emitted by the runtime and the coffee house.
//!
//! The [`EventKind`] enum classifies events in four groups:
//! - **Process lifecycle**: started, faulted, restarted, stopped, dead letters
//! - **Coffee house**: admissions, orders, exhausted guests, pool size, overload
//! - **Shutdown**: requested, finished within grace, grace exceeded
//! - **Subscriber health**: overflow, panics
//!
//! The [`Event`] struct carries optional metadata (process name, reason,
//! counts, delays) depending on the kind.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use coffeehouse::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::OrderFailed)
//!     .with_process("guest-3")
//!     .with_coffee("Cappuccino")
//!     .with_reason("wrong coffee");
//!
//! assert_eq!(ev.kind, EventKind::OrderFailed);
//! assert_eq!(ev.process.as_deref(), Some("guest-3"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // === Process lifecycle ===
    /// A process was spawned and is about to run its `started` hook.
    ///
    /// Sets: `process`, `pid`.
    ProcessStarted,

    /// A handler returned a fault; `reason` carries the fault, `directive` the decision.
    ///
    /// Sets: `process`, `pid`, `reason`, `directive`.
    ProcessFaulted,

    /// A process got fresh state after a fault.
    ///
    /// Sets: `process`, `pid`, `attempt` (restart count), `delay_ms`, `reason`.
    ProcessRestarted,

    /// A process terminated.
    ///
    /// Sets: `process`, `pid`, `reason` (exit reason label).
    ProcessStopped,

    /// A message was sent to a stopped process and dropped.
    ///
    /// Sets: `process` (target), `reason` (message type).
    DeadLetter,

    // === Coffee house ===
    /// A guest was admitted.
    ///
    /// Sets: `process` (guest), `coffee`, `count` (caffeine limit).
    GuestAdmitted,

    /// An admission was rejected while shedding load.
    ///
    /// Sets: `count` (guests turned away), `coffee`.
    AdmissionRejected,

    /// The waiter relayed a correct coffee.
    ///
    /// Sets: `process` (guest), `coffee`, `ticket`, `delay_ms` (ticket latency).
    OrderServed,

    /// The waiter relayed a failed order.
    ///
    /// Sets: `process` (guest), `coffee`, `ticket`, `reason`.
    OrderFailed,

    /// A guest reached its caffeine limit and left.
    ///
    /// Sets: `process` (guest), `count` (consumed).
    GuestExhausted,

    /// The barista pool changed size.
    ///
    /// Sets: `process` (pool), `count` (new size).
    PoolResized,

    /// The monitor saw a sustained backlog.
    ///
    /// Sets: `process` (monitor), `count` (outstanding tickets), `attempt` (samples).
    OverloadDetected,

    /// The backlog went back under the high-water mark.
    ///
    /// Sets: `process` (monitor), `count` (outstanding tickets).
    OverloadCleared,

    // === Shutdown ===
    /// Shutdown requested.
    ShutdownRequested,

    /// All processes stopped within the grace period.
    AllStoppedWithin,

    /// Grace period exceeded; remaining processes were terminated.
    GraceExceeded,

    // === Subscribers ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets: `process` (subscriber name), `reason` (panic info).
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `process` (subscriber name), `reason`.
    SubscriberOverflow,
}

/// Event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Name of the process concerned, if any.
    pub process: Option<Arc<str>>,
    /// Numeric id of the process concerned, if any.
    pub pid: Option<u64>,
    /// Human-readable reason (faults, exit reasons, overflow details).
    pub reason: Option<Arc<str>>,
    /// Supervision directive label, for `ProcessFaulted`.
    pub directive: Option<&'static str>,
    /// Restart count or sample count.
    pub attempt: Option<u32>,
    /// Delay or latency in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Coffee involved, for order events.
    pub coffee: Option<Arc<str>>,
    /// Ticket id, for order events.
    pub ticket: Option<u64>,
    /// Generic quantity (consumed, size, outstanding...).
    pub count: Option<u64>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            process: None,
            pid: None,
            reason: None,
            directive: None,
            attempt: None,
            delay_ms: None,
            coffee: None,
            ticket: None,
            count: None,
        }
    }

    /// Attaches a process name.
    #[inline]
    pub fn with_process(mut self, process: impl Into<Arc<str>>) -> Self {
        self.process = Some(process.into());
        self
    }

    /// Attaches a process id.
    #[inline]
    pub fn with_pid(mut self, pid: u64) -> Self {
        self.pid = Some(pid);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a directive label.
    #[inline]
    pub fn with_directive(mut self, directive: &'static str) -> Self {
        self.directive = Some(directive);
        self
    }

    /// Attaches a restart/sample count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches a coffee name.
    #[inline]
    pub fn with_coffee(mut self, coffee: impl Into<Arc<str>>) -> Self {
        self.coffee = Some(coffee.into());
        self
    }

    /// Attaches a ticket id.
    #[inline]
    pub fn with_ticket(mut self, ticket: u64) -> Self {
        self.ticket = Some(ticket);
        self
    }

    /// Attaches a quantity.
    #[inline]
    pub fn with_count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_process(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_process(subscriber)
            .with_reason(info)
    }

    /// `true` if this event concerns the named process.
    #[inline]
    pub fn is_about(&self, process: &str) -> bool {
        self.process.as_deref() == Some(process)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_increase() {
        let a = Event::new(EventKind::ProcessStarted);
        let b = Event::new(EventKind::ProcessStopped);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn delay_saturates_at_u32() {
        let ev = Event::new(EventKind::ProcessRestarted).with_delay(Duration::from_secs(u64::MAX / 4));
        assert_eq!(ev.delay_ms, Some(u32::MAX));
    }
}
