//! # LogWriter: events as `tracing` records
//!
//! Renders every [`Event`] as one `tracing` record with structured fields.
//! Order flow goes out at `info`, faults and overflow at `warn`, process
//! lifecycle and dead letters at `debug`. Install any `tracing` subscriber
//! (e.g. `tracing-subscriber` with `RUST_LOG`) to see them.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO coffeehouse: guest admitted process="guest-1" coffee="Akkaccino" limit=3
//! INFO coffeehouse: order served process="guest-1" coffee="Akkaccino" ticket=4 latency_ms=231
//! WARN coffeehouse: process faulted process="waiter" directive="restart" reason="..."
//! WARN coffeehouse: overload detected process="monitor" outstanding=7 samples=3
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Constructs a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let process = e.process.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");
        let coffee = e.coffee.as_deref().unwrap_or("-");

        match e.kind {
            EventKind::GuestAdmitted => {
                tracing::info!(target: "coffeehouse", process, coffee, limit = ?e.count, "guest admitted");
            }
            EventKind::AdmissionRejected => {
                tracing::warn!(target: "coffeehouse", coffee, count = ?e.count, "admission rejected while shedding load");
            }
            EventKind::OrderServed => {
                tracing::info!(target: "coffeehouse", process, coffee, ticket = ?e.ticket, latency_ms = ?e.delay_ms, "order served");
            }
            EventKind::OrderFailed => {
                tracing::info!(target: "coffeehouse", process, coffee, ticket = ?e.ticket, reason, "order failed");
            }
            EventKind::GuestExhausted => {
                tracing::info!(target: "coffeehouse", process, consumed = ?e.count, "guest reached caffeine limit");
            }
            EventKind::PoolResized => {
                tracing::info!(target: "coffeehouse", process, size = ?e.count, "pool resized");
            }
            EventKind::OverloadDetected => {
                tracing::warn!(target: "coffeehouse", process, outstanding = ?e.count, samples = ?e.attempt, "overload detected");
            }
            EventKind::OverloadCleared => {
                tracing::info!(target: "coffeehouse", process, outstanding = ?e.count, "overload cleared");
            }
            EventKind::ProcessStarted => {
                tracing::debug!(target: "coffeehouse", process, pid = ?e.pid, "process started");
            }
            EventKind::ProcessStopped => {
                tracing::debug!(target: "coffeehouse", process, pid = ?e.pid, reason, "process stopped");
            }
            EventKind::ProcessFaulted => {
                tracing::warn!(target: "coffeehouse", process, directive = ?e.directive, reason, "process faulted");
            }
            EventKind::ProcessRestarted => {
                tracing::warn!(target: "coffeehouse", process, restarts = ?e.attempt, delay_ms = ?e.delay_ms, reason, "process restarted");
            }
            EventKind::DeadLetter => {
                tracing::debug!(target: "coffeehouse", process, msg_type = reason, "dead letter");
            }
            EventKind::ShutdownRequested => {
                tracing::info!(target: "coffeehouse", "shutdown requested");
            }
            EventKind::AllStoppedWithin => {
                tracing::info!(target: "coffeehouse", "all processes stopped within grace");
            }
            EventKind::GraceExceeded => {
                tracing::error!(target: "coffeehouse", reason, "grace exceeded");
            }
            EventKind::SubscriberOverflow => {
                tracing::warn!(target: "coffeehouse", subscriber = process, reason, "subscriber overflow");
            }
            EventKind::SubscriberPanicked => {
                tracing::error!(target: "coffeehouse", subscriber = process, reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
