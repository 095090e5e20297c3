//! Events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`]: event classification and payload metadata
//! - [`Bus`]: thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: process cells (lifecycle, dead letters), `House`,
//!   `Waiter`, `BaristaPool`, `Monitor`, `System` (shutdown), `SubscriberSet`
//!   workers (overflow/panic).
//! - **Consumers**: the `System` listener (feeds `AliveTracker` and the
//!   `SubscriberSet`) and any receiver from [`Bus::subscribe`].

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
