//! # Event subscribers.
//!
//! The [`Subscribe`] trait and the [`SubscriberSet`] that fans events out to
//! subscribers without blocking the processes that publish them.
//!
//! ```text
//!   cells / House / Waiter / Pool / Monitor ── publish ──► Bus
//!                                                           │
//!                                               System listener
//!                                                ├──► AliveTracker (shutdown bookkeeping)
//!                                                └──► SubscriberSet::emit
//!                                                        ├──► LogWriter
//!                                                        └──► custom subscribers
//! ```

#[cfg(feature = "logging")]
mod embedded;
mod subscribe;
mod subscriber_set;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
pub use subscribe::Subscribe;
pub use subscriber_set::SubscriberSet;
