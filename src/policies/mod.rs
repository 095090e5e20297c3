//! Supervision, restart, routing and overload policies.
//!
//! This module groups the knobs that decide **what happens** when a process
//! faults, **how long** to wait before restarting it, **which** barista gets
//! the next ticket, and **how** the House reacts to a backlog.
//!
//! ## Contents
//! - [`Directive`], [`SupervisionPolicy`]: fault kind to directive table
//! - [`RestartLimit`]: at most N restarts within a window
//! - [`BackoffPolicy`], [`JitterPolicy`]: delay before a restart
//! - [`Router`] and [`LeastLoaded`] / [`RoundRobin`] / [`Random`]: pool routing
//! - [`OverloadPolicy`]: report, grow the pool, or shed load
//!
//! ## Quick wiring
//! ```text
//! ProcessSpec { policy: SupervisionPolicy { rules, limit, backoff } }
//!      └─► runtime cell on Err(fault):
//!           - directive_for(fault.kind())
//!           - Restart → RestartBudget::try_acquire(limit) → backoff.delay_for(recent)
//! ```

mod backoff;
mod directive;
mod jitter;
mod overload;
mod restart;
mod routing;

pub use backoff::BackoffPolicy;
pub use directive::{Directive, SupervisionPolicy};
pub use jitter::JitterPolicy;
pub use overload::OverloadPolicy;
pub use restart::RestartLimit;
pub use routing::{LeastLoaded, Random, RoundRobin, Router, RouterKind, WorkerLoad};

pub(crate) use restart::RestartBudget;
