//! # Process runtime.
//!
//! Lightweight supervised processes on top of tokio: each process is one
//! task with private state, a FIFO mailbox, a signal channel, timers and a
//! parent that decides what its faults mean.
//!
//! ## Contents
//! - [`Process`]: behavior trait with lifecycle hooks
//! - [`Context`]: spawn children, watch, timers, publish, stop
//! - [`Pid`], [`Addr`]: untyped and typed handles, stable across restarts
//! - [`ProcessSpec`]: name + factory + supervision policy
//! - [`System`]: roots, event listener, graceful shutdown
//! - [`ExitReason`], [`Terminated`], [`TimerKey`]
//!
//! ## Guarantees
//! - One hook at a time per process; processes run in parallel.
//! - FIFO per sender/receiver pair; at-most-once delivery.
//! - A dead target turns a send into a `DeadLetter` event, never an error.
//! - Cancelled timers never deliver.
//! - A handler panic becomes [`Fault::Panicked`](crate::Fault::Panicked).

mod alive;
mod cell;
mod context;
mod pid;
mod process;
mod shutdown;
mod spec;
mod system;
mod timers;

pub use context::Context;
pub use pid::{Addr, ExitReason, Pid, Terminated};
pub use process::Process;
pub use shutdown::wait_for_shutdown_signal;
pub use spec::ProcessSpec;
pub use system::System;
pub use timers::TimerKey;

pub(crate) use cell::panic_message;
