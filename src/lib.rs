//! # coffeehouse
//!
//! **coffeehouse** runs a simulated coffee house as a tree of supervised,
//! message-passing processes on tokio.
//!
//! Guests order through a waiter, a pool of baristas prepares the orders,
//! a monitor watches the backlog, and the House supervises them all.
//! Components fail on purpose (wrong coffees, impatient guests, overworked
//! baristas) and recover through supervision policies.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!                    ┌──────────────────────────────┐
//!  CoffeeHouse ─────►│ House (root process)         │
//!  admit / status    │ - guest records, pool size   │
//!                    │ - child policies, overload   │
//!                    └──┬─────────┬─────────┬───────┘
//!                       ▼         ▼         ▼          ▼
//!                  ┌────────┐ ┌────────┐ ┌─────────┐ ┌─────────┐
//!                  │ guest-n│ │ waiter │ │ barista │ │ monitor │
//!                  │        │ │        │ │  -pool  │ │         │
//!                  └───┬────┘ └──┬──▲──┘ └──┬──▲───┘ └────┬────┘
//!                      │ Serve   │  │ Relay │  │ Sample   │
//!                      └────────►│  └───────┘  └──────────┘
//!                                │ Assign  ▲
//!                                └────────►│  barista-1..n (Prepare/Completed)
//!
//!  every process ── publishes ──► Bus (broadcast)
//!                                   └──► System listener
//!                                          ├──► AliveTracker
//!                                          └──► SubscriberSet ──► LogWriter, custom
//! ```
//!
//! ### Process lifecycle
//! ```text
//! ProcessSpec ──► Context::spawn ──► cell task
//!
//! started()
//! loop {
//!   ├─► next: kill | signal (stop, terminated, child_*) | mail | timer
//!   ├─► hook returns Err(fault) or panics
//!   │     └─► parent's SupervisionPolicy: Resume | Restart | Stop | Escalate
//!   └─► ctx.stop() / Pid::stop() ─► drain to dead letters, stop children, stopped()
//! }
//! watchers (parent first) ◄── Terminated { pid, reason }
//! ```
//!
//! ## Features
//! | Area              | Description                                                     | Key types / traits                            |
//! |-------------------|-----------------------------------------------------------------|-----------------------------------------------|
//! | **Runtime**       | Processes, typed addresses, timers, death watch, shutdown       | [`Process`], [`Context`], [`Addr`], [`System`] |
//! | **Policies**      | Directives, restart limits, backoff, routing, overload          | [`SupervisionPolicy`], [`Router`]             |
//! | **House**         | The coffee house and its public handle                          | [`CoffeeHouse`], [`HouseStatus`], [`Brew`]    |
//! | **Subscriber API**| Hook into runtime and domain events                             | [`Subscribe`], [`Event`]                      |
//! | **Errors**        | Fault taxonomy and runtime errors                               | [`Fault`], [`RuntimeError`], [`ConfigError`]  |
//! | **Configuration** | Every tunable with documented defaults, TOML loading            | [`HouseConfig`]                               |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use coffeehouse::{Coffee, CoffeeHouse, HouseConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = HouseConfig::default();
//!     cfg.barista.prepare_duration = Duration::from_millis(5);
//!     cfg.barista.prepare_jitter = Duration::ZERO;
//!     cfg.guest.finish_duration = Duration::from_millis(5);
//!
//!     let house = CoffeeHouse::open(cfg)?;
//!     house.admit(2, Coffee::Espresso, Some(1));
//!
//!     tokio::time::sleep(Duration::from_millis(200)).await;
//!     let status = house.status().await?;
//!     assert_eq!(status.admitted, 2);
//!
//!     house.shutdown().await?;
//!     Ok(())
//! }
//! ```
mod config;
mod error;
mod events;
mod house;
mod policies;
mod runtime;
mod subscribers;

// ---- Public re-exports ----

pub use config::{
    BaristaConfig, GuestConfig, HouseConfig, MonitorConfig, OverloadConfig, PoolConfig,
    RuntimeConfig, WaiterConfig,
};
pub use error::{ConfigError, Fault, FaultKind, RuntimeError};
pub use events::{Bus, Event, EventKind};
pub use house::{
    Accuracy, Brew, Coffee, CoffeeHouse, CoffeeHouseBuilder, GuestSnapshot, GuestStatus,
    HouseStatus, Outcome, OverloadReport, PoolStats, UnknownCoffee, WorkResult, WorkTicket,
};
pub use policies::{
    BackoffPolicy, Directive, JitterPolicy, LeastLoaded, OverloadPolicy, Random, RestartLimit,
    RoundRobin, Router, RouterKind, SupervisionPolicy, WorkerLoad,
};
pub use runtime::{
    Addr, Context, ExitReason, Pid, Process, ProcessSpec, System, Terminated, TimerKey,
    wait_for_shutdown_signal,
};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
