//! # The coffee house.
//!
//! Domain processes on top of the process runtime:
//!
//! ```text
//! CoffeeHouse ──Admit/Status──► House
//!                                 ├── barista-pool ──► barista-1..n
//!                                 ├── waiter
//!                                 ├── monitor
//!                                 └── guest-1..n
//! ```
//!
//! Only [`CoffeeHouse`], the message payload types and the [`Brew`]
//! strategy are public; the processes themselves are internal.

mod barista;
mod brew;
mod facade;
mod guest;
#[allow(clippy::module_inception)]
mod house;
mod messages;
mod monitor;
mod pool;
mod waiter;

pub use brew::{Accuracy, Brew};
pub use facade::{CoffeeHouse, CoffeeHouseBuilder};
pub use messages::{
    Coffee, GuestSnapshot, GuestStatus, HouseStatus, Outcome, OverloadReport, PoolStats, UnknownCoffee,
    WorkResult, WorkTicket,
};
