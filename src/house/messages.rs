//! Messages exchanged by the coffee house processes, and the values they carry.
//!
//! ```text
//! Guest ──Serve──► Waiter ──Assign──► Pool ──Prepare──► Barista
//!   ▲                 │  ▲               ▲                 │
//!   └─Served/Failed───┘  └────Relay──────┴───Completed─────┘
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::runtime::Addr;

/// Coffees on the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Coffee {
    /// Akkaccino.
    Akkaccino,
    /// Caffe Java.
    CaffeJava,
    /// Cappuccino.
    Cappuccino,
    /// Espresso.
    Espresso,
    /// Latte.
    Latte,
    /// Mocha Play.
    MochaPlay,
}

impl Coffee {
    /// Every coffee, in menu order.
    pub const ALL: [Coffee; 6] = [
        Coffee::Akkaccino,
        Coffee::CaffeJava,
        Coffee::Cappuccino,
        Coffee::Espresso,
        Coffee::Latte,
        Coffee::MochaPlay,
    ];

    /// A random coffee other than `self`.
    pub fn other(self) -> Coffee {
        let others: Vec<Coffee> = Self::ALL.into_iter().filter(|c| *c != self).collect();
        others[rand::rng().random_range(0..others.len())]
    }

    fn as_str(self) -> &'static str {
        match self {
            Coffee::Akkaccino => "Akkaccino",
            Coffee::CaffeJava => "CaffeJava",
            Coffee::Cappuccino => "Cappuccino",
            Coffee::Espresso => "Espresso",
            Coffee::Latte => "Latte",
            Coffee::MochaPlay => "MochaPlay",
        }
    }
}

impl fmt::Display for Coffee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A coffee name that is not on the menu.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown coffee `{0}`")]
pub struct UnknownCoffee(pub String);

impl FromStr for Coffee {
    type Err = UnknownCoffee;

    /// Case-insensitive; `-`, `_` and spaces are ignored (`caffe-java`, `Mocha Play`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .flat_map(char::to_lowercase)
            .collect();
        Coffee::ALL
            .into_iter()
            .find(|c| c.as_str().to_lowercase() == key)
            .ok_or_else(|| UnknownCoffee(s.to_string()))
    }
}

static NEXT_TICKET: AtomicU64 = AtomicU64::new(1);

/// One order on its way through the pool.
#[derive(Debug, Clone)]
pub struct WorkTicket {
    /// Unique ticket id.
    pub id: u64,
    /// Pid id of the ordering guest.
    pub guest_id: u64,
    /// Name of the ordering guest.
    pub guest_name: Arc<str>,
    /// Where the result goes.
    pub guest: Addr<GuestMsg>,
    /// What was ordered.
    pub coffee: Coffee,
    /// When the waiter issued the ticket.
    pub issued_at: Instant,
}

impl WorkTicket {
    pub(crate) fn new(guest_id: u64, guest_name: Arc<str>, guest: Addr<GuestMsg>, coffee: Coffee) -> Self {
        Self {
            id: NEXT_TICKET.fetch_add(1, Ordering::Relaxed),
            guest_id,
            guest_name,
            guest,
            coffee,
            issued_at: Instant::now(),
        }
    }
}

/// How a ticket ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The ordered coffee.
    Prepared(Coffee),
    /// The barista made something else.
    Wrong {
        /// What was ordered.
        expected: Coffee,
        /// What came out.
        got: Coffee,
    },
    /// No barista could finish the ticket.
    Unavailable(String),
}

impl Outcome {
    /// `true` for [`Outcome::Prepared`].
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Prepared(_))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Prepared(c) => write!(f, "prepared {c}"),
            Outcome::Wrong { expected, got } => write!(f, "wrong coffee: {got} instead of {expected}"),
            Outcome::Unavailable(reason) => write!(f, "unavailable: {reason}"),
        }
    }
}

/// A finished ticket, relayed back to the waiter.
#[derive(Debug, Clone)]
pub struct WorkResult {
    /// The ticket.
    pub ticket: WorkTicket,
    /// Its outcome.
    pub outcome: Outcome,
}

/// Sustained backlog seen by the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverloadReport {
    /// Outstanding tickets in the last sample.
    pub outstanding: usize,
    /// Pool size in the last sample.
    pub size: usize,
    /// Consecutive samples above the mark.
    pub samples: u32,
}

/// Pool snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStats {
    /// Worker names, in slot order.
    pub workers: Vec<String>,
    /// Outstanding tickets per worker, in slot order.
    pub outstanding: Vec<usize>,
    /// Workers currently accepting tickets.
    pub available: usize,
    /// Tickets assigned and not yet completed.
    pub in_flight: usize,
    /// Tickets waiting for an available barista.
    pub queued: usize,
}

impl PoolStats {
    /// Number of worker slots.
    pub fn size(&self) -> usize {
        self.workers.len()
    }
}

/// Lifecycle of a guest as seen by the House.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuestStatus {
    /// Still ordering or drinking.
    Active,
    /// Reached its caffeine limit and left.
    Exhausted,
    /// Stopped after a fault (e.g. gave up).
    Faulted,
}

/// One guest in a [`HouseStatus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestSnapshot {
    /// Guest name.
    pub name: String,
    /// Ordered coffee.
    pub coffee: Coffee,
    /// Coffees finished.
    pub consumed: u32,
    /// Caffeine limit.
    pub limit: u32,
    /// Failed orders tolerated in a row.
    pub perseverance: u32,
    /// Lifecycle status.
    pub status: GuestStatus,
}

/// Snapshot returned by [`CoffeeHouse::status`](crate::CoffeeHouse::status).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HouseStatus {
    /// Guests still in the house.
    pub active_guests: usize,
    /// Guests admitted so far.
    pub admitted: usize,
    /// Guests that left at their limit.
    pub exhausted: usize,
    /// Guests that stopped after a fault.
    pub faulted: usize,
    /// Coffees finished by all guests.
    pub total_consumed: u64,
    /// Admissions rejected while shedding load.
    pub rejected: u64,
    /// Current barista pool size.
    pub pool_size: usize,
    /// `true` while admissions are rejected.
    pub shedding: bool,
    /// Per-guest detail, sorted by name.
    pub guests: Vec<GuestSnapshot>,
}

/// House mailbox.
#[derive(Debug)]
pub enum HouseMsg {
    /// Admit `count` guests ordering `coffee`; `limit` defaults to `caffeine-limit`.
    Admit {
        /// Number of guests.
        count: usize,
        /// Their order.
        coffee: Coffee,
        /// Per-guest caffeine limit.
        limit: Option<u32>,
    },
    /// Reply with a [`HouseStatus`].
    Status(oneshot::Sender<HouseStatus>),
    /// Reply with the pool's [`PoolStats`].
    PoolStats(oneshot::Sender<PoolStats>),
    /// A guest finished a coffee.
    GuestConsumed {
        /// Guest pid id.
        guest: u64,
        /// Coffees consumed so far.
        consumed: u32,
    },
    /// A guest reached its limit.
    GuestExhausted {
        /// Guest pid id.
        guest: u64,
        /// Coffees consumed.
        consumed: u32,
    },
    /// The pool changed size.
    PoolResized {
        /// New size.
        size: usize,
    },
    /// The monitor detected a sustained backlog.
    Overload(OverloadReport),
    /// The backlog went back under the mark.
    OverloadCleared {
        /// Outstanding tickets in the clearing sample.
        outstanding: usize,
    },
}

/// Waiter mailbox.
#[derive(Debug)]
pub enum WaiterMsg {
    /// A guest orders.
    Serve {
        /// Guest pid id.
        guest_id: u64,
        /// Guest name.
        guest_name: Arc<str>,
        /// Guest address.
        guest: Addr<GuestMsg>,
        /// Order.
        coffee: Coffee,
    },
    /// A ticket finished.
    Relay(WorkResult),
    /// The House re-created the pool.
    PoolChanged(Addr<PoolMsg>),
    /// A guest terminated; its complaint counter can go.
    GuestLeft {
        /// Guest pid id.
        guest_id: u64,
    },
}

/// Pool mailbox.
#[derive(Debug)]
pub enum PoolMsg {
    /// Route a ticket to a barista; the result goes to `reply_to`.
    Assign {
        /// The ticket.
        ticket: WorkTicket,
        /// Result recipient.
        reply_to: Addr<WaiterMsg>,
    },
    /// A barista finished a ticket.
    Completed {
        /// Pid id of the barista.
        worker: u64,
        /// Ticket id.
        ticket: u64,
        /// Outcome.
        outcome: Outcome,
    },
    /// A barista (fresh or restarted) is ready for tickets.
    WorkerReady {
        /// Pid id of the barista.
        worker: u64,
    },
    /// Add up to `by` workers, capped at `pool.max-size`.
    Grow {
        /// Workers to add.
        by: usize,
    },
    /// Answer the monitor with the current load.
    Sample {
        /// Monitor address.
        reply_to: Addr<MonitorMsg>,
    },
    /// Reply with a [`PoolStats`].
    Stats(oneshot::Sender<PoolStats>),
}

/// Barista mailbox.
#[derive(Debug)]
pub enum BaristaMsg {
    /// Queue a ticket.
    Prepare {
        /// Ticket id.
        ticket: u64,
        /// Order.
        coffee: Coffee,
    },
    /// The current ticket's preparation time elapsed.
    Ready,
}

/// Guest mailbox.
#[derive(Debug)]
pub enum GuestMsg {
    /// The ordered coffee arrived.
    Served(Coffee),
    /// The order failed.
    OrderFailed {
        /// Why.
        reason: String,
    },
    /// Drinking time elapsed.
    Finish,
    /// The House re-created the waiter.
    WaiterChanged(Addr<WaiterMsg>),
}

/// Monitor mailbox.
#[derive(Debug, Clone)]
pub enum MonitorMsg {
    /// Sampling timer.
    Tick,
    /// The pool's answer to a sample request.
    Sampled {
        /// Outstanding tickets.
        outstanding: usize,
        /// Pool size.
        size: usize,
    },
    /// The House re-created the pool.
    PoolChanged(Addr<PoolMsg>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coffee_parses_loosely() {
        assert_eq!("caffe-java".parse::<Coffee>(), Ok(Coffee::CaffeJava));
        assert_eq!("Mocha Play".parse::<Coffee>(), Ok(Coffee::MochaPlay));
        assert_eq!("ESPRESSO".parse::<Coffee>(), Ok(Coffee::Espresso));
        assert!("tea".parse::<Coffee>().is_err());
    }

    #[test]
    fn other_coffee_differs() {
        for coffee in Coffee::ALL {
            assert_ne!(coffee.other(), coffee);
        }
    }
}
