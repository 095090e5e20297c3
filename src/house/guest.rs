//! Guest: orders, drinks, and leaves at its caffeine limit.
//!
//! ```text
//!            order()                Served              Finish (consumed < limit)
//! Idle ───────────────► AwaitingOrder ──────► Consuming ──────────────────────────► Idle
//!                          │  ▲                   │ Finish (consumed == limit)
//!            OrderFailed   │  │ re-order          ▼
//!     (failures ≤ p) ──────┘  │               Exhausted ──► stop
//!     (failures > p) ──► Fault::ClientPerseverance
//! ```
//!
//! ## Rules
//! - `consumed` never exceeds `limit`: ordering at the limit is a
//!   [`Fault::ClientSafety`].
//! - With perseverance `p` a guest gives up after exactly `p + 1` failed
//!   orders in a row.
//! - Messages that do not fit the current state are ignored.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Fault;
use crate::events::{Event, EventKind};
use crate::runtime::{Addr, Context, Process};

use super::messages::{Coffee, GuestMsg, HouseMsg, WaiterMsg};

/// Where a guest is in its visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GuestState {
    Idle,
    AwaitingOrder,
    Consuming,
    Exhausted,
}

#[derive(Debug)]
pub(crate) struct GuestParams {
    pub(crate) name: Arc<str>,
    pub(crate) coffee: Coffee,
    pub(crate) limit: u32,
    pub(crate) perseverance: u32,
    pub(crate) finish: Duration,
}

pub(crate) struct Guest {
    params: Arc<GuestParams>,
    waiter: Addr<WaiterMsg>,
    house: Addr<HouseMsg>,
    state: GuestState,
    consumed: u32,
    failures: u32,
}

impl Guest {
    pub(crate) fn new(params: Arc<GuestParams>, waiter: Addr<WaiterMsg>, house: Addr<HouseMsg>) -> Self {
        Self {
            params,
            waiter,
            house,
            state: GuestState::Idle,
            consumed: 0,
            failures: 0,
        }
    }

    fn order(&mut self, ctx: &mut Context<Self>) -> Result<(), Fault> {
        if self.consumed >= self.params.limit {
            return Err(Fault::ClientSafety {
                guest: self.params.name.to_string(),
                reason: format!("ordering with {} of {} coffees consumed", self.consumed, self.params.limit),
            });
        }
        self.waiter.send(WaiterMsg::Serve {
            guest_id: ctx.pid().id(),
            guest_name: Arc::clone(&self.params.name),
            guest: ctx.addr(),
            coffee: self.params.coffee,
        });
        self.state = GuestState::AwaitingOrder;
        Ok(())
    }

    fn enter_idle(&mut self, ctx: &mut Context<Self>) -> Result<(), Fault> {
        self.state = GuestState::Idle;
        if self.consumed < self.params.limit {
            self.order(ctx)
        } else {
            self.exhaust(ctx);
            Ok(())
        }
    }

    fn exhaust(&mut self, ctx: &mut Context<Self>) {
        self.state = GuestState::Exhausted;
        self.house.send(HouseMsg::GuestExhausted {
            guest: ctx.pid().id(),
            consumed: self.consumed,
        });
        ctx.publish(
            Event::new(EventKind::GuestExhausted)
                .with_process(Arc::clone(&self.params.name))
                .with_count(u64::from(self.consumed)),
        );
        ctx.stop();
    }
}

#[async_trait]
impl Process for Guest {
    type Msg = GuestMsg;

    async fn started(&mut self, ctx: &mut Context<Self>) -> Result<(), Fault> {
        self.enter_idle(ctx)
    }

    async fn handle(&mut self, ctx: &mut Context<Self>, msg: GuestMsg) -> Result<(), Fault> {
        match (self.state, msg) {
            (GuestState::AwaitingOrder, GuestMsg::Served(coffee)) => {
                tracing::trace!(guest = %self.params.name, %coffee, "served");
                self.failures = 0;
                self.state = GuestState::Consuming;
                ctx.schedule_once(GuestMsg::Finish, self.params.finish);
                Ok(())
            }
            (GuestState::Consuming, GuestMsg::Finish) => {
                self.consumed += 1;
                self.house.send(HouseMsg::GuestConsumed {
                    guest: ctx.pid().id(),
                    consumed: self.consumed,
                });
                self.enter_idle(ctx)
            }
            (GuestState::AwaitingOrder, GuestMsg::OrderFailed { reason }) => {
                self.failures += 1;
                tracing::debug!(guest = %self.params.name, failures = self.failures, %reason, "order failed");
                if self.failures > self.params.perseverance {
                    return Err(Fault::ClientPerseverance {
                        guest: self.params.name.to_string(),
                        attempts: self.failures,
                    });
                }
                self.order(ctx)
            }
            (state, GuestMsg::WaiterChanged(waiter)) => {
                self.waiter = waiter;
                if state == GuestState::AwaitingOrder {
                    self.order(ctx)?;
                }
                Ok(())
            }
            (state, msg) => {
                tracing::trace!(guest = %self.params.name, ?state, ?msg, "ignored");
                Ok(())
            }
        }
    }
}
