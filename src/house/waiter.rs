//! Waiter: turns orders into tickets and relays results to guests.
//!
//! The waiter never blocks on the pool. Results are routed through the
//! ticket's guest address, so a restarted waiter (fresh complaint counters,
//! same mailbox) relays in-flight results correctly.
//!
//! Complaints are counted per guest, as consecutive failures; a served
//! order resets that guest's counter. Once a counter exceeds
//! `max-complaint-count` the waiter faults with
//! [`Fault::RepeatedIntermediaryFailure`] after relaying the failure.
//! The House reports departed guests with `GuestLeft`, which drops their
//! counters.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Fault;
use crate::events::{Event, EventKind};
use crate::runtime::{Addr, Context, Process};

use super::messages::{GuestMsg, Outcome, PoolMsg, WaiterMsg, WorkResult, WorkTicket};

/// Consecutive complaints per guest id.
#[derive(Debug, Default)]
pub(crate) struct Complaints(HashMap<u64, u32>);

impl Complaints {
    /// Counts one more failure for `guest` and returns its run length.
    pub(crate) fn record(&mut self, guest: u64) -> u32 {
        let n = self.0.entry(guest).or_insert(0);
        *n += 1;
        *n
    }

    /// Ends the guest's run (served or gone).
    pub(crate) fn forget(&mut self, guest: u64) {
        self.0.remove(&guest);
    }

    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }
}

pub(crate) struct Waiter {
    pool: Addr<PoolMsg>,
    max_complaints: u32,
    complaints: Complaints,
}

impl Waiter {
    pub(crate) fn new(pool: Addr<PoolMsg>, max_complaints: u32) -> Self {
        Self {
            pool,
            max_complaints,
            complaints: Complaints::default(),
        }
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &Addr<PoolMsg> {
        &self.pool
    }

    fn relay(&mut self, ctx: &Context<Self>, result: WorkResult) -> Result<(), Fault> {
        let WorkResult { ticket, outcome } = result;
        let event = |kind| {
            Event::new(kind)
                .with_process(ticket.guest_name.clone())
                .with_coffee(ticket.coffee.to_string())
                .with_ticket(ticket.id)
        };

        if let Outcome::Prepared(coffee) = outcome {
            self.complaints.forget(ticket.guest_id);
            ticket.guest.send(GuestMsg::Served(coffee));
            ctx.publish(event(EventKind::OrderServed).with_delay(ticket.issued_at.elapsed()));
            return Ok(());
        }

        let reason = outcome.to_string();
        ticket.guest.send(GuestMsg::OrderFailed {
            reason: reason.clone(),
        });
        ctx.publish(event(EventKind::OrderFailed).with_reason(reason));

        let complaints = self.complaints.record(ticket.guest_id);
        if complaints > self.max_complaints {
            return Err(Fault::RepeatedIntermediaryFailure {
                guest: ticket.guest_name.to_string(),
                complaints,
                limit: self.max_complaints,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Process for Waiter {
    type Msg = WaiterMsg;

    async fn handle(&mut self, ctx: &mut Context<Self>, msg: WaiterMsg) -> Result<(), Fault> {
        match msg {
            WaiterMsg::Serve {
                guest_id,
                guest_name,
                guest,
                coffee,
            } => {
                let ticket = WorkTicket::new(guest_id, guest_name, guest, coffee);
                tracing::trace!(ticket = ticket.id, guest = %ticket.guest_name, %coffee, "ticket issued");
                self.pool.send(PoolMsg::Assign {
                    ticket,
                    reply_to: ctx.addr(),
                });
                Ok(())
            }
            WaiterMsg::Relay(result) => self.relay(ctx, result),
            WaiterMsg::PoolChanged(pool) => {
                self.pool = pool;
                Ok(())
            }
            WaiterMsg::GuestLeft { guest_id } => {
                self.complaints.forget(guest_id);
                tracing::trace!(guest_id, tracked = self.complaints.len(), "guest left");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_are_per_guest() {
        let mut c = Complaints::default();
        assert_eq!(c.record(1), 1);
        assert_eq!(c.record(1), 2);
        assert_eq!(c.record(2), 1);
        c.forget(1);
        assert_eq!(c.record(1), 1);
    }

    #[test]
    fn departed_guests_are_dropped() {
        let mut c = Complaints::default();
        for guest in 0..50 {
            c.record(guest);
        }
        for guest in 0..50 {
            c.forget(guest);
        }
        assert_eq!(c.len(), 0);
        c.forget(99);
        assert_eq!(c.len(), 0);
    }
}
