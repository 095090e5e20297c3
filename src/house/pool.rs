//! Barista pool: routes tickets to workers and tracks who owns what.
//!
//! ```text
//! Assign ──► Router::select(loads) ──► Prepare ──► barista-n
//!                 │ none available
//!                 └──► backlog (FIFO), dispatched when a worker is ready
//! Completed ──► ledger.complete(ticket) ──► Relay to reply_to (unknown → dropped)
//! child_failed(barista-n)  ──► evict: park its tickets, mark unavailable
//! WorkerReady(barista-n)   ──► fail parked tickets ("worker restarted"), available, drain backlog
//! ```
//!
//! ## Rules
//! - A ticket is owned by exactly one worker, tracked in the [`Ledger`].
//! - Evicting a worker never touches other workers' counts.
//! - Parked tickets still accept the evicted worker's completions: its last
//!   `Completed` was mailed before it faulted and arrives before its
//!   `WorkerReady`, so the real outcome is relayed.
//! - Backlog tickets count as outstanding for the monitor.
//! - Growth is capped at `pool.max-size`.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{BaristaConfig, PoolConfig};
use crate::error::Fault;
use crate::events::{Event, EventKind};
use crate::policies::{BackoffPolicy, Directive, Router, SupervisionPolicy, WorkerLoad};
use crate::runtime::{Addr, Context, Pid, Process, ProcessSpec, Terminated};

use super::barista::Barista;
use super::brew::Brew;
use super::messages::{
    BaristaMsg, HouseMsg, MonitorMsg, Outcome, PoolMsg, PoolStats, WaiterMsg, WorkResult, WorkTicket,
};

/// Outstanding work per worker slot and the owner of every in-flight ticket.
#[derive(Debug)]
pub(crate) struct Ledger<T> {
    loads: Vec<WorkerLoad>,
    in_flight: HashMap<u64, (usize, T)>,
    parked: HashMap<u64, (usize, T)>,
}

impl<T> Default for Ledger<T> {
    fn default() -> Self {
        Self {
            loads: Vec::new(),
            in_flight: HashMap::new(),
            parked: HashMap::new(),
        }
    }
}

impl<T> Ledger<T> {
    /// Adds an available, idle slot and returns its index.
    pub(crate) fn add_worker(&mut self) -> usize {
        self.loads.push(WorkerLoad {
            outstanding: 0,
            available: true,
        });
        self.loads.len() - 1
    }

    pub(crate) fn loads(&self) -> &[WorkerLoad] {
        &self.loads
    }

    pub(crate) fn assign(&mut self, worker: usize, ticket: u64, item: T) {
        self.loads[worker].outstanding += 1;
        self.in_flight.insert(ticket, (worker, item));
    }

    /// Removes a finished ticket, in flight or parked. `None` if it is unknown.
    pub(crate) fn complete(&mut self, ticket: u64) -> Option<(usize, T)> {
        if let Some((worker, item)) = self.in_flight.remove(&ticket) {
            let load = &mut self.loads[worker];
            load.outstanding = load.outstanding.saturating_sub(1);
            return Some((worker, item));
        }
        self.parked.remove(&ticket)
    }

    /// Parks every ticket owned by `worker`, zeroes its count and marks it
    /// unavailable. Returns how many tickets were parked.
    pub(crate) fn evict(&mut self, worker: usize) -> usize {
        let tickets: Vec<u64> = self
            .in_flight
            .iter()
            .filter(|(_, (w, _))| *w == worker)
            .map(|(id, _)| *id)
            .collect();
        for id in &tickets {
            if let Some(entry) = self.in_flight.remove(id) {
                self.parked.insert(*id, entry);
            }
        }
        self.loads[worker] = WorkerLoad {
            outstanding: 0,
            available: false,
        };
        tickets.len()
    }

    /// Takes the tickets parked for `worker`.
    pub(crate) fn release(&mut self, worker: usize) -> Vec<T> {
        let tickets: Vec<u64> = self
            .parked
            .iter()
            .filter(|(_, (w, _))| *w == worker)
            .map(|(id, _)| *id)
            .collect();
        tickets
            .into_iter()
            .filter_map(|id| self.parked.remove(&id).map(|(_, item)| item))
            .collect()
    }

    pub(crate) fn set_available(&mut self, worker: usize, available: bool) {
        self.loads[worker].available = available;
    }

    /// Assigned tickets not yet completed, parked ones included.
    pub(crate) fn total_outstanding(&self) -> usize {
        self.in_flight.len() + self.parked.len()
    }

    /// Drains every in-flight and parked ticket.
    pub(crate) fn drain(&mut self) -> Vec<T> {
        for load in &mut self.loads {
            load.outstanding = 0;
        }
        self.in_flight
            .drain()
            .chain(self.parked.drain())
            .map(|(_, (_, item))| item)
            .collect()
    }
}

struct Slot {
    name: Arc<str>,
    addr: Addr<BaristaMsg>,
}

type Pending = (WorkTicket, Addr<WaiterMsg>);

pub(crate) struct BaristaPool {
    cfg: PoolConfig,
    barista: BaristaConfig,
    backoff: BackoffPolicy,
    brew: Arc<dyn Brew>,
    house: Addr<HouseMsg>,
    router: Box<dyn Router>,
    ledger: Ledger<Pending>,
    backlog: VecDeque<Pending>,
    slots: Vec<Slot>,
    spawned: usize,
}

impl BaristaPool {
    pub(crate) fn new(
        cfg: PoolConfig,
        barista: BaristaConfig,
        backoff: BackoffPolicy,
        brew: Arc<dyn Brew>,
        house: Addr<HouseMsg>,
    ) -> Self {
        Self {
            router: cfg.router.build(),
            cfg,
            barista,
            backoff,
            brew,
            house,
            ledger: Ledger::default(),
            backlog: VecDeque::new(),
            slots: Vec::new(),
            spawned: 0,
        }
    }

    fn spawn_worker(&mut self, ctx: &mut Context<Self>) -> Slot {
        self.spawned += 1;
        let name: Arc<str> = Arc::from(format!("barista-{}", self.spawned));
        let pool = ctx.addr();
        let brew = Arc::clone(&self.brew);
        let cfg = self.barista.clone();
        let worker = Arc::clone(&name);
        let spec = ProcessSpec::new(Arc::clone(&name), move || {
            Barista::new(Arc::clone(&worker), pool.clone(), Arc::clone(&brew), cfg.clone())
        })
        .with_policy(SupervisionPolicy::new(Directive::Restart).with_backoff(self.backoff));
        let addr = ctx.spawn(spec);
        Slot { name, addr }
    }

    fn add_worker(&mut self, ctx: &mut Context<Self>) {
        let slot = self.spawn_worker(ctx);
        self.ledger.add_worker();
        self.slots.push(slot);
    }

    fn slot_of(&self, pid: &Pid) -> Option<usize> {
        self.slot_by_id(pid.id())
    }

    fn slot_by_id(&self, id: u64) -> Option<usize> {
        self.slots.iter().position(|s| s.addr.pid().id() == id)
    }

    /// Hands a ticket to the selected worker, or gives it back if none is available.
    fn route(&mut self, pending: Pending) -> Option<Pending> {
        let Some(worker) = self.router.select(self.ledger.loads()) else {
            return Some(pending);
        };
        let (ticket, reply_to) = pending;
        self.slots[worker].addr.send(BaristaMsg::Prepare {
            ticket: ticket.id,
            coffee: ticket.coffee,
        });
        self.ledger.assign(worker, ticket.id, (ticket, reply_to));
        None
    }

    fn drain_backlog(&mut self) {
        while let Some(pending) = self.backlog.pop_front() {
            if let Some(pending) = self.route(pending) {
                self.backlog.push_front(pending);
                break;
            }
        }
    }

    fn fail_all(tickets: impl IntoIterator<Item = Pending>, reason: &str) {
        for (ticket, reply_to) in tickets {
            reply_to.send(WaiterMsg::Relay(WorkResult {
                ticket,
                outcome: Outcome::Unavailable(reason.to_string()),
            }));
        }
    }

    fn stats(&self) -> PoolStats {
        let loads = self.ledger.loads();
        PoolStats {
            workers: self.slots.iter().map(|s| s.name.to_string()).collect(),
            outstanding: loads.iter().map(|l| l.outstanding).collect(),
            available: loads.iter().filter(|l| l.available).count(),
            in_flight: self.ledger.total_outstanding(),
            queued: self.backlog.len(),
        }
    }

    fn report_size(&self, ctx: &Context<Self>) {
        let size = self.slots.len();
        self.house.send(HouseMsg::PoolResized { size });
        ctx.publish(
            Event::new(EventKind::PoolResized)
                .with_process(ctx.name())
                .with_count(size as u64),
        );
    }
}

#[async_trait]
impl Process for BaristaPool {
    type Msg = PoolMsg;

    async fn started(&mut self, ctx: &mut Context<Self>) -> Result<(), Fault> {
        for _ in 0..self.cfg.min_size {
            self.add_worker(ctx);
        }
        tracing::debug!(size = self.slots.len(), router = self.router.name(), "barista pool started");
        self.house.send(HouseMsg::PoolResized {
            size: self.slots.len(),
        });
        Ok(())
    }

    async fn handle(&mut self, ctx: &mut Context<Self>, msg: PoolMsg) -> Result<(), Fault> {
        match msg {
            PoolMsg::Assign { ticket, reply_to } => {
                let pending = (ticket, reply_to);
                let unrouted = if self.backlog.is_empty() {
                    self.route(pending)
                } else {
                    Some(pending)
                };
                if let Some(pending) = unrouted {
                    tracing::trace!(
                        ticket = pending.0.id,
                        queued = self.backlog.len() + 1,
                        "no barista available, queued"
                    );
                    self.backlog.push_back(pending);
                }
            }
            PoolMsg::Completed {
                worker,
                ticket,
                outcome,
            } => match self.ledger.complete(ticket) {
                Some((_, (ticket, reply_to))) => {
                    reply_to.send(WaiterMsg::Relay(WorkResult { ticket, outcome }));
                }
                None => {
                    tracing::debug!(worker, ticket, "completion for a released ticket dropped");
                }
            },
            PoolMsg::WorkerReady { worker } => {
                let Some(slot) = self.slot_by_id(worker) else {
                    return Ok(());
                };
                let parked = self.ledger.release(slot);
                if !parked.is_empty() {
                    tracing::debug!(
                        worker = %self.slots[slot].name,
                        failed = parked.len(),
                        "barista back, failing unfinished tickets"
                    );
                }
                Self::fail_all(parked, "worker restarted");
                self.ledger.set_available(slot, true);
                self.drain_backlog();
            }
            PoolMsg::Grow { by } => {
                let target = (self.slots.len() + by).min(self.cfg.max_size);
                if target > self.slots.len() {
                    while self.slots.len() < target {
                        self.add_worker(ctx);
                    }
                    self.report_size(ctx);
                    self.drain_backlog();
                }
            }
            PoolMsg::Sample { reply_to } => {
                reply_to.send(MonitorMsg::Sampled {
                    outstanding: self.ledger.total_outstanding() + self.backlog.len(),
                    size: self.slots.len(),
                });
            }
            PoolMsg::Stats(tx) => {
                let _ = tx.send(self.stats());
            }
        }
        Ok(())
    }

    async fn child_failed(
        &mut self,
        _ctx: &mut Context<Self>,
        child: &Pid,
        fault: &Fault,
        _directive: Directive,
    ) -> Result<(), Fault> {
        if let Some(worker) = self.slot_of(child) {
            let parked = self.ledger.evict(worker);
            tracing::info!(worker = child.name(), %fault, parked, "barista restarting");
        }
        Ok(())
    }

    async fn terminated(&mut self, ctx: &mut Context<Self>, t: Terminated) -> Result<(), Fault> {
        let Some(worker) = self.slot_of(&t.pid) else {
            return Ok(());
        };
        tracing::warn!(worker = t.pid.name(), reason = %t.reason, "barista terminated, replacing");
        self.ledger.evict(worker);
        self.slots[worker] = self.spawn_worker(ctx);
        Ok(())
    }

    async fn stopped(&mut self, _ctx: &mut Context<Self>) {
        Self::fail_all(self.ledger.drain(), "pool stopped");
        Self::fail_all(self.backlog.drain(..), "pool stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evict_only_touches_one_worker() {
        let mut ledger: Ledger<&'static str> = Ledger::default();
        let a = ledger.add_worker();
        let b = ledger.add_worker();
        ledger.assign(a, 1, "t1");
        ledger.assign(b, 2, "t2");
        ledger.assign(a, 3, "t3");

        assert_eq!(ledger.evict(a), 2);
        assert_eq!(ledger.loads()[a], WorkerLoad { outstanding: 0, available: false });
        assert_eq!(ledger.loads()[b], WorkerLoad { outstanding: 1, available: true });
        assert_eq!(ledger.total_outstanding(), 3);

        let mut released = ledger.release(a);
        released.sort_unstable();
        assert_eq!(released, vec!["t1", "t3"]);
        assert_eq!(ledger.total_outstanding(), 1);
        assert!(ledger.release(a).is_empty());
    }

    #[test]
    fn parked_ticket_still_completes_once() {
        let mut ledger: Ledger<u64> = Ledger::default();
        let a = ledger.add_worker();
        ledger.assign(a, 7, 7);
        ledger.assign(a, 8, 8);
        ledger.evict(a);

        assert_eq!(ledger.complete(7), Some((a, 7)));
        assert!(ledger.complete(7).is_none());
        assert_eq!(ledger.loads()[a].outstanding, 0);
        assert_eq!(ledger.release(a), vec![8]);
        assert!(ledger.complete(8).is_none());
    }

    #[test]
    fn completion_decrements_owner() {
        let mut ledger: Ledger<u64> = Ledger::default();
        let a = ledger.add_worker();
        let b = ledger.add_worker();
        ledger.assign(b, 1, 1);
        ledger.assign(b, 2, 2);
        assert_eq!(ledger.complete(1), Some((b, 1)));
        assert_eq!(ledger.loads()[b].outstanding, 1);
        assert_eq!(ledger.loads()[a].outstanding, 0);
    }

    #[test]
    fn drain_takes_parked_tickets_too() {
        let mut ledger: Ledger<u64> = Ledger::default();
        let a = ledger.add_worker();
        let b = ledger.add_worker();
        ledger.assign(a, 1, 1);
        ledger.assign(b, 2, 2);
        ledger.evict(a);

        let mut drained = ledger.drain();
        drained.sort_unstable();
        assert_eq!(drained, vec![1, 2]);
        assert_eq!(ledger.total_outstanding(), 0);
    }
}
