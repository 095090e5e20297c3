//! # House: the root of the coffee house.
//!
//! ```text
//! House (root, Resume)
//!   ├── barista-pool   Restart, backoff
//!   │     └── barista-1..n   Restart on WorkerFatal
//!   ├── waiter         Restart on RepeatedIntermediaryFailure, bounded; else Escalate
//!   ├── monitor        Restart, backoff
//!   └── guest-1..n     Stop
//! ```
//!
//! ## Rules
//! - Guest records change only here: on `GuestConsumed`, `GuestExhausted`
//!   and guest termination.
//! - A guest failure never touches the waiter or the pool.
//! - A waiter, pool or monitor that terminates for any reason while the
//!   House is running is re-created, and the processes holding its address
//!   are told about the new one.
//! - Waiter and monitor factories read the pool address from a [`PoolLink`],
//!   so a restart after a pool re-creation still finds the live pool.
//! - The waiter hears about every guest that leaves.
//! - Overload reports are handled by [`OverloadPolicy`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::config::{HouseConfig, MonitorConfig};
use crate::error::{Fault, FaultKind};
use crate::events::{Event, EventKind};
use crate::policies::{Directive, OverloadPolicy, SupervisionPolicy};
use crate::runtime::{Addr, Context, Pid, Process, ProcessSpec, Terminated};

use super::brew::Brew;
use super::guest::{Guest, GuestParams};
use super::messages::{
    Coffee, GuestMsg, GuestSnapshot, GuestStatus, HouseMsg, HouseStatus, MonitorMsg, PoolMsg,
    WaiterMsg,
};
use super::monitor::Monitor;
use super::pool::BaristaPool;
use super::waiter::Waiter;

pub(crate) const POOL: &str = "barista-pool";
pub(crate) const WAITER: &str = "waiter";
pub(crate) const MONITOR: &str = "monitor";

/// Current pool address, shared with the factories of the pool's clients.
#[derive(Clone)]
pub(crate) struct PoolLink(Arc<RwLock<Addr<PoolMsg>>>);

impl PoolLink {
    pub(crate) fn new(pool: Addr<PoolMsg>) -> Self {
        Self(Arc::new(RwLock::new(pool)))
    }

    pub(crate) fn get(&self) -> Addr<PoolMsg> {
        self.0.read().clone()
    }

    pub(crate) fn set(&self, pool: Addr<PoolMsg>) {
        *self.0.write() = pool;
    }
}

/// What the House knows about one guest.
#[derive(Debug)]
struct GuestRecord {
    addr: Addr<GuestMsg>,
    params: Arc<GuestParams>,
    consumed: u32,
    status: GuestStatus,
}

impl GuestRecord {
    fn snapshot(&self) -> GuestSnapshot {
        GuestSnapshot {
            name: self.params.name.to_string(),
            coffee: self.params.coffee,
            consumed: self.consumed,
            limit: self.params.limit,
            perseverance: self.params.perseverance,
            status: self.status,
        }
    }
}

pub(crate) struct House {
    cfg: Arc<HouseConfig>,
    brew: Arc<dyn Brew>,
    pool: Option<PoolLink>,
    waiter: Option<Addr<WaiterMsg>>,
    monitor: Option<Addr<MonitorMsg>>,
    guests: HashMap<u64, GuestRecord>,
    next_guest: u64,
    pool_size: usize,
    shedding: bool,
    rejected: u64,
}

impl House {
    pub(crate) fn new(cfg: Arc<HouseConfig>, brew: Arc<dyn Brew>) -> Self {
        Self {
            pool_size: cfg.pool.min_size,
            cfg,
            brew,
            pool: None,
            waiter: None,
            monitor: None,
            guests: HashMap::new(),
            next_guest: 0,
            shedding: false,
            rejected: 0,
        }
    }

    pub(crate) fn spec(cfg: Arc<HouseConfig>, brew: Arc<dyn Brew>) -> ProcessSpec<House> {
        ProcessSpec::new("house", move || House::new(Arc::clone(&cfg), Arc::clone(&brew)))
            .with_policy(SupervisionPolicy::new(Directive::Resume))
    }

    fn spawn_pool(&self, ctx: &mut Context<Self>) -> Addr<PoolMsg> {
        let cfg = Arc::clone(&self.cfg);
        let brew = Arc::clone(&self.brew);
        let house = ctx.addr();
        let backoff = cfg.runtime.restart_backoff();
        let spec = ProcessSpec::new(POOL, move || {
            BaristaPool::new(
                cfg.pool.clone(),
                cfg.barista.clone(),
                cfg.runtime.restart_backoff(),
                Arc::clone(&brew),
                house.clone(),
            )
        })
        .with_policy(SupervisionPolicy::new(Directive::Restart).with_backoff(backoff));
        ctx.spawn(spec)
    }

    fn spawn_waiter(&self, ctx: &mut Context<Self>, pool: PoolLink) -> Addr<WaiterMsg> {
        let policy = SupervisionPolicy::new(Directive::Escalate)
            .on(FaultKind::RepeatedIntermediaryFailure, Directive::Restart)
            .on(FaultKind::Panicked, Directive::Restart)
            .with_limit(self.cfg.waiter.restart_limit())
            .with_backoff(self.cfg.runtime.restart_backoff());
        ctx.spawn(waiter_spec(self.cfg.waiter.max_complaint_count, pool).with_policy(policy))
    }

    fn spawn_monitor(&self, ctx: &mut Context<Self>, pool: PoolLink) -> Addr<MonitorMsg> {
        let policy = SupervisionPolicy::new(Directive::Restart).with_backoff(self.cfg.runtime.restart_backoff());
        let house = ctx.addr();
        ctx.spawn(monitor_spec(self.cfg.monitor.clone(), pool, house).with_policy(policy))
    }

    fn pool(&self) -> Option<Addr<PoolMsg>> {
        self.pool.as_ref().map(PoolLink::get)
    }

    fn admit(&mut self, ctx: &mut Context<Self>, count: usize, coffee: Coffee, limit: Option<u32>) {
        if self.shedding {
            self.rejected += count as u64;
            tracing::info!(count, %coffee, "admission rejected while shedding load");
            ctx.publish(
                Event::new(EventKind::AdmissionRejected)
                    .with_process(ctx.name())
                    .with_coffee(coffee.to_string())
                    .with_count(count as u64),
            );
            return;
        }
        let Some(waiter) = self.waiter.clone() else {
            return;
        };

        for _ in 0..count {
            self.next_guest += 1;
            let params = Arc::new(GuestParams {
                name: Arc::from(format!("guest-{}", self.next_guest)),
                coffee,
                limit: limit.unwrap_or(self.cfg.caffeine_limit),
                perseverance: self.cfg.guest.perseverance,
                finish: self.cfg.guest.finish_duration,
            });
            let house = ctx.addr();
            let waiter = waiter.clone();
            let factory_params = Arc::clone(&params);
            let spec = ProcessSpec::new(Arc::clone(&params.name), move || {
                Guest::new(Arc::clone(&factory_params), waiter.clone(), house.clone())
            })
            .with_policy(SupervisionPolicy::new(Directive::Stop));
            let addr = ctx.spawn(spec);

            ctx.publish(
                Event::new(EventKind::GuestAdmitted)
                    .with_process(Arc::clone(&params.name))
                    .with_pid(addr.pid().id())
                    .with_coffee(coffee.to_string())
                    .with_count(u64::from(params.limit)),
            );
            self.guests.insert(
                addr.pid().id(),
                GuestRecord {
                    addr,
                    params,
                    consumed: 0,
                    status: GuestStatus::Active,
                },
            );
        }
    }

    fn status(&self) -> HouseStatus {
        let mut status = HouseStatus {
            admitted: self.guests.len(),
            rejected: self.rejected,
            pool_size: self.pool_size,
            shedding: self.shedding,
            ..HouseStatus::default()
        };
        for record in self.guests.values() {
            match record.status {
                GuestStatus::Active => status.active_guests += 1,
                GuestStatus::Exhausted => status.exhausted += 1,
                GuestStatus::Faulted => status.faulted += 1,
            }
            status.total_consumed += u64::from(record.consumed);
            status.guests.push(record.snapshot());
        }
        status.guests.sort_by(|a, b| a.name.cmp(&b.name));
        status
    }

    fn on_overload(&mut self, outstanding: usize, size: usize) {
        let policy = self.cfg.overload.policy;
        tracing::warn!(outstanding, size, policy = policy.as_label(), "pool overloaded");
        match policy {
            OverloadPolicy::ReportOnly => {}
            OverloadPolicy::GrowPool => {
                if let Some(pool) = self.pool() {
                    pool.send(PoolMsg::Grow {
                        by: self.cfg.overload.grow_step,
                    });
                }
            }
            OverloadPolicy::ShedLoad => self.shedding = true,
        }
    }

    fn guest_terminated(&mut self, t: &Terminated) -> bool {
        let Some(record) = self.guests.get_mut(&t.pid.id()) else {
            return false;
        };
        if record.status == GuestStatus::Active {
            record.status = if t.reason.is_normal() {
                GuestStatus::Exhausted
            } else {
                GuestStatus::Faulted
            };
        }
        tracing::debug!(guest = t.pid.name(), reason = %t.reason, consumed = record.consumed, "guest left");
        true
    }

    fn recreate(&mut self, ctx: &mut Context<Self>, t: &Terminated) {
        let name = t.pid.name();
        let Some(link) = self.pool.clone() else {
            return;
        };
        match name {
            POOL => {
                let pool = self.spawn_pool(ctx);
                link.set(pool.clone());
                self.pool_size = self.cfg.pool.min_size;
                if let Some(waiter) = &self.waiter {
                    waiter.send(WaiterMsg::PoolChanged(pool.clone()));
                }
                if let Some(monitor) = &self.monitor {
                    monitor.send(MonitorMsg::PoolChanged(pool));
                }
            }
            WAITER => {
                let waiter = self.spawn_waiter(ctx, link);
                for record in self.guests.values() {
                    if record.status == GuestStatus::Active {
                        record.addr.send(GuestMsg::WaiterChanged(waiter.clone()));
                    }
                }
                self.waiter = Some(waiter);
            }
            MONITOR => self.monitor = Some(self.spawn_monitor(ctx, link)),
            _ => return,
        }
        Self::announce(ctx, t);
    }

    fn announce(ctx: &Context<Self>, t: &Terminated) {
        tracing::warn!(process = t.pid.name(), reason = %t.reason, "re-created after termination");
        ctx.publish(
            Event::new(EventKind::ProcessRestarted)
                .with_process(t.pid.name().to_string())
                .with_reason(t.reason.to_string())
                .with_directive("recreate"),
        );
    }
}

fn waiter_spec(max_complaints: u32, pool: PoolLink) -> ProcessSpec<Waiter> {
    ProcessSpec::new(WAITER, move || Waiter::new(pool.get(), max_complaints))
}

fn monitor_spec(cfg: MonitorConfig, pool: PoolLink, house: Addr<HouseMsg>) -> ProcessSpec<Monitor> {
    ProcessSpec::new(MONITOR, move || Monitor::new(cfg.clone(), pool.get(), house.clone()))
}

#[async_trait]
impl Process for House {
    type Msg = HouseMsg;

    async fn started(&mut self, ctx: &mut Context<Self>) -> Result<(), Fault> {
        let link = PoolLink::new(self.spawn_pool(ctx));
        self.waiter = Some(self.spawn_waiter(ctx, link.clone()));
        self.monitor = Some(self.spawn_monitor(ctx, link.clone()));
        self.pool = Some(link);
        tracing::info!(
            pool = self.cfg.pool.min_size,
            overload = self.cfg.overload.policy.as_label(),
            "coffee house open"
        );
        Ok(())
    }

    async fn handle(&mut self, ctx: &mut Context<Self>, msg: HouseMsg) -> Result<(), Fault> {
        match msg {
            HouseMsg::Admit {
                count,
                coffee,
                limit,
            } => self.admit(ctx, count, coffee, limit),
            HouseMsg::Status(tx) => {
                let _ = tx.send(self.status());
            }
            HouseMsg::PoolStats(tx) => {
                if let Some(pool) = self.pool() {
                    pool.send(PoolMsg::Stats(tx));
                }
            }
            HouseMsg::GuestConsumed { guest, consumed } => {
                if let Some(record) = self.guests.get_mut(&guest) {
                    record.consumed = record.consumed.max(consumed);
                }
            }
            HouseMsg::GuestExhausted { guest, consumed } => {
                if let Some(record) = self.guests.get_mut(&guest) {
                    record.consumed = record.consumed.max(consumed);
                    record.status = GuestStatus::Exhausted;
                }
            }
            HouseMsg::PoolResized { size } => self.pool_size = size,
            HouseMsg::Overload(report) => self.on_overload(report.outstanding, report.size),
            HouseMsg::OverloadCleared { outstanding } => {
                if self.shedding {
                    tracing::info!(outstanding, "overload cleared, admitting again");
                    self.shedding = false;
                }
            }
        }
        Ok(())
    }

    async fn terminated(&mut self, ctx: &mut Context<Self>, t: Terminated) -> Result<(), Fault> {
        if self.guest_terminated(&t) {
            if let Some(waiter) = &self.waiter {
                waiter.send(WaiterMsg::GuestLeft { guest_id: t.pid.id() });
            }
        } else {
            self.recreate(ctx, &t);
        }
        Ok(())
    }

    async fn child_failed(
        &mut self,
        _ctx: &mut Context<Self>,
        child: &Pid,
        fault: &Fault,
        directive: Directive,
    ) -> Result<(), Fault> {
        tracing::debug!(child = child.name(), %fault, directive = directive.as_label(), "child failed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::events::Bus;

    fn detached<M: Send + 'static>(name: &str) -> Addr<M> {
        let (pid, _signals) = Pid::new(Arc::from(name), Bus::new(8), CancellationToken::new());
        let (tx, _rx) = mpsc::unbounded_channel();
        Addr::new(pid, tx)
    }

    #[test]
    fn rebuilt_clients_follow_the_current_pool() {
        let old: Addr<PoolMsg> = detached(POOL);
        let link = PoolLink::new(old.clone());
        let waiter = waiter_spec(3, link.clone());
        let monitor = monitor_spec(MonitorConfig::default(), link.clone(), detached("house"));
        assert_eq!(waiter.build().pool().pid().id(), old.pid().id());

        let new: Addr<PoolMsg> = detached(POOL);
        link.set(new.clone());
        assert_eq!(waiter.build().pool().pid().id(), new.pid().id());
        assert_eq!(monitor.build().pool().pid().id(), new.pid().id());
    }
}
