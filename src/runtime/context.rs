//! # Process context.
//!
//! [`Context`] is the runtime side of a process, passed to every hook next to
//! the process state. It owns what survives a restart: the process's own
//! address, its child table, its timers and the event bus.

use std::collections::HashMap;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::events::{Bus, Event};

use super::cell;
use super::pid::{Addr, Pid};
use super::process::Process;
use super::spec::ProcessSpec;
use super::timers::{TimerKey, Timers};

/// Runtime handle available to a process while it handles a message.
pub struct Context<P: Process> {
    me: Addr<P::Msg>,
    bus: Bus,
    token: CancellationToken,
    pub(crate) children: HashMap<u64, Pid>,
    pub(crate) timers: Timers<P::Msg>,
    pub(crate) stopping: bool,
}

impl<P: Process> Context<P> {
    pub(crate) fn new(me: Addr<P::Msg>, bus: Bus, token: CancellationToken) -> Self {
        let timers = Timers::new(me.sender(), token.clone());
        Self {
            me,
            bus,
            token,
            children: HashMap::new(),
            timers,
            stopping: false,
        }
    }

    /// Address of this process.
    pub fn addr(&self) -> Addr<P::Msg> {
        self.me.clone()
    }

    /// Identity of this process.
    pub fn pid(&self) -> &Pid {
        self.me.pid()
    }

    /// Name of this process.
    pub fn name(&self) -> &str {
        self.me.pid().name()
    }

    /// Event bus.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Publishes an event on the bus.
    pub fn publish(&self, ev: Event) {
        self.bus.publish(ev);
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Spawns a child supervised by this process with `spec`'s policy.
    ///
    /// The child is watched automatically and terminated with this process.
    pub fn spawn<C: Process>(&mut self, spec: ProcessSpec<C>) -> Addr<C::Msg> {
        let addr = cell::spawn(
            spec,
            self.bus.clone(),
            self.token.child_token(),
            Some(self.pid().clone()),
        );
        self.children
            .insert(addr.pid().id(), addr.pid().clone());
        addr
    }

    /// Live children of this process.
    pub fn children(&self) -> impl Iterator<Item = &Pid> {
        self.children.values()
    }

    /// Watches `pid`; its termination is delivered to [`Process::terminated`].
    /// Watching a process that already terminated delivers immediately.
    pub fn watch(&mut self, pid: &Pid) {
        pid.add_watcher(self.pid().clone());
    }

    /// Stops watching `pid`.
    pub fn unwatch(&mut self, pid: &Pid) {
        pid.remove_watcher(self.pid().id());
    }

    /// Sends `msg` to this process after `delay`.
    pub fn schedule_once(&mut self, msg: P::Msg, delay: Duration) -> TimerKey {
        self.timers.schedule_once(msg, delay)
    }

    /// Sends `msg` to this process every `every`.
    pub fn schedule_repeat(&mut self, msg: P::Msg, every: Duration) -> TimerKey
    where
        P::Msg: Clone,
    {
        self.timers.schedule_repeat(msg, every)
    }

    /// Cancels a timer; its message is never handled, even if already queued.
    pub fn cancel_timer(&mut self, key: TimerKey) -> bool {
        self.timers.cancel(key)
    }

    /// Stops this process gracefully once the current hook returns.
    pub fn stop(&mut self) {
        self.stopping = true;
    }
}
