//! # Process cell: the loop that runs one process.
//!
//! One tokio task per process. The cell owns the state, the mailbox and the
//! signal channel, and applies the parent's supervision policy to faults.
//!
//! ```text
//! spawn() ─► publish ProcessStarted ─► tokio::spawn(cell.run())
//!
//! run:
//!   started()
//!   loop {
//!     ├─► select! (biased) { kill | signals | mailbox }
//!     ├─► dispatch to hook, panics caught (catch_unwind)
//!     ├─► Err(fault) → recover():
//!     │      ├─ Resume   → continue
//!     │      ├─ Stop     → exit Faulted
//!     │      ├─ Escalate → exit Escalated
//!     │      └─ Restart  → budget? ─ no → exit RestartLimit
//!     │                     └─ yes → ChildFailed to parent, cancel timers,
//!     │                              stop children, stopped(), backoff,
//!     │                              fresh state, started(), ProcessRestarted,
//!     │                              ChildRestarted to parent
//!     ├─► ctx.stop() or Stop signal → exit Stopped
//!     └─► yield_now()
//!   }
//!   finish: close mailbox, queued mail → dead letters, stop children,
//!           stopped(), cancel token, ProcessStopped, notify watchers
//! ```
//!
//! ## Rules
//! - Signals are handled before mail; a kill preempts everything, including
//!   the in-flight hook.
//! - Mailbox and handles survive restarts; queued mail goes to the fresh state.
//! - A killed process skips `stopped` and does not wait for its children
//!   (they are killed through the token tree).

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use futures::future::join_all;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::Fault;
use crate::events::{Bus, Event, EventKind};
use crate::policies::{Directive, RestartBudget};

use super::context::Context;
use super::pid::{Addr, Envelope, ExitReason, Pid, Signal, dead_letter};
use super::process::Process;
use super::spec::ProcessSpec;

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

enum Dispatch {
    Done(Result<(), Fault>),
    Killed,
}

enum Inbound<M> {
    Signal(Signal),
    Mail(Envelope<M>),
    Killed,
    Closed,
}

/// Runs a hook until it completes, panics, or the process is killed.
async fn guarded<F>(kill: &CancellationToken, fut: F) -> Dispatch
where
    F: Future<Output = Result<(), Fault>>,
{
    tokio::select! {
        biased;
        _ = kill.cancelled() => Dispatch::Killed,
        res = AssertUnwindSafe(fut).catch_unwind() => match res {
            Ok(res) => Dispatch::Done(res),
            Err(payload) => Dispatch::Done(Err(Fault::Panicked {
                info: panic_message(payload.as_ref()),
            })),
        },
    }
}

/// Spawns a process and returns its address.
pub(crate) fn spawn<P: Process>(
    spec: ProcessSpec<P>,
    bus: Bus,
    token: CancellationToken,
    parent: Option<Pid>,
) -> Addr<P::Msg> {
    let (pid, signals) = Pid::new(spec.name_arc(), bus.clone(), token.clone());
    let (tx, mailbox) = mpsc::unbounded_channel();
    let addr = Addr::new(pid.clone(), tx);
    if let Some(parent) = &parent {
        pid.add_watcher(parent.clone());
    }

    bus.publish(
        Event::new(EventKind::ProcessStarted)
            .with_process(pid.name_arc())
            .with_pid(pid.id()),
    );

    let cell = Cell {
        spec,
        ctx: Context::new(addr.clone(), bus, token),
        parent,
        signals,
        mailbox,
        budget: RestartBudget::default(),
        restarts: 0,
    };
    tokio::spawn(cell.run());
    addr
}

struct Cell<P: Process> {
    spec: ProcessSpec<P>,
    ctx: Context<P>,
    parent: Option<Pid>,
    signals: mpsc::UnboundedReceiver<Signal>,
    mailbox: mpsc::UnboundedReceiver<Envelope<P::Msg>>,
    budget: RestartBudget,
    restarts: u32,
}

impl<P: Process> Cell<P> {
    async fn run(mut self) {
        let kill = self.ctx.token().clone();
        let mut state = self.spec.build();
        let exit = self.live(&mut state, &kill).await;
        self.finish(&mut state, exit, &kill).await;
    }

    async fn live(&mut self, state: &mut P, kill: &CancellationToken) -> ExitReason {
        let mut outcome = guarded(kill, state.started(&mut self.ctx)).await;
        loop {
            match outcome {
                Dispatch::Killed => return ExitReason::Killed,
                Dispatch::Done(Ok(())) => {}
                Dispatch::Done(Err(fault)) => {
                    if let Err(exit) = self.recover(state, fault, kill).await {
                        return exit;
                    }
                }
            }
            if self.ctx.stopping {
                return ExitReason::Stopped;
            }
            tokio::task::yield_now().await;

            outcome = match self.next_inbound(kill).await {
                Inbound::Killed => return ExitReason::Killed,
                Inbound::Closed => return ExitReason::Stopped,
                Inbound::Signal(signal) => self.on_signal(state, signal, kill).await,
                Inbound::Mail(envelope) => self.on_mail(state, envelope, kill).await,
            };
        }
    }

    async fn next_inbound(&mut self, kill: &CancellationToken) -> Inbound<P::Msg> {
        tokio::select! {
            biased;
            _ = kill.cancelled() => Inbound::Killed,
            Some(signal) = self.signals.recv() => Inbound::Signal(signal),
            Some(envelope) = self.mailbox.recv() => Inbound::Mail(envelope),
            else => Inbound::Closed,
        }
    }

    async fn on_signal(&mut self, state: &mut P, signal: Signal, kill: &CancellationToken) -> Dispatch {
        match signal {
            Signal::Stop => {
                self.ctx.stopping = true;
                Dispatch::Done(Ok(()))
            }
            Signal::Terminated(t) => {
                self.ctx.children.remove(&t.pid.id());
                guarded(kill, state.terminated(&mut self.ctx, t)).await
            }
            Signal::ChildFailed {
                child,
                fault,
                directive,
            } => {
                guarded(
                    kill,
                    state.child_failed(&mut self.ctx, &child, &fault, directive),
                )
                .await
            }
            Signal::ChildRestarted { child } => {
                guarded(kill, state.child_restarted(&mut self.ctx, &child)).await
            }
        }
    }

    async fn on_mail(
        &mut self,
        state: &mut P,
        envelope: Envelope<P::Msg>,
        kill: &CancellationToken,
    ) -> Dispatch {
        match envelope {
            Envelope::Message(msg) => guarded(kill, state.handle(&mut self.ctx, msg)).await,
            Envelope::Timer { key, msg } => {
                if self.ctx.timers.accept(key) {
                    guarded(kill, state.handle(&mut self.ctx, msg)).await
                } else {
                    Dispatch::Done(Ok(()))
                }
            }
        }
    }

    /// Applies the supervision policy. `Err` carries the exit reason when the process must end.
    async fn recover(
        &mut self,
        state: &mut P,
        mut fault: Fault,
        kill: &CancellationToken,
    ) -> Result<(), ExitReason> {
        let pid = self.ctx.pid().clone();
        loop {
            let directive = self.spec.policy().directive_for(fault.kind());
            tracing::warn!(
                process = pid.name(),
                fault = %fault,
                directive = directive.as_label(),
                "process faulted"
            );
            self.ctx.publish(
                Event::new(EventKind::ProcessFaulted)
                    .with_process(pid.name_arc())
                    .with_pid(pid.id())
                    .with_reason(fault.to_string())
                    .with_directive(directive.as_label()),
            );

            match directive {
                Directive::Resume => return Ok(()),
                Directive::Stop => return Err(ExitReason::Faulted(fault)),
                Directive::Escalate => return Err(ExitReason::Escalated(fault)),
                Directive::Restart => {}
            }
            if !self
                .budget
                .try_acquire(Instant::now(), self.spec.policy().limit())
            {
                tracing::warn!(process = pid.name(), fault = %fault, "restart limit reached");
                return Err(ExitReason::RestartLimit(fault));
            }

            if let Some(parent) = &self.parent {
                parent.signal(Signal::ChildFailed {
                    child: pid.clone(),
                    fault: fault.clone(),
                    directive,
                });
            }
            self.ctx.timers.cancel_all();
            if !self.stop_children(kill).await {
                return Err(ExitReason::Killed);
            }
            self.run_stopped(state, kill).await;

            let delay = self.spec.policy().backoff().delay_for(self.budget.recent());
            if !delay.is_zero() {
                tokio::select! {
                    biased;
                    _ = kill.cancelled() => return Err(ExitReason::Killed),
                    _ = tokio::time::sleep(delay) => {}
                }
            }

            *state = self.spec.build();
            self.ctx.stopping = false;
            self.restarts += 1;
            let started = guarded(kill, state.started(&mut self.ctx)).await;

            tracing::debug!(process = pid.name(), restarts = self.restarts, ?delay, "process restarted");
            self.ctx.publish(
                Event::new(EventKind::ProcessRestarted)
                    .with_process(pid.name_arc())
                    .with_pid(pid.id())
                    .with_attempt(self.restarts)
                    .with_delay(delay)
                    .with_reason(fault.to_string()),
            );
            if let Some(parent) = &self.parent {
                parent.signal(Signal::ChildRestarted { child: pid.clone() });
            }

            match started {
                Dispatch::Killed => return Err(ExitReason::Killed),
                Dispatch::Done(Ok(())) => return Ok(()),
                Dispatch::Done(Err(next)) => fault = next,
            }
        }
    }

    /// Stops all children gracefully and waits for them. `false` if killed meanwhile.
    async fn stop_children(&mut self, kill: &CancellationToken) -> bool {
        let children: Vec<Pid> = self.ctx.children.drain().map(|(_, pid)| pid).collect();
        if children.is_empty() {
            return true;
        }
        let me = self.ctx.pid().id();
        for child in &children {
            child.remove_watcher(me);
            child.stop();
        }
        tokio::select! {
            biased;
            _ = kill.cancelled() => false,
            _ = join_all(children.iter().map(Pid::wait_terminated)) => true,
        }
    }

    async fn run_stopped(&mut self, state: &mut P, kill: &CancellationToken) {
        tokio::select! {
            biased;
            _ = kill.cancelled() => {}
            res = AssertUnwindSafe(state.stopped(&mut self.ctx)).catch_unwind() => {
                if let Err(payload) = res {
                    tracing::warn!(
                        process = self.ctx.name(),
                        info = %panic_message(payload.as_ref()),
                        "stopped hook panicked"
                    );
                }
            }
        }
    }

    async fn finish(mut self, state: &mut P, exit: ExitReason, kill: &CancellationToken) {
        self.ctx.timers.cancel_all();
        self.mailbox.close();
        while let Ok(envelope) = self.mailbox.try_recv() {
            if let Envelope::Message(_) = envelope {
                dead_letter::<P::Msg>(self.ctx.pid());
            }
        }

        if !kill.is_cancelled() && self.stop_children(kill).await {
            self.run_stopped(state, kill).await;
        }
        kill.cancel();

        let pid = self.ctx.pid().clone();
        tracing::debug!(process = pid.name(), reason = %exit, "process terminated");
        self.ctx.publish(
            Event::new(EventKind::ProcessStopped)
                .with_process(pid.name_arc())
                .with_pid(pid.id())
                .with_reason(exit.to_string()),
        );
        pid.mark_terminated(exit);
    }
}
