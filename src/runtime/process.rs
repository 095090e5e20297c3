//! # The `Process` trait.
//!
//! A process is private state plus a behavior. The runtime owns the state,
//! feeds it one message at a time and calls the lifecycle hooks:
//!
//! ```text
//! spawn ─► started ─► handle / terminated / child_failed / child_restarted ... ─► stopped
//!              ▲                               │ Err(fault)
//!              └──── Restart (fresh state) ◄───┘ SupervisionPolicy → Directive
//! ```
//!
//! ## Rules
//! - Hooks run strictly one at a time; `&mut self` is never shared.
//! - Returning `Err(fault)` hands the fault to the policy chosen by the parent.
//! - A panic inside a hook is caught and treated as [`Fault::Panicked`].
//! - A behavior that ignores a message returns `Ok(())`.
//! - A process with several behaviors keeps a state enum and matches on it.

use async_trait::async_trait;

use crate::error::Fault;
use crate::policies::Directive;

use super::context::Context;
use super::pid::{ExitReason, Pid, Terminated};

/// Behavior of a process.
#[async_trait]
pub trait Process: Send + Sized + 'static {
    /// Mailbox message type.
    type Msg: Send + 'static;

    /// Called once after spawn and again after each restart, before any message.
    async fn started(&mut self, _ctx: &mut Context<Self>) -> Result<(), Fault> {
        Ok(())
    }

    /// Handles one mailbox message.
    async fn handle(&mut self, ctx: &mut Context<Self>, msg: Self::Msg) -> Result<(), Fault>;

    /// A watched process (always including children) terminated.
    ///
    /// The default logs, and passes an [`ExitReason::Escalated`] exit further
    /// up as [`Fault::ChildEscalated`].
    async fn terminated(&mut self, ctx: &mut Context<Self>, t: Terminated) -> Result<(), Fault> {
        tracing::debug!(
            process = ctx.name(),
            watched = t.pid.name(),
            reason = %t.reason,
            "watched process terminated"
        );
        match t.reason {
            ExitReason::Escalated(fault) => Err(Fault::ChildEscalated {
                child: t.pid.name().to_string(),
                reason: fault.to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// A child faulted and its policy chose `Restart`; its fresh state is on the way.
    async fn child_failed(
        &mut self,
        _ctx: &mut Context<Self>,
        _child: &Pid,
        _fault: &Fault,
        _directive: Directive,
    ) -> Result<(), Fault> {
        Ok(())
    }

    /// A child came back with fresh state after a restart.
    async fn child_restarted(&mut self, _ctx: &mut Context<Self>, _child: &Pid) -> Result<(), Fault> {
        Ok(())
    }

    /// Called once before the state is dropped (stop or restart).
    async fn stopped(&mut self, _ctx: &mut Context<Self>) {}
}
