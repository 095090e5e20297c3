//! # Process handles.
//!
//! - [`Pid`]: untyped identity and control plane of one process (stop,
//!   terminate, death watch, wait). Cheap to clone; equality is by id.
//! - [`Addr`]: typed data plane, a [`Pid`] plus the sender of the process
//!   mailbox. Sending never blocks and never fails: a message for a process
//!   that stopped accepting mail becomes a dead letter.
//!
//! Both survive restarts: a restarted process keeps its mailbox, its id and
//! every handle held by other processes.
//!
//! ```text
//!            Addr<M>::send ──► mailbox (unbounded, FIFO per sender)
//! Pid::stop / parent signals ──► signal channel (checked before the mailbox)
//!             Pid::terminate ──► kill token (cancels the in-flight handler)
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::Fault;
use crate::events::{Bus, Event, EventKind};
use crate::policies::Directive;

static NEXT_PID: AtomicU64 = AtomicU64::new(1);

/// Why a process terminated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// Stopped gracefully (`Pid::stop`, `Context::stop`, or by its parent).
    Stopped,
    /// Force-terminated (`Pid::terminate` or an ancestor was terminated).
    Killed,
    /// Supervision directive `Stop` after this fault.
    Faulted(Fault),
    /// Supervision directive `Escalate` after this fault.
    Escalated(Fault),
    /// The restart limit was exhausted; this is the fault that would have restarted it.
    RestartLimit(Fault),
}

impl ExitReason {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ExitReason::Stopped => "stopped",
            ExitReason::Killed => "killed",
            ExitReason::Faulted(_) => "faulted",
            ExitReason::Escalated(_) => "escalated",
            ExitReason::RestartLimit(_) => "restart_limit",
        }
    }

    /// The fault that ended the process, if any.
    pub fn fault(&self) -> Option<&Fault> {
        match self {
            ExitReason::Faulted(f) | ExitReason::Escalated(f) | ExitReason::RestartLimit(f) => {
                Some(f)
            }
            ExitReason::Stopped | ExitReason::Killed => None,
        }
    }

    /// `true` if the process left without a fault.
    pub fn is_normal(&self) -> bool {
        matches!(self, ExitReason::Stopped)
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.fault() {
            Some(fault) => write!(f, "{}: {fault}", self.as_label()),
            None => f.write_str(self.as_label()),
        }
    }
}

/// Death-watch notification.
#[derive(Debug, Clone)]
pub struct Terminated {
    /// The process that terminated.
    pub pid: Pid,
    /// Why it terminated.
    pub reason: ExitReason,
}

/// Control-plane messages, handled before the mailbox.
#[derive(Debug)]
pub(crate) enum Signal {
    Stop,
    Terminated(Terminated),
    ChildFailed {
        child: Pid,
        fault: Fault,
        directive: Directive,
    },
    ChildRestarted {
        child: Pid,
    },
}

/// Mailbox item: a regular message or a timer delivery.
pub(crate) enum Envelope<M> {
    Message(M),
    Timer { key: super::TimerKey, msg: M },
}

#[derive(Default)]
struct WatchState {
    watchers: Vec<Pid>,
    exit: Option<ExitReason>,
}

struct Shared {
    id: u64,
    name: Arc<str>,
    signals: mpsc::UnboundedSender<Signal>,
    kill: CancellationToken,
    finished: CancellationToken,
    watch: Mutex<WatchState>,
    bus: Bus,
}

/// Identity and control handle of a process.
#[derive(Clone)]
pub struct Pid {
    shared: Arc<Shared>,
}

impl Pid {
    pub(crate) fn new(
        name: Arc<str>,
        bus: Bus,
        kill: CancellationToken,
    ) -> (Self, mpsc::UnboundedReceiver<Signal>) {
        let (signals, rx) = mpsc::unbounded_channel();
        let shared = Shared {
            id: NEXT_PID.fetch_add(1, Ordering::Relaxed),
            name,
            signals,
            kill,
            finished: CancellationToken::new(),
            watch: Mutex::new(WatchState::default()),
            bus,
        };
        (
            Self {
                shared: Arc::new(shared),
            },
            rx,
        )
    }

    /// Process-unique numeric id.
    pub fn id(&self) -> u64 {
        self.shared.id
    }

    /// Process name.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub(crate) fn name_arc(&self) -> Arc<str> {
        Arc::clone(&self.shared.name)
    }

    /// Requests a graceful stop: the current message completes, queued
    /// messages become dead letters, children are stopped first.
    pub fn stop(&self) {
        let _ = self.shared.signals.send(Signal::Stop);
    }

    /// Forces termination: the in-flight handler is dropped and all
    /// descendants are terminated too.
    pub fn terminate(&self) {
        self.shared.kill.cancel();
    }

    /// `true` once the process has fully terminated.
    pub fn is_terminated(&self) -> bool {
        self.shared.finished.is_cancelled()
    }

    /// Waits until the process has fully terminated.
    pub async fn wait_terminated(&self) {
        self.shared.finished.cancelled().await;
    }

    /// Exit reason, once terminated.
    pub fn exit_reason(&self) -> Option<ExitReason> {
        self.shared.watch.lock().exit.clone()
    }

    pub(crate) fn signal(&self, signal: Signal) -> bool {
        self.shared.signals.send(signal).is_ok()
    }

    pub(crate) fn bus(&self) -> &Bus {
        &self.shared.bus
    }

    /// Registers `watcher`; if this process already terminated the watcher is notified now.
    pub(crate) fn add_watcher(&self, watcher: Pid) {
        let mut watch = self.shared.watch.lock();
        if let Some(reason) = watch.exit.clone() {
            drop(watch);
            watcher.signal(Signal::Terminated(Terminated {
                pid: self.clone(),
                reason,
            }));
            return;
        }
        if !watch.watchers.iter().any(|w| w.id() == watcher.id()) {
            watch.watchers.push(watcher);
        }
    }

    pub(crate) fn remove_watcher(&self, watcher_id: u64) {
        self.shared
            .watch
            .lock()
            .watchers
            .retain(|w| w.id() != watcher_id);
    }

    /// Records the exit reason, notifies watchers and releases waiters.
    pub(crate) fn mark_terminated(&self, reason: ExitReason) {
        let watchers = {
            let mut watch = self.shared.watch.lock();
            watch.exit = Some(reason.clone());
            std::mem::take(&mut watch.watchers)
        };
        for watcher in watchers {
            watcher.signal(Signal::Terminated(Terminated {
                pid: self.clone(),
                reason: reason.clone(),
            }));
        }
        self.shared.finished.cancel();
    }
}

impl PartialEq for Pid {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Pid {}

impl Hash for Pid {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Debug for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pid({}#{})", self.name(), self.id())
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Typed handle: sends `M` to a process mailbox.
pub struct Addr<M> {
    pid: Pid,
    tx: mpsc::UnboundedSender<Envelope<M>>,
}

impl<M> Clone for Addr<M> {
    fn clone(&self) -> Self {
        Self {
            pid: self.pid.clone(),
            tx: self.tx.clone(),
        }
    }
}

impl<M> fmt::Debug for Addr<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Addr({:?})", self.pid)
    }
}

impl<M: Send + 'static> Addr<M> {
    pub(crate) fn new(pid: Pid, tx: mpsc::UnboundedSender<Envelope<M>>) -> Self {
        Self { pid, tx }
    }

    /// Sends a message. Fire-and-forget: a stopped target gets a dead letter instead.
    pub fn send(&self, msg: M) {
        if self.tx.send(Envelope::Message(msg)).is_err() {
            dead_letter::<M>(&self.pid);
        }
    }

    /// Identity of the target process.
    pub fn pid(&self) -> &Pid {
        &self.pid
    }

    pub(crate) fn sender(&self) -> mpsc::UnboundedSender<Envelope<M>> {
        self.tx.clone()
    }
}

/// Reports an undeliverable `M` for `target`.
pub(crate) fn dead_letter<M>(target: &Pid) {
    let msg_type = std::any::type_name::<M>();
    tracing::debug!(process = target.name(), msg_type, "dead letter");
    target.bus().publish(
        Event::new(EventKind::DeadLetter)
            .with_process(target.name_arc())
            .with_pid(target.id())
            .with_reason(msg_type),
    );
}
