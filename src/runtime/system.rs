//! # System: roots, event plumbing and shutdown.
//!
//! [`System`] is the top of every supervision tree. It owns the event bus,
//! the subscriber fan-out, the live-process tracker and the root token from
//! which every process token descends.
//!
//! ```text
//! System::new(cfg, subscribers)
//!   ├─► Bus (broadcast)
//!   └─► listener task: Bus ──► AliveTracker::update ──► SubscriberSet::emit
//!
//! spawn_root(spec) ──► cell (token = root.child_token())
//!                         └─► ctx.spawn(child) ──► token.child_token() ...
//!
//! shutdown():
//!   ShutdownRequested ─► Stop every root ─► wait (grace)
//!     ├─ all terminated → AllStoppedWithin, Ok(())
//!     └─ timeout → GraceExceeded, cancel root token, Err(GraceExceeded { stuck })
//! ```
//!
//! ## Rules
//! - A root stops its subtree bottom-up before terminating.
//! - Subscribers receive every event published before shutdown returns.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::RuntimeConfig;
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::{Subscribe, SubscriberSet};

use super::alive::AliveTracker;
use super::cell;
use super::pid::{Addr, Pid};
use super::process::Process;
use super::spec::ProcessSpec;

/// Process runtime.
pub struct System {
    bus: Bus,
    token: CancellationToken,
    alive: Arc<AliveTracker>,
    grace: Duration,
    roots: Mutex<Vec<Pid>>,
    listener_stop: CancellationToken,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl System {
    /// Creates the runtime and starts the event listener. Requires a tokio runtime.
    pub fn new(cfg: &RuntimeConfig, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        let bus = Bus::new(cfg.bus_capacity);
        let alive = Arc::new(AliveTracker::new());
        let listener_stop = CancellationToken::new();
        let set = SubscriberSet::new(subscribers, bus.clone());
        let listener = Self::spawn_listener(&bus, Arc::clone(&alive), set, listener_stop.clone());

        Self {
            bus,
            token: CancellationToken::new(),
            alive,
            grace: cfg.grace,
            roots: Mutex::new(Vec::new()),
            listener_stop,
            listener: Mutex::new(Some(listener)),
        }
    }

    fn spawn_listener(
        bus: &Bus,
        alive: Arc<AliveTracker>,
        set: SubscriberSet,
        stop: CancellationToken,
    ) -> JoinHandle<()> {
        let mut rx = bus.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    res = rx.recv() => match res {
                        Ok(ev) => {
                            alive.update(&ev).await;
                            set.emit(ev);
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "event listener lagged");
                        }
                        Err(RecvError::Closed) => break,
                    },
                    _ = stop.cancelled() => break,
                }
            }
            set.shutdown().await;
        })
    }

    /// Event bus.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Spawns a root process.
    pub fn spawn_root<P: Process>(&self, spec: ProcessSpec<P>) -> Addr<P::Msg> {
        let addr = cell::spawn(spec, self.bus.clone(), self.token.child_token(), None);
        self.roots.lock().push(addr.pid().clone());
        addr
    }

    /// Sorted names of live processes, as seen by the event listener.
    pub async fn alive(&self) -> Vec<String> {
        self.alive.snapshot().await
    }

    /// Stops all roots gracefully within the configured grace period.
    ///
    /// On timeout every remaining process is terminated and
    /// [`RuntimeError::GraceExceeded`] names the ones that were still alive.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        let roots: Vec<Pid> = std::mem::take(&mut *self.roots.lock());
        for root in &roots {
            root.stop();
        }

        let all = join_all(roots.iter().map(Pid::wait_terminated));
        let res = match tokio::time::timeout(self.grace, all).await {
            Ok(_) => {
                self.bus.publish(Event::new(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(_) => {
                let stuck = self.alive.snapshot().await;
                tracing::error!(grace = ?self.grace, ?stuck, "grace exceeded, terminating");
                self.bus.publish(
                    Event::new(EventKind::GraceExceeded).with_reason(stuck.join(",")),
                );
                self.token.cancel();
                Err(RuntimeError::GraceExceeded {
                    grace: self.grace,
                    stuck,
                })
            }
        };
        self.close_listener().await;
        res
    }

    async fn close_listener(&self) {
        self.listener_stop.cancel();
        let handle = self.listener.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

impl Drop for System {
    fn drop(&mut self) {
        self.token.cancel();
        self.listener_stop.cancel();
    }
}
