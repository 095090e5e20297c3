//! # Live-process tracker with sequence-based ordering.
//!
//! Knows which processes are alive, from `ProcessStarted` / `ProcessStopped`
//! events, so that a shutdown that runs out of grace can name the stuck ones.
//!
//! ```text
//! Bus ──► System listener ──► AliveTracker::update()
//!                                    │
//!                                    ▼
//!                      HashMap<pid, {name, last_seq, alive}>
//! ```
//!
//! ## Rules
//! - Processes are keyed by pid: a re-created process with the same name is a new entry.
//! - Events with `seq <= last_seq` for a pid are stale and ignored.
//! - Reads are eventually consistent with the bus.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::events::{Event, EventKind};

#[derive(Debug, Clone)]
struct ProcessState {
    name: Arc<str>,
    last_seq: Option<u64>,
    alive: bool,
}

/// Tracker of live processes.
#[derive(Default)]
pub(crate) struct AliveTracker {
    state: RwLock<HashMap<u64, ProcessState>>,
}

impl AliveTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Applies a lifecycle event. Returns `true` if the alive set changed.
    pub(crate) async fn update(&self, ev: &Event) -> bool {
        let alive = match ev.kind {
            EventKind::ProcessStarted => true,
            EventKind::ProcessStopped => false,
            _ => return false,
        };
        let (Some(pid), Some(name)) = (ev.pid, ev.process.as_ref()) else {
            return false;
        };

        let mut state = self.state.write().await;
        let entry = state.entry(pid).or_insert_with(|| ProcessState {
            name: Arc::clone(name),
            last_seq: None,
            alive: false,
        });
        if entry.last_seq.is_some_and(|last| ev.seq <= last) {
            return false;
        }
        entry.last_seq = Some(ev.seq);
        if entry.alive == alive {
            return false;
        }
        entry.alive = alive;
        if !alive {
            state.remove(&pid);
        }
        true
    }

    /// Sorted names of live processes.
    pub(crate) async fn snapshot(&self) -> Vec<String> {
        let state = self.state.read().await;
        let mut alive: Vec<String> = state
            .values()
            .filter(|s| s.alive)
            .map(|s| s.name.to_string())
            .collect();
        alive.sort_unstable();
        alive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lifecycle(kind: EventKind, pid: u64, name: &str) -> Event {
        Event::new(kind).with_pid(pid).with_process(name)
    }

    #[tokio::test]
    async fn started_then_stopped() {
        let tracker = AliveTracker::new();
        assert!(tracker.update(&lifecycle(EventKind::ProcessStarted, 1, "waiter")).await);
        assert!(tracker.update(&lifecycle(EventKind::ProcessStarted, 2, "pool")).await);
        assert_eq!(tracker.snapshot().await, vec!["pool", "waiter"]);

        assert!(tracker.update(&lifecycle(EventKind::ProcessStopped, 1, "waiter")).await);
        assert_eq!(tracker.snapshot().await, vec!["pool"]);
    }

    #[tokio::test]
    async fn stale_start_after_stop_is_ignored() {
        let tracker = AliveTracker::new();
        let started = lifecycle(EventKind::ProcessStarted, 9, "guest-1");
        let stopped = lifecycle(EventKind::ProcessStopped, 9, "guest-1");

        assert!(!tracker.update(&stopped).await);
        assert!(!tracker.update(&started).await);
        assert!(tracker.snapshot().await.is_empty());
    }
}
