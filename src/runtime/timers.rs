//! # Self-addressed timers.
//!
//! A timer is a small task that sleeps and then puts a message into the
//! owning process's own mailbox, tagged with its [`TimerKey`]. Delivery goes
//! through the mailbox, so timer messages are serialized with everything else
//! the process handles.
//!
//! ## Rules
//! - A cancelled timer never delivers, even if its message is already queued:
//!   the cell checks [`Timers::accept`] before handing a timer message over.
//! - All timers are cancelled when the process stops or restarts.
//! - A repeating timer skips missed ticks instead of bursting.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::pid::Envelope;

/// Identifies a timer of one process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerKey(u64);

struct TimerEntry {
    cancel: CancellationToken,
    repeating: bool,
}

/// Timers owned by one process.
pub(crate) struct Timers<M> {
    tx: mpsc::UnboundedSender<Envelope<M>>,
    owner: CancellationToken,
    next: u64,
    active: HashMap<TimerKey, TimerEntry>,
}

impl<M: Send + 'static> Timers<M> {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Envelope<M>>, owner: CancellationToken) -> Self {
        Self {
            tx,
            owner,
            next: 0,
            active: HashMap::new(),
        }
    }

    fn register(&mut self, repeating: bool) -> (TimerKey, CancellationToken) {
        self.next += 1;
        let key = TimerKey(self.next);
        let cancel = self.owner.child_token();
        self.active.insert(
            key,
            TimerEntry {
                cancel: cancel.clone(),
                repeating,
            },
        );
        (key, cancel)
    }

    /// Delivers `msg` once after `delay`.
    pub(crate) fn schedule_once(&mut self, msg: M, delay: Duration) -> TimerKey {
        let (key, cancel) = self.register(false);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    let _ = tx.send(Envelope::Timer { key, msg });
                }
            }
        });
        key
    }

    /// Delivers a clone of `msg` every `every`, first after one period.
    pub(crate) fn schedule_repeat(&mut self, msg: M, every: Duration) -> TimerKey
    where
        M: Clone,
    {
        let (key, cancel) = self.register(true);
        let tx = self.tx.clone();
        let every = every.max(Duration::from_millis(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let envelope = Envelope::Timer { key, msg: msg.clone() };
                        if tx.send(envelope).is_err() {
                            break;
                        }
                    }
                }
            }
        });
        key
    }

    /// Cancels a timer. Returns `false` if it was unknown or already fired.
    pub(crate) fn cancel(&mut self, key: TimerKey) -> bool {
        match self.active.remove(&key) {
            Some(entry) => {
                entry.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub(crate) fn cancel_all(&mut self) {
        for (_, entry) in self.active.drain() {
            entry.cancel.cancel();
        }
    }

    /// Decides whether a delivered timer message may be handled.
    pub(crate) fn accept(&mut self, key: TimerKey) -> bool {
        match self.active.get(&key) {
            None => false,
            Some(entry) if entry.repeating => true,
            Some(_) => {
                self.active.remove(&key);
                true
            }
        }
    }

    /// Number of pending timers.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.active.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timers() -> (Timers<u32>, mpsc::UnboundedReceiver<Envelope<u32>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Timers::new(tx, CancellationToken::new()), rx)
    }

    fn delivered(env: Envelope<u32>) -> (TimerKey, u32) {
        match env {
            Envelope::Timer { key, msg } => (key, msg),
            Envelope::Message(_) => panic!("expected a timer envelope"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn once_fires_after_delay() {
        let (mut t, mut rx) = timers();
        let key = t.schedule_once(7, Duration::from_millis(50));

        let (got, msg) = delivered(rx.recv().await.expect("timer"));
        assert_eq!((got, msg), (key, 7));
        assert!(t.accept(key));
        assert!(!t.accept(key));
        assert_eq!(t.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_after_queueing_is_rejected() {
        let (mut t, mut rx) = timers();
        let key = t.schedule_once(1, Duration::from_millis(10));
        let (got, _) = delivered(rx.recv().await.expect("timer"));

        assert!(t.cancel(got));
        assert!(!t.accept(key));
    }

    #[tokio::test(start_paused = true)]
    async fn repeat_keeps_firing_until_cancelled() {
        let (mut t, mut rx) = timers();
        let key = t.schedule_repeat(3, Duration::from_millis(100));
        for _ in 0..3 {
            let (got, msg) = delivered(rx.recv().await.expect("tick"));
            assert_eq!((got, msg), (key, 3));
            assert!(t.accept(got));
        }
        t.cancel_all();
        tokio::time::sleep(Duration::from_millis(500)).await;
        while let Ok(env) = rx.try_recv() {
            let (got, _) = delivered(env);
            assert!(!t.accept(got));
        }
    }
}
