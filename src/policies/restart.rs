//! # Restart limits.
//!
//! A [`RestartLimit`] bounds how often a process may be restarted: more than
//! `max_restarts` restarts within the sliding window `within` stops the
//! process with [`ExitReason::RestartLimit`](crate::ExitReason::RestartLimit)
//! instead, and its parent decides what happens next.
//!
//! ```text
//! fault ─► directive = Restart ─► budget.try_acquire(now)
//!                                    ├─ Ok  → backoff.delay_for(recent) → fresh state
//!                                    └─ Err → exit RestartLimit (escalates)
//! ```

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

/// Bound on restarts in a sliding time window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RestartLimit {
    /// Restarts allowed inside `within`.
    pub max_restarts: u32,
    /// Window length.
    pub within: Duration,
}

impl RestartLimit {
    /// Creates a limit of `max_restarts` within `within`.
    pub fn new(max_restarts: u32, within: Duration) -> Self {
        Self {
            max_restarts,
            within,
        }
    }
}

/// History length kept when no limit is configured (only feeds backoff).
const UNBOUNDED_HISTORY: usize = 32;

/// Per-process restart history.
#[derive(Debug, Default)]
pub(crate) struct RestartBudget {
    history: VecDeque<Instant>,
}

impl RestartBudget {
    /// Records a restart at `now` if the limit allows it.
    ///
    /// Returns `false` when the restart would exceed the limit; nothing is recorded then.
    pub(crate) fn try_acquire(&mut self, now: Instant, limit: Option<RestartLimit>) -> bool {
        match limit {
            Some(limit) => {
                while let Some(&oldest) = self.history.front() {
                    if now.duration_since(oldest) >= limit.within {
                        self.history.pop_front();
                    } else {
                        break;
                    }
                }
                if self.history.len() >= limit.max_restarts as usize {
                    return false;
                }
            }
            None => {
                if self.history.len() >= UNBOUNDED_HISTORY {
                    self.history.pop_front();
                }
            }
        }
        self.history.push_back(now);
        true
    }

    /// Restarts recorded in the current window, not counting the latest one.
    pub(crate) fn recent(&self) -> u32 {
        self.history.len().saturating_sub(1) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_is_enforced_inside_window() {
        let limit = Some(RestartLimit::new(2, Duration::from_secs(10)));
        let mut budget = RestartBudget::default();
        let t0 = Instant::now();

        assert!(budget.try_acquire(t0, limit));
        assert!(budget.try_acquire(t0 + Duration::from_secs(1), limit));
        assert!(!budget.try_acquire(t0 + Duration::from_secs(2), limit));
        assert_eq!(budget.recent(), 1);
    }

    #[test]
    fn window_slides() {
        let limit = Some(RestartLimit::new(1, Duration::from_secs(5)));
        let mut budget = RestartBudget::default();
        let t0 = Instant::now();

        assert!(budget.try_acquire(t0, limit));
        assert!(!budget.try_acquire(t0 + Duration::from_secs(4), limit));
        assert!(budget.try_acquire(t0 + Duration::from_secs(5), limit));
        assert_eq!(budget.recent(), 0);
    }

    #[test]
    fn zero_limit_never_restarts() {
        let mut budget = RestartBudget::default();
        assert!(!budget.try_acquire(Instant::now(), Some(RestartLimit::new(0, Duration::from_secs(1)))));
    }

    #[test]
    fn unbounded_history_is_capped() {
        let mut budget = RestartBudget::default();
        let t0 = Instant::now();
        for i in 0..100 {
            assert!(budget.try_acquire(t0 + Duration::from_millis(i), None));
        }
        assert_eq!(budget.recent() as usize, UNBOUNDED_HISTORY - 1);
    }
}
