//! # Backoff before restarting a faulted process.
//!
//! [`BackoffPolicy`] computes how long a process waits between dropping its
//! faulted state and building a fresh one. The delay for the `n`-th restart
//! inside the current restart window is `first × factor^n`, clamped to `max`,
//! then jittered. The base is derived from `n` alone, so jitter never feeds
//! back into later delays.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use coffeehouse::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(10),
//!     max: Duration::from_secs(1),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(backoff.delay_for(0), Duration::from_millis(10));
//! assert_eq!(backoff.delay_for(3), Duration::from_millis(80));
//! assert_eq!(backoff.delay_for(20), Duration::from_secs(1));
//! ```

use std::time::Duration;

use super::jitter::JitterPolicy;

/// Restart backoff policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the first restart.
    pub first: Duration,
    /// Upper bound of any delay.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` expected).
    pub factor: f64,
    /// Randomization applied after clamping.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Returns a policy with:
    /// - `first = 10ms`;
    /// - `factor = 2.0`;
    /// - `max = 1s`;
    /// - no jitter.
    fn default() -> Self {
        Self {
            first: Duration::from_millis(10),
            max: Duration::from_secs(1),
            factor: 2.0,
            jitter: JitterPolicy::None,
        }
    }
}

impl BackoffPolicy {
    /// A policy that restarts immediately.
    pub fn immediate() -> Self {
        Self {
            first: Duration::ZERO,
            max: Duration::ZERO,
            factor: 1.0,
            jitter: JitterPolicy::None,
        }
    }

    /// Delay before restart number `n` (0-indexed, counted inside the restart window).
    pub fn delay_for(&self, n: u32) -> Duration {
        let max_secs = self.max.as_secs_f64();
        let exp = n.min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);

        let base = if !secs.is_finite() || secs < 0.0 || secs > max_secs {
            self.max
        } else {
            Duration::from_secs_f64(secs)
        };
        self.jitter.apply(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doubling() -> BackoffPolicy {
        BackoffPolicy {
            first: Duration::from_millis(100),
            max: Duration::from_secs(30),
            factor: 2.0,
            jitter: JitterPolicy::None,
        }
    }

    #[test]
    fn grows_exponentially() {
        let policy = doubling();
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(4), Duration::from_millis(1600));
    }

    #[test]
    fn first_above_max_is_clamped() {
        let policy = BackoffPolicy {
            first: Duration::from_secs(10),
            max: Duration::from_secs(5),
            ..doubling()
        };
        assert_eq!(policy.delay_for(0), Duration::from_secs(5));
    }

    #[test]
    fn overflow_clamps_to_max() {
        assert_eq!(doubling().delay_for(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn full_jitter_never_exceeds_base() {
        let policy = BackoffPolicy {
            jitter: JitterPolicy::Full,
            ..doubling()
        };
        for n in 0..10 {
            let base = Duration::from_millis(100 * 2u64.pow(n));
            assert!(policy.delay_for(n) <= base.min(Duration::from_secs(30)));
        }
    }

    #[test]
    fn immediate_is_zero() {
        assert_eq!(BackoffPolicy::immediate().delay_for(7), Duration::ZERO);
    }
}
