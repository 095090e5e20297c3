//! # Work routing for the barista pool.
//!
//! A [`Router`] is a pure selection over the pool's current worker loads. The
//! pool owns the router and calls it once per ticket; routers may keep a
//! cursor between calls but never see anything except [`WorkerLoad`]s.
//!
//! - [`LeastLoaded`]: fewest outstanding tickets, ties broken round-robin (default)
//! - [`RoundRobin`]: next available worker after the previous pick
//! - [`Random`]: uniform among available workers
//!
//! ## Rules
//! - Unavailable workers are never selected.
//! - `None` means no worker is available.

use rand::Rng;
use serde::Deserialize;

/// Load of one worker slot as seen by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerLoad {
    /// Tickets assigned and not yet completed.
    pub outstanding: usize,
    /// `false` while the worker is restarting.
    pub available: bool,
}

/// Selects the worker that receives the next ticket.
pub trait Router: Send + 'static {
    /// Returns the index of the chosen worker, or `None` if no worker is available.
    fn select(&mut self, loads: &[WorkerLoad]) -> Option<usize>;

    /// Router name for logs.
    fn name(&self) -> &'static str;
}

/// Least outstanding tickets, round-robin among ties.
#[derive(Debug, Default)]
pub struct LeastLoaded {
    cursor: usize,
}

impl Router for LeastLoaded {
    fn select(&mut self, loads: &[WorkerLoad]) -> Option<usize> {
        let n = loads.len();
        let min = loads
            .iter()
            .filter(|l| l.available)
            .map(|l| l.outstanding)
            .min()?;

        let picked = (0..n)
            .map(|offset| (self.cursor + offset) % n)
            .find(|&i| loads[i].available && loads[i].outstanding == min)?;
        self.cursor = (picked + 1) % n;
        Some(picked)
    }

    fn name(&self) -> &'static str {
        "least-loaded"
    }
}

/// Cycles through available workers.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: usize,
}

impl Router for RoundRobin {
    fn select(&mut self, loads: &[WorkerLoad]) -> Option<usize> {
        let n = loads.len();
        let picked = (0..n)
            .map(|offset| (self.cursor + offset) % n)
            .find(|&i| loads[i].available)?;
        self.cursor = (picked + 1) % n;
        Some(picked)
    }

    fn name(&self) -> &'static str {
        "round-robin"
    }
}

/// Uniform random choice among available workers.
#[derive(Debug, Default)]
pub struct Random;

impl Router for Random {
    fn select(&mut self, loads: &[WorkerLoad]) -> Option<usize> {
        let available: Vec<usize> = loads
            .iter()
            .enumerate()
            .filter(|(_, l)| l.available)
            .map(|(i, _)| i)
            .collect();
        if available.is_empty() {
            return None;
        }
        let pick = rand::rng().random_range(0..available.len());
        Some(available[pick])
    }

    fn name(&self) -> &'static str {
        "random"
    }
}

/// Router selection in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RouterKind {
    /// [`LeastLoaded`].
    #[default]
    LeastLoaded,
    /// [`RoundRobin`].
    RoundRobin,
    /// [`Random`].
    Random,
}

impl RouterKind {
    /// Builds a fresh router of this kind.
    pub fn build(self) -> Box<dyn Router> {
        match self {
            RouterKind::LeastLoaded => Box::new(LeastLoaded::default()),
            RouterKind::RoundRobin => Box::new(RoundRobin::default()),
            RouterKind::Random => Box::new(Random),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(outstanding: usize) -> WorkerLoad {
        WorkerLoad {
            outstanding,
            available: true,
        }
    }

    fn down() -> WorkerLoad {
        WorkerLoad {
            outstanding: 0,
            available: false,
        }
    }

    #[test]
    fn least_loaded_picks_minimum() {
        let mut r = LeastLoaded::default();
        assert_eq!(r.select(&[load(3), load(1), load(2)]), Some(1));
    }

    #[test]
    fn least_loaded_rotates_ties() {
        let mut r = LeastLoaded::default();
        let loads = [load(0), load(0), load(0)];
        assert_eq!(r.select(&loads), Some(0));
        assert_eq!(r.select(&loads), Some(1));
        assert_eq!(r.select(&loads), Some(2));
        assert_eq!(r.select(&loads), Some(0));
    }

    #[test]
    fn unavailable_workers_are_skipped() {
        let loads = [down(), load(5), down()];
        assert_eq!(LeastLoaded::default().select(&loads), Some(1));
        assert_eq!(RoundRobin::default().select(&loads), Some(1));
        assert_eq!(Random.select(&loads), Some(1));
    }

    #[test]
    fn nothing_available_yields_none() {
        let loads = [down(), down()];
        assert_eq!(LeastLoaded::default().select(&loads), None);
        assert_eq!(RoundRobin::default().select(&loads), None);
        assert_eq!(Random.select(&loads), None);
        assert_eq!(LeastLoaded::default().select(&[]), None);
    }

    #[test]
    fn round_robin_ignores_load() {
        let mut r = RoundRobin::default();
        let loads = [load(9), load(0)];
        assert_eq!(r.select(&loads), Some(0));
        assert_eq!(r.select(&loads), Some(1));
        assert_eq!(r.select(&loads), Some(0));
    }
}
