//! Brewing strategy: decides whether a barista gets an order right.
//!
//! The default is [`Accuracy`], driven by `barista.accuracy`. Any
//! `Fn(&str, Coffee) -> bool` closure is a strategy too, which makes the
//! failure pattern of a house fully scriptable:
//!
//! ```rust
//! use coffeehouse::{Brew, Coffee};
//!
//! let clumsy_first = |worker: &str, _coffee: Coffee| worker != "barista-1";
//! assert!(!clumsy_first.succeeds("barista-1", Coffee::Latte));
//! assert!(clumsy_first.succeeds("barista-2", Coffee::Latte));
//! ```

use rand::Rng;

use super::messages::Coffee;

/// Decides the outcome of one preparation.
pub trait Brew: Send + Sync + 'static {
    /// `true` if `worker` prepares `coffee` correctly.
    fn succeeds(&self, worker: &str, coffee: Coffee) -> bool;
}

/// Succeeds with the given probability in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accuracy(pub u8);

impl Brew for Accuracy {
    fn succeeds(&self, _worker: &str, _coffee: Coffee) -> bool {
        match self.0 {
            0 => false,
            p if p >= 100 => true,
            p => rand::rng().random_range(0..100u8) < p,
        }
    }
}

impl<F> Brew for F
where
    F: Fn(&str, Coffee) -> bool + Send + Sync + 'static,
{
    fn succeeds(&self, worker: &str, coffee: Coffee) -> bool {
        self(worker, coffee)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accuracy_bounds_are_deterministic() {
        for _ in 0..100 {
            assert!(Accuracy(100).succeeds("b", Coffee::Latte));
            assert!(!Accuracy(0).succeeds("b", Coffee::Latte));
        }
    }
}
