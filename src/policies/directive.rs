//! # Supervision directives and policy tables.
//!
//! A parent attaches a [`SupervisionPolicy`] to every child it spawns. When
//! the child's handler returns a [`Fault`](crate::Fault), the child's cell
//! looks up the fault's [`FaultKind`] in that table and applies the resulting
//! [`Directive`].
//!
//! ## Rules
//! - The first matching rule wins; unmatched kinds use the fallback.
//! - `Restart` is bounded by the optional [`RestartLimit`] and delayed by the
//!   [`BackoffPolicy`].
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use coffeehouse::{Directive, FaultKind, RestartLimit, SupervisionPolicy};
//!
//! let policy = SupervisionPolicy::new(Directive::Escalate)
//!     .on(FaultKind::RepeatedIntermediaryFailure, Directive::Restart)
//!     .with_limit(RestartLimit::new(10, Duration::from_secs(60)));
//!
//! assert_eq!(policy.directive_for(FaultKind::RepeatedIntermediaryFailure), Directive::Restart);
//! assert_eq!(policy.directive_for(FaultKind::Panicked), Directive::Escalate);
//! ```

use crate::error::FaultKind;

use super::backoff::BackoffPolicy;
use super::restart::RestartLimit;

/// What to do with a process whose handler faulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Directive {
    /// Keep the current state and process the next message.
    Resume,
    /// Replace the state with a fresh one from the factory.
    Restart,
    /// Terminate the process.
    Stop,
    /// Terminate the process and let the parent decide.
    Escalate,
}

impl Directive {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            Directive::Resume => "resume",
            Directive::Restart => "restart",
            Directive::Stop => "stop",
            Directive::Escalate => "escalate",
        }
    }
}

/// Fault-kind to directive table, plus restart bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct SupervisionPolicy {
    rules: Vec<(FaultKind, Directive)>,
    fallback: Directive,
    limit: Option<RestartLimit>,
    backoff: BackoffPolicy,
}

impl Default for SupervisionPolicy {
    /// Restarts on every fault, unbounded, with the default backoff.
    fn default() -> Self {
        Self::new(Directive::Restart)
    }
}

impl SupervisionPolicy {
    /// Creates a policy applying `fallback` to every fault kind.
    pub fn new(fallback: Directive) -> Self {
        Self {
            rules: Vec::new(),
            fallback,
            limit: None,
            backoff: BackoffPolicy::default(),
        }
    }

    /// Adds a rule for `kind`.
    pub fn on(mut self, kind: FaultKind, directive: Directive) -> Self {
        self.rules.push((kind, directive));
        self
    }

    /// Bounds restarts.
    pub fn with_limit(mut self, limit: RestartLimit) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the delay policy applied before each restart.
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Looks up the directive for `kind`.
    pub fn directive_for(&self, kind: FaultKind) -> Directive {
        self.rules
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, d)| *d)
            .unwrap_or(self.fallback)
    }

    /// Restart limit, if any.
    pub fn limit(&self) -> Option<RestartLimit> {
        self.limit
    }

    /// Restart backoff.
    pub fn backoff(&self) -> &BackoffPolicy {
        &self.backoff
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_rule_wins() {
        let policy = SupervisionPolicy::new(Directive::Stop)
            .on(FaultKind::TransientWork, Directive::Resume)
            .on(FaultKind::TransientWork, Directive::Restart);
        assert_eq!(policy.directive_for(FaultKind::TransientWork), Directive::Resume);
        assert_eq!(policy.directive_for(FaultKind::WorkerFatal), Directive::Stop);
    }

    #[test]
    fn default_restarts_without_limit() {
        let policy = SupervisionPolicy::default();
        assert_eq!(policy.directive_for(FaultKind::Panicked), Directive::Restart);
        assert!(policy.limit().is_none());
    }
}
