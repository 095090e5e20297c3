//! Error types used by the process runtime and the coffee house.
//!
//! This module defines three enums:
//!
//! - [`Fault`]: a failure returned by a process while handling a message.
//!   Faults are values; the parent's [`SupervisionPolicy`](crate::SupervisionPolicy)
//!   maps their [`FaultKind`] to a [`Directive`](crate::Directive).
//! - [`RuntimeError`]: failures of the runtime itself (shutdown, closed house).
//! - [`ConfigError`]: configuration loading and validation failures.
//!
//! All of them provide `as_label` for logs/metrics.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Classification of a [`Fault`], used as the key of supervision policy tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// A single work ticket failed.
    TransientWork,
    /// The waiter saw too many failures for one guest.
    RepeatedIntermediaryFailure,
    /// A barista broke an internal invariant (too many failures in a row).
    WorkerFatal,
    /// A guest attempted something that would break its consumption invariant.
    ClientSafety,
    /// A guest ran out of perseverance after repeated failed orders.
    ClientPerseverance,
    /// A handler panicked.
    Panicked,
    /// A child escalated a fault its parent could not resolve.
    ChildEscalated,
}

/// # Failure reported by a process handler.
///
/// Returned as `Err(fault)` from a [`Process`](crate::Process) hook and
/// interpreted by the supervision policy the parent attached to that process.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// One ticket failed (wrong coffee, worker gone).
    ///
    /// The house's own processes carry single-ticket failures as
    /// [`Outcome`](crate::Outcome) values and never return this; it is the
    /// fault kind for policy tables and user processes that want one failed
    /// unit of work to be resumable.
    #[error("ticket {ticket} failed: {reason}")]
    TransientWork {
        /// Ticket id.
        ticket: u64,
        /// What went wrong.
        reason: String,
    },

    /// The waiter exceeded its complaint threshold for a guest.
    #[error("{guest} complained {complaints} times in a row (limit {limit})")]
    RepeatedIntermediaryFailure {
        /// Guest whose orders kept failing.
        guest: String,
        /// Consecutive complaints seen.
        complaints: u32,
        /// Configured threshold.
        limit: u32,
    },

    /// A worker failed too many tickets in a row.
    #[error("{worker} failed {failures} orders in a row")]
    WorkerFatal {
        /// Worker name.
        worker: String,
        /// Consecutive failures.
        failures: u32,
    },

    /// A guest tried to break its consumption limit.
    #[error("{guest} violated its caffeine limit: {reason}")]
    ClientSafety {
        /// Guest name.
        guest: String,
        /// Details.
        reason: String,
    },

    /// A guest gave up after its perseverance budget was spent.
    #[error("{guest} gave up after {attempts} failed orders")]
    ClientPerseverance {
        /// Guest name.
        guest: String,
        /// Failed attempts, including the first one.
        attempts: u32,
    },

    /// A handler panicked; the panic was caught by the runtime.
    #[error("handler panicked: {info}")]
    Panicked {
        /// Panic payload, if it was a string.
        info: String,
    },

    /// A child terminated with a fault its parent does not handle.
    #[error("child {child} escalated: {reason}")]
    ChildEscalated {
        /// Child name.
        child: String,
        /// The child's fault, rendered.
        reason: String,
    },
}

impl Fault {
    /// Returns the policy key of this fault.
    pub fn kind(&self) -> FaultKind {
        match self {
            Fault::TransientWork { .. } => FaultKind::TransientWork,
            Fault::RepeatedIntermediaryFailure { .. } => FaultKind::RepeatedIntermediaryFailure,
            Fault::WorkerFatal { .. } => FaultKind::WorkerFatal,
            Fault::ClientSafety { .. } => FaultKind::ClientSafety,
            Fault::ClientPerseverance { .. } => FaultKind::ClientPerseverance,
            Fault::Panicked { .. } => FaultKind::Panicked,
            Fault::ChildEscalated { .. } => FaultKind::ChildEscalated,
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use coffeehouse::Fault;
    ///
    /// let fault = Fault::WorkerFatal { worker: "barista-1".into(), failures: 3 };
    /// assert_eq!(fault.as_label(), "worker_fatal");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            Fault::TransientWork { .. } => "transient_work",
            Fault::RepeatedIntermediaryFailure { .. } => "repeated_intermediary_failure",
            Fault::WorkerFatal { .. } => "worker_fatal",
            Fault::ClientSafety { .. } => "client_safety",
            Fault::ClientPerseverance { .. } => "client_perseverance",
            Fault::Panicked { .. } => "panicked",
            Fault::ChildEscalated { .. } => "child_escalated",
        }
    }

    /// `true` for faults that concern a single unit of work.
    pub fn is_transient(&self) -> bool {
        matches!(self, Fault::TransientWork { .. })
    }
}

/// # Errors produced by the runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; the listed processes were force-terminated.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}; forcing termination")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Processes still alive when the grace period ran out.
        stuck: Vec<String>,
    },

    /// The target process is gone and cannot answer.
    #[error("{process} is closed")]
    Closed {
        /// Name of the process that did not answer.
        process: String,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::Closed { .. } => "runtime_closed",
        }
    }
}

/// # Errors produced while loading configuration.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid TOML or has unknown keys.
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid value for `{key}`: {reason}")]
    Invalid {
        /// Dotted key, e.g. `pool.max-size`.
        key: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::Read { .. } => "config_read",
            ConfigError::Parse(_) => "config_parse",
            ConfigError::Invalid { .. } => "config_invalid",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_kind_matches_variant() {
        let fault = Fault::ClientPerseverance {
            guest: "guest-1".into(),
            attempts: 3,
        };
        assert_eq!(fault.kind(), FaultKind::ClientPerseverance);
        assert_eq!(fault.to_string(), "guest-1 gave up after 3 failed orders");
        assert!(!fault.is_transient());
    }

    #[test]
    fn transient_work_is_transient() {
        let fault = Fault::TransientWork {
            ticket: 7,
            reason: "wrong coffee".into(),
        };
        assert!(fault.is_transient());
        assert_eq!(fault.as_label(), "transient_work");
    }
}
