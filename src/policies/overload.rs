//! # Reaction to overload reports.
//!
//! The monitor only reports; the House decides what an overload means by
//! applying its configured [`OverloadPolicy`].

use serde::Deserialize;

/// What the House does when the monitor reports a sustained backlog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverloadPolicy {
    /// Log and publish; change nothing.
    #[default]
    ReportOnly,
    /// Ask the pool to add workers (capped at `pool.max-size`).
    GrowPool,
    /// Reject admissions until the overload clears.
    ShedLoad,
}

impl OverloadPolicy {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            OverloadPolicy::ReportOnly => "report_only",
            OverloadPolicy::GrowPool => "grow_pool",
            OverloadPolicy::ShedLoad => "shed_load",
        }
    }
}
