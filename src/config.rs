//! # Coffee house configuration.
//!
//! [`HouseConfig`] gathers every tunable of the house. All fields have
//! documented defaults; a TOML document only needs the keys it changes.
//! Durations are written in milliseconds.
//!
//! ```toml
//! caffeine-limit = 3
//!
//! [barista]
//! prepare-duration = 200   # ms
//! prepare-jitter = 100     # ms, uniform extra latency
//! accuracy = 100           # percent of correct coffees
//! max-failures = 0         # wrong coffees in a row a barista tolerates (0 = never faults)
//!
//! [waiter]
//! max-complaint-count = 2
//! max-restarts = 10
//! restart-window = 60000
//!
//! [guest]
//! finish-duration = 200
//! perseverance = 2
//!
//! [pool]
//! min-size = 2
//! max-size = 4
//! router = "least-loaded"  # or "round-robin", "random"
//!
//! [monitor]
//! interval = 500
//! high-water-mark = 5
//! consecutive-samples = 3
//!
//! [overload]
//! policy = "report-only"   # or "grow-pool", "shed-load"
//! grow-step = 1
//!
//! [runtime]
//! grace = 5000
//! bus-capacity = 1024
//! restart-backoff-first = 10
//! restart-backoff-max = 1000
//! restart-backoff-factor = 2.0
//! restart-jitter = "none"  # or "full", "equal"
//! ```
//!
//! ## Sentinel values
//! - `barista.max-failures = 0` disables worker faults.
//! - `waiter.max-restarts = 0` escalates on the first waiter fault.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::ConfigError;
use crate::policies::{BackoffPolicy, JitterPolicy, OverloadPolicy, RestartLimit, RouterKind};

fn millis<'de, D: Deserializer<'de>>(de: D) -> Result<Duration, D::Error> {
    u64::deserialize(de).map(Duration::from_millis)
}

/// Full configuration of a coffee house.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct HouseConfig {
    /// Default number of coffees a guest may drink.
    pub caffeine_limit: u32,
    /// Barista behavior.
    pub barista: BaristaConfig,
    /// Waiter thresholds.
    pub waiter: WaiterConfig,
    /// Guest behavior.
    pub guest: GuestConfig,
    /// Pool sizing and routing.
    pub pool: PoolConfig,
    /// Bottleneck monitor.
    pub monitor: MonitorConfig,
    /// Reaction to overload.
    pub overload: OverloadConfig,
    /// Runtime settings.
    pub runtime: RuntimeConfig,
}

impl Default for HouseConfig {
    /// `caffeine-limit = 3`; every section at its own defaults.
    fn default() -> Self {
        Self {
            caffeine_limit: 3,
            barista: BaristaConfig::default(),
            waiter: WaiterConfig::default(),
            guest: GuestConfig::default(),
            pool: PoolConfig::default(),
            monitor: MonitorConfig::default(),
            overload: OverloadConfig::default(),
            runtime: RuntimeConfig::default(),
        }
    }
}

impl HouseConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: HouseConfig = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(key: &'static str, reason: impl Into<String>) -> Result<(), ConfigError> {
            Err(ConfigError::Invalid {
                key,
                reason: reason.into(),
            })
        }

        if self.caffeine_limit == 0 {
            return invalid("caffeine-limit", "must be at least 1");
        }
        if self.barista.accuracy > 100 {
            return invalid("barista.accuracy", format!("{} is above 100", self.barista.accuracy));
        }
        if self.pool.min_size == 0 {
            return invalid("pool.min-size", "must be at least 1");
        }
        if self.pool.max_size < self.pool.min_size {
            return invalid(
                "pool.max-size",
                format!("{} is below min-size {}", self.pool.max_size, self.pool.min_size),
            );
        }
        if self.monitor.interval.is_zero() {
            return invalid("monitor.interval", "must be non-zero");
        }
        if self.monitor.consecutive_samples == 0 {
            return invalid("monitor.consecutive-samples", "must be at least 1");
        }
        if self.waiter.restart_window.is_zero() {
            return invalid("waiter.restart-window", "must be non-zero");
        }
        if !(self.runtime.restart_backoff_factor.is_finite() && self.runtime.restart_backoff_factor >= 1.0) {
            return invalid("runtime.restart-backoff-factor", "must be a finite number >= 1.0");
        }
        Ok(())
    }
}

/// Barista settings.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct BaristaConfig {
    /// Base preparation latency.
    #[serde(deserialize_with = "millis")]
    pub prepare_duration: Duration,
    /// Upper bound of the uniform extra latency.
    #[serde(deserialize_with = "millis")]
    pub prepare_jitter: Duration,
    /// Success probability in percent.
    pub accuracy: u8,
    /// Wrong coffees in a row the barista tolerates; one more faults it (`0` = never).
    pub max_failures: u32,
}

impl Default for BaristaConfig {
    /// `200ms` + up to `100ms`, always accurate, never faults.
    fn default() -> Self {
        Self {
            prepare_duration: Duration::from_millis(200),
            prepare_jitter: Duration::from_millis(100),
            accuracy: 100,
            max_failures: 0,
        }
    }
}

/// Waiter settings.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct WaiterConfig {
    /// Consecutive failed orders per guest tolerated before the waiter faults.
    pub max_complaint_count: u32,
    /// Restarts allowed within `restart-window`.
    pub max_restarts: u32,
    /// Window of the restart bound.
    #[serde(deserialize_with = "millis")]
    pub restart_window: Duration,
}

impl Default for WaiterConfig {
    /// 2 complaints; at most 10 restarts per minute.
    fn default() -> Self {
        Self {
            max_complaint_count: 2,
            max_restarts: 10,
            restart_window: Duration::from_secs(60),
        }
    }
}

impl WaiterConfig {
    /// Restart bound as a policy value.
    pub fn restart_limit(&self) -> RestartLimit {
        RestartLimit::new(self.max_restarts, self.restart_window)
    }
}

/// Guest settings.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct GuestConfig {
    /// Time spent drinking one coffee.
    #[serde(deserialize_with = "millis")]
    pub finish_duration: Duration,
    /// Failed orders tolerated in a row before giving up.
    pub perseverance: u32,
}

impl Default for GuestConfig {
    /// `200ms` per coffee, perseverance 2.
    fn default() -> Self {
        Self {
            finish_duration: Duration::from_millis(200),
            perseverance: 2,
        }
    }
}

/// Barista pool settings.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct PoolConfig {
    /// Workers started with the pool.
    pub min_size: usize,
    /// Growth cap.
    pub max_size: usize,
    /// Routing strategy.
    pub router: RouterKind,
}

impl Default for PoolConfig {
    /// 2 to 4 workers, least-loaded routing.
    fn default() -> Self {
        Self {
            min_size: 2,
            max_size: 4,
            router: RouterKind::LeastLoaded,
        }
    }
}

/// Bottleneck monitor settings.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct MonitorConfig {
    /// Sampling period.
    #[serde(deserialize_with = "millis")]
    pub interval: Duration,
    /// Outstanding tickets above which a sample counts as overloaded.
    pub high_water_mark: usize,
    /// Overloaded samples in a row before reporting.
    pub consecutive_samples: u32,
}

impl Default for MonitorConfig {
    /// Every `500ms`; more than 5 outstanding for 3 samples.
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            high_water_mark: 5,
            consecutive_samples: 3,
        }
    }
}

/// Overload reaction settings.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct OverloadConfig {
    /// What the House does on a report.
    pub policy: OverloadPolicy,
    /// Workers added per report under `grow-pool`.
    pub grow_step: usize,
}

impl Default for OverloadConfig {
    /// Report only; grow by one.
    fn default() -> Self {
        Self {
            policy: OverloadPolicy::ReportOnly,
            grow_step: 1,
        }
    }
}

/// Runtime settings.
///
/// ## Field semantics
/// - `grace`: maximum wait for a graceful shutdown before force-terminating
/// - `bus_capacity`: event ring size; lagging receivers skip older events (min 1)
/// - `restart_backoff_*`, `restart_jitter`: delay before a restarted process gets fresh state
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Shutdown grace period.
    #[serde(deserialize_with = "millis")]
    pub grace: Duration,
    /// Event bus capacity.
    pub bus_capacity: usize,
    /// First restart delay.
    #[serde(deserialize_with = "millis")]
    pub restart_backoff_first: Duration,
    /// Restart delay cap.
    #[serde(deserialize_with = "millis")]
    pub restart_backoff_max: Duration,
    /// Restart delay growth factor.
    pub restart_backoff_factor: f64,
    /// Restart delay jitter.
    pub restart_jitter: JitterPolicy,
}

impl Default for RuntimeConfig {
    /// - `grace = 5s`
    /// - `bus_capacity = 1024`
    /// - restart backoff `10ms`, doubling, capped at `1s`, no jitter
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(5),
            bus_capacity: 1024,
            restart_backoff_first: Duration::from_millis(10),
            restart_backoff_max: Duration::from_secs(1),
            restart_backoff_factor: 2.0,
            restart_jitter: JitterPolicy::None,
        }
    }
}

impl RuntimeConfig {
    /// Restart backoff as a policy value.
    pub fn restart_backoff(&self) -> BackoffPolicy {
        BackoffPolicy {
            first: self.restart_backoff_first,
            max: self.restart_backoff_max,
            factor: self.restart_backoff_factor,
            jitter: self.restart_jitter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let cfg = HouseConfig::from_toml_str("").expect("defaults are valid");
        assert_eq!(cfg, HouseConfig::default());
        assert_eq!(cfg.waiter.restart_limit(), RestartLimit::new(10, Duration::from_secs(60)));
    }

    #[test]
    fn partial_document_overrides_keys() {
        let cfg = HouseConfig::from_toml_str(
            r#"
            caffeine-limit = 5

            [barista]
            accuracy = 40
            prepare-duration = 50

            [pool]
            router = "round-robin"

            [overload]
            policy = "grow-pool"
            "#,
        )
        .expect("valid");

        assert_eq!(cfg.caffeine_limit, 5);
        assert_eq!(cfg.barista.accuracy, 40);
        assert_eq!(cfg.barista.prepare_duration, Duration::from_millis(50));
        assert_eq!(cfg.barista.prepare_jitter, Duration::from_millis(100));
        assert_eq!(cfg.pool.router, RouterKind::RoundRobin);
        assert_eq!(cfg.overload.policy, OverloadPolicy::GrowPool);
    }

    #[test]
    fn unknown_key_is_a_parse_error() {
        let err = HouseConfig::from_toml_str("[pool]\nsize = 3\n").unwrap_err();
        assert_eq!(err.as_label(), "config_parse");
    }

    #[test]
    fn min_above_max_is_rejected() {
        let err = HouseConfig::from_toml_str("[pool]\nmin-size = 5\nmax-size = 2\n").unwrap_err();
        match err {
            ConfigError::Invalid { key, .. } => assert_eq!(key, "pool.max-size"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn accuracy_above_hundred_is_rejected() {
        let err = HouseConfig::from_toml_str("[barista]\naccuracy = 101\n").unwrap_err();
        assert_eq!(err.as_label(), "config_invalid");
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = HouseConfig::load("/nonexistent/coffeehouse.toml").unwrap_err();
        assert_eq!(err.as_label(), "config_read");
    }
}
