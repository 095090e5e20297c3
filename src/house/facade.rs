//! # CoffeeHouse: the public handle.
//!
//! Owns the [`System`] and the House root address. Commands are
//! fire-and-forget; queries are answered through a oneshot.
//!
//! # Example
//! ```rust,no_run
//! use coffeehouse::{Coffee, CoffeeHouse, HouseConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let house = CoffeeHouse::open(HouseConfig::default())?;
//! house.admit_default(3, Coffee::Latte);
//!
//! let status = house.status().await?;
//! println!("{} guests inside", status.active_guests);
//!
//! house.shutdown().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tokio::sync::{broadcast, oneshot};

use crate::config::HouseConfig;
use crate::error::{ConfigError, RuntimeError};
use crate::events::{Bus, Event};
use crate::runtime::{Addr, System, wait_for_shutdown_signal};
use crate::subscribers::Subscribe;

use super::brew::{Accuracy, Brew};
use super::house::House;
use super::messages::{Coffee, HouseMsg, HouseStatus, PoolStats};

/// Builder for [`CoffeeHouse`].
pub struct CoffeeHouseBuilder {
    cfg: HouseConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
    brew: Option<Arc<dyn Brew>>,
}

impl CoffeeHouseBuilder {
    /// Adds event subscribers.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers.extend(subscribers);
        self
    }

    /// Replaces the default [`Accuracy`] brewing strategy.
    pub fn with_brew(mut self, brew: impl Brew) -> Self {
        self.brew = Some(Arc::new(brew));
        self
    }

    /// Validates the configuration and opens the house. Requires a tokio runtime.
    pub fn build(self) -> Result<CoffeeHouse, ConfigError> {
        self.cfg.validate()?;
        let cfg = Arc::new(self.cfg);
        let brew = match self.brew {
            Some(brew) => brew,
            None => Arc::new(Accuracy(cfg.barista.accuracy)),
        };

        let system = System::new(&cfg.runtime, self.subscribers);
        let house = system.spawn_root(House::spec(Arc::clone(&cfg), brew));
        Ok(CoffeeHouse { system, house, cfg })
    }
}

/// A running coffee house.
pub struct CoffeeHouse {
    system: System,
    house: Addr<HouseMsg>,
    cfg: Arc<HouseConfig>,
}

impl CoffeeHouse {
    /// Opens a house with default subscribers (none) and brewing.
    pub fn open(cfg: HouseConfig) -> Result<Self, ConfigError> {
        Self::builder(cfg).build()
    }

    /// Starts building a house.
    pub fn builder(cfg: HouseConfig) -> CoffeeHouseBuilder {
        CoffeeHouseBuilder {
            cfg,
            subscribers: Vec::new(),
            brew: None,
        }
    }

    /// Admits `count` guests ordering `coffee`. `limit` overrides `caffeine-limit`.
    pub fn admit(&self, count: usize, coffee: Coffee, limit: Option<u32>) {
        self.house.send(HouseMsg::Admit {
            count,
            coffee,
            limit,
        });
    }

    /// Admits `count` guests with the default caffeine limit.
    pub fn admit_default(&self, count: usize, coffee: Coffee) {
        self.admit(count, coffee, None);
    }

    /// Current guests, consumption and pool size.
    pub async fn status(&self) -> Result<HouseStatus, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.house.send(HouseMsg::Status(tx));
        rx.await.map_err(|_| self.closed())
    }

    /// Current worker loads.
    pub async fn pool_stats(&self) -> Result<PoolStats, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.house.send(HouseMsg::PoolStats(tx));
        rx.await.map_err(|_| self.closed())
    }

    /// Event bus of the house.
    pub fn bus(&self) -> &Bus {
        self.system.bus()
    }

    /// Receiver for events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.system.bus().subscribe()
    }

    /// Effective configuration.
    pub fn config(&self) -> &HouseConfig {
        &self.cfg
    }

    /// Sorted names of live processes.
    pub async fn alive(&self) -> Vec<String> {
        self.system.alive().await
    }

    /// Stops every process gracefully within `runtime.grace`.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.system.shutdown().await
    }

    /// Waits for an OS termination signal, then shuts down.
    pub async fn run_until_signal(&self) -> Result<(), RuntimeError> {
        if let Err(e) = wait_for_shutdown_signal().await {
            tracing::warn!(error = %e, "signal handler failed, shutting down");
        }
        self.shutdown().await
    }

    fn closed(&self) -> RuntimeError {
        RuntimeError::Closed {
            process: self.house.pid().name().to_string(),
        }
    }
}
