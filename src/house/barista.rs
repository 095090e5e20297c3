//! Barista: prepares tickets one at a time, in arrival order.
//!
//! Preparation is a self-scheduled `Ready` timer of
//! `prepare-duration + uniform[0, prepare-jitter]`. The [`Brew`] strategy
//! decides the outcome, which always goes back to the pool before anything
//! else happens. With `max-failures = N > 0`, the barista tolerates N wrong
//! coffees in a row; the next one faults it with [`Fault::WorkerFatal`].
//!
//! Every incarnation announces itself with `WorkerReady` from `started`, so
//! the pool sees it only after the previous incarnation's last `Completed`.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use crate::config::BaristaConfig;
use crate::error::Fault;
use crate::runtime::{Addr, Context, Process};

use super::brew::Brew;
use super::messages::{BaristaMsg, Coffee, Outcome, PoolMsg};

pub(crate) struct Barista {
    name: Arc<str>,
    pool: Addr<PoolMsg>,
    brew: Arc<dyn Brew>,
    cfg: BaristaConfig,
    queue: VecDeque<(u64, Coffee)>,
    current: Option<(u64, Coffee)>,
    failures: u32,
}

impl Barista {
    pub(crate) fn new(name: Arc<str>, pool: Addr<PoolMsg>, brew: Arc<dyn Brew>, cfg: BaristaConfig) -> Self {
        Self {
            name,
            pool,
            brew,
            cfg,
            queue: VecDeque::new(),
            current: None,
            failures: 0,
        }
    }

    fn prepare_time(&self) -> Duration {
        let jitter = self.cfg.prepare_jitter;
        let extra = if jitter.is_zero() {
            Duration::ZERO
        } else {
            rand::rng().random_range(Duration::ZERO..=jitter)
        };
        self.cfg.prepare_duration.saturating_add(extra)
    }

    /// Whether the current run of wrong coffees is past the tolerated count.
    fn is_fatal(&self) -> bool {
        self.cfg.max_failures > 0 && self.failures > self.cfg.max_failures
    }

    fn start_next(&mut self, ctx: &mut Context<Self>) {
        if self.current.is_some() {
            return;
        }
        if let Some(next) = self.queue.pop_front() {
            self.current = Some(next);
            let delay = self.prepare_time();
            ctx.schedule_once(BaristaMsg::Ready, delay);
        }
    }
}

#[async_trait]
impl Process for Barista {
    type Msg = BaristaMsg;

    async fn started(&mut self, ctx: &mut Context<Self>) -> Result<(), Fault> {
        self.pool.send(PoolMsg::WorkerReady {
            worker: ctx.pid().id(),
        });
        Ok(())
    }

    async fn handle(&mut self, ctx: &mut Context<Self>, msg: BaristaMsg) -> Result<(), Fault> {
        match msg {
            BaristaMsg::Prepare { ticket, coffee } => {
                self.queue.push_back((ticket, coffee));
                self.start_next(ctx);
            }
            BaristaMsg::Ready => {
                let Some((ticket, coffee)) = self.current.take() else {
                    return Ok(());
                };
                let outcome = if self.brew.succeeds(&self.name, coffee) {
                    self.failures = 0;
                    Outcome::Prepared(coffee)
                } else {
                    self.failures += 1;
                    Outcome::Wrong {
                        expected: coffee,
                        got: coffee.other(),
                    }
                };
                self.pool.send(PoolMsg::Completed {
                    worker: ctx.pid().id(),
                    ticket,
                    outcome,
                });

                if self.is_fatal() {
                    return Err(Fault::WorkerFatal {
                        worker: self.name.to_string(),
                        failures: self.failures,
                    });
                }
                self.start_next(ctx);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::events::Bus;
    use crate::runtime::Pid;

    fn barista(max_failures: u32, failures: u32) -> Barista {
        let (pid, _signals) = Pid::new(Arc::from("pool"), Bus::new(8), CancellationToken::new());
        let (tx, _rx) = mpsc::unbounded_channel();
        let cfg = BaristaConfig {
            max_failures,
            ..BaristaConfig::default()
        };
        let brew = Arc::new(|_: &str, _: Coffee| true);
        let mut b = Barista::new(Arc::from("barista-1"), Addr::new(pid, tx), brew, cfg);
        b.failures = failures;
        b
    }

    #[test]
    fn tolerates_exactly_max_failures() {
        assert!(!barista(2, 1).is_fatal());
        assert!(!barista(2, 2).is_fatal());
        assert!(barista(2, 3).is_fatal());
    }

    #[test]
    fn zero_never_faults() {
        assert!(!barista(0, 1_000).is_fatal());
    }

    #[test]
    fn prepare_time_stays_within_jitter() {
        let mut b = barista(0, 0);
        b.cfg.prepare_duration = Duration::from_millis(10);
        b.cfg.prepare_jitter = Duration::from_millis(5);
        for _ in 0..100 {
            let t = b.prepare_time();
            assert!(t >= Duration::from_millis(10) && t <= Duration::from_millis(15), "{t:?}");
        }
        b.cfg.prepare_jitter = Duration::ZERO;
        assert_eq!(b.prepare_time(), Duration::from_millis(10));
    }
}
