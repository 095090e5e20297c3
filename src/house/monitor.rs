//! Bottleneck monitor: samples the pool backlog on a fixed interval.
//!
//! ```text
//! every interval: Tick ──► Sample ──► Pool
//! Sampled { outstanding } > mark, K times in a row ──► Overload (once per breach)
//! Sampled { outstanding } ≤ mark after a report    ──► OverloadCleared
//! ```
//!
//! Overload is a signal to the House, never a fault.

use async_trait::async_trait;

use crate::config::MonitorConfig;
use crate::error::Fault;
use crate::events::{Event, EventKind};
use crate::runtime::{Addr, Context, Process};

use super::messages::{HouseMsg, MonitorMsg, OverloadReport, PoolMsg};

/// What a sample means for the current breach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verdict {
    Quiet,
    Overloaded(u32),
    Cleared,
}

/// Counts consecutive samples above the high-water mark.
#[derive(Debug, Default)]
pub(crate) struct Streak {
    above: u32,
    reported: bool,
}

impl Streak {
    pub(crate) fn observe(&mut self, outstanding: usize, mark: usize, needed: u32) -> Verdict {
        if outstanding <= mark {
            self.above = 0;
            return if std::mem::take(&mut self.reported) {
                Verdict::Cleared
            } else {
                Verdict::Quiet
            };
        }
        self.above = self.above.saturating_add(1);
        if !self.reported && self.above >= needed {
            self.reported = true;
            Verdict::Overloaded(self.above)
        } else {
            Verdict::Quiet
        }
    }
}

pub(crate) struct Monitor {
    cfg: MonitorConfig,
    pool: Addr<PoolMsg>,
    house: Addr<HouseMsg>,
    streak: Streak,
}

impl Monitor {
    pub(crate) fn new(cfg: MonitorConfig, pool: Addr<PoolMsg>, house: Addr<HouseMsg>) -> Self {
        Self {
            cfg,
            pool,
            house,
            streak: Streak::default(),
        }
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &Addr<PoolMsg> {
        &self.pool
    }
}

#[async_trait]
impl Process for Monitor {
    type Msg = MonitorMsg;

    async fn started(&mut self, ctx: &mut Context<Self>) -> Result<(), Fault> {
        ctx.schedule_repeat(MonitorMsg::Tick, self.cfg.interval);
        Ok(())
    }

    async fn handle(&mut self, ctx: &mut Context<Self>, msg: MonitorMsg) -> Result<(), Fault> {
        match msg {
            MonitorMsg::Tick => self.pool.send(PoolMsg::Sample {
                reply_to: ctx.addr(),
            }),
            MonitorMsg::Sampled { outstanding, size } => {
                match self
                    .streak
                    .observe(outstanding, self.cfg.high_water_mark, self.cfg.consecutive_samples)
                {
                    Verdict::Quiet => {}
                    Verdict::Overloaded(samples) => {
                        tracing::info!(outstanding, size, samples, "overload detected");
                        self.house.send(HouseMsg::Overload(OverloadReport {
                            outstanding,
                            size,
                            samples,
                        }));
                        ctx.publish(
                            Event::new(EventKind::OverloadDetected)
                                .with_process(ctx.name())
                                .with_count(outstanding as u64)
                                .with_attempt(samples),
                        );
                    }
                    Verdict::Cleared => {
                        tracing::info!(outstanding, size, "overload cleared");
                        self.house.send(HouseMsg::OverloadCleared { outstanding });
                        ctx.publish(
                            Event::new(EventKind::OverloadCleared)
                                .with_process(ctx.name())
                                .with_count(outstanding as u64),
                        );
                    }
                }
            }
            MonitorMsg::PoolChanged(pool) => self.pool = pool,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_once_per_breach() {
        let mut streak = Streak::default();
        assert_eq!(streak.observe(6, 5, 3), Verdict::Quiet);
        assert_eq!(streak.observe(7, 5, 3), Verdict::Quiet);
        assert_eq!(streak.observe(8, 5, 3), Verdict::Overloaded(3));
        assert_eq!(streak.observe(9, 5, 3), Verdict::Quiet);
        assert_eq!(streak.observe(5, 5, 3), Verdict::Cleared);
        assert_eq!(streak.observe(0, 5, 3), Verdict::Quiet);
    }

    #[test]
    fn dip_below_mark_restarts_the_count() {
        let mut streak = Streak::default();
        streak.observe(6, 5, 2);
        assert_eq!(streak.observe(1, 5, 2), Verdict::Quiet);
        assert_eq!(streak.observe(6, 5, 2), Verdict::Quiet);
        assert_eq!(streak.observe(6, 5, 2), Verdict::Overloaded(2));
    }
}
