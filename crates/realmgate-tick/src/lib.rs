//! Fixed-rate maintenance tick for Realmgate server roles.
//!
//! Server roles have housekeeping that runs on a clock rather than in
//! response to a message, mostly evicting stale reconnect claims. A
//! [`TickScheduler`] fires at a configured rate and is meant to sit in a
//! `tokio::select!` loop next to a shutdown signal:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         _ = shutdown.changed() => break,
//!         tick = scheduler.wait_for_tick() => {
//!             handler.lock().await.sweep(tick.at);
//!         }
//!     }
//! }
//! ```
//!
//! A rate of 0 disables the tick; `wait_for_tick` then pends forever.

mod config;

use std::time::Duration;

use rand::Rng;
use tokio::time::{self, Instant};

pub use config::{TickConfig, TickPolicy};

/// Returned by [`TickScheduler::wait_for_tick`].
#[derive(Debug, Clone)]
pub struct TickInfo {
    /// 1 for the first tick.
    pub tick: u64,
    /// When the tick fired, read from the runtime clock. Sweeps should use
    /// this rather than `Instant::now()` so paused-time tests stay
    /// deterministic.
    pub at: std::time::Instant,
    /// How far past its deadline the tick fired.
    pub late_by: Duration,
    /// Whole periods dropped under [`TickPolicy::Skip`].
    pub ticks_skipped: u64,
}

#[derive(Debug, Clone, Copy)]
enum Schedule {
    Disabled,
    Running { period: Duration, deadline: Instant },
    Paused { period: Duration },
}

#[derive(Debug)]
pub struct TickScheduler {
    config: TickConfig,
    schedule: Schedule,
    fired: u64,
}

impl TickScheduler {
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        let schedule = match config.tick_duration() {
            None => {
                tracing::debug!("sweep tick disabled");
                Schedule::Disabled
            }
            Some(period) => {
                let jitter = match config.initial_jitter_us {
                    0 => Duration::ZERO,
                    max => Duration::from_micros(rand::rng().random_range(0..max)),
                };
                tracing::debug!(
                    rate_hz = config.tick_rate_hz,
                    period_ms = period.as_millis() as u64,
                    policy = ?config.policy,
                    "sweep tick scheduled"
                );
                Schedule::Running {
                    period,
                    deadline: Instant::now() + period + jitter,
                }
            }
        };

        Self {
            config,
            schedule,
            fired: 0,
        }
    }

    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self::new(TickConfig::with_rate(tick_rate_hz))
    }

    /// Waits for the next tick.
    ///
    /// Pends forever while disabled or paused, so a `select!` around it
    /// keeps serving its other branches.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let Schedule::Running { period, deadline } = self.schedule else {
            return std::future::pending().await;
        };

        time::sleep_until(deadline).await;

        let fired_at = Instant::now();
        self.fired += 1;
        let late_by = fired_at.saturating_duration_since(deadline);
        let missed = (late_by.as_nanos() / period.as_nanos()) as u64;

        let (next, ticks_skipped) = match self.config.policy {
            TickPolicy::Skip => (fired_at + period, missed),
            TickPolicy::Drop => (deadline + period, 0),
        };
        if missed > 0 {
            tracing::warn!(
                tick = self.fired,
                missed,
                policy = ?self.config.policy,
                "sweep tick fell behind"
            );
        }
        self.schedule = Schedule::Running {
            period,
            deadline: next,
        };

        tracing::trace!(tick = self.fired, "tick");
        TickInfo {
            tick: self.fired,
            at: fired_at.into_std(),
            late_by,
            ticks_skipped,
        }
    }

    /// Stops ticking until [`resume`](Self::resume). Idempotent.
    pub fn pause(&mut self) {
        if let Schedule::Running { period, .. } = self.schedule {
            self.schedule = Schedule::Paused { period };
            tracing::debug!(tick = self.fired, "sweep tick paused");
        }
    }

    /// The next tick comes one full period from now; time spent paused is
    /// not made up.
    pub fn resume(&mut self) {
        if let Schedule::Paused { period } = self.schedule {
            self.schedule = Schedule::Running {
                period,
                deadline: Instant::now() + period,
            };
            tracing::debug!(tick = self.fired, "sweep tick resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.schedule, Schedule::Paused { .. })
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self.schedule, Schedule::Disabled)
    }

    pub fn tick_count(&self) -> u64 {
        self.fired
    }

    pub fn tick_rate_hz(&self) -> u32 {
        self.config.tick_rate_hz
    }

    pub fn tick_duration(&self) -> Option<Duration> {
        match self.schedule {
            Schedule::Disabled => None,
            Schedule::Running { period, .. } | Schedule::Paused { period } => Some(period),
        }
    }
}
