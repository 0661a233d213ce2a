use std::time::Duration;

/// What to do when the sweep loop falls behind, i.e. the previous tick's
/// work ran past one or more deadlines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TickPolicy {
    /// Forget the missed deadlines and count the next period from now.
    #[default]
    Skip,
    /// Keep the original cadence. Missed deadlines fire back to back.
    Drop,
}

#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Ticks per second. 0 disables the tick.
    pub tick_rate_hz: u32,
    pub policy: TickPolicy,
    /// Upper bound (µs) of a random delay added to the first tick, so
    /// roles started together don't sweep in lockstep.
    pub initial_jitter_us: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 1,
            policy: TickPolicy::Skip,
            initial_jitter_us: 100_000,
        }
    }
}

impl TickConfig {
    pub const MAX_TICK_RATE_HZ: u32 = 100;

    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self {
            tick_rate_hz,
            ..Self::default()
        }
    }

    /// Clamps the rate to [`Self::MAX_TICK_RATE_HZ`].
    pub fn validated(self) -> Self {
        let max = Self::MAX_TICK_RATE_HZ;
        if self.tick_rate_hz <= max {
            return self;
        }
        tracing::warn!(rate = self.tick_rate_hz, max, "sweep rate too high, clamping");
        Self {
            tick_rate_hz: max,
            ..self
        }
    }

    /// Time between ticks, or `None` when the tick is disabled.
    pub fn tick_duration(&self) -> Option<Duration> {
        match self.tick_rate_hz {
            0 => None,
            hz => Some(Duration::from_secs(1) / hz),
        }
    }
}
