use serde::Serialize;

/// Scheduler clock resolution (`USER_HZ`), used to turn jiffies into seconds.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct ClockTicks(u64);

impl ClockTicks {
    pub const FALLBACK: ClockTicks = ClockTicks(100);

    pub fn new(per_second: u64) -> Self {
        if per_second == 0 {
            Self::FALLBACK
        } else {
            ClockTicks(per_second)
        }
    }

    /// Queries `sysconf(_SC_CLK_TCK)`, falling back to 100 if it fails.
    pub fn from_system() -> Self {
        // SAFETY: sysconf has no preconditions and only reads configuration.
        let ticks = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
        if ticks > 0 {
            ClockTicks(ticks as u64)
        } else {
            tracing::warn!(ticks, "sysconf(_SC_CLK_TCK) failed, assuming 100");
            Self::FALLBACK
        }
    }

    pub fn per_second(self) -> u64 {
        self.0
    }

    pub fn to_seconds(self, ticks: u64) -> f64 {
        ticks as f64 / self.0 as f64
    }

    /// Whole seconds, truncated.
    pub fn whole_seconds(self, ticks: u64) -> u64 {
        ticks / self.0
    }
}

impl Default for ClockTicks {
    fn default() -> Self {
        Self::from_system()
    }
}
