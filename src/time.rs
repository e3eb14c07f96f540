//! Polled one-shot timers over a caller-supplied tick clock.

/// Monotonic tick count. The clock source is external; the core only ever
/// receives the current tick as a parameter.
pub type Ticks = u64;

/// Ticks per second.
pub const CLOCK_SECOND: Ticks = 100;

/// A one-shot timer. Expiry is polled against the current tick, never
/// event-driven, and restarting is idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timer {
    start: Ticks,
    interval: Ticks,
}

impl Timer {
    /// A timer that is expired from the beginning of time.
    pub const EXPIRED: Timer = Timer { start: 0, interval: 0 };

    pub fn set(now: Ticks, interval: Ticks) -> Timer {
        Timer { start: now, interval }
    }

    pub fn set_secs(now: Ticks, secs: u32) -> Timer {
        Timer::set(now, Ticks::from(secs) * CLOCK_SECOND)
    }

    pub fn set_msecs(now: Ticks, msecs: u32) -> Timer {
        Timer::set(now, Ticks::from(msecs) * CLOCK_SECOND / 1000)
    }

    /// Re-arms the timer with its current interval, counting from `now`.
    pub fn restart(&mut self, now: Ticks) {
        self.start = now;
    }

    /// Advances the timer by one interval without reference to `now`, so a
    /// late poll does not accumulate drift.
    pub fn advance(&mut self) {
        self.start += self.interval;
    }

    pub fn expired(&self, now: Ticks) -> bool {
        now.saturating_sub(self.start) >= self.interval
    }

    /// Ticks since the timer was last set or restarted.
    pub fn elapsed(&self, now: Ticks) -> Ticks {
        now.saturating_sub(self.start)
    }

    /// Ticks until expiry, saturating at zero.
    pub fn remaining(&self, now: Ticks) -> Ticks {
        self.interval.saturating_sub(self.elapsed(now))
    }
}
