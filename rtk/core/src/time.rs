//! Time management types and utilities

use core::fmt;
use crate::{RtkError, RtkResult};

/// Countdown of system ticks, used for sleeping threads
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct SleepCounter(u32);

impl SleepCounter {
    /// Zero counter ("not sleeping")
    pub const ZERO: Self = Self(0);

    /// Create a new countdown
    pub const fn new(ticks: u32) -> Self {
        Self(ticks)
    }

    /// Get the remaining tick count
    pub const fn ticks(self) -> u32 {
        self.0
    }

    /// Check if the counter is zero
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Decrement the counter by one tick
    pub fn decrement(&mut self) -> bool {
        if self.0 > 0 {
            self.0 -= 1;
            self.0 == 0 // Return true if reached zero
        } else {
            false
        }
    }
}

impl fmt::Display for SleepCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ticks", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for SleepCounter {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{}ticks", self.0);
    }
}

/// Cycle-resolution timestamp inside one clock window
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Timestamp(u32);

impl Timestamp {
    /// Create a timestamp from a raw cycle count
    pub const fn from_cycles(cycles: u32) -> Self {
        Self(cycles)
    }

    /// Raw cycle count
    pub const fn cycles(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}cyc", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Timestamp {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{}cyc", self.0);
    }
}

/// Relation between bus cycles, milliseconds and the clock window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockScale {
    cycles_per_ms: u32,
    ms_wrap: u32,
}

impl ClockScale {
    /// Create a scale; the full window must be representable in 32 bits
    /// or [`RtkError::Overflow`] is returned
    pub fn new(cycles_per_ms: u32, ms_wrap: u32) -> RtkResult<Self> {
        if cycles_per_ms == 0 || ms_wrap == 0 {
            return Err(RtkError::InvalidClock);
        }
        cycles_per_ms
            .checked_mul(ms_wrap)
            .ok_or(RtkError::Overflow)?;
        Ok(Self {
            cycles_per_ms,
            ms_wrap,
        })
    }

    /// Bus cycles per millisecond
    pub const fn cycles_per_ms(self) -> u32 {
        self.cycles_per_ms
    }

    /// Milliseconds per clock window
    pub const fn ms_wrap(self) -> u32 {
        self.ms_wrap
    }

    /// Length of one clock window in cycles
    pub const fn window_cycles(self) -> u32 {
        self.cycles_per_ms * self.ms_wrap
    }

    /// Build a timestamp from the millisecond counter and the cycles
    /// elapsed inside the current millisecond
    pub fn timestamp(self, ms: u32, sub_ms_cycles: u32) -> Timestamp {
        let sub = sub_ms_cycles.min(self.cycles_per_ms - 1);
        Timestamp(ms % self.ms_wrap * self.cycles_per_ms + sub)
    }

    /// Elapsed cycles from `start` to `stop`, correcting one window wrap
    pub fn difference(self, start: Timestamp, stop: Timestamp) -> u32 {
        if start.0 > stop.0 {
            self.window_cycles() - (start.0 - stop.0)
        } else {
            stop.0 - start.0
        }
    }
}

/// Millisecond system clock driven by the periodic system tick
///
/// The millisecond counter wraps every `ms_wrap` ms; the window counter
/// records how many times it has wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemClock {
    ms: u32,
    windows: u32,
    ms_wrap: u32,
}

impl SystemClock {
    /// Create a cleared clock
    pub const fn new(ms_wrap: u32) -> Self {
        Self {
            ms: 0,
            windows: 0,
            ms_wrap,
        }
    }

    /// Advance by one millisecond
    pub fn tick(&mut self) {
        if self.ms + 1 >= self.ms_wrap {
            self.ms = 0;
            self.windows = self.windows.wrapping_add(1);
        } else {
            self.ms += 1;
        }
    }

    /// Milliseconds inside the current window
    pub const fn ms(&self) -> u32 {
        self.ms
    }

    /// Completed windows since the last clear
    pub const fn windows(&self) -> u32 {
        self.windows
    }

    /// Milliseconds since the last clear
    pub fn uptime_ms(&self) -> u64 {
        u64::from(self.windows) * u64::from(self.ms_wrap) + u64::from(self.ms)
    }

    /// Reset the clock to zero
    pub fn clear(&mut self) {
        self.ms = 0;
        self.windows = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sleep_counter_reaches_zero_once() {
        let mut ctr = SleepCounter::new(2);
        assert!(!ctr.decrement());
        assert!(ctr.decrement());
        assert!(!ctr.decrement());
        assert!(ctr.is_zero());
    }

    #[test]
    fn test_clock_wraps_window() {
        let mut clock = SystemClock::new(3);
        clock.tick();
        clock.tick();
        assert_eq!(clock.ms(), 2);
        clock.tick();
        assert_eq!(clock.ms(), 0);
        assert_eq!(clock.windows(), 1);
        assert_eq!(clock.uptime_ms(), 3);
    }

    #[test]
    fn test_scale_rejects_oversized_window() {
        assert_eq!(ClockScale::new(80_000, 1_000_000), Err(RtkError::Overflow));
        assert_eq!(ClockScale::new(0, 10), Err(RtkError::InvalidClock));
        assert!(ClockScale::new(80_000, 10_000).is_ok());
    }
}
