//! Glitch clock monitor
//!
//! The bus sampler timestamps every clock edge and keeps the shortest
//! interval it has seen. Intervals are stored in the 32 MHz timer counts
//! the decoders' glitch floors are expressed in.

use portable_atomic::{AtomicU16, Ordering};

use pocketlab_hal::ClockMonitor;

/// Timer counts per microsecond
pub const COUNTS_PER_US: u64 = 32;

/// Shortest clock interval since the last reset
pub static CLOCK: ClockState = ClockState::new();

pub struct ClockState {
    min_period: AtomicU16,
}

impl ClockState {
    pub const fn new() -> Self {
        Self {
            min_period: AtomicU16::new(u16::MAX),
        }
    }

    /// Record one interval between clock edges, in microseconds
    pub fn record_micros(&self, micros: u64) {
        let counts = micros.saturating_mul(COUNTS_PER_US).min(u16::MAX as u64) as u16;
        self.min_period.fetch_min(counts, Ordering::Relaxed);
    }
}

impl Default for ClockState {
    fn default() -> Self {
        Self::new()
    }
}

/// Foreground handle on [`CLOCK`]
#[derive(Debug, Default)]
pub struct GlitchClock;

impl GlitchClock {
    pub const fn new() -> Self {
        Self
    }
}

impl ClockMonitor for GlitchClock {
    fn min_period(&self) -> u16 {
        CLOCK.min_period.load(Ordering::Relaxed)
    }

    fn reset(&mut self) {
        CLOCK.min_period.store(u16::MAX, Ordering::Relaxed);
    }
}
