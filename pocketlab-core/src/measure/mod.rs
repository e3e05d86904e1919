//! Counter-based measurements
//!
//! The frequency meter counts input edges per RTC tick and falls back to
//! averaged input periods below the counting range; the charge meter
//! integrates the ammeter stream over time.

pub mod charge;
pub mod freq;

pub use charge::{ChargeMeter, Elapsed, CALIBRATION_SECONDS};
pub use freq::{FrequencyEngine, PeriodAverager, PERIOD_READ_MS, TICK_RATE};

/// Averaged input period, delivered every [`PERIOD_READ_MS`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PeriodReading {
    /// Average period in microseconds
    Valid(u16),
    /// Periods were captured but are too short to beat edge counting
    Unchanged,
    /// Fewer than two periods were captured
    Missing,
}
