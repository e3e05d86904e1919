//! Measurement modes
//!
//! Exactly one mode is active at a time. The [`Instrument`] owns it as an
//! [`ActiveMode`] variant and forwards the foreground poll, key releases
//! and timer events to it; a long press replaces the variant outright, so
//! no state survives a mode switch.
//!
//! Digital modes run the protocol decoders through a shared [`Terminal`];
//! analog modes accumulate chart windows from the ADC or capture stream.

use serde::{Deserialize, Serialize};

use pocketlab_hal::{Acquisition, Crossing, StorageKey};

use crate::buffer::Buffer;
use crate::config::{save_settings, SettingsBlock};
use crate::input::{Key, KeyEvent};
use crate::measure::PeriodReading;
use crate::traits::{Platform, SettingsError};

pub mod analog;
pub mod bus;
pub mod calibration;
pub mod charge;
pub mod frequency;
pub mod instrument;
pub mod page;
pub mod serial;
pub mod terminal;

pub use instrument::{ActiveMode, Instrument};
pub use terminal::Terminal;

/// Everything a mode may touch while it runs
pub struct Io<'a, P: Platform> {
    pub buffer: &'a Buffer,
    pub display: &'a mut P::Display,
    pub acquisition: &'a mut P::Acquisition,
    pub front_end: &'a mut P::FrontEnd,
    pub clock: &'a mut P::Clock,
    pub settings: &'a mut P::Settings,
}

/// Something that happened outside the foreground poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    Key(KeyEvent),
    /// Window comparator fired
    Comparator(Crossing),
    /// Windowed capture gave up waiting for the comparator
    TriggerTimeout,
    /// Result refresh interval elapsed
    ResultTick,
    /// One second elapsed
    SecondTick,
    /// Period averaging interval elapsed
    Period(PeriodReading),
}

/// Result refresh interval
pub const RESULT_REFRESH_MS: u64 = 250;

/// A measurement mode
pub trait Mode {
    /// Load settings and wire the acquisition hardware
    fn on_enter<P: Platform>(&mut self, io: &mut Io<'_, P>);

    /// Release the acquisition hardware
    fn on_exit<P: Platform>(&mut self, io: &mut Io<'_, P>) {
        io.acquisition.stop();
    }

    /// Consume pending samples, then render if a refresh is due
    fn drain_and_render<P: Platform>(&mut self, io: &mut Io<'_, P>);

    /// Handle a key release
    fn on_key<P: Platform>(&mut self, key: Key, io: &mut Io<'_, P>);

    /// Handle a timer or comparator event
    fn on_event<P: Platform>(&mut self, _event: Event, _io: &mut Io<'_, P>) {}
}

/// Write a settings block through the mode's store
pub(crate) fn persist<P: Platform, T: SettingsBlock>(
    io: &mut Io<'_, P>,
    key: StorageKey,
    settings: &T,
) -> Result<(), SettingsError> {
    save_settings(io.settings, key, settings)
}

/// Mode selectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModeId {
    Twi,
    Voltage,
    Current,
    Uart,
    OneWire,
    Spi,
    Usrt,
    Ircom,
    Frequency,
    Charge,
    VoltageCalibration,
    CurrentCalibration,
}

impl ModeId {
    /// Mode selected by a long press of `key`
    pub const fn from_key(key: Key) -> Option<Self> {
        Some(match key {
            Key::K1 => ModeId::Twi,
            Key::K2 => ModeId::Voltage,
            Key::K3 => ModeId::Current,
            Key::K4 => ModeId::Uart,
            Key::K12 => ModeId::OneWire,
            Key::K23 => ModeId::Spi,
            Key::K34 => ModeId::Usrt,
            Key::K14 => ModeId::Ircom,
            Key::K13 => ModeId::Frequency,
            Key::K24 => ModeId::Charge,
            Key::K134 => ModeId::VoltageCalibration,
            Key::K124 => ModeId::CurrentCalibration,
            Key::K123 | Key::K234 | Key::K1234 => return None,
        })
    }

    /// Whether the mode is restored at power-on
    pub const fn is_persistent(self) -> bool {
        !matches!(self, ModeId::VoltageCalibration | ModeId::CurrentCalibration)
    }

    pub const fn name(self) -> &'static str {
        match self {
            ModeId::Twi => "TWI",
            ModeId::Voltage => "VOLTAGE",
            ModeId::Current => "CURRENT",
            ModeId::Uart => "UART",
            ModeId::OneWire => "1-WIRE",
            ModeId::Spi => "SPI",
            ModeId::Usrt => "USRT",
            ModeId::Ircom => "IRCOM",
            ModeId::Frequency => "FREQ.",
            ModeId::Charge => "CHARGE",
            ModeId::VoltageCalibration => "VOLTAGE CALIB.",
            ModeId::CurrentCalibration => "CURRENT CALIB.",
        }
    }
}
