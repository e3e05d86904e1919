//! Settings block definitions

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use pocketlab_display::TextFormat;

use crate::chart::ChartSpeed;
use crate::decode::spi::{BitOrder, SelectLevel, SpiInput};
use crate::decode::uart::{BAUD_RATES, DEFAULT_BAUD_INDEX};
use crate::decode::{ClockEdge, FrameFormat, Parity};
use crate::mode::ModeId;

/// Largest trim offset, either sign
pub const OFFSET_RANGE: i16 = 100;

/// Gain trim at unity
pub const GAIN_MIDPOINT: u16 = 0x0800;

/// Largest gain deviation from [`GAIN_MIDPOINT`]
pub const GAIN_RANGE: u16 = 200;

/// A persisted settings block
pub trait SettingsBlock: Serialize + DeserializeOwned + Default + Copy + PartialEq {
    /// Reset out-of-range fields to their defaults
    ///
    /// Returns `true` if anything changed.
    fn validate(&mut self) -> bool;
}

/// Reset `field` to `default` unless `valid`
fn repair<T>(valid: bool, field: &mut T, default: T) -> bool {
    if valid {
        false
    } else {
        *field = default;
        true
    }
}

fn speed_within(speed: ChartSpeed, min: ChartSpeed, max: ChartSpeed) -> bool {
    ChartSpeed::new(speed.level()).is_some() && speed >= min && speed <= max
}

fn valid_baud(index: u8) -> bool {
    (index as usize) < BAUD_RATES.len()
}

fn valid_data_bits(bits: u8) -> bool {
    (FrameFormat::MIN_DATA_BITS..=FrameFormat::MAX_DATA_BITS).contains(&bits)
}

/// Asynchronous serial decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UartSettings {
    /// Index into [`BAUD_RATES`]
    pub baud: u8,
    pub data_bits: u8,
    pub parity: Parity,
    pub format: TextFormat,
}

impl Default for UartSettings {
    fn default() -> Self {
        Self {
            baud: DEFAULT_BAUD_INDEX,
            data_bits: 8,
            parity: Parity::None,
            format: TextFormat::Hex,
        }
    }
}

impl UartSettings {
    pub fn baud_rate(&self) -> u32 {
        BAUD_RATES[self.baud as usize % BAUD_RATES.len()]
    }

    pub fn frame(&self) -> FrameFormat {
        FrameFormat::new(self.data_bits, self.parity)
    }
}

impl SettingsBlock for UartSettings {
    fn validate(&mut self) -> bool {
        let defaults = Self::default();
        let baud = repair(valid_baud(self.baud), &mut self.baud, defaults.baud);
        let bits = repair(
            valid_data_bits(self.data_bits),
            &mut self.data_bits,
            defaults.data_bits,
        );
        baud | bits
    }
}

/// Infrared serial decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IrcomSettings {
    pub baud: u8,
    pub parity: Parity,
    pub format: TextFormat,
    /// Receive line polarity is inverted
    pub invert: bool,
}

impl Default for IrcomSettings {
    fn default() -> Self {
        Self {
            baud: DEFAULT_BAUD_INDEX,
            parity: Parity::None,
            format: TextFormat::Hex,
            invert: true,
        }
    }
}

impl IrcomSettings {
    pub fn baud_rate(&self) -> u32 {
        BAUD_RATES[self.baud as usize % BAUD_RATES.len()]
    }
}

impl SettingsBlock for IrcomSettings {
    fn validate(&mut self) -> bool {
        repair(valid_baud(self.baud), &mut self.baud, DEFAULT_BAUD_INDEX)
    }
}

/// Synchronous serial decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UsrtSettings {
    pub edge: ClockEdge,
    pub data_bits: u8,
    pub parity: Parity,
    pub format: TextFormat,
}

impl Default for UsrtSettings {
    fn default() -> Self {
        Self {
            edge: ClockEdge::Falling,
            data_bits: 8,
            parity: Parity::None,
            format: TextFormat::Hex,
        }
    }
}

impl UsrtSettings {
    pub fn frame(&self) -> FrameFormat {
        FrameFormat::new(self.data_bits, self.parity)
    }
}

impl SettingsBlock for UsrtSettings {
    fn validate(&mut self) -> bool {
        repair(valid_data_bits(self.data_bits), &mut self.data_bits, 8)
    }
}

/// SPI decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpiSettings {
    pub input: SpiInput,
    pub order: BitOrder,
    pub edge: ClockEdge,
    pub select: SelectLevel,
}

impl SettingsBlock for SpiSettings {
    fn validate(&mut self) -> bool {
        false
    }
}

/// TWI decoder annotations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TwiSettings {
    pub ack_nack: bool,
    pub start_stop: bool,
}

impl Default for TwiSettings {
    fn default() -> Self {
        Self {
            ack_nack: true,
            start_stop: true,
        }
    }
}

impl SettingsBlock for TwiSettings {
    fn validate(&mut self) -> bool {
        false
    }
}

/// 1-Wire decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OneWireSettings {
    pub tab: bool,
}

impl Default for OneWireSettings {
    fn default() -> Self {
        Self { tab: true }
    }
}

impl SettingsBlock for OneWireSettings {
    fn validate(&mut self) -> bool {
        false
    }
}

/// Voltmeter and ammeter: ADC trim plus chart speed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AnalogSettings {
    pub offset: i16,
    pub gain: u16,
    pub speed: ChartSpeed,
}

impl Default for AnalogSettings {
    fn default() -> Self {
        Self {
            offset: 0,
            gain: GAIN_MIDPOINT,
            speed: ChartSpeed::SLOWEST,
        }
    }
}

impl SettingsBlock for AnalogSettings {
    fn validate(&mut self) -> bool {
        let offset = repair(
            (-OFFSET_RANGE..=OFFSET_RANGE).contains(&self.offset),
            &mut self.offset,
            0,
        );
        let gain_ok = (GAIN_MIDPOINT - GAIN_RANGE..=GAIN_MIDPOINT + GAIN_RANGE).contains(&self.gain)
            && self.gain % 2 == 0;
        let gain = repair(gain_ok, &mut self.gain, GAIN_MIDPOINT);
        let speed = repair(
            speed_within(self.speed, ChartSpeed::SLOWEST, ChartSpeed::FASTEST),
            &mut self.speed,
            ChartSpeed::SLOWEST,
        );
        offset | gain | speed
    }
}

/// Frequency meter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrequencySettings {
    pub speed: ChartSpeed,
}

impl Default for FrequencySettings {
    fn default() -> Self {
        Self {
            speed: ChartSpeed::SPEED_4,
        }
    }
}

impl SettingsBlock for FrequencySettings {
    fn validate(&mut self) -> bool {
        repair(
            speed_within(self.speed, ChartSpeed::SPEED_4, ChartSpeed::FASTEST),
            &mut self.speed,
            ChartSpeed::SPEED_4,
        )
    }
}

/// Charge meter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChargeSettings {
    pub speed: ChartSpeed,
}

impl Default for ChargeSettings {
    fn default() -> Self {
        Self {
            speed: ChartSpeed::SLOWEST,
        }
    }
}

impl SettingsBlock for ChargeSettings {
    fn validate(&mut self) -> bool {
        repair(
            speed_within(self.speed, ChartSpeed::SLOWEST, ChartSpeed::SPEED_4),
            &mut self.speed,
            ChartSpeed::SLOWEST,
        )
    }
}

/// Mode started at power-on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InstrumentSettings {
    pub mode: ModeId,
}

impl Default for InstrumentSettings {
    fn default() -> Self {
        Self {
            mode: ModeId::Voltage,
        }
    }
}

impl SettingsBlock for InstrumentSettings {
    fn validate(&mut self) -> bool {
        repair(self.mode.is_persistent(), &mut self.mode, ModeId::Voltage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(!UartSettings::default().validate());
        assert!(!IrcomSettings::default().validate());
        assert!(!UsrtSettings::default().validate());
        assert!(!AnalogSettings::default().validate());
        assert!(!FrequencySettings::default().validate());
        assert!(!ChargeSettings::default().validate());
        assert!(!InstrumentSettings::default().validate());
    }

    #[test]
    fn test_uart_repairs_each_field() {
        let mut settings = UartSettings {
            baud: 40,
            data_bits: 8,
            parity: Parity::Even,
            format: TextFormat::Ascii,
        };
        assert!(settings.validate());
        assert_eq!(settings.baud, DEFAULT_BAUD_INDEX);
        assert_eq!(settings.parity, Parity::Even);
        assert_eq!(settings.baud_rate(), 9600);

        settings.data_bits = 4;
        assert!(settings.validate());
        assert_eq!(settings.data_bits, 8);
    }

    #[test]
    fn test_analog_trim_limits() {
        let mut settings = AnalogSettings {
            offset: -100,
            gain: GAIN_MIDPOINT + GAIN_RANGE,
            speed: ChartSpeed::FASTEST,
        };
        assert!(!settings.validate());

        settings.offset = 101;
        settings.gain = GAIN_MIDPOINT + 1;
        assert!(settings.validate());
        assert_eq!(settings.offset, 0);
        assert_eq!(settings.gain, GAIN_MIDPOINT);
    }

    #[test]
    fn test_speed_ranges_per_mode() {
        let mut frequency = FrequencySettings {
            speed: ChartSpeed::SLOWEST,
        };
        assert!(frequency.validate());
        assert_eq!(frequency.speed, ChartSpeed::SPEED_4);

        let mut charge = ChargeSettings {
            speed: ChartSpeed::FASTEST,
        };
        assert!(charge.validate());
        assert_eq!(charge.speed, ChartSpeed::SLOWEST);
    }

    #[test]
    fn test_calibration_not_started_at_power_on() {
        let mut settings = InstrumentSettings {
            mode: ModeId::VoltageCalibration,
        };
        assert!(settings.validate());
        assert_eq!(settings.mode, ModeId::Voltage);
    }

    #[test]
    fn test_serial_blocks_keep_valid_fields() {
        let mut ircom = IrcomSettings {
            baud: BAUD_RATES.len() as u8,
            invert: false,
            ..IrcomSettings::default()
        };
        assert!(ircom.validate());
        assert_eq!(ircom.baud, DEFAULT_BAUD_INDEX);
        assert!(!ircom.invert);

        let mut usrt = UsrtSettings {
            data_bits: 9,
            edge: ClockEdge::Rising,
            ..UsrtSettings::default()
        };
        assert!(usrt.validate());
        assert_eq!(usrt.data_bits, 8);
        assert_eq!(usrt.edge, ClockEdge::Rising);

        usrt.data_bits = 5;
        assert!(!usrt.validate());
        assert_eq!(usrt.data_bits, 5);
    }
}
