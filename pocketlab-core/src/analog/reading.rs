//! Result formatting

use core::fmt::Write;

use pocketlab_display::DisplayBackend;
use pocketlab_hal::{AnalogInput, StorageKey};

/// Formatted result text
pub type ReadingText = heapless::String<8>;

/// Gap, in pixels, between a value and its unit
const UNIT_GAP: u8 = 2;

/// Extra offset that keeps short overload text aligned with numbers
const OVERLOAD_SHIFT: u8 = 6;

/// A value ready to print
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reading {
    pub text: ReadingText,
    /// The value is outside the displayable range
    pub overload: bool,
    /// Pixels skipped before the text
    pub lead: u8,
    /// Pixels skipped between the text and the unit
    pub gap: u8,
}

impl Reading {
    pub fn value(args: core::fmt::Arguments<'_>) -> Self {
        let mut text = ReadingText::new();
        let _ = text.write_fmt(args);
        Self {
            text,
            overload: false,
            lead: 0,
            gap: UNIT_GAP,
        }
    }

    /// `OVL` with the value's sign
    pub fn overload(negative: bool) -> Self {
        let mut reading = Self::value(format_args!("{}OVL", sign(negative)));
        reading.overload = true;
        reading
    }

    /// Shift the unit right so it stays where a number would put it
    pub fn align_unit(mut self) -> Self {
        self.gap += OVERLOAD_SHIFT;
        self
    }

    /// Shift the text right so it ends where a number would
    pub fn align_text(mut self) -> Self {
        self.lead += OVERLOAD_SHIFT;
        self
    }

    /// Print at the cursor, followed by `unit`
    pub fn render<D: DisplayBackend>(&self, display: &mut D, unit: &str) {
        if self.lead > 0 {
            display.move_cursor(self.lead);
        }
        display.print_str(&self.text);
        display.move_cursor(self.gap);
        display.print_str(unit);
    }
}

pub(crate) const fn sign(negative: bool) -> char {
    if negative {
        '-'
    } else {
        ' '
    }
}

/// A quantity measured through the analog front-end
pub trait Quantity {
    const UNIT: &'static str;
    /// Settings block holding trim and chart speed
    const STORAGE_KEY: StorageKey;
    const INPUT: AnalogInput;

    /// Format a raw ADC value
    fn reading(raw: i16) -> Reading;
}

/// Voltmeter, 10 counts per centivolt
#[derive(Debug, Clone, Copy, Default)]
pub struct Voltage;

impl Quantity for Voltage {
    const UNIT: &'static str = "V";
    const STORAGE_KEY: StorageKey = StorageKey::Voltage;
    const INPUT: AnalogInput = AnalogInput::Voltage;

    fn reading(raw: i16) -> Reading {
        let centivolts = (raw as i32 + 5) / 10;
        let negative = centivolts < 0;
        let magnitude = centivolts.unsigned_abs();
        if magnitude < 700 {
            Reading::value(format_args!(
                "{}{}.{:02}",
                sign(negative),
                magnitude / 100,
                magnitude % 100
            ))
        } else {
            Reading::overload(negative).align_unit()
        }
    }
}

/// Ammeter, 2 counts per milliamp
#[derive(Debug, Clone, Copy, Default)]
pub struct Current;

impl Quantity for Current {
    const UNIT: &'static str = "mA";
    const STORAGE_KEY: StorageKey = StorageKey::Current;
    const INPUT: AnalogInput = AnalogInput::Current;

    fn reading(raw: i16) -> Reading {
        let milliamps = (raw as i32 + 1) / 2;
        if milliamps > -250 && milliamps < 1000 {
            Reading::value(format_args!("{:4}", milliamps))
        } else {
            Reading::overload(milliamps < 0)
        }
    }
}
