//! SPI decoding
//!
//! One snapshot per clock edge plus one per chip-select change. A select
//! change closes the burst: any partial byte is flagged, then `<` marks the
//! start of a transfer and `>` its end. Bytes sampled from MISO go on
//! inverted lines.

use serde::{Deserialize, Serialize};

use pocketlab_display::TextGrid;

use super::signals::{PortSample, SpiLayout};
use super::{print_byte_hex, print_partial, Decoder, START_MARK, STOP_MARK};
use crate::buffer::SampleBuffer;

/// Shortest clock period, in timer counts, that decodes reliably
pub const SPI_MIN_CLOCK_PERIOD: u16 = 28;

/// Data line to decode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpiInput {
    #[default]
    Mosi,
    Miso,
}

impl SpiInput {
    pub const fn toggled(self) -> Self {
        match self {
            SpiInput::Mosi => SpiInput::Miso,
            SpiInput::Miso => SpiInput::Mosi,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            SpiInput::Mosi => "MOSI",
            SpiInput::Miso => "MISO",
        }
    }
}

/// Bit order on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BitOrder {
    #[default]
    LsbFirst,
    MsbFirst,
}

impl BitOrder {
    pub const fn toggled(self) -> Self {
        match self {
            BitOrder::LsbFirst => BitOrder::MsbFirst,
            BitOrder::MsbFirst => BitOrder::LsbFirst,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            BitOrder::LsbFirst => "LSB-MSB",
            BitOrder::MsbFirst => "MSB-LSB",
        }
    }
}

/// Active level of the chip select line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SelectLevel {
    #[default]
    ActiveLow,
    ActiveHigh,
}

impl SelectLevel {
    pub const fn toggled(self) -> Self {
        match self {
            SelectLevel::ActiveLow => SelectLevel::ActiveHigh,
            SelectLevel::ActiveHigh => SelectLevel::ActiveLow,
        }
    }

    /// Raw line level while no transfer is in progress
    pub const fn idle_level(self) -> bool {
        matches!(self, SelectLevel::ActiveLow)
    }

    pub const fn label(self) -> &'static str {
        match self {
            SelectLevel::ActiveLow => "LOW",
            SelectLevel::ActiveHigh => "HIGH",
        }
    }
}

/// Chip-select framed SPI decoder
#[derive(Debug, Clone)]
pub struct SpiDecoder {
    layout: SpiLayout,
    order: BitOrder,
    level: SelectLevel,
    requested: SpiInput,
    /// Input latched at the first bit of the current byte
    latched: SpiInput,
    /// Previous raw select level
    select: bool,
    byte: u8,
    bit: u8,
}

impl SpiDecoder {
    pub fn new(input: SpiInput, order: BitOrder, level: SelectLevel) -> Self {
        Self {
            layout: SpiLayout::DEFAULT,
            order,
            level,
            requested: input,
            latched: input,
            select: level.idle_level(),
            byte: 0,
            bit: 0,
        }
    }

    /// Switch the decoded line; takes effect at the next byte boundary
    pub fn set_input(&mut self, input: SpiInput) {
        self.requested = input;
    }

    pub fn input(&self) -> SpiInput {
        self.requested
    }

    fn finish_line(&self, grid: &mut TextGrid) {
        if self.latched == SpiInput::Miso {
            grid.invert_line();
        }
    }

    fn feed(&mut self, raw: PortSample, grid: &mut TextGrid) {
        let sample = self.layout.sample(raw);
        if sample.select != self.select {
            self.select = sample.select;
            print_partial(grid, self.byte, self.bit);
            let asserted = sample.select != self.level.idle_level();
            if asserted {
                grid.print_char(START_MARK);
            } else {
                grid.print_char(STOP_MARK);
                grid.new_line();
            }
            self.finish_line(grid);
            self.byte = 0;
            self.bit = 0;
            return;
        }

        if self.bit == 0 {
            self.latched = self.requested;
        }
        let level = match self.latched {
            SpiInput::Mosi => sample.mosi,
            SpiInput::Miso => sample.miso,
        };
        match self.order {
            BitOrder::LsbFirst => {
                self.byte >>= 1;
                if level {
                    self.byte |= 0x80;
                }
            }
            BitOrder::MsbFirst => {
                self.byte <<= 1;
                if level {
                    self.byte |= 0x01;
                }
            }
        }
        self.bit += 1;
        if self.bit > 7 {
            print_byte_hex(grid, self.byte);
            self.byte = 0;
            self.bit = 0;
            self.finish_line(grid);
        }
    }
}

impl Decoder for SpiDecoder {
    fn decode<const N: usize>(&mut self, buffer: &SampleBuffer<N>, grid: &mut TextGrid) {
        while !buffer.is_empty() {
            self.feed(PortSample::from_bits(buffer.get_byte()), grid);
        }
    }

    fn glitch_floor(&self) -> Option<u16> {
        Some(SPI_MIN_CLOCK_PERIOD)
    }

    fn reset(&mut self) {
        self.select = self.level.idle_level();
        self.latched = self.requested;
        self.byte = 0;
        self.bit = 0;
    }
}
