//! Protocol decoders
//!
//! Each decoder is a pure consumer: it pops every pending element from the
//! sample buffer, advances a small explicit state machine and appends
//! formatted tokens to the text grid at frame boundaries. Framing errors
//! are rendered inline and decoding resumes at the next frame.
//!
//! - [`uart`] - asynchronous serial, bit-level and hardware receiver records
//! - [`usrt`] - synchronous serial clocked by an external clock
//! - [`spi`] - chip-select framed bursts
//! - [`twi`] - I2C with START/STOP pulse detection
//! - [`onewire`] - pulse-width classified 1-Wire slots

use serde::{Deserialize, Serialize};

use pocketlab_display::TextGrid;
use pocketlab_hal::{ClockMonitor, Edge};

use crate::buffer::SampleBuffer;

pub mod onewire;
pub mod signals;
pub mod spi;
pub mod twi;
pub mod uart;
pub mod usrt;

pub use onewire::OneWireDecoder;
pub use signals::{Direction, PortSample, ReceiverStatus};
pub use spi::SpiDecoder;
pub use twi::TwiDecoder;
pub use uart::{ReceiverDecoder, UartDecoder};
pub use usrt::UsrtDecoder;

/// Printed when a framing bus condition starts a transfer
pub const START_MARK: u8 = b'<';

/// Printed when a framing bus condition ends a transfer
pub const STOP_MARK: u8 = b'>';

/// Printed in place of a truncated byte
pub const PARTIAL_MARK: u8 = b'?';

/// Stateful protocol decoder
pub trait Decoder {
    /// Consume every pending buffer element
    fn decode<const N: usize>(&mut self, buffer: &SampleBuffer<N>, grid: &mut TextGrid);

    /// Shortest trustworthy clock period in timer counts, if clocked
    fn glitch_floor(&self) -> Option<u16> {
        None
    }

    /// Discard any partially received frame
    fn reset(&mut self);
}

/// Blank the grid when the clock ran faster than the decoder tolerates
///
/// Returns `true` when a glitch was detected. The monitor restarts its
/// measurement either way the check fires.
pub fn check_glitches<D: Decoder, C: ClockMonitor>(
    decoder: &D,
    clock: &mut C,
    grid: &mut TextGrid,
) -> bool {
    match decoder.glitch_floor() {
        Some(floor) if clock.min_period() < floor => {
            grid.blackout();
            clock.reset();
            true
        }
        _ => false,
    }
}

/// Serial parity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
}

impl Parity {
    /// Whether `ones` set bits, data plus parity bit, violate the parity
    pub const fn is_violated(self, ones: u8) -> bool {
        match self {
            Parity::None => false,
            Parity::Odd => ones & 1 == 0,
            Parity::Even => ones & 1 == 1,
        }
    }

    pub const fn has_bit(self) -> bool {
        !matches!(self, Parity::None)
    }

    /// Next value in settings order
    pub const fn next(self) -> Self {
        match self {
            Parity::None => Parity::Odd,
            Parity::Odd => Parity::Even,
            Parity::Even => Parity::None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Parity::None => "NO",
            Parity::Odd => "ODD",
            Parity::Even => "EVEN",
        }
    }
}

impl From<Parity> for pocketlab_hal::SerialParity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => pocketlab_hal::SerialParity::None,
            Parity::Odd => pocketlab_hal::SerialParity::Odd,
            Parity::Even => pocketlab_hal::SerialParity::Even,
        }
    }
}

/// Sampling clock edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockEdge {
    #[default]
    Falling,
    Rising,
}

impl ClockEdge {
    pub const fn toggled(self) -> Self {
        match self {
            ClockEdge::Falling => ClockEdge::Rising,
            ClockEdge::Rising => ClockEdge::Falling,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            ClockEdge::Falling => "F.EDGE",
            ClockEdge::Rising => "R.EDGE",
        }
    }
}

impl From<ClockEdge> for Edge {
    fn from(edge: ClockEdge) -> Self {
        match edge {
            ClockEdge::Falling => Edge::Falling,
            ClockEdge::Rising => Edge::Rising,
        }
    }
}

/// Serial frame layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameFormat {
    /// Data bits per frame, 5-8
    pub data_bits: u8,
    pub parity: Parity,
}

impl FrameFormat {
    pub const MIN_DATA_BITS: u8 = 5;
    pub const MAX_DATA_BITS: u8 = 8;

    /// 8 data bits, no parity
    pub const EIGHT_N: FrameFormat = FrameFormat {
        data_bits: 8,
        parity: Parity::None,
    };

    pub const fn new(data_bits: u8, parity: Parity) -> Self {
        let data_bits = if data_bits < Self::MIN_DATA_BITS {
            Self::MIN_DATA_BITS
        } else if data_bits > Self::MAX_DATA_BITS {
            Self::MAX_DATA_BITS
        } else {
            data_bits
        };
        Self { data_bits, parity }
    }
}

/// Print a truncated byte: its high nibble if at least 4 bits arrived, then `?`
pub(crate) fn print_partial(grid: &mut TextGrid, byte: u8, bits: u8) {
    if bits > 0 {
        if bits > 3 {
            grid.print_hex(byte >> 4);
        }
        grid.print_char(PARTIAL_MARK);
    }
}

/// Print both nibbles of `byte`
pub(crate) fn print_byte_hex(grid: &mut TextGrid, byte: u8) {
    grid.print_hex(byte >> 4);
    grid.print_hex(byte);
}
