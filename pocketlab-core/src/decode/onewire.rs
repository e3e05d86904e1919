//! 1-Wire decoding
//!
//! The capture timer timestamps the length of every low pulse on the bus
//! (32 counts per microsecond). Pulses are classified purely by width;
//! widths outside every window are ignored.

use core::ops::Range;

use pocketlab_display::TextGrid;

use super::{print_byte_hex, print_partial, Decoder};
use crate::buffer::SampleBuffer;

/// Reset pulse, 480 us to 960 us
pub const RESET: Range<u16> = 0x3B60..0x7940;

/// Presence reply, 60 us to 240 us
pub const PRESENCE: Range<u16> = 0x0760..0x1E60;

/// Zero slot, 15 us to 120 us
pub const BIT_ZERO: Range<u16> = 0x01DB..0x0F27;

/// One slot, 1 us to 14 us
pub const BIT_ONE: Range<u16> = 0x001F..0x01C6;

/// No reply within the slave response time
pub const PRESENCE_TIMEOUT: u16 = 0xB600;

/// Printed for a reset pulse
pub const RESET_MARK: u8 = b'R';

/// Classified bus pulse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pulse {
    Reset,
    Zero,
    One,
    Unknown,
}

/// Strictly inside the window; both edges belong to the tolerance band
fn within(window: &Range<u16>, width: u16) -> bool {
    width > window.start && width < window.end
}

impl Pulse {
    pub fn classify(width: u16) -> Self {
        if within(&RESET, width) {
            Pulse::Reset
        } else if within(&BIT_ZERO, width) {
            Pulse::Zero
        } else if within(&BIT_ONE, width) {
            Pulse::One
        } else {
            Pulse::Unknown
        }
    }
}

/// Reply to a reset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Presence {
    Present,
    Absent,
    Invalid,
}

impl Presence {
    pub fn classify(width: u16) -> Self {
        if within(&PRESENCE, width) {
            Presence::Present
        } else if width > PRESENCE_TIMEOUT {
            Presence::Absent
        } else {
            Presence::Invalid
        }
    }

    pub const fn mark(self) -> u8 {
        match self {
            Presence::Present => b'+',
            Presence::Absent => b'-',
            Presence::Invalid => b'?',
        }
    }
}

/// Pulse-width classifying 1-Wire decoder
#[derive(Debug, Clone)]
pub struct OneWireDecoder {
    tab: bool,
    after_reset: bool,
    byte: u8,
    bit: u8,
}

impl OneWireDecoder {
    pub fn new(tab: bool) -> Self {
        Self {
            tab,
            after_reset: false,
            byte: 0,
            bit: 0,
        }
    }

    /// Separate bytes and replies with tab stops
    pub fn set_tab(&mut self, tab: bool) {
        self.tab = tab;
    }

    fn feed(&mut self, width: u16, grid: &mut TextGrid) {
        if self.after_reset {
            grid.print_char(Presence::classify(width).mark());
            if self.tab {
                grid.print_tab();
            }
            self.after_reset = false;
            return;
        }

        match Pulse::classify(width) {
            Pulse::Reset => {
                print_partial(grid, self.byte, self.bit);
                grid.end_line();
                grid.print_char(RESET_MARK);
                self.after_reset = true;
                self.byte = 0;
                self.bit = 0;
            }
            Pulse::Zero => {
                self.byte >>= 1;
                self.bit += 1;
            }
            Pulse::One => {
                self.byte = (self.byte >> 1) | 0x80;
                self.bit += 1;
            }
            Pulse::Unknown => {}
        }

        if self.bit == 8 {
            print_byte_hex(grid, self.byte);
            if self.tab {
                grid.print_tab();
            }
            self.byte = 0;
            self.bit = 0;
        }
    }
}

impl Decoder for OneWireDecoder {
    fn decode<const N: usize>(&mut self, buffer: &SampleBuffer<N>, grid: &mut TextGrid) {
        while buffer.unread() >= 2 {
            self.feed(buffer.get_word(), grid);
        }
    }

    fn reset(&mut self) {
        self.after_reset = false;
        self.byte = 0;
        self.bit = 0;
    }
}
