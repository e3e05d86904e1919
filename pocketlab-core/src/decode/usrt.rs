//! Synchronous serial decoding
//!
//! The sampler captures the port on every edge of the external clock, so
//! each buffer element is exactly one bit slot. A low data line while idle
//! is the start bit.

use pocketlab_display::{Symbol, TextGrid};

use super::signals::{PortSample, SerialLayout};
use super::{Decoder, FrameFormat};
use crate::buffer::SampleBuffer;

/// Shortest clock period, in timer counts, that decodes reliably (about 1 MHz)
pub const USRT_MIN_CLOCK_PERIOD: u16 = 28;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InFrame {
    byte: u8,
    bit: u8,
    ones: u8,
}

/// Clocked serial decoder
#[derive(Debug, Clone)]
pub struct UsrtDecoder {
    layout: SerialLayout,
    format: FrameFormat,
    frame: Option<InFrame>,
}

impl UsrtDecoder {
    pub fn new(format: FrameFormat) -> Self {
        Self {
            layout: SerialLayout::DEFAULT,
            format,
            frame: None,
        }
    }

    fn feed(&mut self, rx: bool, grid: &mut TextGrid) {
        let Some(mut frame) = self.frame else {
            if !rx {
                self.frame = Some(InFrame {
                    byte: 0,
                    bit: 0,
                    ones: 0,
                });
            }
            return;
        };

        let data_bits = self.format.data_bits;
        if frame.bit < data_bits {
            frame.bit += 1;
            frame.byte >>= 1;
            if rx {
                frame.byte |= 0x80;
                frame.ones += 1;
            }
        } else if self.format.parity.has_bit() && frame.bit == data_bits {
            if rx {
                frame.ones += 1;
            }
            if self.format.parity.is_violated(frame.ones) {
                grid.print_symbol(Symbol::ParityError);
                self.frame = None;
                return;
            }
            frame.bit += 1;
        } else {
            if rx {
                grid.print(frame.byte >> (8 - data_bits));
            } else {
                grid.print_symbol(Symbol::FrameError);
            }
            self.frame = None;
            return;
        }
        self.frame = Some(frame);
    }
}

impl Decoder for UsrtDecoder {
    fn decode<const N: usize>(&mut self, buffer: &SampleBuffer<N>, grid: &mut TextGrid) {
        while !buffer.is_empty() {
            let rx = self.layout.sample(PortSample::from_bits(buffer.get_byte())).rx;
            self.feed(rx, grid);
        }
    }

    fn glitch_floor(&self) -> Option<u16> {
        Some(USRT_MIN_CLOCK_PERIOD)
    }

    fn reset(&mut self) {
        self.frame = None;
    }
}
