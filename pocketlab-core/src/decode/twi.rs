//! TWI (I2C) decoding
//!
//! The sampler captures SDA on each SCL rising edge. START and STOP are
//! detected in hardware and delivered as a separate pulse, so a snapshot
//! is either a clock sample or a bus condition, never both.

use pocketlab_display::{Symbol, TextGrid};

use super::signals::{PortSample, TwiLayout};
use super::{print_byte_hex, Decoder, START_MARK, STOP_MARK};
use crate::buffer::SampleBuffer;

/// Shortest clock period, in timer counts, that decodes reliably
pub const TWI_MIN_CLOCK_PERIOD: u16 = 38;

/// Printed after a byte the receiver acknowledged
pub const ACK_MARK: u8 = b'+';

/// Printed after a byte the receiver did not acknowledge
pub const NACK_MARK: u8 = b'-';

/// I2C decoder with optional ACK and bus condition annotations
#[derive(Debug, Clone)]
pub struct TwiDecoder {
    layout: TwiLayout,
    ack_nack: bool,
    start_stop: bool,
    byte: u8,
    bit: u8,
}

impl TwiDecoder {
    pub fn new(ack_nack: bool, start_stop: bool) -> Self {
        Self {
            layout: TwiLayout::DEFAULT,
            ack_nack,
            start_stop,
            byte: 0,
            bit: 0,
        }
    }

    pub fn set_annotations(&mut self, ack_nack: bool, start_stop: bool) {
        self.ack_nack = ack_nack;
        self.start_stop = start_stop;
    }

    fn feed(&mut self, raw: PortSample, grid: &mut TextGrid) {
        let sample = self.layout.sample(raw);
        if sample.condition {
            // a condition inside a byte truncates it
            if self.bit > 1 {
                grid.print_symbol(Symbol::Error);
            }
            if self.start_stop {
                grid.print_char(if sample.sda { STOP_MARK } else { START_MARK });
            }
            if sample.sda {
                grid.end_line();
            }
            self.byte = 0;
            self.bit = 0;
        } else if self.bit < 8 {
            self.byte <<= 1;
            if sample.sda {
                self.byte |= 0x01;
            }
            self.bit += 1;
        } else {
            print_byte_hex(grid, self.byte);
            if self.ack_nack {
                grid.print_char(if sample.sda { NACK_MARK } else { ACK_MARK });
            }
            self.byte = 0;
            self.bit = 0;
        }
    }
}

impl Decoder for TwiDecoder {
    fn decode<const N: usize>(&mut self, buffer: &SampleBuffer<N>, grid: &mut TextGrid) {
        while !buffer.is_empty() {
            self.feed(PortSample::from_bits(buffer.get_byte()), grid);
        }
    }

    fn glitch_floor(&self) -> Option<u16> {
        Some(TWI_MIN_CLOCK_PERIOD)
    }

    fn reset(&mut self) {
        self.byte = 0;
        self.bit = 0;
    }
}
