//! Asynchronous serial decoding
//!
//! Two paths feed the same output rules:
//!
//! - [`UartDecoder`] recovers frames from oversampled line snapshots with a
//!   software receiver per channel.
//! - [`ReceiverDecoder`] reads (status, data) records pushed by hardware
//!   receivers.
//!
//! Bytes print in the grid's current format. A change of channel starts a
//! new line and lines carrying the second channel (TX) are inverted.

use pocketlab_display::{Symbol, TextGrid};

use super::signals::{Direction, PortSample, ReceiverStatus, SerialLayout};
use super::{Decoder, FrameFormat};
use crate::buffer::SampleBuffer;

/// Line samples per bit for the software receiver
pub const UART_OVERSAMPLING: u16 = 8;

/// Selectable baud rates
pub const BAUD_RATES: [u32; 17] = [
    1200, 2400, 4800, 9600, 14400, 19200, 28800, 38400, 57600, 76800, 115_200, 230_400,
    460_800, 921_600, 1_382_000, 1_843_000, 2_000_000,
];

/// Index of 9600 baud in [`BAUD_RATES`]
pub const DEFAULT_BAUD_INDEX: u8 = 3;

/// Outcome of one received frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Frame {
    Data(u8),
    ParityError,
    FrameError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RxState {
    /// Waiting for a falling edge; tracks the previous line level
    Idle { high: bool },
    /// Inside a frame, `ticks` samples after the start edge
    Receiving {
        ticks: u16,
        byte: u8,
        ones: u8,
        parity_ok: bool,
    },
}

/// Software receiver for one serial line
///
/// Frames start on a falling edge of an idle (high) line. Each slot is
/// sampled at its centre; a start bit that is no longer low at its centre
/// is treated as a glitch and ignored.
#[derive(Debug, Clone)]
pub struct BitReceiver {
    format: FrameFormat,
    samples_per_bit: u16,
    state: RxState,
}

impl BitReceiver {
    pub fn new(format: FrameFormat, samples_per_bit: u16) -> Self {
        Self {
            format,
            samples_per_bit: samples_per_bit.max(2),
            state: RxState::Idle { high: false },
        }
    }

    pub fn reset(&mut self) {
        self.state = RxState::Idle { high: false };
    }

    /// Whether a frame is in progress
    pub fn is_receiving(&self) -> bool {
        matches!(self.state, RxState::Receiving { .. })
    }

    /// Feed one line sample
    pub fn feed(&mut self, high: bool) -> Option<Frame> {
        match self.state {
            RxState::Idle { high: was_high } => {
                self.state = if was_high && !high {
                    RxState::Receiving {
                        ticks: 0,
                        byte: 0,
                        ones: 0,
                        parity_ok: true,
                    }
                } else {
                    RxState::Idle { high }
                };
                None
            }
            RxState::Receiving {
                ticks,
                mut byte,
                mut ones,
                mut parity_ok,
            } => {
                let ticks = ticks + 1;
                let half = self.samples_per_bit / 2;
                if ticks < half || (ticks - half) % self.samples_per_bit != 0 {
                    self.state = RxState::Receiving {
                        ticks,
                        byte,
                        ones,
                        parity_ok,
                    };
                    return None;
                }

                let slot = (ticks - half) / self.samples_per_bit;
                let data_bits = self.format.data_bits as u16;
                let parity_slot = data_bits + 1;
                let stop_slot = parity_slot + self.format.parity.has_bit() as u16;

                if slot == 0 {
                    if high {
                        self.state = RxState::Idle { high: true };
                        return None;
                    }
                } else if slot <= data_bits {
                    byte >>= 1;
                    if high {
                        byte |= 0x80;
                        ones += 1;
                    }
                } else if slot < stop_slot {
                    if high {
                        ones += 1;
                    }
                    parity_ok = !self.format.parity.is_violated(ones);
                } else {
                    self.state = RxState::Idle { high };
                    let frame = if !high {
                        Frame::FrameError
                    } else if !parity_ok {
                        Frame::ParityError
                    } else {
                        Frame::Data(byte >> (8 - self.format.data_bits))
                    };
                    return Some(frame);
                }

                self.state = RxState::Receiving {
                    ticks,
                    byte,
                    ones,
                    parity_ok,
                };
                None
            }
        }
    }
}

/// Tracks the active channel and applies the shared output rules
#[derive(Debug, Clone, Default)]
struct ChannelPrinter {
    direction: Option<Direction>,
}

impl ChannelPrinter {
    fn print(&mut self, direction: Direction, frame: Frame, grid: &mut TextGrid) {
        if let Some(previous) = self.direction {
            if previous != direction {
                grid.new_line();
            }
        }
        self.direction = Some(direction);
        match frame {
            Frame::Data(byte) => grid.print(byte),
            Frame::ParityError => grid.print_symbol(Symbol::ParityError),
            Frame::FrameError => grid.print_symbol(Symbol::FrameError),
        }
        if direction == Direction::Tx {
            grid.invert_line();
        }
    }
}

/// Bit-level decoder for both serial channels
#[derive(Debug, Clone)]
pub struct UartDecoder {
    layout: SerialLayout,
    rx: BitReceiver,
    tx: BitReceiver,
    printer: ChannelPrinter,
}

impl UartDecoder {
    pub fn new(format: FrameFormat, samples_per_bit: u16) -> Self {
        Self::with_layout(SerialLayout::DEFAULT, format, samples_per_bit)
    }

    pub fn with_layout(layout: SerialLayout, format: FrameFormat, samples_per_bit: u16) -> Self {
        Self {
            layout,
            rx: BitReceiver::new(format, samples_per_bit),
            tx: BitReceiver::new(format, samples_per_bit),
            printer: ChannelPrinter::default(),
        }
    }
}

impl Decoder for UartDecoder {
    fn decode<const N: usize>(&mut self, buffer: &SampleBuffer<N>, grid: &mut TextGrid) {
        while !buffer.is_empty() {
            let sample = self.layout.sample(PortSample::from_bits(buffer.get_byte()));
            if let Some(frame) = self.rx.feed(sample.rx) {
                self.printer.print(Direction::Rx, frame, grid);
            }
            if let Some(frame) = self.tx.feed(sample.tx) {
                self.printer.print(Direction::Tx, frame, grid);
            }
        }
    }

    fn reset(&mut self) {
        self.rx.reset();
        self.tx.reset();
        self.printer = ChannelPrinter::default();
    }
}

/// Decoder for hardware receiver records
///
/// Each record is a status byte, followed by a data byte when the status
/// names a channel. With `rx_only` set, TX records are dropped.
#[derive(Debug, Clone)]
pub struct ReceiverDecoder {
    rx_only: bool,
    printer: ChannelPrinter,
}

impl ReceiverDecoder {
    pub fn new(rx_only: bool) -> Self {
        Self {
            rx_only,
            printer: ChannelPrinter::default(),
        }
    }
}

impl Decoder for ReceiverDecoder {
    fn decode<const N: usize>(&mut self, buffer: &SampleBuffer<N>, grid: &mut TextGrid) {
        while !buffer.is_empty() {
            let status = ReceiverStatus::from_bits(buffer.get_byte());
            let Some(direction) = status.direction() else {
                continue;
            };
            if buffer.is_empty() {
                // data byte not yet written; the producer pushes pairs atomically
                break;
            }
            let data = buffer.get_byte();
            if self.rx_only && direction == Direction::Tx {
                continue;
            }
            let frame = if status.frame_error() {
                Frame::FrameError
            } else if status.parity_error() {
                Frame::ParityError
            } else {
                Frame::Data(data)
            };
            self.printer.print(direction, frame, grid);
        }
    }

    fn reset(&mut self) {
        self.printer = ChannelPrinter::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::signals::SerialSample;
    use crate::decode::Parity;
    use pocketlab_display::TextFormat;

    const SPB: u16 = UART_OVERSAMPLING;

    /// Line levels for one frame, LSB first, framed by idle time
    fn frame_levels(byte: u8, format: FrameFormat, stop_high: bool) -> Vec<bool> {
        let mut bits = Vec::new();
        bits.push(false);
        let mut ones = 0;
        for i in 0..format.data_bits {
            let bit = byte & (1 << i) != 0;
            ones += bit as u8;
            bits.push(bit);
        }
        match format.parity {
            Parity::None => {}
            Parity::Odd => bits.push(ones % 2 == 0),
            Parity::Even => bits.push(ones % 2 == 1),
        }
        bits.push(stop_high);

        let mut levels = vec![true; 2 * SPB as usize];
        for bit in bits {
            levels.extend(core::iter::repeat(bit).take(SPB as usize));
        }
        levels.extend(core::iter::repeat(true).take(2 * SPB as usize));
        levels
    }

    fn push_rx(buffer: &SampleBuffer<2048>, levels: &[bool]) {
        for &rx in levels {
            let raw = SerialLayout::DEFAULT.encode(SerialSample { rx, tx: true });
            buffer.push_byte(raw.bits());
        }
    }

    fn decode_levels(levels: &[bool], format: FrameFormat, text: TextFormat) -> TextGrid {
        let buffer = SampleBuffer::<2048>::new();
        let mut grid = TextGrid::new();
        grid.set_format(text);
        let mut decoder = UartDecoder::new(format, SPB);
        push_rx(&buffer, levels);
        decoder.decode(&buffer, &mut grid);
        grid
    }

    #[test]
    fn test_8n1_hex() {
        let levels = frame_levels(0x5A, FrameFormat::EIGHT_N, true);
        let grid = decode_levels(&levels, FrameFormat::EIGHT_N, TextFormat::Hex);
        assert_eq!(&grid.line(0)[..3], b"5A ");
    }

    #[test]
    fn test_8n1_ascii() {
        let levels = frame_levels(0x5A, FrameFormat::EIGHT_N, true);
        let grid = decode_levels(&levels, FrameFormat::EIGHT_N, TextFormat::Ascii);
        assert_eq!(grid.line(0)[0], b'Z');
        assert_eq!(grid.cursor(), (0, 1));
    }

    #[test]
    fn test_stop_bit_violation() {
        let levels = frame_levels(0x5A, FrameFormat::EIGHT_N, false);
        let grid = decode_levels(&levels, FrameFormat::EIGHT_N, TextFormat::Ascii);
        assert_eq!(grid.line(0)[0], Symbol::FrameError.code());
        assert_eq!(grid.cursor(), (0, 1));
    }

    #[test]
    fn test_parity_error() {
        let format = FrameFormat::new(7, Parity::Even);
        let mut levels = frame_levels(0x41, format, true);
        // flip the parity slot
        let parity_start = (2 + 1 + 7) * SPB as usize;
        for level in &mut levels[parity_start..parity_start + SPB as usize] {
            *level = !*level;
        }
        let grid = decode_levels(&levels, format, TextFormat::Ascii);
        assert_eq!(grid.line(0)[0], Symbol::ParityError.code());
    }

    #[test]
    fn test_short_frames_and_sequence() {
        let format = FrameFormat::new(5, Parity::Odd);
        let mut levels = frame_levels(0x15, format, true);
        levels.extend(frame_levels(0x0A, format, true));
        let grid = decode_levels(&levels, format, TextFormat::Hex);
        assert_eq!(&grid.line(0)[..5], b"15 0A");
    }

    #[test]
    fn test_false_start_ignored() {
        let mut levels = vec![true; 16];
        levels.extend([false, false]);
        levels.extend(core::iter::repeat(true).take(32));
        let grid = decode_levels(&levels, FrameFormat::EIGHT_N, TextFormat::Hex);
        assert_eq!(grid.cursor(), (0, 0));
    }

    #[test]
    fn test_channel_change_inverts_tx() {
        let buffer = SampleBuffer::<2048>::new();
        let mut grid = TextGrid::new();
        grid.set_format(TextFormat::Ascii);
        let mut decoder = UartDecoder::new(FrameFormat::EIGHT_N, SPB);

        push_rx(&buffer, &frame_levels(b'a', FrameFormat::EIGHT_N, true));
        for tx in frame_levels(b'b', FrameFormat::EIGHT_N, true) {
            let raw = SerialLayout::DEFAULT.encode(SerialSample { rx: true, tx });
            buffer.push_byte(raw.bits());
        }
        decoder.decode(&buffer, &mut grid);

        assert_eq!(grid.line(0)[0], b'a');
        assert!(!grid.is_line_inverted(0));
        assert_eq!(grid.line(1)[0], b'b');
        assert!(grid.is_line_inverted(1));
    }

    #[test]
    fn test_receiver_records() {
        let buffer = SampleBuffer::<2048>::new();
        let mut grid = TextGrid::new();
        grid.set_format(TextFormat::Ascii);
        let mut decoder = ReceiverDecoder::new(false);

        buffer.push_pair(ReceiverStatus::received(Direction::Rx, false, false).bits(), b'o');
        buffer.push_pair(ReceiverStatus::received(Direction::Rx, false, false).bits(), b'k');
        buffer.push_pair(ReceiverStatus::received(Direction::Tx, true, true).bits(), 0);
        decoder.decode(&buffer, &mut grid);

        assert_eq!(&grid.line(0)[..2], b"ok");
        assert_eq!(grid.line(1)[0], Symbol::FrameError.code());
        assert!(grid.is_line_inverted(1));
    }

    #[test]
    fn test_receiver_rx_only() {
        let buffer = SampleBuffer::<2048>::new();
        let mut grid = TextGrid::new();
        grid.set_format(TextFormat::Ascii);
        let mut decoder = ReceiverDecoder::new(true);

        buffer.push_pair(ReceiverStatus::received(Direction::Tx, false, false).bits(), b'x');
        buffer.push_pair(ReceiverStatus::received(Direction::Rx, false, true).bits(), b'y');
        decoder.decode(&buffer, &mut grid);

        assert_eq!(grid.line(0)[0], Symbol::ParityError.code());
        assert_eq!(grid.cursor(), (0, 1));
    }
}
