//! Digital mode loop
//!
//! Wraps the text grid with the Ready/Running lifecycle shared by every
//! protocol mode: wait for the first sample, then per poll recover from
//! overflow, decode, check for glitches and render on the display tick.

use pocketlab_display::{Backlight, DisplayBackend, Symbol, TextFormat, TextGrid};
use pocketlab_hal::Acquisition;

use super::Io;
use crate::decode::{check_glitches, Decoder};
use crate::traits::Platform;

/// Text position of the waiting banner
const READY_POSITION: (u8, u8) = (28, 20);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum State {
    /// No data seen yet; keys are locked
    Ready,
    Running,
}

/// Text terminal state of a digital mode
#[derive(Debug, Clone)]
pub struct Terminal {
    grid: TextGrid,
    state: State,
    hold: bool,
}

impl Default for Terminal {
    fn default() -> Self {
        Self::new()
    }
}

impl Terminal {
    pub const fn new() -> Self {
        Self {
            grid: TextGrid::new(),
            state: State::Ready,
            hold: false,
        }
    }

    /// Blank the terminal and wait for data again
    pub fn reset<P: Platform>(&mut self, format: TextFormat, io: &mut Io<'_, P>) {
        io.buffer.clear();
        self.grid.reset();
        self.grid.set_format(format);
        self.state = State::Ready;
        self.hold = false;
    }

    /// Keys other than the settings key are ignored until data arrives
    pub fn is_locked(&self) -> bool {
        self.state == State::Ready
    }

    pub fn is_hold(&self) -> bool {
        self.hold
    }

    pub fn grid(&self) -> &TextGrid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut TextGrid {
        &mut self.grid
    }

    pub fn set_format(&mut self, format: TextFormat) {
        self.grid.set_format(format);
    }

    /// Erase the text
    pub fn clear(&mut self) {
        self.grid.clear();
    }

    /// Freeze or resume acquisition
    pub fn set_hold<P: Platform>(&mut self, hold: bool, io: &mut Io<'_, P>) {
        self.hold = hold;
        self.apply_hold(io);
    }

    pub fn toggle_hold<P: Platform>(&mut self, io: &mut Io<'_, P>) {
        self.set_hold(!self.hold, io);
    }

    fn apply_hold<P: Platform>(&mut self, io: &mut Io<'_, P>) {
        if self.hold {
            io.acquisition.stop();
            io.display.backlight(Backlight::Aux);
        } else {
            io.acquisition.start();
            io.display.backlight(Backlight::Main);
        }
        io.buffer.clear();
        self.grid.wake();
    }

    /// One foreground iteration
    pub fn poll<P: Platform, D: Decoder>(&mut self, decoder: &mut D, io: &mut Io<'_, P>) {
        match self.state {
            State::Ready => {
                if !io.display.update_pending() {
                    return;
                }
                io.display.clear();
                io.display.cursor(READY_POSITION.0, READY_POSITION.1);
                io.display.print_str("READY");
                io.display.idle();
                if !io.buffer.is_empty() {
                    self.state = State::Running;
                }
            }
            State::Running => {
                let overflow = io.buffer.is_overflowing();
                if overflow {
                    self.grid.print_symbol(Symbol::Overflow);
                    io.acquisition.stop();
                    io.buffer.reduce();
                }
                decoder.decode(io.buffer, &mut self.grid);
                if overflow {
                    self.grid.print_symbol(Symbol::Overflow);
                    self.apply_hold(io);
                }
                check_glitches(decoder, io.clock, &mut self.grid);
                if io.display.update_pending() {
                    self.grid.render(io.display, self.hold);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::SampleBuffer;
    use crate::testing::{DrawOp, Rig};

    /// Decoder that prints every byte it pops
    struct Echo;

    impl Decoder for Echo {
        fn decode<const N: usize>(&mut self, buffer: &SampleBuffer<N>, grid: &mut TextGrid) {
            while !buffer.is_empty() {
                grid.print_char(buffer.get_byte());
            }
        }

        fn reset(&mut self) {}
    }

    /// Clocked decoder that discards everything
    struct Drain;

    impl Decoder for Drain {
        fn decode<const N: usize>(&mut self, buffer: &SampleBuffer<N>, _grid: &mut TextGrid) {
            while !buffer.is_empty() {
                buffer.get_byte();
            }
        }

        fn glitch_floor(&self) -> Option<u16> {
            Some(28)
        }

        fn reset(&mut self) {}
    }

    fn running(rig: &mut Rig) -> Terminal {
        let mut terminal = Terminal::new();
        terminal.reset(TextFormat::Ascii, &mut rig.io());
        rig.buffer.push_byte(0);
        rig.display.pending = true;
        terminal.poll(&mut Drain, &mut rig.io());
        assert!(!terminal.is_locked());
        terminal
    }

    #[test]
    fn test_ready_until_first_sample() {
        let mut rig = Rig::new();
        let mut terminal = Terminal::new();
        terminal.reset(TextFormat::Ascii, &mut rig.io());

        rig.display.pending = true;
        terminal.poll(&mut Echo, &mut rig.io());
        assert!(terminal.is_locked());
        assert_eq!(rig.display.text_at(28, 20), "READY");
        assert!(rig.display.contains(DrawOp::Idle));

        rig.buffer.push_byte(b'k');
        rig.display.pending = true;
        terminal.poll(&mut Echo, &mut rig.io());
        assert!(!terminal.is_locked());

        rig.display.pending = true;
        terminal.poll(&mut Echo, &mut rig.io());
        assert_eq!(terminal.grid().line(0)[0], b'k');
        assert!(rig.display.contains(DrawOp::Progress(Some(1))));
    }

    #[test]
    fn test_ready_waits_for_refresh() {
        let mut rig = Rig::new();
        let mut terminal = Terminal::new();
        rig.buffer.push_byte(b'x');
        terminal.poll(&mut Echo, &mut rig.io());
        assert!(terminal.is_locked());
        assert!(rig.display.ops.is_empty());
    }

    #[test]
    fn test_overflow_marks_and_restarts() {
        let mut rig = Rig::new();
        let mut terminal = running(&mut rig);

        for _ in 0..rig.buffer.capacity() - 4 {
            rig.buffer.push_byte(b'z');
        }
        assert!(rig.buffer.is_overflowing());
        terminal.poll(&mut Drain, &mut rig.io());

        let line = terminal.grid().line(0);
        assert_eq!(line[0], Symbol::Overflow.code());
        assert_eq!(line[1], Symbol::Overflow.code());
        assert_eq!(rig.acquisition.stops, 1);
        assert_eq!(rig.acquisition.starts, 1);
        assert!(rig.acquisition.running);
        assert!(rig.buffer.is_empty());
    }

    #[test]
    fn test_hold_stops_producer_and_dims() {
        let mut rig = Rig::new();
        let mut terminal = Terminal::new();
        terminal.set_hold(true, &mut rig.io());
        assert!(terminal.is_hold());
        assert!(!rig.acquisition.running);
        assert_eq!(rig.display.backlight, Backlight::Aux);

        terminal.toggle_hold(&mut rig.io());
        assert!(rig.acquisition.running);
        assert_eq!(rig.display.backlight, Backlight::Main);
    }

    #[test]
    fn test_hold_hides_progress() {
        let mut rig = Rig::new();
        let mut terminal = running(&mut rig);
        terminal.set_hold(true, &mut rig.io());
        rig.display.pending = true;
        terminal.poll(&mut Drain, &mut rig.io());
        assert!(rig.display.contains(DrawOp::Progress(None)));
    }

    #[test]
    fn test_glitch_blacks_out_text() {
        let mut rig = Rig::new();
        let mut terminal = running(&mut rig);
        terminal.grid_mut().print_char(b'Q');

        rig.clock.period = 10;
        terminal.poll(&mut Drain, &mut rig.io());
        assert_eq!(terminal.grid().line(0)[0], Symbol::BlackBox.code());
        assert_eq!(rig.clock.resets, 1);
    }
}
