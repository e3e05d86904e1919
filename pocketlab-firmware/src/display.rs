//! Console display backend
//!
//! Keeps a character-cell copy of the screen instead of a pixel frame
//! buffer and logs each completed frame over defmt. Text positions are
//! snapped to the 6x9 character cell they start in; chart bars are kept
//! as column heights.

use defmt::*;

use pocketlab_display::{
    Backlight, BarPattern, DisplayBackend, DisplayError, DISPLAY_HEIGHT, DISPLAY_WIDTH,
};

use crate::channels::REFRESH;

/// Character cell width in pixels
const GLYPH_WIDTH: u8 = 6;

/// Text line pitch in pixels
const LINE_PITCH: u8 = 9;

/// Printable stand-in for symbol glyphs
const PLACEHOLDER_CHAR: u8 = b'#';

const COLS: usize = (DISPLAY_WIDTH / GLYPH_WIDTH) as usize;
const ROWS: usize = (DISPLAY_HEIGHT / LINE_PITCH + 1) as usize;

pub struct ConsoleDisplay {
    text: [[u8; COLS]; ROWS],
    /// Bit per text row
    inverted: u8,
    bars: [u8; DISPLAY_WIDTH as usize],
    x: u8,
    y: u8,
    progress: Option<u8>,
    idle: bool,
    backlight: Backlight,
    dirty: bool,
    frames: u32,
}

impl ConsoleDisplay {
    pub const fn new() -> Self {
        Self {
            text: [[b' '; COLS]; ROWS],
            inverted: 0,
            bars: [0; DISPLAY_WIDTH as usize],
            x: 0,
            y: 0,
            progress: None,
            idle: false,
            backlight: Backlight::Main,
            dirty: true,
            frames: 0,
        }
    }

    fn row(y: u8) -> usize {
        (y / LINE_PITCH) as usize
    }

    fn log_frame(&self) {
        debug!(
            "frame {}: backlight {}, progress {}, idle {}",
            self.frames, self.backlight, self.progress, self.idle
        );
        for (index, line) in self.text.iter().enumerate() {
            let text = core::str::from_utf8(line).unwrap_or("");
            let marker = if self.inverted & (1 << index) != 0 { '>' } else { '|' };
            debug!("{}{=str}{}", marker, text, marker);
        }

        let filled = self.bars.iter().filter(|&&height| height > 0).count();
        if filled > 0 {
            let peak = self.bars.iter().copied().max().unwrap_or(0);
            debug!("chart: {} columns, peak {} px", filled, peak);
        }
    }
}

impl Default for ConsoleDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayBackend for ConsoleDisplay {
    fn clear(&mut self) {
        self.text = [[b' '; COLS]; ROWS];
        self.inverted = 0;
        self.bars = [0; DISPLAY_WIDTH as usize];
        self.x = 0;
        self.y = 0;
        self.dirty = true;
    }

    fn cursor(&mut self, x: u8, y: u8) {
        self.x = x;
        self.y = y;
    }

    fn move_cursor(&mut self, dx: u8) {
        self.x = self.x.saturating_add(dx);
    }

    fn print_char(&mut self, ch: u8) {
        let col = (self.x / GLYPH_WIDTH) as usize;
        if let Some(cell) = self.text.get_mut(Self::row(self.y)).and_then(|line| line.get_mut(col)) {
            *cell = if (32..127).contains(&ch) { ch } else { PLACEHOLDER_CHAR };
            self.dirty = true;
        }
        self.x = self.x.saturating_add(GLYPH_WIDTH);
    }

    fn bar(&mut self, value: i16, column: u8, _pattern: BarPattern) {
        if let Some(bar) = self.bars.get_mut(column as usize) {
            *bar = value.clamp(0, DISPLAY_HEIGHT as i16) as u8;
            self.dirty = true;
        }
    }

    fn clear_bar(&mut self, column: u8) {
        if let Some(bar) = self.bars.get_mut(column as usize) {
            *bar = 0;
            self.dirty = true;
        }
    }

    fn invert_line(&mut self, y: u8) {
        let row = Self::row(y);
        if row < ROWS {
            self.inverted |= 1 << row;
            self.dirty = true;
        }
    }

    fn progress_bar(&mut self, counter: Option<u8>) {
        self.progress = counter;
    }

    fn idle(&mut self) {
        self.idle = true;
        self.dirty = true;
    }

    fn backlight(&mut self, backlight: Backlight) {
        if self.backlight != backlight {
            self.backlight = backlight;
            info!("Backlight {}", backlight);
        }
    }

    fn update_pending(&mut self) -> bool {
        REFRESH.try_take().is_some()
    }

    fn flush(&mut self) -> Result<(), DisplayError> {
        if !self.dirty {
            return Ok(());
        }
        self.dirty = false;
        self.frames = self.frames.wrapping_add(1);
        self.log_frame();
        self.idle = false;
        Ok(())
    }
}
