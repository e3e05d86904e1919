//! Scrolling text grid for the protocol decoders
//!
//! A 5x14 character buffer that decoders append to. Rows are recycled
//! once the grid is full, so rendering starts from the oldest row after
//! the first roll. Each cell can be flagged as a symbol, which lets glyphs
//! below the printable range through the renderer.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::backend::DisplayBackend;
use crate::glyph::{Symbol, PLACEHOLDER};

/// Number of text rows
pub const GRID_ROWS: usize = 5;

/// Number of characters per row
pub const GRID_COLS: usize = 14;

/// Tab stops every this many columns
pub const TAB_WIDTH: usize = 3;

/// Progress counter wraps after this many new lines
pub const PROGRESS_MAX: u8 = 84;

/// Renders without new output before the idle indicator shows
pub const IDLE_REFRESHES: u16 = 40;

/// Pixel pitch between text rows
const LINE_PITCH: u8 = 9;

/// How data bytes are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TextFormat {
    /// Two hex digits and a tab per byte
    #[default]
    Hex,
    /// The byte itself, `\n` starts a new line
    Ascii,
}

impl TextFormat {
    /// The other format
    pub const fn toggled(self) -> Self {
        match self {
            TextFormat::Hex => TextFormat::Ascii,
            TextFormat::Ascii => TextFormat::Hex,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Row {
    text: [u8; GRID_COLS],
    /// Bit `n` set: cell `n` holds a symbol glyph
    symbols: u16,
    inverted: bool,
}

impl Row {
    const BLANK: Row = Row {
        text: [b' '; GRID_COLS],
        symbols: 0,
        inverted: false,
    };
}

/// Text grid for the digital modes
#[derive(Debug, Clone)]
pub struct TextGrid {
    rows: [Row; GRID_ROWS],
    row: usize,
    column: usize,
    rolled: bool,
    end_line: bool,
    counter: u8,
    idle: u16,
    format: TextFormat,
}

impl Default for TextGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl TextGrid {
    /// Create an empty grid
    pub const fn new() -> Self {
        Self {
            rows: [Row::BLANK; GRID_ROWS],
            row: 0,
            column: 0,
            rolled: false,
            end_line: false,
            counter: 1,
            idle: 0,
            format: TextFormat::Ascii,
        }
    }

    /// Clear the text and restart the progress and idle counters
    pub fn reset(&mut self) {
        self.clear();
        self.end_line = false;
        self.counter = 1;
        self.idle = 0;
    }

    /// Select how [`print`](Self::print) renders bytes
    pub fn set_format(&mut self, format: TextFormat) {
        self.format = format;
    }

    pub fn format(&self) -> TextFormat {
        self.format
    }

    /// Print a data byte in the current format
    pub fn print(&mut self, data: u8) {
        match self.format {
            TextFormat::Hex => {
                self.print_hex(data >> 4);
                self.print_hex(data);
                self.print_tab();
            }
            TextFormat::Ascii => {
                if data == b'\n' {
                    self.new_line();
                } else {
                    self.print_char(data);
                }
            }
        }
    }

    /// Append one character, wrapping to a new line when needed
    pub fn print_char(&mut self, ch: u8) {
        if self.end_line || self.column >= GRID_COLS {
            self.end_line = false;
            self.new_line();
        }
        self.rows[self.row].text[self.column] = ch;
        self.column += 1;
        self.idle = 0;
    }

    /// Append a symbol glyph
    ///
    /// In hex format the symbol is doubled and tabbed so it lines up with
    /// the hex byte columns.
    pub fn print_symbol(&mut self, symbol: Symbol) {
        self.print_char(symbol.code());
        let mut mask = 1u16 << (self.column - 1);
        if self.format == TextFormat::Hex {
            self.print_char(symbol.code());
            mask |= 1 << (self.column - 1);
            self.print_tab();
        }
        self.rows[self.row].symbols |= mask;
    }

    /// Append the low nibble of `nibble` as a hex digit
    pub fn print_hex(&mut self, nibble: u8) {
        let nibble = nibble & 0x0F;
        let ch = if nibble > 9 {
            b'A' + nibble - 10
        } else {
            b'0' + nibble
        };
        self.print_char(ch);
    }

    /// Pad with spaces to the next tab stop, unless that overruns the row
    pub fn print_tab(&mut self) {
        let tab = TAB_WIDTH - (self.column % TAB_WIDTH);
        if self.column + tab > GRID_COLS {
            return;
        }
        for _ in 0..tab {
            self.print_char(b' ');
        }
    }

    /// Start a new line before the next character
    pub fn end_line(&mut self) {
        self.end_line = true;
    }

    /// Move to a fresh line now
    pub fn new_line(&mut self) {
        self.column = 0;
        self.row += 1;
        if self.row >= GRID_ROWS {
            self.row = 0;
            self.rolled = true;
        }
        self.rows[self.row] = Row::BLANK;
        self.counter += 1;
        if self.counter > PROGRESS_MAX {
            self.counter = 1;
        }
    }

    /// Invert the current line
    pub fn invert_line(&mut self) {
        self.rows[self.row].inverted = true;
    }

    /// Blank every row and home the cursor
    pub fn clear(&mut self) {
        self.rows = [Row::BLANK; GRID_ROWS];
        self.row = 0;
        self.column = 0;
        self.rolled = false;
    }

    /// Replace all rendered content with black boxes
    pub fn blackout(&mut self) {
        for row in &mut self.rows {
            for ch in &mut row.text {
                if *ch != b' ' {
                    *ch = Symbol::BlackBox.code();
                }
            }
            row.symbols = (1 << GRID_COLS) - 1;
        }
    }

    /// Restart the idle timeout unless it already expired
    pub fn wake(&mut self) {
        if self.idle < IDLE_REFRESHES {
            self.idle = 0;
        }
    }

    /// Whether the idle timeout expired
    pub fn is_idle(&self) -> bool {
        self.idle >= IDLE_REFRESHES
    }

    /// Progress counter, 1..=84
    pub fn counter(&self) -> u8 {
        self.counter
    }

    /// Cursor position as (row, column)
    pub fn cursor(&self) -> (usize, usize) {
        (self.row, self.column)
    }

    /// Whether a line break is pending
    pub fn is_end_line(&self) -> bool {
        self.end_line
    }

    /// Row index in display order (oldest first once rolled)
    fn display_row(&self, index: usize) -> usize {
        let offset = if self.rolled { self.row + 1 } else { 0 };
        (offset + index) % GRID_ROWS
    }

    /// Text of a row in display order, as rendered
    pub fn line(&self, index: usize) -> [u8; GRID_COLS] {
        let row = &self.rows[self.display_row(index)];
        let mut text = row.text;
        for (x, ch) in text.iter_mut().enumerate() {
            if row.symbols & (1 << x) == 0 && !(32..=127).contains(ch) {
                *ch = PLACEHOLDER;
            }
        }
        text
    }

    /// Whether a row in display order is inverted
    pub fn is_line_inverted(&self, index: usize) -> bool {
        self.rows[self.display_row(index)].inverted
    }

    /// Draw the grid
    ///
    /// While on `hold` the progress bar is hidden and the idle timeout
    /// stops advancing.
    pub fn render<D: DisplayBackend>(&mut self, display: &mut D, hold: bool) {
        display.clear();
        for index in 0..GRID_ROWS {
            let y = index as u8 * LINE_PITCH;
            display.cursor(1, y + 1);
            for ch in self.line(index) {
                display.print_char(ch);
            }
            if self.is_line_inverted(index) {
                display.invert_line(y);
            }
        }
        display.progress_bar(if hold { None } else { Some(self.counter) });
        if self.is_idle() {
            display.idle();
        } else if !hold {
            self.idle += 1;
        }
    }
}
