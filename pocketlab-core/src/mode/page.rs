//! Settings pages
//!
//! A centered title line plus up to three fields. Keys 1-3 each cycle one
//! field and highlight it; the owning mode applies the result on key 4.

use core::fmt::Write;

use pocketlab_display::{DisplayBackend, DISPLAY_WIDTH};

/// One rendered page line
pub type PageLine = heapless::String<16>;

const TITLE_Y: u8 = 1;
const FIELD_X: u8 = 3;
const GLYPH_WIDTH: u8 = 6;
const FIELD_ROWS: [u8; 3] = [15, 24, 33];

/// Highlight rows, one pixel above each field
const SELECT_ROWS: [u8; 3] = [14, 23, 32];

/// Format one page line, truncating what does not fit
pub fn line(args: core::fmt::Arguments<'_>) -> PageLine {
    let mut text = PageLine::new();
    let _ = text.write_fmt(args);
    text
}

/// Left edge of `title` centered on the display
pub fn title_x(title: &str) -> u8 {
    let width = (title.len() as u8).saturating_mul(GLYPH_WIDTH);
    DISPLAY_WIDTH.saturating_sub(width) / 2
}

/// Field highlight state of an open page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettingsPage {
    selected: Option<usize>,
}

impl SettingsPage {
    /// Page with no field highlighted
    pub const fn new() -> Self {
        Self { selected: None }
    }

    /// Highlight field `index`
    pub fn select(&mut self, index: usize) {
        self.selected = (index < FIELD_ROWS.len()).then_some(index);
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Draw the title and fields; caller checks the refresh tick
    pub fn draw<D: DisplayBackend>(&self, display: &mut D, title: &str, fields: &[PageLine]) {
        display.clear();
        display.cursor(title_x(title), TITLE_Y);
        display.print_str(title);
        for (text, y) in fields.iter().zip(FIELD_ROWS) {
            display.cursor(FIELD_X, y);
            display.print_str(text);
        }
        display.invert_line(0);
        if let Some(index) = self.selected {
            display.invert_line(SELECT_ROWS[index]);
        }
    }
}
