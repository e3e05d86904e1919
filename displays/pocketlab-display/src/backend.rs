//! Display backend trait
//!
//! Defines the interface to the dot-matrix display. Coordinates are in
//! pixels; text is drawn with a fixed 6x8 font on 9-pixel line pitch.

/// Display width in pixels (and chart columns)
pub const DISPLAY_WIDTH: u8 = 84;

/// Display height in pixels
pub const DISPLAY_HEIGHT: u8 = 48;

/// Display backend errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayError {
    /// Communication error with display
    Communication,
    /// Display not initialized
    NotInitialized,
    /// Buffer overflow
    BufferOverflow,
}

/// Chart bar fill pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BarPattern {
    /// Every pixel set
    Solid,
    /// Alternating pixels, offset by column parity
    Dotted,
}

/// Backlight selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Backlight {
    /// Normal operation
    Main,
    /// Auxiliary color, signals hold
    Aux,
}

/// Display backend trait
///
/// Drawing calls edit a local frame buffer and cannot fail; only
/// [`flush`](DisplayBackend::flush) talks to the hardware.
pub trait DisplayBackend {
    /// Clear the frame buffer
    fn clear(&mut self);

    /// Position the text cursor at pixel (`x`, `y`)
    fn cursor(&mut self, x: u8, y: u8);

    /// Advance the text cursor horizontally by `dx` pixels
    fn move_cursor(&mut self, dx: u8);

    /// Draw one character at the cursor and advance it
    fn print_char(&mut self, ch: u8);

    /// Draw a string at the cursor
    fn print_str(&mut self, text: &str) {
        for ch in text.bytes() {
            self.print_char(ch);
        }
    }

    /// Draw a chart bar `value` pixels tall in `column`
    fn bar(&mut self, value: i16, column: u8, pattern: BarPattern);

    /// Erase the chart bar in `column`
    fn clear_bar(&mut self, column: u8);

    /// Invert the 9-pixel text line starting at pixel row `y`
    fn invert_line(&mut self, y: u8);

    /// Draw the progress bar, or hide it with `None`
    fn progress_bar(&mut self, counter: Option<u8>);

    /// Draw the idle indicator
    fn idle(&mut self);

    /// Select the backlight
    fn backlight(&mut self, backlight: Backlight);

    /// Whether a refresh tick has elapsed since the last call
    ///
    /// Edge triggered: returns `true` once per physical refresh.
    fn update_pending(&mut self) -> bool;

    /// Send the frame buffer to the display
    fn flush(&mut self) -> Result<(), DisplayError>;
}
