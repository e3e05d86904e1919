//! Special glyphs
//!
//! Symbol glyphs occupy font codes below the printable range. The text
//! grid renders them only when the cell is marked as a symbol; any other
//! non-printable byte is drawn as [`PLACEHOLDER`].

/// Glyph drawn for non-printable data bytes
pub const PLACEHOLDER: u8 = 127;

/// Font symbols used by the decoders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Symbol {
    /// Parity mismatch
    ParityError = 0x01,
    /// Stop bit at the wrong level
    FrameError = 0x02,
    /// Consumer fell behind the producer
    Overflow = 0x03,
    /// Malformed frame
    Error = 0x04,
    /// Blanked cell after a glitch
    BlackBox = 0x05,
}

impl Symbol {
    /// Font code of the symbol
    pub const fn code(self) -> u8 {
        self as u8
    }
}
