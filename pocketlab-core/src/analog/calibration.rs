//! ADC trim adjustment

use crate::config::{AnalogSettings, GAIN_MIDPOINT, GAIN_RANGE, OFFSET_RANGE};

/// Gain trim step; the lowest gain bit is not used
const GAIN_STEP: u16 = 2;

/// One trim adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TrimStep {
    OffsetDown,
    OffsetUp,
    GainDown,
    GainUp,
}

impl TrimStep {
    /// Adjust `settings`, stopping at the trim limits
    pub fn apply(self, settings: &mut AnalogSettings) {
        match self {
            TrimStep::OffsetDown if settings.offset > -OFFSET_RANGE => settings.offset -= 1,
            TrimStep::OffsetUp if settings.offset < OFFSET_RANGE => settings.offset += 1,
            TrimStep::GainDown if settings.gain > GAIN_MIDPOINT - GAIN_RANGE => {
                settings.gain -= GAIN_STEP
            }
            TrimStep::GainUp if settings.gain < GAIN_MIDPOINT + GAIN_RANGE => {
                settings.gain += GAIN_STEP
            }
            _ => {}
        }
    }

    /// Whether the step adjusts the offset rather than the gain
    pub fn is_offset(self) -> bool {
        matches!(self, TrimStep::OffsetDown | TrimStep::OffsetUp)
    }
}

/// Split a gain trim into the integer and thousandths shown on screen
///
/// The gain is a fixed-point factor with unity at [`GAIN_MIDPOINT`], so
/// one step either side shows as `1.001` or `0.999`.
pub fn gain_parts(gain: u16) -> (u8, u16) {
    let integer = (gain >> 11) as u8;
    let mut fraction = (gain >> 1) & 0x03FF;
    if fraction > 0x0200 {
        fraction = 999 - (0x03FF - fraction);
    }
    (integer, fraction)
}
