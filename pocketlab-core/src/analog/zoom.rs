//! Comparator-triggered capture
//!
//! When a fast chart fills up with a swing much larger than its noise
//! floor, sampling is stopped and the window comparator is armed a
//! quarter of the way up the swing. After three crossings below that
//! level it is re-armed at half the swing, and the next crossing above
//! resumes free-running capture. The next sweep therefore starts on a
//! rising edge, which keeps repetitive signals steady on screen.

use pocketlab_hal::Crossing;

use crate::chart::{ChartSpeed, FULL_SCALE, LAST_COLUMN};

/// Crossings below the low threshold before the high one is armed
const BELOW_CROSSINGS: u8 = 3;

/// Minimum swing over the noise floor, before scaling
const SPREAD_MARGIN: i32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum ZoomState {
    FreeRun,
    /// Counting crossings below the low threshold
    Armed { below: u8 },
    /// Waiting for the rise through the high threshold
    Waiting,
}

/// Hardware change requested by the zoom state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ZoomAction {
    None,
    /// Stop sampling and watch for the input falling below `compare`
    Enter { compare: i16 },
    /// Watch for the input rising above `trigger`
    ArmAbove { trigger: i16 },
    /// Disarm the comparator and sample freely again
    Resume,
}

/// Auto-zoom state machine
#[derive(Debug, Clone)]
pub struct AutoZoom {
    state: ZoomState,
    trigger: i16,
}

impl Default for AutoZoom {
    fn default() -> Self {
        Self::new()
    }
}

impl AutoZoom {
    pub const fn new() -> Self {
        Self {
            state: ZoomState::FreeRun,
            trigger: 0,
        }
    }

    pub fn reset(&mut self) {
        self.state = ZoomState::FreeRun;
    }

    /// Comparator capture is in progress
    pub fn is_windowed(&self) -> bool {
        self.state != ZoomState::FreeRun
    }

    /// Called after each completed column
    ///
    /// `max` and `min` are the chart extremes, `column` the column just
    /// written.
    pub fn check(&mut self, speed: ChartSpeed, column: u8, max: i16, min: i16) -> ZoomAction {
        if self.state != ZoomState::FreeRun || speed <= ChartSpeed::SPEED_4 || column != LAST_COLUMN {
            return ZoomAction::None;
        }
        let spread = max as i32 - min as i32;
        if spread < (max / FULL_SCALE) as i32 + SPREAD_MARGIN {
            return ZoomAction::None;
        }
        let min = min as i32;
        self.trigger = (min + spread / 2) as i16;
        self.state = ZoomState::Armed { below: 0 };
        ZoomAction::Enter {
            compare: (min + spread / 4) as i16,
        }
    }

    /// Comparator fired
    pub fn crossing(&mut self, crossing: Crossing) -> ZoomAction {
        match (self.state, crossing) {
            (ZoomState::Armed { below }, Crossing::Below) => {
                let below = below + 1;
                if below < BELOW_CROSSINGS {
                    self.state = ZoomState::Armed { below };
                    ZoomAction::None
                } else {
                    self.state = ZoomState::Waiting;
                    ZoomAction::ArmAbove {
                        trigger: self.trigger,
                    }
                }
            }
            (ZoomState::Waiting, Crossing::Above) => {
                self.state = ZoomState::FreeRun;
                ZoomAction::Resume
            }
            _ => ZoomAction::None,
        }
    }

    /// The trigger timeout expired without a full crossing sequence
    pub fn timeout(&mut self) -> ZoomAction {
        if self.is_windowed() {
            self.state = ZoomState::FreeRun;
            ZoomAction::Resume
        } else {
            ZoomAction::None
        }
    }
}
