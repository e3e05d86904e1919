//! RP2040 board bundle
//!
//! Pin map of the reference board:
//!
//! | Function            | GPIO   |
//! |---------------------|--------|
//! | Bus port bits 0-7   | 2-9    |
//! | Bus clock           | 10     |
//! | Bus framing strobe  | 11     |
//! | Frequency counter   | 13     |
//! | Period capture      | 14     |
//! | 1-Wire data         | 15     |
//! | Keys 1-4            | 16-19  |
//! | Serial receiver     | 21     |
//! | ADC voltage/current/zero | 26-28 |

use pocketlab_core::mode::Io;
use pocketlab_core::traits::Platform;
use pocketlab_hal_rp2040::{GlitchClock, Rp2040Acquisition, Rp2040FrontEnd};

use crate::channels::BUFFER;
use crate::display::ConsoleDisplay;
use crate::settings::SettingsCache;

pub struct Rp2040Platform;

impl Platform for Rp2040Platform {
    type Display = ConsoleDisplay;
    type Acquisition = Rp2040Acquisition;
    type FrontEnd = Rp2040FrontEnd;
    type Clock = GlitchClock;
    type Settings = SettingsCache;
}

/// Foreground side of every collaborator, owned by the instrument task
pub struct Board {
    pub display: ConsoleDisplay,
    pub acquisition: Rp2040Acquisition,
    pub front_end: Rp2040FrontEnd,
    pub clock: GlitchClock,
    pub settings: SettingsCache,
}

impl Board {
    pub fn new(settings: SettingsCache) -> Self {
        Self {
            display: ConsoleDisplay::new(),
            acquisition: Rp2040Acquisition::new(),
            front_end: Rp2040FrontEnd::new(),
            clock: GlitchClock::new(),
            settings,
        }
    }

    pub fn io(&mut self) -> Io<'_, Rp2040Platform> {
        Io {
            buffer: &BUFFER,
            display: &mut self.display,
            acquisition: &mut self.acquisition,
            front_end: &mut self.front_end,
            clock: &mut self.clock,
            settings: &mut self.settings,
        }
    }
}
