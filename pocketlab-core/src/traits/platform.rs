//! Board bundle

use pocketlab_display::DisplayBackend;
use pocketlab_hal::{Acquisition, AnalogFrontEnd, ClockMonitor};

use super::settings::SettingsStore;

/// One concrete implementation of every collaborator
///
/// Modes are generic over a `Platform` so the same logic runs on the
/// board and against the test doubles.
pub trait Platform {
    type Display: DisplayBackend;
    type Acquisition: Acquisition;
    type FrontEnd: AnalogFrontEnd;
    type Clock: ClockMonitor;
    type Settings: SettingsStore;
}
