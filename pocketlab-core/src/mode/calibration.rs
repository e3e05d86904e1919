//! ADC trim adjustment screen

use core::fmt::Write;
use core::marker::PhantomData;

use pocketlab_display::DisplayBackend;
use pocketlab_hal::{Acquisition, AnalogFrontEnd, Producer, Trigger};

use super::{persist, Event, Io, Mode};
use crate::analog::{gain_parts, Quantity, TrimStep};
use crate::config::{load_settings, AnalogSettings, GAIN_MIDPOINT};
use crate::chart::ChartSpeed;
use crate::input::Key;
use crate::traits::Platform;

/// Highlight rows of the offset and gain lines
const OFFSET_ROW: u8 = 23;
const GAIN_ROW: u8 = 32;

/// Live reading with offset and gain trim keys
///
/// Keys 1 and 2 step the offset, keys 3 and 4 the gain. Every step is
/// applied to the front-end and saved immediately.
#[derive(Debug, Clone)]
pub struct CalibrationMode<Q: Quantity> {
    settings: AnalogSettings,
    latest: i16,
    shown: i16,
    /// Take the next sample for display
    latch: bool,
    selected: Option<u8>,
    quantity: PhantomData<Q>,
}

impl<Q: Quantity> Default for CalibrationMode<Q> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Q: Quantity> CalibrationMode<Q> {
    pub const fn new() -> Self {
        Self {
            settings: AnalogSettings {
                offset: 0,
                gain: GAIN_MIDPOINT,
                speed: ChartSpeed::SLOWEST,
            },
            latest: 0,
            shown: 0,
            latch: true,
            selected: None,
            quantity: PhantomData,
        }
    }

    pub fn settings(&self) -> &AnalogSettings {
        &self.settings
    }

    fn render<D: DisplayBackend>(&mut self, display: &mut D) {
        if self.latch {
            self.latch = false;
            self.shown = self.latest;
        }
        let mut text: heapless::String<16> = heapless::String::new();

        display.clear();
        display.cursor(15, 1);
        display.print_str("ADC CALIB.");
        display.cursor(8, 15);
        display.print_str("VALUE:");
        Q::reading(self.shown).render(display, Q::UNIT);

        let _ = write!(text, "OFFSET:{:6}", self.settings.offset);
        display.cursor(2, 24);
        display.print_str(&text);

        text.clear();
        let (integer, fraction) = gain_parts(self.settings.gain);
        let _ = write!(text, "GAIN:{:2}.{:03}", integer, fraction);
        display.cursor(14, 33);
        display.print_str(&text);

        display.invert_line(0);
        if let Some(row) = self.selected {
            display.invert_line(row);
        }
    }
}

impl<Q: Quantity> Mode for CalibrationMode<Q> {
    fn on_enter<P: Platform>(&mut self, io: &mut Io<'_, P>) {
        self.settings = load_settings(io.settings, Q::STORAGE_KEY);
        self.latch = true;
        self.selected = None;
        io.front_end.set_trim(self.settings.offset, self.settings.gain);
        io.front_end.select_input(Q::INPUT);
        io.front_end.unwatch();
        io.buffer.init(Producer::AdcResult);
        io.acquisition.configure(Producer::AdcResult, Trigger::Free);
    }

    fn drain_and_render<P: Platform>(&mut self, io: &mut Io<'_, P>) {
        while !io.buffer.is_empty() {
            self.latest = io.buffer.get_sample();
        }
        if io.display.update_pending() {
            self.render(io.display);
        }
    }

    fn on_key<P: Platform>(&mut self, key: Key, io: &mut Io<'_, P>) {
        let step = match key {
            Key::K1 => TrimStep::OffsetDown,
            Key::K2 => TrimStep::OffsetUp,
            Key::K3 => TrimStep::GainDown,
            Key::K4 => TrimStep::GainUp,
            _ => return,
        };
        step.apply(&mut self.settings);
        self.selected = Some(if step.is_offset() { OFFSET_ROW } else { GAIN_ROW });
        persist(io, Q::STORAGE_KEY, &self.settings).ok();
        io.front_end.set_trim(self.settings.offset, self.settings.gain);
    }

    fn on_event<P: Platform>(&mut self, event: Event, _io: &mut Io<'_, P>) {
        if event == Event::ResultTick {
            self.latch = true;
        }
    }
}
