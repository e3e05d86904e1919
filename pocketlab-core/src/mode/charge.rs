//! Charge meter
//!
//! Entry measures the ammeter zero offset on the shorted input for a few
//! seconds, then switches to the shunt and starts counting on the next
//! second boundary.

use core::fmt::Write;

use pocketlab_display::DisplayBackend;
use pocketlab_hal::{Acquisition, AnalogFrontEnd, AnalogInput, Producer, StorageKey, Trigger};

use super::{persist, Event, Io, Mode};
use crate::chart::ChartSpeed;
use crate::config::{load_settings, AnalogSettings, ChargeSettings};
use crate::input::Key;
use crate::measure::{ChargeMeter, CALIBRATION_SECONDS};
use crate::traits::Platform;

const UNIT: &str = "mAh";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum Phase {
    Flush,
    /// Summing the zero offset; keys are disabled
    Calibrating { seconds: u8 },
    /// Waiting for a second boundary to start counting
    Aligning,
    Counting,
}

/// Integrating ammeter
#[derive(Debug, Clone)]
pub struct ChargeMode {
    settings: ChargeSettings,
    meter: ChargeMeter,
    phase: Phase,
    /// Show elapsed time instead of the charge
    timer: bool,
}

impl Default for ChargeMode {
    fn default() -> Self {
        Self::new()
    }
}

impl ChargeMode {
    pub const fn new() -> Self {
        Self {
            settings: ChargeSettings {
                speed: ChartSpeed::SLOWEST,
            },
            meter: ChargeMeter::new(),
            phase: Phase::Flush,
            timer: false,
        }
    }

    pub fn settings(&self) -> &ChargeSettings {
        &self.settings
    }

    pub fn meter(&self) -> &ChargeMeter {
        &self.meter
    }

    pub fn is_calibrating(&self) -> bool {
        matches!(self.phase, Phase::Flush | Phase::Calibrating { .. })
    }

    pub fn is_counting(&self) -> bool {
        self.phase == Phase::Counting
    }

    fn set_speed<P: Platform>(&mut self, speed: Option<ChartSpeed>, io: &mut Io<'_, P>) {
        if let Some(speed) = speed {
            self.settings.speed = speed;
            self.meter.set_speed(speed);
            persist(io, StorageKey::Charge, &self.settings).ok();
        }
    }

    fn render_result<D: DisplayBackend>(&mut self, display: &mut D) {
        self.meter.chart_mut().update(display);
        display.cursor(1, 1);
        self.meter.reading().render(display, UNIT);
    }
}

impl Mode for ChargeMode {
    fn on_enter<P: Platform>(&mut self, io: &mut Io<'_, P>) {
        self.settings = load_settings(io.settings, StorageKey::Charge);
        let trim: AnalogSettings = load_settings(io.settings, StorageKey::Current);
        io.front_end.set_trim(trim.offset, trim.gain);
        io.front_end.select_input(AnalogInput::Zero);
        io.front_end.unwatch();
        self.meter.init();
        self.timer = false;
        self.phase = Phase::Flush;
        io.buffer.init(Producer::AdcResult);
        io.acquisition.configure(Producer::AdcResult, Trigger::Free);
    }

    fn drain_and_render<P: Platform>(&mut self, io: &mut Io<'_, P>) {
        match self.phase {
            Phase::Flush => {
                if io.buffer.flush() {
                    self.meter.init();
                    self.meter.set_speed(self.settings.speed);
                    self.phase = Phase::Calibrating { seconds: 0 };
                }
            }
            Phase::Calibrating { .. } => {
                while !io.buffer.is_empty() {
                    self.meter.calibrate(io.buffer.get_sample());
                }
                if io.display.update_pending() {
                    self.render_result(io.display);
                    io.display.cursor(9, 25);
                    io.display.print_str("CALIBRATION");
                }
            }
            Phase::Aligning => io.buffer.clear(),
            Phase::Counting => {
                while !io.buffer.is_empty() {
                    self.meter.push(io.buffer.get_sample());
                }
                if !io.display.update_pending() {
                    return;
                }
                if self.timer {
                    self.meter.chart_mut().update(io.display);
                    let mut text: heapless::String<8> = heapless::String::new();
                    let _ = write!(text, "{}", self.meter.elapsed());
                    io.display.cursor(3, 1);
                    io.display.print_str(&text);
                } else {
                    self.render_result(io.display);
                }
                self.meter.chart().marker(io.display);
            }
        }
    }

    fn on_key<P: Platform>(&mut self, key: Key, io: &mut Io<'_, P>) {
        if self.is_calibrating() {
            return;
        }
        match key {
            Key::K1 => self.set_speed(self.settings.speed.slower(ChartSpeed::SLOWEST), io),
            Key::K2 => self.set_speed(self.settings.speed.faster(ChartSpeed::SPEED_4), io),
            Key::K3 => self.timer = !self.timer,
            Key::K4 => self.meter.chart_mut().toggle_lock(),
            _ => {}
        }
    }

    fn on_event<P: Platform>(&mut self, event: Event, io: &mut Io<'_, P>) {
        if event != Event::SecondTick {
            return;
        }
        match self.phase {
            Phase::Flush => {}
            Phase::Calibrating { seconds } => {
                let seconds = seconds + 1;
                if seconds < CALIBRATION_SECONDS {
                    self.phase = Phase::Calibrating { seconds };
                } else {
                    io.front_end.select_input(AnalogInput::Current);
                    io.buffer.clear();
                    self.phase = Phase::Aligning;
                }
            }
            Phase::Aligning => {
                self.meter.clear();
                io.buffer.clear();
                self.phase = Phase::Counting;
            }
            Phase::Counting => self.meter.second(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Rig;

    fn calibrating(rig: &mut Rig) -> ChargeMode {
        let mut mode = ChargeMode::new();
        mode.on_enter(&mut rig.io());
        for _ in 0..8 {
            mode.drain_and_render(&mut rig.io());
        }
        assert!(mode.is_calibrating());
        mode
    }

    fn counting(rig: &mut Rig, offset: i16) -> ChargeMode {
        let mut mode = calibrating(rig);
        for _ in 0..CALIBRATION_SECONDS {
            rig.push_samples(&[offset; 100]);
            mode.drain_and_render(&mut rig.io());
            mode.on_event(Event::SecondTick, &mut rig.io());
        }
        mode.on_event(Event::SecondTick, &mut rig.io());
        assert!(mode.is_counting());
        mode
    }

    #[test]
    fn test_calibrates_on_shorted_input() {
        let mut rig = Rig::new();
        let mut mode = calibrating(&mut rig);
        assert_eq!(rig.front_end.input, Some(AnalogInput::Zero));

        rig.push_samples(&[4; 50]);
        rig.display.pending = true;
        mode.drain_and_render(&mut rig.io());
        assert_eq!(mode.meter().offset(), 400);
        assert_eq!(rig.display.text_at(9, 25), "CALIBRATION");
        assert!(rig.display.text().contains(" 0.00mAh"));
    }

    #[test]
    fn test_keys_locked_while_calibrating() {
        let mut rig = Rig::new();
        let mut mode = calibrating(&mut rig);
        mode.on_key(Key::K2, &mut rig.io());
        assert_eq!(mode.settings().speed, ChartSpeed::SLOWEST);
    }

    #[test]
    fn test_switches_to_shunt_after_calibration() {
        let mut rig = Rig::new();
        let mode = counting(&mut rig, 3);
        assert_eq!(rig.front_end.input, Some(AnalogInput::Current));
        assert_eq!(mode.meter().offset(), 300);
        assert_eq!(mode.meter().value(), 0);
    }

    #[test]
    fn test_counts_offset_corrected_charge() {
        let mut rig = Rig::new();
        let mut mode = counting(&mut rig, 10);
        rig.push_samples(&[210; 500]);
        mode.drain_and_render(&mut rig.io());
        mode.on_event(Event::SecondTick, &mut rig.io());
        assert_eq!(mode.meter().value(), 200);
        assert_eq!(mode.meter().elapsed().seconds, 1);
    }

    #[test]
    fn test_timer_view() {
        let mut rig = Rig::new();
        let mut mode = counting(&mut rig, 0);
        mode.on_event(Event::SecondTick, &mut rig.io());
        mode.on_key(Key::K3, &mut rig.io());
        rig.display.pending = true;
        mode.drain_and_render(&mut rig.io());
        assert_eq!(rig.display.text_at(3, 1), "00:00:01");
        assert!(!rig.display.text().contains(UNIT));
    }

    #[test]
    fn test_speed_ceiling_is_level_four() {
        let mut rig = Rig::new();
        let mut mode = counting(&mut rig, 0);
        for _ in 0..5 {
            mode.on_key(Key::K2, &mut rig.io());
        }
        assert_eq!(mode.settings().speed, ChartSpeed::SPEED_4);
        let stored: ChargeSettings = load_settings(&mut rig.settings, StorageKey::Charge);
        assert_eq!(stored.speed, ChartSpeed::SPEED_4);
    }
}
