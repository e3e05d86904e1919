//! Frequency meter

use pocketlab_display::DisplayBackend;
use pocketlab_hal::{Acquisition, Producer, StorageKey, Trigger};

use super::{persist, Event, Io, Mode};
use crate::chart::ChartSpeed;
use crate::config::{load_settings, FrequencySettings};
use crate::input::Key;
use crate::measure::{freq, FrequencyEngine};
use crate::traits::Platform;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum Phase {
    Flush,
    Running,
}

/// Edge-counting frequency meter with a chart of counts per tick
#[derive(Debug, Clone)]
pub struct FrequencyMode {
    settings: FrequencySettings,
    engine: FrequencyEngine,
    phase: Phase,
    hold: bool,
}

impl Default for FrequencyMode {
    fn default() -> Self {
        Self::new()
    }
}

impl FrequencyMode {
    pub const fn new() -> Self {
        Self {
            settings: FrequencySettings {
                speed: ChartSpeed::SPEED_4,
            },
            engine: FrequencyEngine::new(),
            phase: Phase::Flush,
            hold: false,
        }
    }

    pub fn settings(&self) -> &FrequencySettings {
        &self.settings
    }

    pub fn engine(&self) -> &FrequencyEngine {
        &self.engine
    }

    fn set_speed<P: Platform>(&mut self, speed: Option<ChartSpeed>, io: &mut Io<'_, P>) {
        if let Some(speed) = speed {
            self.settings.speed = speed;
            self.engine.set_speed(speed);
            persist(io, StorageKey::Frequency, &self.settings).ok();
        }
    }

    fn render<P: Platform>(&mut self, io: &mut Io<'_, P>) {
        self.engine.chart_mut().update(io.display);
        io.display.cursor(1, 1);
        let (reading, unit) = freq::reading(self.engine.value());
        reading.render(io.display, unit);
        if reading.overload {
            self.engine.chart_mut().clear();
            io.buffer.clear();
        }
        if self.hold {
            io.display.invert_line(0);
        }
        if self.settings.speed <= ChartSpeed::SPEED_8 {
            self.engine.chart().marker(io.display);
        }
    }
}

impl Mode for FrequencyMode {
    fn on_enter<P: Platform>(&mut self, io: &mut Io<'_, P>) {
        self.settings = load_settings(io.settings, StorageKey::Frequency);
        self.engine.init();
        self.hold = false;
        self.phase = Phase::Flush;
        io.buffer.init(Producer::CaptureA);
        io.acquisition.configure(Producer::CaptureA, Trigger::Free);
    }

    fn drain_and_render<P: Platform>(&mut self, io: &mut Io<'_, P>) {
        if self.phase == Phase::Flush {
            if io.buffer.flush() {
                self.engine.restart();
                self.engine.set_speed(self.settings.speed);
                self.phase = Phase::Running;
            }
            return;
        }

        while !io.buffer.is_empty() {
            self.engine.push(io.buffer.get_word());
        }
        if io.display.update_pending() {
            self.render(io);
        }
    }

    fn on_key<P: Platform>(&mut self, key: Key, io: &mut Io<'_, P>) {
        if self.hold && key != Key::K3 {
            return;
        }
        match key {
            Key::K1 => self.set_speed(self.settings.speed.slower(ChartSpeed::SPEED_4), io),
            Key::K2 => self.set_speed(self.settings.speed.faster(ChartSpeed::FASTEST), io),
            Key::K3 => {
                self.hold = !self.hold;
                if self.hold {
                    io.acquisition.stop();
                } else {
                    io.acquisition.start();
                    self.phase = Phase::Flush;
                }
            }
            Key::K4 => self.engine.chart_mut().toggle_lock(),
            _ => {}
        }
    }

    fn on_event<P: Platform>(&mut self, event: Event, _io: &mut Io<'_, P>) {
        if let Event::Period(reading) = event {
            self.engine.period(reading);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::PeriodReading;
    use crate::testing::{DrawOp, Rig};

    fn running(rig: &mut Rig) -> FrequencyMode {
        let mut mode = FrequencyMode::new();
        mode.on_enter(&mut rig.io());
        for _ in 0..8 {
            mode.drain_and_render(&mut rig.io());
        }
        mode
    }

    fn push_counts(rig: &Rig, count: u16, ticks: usize) {
        for _ in 0..ticks {
            rig.buffer.push_sample(count as i16);
        }
    }

    #[test]
    fn test_enter_wires_capture() {
        let mut rig = Rig::new();
        let mode = running(&mut rig);
        assert_eq!(rig.acquisition.producer, Some(Producer::CaptureA));
        assert_eq!(mode.settings().speed, ChartSpeed::SPEED_4);
    }

    #[test]
    fn test_counts_render_in_khz() {
        let mut rig = Rig::new();
        let mut mode = running(&mut rig);
        push_counts(&rig, 100, 100);
        rig.display.pending = true;
        mode.drain_and_render(&mut rig.io());

        assert_eq!(mode.engine().value(), 102_400);
        assert!(rig.display.text().contains("  102kHz"));
        assert!(rig.display.contains(DrawOp::Cursor(1, 1)));
        assert!(rig.display.contains(DrawOp::ClearBar(0)));
    }

    #[test]
    fn test_low_frequency_uses_period() {
        let mut rig = Rig::new();
        let mut mode = running(&mut rig);
        mode.on_event(Event::Period(PeriodReading::Valid(20_000)), &mut rig.io());
        push_counts(&rig, 0, 1);
        rig.display.pending = true;
        mode.drain_and_render(&mut rig.io());
        assert!(rig.display.text().contains("   50Hz"));
    }

    #[test]
    fn test_overload_clears_chart() {
        let mut rig = Rig::new();
        let mut mode = running(&mut rig);
        push_counts(&rig, 5000, 100);
        rig.display.pending = true;
        mode.drain_and_render(&mut rig.io());
        assert!(rig.display.text().contains(" OVL"));
        assert_eq!(mode.engine().chart().column(), u8::MAX);
    }

    #[test]
    fn test_speed_floor_is_level_four() {
        let mut rig = Rig::new();
        let mut mode = running(&mut rig);
        mode.on_key(Key::K1, &mut rig.io());
        assert_eq!(mode.settings().speed, ChartSpeed::SPEED_4);
        mode.on_key(Key::K2, &mut rig.io());
        let stored: FrequencySettings = load_settings(&mut rig.settings, StorageKey::Frequency);
        assert_eq!(stored.speed, ChartSpeed::new(5).unwrap());
    }

    #[test]
    fn test_release_hold_flushes() {
        let mut rig = Rig::new();
        let mut mode = running(&mut rig);
        mode.on_key(Key::K3, &mut rig.io());
        assert!(!rig.acquisition.running);
        rig.display.pending = true;
        mode.drain_and_render(&mut rig.io());
        assert!(rig.display.contains(DrawOp::InvertLine(0)));

        mode.on_key(Key::K3, &mut rig.io());
        assert!(rig.acquisition.running);
        push_counts(&rig, 100, 4);
        mode.drain_and_render(&mut rig.io());
        assert!(rig.buffer.is_empty());
        assert_eq!(mode.engine().value(), 0);
    }
}
