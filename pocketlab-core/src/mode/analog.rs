//! Voltmeter and ammeter

use core::marker::PhantomData;

use pocketlab_display::{Backlight, DisplayBackend};
use pocketlab_hal::{Acquisition, AnalogFrontEnd, Crossing, Producer, Trigger};

use super::{persist, Event, Io, Mode};
use crate::analog::{AnalogEngine, AutoZoom, Quantity, ZoomAction};
use crate::chart::ChartSpeed;
use crate::config::{load_settings, AnalogSettings};
use crate::input::Key;
use crate::traits::Platform;

/// Result text position
const RESULT_POSITION: (u8, u8) = (8, 1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum Phase {
    /// Discarding conversions taken while the input settled
    Flush,
    Running,
}

/// Charting meter for one analog [`Quantity`]
#[derive(Debug, Clone)]
pub struct AnalogMode<Q: Quantity> {
    settings: AnalogSettings,
    engine: AnalogEngine,
    zoom: AutoZoom,
    phase: Phase,
    hold: bool,
    quantity: PhantomData<Q>,
}

impl<Q: Quantity> Default for AnalogMode<Q> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Q: Quantity> AnalogMode<Q> {
    pub const fn new() -> Self {
        Self {
            settings: AnalogSettings {
                offset: 0,
                gain: crate::config::GAIN_MIDPOINT,
                speed: ChartSpeed::SLOWEST,
            },
            engine: AnalogEngine::new(),
            zoom: AutoZoom::new(),
            phase: Phase::Flush,
            hold: false,
            quantity: PhantomData,
        }
    }

    pub fn settings(&self) -> &AnalogSettings {
        &self.settings
    }

    pub fn engine(&self) -> &AnalogEngine {
        &self.engine
    }

    pub fn is_hold(&self) -> bool {
        self.hold
    }

    pub fn is_zoomed(&self) -> bool {
        self.zoom.is_windowed()
    }

    fn set_speed<P: Platform>(&mut self, speed: Option<ChartSpeed>, io: &mut Io<'_, P>) {
        if let Some(speed) = speed {
            self.settings.speed = speed;
            self.engine.set_speed(speed);
            persist(io, Q::STORAGE_KEY, &self.settings).ok();
        }
    }

    fn apply<P: Platform>(&mut self, action: ZoomAction, io: &mut Io<'_, P>) {
        match action {
            ZoomAction::None => {}
            ZoomAction::Enter { compare } => {
                io.acquisition.stop();
                io.front_end.watch(compare, Crossing::Below);
                if !self.hold {
                    io.front_end.restart_trigger_timeout();
                }
                io.buffer.clear();
            }
            ZoomAction::ArmAbove { trigger } => io.front_end.watch(trigger, Crossing::Above),
            ZoomAction::Resume => {
                io.front_end.unwatch();
                io.buffer.clear();
                if !self.hold {
                    io.acquisition.start();
                }
            }
        }
    }

    fn render<P: Platform>(&mut self, io: &mut Io<'_, P>) {
        self.engine.chart_mut().update(io.display);
        io.display.cursor(RESULT_POSITION.0, RESULT_POSITION.1);
        Q::reading(self.engine.value()).render(io.display, Q::UNIT);
        if self.hold {
            io.display.invert_line(0);
        }
        if self.settings.speed <= ChartSpeed::SPEED_4 {
            self.engine.chart().marker(io.display);
        }
    }
}

impl<Q: Quantity> Mode for AnalogMode<Q> {
    fn on_enter<P: Platform>(&mut self, io: &mut Io<'_, P>) {
        self.settings = load_settings(io.settings, Q::STORAGE_KEY);
        io.front_end.set_trim(self.settings.offset, self.settings.gain);
        io.front_end.select_input(Q::INPUT);
        io.front_end.unwatch();
        self.engine.init();
        self.zoom.reset();
        self.hold = false;
        self.phase = Phase::Flush;
        io.buffer.init(Producer::AdcResult);
        io.acquisition.configure(Producer::AdcResult, Trigger::Free);
    }

    fn on_exit<P: Platform>(&mut self, io: &mut Io<'_, P>) {
        io.acquisition.stop();
        io.front_end.unwatch();
    }

    fn drain_and_render<P: Platform>(&mut self, io: &mut Io<'_, P>) {
        if self.phase == Phase::Flush {
            if io.buffer.flush() {
                self.engine.set_speed(self.settings.speed);
                self.phase = Phase::Running;
            }
            return;
        }

        while !io.buffer.is_empty() {
            if !self.engine.push(io.buffer.get_sample()) {
                continue;
            }
            let chart = self.engine.chart();
            let action = self
                .zoom
                .check(self.settings.speed, chart.column(), chart.max(), chart.min());
            self.apply(action, io);
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
            Key::K1 => self.set_speed(self.settings.speed.slower(ChartSpeed::SLOWEST), io),
            Key::K2 => self.set_speed(self.settings.speed.faster(ChartSpeed::FASTEST), io),
            Key::K3 => {
                self.hold = !self.hold;
                if self.hold {
                    io.acquisition.stop();
                    io.display.backlight(Backlight::Aux);
                } else {
                    io.acquisition.start();
                    io.display.backlight(Backlight::Main);
                }
            }
            Key::K4 => self.engine.chart_mut().toggle_lock(),
            _ => {}
        }
    }

    fn on_event<P: Platform>(&mut self, event: Event, io: &mut Io<'_, P>) {
        let action = match event {
            Event::ResultTick => {
                self.engine.result_tick();
                return;
            }
            Event::Comparator(crossing) => self.zoom.crossing(crossing),
            Event::TriggerTimeout => self.zoom.timeout(),
            _ => return,
        };
        self.apply(action, io);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analog::{Current, Voltage};
    use crate::chart::CHART_COLUMNS;
    use crate::config::save_settings;
    use crate::testing::{DrawOp, Rig};
    use pocketlab_hal::{AnalogInput, StorageKey};

    fn entered<Q: Quantity>(rig: &mut Rig, speed: ChartSpeed) -> AnalogMode<Q> {
        let settings = AnalogSettings {
            speed,
            ..AnalogSettings::default()
        };
        save_settings(&mut rig.settings, Q::STORAGE_KEY, &settings).unwrap();
        let mut mode = AnalogMode::<Q>::new();
        mode.on_enter(&mut rig.io());
        for _ in 0..8 {
            mode.drain_and_render(&mut rig.io());
        }
        mode
    }

    #[test]
    fn test_enter_wires_adc() {
        let mut rig = Rig::new();
        let mut mode = AnalogMode::<Current>::new();
        mode.on_enter(&mut rig.io());
        assert_eq!(rig.front_end.input, Some(AnalogInput::Current));
        assert_eq!(rig.front_end.trim, Some((0, crate::config::GAIN_MIDPOINT)));
        assert_eq!(rig.acquisition.producer, Some(Producer::AdcResult));
        assert_eq!(rig.acquisition.trigger, Some(Trigger::Free));
        assert!(rig.settings.contains(StorageKey::Current));
    }

    #[test]
    fn test_flush_discards_settling_samples() {
        let mut rig = Rig::new();
        let mut mode = AnalogMode::<Voltage>::new();
        mode.on_enter(&mut rig.io());
        rig.push_samples(&[4000; 10]);
        mode.drain_and_render(&mut rig.io());
        assert!(rig.buffer.is_empty());
        assert_eq!(mode.engine().chart().column(), u8::MAX);
    }

    #[test]
    fn test_result_follows_window_average() {
        let mut rig = Rig::new();
        let mut mode = entered::<Voltage>(&mut rig, ChartSpeed::new(9).unwrap());
        rig.push_samples(&[1230, 1250]);
        mode.drain_and_render(&mut rig.io());
        // the jump from zero latched the peak for one tick
        mode.on_event(Event::ResultTick, &mut rig.io());
        assert_eq!(mode.engine().value(), 1250);
        mode.on_event(Event::ResultTick, &mut rig.io());

        rig.display.pending = true;
        mode.drain_and_render(&mut rig.io());
        assert!(rig.display.text().contains(" 1.24V"));
        assert!(rig.display.contains(DrawOp::Cursor(8, 1)));
        assert!(!rig.display.contains(DrawOp::ClearBar(0)));
    }

    #[test]
    fn test_slow_speed_shows_marker() {
        let mut rig = Rig::new();
        let mut mode = entered::<Voltage>(&mut rig, ChartSpeed::SLOWEST);
        rig.push_samples(&[0; 1000]);
        rig.display.pending = true;
        mode.drain_and_render(&mut rig.io());
        assert!(rig.display.contains(DrawOp::ClearBar(0)));
    }

    #[test]
    fn test_speed_keys_persist_and_clamp() {
        let mut rig = Rig::new();
        let mut mode = entered::<Current>(&mut rig, ChartSpeed::FASTEST);
        mode.on_key(Key::K2, &mut rig.io());
        assert_eq!(mode.settings().speed, ChartSpeed::FASTEST);

        mode.on_key(Key::K1, &mut rig.io());
        let stored: AnalogSettings = load_settings(&mut rig.settings, StorageKey::Current);
        assert_eq!(stored.speed, ChartSpeed::new(9).unwrap());
    }

    #[test]
    fn test_hold_blocks_other_keys() {
        let mut rig = Rig::new();
        let mut mode = entered::<Voltage>(&mut rig, ChartSpeed::SPEED_4);
        mode.on_key(Key::K3, &mut rig.io());
        assert!(mode.is_hold());
        assert!(!rig.acquisition.running);
        assert_eq!(rig.display.backlight, Backlight::Aux);

        mode.on_key(Key::K2, &mut rig.io());
        assert_eq!(mode.settings().speed, ChartSpeed::SPEED_4);

        rig.display.pending = true;
        mode.drain_and_render(&mut rig.io());
        assert!(rig.display.contains(DrawOp::InvertLine(0)));

        mode.on_key(Key::K3, &mut rig.io());
        assert!(rig.acquisition.running);
        assert_eq!(rig.display.backlight, Backlight::Main);
    }

    #[test]
    fn test_lock_key() {
        let mut rig = Rig::new();
        let mut mode = entered::<Voltage>(&mut rig, ChartSpeed::SPEED_4);
        mode.on_key(Key::K4, &mut rig.io());
        assert!(mode.engine().chart().is_locked());
    }

    #[test]
    fn test_auto_zoom_cycle() {
        let mut rig = Rig::new();
        let mut mode = entered::<Voltage>(&mut rig, ChartSpeed::FASTEST);

        // a square wave, then one refresh so the chart knows its extremes
        let wave: std::vec::Vec<i16> = (0..CHART_COLUMNS - 1)
            .map(|column| if column % 10 < 5 { 0 } else { 1000 })
            .collect();
        rig.push_samples(&wave);
        rig.display.pending = true;
        mode.drain_and_render(&mut rig.io());
        assert!(!mode.is_zoomed());

        rig.push_samples(&[1000]);
        mode.drain_and_render(&mut rig.io());
        assert!(mode.is_zoomed());
        assert!(!rig.acquisition.running);
        assert_eq!(rig.front_end.watching, Some((250, Crossing::Below)));
        assert_eq!(rig.front_end.timeout_restarts, 1);

        for _ in 0..3 {
            mode.on_event(Event::Comparator(Crossing::Below), &mut rig.io());
        }
        assert_eq!(rig.front_end.watching, Some((500, Crossing::Above)));

        mode.on_event(Event::Comparator(Crossing::Above), &mut rig.io());
        assert!(!mode.is_zoomed());
        assert_eq!(rig.front_end.watching, None);
        assert!(rig.acquisition.running);
    }

    #[test]
    fn test_trigger_timeout_resumes() {
        let mut rig = Rig::new();
        let mut mode = entered::<Voltage>(&mut rig, ChartSpeed::FASTEST);
        let wave: std::vec::Vec<i16> = (0..CHART_COLUMNS)
            .map(|column| if column % 2 == 0 { -500 } else { 500 })
            .collect();
        rig.push_samples(&wave[..CHART_COLUMNS - 1]);
        rig.display.pending = true;
        mode.drain_and_render(&mut rig.io());
        rig.push_samples(&wave[CHART_COLUMNS - 1..]);
        mode.drain_and_render(&mut rig.io());
        assert!(mode.is_zoomed());

        mode.on_event(Event::TriggerTimeout, &mut rig.io());
        assert!(!mode.is_zoomed());
        assert!(rig.acquisition.running);
    }

    #[test]
    fn test_exit_disarms_comparator() {
        let mut rig = Rig::new();
        let mut mode = entered::<Voltage>(&mut rig, ChartSpeed::FASTEST);
        rig.front_end.watch(10, Crossing::Below);
        mode.on_exit(&mut rig.io());
        assert_eq!(rig.front_end.watching, None);
        assert!(!rig.acquisition.running);
    }
}
