//! Window statistics for the ADC stream

use crate::chart::{Chart, ChartSpeed, FULL_SCALE};

/// Rise over the previous window maximum that latches a peak, before scaling
const PEAK_MARGIN: i16 = 100;

/// Folds ADC samples into chart columns and tracks the displayed value
///
/// Each completed window stores (max, avg, min) in the chart. The value
/// shown by the result text is refreshed from the last window average on
/// every result tick, except that a sudden rise latches the window
/// maximum and holds it for one extra tick so short peaks stay readable.
#[derive(Debug, Clone)]
pub struct AnalogEngine {
    chart: Chart,
    window: u16,
    total: i32,
    max: i16,
    min: i16,
    /// Non-negative maximum of the previous window
    last: i16,
    avg: i16,
    value: i16,
    hold_peak: bool,
}

impl Default for AnalogEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalogEngine {
    pub const fn new() -> Self {
        Self {
            chart: Chart::new(),
            window: 1,
            total: 0,
            max: i16::MIN,
            min: i16::MAX,
            last: 0,
            avg: 0,
            value: 0,
            hold_peak: false,
        }
    }

    /// Unlock the chart scale and blank every column
    pub fn init(&mut self) {
        self.chart.init();
        self.value = 0;
        self.avg = 0;
        self.last = 0;
        self.hold_peak = false;
        self.restart_window();
    }

    /// Select the chart speed and restart the current window
    pub fn set_speed(&mut self, speed: ChartSpeed) {
        self.window = self.chart.set_speed(speed);
        self.restart_window();
    }

    fn restart_window(&mut self) {
        self.total = 0;
        self.max = i16::MIN;
        self.min = i16::MAX;
    }

    /// Account one sample; `true` when it completed a chart column
    pub fn push(&mut self, sample: i16) -> bool {
        self.max = self.max.max(sample);
        self.min = self.min.min(sample);
        self.total += sample as i32;
        if !self.chart.sample() {
            return false;
        }

        self.avg = (self.total / self.window.max(1) as i32) as i16;
        self.chart.value(self.max, self.avg, self.min);
        let threshold = self.max / FULL_SCALE + PEAK_MARGIN;
        if (self.max as i32 - self.last as i32) > threshold as i32 {
            self.value = self.max;
            self.hold_peak = true;
        }
        self.last = self.max.max(0);
        self.restart_window();
        true
    }

    /// Result refresh interval elapsed
    pub fn result_tick(&mut self) {
        if self.hold_peak {
            self.hold_peak = false;
        } else {
            self.value = self.avg;
        }
    }

    /// Value for the result text
    pub fn value(&self) -> i16 {
        self.value
    }

    pub fn chart(&self) -> &Chart {
        &self.chart
    }

    pub fn chart_mut(&mut self) -> &mut Chart {
        &mut self.chart
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::Column;
    use proptest::prelude::*;

    fn engine(speed: ChartSpeed) -> AnalogEngine {
        let mut engine = AnalogEngine::new();
        engine.init();
        engine.set_speed(speed);
        engine
    }

    #[test]
    fn test_window_statistics() {
        let mut engine = engine(ChartSpeed::new(8).unwrap());
        let samples = [10, -4, 30, 7, 2];
        for (index, &sample) in samples.iter().enumerate() {
            assert_eq!(engine.push(sample), index == samples.len() - 1);
        }
        assert_eq!(
            engine.chart().column_value(0),
            Some(Column {
                max: 30,
                avg: 9,
                min: -4
            })
        );
    }

    #[test]
    fn test_negative_window_keeps_true_max() {
        let mut engine = engine(ChartSpeed::new(9).unwrap());
        engine.push(-300);
        engine.push(-200);
        let column = engine.chart().column_value(0).unwrap();
        assert_eq!(column.max, -200);
        assert_eq!(column.min, -300);
        assert_eq!(column.avg, -250);
    }

    #[test]
    fn test_result_tick_shows_average() {
        let mut engine = engine(ChartSpeed::new(9).unwrap());
        engine.push(40);
        engine.push(60);
        assert_eq!(engine.value(), 0);
        engine.result_tick();
        assert_eq!(engine.value(), 50);
    }

    #[test]
    fn test_peak_survives_one_tick() {
        let mut engine = engine(ChartSpeed::new(9).unwrap());
        engine.push(0);
        engine.push(1000);
        assert_eq!(engine.value(), 1000);

        engine.result_tick();
        assert_eq!(engine.value(), 1000);
        engine.result_tick();
        assert_eq!(engine.value(), 500);
    }

    #[test]
    fn test_slow_rise_is_not_a_peak() {
        let mut engine = engine(ChartSpeed::FASTEST);
        for sample in (0..500).step_by(50) {
            engine.push(sample);
        }
        engine.result_tick();
        assert_eq!(engine.value(), 450);
    }

    #[test]
    fn test_speed_change_restarts_window() {
        let mut engine = engine(ChartSpeed::new(8).unwrap());
        engine.push(500);
        engine.push(500);
        engine.set_speed(ChartSpeed::new(9).unwrap());
        engine.push(2);
        assert!(engine.push(4));
        assert_eq!(engine.chart().column_value(0).unwrap().max, 4);
    }

    #[test]
    fn test_hundred_sample_window_truncates_average() {
        let mut engine = engine(ChartSpeed::SPEED_4);

        // 50 - 10 + 98 * 3 = 334
        let mut completed = 0;
        for index in 0..100 {
            let sample = match index {
                0 => 50,
                1 => -10,
                _ => 3,
            };
            if engine.push(sample) {
                completed += 1;
                assert_eq!(index, 99);
            }
        }
        assert_eq!(completed, 1);
        assert_eq!(
            engine.chart().column_value(0),
            Some(Column {
                max: 50,
                avg: 3,
                min: -10
            })
        );

        // 50 - 10 - 98 * 2 = -156, truncated to -1
        for index in 0..100 {
            engine.push(match index {
                0 => 50,
                1 => -10,
                _ => -2,
            });
        }
        assert_eq!(
            engine.chart().column_value(1),
            Some(Column {
                max: 50,
                avg: -1,
                min: -10
            })
        );
    }

    proptest! {
        #[test]
        fn test_window_matches_reference(
            samples in proptest::collection::vec(-2000i16..2000, 20),
        ) {
            let mut engine = engine(ChartSpeed::new(6).unwrap());
            for &sample in &samples {
                engine.push(sample);
            }
            let column = engine.chart().column_value(0).unwrap();
            let total: i32 = samples.iter().map(|&s| s as i32).sum();
            prop_assert_eq!(column.max, *samples.iter().max().unwrap());
            prop_assert_eq!(column.min, *samples.iter().min().unwrap());
            prop_assert_eq!(column.avg as i32, total / 20);
        }
    }
}
