//! Charge integration
//!
//! The ammeter stream is summed per second, corrected by the zero offset
//! measured during calibration, and the per-second averages accumulate
//! into the charge total.

use core::fmt;

use crate::analog::reading::sign;
use crate::analog::Reading;
use crate::chart::{Chart, ChartSpeed};

/// Seconds spent measuring the zero offset
pub const CALIBRATION_SECONDS: u8 = 4;

/// Ammeter counts per milliamp
const COUNTS_PER_MA: i64 = 2;

/// Accumulated counts per milliamp-hour
const COUNTS_PER_MAH: i64 = 3600 * COUNTS_PER_MA;

/// Accumulated counts per displayed hundredth of a milliamp-hour
const COUNTS_PER_STEP: i64 = 36 * COUNTS_PER_MA;

/// Time since counting started, wrapping after 99:59:59
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Elapsed {
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
}

impl Elapsed {
    pub fn tick(&mut self) {
        self.seconds += 1;
        if self.seconds < 60 {
            return;
        }
        self.seconds = 0;
        self.minutes += 1;
        if self.minutes < 60 {
            return;
        }
        self.minutes = 0;
        self.hours += 1;
        if self.hours >= 100 {
            self.hours = 0;
        }
    }
}

impl fmt::Display for Elapsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hours, self.minutes, self.seconds)
    }
}

/// Charge accumulator with its chart
#[derive(Debug, Clone)]
pub struct ChargeMeter {
    chart: Chart,
    column_samples: u16,
    column_max: i16,
    column_total: i32,
    offset_total: i64,
    offset_count: u32,
    /// Samples of the running second
    accum: i64,
    period: u32,
    /// Sum of per-second average counts
    value: i64,
    elapsed: Elapsed,
}

impl Default for ChargeMeter {
    fn default() -> Self {
        Self::new()
    }
}

impl ChargeMeter {
    pub const fn new() -> Self {
        Self {
            chart: Chart::new(),
            column_samples: 1,
            column_max: 0,
            column_total: 0,
            offset_total: 0,
            offset_count: 0,
            accum: 0,
            period: 0,
            value: 0,
            elapsed: Elapsed {
                hours: 0,
                minutes: 0,
                seconds: 0,
            },
        }
    }

    /// Blank the chart and forget the offset
    pub fn init(&mut self) {
        self.chart.init();
        self.offset_total = 0;
        self.offset_count = 0;
        self.column_max = 0;
        self.column_total = 0;
        self.clear();
    }

    /// Zero the charge and the elapsed time
    pub fn clear(&mut self) {
        self.value = 0;
        self.accum = 0;
        self.period = 0;
        self.elapsed = Elapsed::default();
    }

    pub fn set_speed(&mut self, speed: ChartSpeed) {
        self.column_samples = self.chart.set_speed(speed);
        self.column_total = 0;
    }

    /// Account one sample of the shorted input
    pub fn calibrate(&mut self, sample: i16) {
        self.offset_total += sample as i64;
        self.offset_count += 1;
    }

    /// Zero offset per sample, in hundredths of a count
    pub fn offset(&self) -> i64 {
        if self.offset_count == 0 {
            0
        } else {
            self.offset_total * 100 / self.offset_count as i64
        }
    }

    /// Account one ammeter sample; `true` when it completed a chart column
    pub fn push(&mut self, sample: i16) -> bool {
        self.column_max = self.column_max.max(sample);
        self.column_total += sample as i32;
        self.accum += sample as i64;
        self.period += 1;
        if !self.chart.sample() {
            return false;
        }
        let avg = self.column_total / self.column_samples.max(1) as i32;
        self.chart.value(self.column_max, avg as i16, 0);
        self.column_max = 0;
        self.column_total = 0;
        true
    }

    /// Close the running second
    pub fn second(&mut self) {
        if self.period > 0 {
            let period = self.period as i64;
            let offset = if self.offset_count == 0 {
                0
            } else {
                self.offset_total * period / self.offset_count as i64
            };
            self.accum += period / 2 - offset;
            self.value += self.accum / period;
        }
        self.accum = 0;
        self.period = 0;
        self.elapsed.tick();
    }

    /// Accumulated count-seconds
    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn elapsed(&self) -> Elapsed {
        self.elapsed
    }

    pub fn reading(&self) -> Reading {
        reading(self.value)
    }

    pub fn chart(&self) -> &Chart {
        &self.chart
    }

    pub fn chart_mut(&mut self) -> &mut Chart {
        &mut self.chart
    }
}

/// Format accumulated count-seconds as milliamp-hours
pub fn reading(value: i64) -> Reading {
    let value = value + COUNTS_PER_STEP / 2;
    let negative = value < 0;
    let value = value.unsigned_abs();
    let milli = value / COUNTS_PER_MAH as u64;
    let micro = (value % COUNTS_PER_MAH as u64) / COUNTS_PER_STEP as u64;
    if milli < 10 {
        let negative = negative && (milli > 0 || micro > 0);
        Reading::value(format_args!("{}{}.{:02}", sign(negative), milli, micro))
    } else if milli < 100 {
        Reading::value(format_args!("{}{:2}.{}", sign(negative), milli, micro / 10))
    } else if milli < 10_000 {
        Reading::value(format_args!("{}{:4}", sign(negative), milli))
    } else {
        Reading::overload(negative).align_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calibrated(offset: i16) -> ChargeMeter {
        let mut meter = ChargeMeter::new();
        meter.init();
        meter.set_speed(ChartSpeed::SLOWEST);
        for _ in 0..1000 {
            meter.calibrate(offset);
        }
        meter
    }

    fn run_second(meter: &mut ChargeMeter, sample: i16) {
        for _ in 0..1000 {
            meter.push(sample);
        }
        meter.second();
    }

    #[test]
    fn test_offset_is_subtracted() {
        let mut meter = calibrated(10);
        assert_eq!(meter.offset(), 1000);
        run_second(&mut meter, 210);
        assert_eq!(meter.value(), 200);
    }

    #[test]
    fn test_one_milliamp_hour() {
        let mut meter = calibrated(0);
        // 100 mA for 36 s
        for _ in 0..36 {
            run_second(&mut meter, 200);
        }
        assert_eq!(meter.reading().text.as_str(), " 1.00");
        assert_eq!(meter.elapsed().seconds, 36);
    }

    #[test]
    fn test_idle_second_only_ticks() {
        let mut meter = calibrated(5);
        meter.second();
        assert_eq!(meter.value(), 0);
        assert_eq!(meter.elapsed().seconds, 1);
    }

    #[test]
    fn test_clear_restarts_count() {
        let mut meter = calibrated(3);
        run_second(&mut meter, 400);
        meter.clear();
        assert_eq!(meter.value(), 0);
        assert_eq!(meter.elapsed(), Elapsed::default());
        assert_eq!(meter.offset(), 300);
    }

    #[test]
    fn test_reading_ranges() {
        assert_eq!(reading(0).text.as_str(), " 0.00");
        assert_eq!(reading(-100).text.as_str(), " 0.00");
        assert_eq!(reading(-7200).text.as_str(), "-0.99");
        assert_eq!(reading(-7272).text.as_str(), "-1.00");
        assert_eq!(reading(12 * 7200 + 3 * 720).text.as_str(), " 12.3");
        assert_eq!(reading(500 * 7200).text.as_str(), "  500");
        let overload = reading(10_000 * 7200);
        assert!(overload.overload);
        assert_eq!(overload.lead, 6);
    }

    #[test]
    fn test_elapsed_wraps() {
        let mut elapsed = Elapsed {
            hours: 99,
            minutes: 59,
            seconds: 59,
        };
        elapsed.tick();
        assert_eq!(elapsed, Elapsed::default());

        let mut elapsed = Elapsed {
            hours: 1,
            minutes: 2,
            seconds: 59,
        };
        elapsed.tick();
        let mut text: heapless::String<8> = heapless::String::new();
        core::fmt::Write::write_fmt(&mut text, format_args!("{}", elapsed)).unwrap();
        assert_eq!(text.as_str(), "01:03:00");
    }
}
