//! Frequency estimation
//!
//! Every sample is the number of input edges counted during one RTC tick
//! (1/1024 s). While the count is steady the estimate averages a growing
//! window of ticks, doubling up to 64; a jump of more than 1/8 restarts
//! the window at one tick so steps show up immediately. Below the
//! counting threshold the estimate switches to the averaged input period.

use crate::analog::Reading;
use crate::chart::{Chart, ChartSpeed};

use super::PeriodReading;

/// RTC ticks per second
pub const TICK_RATE: u32 = 1024;

/// Edges per tick at or below which the period is used instead (~11 kHz)
pub const COUNT_THRESHOLD: u16 = 11;

/// Period averaging interval
pub const PERIOD_READ_MS: u64 = 64;

/// Periods captured per averaging interval
const PERIOD_SLOTS: usize = 8;

/// Shortest period worth reporting, in microseconds
const PERIOD_FLOOR: u32 = 1_000_000 / ((COUNT_THRESHOLD as u32 + 1) * TICK_RATE);

/// Widest averaging window, in ticks
const MAX_WINDOW: u8 = 64;

/// Largest frequency shown before overload, in Hz
const FULL_SCALE_HZ: u32 = 4_010_000;

/// Edge count and period combiner
#[derive(Debug, Clone)]
pub struct FrequencyEngine {
    chart: Chart,
    history: [u16; MAX_WINDOW as usize],
    head: usize,
    /// Ticks averaged by the estimate
    window: u8,
    /// Ticks since the window last restarted
    steady: u8,
    counter: u8,
    /// Recomputes left before the estimate settles
    show: u8,
    /// A step reversed direction before the window settled
    skip: bool,
    rising: bool,
    last: u16,
    column_max: u16,
    column_total: u32,
    column_samples: u16,
    period: u16,
    sync: u8,
    value: u32,
}

impl Default for FrequencyEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FrequencyEngine {
    pub const fn new() -> Self {
        Self {
            chart: Chart::new(),
            history: [0; MAX_WINDOW as usize],
            head: 0,
            window: 1,
            steady: 0,
            counter: 0,
            show: 0,
            skip: false,
            rising: false,
            last: 0,
            column_max: 0,
            column_total: 0,
            column_samples: 1,
            period: 0,
            sync: 0,
            value: 0,
        }
    }

    pub fn init(&mut self) {
        self.chart.init();
        self.value = 0;
        self.period = 0;
        self.sync = 0;
        self.restart();
    }

    /// Forget the tick history; used after the stream was interrupted
    pub fn restart(&mut self) {
        self.history = [0; MAX_WINDOW as usize];
        self.head = 0;
        self.window = 1;
        self.steady = 0;
        self.show = 0;
        self.skip = false;
        self.last = 0;
        self.column_max = 0;
        self.column_total = 0;
    }

    pub fn set_speed(&mut self, speed: ChartSpeed) {
        self.column_samples = self.chart.set_speed(speed);
        self.column_total = 0;
        self.column_max = 0;
    }

    /// Apply the latest period average
    pub fn period(&mut self, reading: PeriodReading) {
        match reading {
            PeriodReading::Valid(period) => {
                self.period = period;
                self.sync = 2;
            }
            PeriodReading::Unchanged => {}
            PeriodReading::Missing => {
                self.period = 0;
                self.sync = self.sync.saturating_add(1);
            }
        }
    }

    /// Account one tick count; `true` when it completed a chart column
    pub fn push(&mut self, sample: u16) -> bool {
        self.column_max = self.column_max.max(sample);
        self.column_total += sample as u32;
        self.history[self.head] = sample;
        self.head = (self.head + 1) % self.history.len();

        self.steady = self.steady.wrapping_add(1);
        let tolerance = self.last / 8;
        let rising = sample > self.last;
        if sample > self.last.saturating_add(tolerance) || sample < self.last - tolerance {
            self.steady = 1;
            self.window = 1;
            self.skip = false;
            if self.show == 0 {
                self.show = 2;
                self.rising = rising;
            } else if self.rising != rising {
                self.skip = true;
            }
        }
        self.last = sample;

        if self.window < MAX_WINDOW && (self.steady / 2) & self.window != 0 {
            self.window <<= 1;
            if !self.skip {
                self.show = 2;
            }
        }

        self.counter = self.counter.wrapping_add(1);
        if self.counter == 0 || self.show == 2 || self.sync > 1 {
            self.show = self.show.saturating_sub(1);
            self.counter = 0;
            self.sync = 0;
            self.value = self.estimate(sample);
        }

        if !self.chart.sample() {
            return false;
        }
        let avg = self.column_total / self.column_samples.max(1) as u32;
        self.chart.value(clamp(self.column_max as u32), clamp(avg), 0);
        self.column_max = 0;
        self.column_total = 0;
        true
    }

    fn estimate(&self, sample: u16) -> u32 {
        if sample > COUNT_THRESHOLD {
            let len = self.history.len();
            let total: u32 = (1..=self.window as usize)
                .map(|back| self.history[(self.head + len - back) % len] as u32)
                .sum();
            total * (TICK_RATE / self.window as u32)
        } else if self.period > 0 {
            1_000_000 / self.period as u32
        } else {
            0
        }
    }

    /// Current estimate in Hz
    pub fn value(&self) -> u32 {
        self.value
    }

    /// Ticks averaged by the current estimate
    pub fn window(&self) -> u8 {
        self.window
    }

    pub fn chart(&self) -> &Chart {
        &self.chart
    }

    pub fn chart_mut(&mut self) -> &mut Chart {
        &mut self.chart
    }
}

fn clamp(value: u32) -> i16 {
    value.min(i16::MAX as u32) as i16
}

/// Format a frequency with an auto-ranged unit
pub fn reading(hz: u32) -> (Reading, &'static str) {
    if hz < 1_000 {
        (Reading::value(format_args!("{:5}", hz)), "Hz")
    } else if hz < 10_000 {
        let hz = hz + 5;
        let reading = Reading::value(format_args!("{:2}.{:02}", hz / 1000, (hz % 1000) / 10));
        (reading, "kHz")
    } else if hz < 100_000 {
        let hz = hz + 50;
        let reading = Reading::value(format_args!("{:3}.{}", hz / 1000, (hz % 1000) / 100));
        (reading, "kHz")
    } else if hz < 1_000_000 {
        (Reading::value(format_args!("{:5}", (hz + 500) / 1000)), "kHz")
    } else if hz < FULL_SCALE_HZ {
        let hz = hz + 5000;
        let reading = Reading::value(format_args!(
            "{:2}.{:02}",
            hz / 1_000_000,
            (hz % 1_000_000) / 10_000
        ));
        (reading, "MHz")
    } else {
        (Reading::overload(false), "MHz")
    }
}

/// Collects input periods between averaging intervals
#[derive(Debug, Clone, Default)]
pub struct PeriodAverager {
    periods: heapless::Vec<u16, PERIOD_SLOTS>,
}

impl PeriodAverager {
    pub const fn new() -> Self {
        Self {
            periods: heapless::Vec::new(),
        }
    }

    /// Record one period in microseconds; extra periods are dropped
    pub fn capture(&mut self, period: u16) {
        let _ = self.periods.push(period);
    }

    /// Whether more periods would be dropped
    pub fn is_full(&self) -> bool {
        self.periods.is_full()
    }

    /// Close the interval and average what it captured
    ///
    /// The first period of each interval started before it and is skipped.
    pub fn tick(&mut self) -> PeriodReading {
        let reading = match self.periods.split_first() {
            Some((_, rest)) if !rest.is_empty() => {
                let total: u32 = rest.iter().map(|&period| period as u32).sum();
                let average = total / rest.len() as u32;
                if average > PERIOD_FLOOR {
                    PeriodReading::Valid(average.min(u16::MAX as u32) as u16)
                } else {
                    PeriodReading::Unchanged
                }
            }
            _ => PeriodReading::Missing,
        };
        self.periods.clear();
        reading
    }
}
