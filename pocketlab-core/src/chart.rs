//! Rolling min/max/avg chart shared by the analog modes
//!
//! Each display column holds the statistics of one window of samples.
//! The acquisition loop calls [`Chart::sample`] once per sample and stores
//! a triple with [`Chart::value`] whenever a window completes; the
//! renderer calls [`Chart::update`] once per refresh.

use core::fmt::Write;

use serde::{Deserialize, Serialize};

use pocketlab_display::{BarPattern, DisplayBackend, DISPLAY_WIDTH};

/// Number of chart columns
pub const CHART_COLUMNS: usize = DISPLAY_WIDTH as usize;

/// Bar height, in pixels, of a full-scale value
pub const FULL_SCALE: i16 = 39;

/// Index of the rightmost column
pub const LAST_COLUMN: u8 = (CHART_COLUMNS - 1) as u8;

/// Samples per column for each speed level, slowest first
const WINDOWS: [u16; 10] = [1000, 500, 200, 100, 50, 20, 10, 5, 2, 1];

/// Chart speed level, 1 (slowest) to 10
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChartSpeed(u8);

impl ChartSpeed {
    pub const SLOWEST: ChartSpeed = ChartSpeed(1);
    pub const SPEED_4: ChartSpeed = ChartSpeed(4);
    pub const SPEED_8: ChartSpeed = ChartSpeed(8);
    pub const FASTEST: ChartSpeed = ChartSpeed(10);

    pub const fn new(level: u8) -> Option<Self> {
        if level >= 1 && level <= 10 {
            Some(Self(level))
        } else {
            None
        }
    }

    pub const fn level(self) -> u8 {
        self.0
    }

    /// Samples aggregated into one column
    pub const fn window(self) -> u16 {
        WINDOWS[(self.0 - 1) as usize]
    }

    /// One level slower, unless already at `floor`
    pub fn slower(self, floor: ChartSpeed) -> Option<Self> {
        (self > floor).then(|| Self(self.0 - 1))
    }

    /// One level faster, unless already at `ceiling`
    pub fn faster(self, ceiling: ChartSpeed) -> Option<Self> {
        (self < ceiling).then(|| Self(self.0 + 1))
    }
}

impl Default for ChartSpeed {
    fn default() -> Self {
        Self::SLOWEST
    }
}

/// Statistics of one completed window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Column {
    pub max: i16,
    pub avg: i16,
    pub min: i16,
}

/// Chart state
#[derive(Debug, Clone)]
pub struct Chart {
    columns: [Column; CHART_COLUMNS],
    /// Column written last; starts one before the first column
    column: u8,
    sample: u16,
    window: u16,
    locked: bool,
    scale: u16,
    max: i16,
    min: i16,
}

impl Default for Chart {
    fn default() -> Self {
        Self::new()
    }
}

impl Chart {
    pub const fn new() -> Self {
        Self {
            columns: [Column {
                max: 0,
                avg: 0,
                min: 0,
            }; CHART_COLUMNS],
            column: u8::MAX,
            sample: 0,
            window: 1,
            locked: false,
            scale: 1,
            max: 0,
            min: 0,
        }
    }

    /// Unlock the scale and clear every column
    pub fn init(&mut self) {
        self.locked = false;
        self.clear();
    }

    /// Zero every column and restart at the left edge
    pub fn clear(&mut self) {
        self.column = u8::MAX;
        self.max = 0;
        self.columns = [Column::default(); CHART_COLUMNS];
    }

    /// Select the speed level; returns the samples per column
    pub fn set_speed(&mut self, speed: ChartSpeed) -> u16 {
        self.window = speed.window();
        self.sample = 0;
        self.window
    }

    /// Count one sample; `true` when it completed a column
    pub fn sample(&mut self) -> bool {
        self.sample += 1;
        if self.sample < self.window {
            return false;
        }
        self.sample = 0;
        self.column = self.column.wrapping_add(1);
        if self.column as usize >= CHART_COLUMNS {
            self.column = 0;
        }
        true
    }

    /// Store the statistics of the column just completed
    pub fn value(&mut self, max: i16, avg: i16, min: i16) {
        if let Some(column) = self.columns.get_mut(self.column as usize) {
            *column = Column { max, avg, min };
        }
    }

    /// Column written last
    pub fn column(&self) -> u8 {
        self.column
    }

    pub fn column_value(&self, index: usize) -> Option<Column> {
        self.columns.get(index).copied()
    }

    /// Largest column maximum as of the last update
    pub fn max(&self) -> i16 {
        self.max
    }

    /// Smallest column minimum as of the last update
    pub fn min(&self) -> i16 {
        self.min
    }

    pub fn toggle_lock(&mut self) {
        self.locked = !self.locked;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Divisor applied to values when drawing bars
    pub fn scale(&self) -> u16 {
        self.scale
    }

    /// Recompute the extremes and, unless locked, the scale
    pub fn rescale(&mut self) -> u16 {
        let mut max = i16::MIN;
        let mut min = i16::MAX;
        for column in &self.columns {
            max = max.max(column.max);
            min = min.min(column.min);
        }
        self.max = max;
        self.min = min;
        if !self.locked {
            self.scale = (max / FULL_SCALE + 1).max(1) as u16;
        }
        self.scale
    }

    /// Rescale and draw every column with the scale indicator
    pub fn update<D: DisplayBackend>(&mut self, display: &mut D) {
        let scale = self.rescale();

        let mut text: heapless::String<8> = heapless::String::new();
        let marker = if self.locked { 'L' } else { 'x' };
        let _ = write!(text, "{}{:3}", marker, scale);
        display.cursor(55, 1);
        display.print_str(&text);

        let scale = scale as i32;
        for (index, column) in self.columns.iter().enumerate() {
            let index = index as u8;
            display.bar((column.max as i32 / scale) as i16, index, BarPattern::Dotted);
            display.bar((column.avg as i32 / scale) as i16, index, BarPattern::Solid);
        }
    }

    /// Blank the column being written so the write position stands out
    pub fn marker<D: DisplayBackend>(&self, display: &mut D) {
        if (self.column as usize) < CHART_COLUMNS {
            display.clear_bar(self.column);
        }
    }
}
