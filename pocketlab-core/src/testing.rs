//! Test doubles for the collaborator traits

use std::collections::BTreeMap;
use std::string::String;
use std::vec::Vec;

use pocketlab_display::{Backlight, BarPattern, DisplayBackend, DisplayError};
use pocketlab_hal::{
    Acquisition, AnalogFrontEnd, AnalogInput, ClockMonitor, Crossing, Producer, SerialConfig,
    StorageKey, Trigger,
};

use crate::buffer::Buffer;
use crate::mode::Io;
use crate::traits::{Platform, SettingsError, SettingsStore};

/// Clock monitor with a settable minimum period
pub struct FakeClock {
    pub period: u16,
    pub resets: usize,
}

impl FakeClock {
    pub fn new(period: u16) -> Self {
        Self { period, resets: 0 }
    }
}

impl ClockMonitor for FakeClock {
    fn min_period(&self) -> u16 {
        self.period
    }

    fn reset(&mut self) {
        self.resets += 1;
        self.period = u16::MAX;
    }
}

/// One recorded drawing call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawOp {
    Clear,
    Cursor(u8, u8),
    Char(u8),
    Bar {
        value: i16,
        column: u8,
        pattern: BarPattern,
    },
    ClearBar(u8),
    InvertLine(u8),
    Progress(Option<u8>),
    Idle,
    Backlight(Backlight),
}

/// Display that records every call
pub struct RecordingDisplay {
    pub ops: Vec<DrawOp>,
    pub pending: bool,
    pub backlight: Backlight,
    pub flushes: usize,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self {
            ops: Vec::new(),
            pending: false,
            backlight: Backlight::Main,
            flushes: 0,
        }
    }

    /// Every printed character, in order
    pub fn text(&self) -> String {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Char(ch) => Some(*ch as char),
                _ => None,
            })
            .collect()
    }

    /// Characters printed since the last cursor move to (`x`, `y`)
    pub fn text_at(&self, x: u8, y: u8) -> String {
        let start = self
            .ops
            .iter()
            .rposition(|op| *op == DrawOp::Cursor(x, y))
            .map_or(self.ops.len(), |index| index + 1);
        self.ops[start..]
            .iter()
            .map_while(|op| match op {
                DrawOp::Char(ch) => Some(*ch as char),
                _ => None,
            })
            .collect()
    }

    pub fn contains(&self, op: DrawOp) -> bool {
        self.ops.contains(&op)
    }

    pub fn reset(&mut self) {
        self.ops.clear();
    }
}

impl DisplayBackend for RecordingDisplay {
    fn clear(&mut self) {
        self.ops.push(DrawOp::Clear);
    }

    fn cursor(&mut self, x: u8, y: u8) {
        self.ops.push(DrawOp::Cursor(x, y));
    }

    fn move_cursor(&mut self, _dx: u8) {}

    fn print_char(&mut self, ch: u8) {
        self.ops.push(DrawOp::Char(ch));
    }

    fn bar(&mut self, value: i16, column: u8, pattern: BarPattern) {
        self.ops.push(DrawOp::Bar {
            value,
            column,
            pattern,
        });
    }

    fn clear_bar(&mut self, column: u8) {
        self.ops.push(DrawOp::ClearBar(column));
    }

    fn invert_line(&mut self, y: u8) {
        self.ops.push(DrawOp::InvertLine(y));
    }

    fn progress_bar(&mut self, counter: Option<u8>) {
        self.ops.push(DrawOp::Progress(counter));
    }

    fn idle(&mut self) {
        self.ops.push(DrawOp::Idle);
    }

    fn backlight(&mut self, backlight: Backlight) {
        self.backlight = backlight;
        self.ops.push(DrawOp::Backlight(backlight));
    }

    fn update_pending(&mut self) -> bool {
        core::mem::take(&mut self.pending)
    }

    fn flush(&mut self) -> Result<(), DisplayError> {
        self.flushes += 1;
        Ok(())
    }
}

/// In-memory settings store
pub struct MemoryStore {
    blocks: BTreeMap<u8, Vec<u8>>,
    pub writes: usize,
    pub fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            blocks: BTreeMap::new(),
            writes: 0,
            fail_writes: false,
        }
    }

    pub fn contains(&self, key: StorageKey) -> bool {
        self.blocks.contains_key(&key.as_u8())
    }
}

impl SettingsStore for MemoryStore {
    fn read(&mut self, key: StorageKey, buffer: &mut [u8]) -> Option<usize> {
        let data = self.blocks.get(&key.as_u8())?;
        buffer.get_mut(..data.len())?.copy_from_slice(data);
        Some(data.len())
    }

    fn write(&mut self, key: StorageKey, data: &[u8]) -> Result<(), SettingsError> {
        if self.fail_writes {
            return Err(SettingsError::Storage(pocketlab_hal::FlashError::Full));
        }
        self.writes += 1;
        self.blocks.insert(key.as_u8(), data.to_vec());
        Ok(())
    }
}

/// Acquisition hardware that records its wiring
pub struct FakeAcquisition {
    pub producer: Option<Producer>,
    pub trigger: Option<Trigger>,
    pub serial: Option<SerialConfig>,
    pub running: bool,
    pub starts: usize,
    pub stops: usize,
}

impl FakeAcquisition {
    pub fn new() -> Self {
        Self {
            producer: None,
            trigger: None,
            serial: None,
            running: false,
            starts: 0,
            stops: 0,
        }
    }
}

impl Acquisition for FakeAcquisition {
    fn configure(&mut self, producer: Producer, trigger: Trigger) {
        self.producer = Some(producer);
        self.trigger = Some(trigger);
        self.running = true;
    }

    fn configure_serial(&mut self, config: SerialConfig) {
        self.serial = Some(config);
    }

    fn start(&mut self) {
        self.starts += 1;
        self.running = true;
    }

    fn stop(&mut self) {
        self.stops += 1;
        self.running = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

/// Analog front-end that records its settings
pub struct FakeFrontEnd {
    pub trim: Option<(i16, u16)>,
    pub input: Option<AnalogInput>,
    pub watching: Option<(i16, Crossing)>,
    pub timeout_restarts: usize,
}

impl FakeFrontEnd {
    pub fn new() -> Self {
        Self {
            trim: None,
            input: None,
            watching: None,
            timeout_restarts: 0,
        }
    }
}

impl AnalogFrontEnd for FakeFrontEnd {
    fn set_trim(&mut self, offset: i16, gain: u16) {
        self.trim = Some((offset, gain));
    }

    fn select_input(&mut self, input: AnalogInput) {
        self.input = Some(input);
    }

    fn watch(&mut self, threshold: i16, crossing: Crossing) {
        self.watching = Some((threshold, crossing));
    }

    fn unwatch(&mut self) {
        self.watching = None;
    }

    fn restart_trigger_timeout(&mut self) {
        self.timeout_restarts += 1;
    }
}

pub struct TestPlatform;

impl Platform for TestPlatform {
    type Display = RecordingDisplay;
    type Acquisition = FakeAcquisition;
    type FrontEnd = FakeFrontEnd;
    type Clock = FakeClock;
    type Settings = MemoryStore;
}

/// Every collaborator plus the sample buffer
pub struct Rig {
    pub buffer: Buffer,
    pub display: RecordingDisplay,
    pub acquisition: FakeAcquisition,
    pub front_end: FakeFrontEnd,
    pub clock: FakeClock,
    pub settings: MemoryStore,
}

impl Rig {
    pub fn new() -> Self {
        Self {
            buffer: Buffer::new(),
            display: RecordingDisplay::new(),
            acquisition: FakeAcquisition::new(),
            front_end: FakeFrontEnd::new(),
            clock: FakeClock::new(u16::MAX),
            settings: MemoryStore::new(),
        }
    }

    pub fn io(&mut self) -> Io<'_, TestPlatform> {
        Io {
            buffer: &self.buffer,
            display: &mut self.display,
            acquisition: &mut self.acquisition,
            front_end: &mut self.front_end,
            clock: &mut self.clock,
            settings: &mut self.settings,
        }
    }

    /// Push ADC samples as the free-running producer would
    pub fn push_samples(&self, samples: &[i16]) {
        for &sample in samples {
            self.buffer.push_sample(sample);
        }
    }
}
