//! Analog front-end
//!
//! The RP2040 ADC has no trim registers and no window comparator, so both
//! live in software: the ADC sampler converts every raw result through
//! [`FrontEndState::convert`] and checks it with
//! [`FrontEndState::compare`]. The foreground programs them through
//! [`Rp2040FrontEnd`].
//!
//! Channel map on the reference board:
//!
//! - ADC0 (GPIO26): voltage divider
//! - ADC1 (GPIO27): current shunt amplifier
//! - ADC2 (GPIO28): amplifier reference, the shorted-input zero

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use portable_atomic::{AtomicI16, AtomicU16, AtomicU8, Ordering};

use pocketlab_hal::{AnalogFrontEnd, AnalogInput, Crossing};

/// Raw result of a centered input
pub const ADC_MIDSCALE: i32 = 2048;

/// Sample units per ADC count
pub const COUNTS_TO_SAMPLE: i32 = 4;

/// Gain register value for a factor of one
pub const UNITY_GAIN: u16 = 0x0800;

/// Restarted by the foreground, fired into the mode by the timeout task
pub static TRIGGER_TIMEOUT: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Shared front-end state
pub static FRONT_END: FrontEndState = FrontEndState::new();

/// ADC input channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdcChannel {
    Adc0,
    Adc1,
    Adc2,
}

impl AdcChannel {
    /// Channel wired to `input`
    pub const fn for_input(input: AnalogInput) -> Self {
        match input {
            AnalogInput::Voltage => AdcChannel::Adc0,
            AnalogInput::Current => AdcChannel::Adc1,
            AnalogInput::Zero => AdcChannel::Adc2,
        }
    }

    pub const fn gpio(self) -> u8 {
        match self {
            AdcChannel::Adc0 => 26,
            AdcChannel::Adc1 => 27,
            AdcChannel::Adc2 => 28,
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }
}

const WATCH_OFF: u8 = 0;
const WATCH_BELOW: u8 = 1;
const WATCH_ABOVE: u8 = 2;

/// Trim, input selection and comparator, readable from the sampler
pub struct FrontEndState {
    offset: AtomicI16,
    gain: AtomicU16,
    input: AtomicU8,
    threshold: AtomicI16,
    watch: AtomicU8,
}

impl FrontEndState {
    pub const fn new() -> Self {
        Self {
            offset: AtomicI16::new(0),
            gain: AtomicU16::new(UNITY_GAIN),
            input: AtomicU8::new(0),
            threshold: AtomicI16::new(0),
            watch: AtomicU8::new(WATCH_OFF),
        }
    }

    /// Selected input
    pub fn input(&self) -> AnalogInput {
        match self.input.load(Ordering::Relaxed) {
            1 => AnalogInput::Current,
            2 => AnalogInput::Zero,
            _ => AnalogInput::Voltage,
        }
    }

    /// Turn a raw 12-bit result into a signed, trimmed sample
    pub fn convert(&self, raw: u16) -> i16 {
        let gain = self.gain.load(Ordering::Relaxed) as i32;
        let offset = self.offset.load(Ordering::Relaxed) as i32;
        let centered = (raw as i32 - ADC_MIDSCALE) * COUNTS_TO_SAMPLE;
        let trimmed = centered * gain / UNITY_GAIN as i32 + offset;
        trimmed.clamp(i16::MIN as i32, i16::MAX as i32) as i16
    }

    /// Report whether `sample` satisfies the armed comparator
    pub fn compare(&self, sample: i16) -> Option<Crossing> {
        let threshold = self.threshold.load(Ordering::Relaxed);
        match self.watch.load(Ordering::Acquire) {
            WATCH_BELOW if sample < threshold => Some(Crossing::Below),
            WATCH_ABOVE if sample > threshold => Some(Crossing::Above),
            _ => None,
        }
    }

    pub fn is_watching(&self) -> bool {
        self.watch.load(Ordering::Acquire) != WATCH_OFF
    }
}

impl Default for FrontEndState {
    fn default() -> Self {
        Self::new()
    }
}

/// Foreground handle on [`FRONT_END`]
#[derive(Debug, Default)]
pub struct Rp2040FrontEnd;

impl Rp2040FrontEnd {
    pub const fn new() -> Self {
        Self
    }
}

impl AnalogFrontEnd for Rp2040FrontEnd {
    fn set_trim(&mut self, offset: i16, gain: u16) {
        FRONT_END.offset.store(offset, Ordering::Relaxed);
        FRONT_END.gain.store(gain, Ordering::Relaxed);
    }

    fn select_input(&mut self, input: AnalogInput) {
        let index = match input {
            AnalogInput::Voltage => 0,
            AnalogInput::Current => 1,
            AnalogInput::Zero => 2,
        };
        FRONT_END.input.store(index, Ordering::Relaxed);
    }

    fn watch(&mut self, threshold: i16, crossing: Crossing) {
        FRONT_END.threshold.store(threshold, Ordering::Relaxed);
        let mode = match crossing {
            Crossing::Below => WATCH_BELOW,
            Crossing::Above => WATCH_ABOVE,
        };
        FRONT_END.watch.store(mode, Ordering::Release);
    }

    fn unwatch(&mut self) {
        FRONT_END.watch.store(WATCH_OFF, Ordering::Release);
    }

    fn restart_trigger_timeout(&mut self) {
        TRIGGER_TIMEOUT.signal(());
    }
}
