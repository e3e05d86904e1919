//! Mode selection and dispatch

use pocketlab_display::{Backlight, DisplayBackend};
use pocketlab_hal::StorageKey;

use super::analog::AnalogMode;
use super::bus::{OneWireMode, SpiMode, TwiMode};
use super::calibration::CalibrationMode;
use super::charge::ChargeMode;
use super::frequency::FrequencyMode;
use super::serial::{IrcomMode, UartMode, UsrtMode};
use super::{persist, Event, Io, Mode, ModeId};
use crate::analog::{Current, Voltage};
use crate::config::{load_settings, InstrumentSettings};
use crate::input::{Key, KeyEvent};
use crate::traits::Platform;

/// The running mode and its state
#[derive(Debug, Clone)]
pub enum ActiveMode {
    Twi(TwiMode),
    Voltage(AnalogMode<Voltage>),
    Current(AnalogMode<Current>),
    Uart(UartMode),
    OneWire(OneWireMode),
    Spi(SpiMode),
    Usrt(UsrtMode),
    Ircom(IrcomMode),
    Frequency(FrequencyMode),
    Charge(ChargeMode),
    VoltageCalibration(CalibrationMode<Voltage>),
    CurrentCalibration(CalibrationMode<Current>),
}

macro_rules! dispatch {
    ($self:expr, $mode:ident => $body:expr) => {
        match $self {
            ActiveMode::Twi($mode) => $body,
            ActiveMode::Voltage($mode) => $body,
            ActiveMode::Current($mode) => $body,
            ActiveMode::Uart($mode) => $body,
            ActiveMode::OneWire($mode) => $body,
            ActiveMode::Spi($mode) => $body,
            ActiveMode::Usrt($mode) => $body,
            ActiveMode::Ircom($mode) => $body,
            ActiveMode::Frequency($mode) => $body,
            ActiveMode::Charge($mode) => $body,
            ActiveMode::VoltageCalibration($mode) => $body,
            ActiveMode::CurrentCalibration($mode) => $body,
        }
    };
}

impl ActiveMode {
    /// Fresh state for `id`; nothing is wired until [`Mode::on_enter`]
    pub fn new(id: ModeId) -> Self {
        match id {
            ModeId::Twi => ActiveMode::Twi(TwiMode::new()),
            ModeId::Voltage => ActiveMode::Voltage(AnalogMode::new()),
            ModeId::Current => ActiveMode::Current(AnalogMode::new()),
            ModeId::Uart => ActiveMode::Uart(UartMode::new()),
            ModeId::OneWire => ActiveMode::OneWire(OneWireMode::new()),
            ModeId::Spi => ActiveMode::Spi(SpiMode::new()),
            ModeId::Usrt => ActiveMode::Usrt(UsrtMode::new()),
            ModeId::Ircom => ActiveMode::Ircom(IrcomMode::new()),
            ModeId::Frequency => ActiveMode::Frequency(FrequencyMode::new()),
            ModeId::Charge => ActiveMode::Charge(ChargeMode::new()),
            ModeId::VoltageCalibration => ActiveMode::VoltageCalibration(CalibrationMode::new()),
            ModeId::CurrentCalibration => ActiveMode::CurrentCalibration(CalibrationMode::new()),
        }
    }

    pub fn id(&self) -> ModeId {
        match self {
            ActiveMode::Twi(_) => ModeId::Twi,
            ActiveMode::Voltage(_) => ModeId::Voltage,
            ActiveMode::Current(_) => ModeId::Current,
            ActiveMode::Uart(_) => ModeId::Uart,
            ActiveMode::OneWire(_) => ModeId::OneWire,
            ActiveMode::Spi(_) => ModeId::Spi,
            ActiveMode::Usrt(_) => ModeId::Usrt,
            ActiveMode::Ircom(_) => ModeId::Ircom,
            ActiveMode::Frequency(_) => ModeId::Frequency,
            ActiveMode::Charge(_) => ModeId::Charge,
            ActiveMode::VoltageCalibration(_) => ModeId::VoltageCalibration,
            ActiveMode::CurrentCalibration(_) => ModeId::CurrentCalibration,
        }
    }
}

impl Mode for ActiveMode {
    fn on_enter<P: Platform>(&mut self, io: &mut Io<'_, P>) {
        dispatch!(self, mode => mode.on_enter(io))
    }

    fn on_exit<P: Platform>(&mut self, io: &mut Io<'_, P>) {
        dispatch!(self, mode => mode.on_exit(io))
    }

    fn drain_and_render<P: Platform>(&mut self, io: &mut Io<'_, P>) {
        dispatch!(self, mode => mode.drain_and_render(io))
    }

    fn on_key<P: Platform>(&mut self, key: Key, io: &mut Io<'_, P>) {
        dispatch!(self, mode => mode.on_key(key, io))
    }

    fn on_event<P: Platform>(&mut self, event: Event, io: &mut Io<'_, P>) {
        dispatch!(self, mode => mode.on_event(event, io))
    }
}

/// Top-level controller
///
/// Holds at most one mode. Nothing runs until [`start`](Self::start)
/// restores the mode saved at the last switch.
#[derive(Debug, Clone, Default)]
pub struct Instrument {
    mode: Option<ActiveMode>,
}

impl Instrument {
    pub const fn new() -> Self {
        Self { mode: None }
    }

    /// Enter the mode saved at the last switch
    pub fn start<P: Platform>(&mut self, io: &mut Io<'_, P>) -> ModeId {
        let settings: InstrumentSettings = load_settings(io.settings, StorageKey::Instrument);
        self.switch(settings.mode, io);
        settings.mode
    }

    /// Mode currently running
    pub fn mode_id(&self) -> Option<ModeId> {
        self.mode.as_ref().map(ActiveMode::id)
    }

    pub fn mode(&self) -> Option<&ActiveMode> {
        self.mode.as_ref()
    }

    /// Tear down the running mode and enter `id`
    pub fn switch<P: Platform>(&mut self, id: ModeId, io: &mut Io<'_, P>) {
        if let Some(mode) = self.mode.as_mut() {
            mode.on_exit(io);
        }
        io.display.clear();
        io.display.backlight(Backlight::Main);
        let mode = self.mode.insert(ActiveMode::new(id));
        mode.on_enter(io);
    }

    /// Route one event
    ///
    /// Returns the newly selected mode when the event switched modes.
    pub fn handle<P: Platform>(&mut self, event: Event, io: &mut Io<'_, P>) -> Option<ModeId> {
        match event {
            Event::Key(KeyEvent::LongPress(key)) => {
                let id = ModeId::from_key(key)?;
                if id.is_persistent() {
                    persist(io, StorageKey::Instrument, &InstrumentSettings { mode: id }).ok();
                }
                self.switch(id, io);
                return Some(id);
            }
            Event::Key(KeyEvent::Up(key)) => {
                if let Some(mode) = self.mode.as_mut() {
                    mode.on_key(key, io);
                }
            }
            Event::Key(KeyEvent::Down(_)) => {}
            event => {
                if let Some(mode) = self.mode.as_mut() {
                    mode.on_event(event, io);
                }
            }
        }
        None
    }

    /// One foreground iteration
    pub fn poll<P: Platform>(&mut self, io: &mut Io<'_, P>) {
        if let Some(mode) = self.mode.as_mut() {
            mode.drain_and_render(io);
        }
    }
}
