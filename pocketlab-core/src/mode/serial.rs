//! Serial protocol modes: UART, IRCOM and USRT

use pocketlab_display::DisplayBackend;
use pocketlab_hal::{Acquisition, Producer, SerialConfig, StorageKey, Trigger};

use super::page::{line, PageLine, SettingsPage};
use super::{persist, Io, Mode, Terminal};
use crate::config::{load_settings, IrcomSettings, UartSettings, UsrtSettings};
use crate::decode::uart::{BAUD_RATES, UART_OVERSAMPLING};
use crate::decode::{FrameFormat, ReceiverDecoder, UartDecoder, UsrtDecoder};
use crate::input::Key;
use crate::traits::Platform;

/// Next baud index, wrapping to the slowest rate
fn next_baud(index: u8) -> u8 {
    if index as usize + 1 >= BAUD_RATES.len() {
        0
    } else {
        index + 1
    }
}

/// Next frame size, wrapping to the shortest
fn next_data_bits(bits: u8) -> u8 {
    if bits >= FrameFormat::MAX_DATA_BITS {
        FrameFormat::MIN_DATA_BITS
    } else {
        bits + 1
    }
}

/// What a terminal key did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TerminalKey {
    Ignored,
    /// Key 1: hold engaged, settings page requested
    OpenPage,
    /// Key 2 acted; the mode persists its settings
    Toggled,
    Handled,
}

/// Key handling shared by the protocol terminals
///
/// Everything but key 1 is ignored until data arrives; key 2 does nothing
/// on hold.
pub(crate) fn terminal_key<P: Platform>(
    terminal: &mut Terminal,
    key: Key,
    io: &mut Io<'_, P>,
    toggle: impl FnOnce(&mut Terminal),
) -> TerminalKey {
    if terminal.is_locked() && key != Key::K1 {
        return TerminalKey::Ignored;
    }
    match key {
        Key::K1 => {
            terminal.set_hold(true, io);
            TerminalKey::OpenPage
        }
        Key::K2 if !terminal.is_hold() => {
            toggle(terminal);
            TerminalKey::Toggled
        }
        Key::K3 => {
            terminal.toggle_hold(io);
            TerminalKey::Handled
        }
        Key::K4 => {
            terminal.clear();
            TerminalKey::Handled
        }
        _ => TerminalKey::Ignored,
    }
}

/// Software-sampled asynchronous serial terminal
///
/// Both lines are sampled at eight times the baud rate; received bytes
/// print normally and transmitted bytes on inverted lines.
#[derive(Debug, Clone)]
pub struct UartMode {
    settings: UartSettings,
    decoder: UartDecoder,
    terminal: Terminal,
    page: Option<SettingsPage>,
}

impl Default for UartMode {
    fn default() -> Self {
        Self::new()
    }
}

impl UartMode {
    pub fn new() -> Self {
        let settings = UartSettings::default();
        Self {
            decoder: UartDecoder::new(settings.frame(), UART_OVERSAMPLING),
            settings,
            terminal: Terminal::new(),
            page: None,
        }
    }

    pub fn settings(&self) -> &UartSettings {
        &self.settings
    }

    pub fn terminal(&self) -> &Terminal {
        &self.terminal
    }

    pub fn is_page_open(&self) -> bool {
        self.page.is_some()
    }

    fn wire<P: Platform>(&mut self, io: &mut Io<'_, P>) {
        let rate = self.settings.baud_rate() * UART_OVERSAMPLING as u32;
        io.buffer.init(Producer::PortSnapshot);
        io.acquisition
            .configure(Producer::PortSnapshot, Trigger::Rate(rate));
        self.decoder = UartDecoder::new(self.settings.frame(), UART_OVERSAMPLING);
        self.terminal.reset(self.settings.format, io);
    }

    fn fields(&self) -> [PageLine; 3] {
        [
            line(format_args!("BAUD: {}", self.settings.baud_rate())),
            line(format_args!("FRAME: {} BIT", self.settings.data_bits)),
            line(format_args!("PARITY: {}", self.settings.parity.label())),
        ]
    }

    fn page_key<P: Platform>(&mut self, key: Key, io: &mut Io<'_, P>) {
        let Some(page) = self.page.as_mut() else {
            return;
        };
        match key {
            Key::K1 => {
                self.settings.baud = next_baud(self.settings.baud);
                page.select(0);
            }
            Key::K2 => {
                self.settings.data_bits = next_data_bits(self.settings.data_bits);
                page.select(1);
            }
            Key::K3 => {
                self.settings.parity = self.settings.parity.next();
                page.select(2);
            }
            Key::K4 => {
                self.page = None;
                persist(io, StorageKey::Uart, &self.settings).ok();
                self.wire(io);
                self.terminal.set_hold(false, io);
            }
            _ => {}
        }
    }
}

impl Mode for UartMode {
    fn on_enter<P: Platform>(&mut self, io: &mut Io<'_, P>) {
        self.settings = load_settings(io.settings, StorageKey::Uart);
        self.page = None;
        self.wire(io);
    }

    fn drain_and_render<P: Platform>(&mut self, io: &mut Io<'_, P>) {
        match &self.page {
            Some(page) => {
                if io.display.update_pending() {
                    page.draw(io.display, "UART SETTINGS", &self.fields());
                }
            }
            None => self.terminal.poll(&mut self.decoder, io),
        }
    }

    fn on_key<P: Platform>(&mut self, key: Key, io: &mut Io<'_, P>) {
        if self.page.is_some() {
            self.page_key(key, io);
            return;
        }
        let settings = &mut self.settings;
        let action = terminal_key(&mut self.terminal, key, io, |terminal| {
            terminal.grid_mut().new_line();
            settings.format = settings.format.toggled();
            terminal.set_format(settings.format);
        });
        match action {
            TerminalKey::OpenPage => self.page = Some(SettingsPage::new()),
            TerminalKey::Toggled => {
                persist(io, StorageKey::Uart, &self.settings).ok();
            }
            _ => {}
        }
    }
}

/// Infrared serial terminal on the hardware receiver
#[derive(Debug, Clone)]
pub struct IrcomMode {
    settings: IrcomSettings,
    decoder: ReceiverDecoder,
    terminal: Terminal,
    page: Option<SettingsPage>,
}

impl Default for IrcomMode {
    fn default() -> Self {
        Self::new()
    }
}

impl IrcomMode {
    pub fn new() -> Self {
        Self {
            settings: IrcomSettings::default(),
            decoder: ReceiverDecoder::new(true),
            terminal: Terminal::new(),
            page: None,
        }
    }

    pub fn settings(&self) -> &IrcomSettings {
        &self.settings
    }

    pub fn terminal(&self) -> &Terminal {
        &self.terminal
    }

    fn wire<P: Platform>(&mut self, io: &mut Io<'_, P>) {
        io.buffer.init(Producer::UartReceiver);
        io.acquisition.configure_serial(SerialConfig {
            baud: self.settings.baud_rate(),
            data_bits: 8,
            parity: self.settings.parity.into(),
            inverted: self.settings.invert,
        });
        io.acquisition.configure(Producer::UartReceiver, Trigger::Free);
        self.decoder = ReceiverDecoder::new(true);
        self.terminal.reset(self.settings.format, io);
    }

    fn fields(&self) -> [PageLine; 3] {
        let invert = if self.settings.invert { "YES" } else { "NO" };
        [
            line(format_args!("BAUD: {}", self.settings.baud_rate())),
            line(format_args!("PARITY: {}", self.settings.parity.label())),
            line(format_args!("INVERT: {}", invert)),
        ]
    }

    fn page_key<P: Platform>(&mut self, key: Key, io: &mut Io<'_, P>) {
        let Some(page) = self.page.as_mut() else {
            return;
        };
        match key {
            Key::K1 => {
                self.settings.baud = next_baud(self.settings.baud);
                page.select(0);
            }
            Key::K2 => {
                self.settings.parity = self.settings.parity.next();
                page.select(1);
            }
            Key::K3 => {
                self.settings.invert = !self.settings.invert;
                page.select(2);
            }
            Key::K4 => {
                self.page = None;
                persist(io, StorageKey::Ircom, &self.settings).ok();
                self.wire(io);
                self.terminal.set_hold(false, io);
            }
            _ => {}
        }
    }
}

impl Mode for IrcomMode {
    fn on_enter<P: Platform>(&mut self, io: &mut Io<'_, P>) {
        self.settings = load_settings(io.settings, StorageKey::Ircom);
        self.page = None;
        self.wire(io);
    }

    fn drain_and_render<P: Platform>(&mut self, io: &mut Io<'_, P>) {
        match &self.page {
            Some(page) => {
                if io.display.update_pending() {
                    page.draw(io.display, "IRCOM SETTINGS", &self.fields());
                }
            }
            None => self.terminal.poll(&mut self.decoder, io),
        }
    }

    fn on_key<P: Platform>(&mut self, key: Key, io: &mut Io<'_, P>) {
        if self.page.is_some() {
            self.page_key(key, io);
            return;
        }
        let settings = &mut self.settings;
        let action = terminal_key(&mut self.terminal, key, io, |terminal| {
            // the format change applies from the next line on
            terminal.grid_mut().end_line();
            settings.format = settings.format.toggled();
            terminal.set_format(settings.format);
        });
        match action {
            TerminalKey::OpenPage => self.page = Some(SettingsPage::new()),
            TerminalKey::Toggled => {
                persist(io, StorageKey::Ircom, &self.settings).ok();
            }
            _ => {}
        }
    }
}

/// Clocked serial terminal
#[derive(Debug, Clone)]
pub struct UsrtMode {
    settings: UsrtSettings,
    decoder: UsrtDecoder,
    terminal: Terminal,
    page: Option<SettingsPage>,
}

impl Default for UsrtMode {
    fn default() -> Self {
        Self::new()
    }
}

impl UsrtMode {
    pub fn new() -> Self {
        let settings = UsrtSettings::default();
        Self {
            decoder: UsrtDecoder::new(settings.frame()),
            settings,
            terminal: Terminal::new(),
            page: None,
        }
    }

    pub fn settings(&self) -> &UsrtSettings {
        &self.settings
    }

    pub fn terminal(&self) -> &Terminal {
        &self.terminal
    }

    fn wire<P: Platform>(&mut self, io: &mut Io<'_, P>) {
        io.buffer.init(Producer::PortSnapshot);
        io.acquisition.configure(
            Producer::PortSnapshot,
            Trigger::Clock(self.settings.edge.into()),
        );
        self.decoder = UsrtDecoder::new(self.settings.frame());
        self.terminal.reset(self.settings.format, io);
    }

    fn fields(&self) -> [PageLine; 3] {
        [
            line(format_args!("CLOCK: {}", self.settings.edge.label())),
            line(format_args!("FRAME: {} BIT", self.settings.data_bits)),
            line(format_args!("PARITY: {}", self.settings.parity.label())),
        ]
    }

    fn page_key<P: Platform>(&mut self, key: Key, io: &mut Io<'_, P>) {
        let Some(page) = self.page.as_mut() else {
            return;
        };
        match key {
            Key::K1 => {
                self.settings.edge = self.settings.edge.toggled();
                page.select(0);
            }
            Key::K2 => {
                self.settings.data_bits = next_data_bits(self.settings.data_bits);
                page.select(1);
            }
            Key::K3 => {
                self.settings.parity = self.settings.parity.next();
                page.select(2);
            }
            Key::K4 => {
                self.page = None;
                persist(io, StorageKey::Usrt, &self.settings).ok();
                self.wire(io);
                self.terminal.set_hold(false, io);
            }
            _ => {}
        }
    }
}

impl Mode for UsrtMode {
    fn on_enter<P: Platform>(&mut self, io: &mut Io<'_, P>) {
        self.settings = load_settings(io.settings, StorageKey::Usrt);
        self.page = None;
        self.wire(io);
    }

    fn drain_and_render<P: Platform>(&mut self, io: &mut Io<'_, P>) {
        match &self.page {
            Some(page) => {
                if io.display.update_pending() {
                    page.draw(io.display, "USRT SETTINGS", &self.fields());
                }
            }
            None => self.terminal.poll(&mut self.decoder, io),
        }
    }

    fn on_key<P: Platform>(&mut self, key: Key, io: &mut Io<'_, P>) {
        if self.page.is_some() {
            self.page_key(key, io);
            return;
        }
        let settings = &mut self.settings;
        let action = terminal_key(&mut self.terminal, key, io, |terminal| {
            terminal.grid_mut().new_line();
            settings.format = settings.format.toggled();
            terminal.set_format(settings.format);
        });
        match action {
            TerminalKey::OpenPage => self.page = Some(SettingsPage::new()),
            TerminalKey::Toggled => {
                persist(io, StorageKey::Usrt, &self.settings).ok();
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::Parity;
    use crate::mode::page::title_x;
    use crate::testing::Rig;
    use pocketlab_display::{Backlight, TextFormat};
    use pocketlab_hal::{Edge, SerialParity};

    /// Leave the Ready state by feeding one idle sample
    fn start_running<M: Mode>(mode: &mut M, rig: &mut Rig) {
        rig.buffer.push_byte(0xFF);
        rig.display.pending = true;
        mode.drain_and_render(&mut rig.io());
    }

    #[test]
    fn test_uart_entry_wiring() {
        let mut rig = Rig::new();
        let mut mode = UartMode::new();
        mode.on_enter(&mut rig.io());
        assert_eq!(rig.acquisition.producer, Some(Producer::PortSnapshot));
        assert_eq!(rig.acquisition.trigger, Some(Trigger::Rate(9600 * 8)));
        assert_eq!(rig.buffer.producer(), Producer::PortSnapshot);
        assert!(rig.settings.contains(StorageKey::Uart));
        assert!(mode.terminal().is_locked());
    }

    #[test]
    fn test_keys_locked_until_data_except_settings() {
        let mut rig = Rig::new();
        let mut mode = UartMode::new();
        mode.on_enter(&mut rig.io());

        mode.on_key(Key::K2, &mut rig.io());
        assert_eq!(mode.settings().format, TextFormat::Hex);
        mode.on_key(Key::K3, &mut rig.io());
        assert!(!mode.terminal().is_hold());

        mode.on_key(Key::K1, &mut rig.io());
        assert!(mode.is_page_open());
        assert!(mode.terminal().is_hold());
        assert_eq!(rig.display.backlight, Backlight::Aux);
    }

    #[test]
    fn test_format_toggle_persists() {
        let mut rig = Rig::new();
        let mut mode = UartMode::new();
        mode.on_enter(&mut rig.io());
        start_running(&mut mode, &mut rig);

        let writes = rig.settings.writes;
        mode.on_key(Key::K2, &mut rig.io());
        assert_eq!(mode.settings().format, TextFormat::Ascii);
        assert_eq!(mode.terminal().grid().format(), TextFormat::Ascii);
        assert_eq!(rig.settings.writes, writes + 1);

        // ignored on hold
        mode.on_key(Key::K3, &mut rig.io());
        mode.on_key(Key::K2, &mut rig.io());
        assert_eq!(mode.settings().format, TextFormat::Ascii);
    }

    #[test]
    fn test_settings_page_cycles_and_applies() {
        let mut rig = Rig::new();
        let mut mode = UartMode::new();
        mode.on_enter(&mut rig.io());
        mode.on_key(Key::K1, &mut rig.io());

        mode.on_key(Key::K1, &mut rig.io());
        mode.on_key(Key::K2, &mut rig.io());
        mode.on_key(Key::K3, &mut rig.io());
        assert_eq!(mode.settings().baud_rate(), BAUD_RATES[4]);
        assert_eq!(mode.settings().data_bits, 5);
        assert_eq!(mode.settings().parity, Parity::Odd);

        rig.display.pending = true;
        mode.drain_and_render(&mut rig.io());
        assert_eq!(rig.display.text_at(3, 24), "FRAME: 5 BIT");
        assert_eq!(rig.display.text_at(3, 33), "PARITY: ODD");

        mode.on_key(Key::K4, &mut rig.io());
        assert!(!mode.is_page_open());
        assert!(!mode.terminal().is_hold());
        assert!(mode.terminal().is_locked());
        assert_eq!(
            rig.acquisition.trigger,
            Some(Trigger::Rate(BAUD_RATES[4] * 8))
        );
        let stored: UartSettings = load_settings(&mut rig.settings, StorageKey::Uart);
        assert_eq!(&stored, mode.settings());
    }

    #[test]
    fn test_baud_wraps() {
        assert_eq!(next_baud(BAUD_RATES.len() as u8 - 1), 0);
        assert_eq!(next_data_bits(8), 5);
    }

    #[test]
    fn test_ircom_wiring() {
        let mut rig = Rig::new();
        let mut mode = IrcomMode::new();
        mode.on_enter(&mut rig.io());
        assert_eq!(rig.acquisition.producer, Some(Producer::UartReceiver));
        assert_eq!(rig.acquisition.trigger, Some(Trigger::Free));
        assert_eq!(
            rig.acquisition.serial,
            Some(SerialConfig {
                baud: 9600,
                data_bits: 8,
                parity: SerialParity::None,
                inverted: true,
            })
        );
    }

    #[test]
    fn test_ircom_invert_toggle() {
        let mut rig = Rig::new();
        let mut mode = IrcomMode::new();
        mode.on_enter(&mut rig.io());
        mode.on_key(Key::K1, &mut rig.io());
        mode.on_key(Key::K3, &mut rig.io());

        rig.display.pending = true;
        mode.drain_and_render(&mut rig.io());
        assert_eq!(rig.display.text_at(title_x("IRCOM SETTINGS"), 1), "IRCOM SETTINGS");
        assert_eq!(rig.display.text_at(3, 33), "INVERT: NO");

        mode.on_key(Key::K4, &mut rig.io());
        assert!(!mode.settings().invert);
        assert_eq!(rig.acquisition.serial.map(|config| config.inverted), Some(false));
    }

    #[test]
    fn test_usrt_edge_follows_settings() {
        let mut rig = Rig::new();
        let mut mode = UsrtMode::new();
        mode.on_enter(&mut rig.io());
        assert_eq!(rig.acquisition.trigger, Some(Trigger::Clock(Edge::Falling)));

        mode.on_key(Key::K1, &mut rig.io());
        mode.on_key(Key::K1, &mut rig.io());
        mode.on_key(Key::K4, &mut rig.io());
        assert_eq!(rig.acquisition.trigger, Some(Trigger::Clock(Edge::Rising)));
    }

    #[test]
    fn test_clear_key() {
        let mut rig = Rig::new();
        let mut mode = UsrtMode::new();
        mode.on_enter(&mut rig.io());
        start_running(&mut mode, &mut rig);
        mode.on_key(Key::K4, &mut rig.io());
        assert_eq!(mode.terminal().grid().cursor(), (0, 0));
    }
}
