//! Bus protocol modes: SPI, TWI and 1-Wire

use pocketlab_display::{DisplayBackend, TextFormat};
use pocketlab_hal::{Acquisition, Edge, Producer, StorageKey, Trigger};

use super::page::{line, PageLine, SettingsPage};
use super::serial::{terminal_key, TerminalKey};
use super::{persist, Io, Mode, Terminal};
use crate::config::{load_settings, OneWireSettings, SpiSettings, TwiSettings};
use crate::decode::{OneWireDecoder, SpiDecoder, TwiDecoder};
use crate::input::Key;
use crate::traits::Platform;

/// SPI terminal
///
/// Samples the port on the selected clock edge; key 2 swaps the decoded
/// data line at the next chip-select burst.
#[derive(Debug, Clone)]
pub struct SpiMode {
    settings: SpiSettings,
    decoder: SpiDecoder,
    terminal: Terminal,
    page: Option<SettingsPage>,
}

impl Default for SpiMode {
    fn default() -> Self {
        Self::new()
    }
}

impl SpiMode {
    pub fn new() -> Self {
        let settings = SpiSettings::default();
        Self {
            decoder: SpiDecoder::new(settings.input, settings.order, settings.select),
            settings,
            terminal: Terminal::new(),
            page: None,
        }
    }

    pub fn settings(&self) -> &SpiSettings {
        &self.settings
    }

    pub fn terminal(&self) -> &Terminal {
        &self.terminal
    }

    pub fn decoder(&self) -> &SpiDecoder {
        &self.decoder
    }

    fn wire<P: Platform>(&mut self, io: &mut Io<'_, P>) {
        io.buffer.init(Producer::PortSnapshot);
        io.acquisition.configure(
            Producer::PortSnapshot,
            Trigger::Clock(self.settings.edge.into()),
        );
        self.decoder = SpiDecoder::new(
            self.settings.input,
            self.settings.order,
            self.settings.select,
        );
        self.terminal.reset(TextFormat::Ascii, io);
    }

    fn fields(&self) -> [PageLine; 3] {
        [
            line(format_args!("DATA: {}", self.settings.order.label())),
            line(format_args!("CLOCK: {}", self.settings.edge.label())),
            line(format_args!("SELECT: {}", self.settings.select.label())),
        ]
    }

    fn page_key<P: Platform>(&mut self, key: Key, io: &mut Io<'_, P>) {
        let Some(page) = self.page.as_mut() else {
            return;
        };
        match key {
            Key::K1 => {
                self.settings.order = self.settings.order.toggled();
                page.select(0);
            }
            Key::K2 => {
                self.settings.edge = self.settings.edge.toggled();
                page.select(1);
            }
            Key::K3 => {
                self.settings.select = self.settings.select.toggled();
                page.select(2);
            }
            Key::K4 => {
                self.page = None;
                persist(io, StorageKey::Spi, &self.settings).ok();
                self.wire(io);
                self.terminal.set_hold(false, io);
            }
            _ => {}
        }
    }
}

impl Mode for SpiMode {
    fn on_enter<P: Platform>(&mut self, io: &mut Io<'_, P>) {
        self.settings = load_settings(io.settings, StorageKey::Spi);
        self.page = None;
        self.wire(io);
    }

    fn drain_and_render<P: Platform>(&mut self, io: &mut Io<'_, P>) {
        match &self.page {
            Some(page) => {
                if io.display.update_pending() {
                    page.draw(io.display, "SPI SETTINGS", &self.fields());
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
        let decoder = &mut self.decoder;
        let action = terminal_key(&mut self.terminal, key, io, |terminal| {
            terminal.grid_mut().new_line();
            settings.input = settings.input.toggled();
            decoder.set_input(settings.input);
        });
        match action {
            TerminalKey::OpenPage => self.page = Some(SettingsPage::new()),
            TerminalKey::Toggled => {
                persist(io, StorageKey::Spi, &self.settings).ok();
            }
            _ => {}
        }
    }
}

/// TWI terminal
///
/// No settings page: keys 1 and 2 toggle the start/stop and ACK/NACK
/// annotations directly.
#[derive(Debug, Clone)]
pub struct TwiMode {
    settings: TwiSettings,
    decoder: TwiDecoder,
    terminal: Terminal,
}

impl Default for TwiMode {
    fn default() -> Self {
        Self::new()
    }
}

impl TwiMode {
    pub fn new() -> Self {
        let settings = TwiSettings::default();
        Self {
            decoder: TwiDecoder::new(settings.ack_nack, settings.start_stop),
            settings,
            terminal: Terminal::new(),
        }
    }

    pub fn settings(&self) -> &TwiSettings {
        &self.settings
    }

    pub fn terminal(&self) -> &Terminal {
        &self.terminal
    }

    fn toggle<P: Platform>(&mut self, io: &mut Io<'_, P>, apply: impl FnOnce(&mut TwiSettings)) {
        if self.terminal.is_hold() {
            return;
        }
        apply(&mut self.settings);
        self.decoder
            .set_annotations(self.settings.ack_nack, self.settings.start_stop);
        persist(io, StorageKey::Twi, &self.settings).ok();
    }
}

impl Mode for TwiMode {
    fn on_enter<P: Platform>(&mut self, io: &mut Io<'_, P>) {
        self.settings = load_settings(io.settings, StorageKey::Twi);
        io.buffer.init(Producer::PortSnapshot);
        io.acquisition
            .configure(Producer::PortSnapshot, Trigger::Clock(Edge::Rising));
        self.decoder = TwiDecoder::new(self.settings.ack_nack, self.settings.start_stop);
        self.terminal.reset(TextFormat::Ascii, io);
    }

    fn drain_and_render<P: Platform>(&mut self, io: &mut Io<'_, P>) {
        self.terminal.poll(&mut self.decoder, io);
    }

    fn on_key<P: Platform>(&mut self, key: Key, io: &mut Io<'_, P>) {
        if self.terminal.is_locked() {
            return;
        }
        match key {
            Key::K1 => self.toggle(io, |settings| settings.start_stop = !settings.start_stop),
            Key::K2 => self.toggle(io, |settings| settings.ack_nack = !settings.ack_nack),
            Key::K3 => self.terminal.toggle_hold(io),
            Key::K4 => self.terminal.clear(),
            _ => {}
        }
    }
}

/// 1-Wire terminal
///
/// Key 1 shows a legend of the reset and presence marks; any key closes
/// it and restarts the terminal.
#[derive(Debug, Clone)]
pub struct OneWireMode {
    settings: OneWireSettings,
    decoder: OneWireDecoder,
    terminal: Terminal,
    info: bool,
}

impl Default for OneWireMode {
    fn default() -> Self {
        Self::new()
    }
}

impl OneWireMode {
    pub fn new() -> Self {
        let settings = OneWireSettings::default();
        Self {
            decoder: OneWireDecoder::new(settings.tab),
            settings,
            terminal: Terminal::new(),
            info: false,
        }
    }

    pub fn settings(&self) -> &OneWireSettings {
        &self.settings
    }

    pub fn terminal(&self) -> &Terminal {
        &self.terminal
    }

    pub fn is_info_open(&self) -> bool {
        self.info
    }

    fn restart<P: Platform>(&mut self, io: &mut Io<'_, P>) {
        self.decoder = OneWireDecoder::new(self.settings.tab);
        self.terminal.reset(TextFormat::Ascii, io);
    }

    fn draw_info<D: DisplayBackend>(display: &mut D) {
        display.clear();
        display.cursor(9, 1);
        display.print_str("1-WIRE INFO");
        display.cursor(15, 15);
        display.print_str("RESET (R)");
        display.cursor(15, 26);
        display.print_str("RESPONSE:");
        display.cursor(6, 35);
        display.print_str("YES(+) NO(-)");
        display.invert_line(0);
    }
}

impl Mode for OneWireMode {
    fn on_enter<P: Platform>(&mut self, io: &mut Io<'_, P>) {
        self.settings = load_settings(io.settings, StorageKey::OneWire);
        self.info = false;
        io.buffer.init(Producer::CaptureCount);
        io.acquisition.configure(Producer::CaptureCount, Trigger::Free);
        self.restart(io);
    }

    fn drain_and_render<P: Platform>(&mut self, io: &mut Io<'_, P>) {
        if !self.info {
            self.terminal.poll(&mut self.decoder, io);
        } else if io.display.update_pending() {
            Self::draw_info(io.display);
        }
    }

    fn on_key<P: Platform>(&mut self, key: Key, io: &mut Io<'_, P>) {
        if self.info {
            self.info = false;
            self.restart(io);
            self.terminal.set_hold(false, io);
            return;
        }
        let settings = &mut self.settings;
        let decoder = &mut self.decoder;
        let action = terminal_key(&mut self.terminal, key, io, |_| {
            settings.tab = !settings.tab;
            decoder.set_tab(settings.tab);
        });
        match action {
            TerminalKey::OpenPage => self.info = true,
            TerminalKey::Toggled => {
                persist(io, StorageKey::OneWire, &self.settings).ok();
            }
            _ => {}
        }
    }
}
