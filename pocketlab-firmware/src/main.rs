//! Pocketlab - Handheld Instrument Firmware
//!
//! Main firmware binary for the RP2040-based pocket multimeter and
//! protocol analyzer. Sampler tasks fill the shared ring buffer; the
//! instrument task runs the active mode on the foreground side.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::adc::{Adc, Channel, Config as AdcConfig, InterruptHandler as AdcInterruptHandler};
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Input, Pull};
use embassy_rp::peripherals::UART1;
use embassy_rp::pwm::{Config as PwmConfig, InputMode, Pwm};
use embassy_rp::uart::InterruptHandler as UartInterruptHandler;
use {defmt_rtt as _, panic_probe as _};

use pocketlab_hal_rp2040::flash::FlashStorage;

use crate::board::Board;
use crate::settings::SettingsCache;

mod board;
mod channels;
mod display;
mod settings;
mod tasks;

bind_interrupts!(pub struct Irqs {
    ADC_IRQ_FIFO => AdcInterruptHandler;
    UART1_IRQ => UartInterruptHandler<UART1>;
});

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Pocketlab firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    // Settings are read once; later writes go through the persistence task
    let mut storage = FlashStorage::new(p.FLASH, p.DMA_CH0);
    let settings = SettingsCache::load(&mut storage).await;
    info!("Settings loaded");

    // Analog front end
    let adc = Adc::new(p.ADC, Irqs, AdcConfig::default());
    let adc_channels = [
        Channel::new_pin(p.PIN_26, Pull::None),
        Channel::new_pin(p.PIN_27, Pull::None),
        Channel::new_pin(p.PIN_28, Pull::None),
    ];

    // Bus port, clock and framing strobe
    let port = [
        Input::new(p.PIN_2, Pull::None),
        Input::new(p.PIN_3, Pull::None),
        Input::new(p.PIN_4, Pull::None),
        Input::new(p.PIN_5, Pull::None),
        Input::new(p.PIN_6, Pull::None),
        Input::new(p.PIN_7, Pull::None),
        Input::new(p.PIN_8, Pull::None),
        Input::new(p.PIN_9, Pull::None),
    ];
    let bus_clock = Input::new(p.PIN_10, Pull::None);
    let strobe = Input::new(p.PIN_11, Pull::None);

    // Frequency input: edge counter on PWM slice 6 channel B, plus a
    // capture pin for the period average
    let counter = Pwm::new_input(
        p.PWM_SLICE6,
        p.PIN_13,
        Pull::None,
        InputMode::RisingEdge,
        PwmConfig::default(),
    );
    let period_input = Input::new(p.PIN_14, Pull::None);

    // 1-Wire data line, idle high
    let one_wire = Input::new(p.PIN_15, Pull::Up);

    let keys = [
        Input::new(p.PIN_16, Pull::Up),
        Input::new(p.PIN_17, Pull::Up),
        Input::new(p.PIN_18, Pull::Up),
        Input::new(p.PIN_19, Pull::Up),
    ];

    info!("Inputs initialized");

    let board = Board::new(settings);

    // Spawn tasks
    unwrap!(spawner.spawn(tasks::refresh_task()));
    unwrap!(spawner.spawn(tasks::result_tick_task()));
    unwrap!(spawner.spawn(tasks::period_tick_task()));
    unwrap!(spawner.spawn(tasks::trigger_timeout_task()));
    unwrap!(spawner.spawn(tasks::keypad_task(keys)));
    unwrap!(spawner.spawn(tasks::persistence_task(storage)));
    unwrap!(spawner.spawn(tasks::adc_task(adc, adc_channels, p.DMA_CH1)));
    unwrap!(spawner.spawn(tasks::snapshot_task(port, bus_clock, strobe)));
    unwrap!(spawner.spawn(tasks::counter_task(counter)));
    unwrap!(spawner.spawn(tasks::period_task(period_input)));
    unwrap!(spawner.spawn(tasks::pulse_task(one_wire)));
    unwrap!(spawner.spawn(tasks::serial_task(p.UART1, p.PIN_21, p.DMA_CH2)));
    unwrap!(spawner.spawn(tasks::instrument_task(board)));

    info!("All tasks spawned, firmware running");

    loop {
        embassy_time::Timer::after_secs(60).await;
        trace!("Main loop heartbeat");
    }
}
