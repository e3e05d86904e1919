//! Hardware serial receiver task
//!
//! Stores a status byte and a data byte for every received character.
//! The receiver is rebuilt whenever the foreground sends a new setup, so
//! baud rate, frame format and line inversion follow the mode settings.

use defmt::*;
use embassy_futures::select::{select, select3, Either, Either3};
use embassy_rp::peripherals::{DMA_CH2, PIN_21, UART1};
use embassy_rp::uart::{Config, DataBits, Error, Parity, UartRx};
use embassy_rp::Peri;

use pocketlab_core::decode::{Direction, ReceiverStatus};
use pocketlab_hal::{Producer, SerialConfig, SerialParity};
use pocketlab_hal_rp2040::{Wiring, SERIAL_CONFIG, WIRING};

use crate::channels::BUFFER;
use crate::Irqs;

fn uart_config(serial: SerialConfig) -> Config {
    let mut config = Config::default();
    config.baudrate = serial.baud;
    config.data_bits = match serial.data_bits {
        5 => DataBits::DataBits5,
        6 => DataBits::DataBits6,
        7 => DataBits::DataBits7,
        _ => DataBits::DataBits8,
    };
    config.parity = match serial.parity {
        SerialParity::None => Parity::ParityNone,
        SerialParity::Odd => Parity::ParityOdd,
        SerialParity::Even => Parity::ParityEven,
    };
    config.invert_rx = serial.inverted;
    config
}

#[embassy_executor::task]
pub async fn serial_task(
    mut uart: Peri<'static, UART1>,
    mut rx_pin: Peri<'static, PIN_21>,
    mut dma: Peri<'static, DMA_CH2>,
) {
    info!("Serial task started");

    let Some(mut receiver) = WIRING.receiver() else {
        error!("No wiring receiver left for the serial sampler");
        return;
    };
    let mut wiring = Wiring::IDLE;
    let mut serial = SerialConfig {
        baud: 9600,
        data_bits: 8,
        parity: SerialParity::None,
        inverted: false,
    };

    loop {
        if !wiring.feeds(Producer::UartReceiver) {
            match select(receiver.changed(), SERIAL_CONFIG.wait()).await {
                Either::First(update) => wiring = update,
                Either::Second(config) => serial = config,
            }
            continue;
        }

        debug!("Serial receiver at {} baud, {} data bits", serial.baud, serial.data_bits);
        let mut rx = UartRx::new(
            uart.reborrow(),
            rx_pin.reborrow(),
            Irqs,
            dma.reborrow(),
            uart_config(serial),
        );

        loop {
            let mut byte = [0u8; 1];
            match select3(rx.read(&mut byte), receiver.changed(), SERIAL_CONFIG.wait()).await {
                Either3::First(Ok(())) => {
                    let status = ReceiverStatus::received(Direction::Rx, false, false);
                    BUFFER.push_pair(status.bits(), byte[0]);
                }
                Either3::First(Err(e)) => {
                    if e == Error::Overrun {
                        warn!("Serial receiver overrun");
                    }
                    let framing = matches!(e, Error::Framing | Error::Break);
                    let parity = e == Error::Parity;
                    let status = ReceiverStatus::received(Direction::Rx, framing, parity);
                    BUFFER.push_pair(status.bits(), 0);
                }
                Either3::Second(update) => {
                    wiring = update;
                    if !wiring.feeds(Producer::UartReceiver) {
                        break;
                    }
                }
                Either3::Third(config) => {
                    serial = config;
                    break;
                }
            }
        }
    }
}
