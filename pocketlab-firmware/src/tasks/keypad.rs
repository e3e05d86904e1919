//! Keypad scanner task
//!
//! Samples the four active-low buttons every scan period and forwards the
//! recognized key events to the instrument.

use defmt::*;
use embassy_rp::gpio::Input;
use embassy_time::{Duration, Ticker};

use pocketlab_core::input::{KeypadScanner, SCAN_PERIOD_MS};
use pocketlab_core::mode::Event;

use crate::channels::EVENTS;

#[embassy_executor::task]
pub async fn keypad_task(keys: [Input<'static>; 4]) {
    info!("Keypad task started");

    let mut scanner = KeypadScanner::new();
    let mut ticker = Ticker::every(Duration::from_millis(SCAN_PERIOD_MS));

    loop {
        ticker.next().await;

        let raw = keys
            .iter()
            .enumerate()
            .filter(|(_, key)| key.is_low())
            .fold(0u8, |mask, (index, _)| mask | 1 << index);

        for event in scanner.scan(raw) {
            debug!("Key {}", event);
            EVENTS.send(Event::Key(event)).await;
        }
    }
}
