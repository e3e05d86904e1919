//! 1-Wire pulse sampler task
//!
//! Measures every low pulse on the data line and stores its width in
//! 32 MHz timer counts, saturating at the counter range.

use defmt::*;
use embassy_futures::select::{select, Either};
use embassy_rp::gpio::Input;
use embassy_time::Instant;

use pocketlab_hal::Producer;
use pocketlab_hal_rp2040::clock::COUNTS_PER_US;
use pocketlab_hal_rp2040::{Wiring, WIRING};

use crate::channels::BUFFER;

#[embassy_executor::task]
pub async fn pulse_task(mut line: Input<'static>) {
    info!("Pulse task started");

    let Some(mut receiver) = WIRING.receiver() else {
        error!("No wiring receiver left for the pulse sampler");
        return;
    };
    let mut wiring = Wiring::IDLE;

    loop {
        if !wiring.feeds(Producer::CaptureCount) {
            wiring = receiver.changed().await;
            continue;
        }

        if let Either::Second(update) = select(line.wait_for_falling_edge(), receiver.changed()).await {
            wiring = update;
            continue;
        }
        let start = Instant::now();

        if let Either::Second(update) = select(line.wait_for_rising_edge(), receiver.changed()).await {
            wiring = update;
            continue;
        }
        let counts = start
            .elapsed()
            .as_micros()
            .saturating_mul(COUNTS_PER_US)
            .min(u16::MAX as u64);
        BUFFER.push_sample(counts as u16 as i16);
    }
}
