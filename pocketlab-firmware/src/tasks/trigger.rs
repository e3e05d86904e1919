//! Trigger timeout task
//!
//! One-shot timer behind `AnalogFrontEnd::restart_trigger_timeout`. Each
//! restart pushes the deadline out again; expiry hands the analog mode a
//! `TriggerTimeout` so a windowed capture never waits forever.

use defmt::*;
use embassy_futures::select::{select, Either};
use embassy_time::{Duration, Timer};

use pocketlab_core::mode::Event;
use pocketlab_hal_rp2040::TRIGGER_TIMEOUT;

use crate::channels::EVENTS;

/// 256 ticks of a 32 MHz / 8192 clock
pub const TRIGGER_TIMEOUT_MS: u64 = 66;

#[embassy_executor::task]
pub async fn trigger_timeout_task() {
    info!("Trigger timeout task started");

    loop {
        TRIGGER_TIMEOUT.wait().await;
        loop {
            let expiry = Timer::after(Duration::from_millis(TRIGGER_TIMEOUT_MS));
            match select(expiry, TRIGGER_TIMEOUT.wait()).await {
                Either::First(()) => {
                    debug!("Trigger timeout expired");
                    EVENTS.send(Event::TriggerTimeout).await;
                    break;
                }
                Either::Second(()) => trace!("Trigger timeout restarted"),
            }
        }
    }
}
