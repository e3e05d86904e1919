//! Periodic ticks
//!
//! - Display refresh signal
//! - Result refresh and the one-second charge tick
//! - Period averaging for the frequency meter

use defmt::*;
use embassy_time::{Duration, Ticker};

use pocketlab_core::measure::PERIOD_READ_MS;
use pocketlab_core::mode::{Event, RESULT_REFRESH_MS};

use crate::channels::{EVENTS, PERIODS, PERIOD_TICK, REFRESH};

/// Display refresh interval
pub const DISPLAY_REFRESH_MS: u64 = 100;

/// Result ticks per second tick
const RESULTS_PER_SECOND: u8 = (1000 / RESULT_REFRESH_MS) as u8;

#[embassy_executor::task]
pub async fn refresh_task() {
    info!("Refresh task started");

    let mut ticker = Ticker::every(Duration::from_millis(DISPLAY_REFRESH_MS));
    loop {
        ticker.next().await;
        REFRESH.signal(());
    }
}

#[embassy_executor::task]
pub async fn result_tick_task() {
    info!("Result tick task started");

    let mut ticker = Ticker::every(Duration::from_millis(RESULT_REFRESH_MS));
    let mut count = 0u8;
    loop {
        ticker.next().await;
        EVENTS.send(Event::ResultTick).await;

        count += 1;
        if count == RESULTS_PER_SECOND {
            count = 0;
            trace!("Second tick");
            EVENTS.send(Event::SecondTick).await;
        }
    }
}

/// Close the period averaging interval
#[embassy_executor::task]
pub async fn period_tick_task() {
    info!("Period tick task started");

    let mut ticker = Ticker::every(Duration::from_millis(PERIOD_READ_MS));
    loop {
        ticker.next().await;
        let reading = PERIODS.lock(|periods| periods.borrow_mut().tick());
        PERIOD_TICK.signal(());
        EVENTS.send(Event::Period(reading)).await;
    }
}
