//! Frequency meter samplers
//!
//! The counter task reads a PWM slice counting rising edges once per
//! 1/1024 s tick and stores the edges counted in that tick. The period
//! task timestamps rising edges on a second input and hands the intervals
//! to the averager closed by the period tick.

use defmt::*;
use embassy_futures::select::{select, Either};
use embassy_rp::gpio::Input;
use embassy_rp::pwm::Pwm;
use embassy_time::{Duration, Instant, Ticker};

use pocketlab_core::measure::TICK_RATE;
use pocketlab_hal::Producer;
use pocketlab_hal_rp2040::{Wiring, WIRING};

use crate::channels::{BUFFER, PERIODS, PERIOD_TICK};

#[embassy_executor::task]
pub async fn counter_task(counter: Pwm<'static>) {
    info!("Counter task started");

    let Some(mut receiver) = WIRING.receiver() else {
        error!("No wiring receiver left for the counter sampler");
        return;
    };
    let mut wiring = Wiring::IDLE;

    loop {
        if !wiring.feeds(Producer::CaptureA) {
            wiring = receiver.changed().await;
            continue;
        }

        let mut ticker = Ticker::every(Duration::from_hz(TICK_RATE as u64));
        let mut last = counter.counter();
        loop {
            match select(ticker.next(), receiver.changed()).await {
                Either::First(()) => {
                    let now = counter.counter();
                    BUFFER.push_sample(now.wrapping_sub(last) as i16);
                    last = now;
                }
                Either::Second(update) => {
                    wiring = update;
                    break;
                }
            }
        }
    }
}

#[embassy_executor::task]
pub async fn period_task(mut input: Input<'static>) {
    info!("Period task started");

    let Some(mut receiver) = WIRING.receiver() else {
        error!("No wiring receiver left for the period sampler");
        return;
    };
    let mut wiring = Wiring::IDLE;
    let mut last: Option<Instant> = None;

    loop {
        if !wiring.feeds(Producer::CaptureA) {
            wiring = receiver.changed().await;
            last = None;
            continue;
        }

        // edges stop interrupting once the interval has its periods
        if PERIODS.lock(|periods| periods.borrow().is_full()) {
            if let Either::Second(update) = select(PERIOD_TICK.wait(), receiver.changed()).await {
                wiring = update;
            }
            continue;
        }

        match select(input.wait_for_rising_edge(), receiver.changed()).await {
            Either::First(()) => {
                let now = Instant::now();
                if let Some(previous) = last {
                    let micros = (now - previous).as_micros().min(u16::MAX as u64) as u16;
                    PERIODS.lock(|periods| periods.borrow_mut().capture(micros));
                }
                last = Some(now);
            }
            Either::Second(update) => wiring = update,
        }
    }
}
