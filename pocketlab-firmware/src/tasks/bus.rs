//! Port snapshot sampler task
//!
//! Captures the eight bus lines as one byte per sampling event. Rate
//! triggers pace the snapshots with a ticker; clock triggers take one on
//! every selected clock edge and on every edge of the framing strobe,
//! and time the clock edges for the glitch monitor.

use defmt::*;
use embassy_futures::select::{select, select3, Either, Either3};
use embassy_rp::gpio::Input;
use embassy_time::{Duration, Instant, Ticker};

use pocketlab_hal::{Edge, Producer, Trigger};
use pocketlab_hal_rp2040::{Wiring, CLOCK, WIRING};

use crate::channels::BUFFER;

/// Fastest snapshot rate the ticker can sustain
pub const MAX_SNAPSHOT_HZ: u32 = 100_000;

fn read_port(port: &[Input<'static>; 8]) -> u8 {
    port.iter()
        .enumerate()
        .filter(|(_, line)| line.is_high())
        .fold(0u8, |bits, (index, _)| bits | 1 << index)
}

async fn clock_edge(clock: &mut Input<'static>, edge: Edge) {
    match edge {
        Edge::Rising => clock.wait_for_rising_edge().await,
        Edge::Falling => clock.wait_for_falling_edge().await,
    }
}

#[embassy_executor::task]
pub async fn snapshot_task(
    port: [Input<'static>; 8],
    mut clock: Input<'static>,
    mut strobe: Input<'static>,
) {
    info!("Snapshot task started");

    let Some(mut receiver) = WIRING.receiver() else {
        error!("No wiring receiver left for the snapshot sampler");
        return;
    };
    let mut wiring = Wiring::IDLE;

    loop {
        if !wiring.feeds(Producer::PortSnapshot) {
            wiring = receiver.changed().await;
            continue;
        }

        match wiring.trigger {
            Trigger::Rate(hz) => {
                if hz > MAX_SNAPSHOT_HZ {
                    warn!("Snapshot rate {} Hz capped at {} Hz", hz, MAX_SNAPSHOT_HZ);
                }
                let hz = hz.clamp(1, MAX_SNAPSHOT_HZ);
                let mut ticker = Ticker::every(Duration::from_hz(hz as u64));
                loop {
                    match select(ticker.next(), receiver.changed()).await {
                        Either::First(()) => BUFFER.push_byte(read_port(&port)),
                        Either::Second(update) => {
                            wiring = update;
                            break;
                        }
                    }
                }
            }
            Trigger::Clock(edge) => {
                let mut last = Instant::now();
                loop {
                    match select3(
                        clock_edge(&mut clock, edge),
                        strobe.wait_for_any_edge(),
                        receiver.changed(),
                    )
                    .await
                    {
                        Either3::First(()) => {
                            let now = Instant::now();
                            CLOCK.record_micros((now - last).as_micros());
                            last = now;
                            BUFFER.push_byte(read_port(&port));
                        }
                        Either3::Second(()) => BUFFER.push_byte(read_port(&port)),
                        Either3::Third(update) => {
                            wiring = update;
                            break;
                        }
                    }
                }
            }
            Trigger::Free => wiring = receiver.changed().await,
        }
    }
}
