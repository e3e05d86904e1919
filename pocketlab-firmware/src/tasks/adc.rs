//! ADC sampler task
//!
//! Converts the selected input in DMA blocks. Every result goes through
//! the front-end trim and the software comparator; results only reach the
//! ring buffer while the ADC producer is wired and running, but the
//! comparator keeps watching while the foreground holds acquisition off.

use defmt::*;
use embassy_rp::adc::{Adc, Async, Channel};
use embassy_rp::peripherals::DMA_CH1;
use embassy_rp::Peri;

use pocketlab_core::mode::Event;
use pocketlab_hal::Producer;
use pocketlab_hal_rp2040::{AdcChannel, Wiring, FRONT_END, WIRING};

use crate::channels::{BUFFER, EVENTS};

/// 48 MHz ADC clock divided to 100 ksps
pub const ADC_DIVIDER: u16 = 479;

/// Results per DMA transfer
const BLOCK_SIZE: usize = 64;

#[embassy_executor::task]
pub async fn adc_task(
    mut adc: Adc<'static, Async>,
    mut channels: [Channel<'static>; 3],
    mut dma: Peri<'static, DMA_CH1>,
) {
    info!("ADC task started");

    let Some(mut receiver) = WIRING.receiver() else {
        error!("No wiring receiver left for the ADC sampler");
        return;
    };
    let mut wiring = Wiring::IDLE;
    let mut block = [0u16; BLOCK_SIZE];

    loop {
        if let Some(update) = receiver.try_changed() {
            wiring = update;
        }
        if wiring.producer != Some(Producer::AdcResult) {
            wiring = receiver.changed().await;
            continue;
        }

        let Some(channel) = channels.get_mut(AdcChannel::for_input(FRONT_END.input()).index()) else {
            continue;
        };
        if let Err(e) = adc.read_many(channel, &mut block, ADC_DIVIDER, dma.reborrow()).await {
            warn!("ADC block failed: {:?}", e);
            continue;
        }

        // at most one crossing per block keeps the event queue free for keys
        let mut crossing = None;
        for &raw in block.iter() {
            let sample = FRONT_END.convert(raw);
            if crossing.is_none() {
                crossing = FRONT_END.compare(sample);
            }
            if wiring.running {
                BUFFER.push_sample(sample);
            }
        }
        if let Some(crossing) = crossing {
            if EVENTS.try_send(Event::Comparator(crossing)).is_err() {
                trace!("Comparator event dropped");
            }
        }
    }
}
