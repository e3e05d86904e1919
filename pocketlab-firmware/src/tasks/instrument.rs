//! Instrument task
//!
//! The foreground loop: routes pending events to the active mode, lets it
//! drain the ring buffer and render, then pushes the frame out. Yields
//! once per iteration so the samplers and tickers keep running.

use defmt::*;
use embassy_futures::yield_now;

use pocketlab_core::mode::Instrument;
use pocketlab_display::DisplayBackend;

use crate::board::Board;
use crate::channels::{BUFFER, EVENTS};

#[embassy_executor::task]
pub async fn instrument_task(mut board: Board) {
    info!("Instrument task started");

    let mut instrument = Instrument::new();
    let mode = instrument.start(&mut board.io());
    info!("Started in {} mode", mode.name());

    let mut overflowing = false;

    loop {
        while let Ok(event) = EVENTS.try_receive() {
            if let Some(mode) = instrument.handle(event, &mut board.io()) {
                info!("Switched to {} mode", mode.name());
            }
        }

        let overflow = BUFFER.is_overflowing();
        if overflow && !overflowing {
            warn!("Sample buffer overflow, {} bytes unread", BUFFER.unread());
        }
        overflowing = overflow;

        instrument.poll(&mut board.io());

        if let Err(e) = board.display.flush() {
            warn!("Display flush failed: {:?}", e);
        }

        yield_now().await;
    }
}
