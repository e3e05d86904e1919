//! Settings persistence task
//!
//! Owns the flash and writes the blocks queued by the settings cache, so
//! the foreground never waits on an erase.

use defmt::*;

use pocketlab_hal_rp2040::flash::FlashStorage;
use pocketlab_hal_rp2040::FlashStorageTrait;

use crate::channels::PERSIST;

#[embassy_executor::task]
pub async fn persistence_task(mut storage: FlashStorage<'static>) {
    info!("Persistence task started");

    loop {
        let write = PERSIST.receive().await;
        debug!("Saving {} block ({} bytes)", write.key, write.data.len());

        match storage.write(write.key, &write.data).await {
            Ok(()) => trace!("{} block saved", write.key),
            Err(e) => error!("Failed to save {} block: {:?}", write.key, e),
        }
    }
}
