//! Flash storage driver for RP2040
//!
//! Settings blocks live in a small sequential-storage map at the end of
//! flash, one item per [`StorageKey`]. Wear leveling and item CRCs are
//! handled by sequential-storage.

use embassy_rp::dma::Channel;
use embassy_rp::flash::{Async, Flash, ERASE_SIZE};
use embassy_rp::peripherals::FLASH;
use embassy_rp::Peri;
use embedded_storage_async::nor_flash::NorFlash;
use sequential_storage::cache::NoCache;
use sequential_storage::map;

pub use pocketlab_hal::flash::{FlashError, StorageKey};

/// Flash size of the reference board
pub const FLASH_SIZE: usize = 2 * 1024 * 1024;

/// Four erase sectors; the settings blocks are a few bytes each
pub const SETTINGS_PARTITION_SIZE: usize = 4 * ERASE_SIZE;
pub const SETTINGS_PARTITION_START: usize = FLASH_SIZE - SETTINGS_PARTITION_SIZE;

/// Flash range for the settings partition
pub const SETTINGS_RANGE: core::ops::Range<u32> =
    (SETTINGS_PARTITION_START as u32)..(FLASH_SIZE as u32);

/// Scratch space for one map item (key, length and payload)
const ITEM_BUFFER_SIZE: usize = 64;

/// RP2040 settings partition
pub struct Rp2040FlashStorage<'d> {
    flash: Flash<'d, FLASH, Async, FLASH_SIZE>,
}

impl<'d> Rp2040FlashStorage<'d> {
    pub fn new(flash: Peri<'d, FLASH>, dma: Peri<'d, impl Channel>) -> Self {
        Self {
            flash: Flash::new(flash, dma),
        }
    }
}

impl<'d> pocketlab_hal::FlashStorage for Rp2040FlashStorage<'d> {
    async fn read(&mut self, key: StorageKey, buffer: &mut [u8]) -> Result<usize, FlashError> {
        let mut item = [0u8; ITEM_BUFFER_SIZE];

        let stored = map::fetch_item::<StorageKey, &[u8], _>(
            &mut self.flash,
            SETTINGS_RANGE,
            &mut NoCache::new(),
            &mut item,
            &key,
        )
        .await
        .map_err(|_| FlashError::Storage)?;

        let data = stored.ok_or(FlashError::NotFound)?;
        let target = buffer
            .get_mut(..data.len())
            .ok_or(FlashError::BufferTooSmall)?;
        target.copy_from_slice(data);
        Ok(data.len())
    }

    async fn write(&mut self, key: StorageKey, data: &[u8]) -> Result<(), FlashError> {
        let mut item = [0u8; ITEM_BUFFER_SIZE];

        map::store_item(
            &mut self.flash,
            SETTINGS_RANGE,
            &mut NoCache::new(),
            &mut item,
            &key,
            &data,
        )
        .await
        .map_err(|error| match error {
            sequential_storage::Error::FullStorage => FlashError::Full,
            sequential_storage::Error::Corrupted { .. } => FlashError::Corrupted,
            _ => FlashError::Storage,
        })
    }

    async fn exists(&mut self, key: StorageKey) -> bool {
        let mut item = [0u8; ITEM_BUFFER_SIZE];

        matches!(
            map::fetch_item::<StorageKey, &[u8], _>(
                &mut self.flash,
                SETTINGS_RANGE,
                &mut NoCache::new(),
                &mut item,
                &key,
            )
            .await,
            Ok(Some(_))
        )
    }

    async fn erase_all(&mut self) -> Result<(), FlashError> {
        self.flash
            .erase(SETTINGS_RANGE.start, SETTINGS_RANGE.end)
            .await
            .map_err(|_| FlashError::Flash)
    }
}

/// Type alias used by the firmware
pub type FlashStorage<'d> = Rp2040FlashStorage<'d>;
