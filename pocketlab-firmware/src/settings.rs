//! Settings cache
//!
//! Every block is read from flash once at boot. Modes then read and write
//! the RAM copy synchronously; changed blocks are queued for the
//! persistence task, which owns the flash.

use defmt::*;

use pocketlab_core::config::SETTINGS_BUFFER_SIZE;
use pocketlab_core::traits::{SettingsError, SettingsStore};
use pocketlab_hal::{FlashError, FlashStorage, StorageKey};

use crate::channels::PERSIST;

type Block = heapless::Vec<u8, SETTINGS_BUFFER_SIZE>;

/// One block on its way to flash
pub struct SettingsWrite {
    pub key: StorageKey,
    pub data: Block,
}

/// RAM copy of every settings block
pub struct SettingsCache {
    blocks: [Option<Block>; StorageKey::ALL.len()],
}

impl SettingsCache {
    pub const fn new() -> Self {
        Self {
            blocks: [const { None }; StorageKey::ALL.len()],
        }
    }

    /// Read every block from flash
    ///
    /// Unreadable blocks stay empty and load as defaults.
    pub async fn load<F: FlashStorage>(flash: &mut F) -> Self {
        let mut cache = Self::new();
        let mut buffer = [0u8; SETTINGS_BUFFER_SIZE];

        for key in StorageKey::ALL {
            match flash.read(key, &mut buffer).await {
                Ok(len) => {
                    debug!("Loaded {} block ({} bytes)", key, len);
                    let block = buffer.get(..len).and_then(|data| Block::from_slice(data).ok());
                    if let Some(slot) = cache.slot(key) {
                        *slot = block;
                    }
                }
                Err(FlashError::NotFound) => debug!("No {} block stored", key),
                Err(e) => warn!("Failed to read {} block: {:?}", key, e),
            }
        }
        cache
    }

    fn slot(&mut self, key: StorageKey) -> Option<&mut Option<Block>> {
        self.blocks.get_mut(key.as_u8() as usize)
    }
}

impl Default for SettingsCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore for SettingsCache {
    fn read(&mut self, key: StorageKey, buffer: &mut [u8]) -> Option<usize> {
        let block = self.slot(key)?.as_ref()?;
        buffer.get_mut(..block.len())?.copy_from_slice(block);
        Some(block.len())
    }

    fn write(&mut self, key: StorageKey, data: &[u8]) -> Result<(), SettingsError> {
        let block = Block::from_slice(data).map_err(|_| SettingsError::Encode)?;
        let slot = self.slot(key).ok_or(SettingsError::Storage(FlashError::NotFound))?;
        if slot.as_ref() == Some(&block) {
            return Ok(());
        }

        PERSIST
            .try_send(SettingsWrite {
                key,
                data: block.clone(),
            })
            .map_err(|_| {
                warn!("Persistence queue full, {} block not saved", key);
                SettingsError::Storage(FlashError::Full)
            })?;
        *slot = Some(block);
        Ok(())
    }
}
