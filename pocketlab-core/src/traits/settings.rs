//! Settings storage trait

use pocketlab_hal::{FlashError, StorageKey};

/// Errors that can occur persisting a settings block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SettingsError {
    /// Block does not fit the serialization buffer
    Encode,
    /// Underlying storage rejected the write
    Storage(FlashError),
}

impl From<FlashError> for SettingsError {
    fn from(error: FlashError) -> Self {
        SettingsError::Storage(error)
    }
}

impl From<postcard::Error> for SettingsError {
    fn from(_: postcard::Error) -> Self {
        SettingsError::Encode
    }
}

/// Synchronous key/value settings store
///
/// The firmware backs this with a RAM cache that is loaded from flash at
/// boot and written back by a persistence task, so modes never wait on
/// flash.
pub trait SettingsStore {
    /// Copy the stored bytes for `key` into `buffer`
    ///
    /// Returns the stored length, or `None` when nothing usable is stored.
    fn read(&mut self, key: StorageKey, buffer: &mut [u8]) -> Option<usize>;

    /// Replace the stored bytes for `key`
    fn write(&mut self, key: StorageKey, data: &[u8]) -> Result<(), SettingsError>;
}
