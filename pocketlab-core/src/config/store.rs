//! Loading and saving settings blocks

use pocketlab_hal::StorageKey;

use super::settings::SettingsBlock;
use crate::traits::{SettingsError, SettingsStore};

/// Serialization scratch space; every block fits comfortably
pub const SETTINGS_BUFFER_SIZE: usize = 16;

/// Load, validate and return the block stored under `key`
///
/// A missing or undecodable block loads as the default. The block is
/// written back when it was missing or validation repaired it, so the
/// store always holds a legal copy afterwards.
pub fn load_settings<T, S>(store: &mut S, key: StorageKey) -> T
where
    T: SettingsBlock,
    S: SettingsStore,
{
    let mut buffer = [0u8; SETTINGS_BUFFER_SIZE];
    let stored = store
        .read(key, &mut buffer)
        .and_then(|len| buffer.get(..len))
        .and_then(|bytes| postcard::from_bytes::<T>(bytes).ok());

    let mut settings = stored.unwrap_or_default();
    let repaired = settings.validate();
    if stored.is_none() || repaired {
        // a failed write leaves the repaired copy in use until the next save
        save_settings(store, key, &settings).ok();
    }
    settings
}

/// Serialize and store `settings` under `key`
pub fn save_settings<T, S>(store: &mut S, key: StorageKey, settings: &T) -> Result<(), SettingsError>
where
    T: SettingsBlock,
    S: SettingsStore,
{
    let mut buffer = [0u8; SETTINGS_BUFFER_SIZE];
    let used = postcard::to_slice(settings, &mut buffer)?;
    store.write(key, used)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ChartSpeed;
    use crate::config::settings::{AnalogSettings, SpiSettings, UartSettings, GAIN_MIDPOINT};
    use crate::decode::spi::BitOrder;
    use crate::testing::MemoryStore;

    #[test]
    fn test_missing_block_is_persisted() {
        let mut store = MemoryStore::new();
        let settings: UartSettings = load_settings(&mut store, StorageKey::Uart);
        assert_eq!(settings, UartSettings::default());
        assert_eq!(store.writes, 1);
        assert!(store.contains(StorageKey::Uart));
    }

    #[test]
    fn test_round_trip_without_rewrite() {
        let mut store = MemoryStore::new();
        let settings = SpiSettings {
            order: BitOrder::MsbFirst,
            ..SpiSettings::default()
        };
        save_settings(&mut store, StorageKey::Spi, &settings).unwrap();
        let loaded: SpiSettings = load_settings(&mut store, StorageKey::Spi);
        assert_eq!(loaded, settings);
        assert_eq!(store.writes, 1);
    }

    #[test]
    fn test_out_of_range_block_is_repaired_and_saved() {
        let mut store = MemoryStore::new();
        let bad = AnalogSettings {
            offset: 500,
            gain: GAIN_MIDPOINT,
            speed: ChartSpeed::FASTEST,
        };
        save_settings(&mut store, StorageKey::Voltage, &bad).unwrap();
        let loaded: AnalogSettings = load_settings(&mut store, StorageKey::Voltage);
        assert_eq!(loaded.offset, 0);
        assert_eq!(loaded.speed, ChartSpeed::FASTEST);
        assert_eq!(store.writes, 2);

        let again: AnalogSettings = load_settings(&mut store, StorageKey::Voltage);
        assert_eq!(again, loaded);
        assert_eq!(store.writes, 2);
    }

    #[test]
    fn test_garbage_loads_default() {
        let mut store = MemoryStore::new();
        store.write(StorageKey::Spi, &[0xFF, 0xFF, 0xFF]).unwrap();
        let loaded: SpiSettings = load_settings(&mut store, StorageKey::Spi);
        assert_eq!(loaded, SpiSettings::default());
    }

    #[test]
    fn test_failed_write_keeps_defaults() {
        let mut store = MemoryStore::new();
        store.fail_writes = true;
        let loaded: UartSettings = load_settings(&mut store, StorageKey::Uart);
        assert_eq!(loaded, UartSettings::default());
        assert!(!store.contains(StorageKey::Uart));
    }
}
