//! Persistent settings
//!
//! Each mode owns one small settings block, stored as postcard binary
//! data under its own [`StorageKey`](pocketlab_hal::StorageKey). Blocks are
//! validated after every load; out-of-range fields fall back to their
//! defaults and the repaired block is written back immediately.

pub mod settings;
pub mod store;

pub use settings::*;
pub use store::{load_settings, save_settings, SETTINGS_BUFFER_SIZE};
