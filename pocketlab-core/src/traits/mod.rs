//! Collaborator traits
//!
//! The modes reach the board only through these seams: the display, the
//! acquisition hardware, the analog front-end, the glitch clock monitor
//! and the settings store. [`Platform`] bundles one concrete type for each.

pub mod platform;
pub mod settings;

pub use platform::Platform;
pub use settings::{SettingsError, SettingsStore};
