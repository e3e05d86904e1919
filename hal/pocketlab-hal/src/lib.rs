//! Pocketlab Hardware Abstraction Layer
//!
//! This crate defines the narrow interfaces between the measurement core
//! and the board. The core never touches registers; it asks the board to
//! wire a sample producer into the ring buffer, start or stop it, arm the
//! analog comparator, and persist settings.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  pocketlab-firmware (embassy tasks)     │
//! └─────────────────────────────────────────┘
//!           │                     │
//!           ▼                     ▼
//! ┌───────────────────┐   ┌───────────────────┐
//! │  pocketlab-core   │──▶│  pocketlab-hal    │
//! │  (modes, engines) │   │  (this crate)     │
//! └───────────────────┘   └───────────────────┘
//!                                 ▲
//!                                 │
//!                      ┌─────────────────────┐
//!                      │ pocketlab-hal-rp2040│
//!                      └─────────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`acquisition::Acquisition`] - Producer wiring and start/stop
//! - [`acquisition::AnalogFrontEnd`] - Trim, window comparator, trigger timeout
//! - [`acquisition::ClockMonitor`] - Minimum clock period for glitch rejection
//! - [`flash::FlashStorage`] - Persistent key/value storage

#![no_std]
#![deny(unsafe_code)]

pub mod acquisition;
pub mod flash;

// Re-export key traits at crate root for convenience
pub use acquisition::{
    Acquisition, AnalogFrontEnd, AnalogInput, ClockMonitor, Crossing, Edge, Producer,
    SerialConfig, SerialParity, Trigger,
};
pub use flash::{FlashError, FlashStorage, StorageKey};
