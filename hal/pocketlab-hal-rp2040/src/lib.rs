//! RP2040-specific HAL for the Pocketlab firmware
//!
//! This crate provides RP2040 implementations of the `pocketlab-hal`
//! traits. The samplers themselves are firmware tasks; everything here is
//! the state they share with the foreground:
//!
//! - Producer routing published to the sampler tasks
//! - ADC channel map, trim and the software window comparator
//! - Glitch clock monitor fed by the bus sampler
//! - Flash storage driver (implements `pocketlab_hal::FlashStorage`)

#![no_std]

pub mod adc;
pub mod clock;
pub mod flash;
pub mod route;

pub use adc::{AdcChannel, Rp2040FrontEnd, FRONT_END, TRIGGER_TIMEOUT};
pub use clock::{GlitchClock, CLOCK};
pub use route::{Rp2040Acquisition, Wiring, SERIAL_CONFIG, WIRING};

// Re-export shared traits from pocketlab-hal for convenience
pub use pocketlab_hal::{FlashStorage as FlashStorageTrait, StorageKey};
