//! Board-agnostic measurement core for the Pocketlab instrument
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Interrupt-fed sample ring buffer
//! - Protocol decoders (UART, USRT, SPI, TWI, 1-Wire)
//! - Rolling min/max/avg chart
//! - Voltmeter, ammeter, frequency and charge engines
//! - Measurement modes and the mode dispatcher
//! - Keypad event recognition
//! - Settings block definitions and validation
//!
//! Hardware is reached only through the [`traits::Platform`] bundle; the
//! firmware crate supplies the board implementation and the tasks that
//! feed [`mode::Instrument`].

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod analog;
pub mod buffer;
pub mod chart;
pub mod config;
pub mod decode;
pub mod input;
pub mod measure;
pub mod mode;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;
