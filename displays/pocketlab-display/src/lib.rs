//! Display abstraction and text terminal for Pocketlab
//!
//! This crate provides:
//! - `DisplayBackend` trait for the dot-matrix display
//! - `Symbol` glyph codes shared by the decoders
//! - `TextGrid`, the scrolling 5x14 terminal used by the digital modes
//!
//! # Architecture
//!
//! Measurement modes draw through `DisplayBackend` into a local frame
//! buffer and the firmware flushes it once per refresh tick. The backend
//! also owns the refresh tick itself (`update_pending`), so modes render
//! at the display's pace regardless of how fast they drain samples.

#![no_std]
#![deny(unsafe_code)]

pub mod backend;
pub mod glyph;
pub mod grid;

// Re-export key types
pub use backend::{Backlight, BarPattern, DisplayBackend, DisplayError, DISPLAY_HEIGHT, DISPLAY_WIDTH};
pub use glyph::{Symbol, PLACEHOLDER};
pub use grid::{TextFormat, TextGrid, GRID_COLS, GRID_ROWS};
