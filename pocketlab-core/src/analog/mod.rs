//! ADC measurement engines
//!
//! The voltmeter and ammeter share one pipeline: free-running conversions
//! are folded into chart windows by [`AnalogEngine`], [`AutoZoom`] switches
//! to comparator-triggered capture when a fast chart shows a large swing,
//! and a [`Quantity`] turns the latched value into text.

pub mod calibration;
pub mod engine;
pub mod reading;
pub mod zoom;

pub use calibration::{gain_parts, TrimStep};
pub use engine::AnalogEngine;
pub use reading::{Current, Quantity, Reading, Voltage};
pub use zoom::{AutoZoom, ZoomAction};
