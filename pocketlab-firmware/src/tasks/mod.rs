//! Embassy async tasks
//!
//! Each task runs independently and communicates via channels/signals.
//! The samplers feed the ring buffer; the instrument task drains it.

pub mod adc;
pub mod bus;
pub mod counter;
pub mod instrument;
pub mod keypad;
pub mod persistence;
pub mod pulse;
pub mod serial;
pub mod tick;
pub mod trigger;

pub use adc::adc_task;
pub use bus::snapshot_task;
pub use counter::{counter_task, period_task};
pub use instrument::instrument_task;
pub use keypad::keypad_task;
pub use persistence::persistence_task;
pub use pulse::pulse_task;
pub use serial::serial_task;
pub use tick::{period_tick_task, refresh_task, result_tick_task};
pub use trigger::trigger_timeout_task;
