//! Inter-task communication
//!
//! Defines the statics shared between Embassy tasks. The sample ring
//! buffer lives here too: the sampler tasks are its producers and the
//! instrument task its only consumer.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;

use pocketlab_core::buffer::Buffer;
use pocketlab_core::measure::PeriodAverager;
use pocketlab_core::mode::Event;

use crate::settings::SettingsWrite;

/// Channel capacity for instrument events
const EVENT_CHANNEL_SIZE: usize = 16;

/// Channel capacity for pending flash writes, one per settings block
const PERSIST_CHANNEL_SIZE: usize = 11;

/// Sample ring buffer
pub static BUFFER: Buffer = Buffer::new();

/// Keys, ticks and comparator crossings for the active mode
pub static EVENTS: Channel<CriticalSectionRawMutex, Event, EVENT_CHANNEL_SIZE> = Channel::new();

/// Signal that a display refresh is due
pub static REFRESH: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Settings blocks waiting to be written to flash
pub static PERSIST: Channel<CriticalSectionRawMutex, SettingsWrite, PERSIST_CHANNEL_SIZE> =
    Channel::new();

/// Input periods captured since the last period tick
pub static PERIODS: Mutex<CriticalSectionRawMutex, RefCell<PeriodAverager>> =
    Mutex::new(RefCell::new(PeriodAverager::new()));

/// Signal that the period averager was emptied
pub static PERIOD_TICK: Signal<CriticalSectionRawMutex, ()> = Signal::new();
