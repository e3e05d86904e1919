//! Producer routing
//!
//! Every sampler task holds a receiver on [`WIRING`] and only writes to
//! the ring buffer while the published wiring names its producer and is
//! running. Starting and stopping republish the same wiring with the
//! running flag changed, so a sampler reacts within one sample.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_sync::watch::Watch;

use pocketlab_hal::{Acquisition, Producer, SerialConfig, Trigger};

/// Number of sampler tasks that may watch the wiring
pub const SAMPLERS: usize = 6;

/// Current producer wiring
pub static WIRING: Watch<CriticalSectionRawMutex, Wiring, SAMPLERS> = Watch::new();

/// Receiver setup for the hardware serial sampler
pub static SERIAL_CONFIG: Signal<CriticalSectionRawMutex, SerialConfig> = Signal::new();

/// Which producer feeds the buffer, and how it is paced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Wiring {
    pub producer: Option<Producer>,
    pub trigger: Trigger,
    pub running: bool,
}

impl Wiring {
    pub const IDLE: Wiring = Wiring {
        producer: None,
        trigger: Trigger::Free,
        running: false,
    };

    /// Whether `producer` may write to the buffer
    pub fn feeds(&self, producer: Producer) -> bool {
        self.running && self.producer == Some(producer)
    }
}

impl Default for Wiring {
    fn default() -> Self {
        Self::IDLE
    }
}

/// Foreground side of the routing
#[derive(Debug, Default)]
pub struct Rp2040Acquisition {
    wiring: Wiring,
}

impl Rp2040Acquisition {
    pub const fn new() -> Self {
        Self {
            wiring: Wiring::IDLE,
        }
    }

    pub fn wiring(&self) -> Wiring {
        self.wiring
    }

    fn publish(&mut self) {
        WIRING.sender().send(self.wiring);
    }
}

impl Acquisition for Rp2040Acquisition {
    fn configure(&mut self, producer: Producer, trigger: Trigger) {
        self.wiring = Wiring {
            producer: Some(producer),
            trigger,
            running: true,
        };
        self.publish();
    }

    fn configure_serial(&mut self, config: SerialConfig) {
        SERIAL_CONFIG.signal(config);
    }

    fn start(&mut self) {
        self.wiring.running = true;
        self.publish();
    }

    fn stop(&mut self) {
        self.wiring.running = false;
        self.publish();
    }

    fn is_running(&self) -> bool {
        self.wiring.running
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wiring_feeds_only_its_producer() {
        let wiring = Wiring {
            producer: Some(Producer::AdcResult),
            trigger: Trigger::Free,
            running: true,
        };
        assert!(wiring.feeds(Producer::AdcResult));
        assert!(!wiring.feeds(Producer::CaptureA));
        assert!(!Wiring { running: false, ..wiring }.feeds(Producer::AdcResult));
        assert!(!Wiring::IDLE.feeds(Producer::AdcResult));
    }
}
