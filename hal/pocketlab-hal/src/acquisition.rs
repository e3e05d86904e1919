//! Acquisition hardware abstractions
//!
//! Sample producers run in interrupt or DMA context and append to the
//! ring buffer on their own. The foreground only selects which producer
//! is wired in, and connects or disconnects it.

/// Sample producer wired into the ring buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Producer {
    /// UART receiver, pushes (status, data) byte pairs
    UartReceiver = 0,
    /// GPIO port snapshot, one byte per sampling event
    PortSnapshot = 1,
    /// Free-running ADC, one signed 16-bit result per conversion
    AdcResult = 2,
    /// Timer capture channel A, 16-bit edge count per capture period
    CaptureA = 3,
    /// Timer capture counter, 16-bit low-pulse duration
    CaptureCount = 4,
}

impl Producer {
    /// Bytes occupied by one element of this producer in the ring buffer
    pub const fn element_width(self) -> usize {
        match self {
            Producer::UartReceiver | Producer::PortSnapshot => 1,
            Producer::AdcResult | Producer::CaptureA | Producer::CaptureCount => 2,
        }
    }

    /// Get the producer as a byte value
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Create a producer from a byte value
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Producer::UartReceiver),
            1 => Some(Producer::PortSnapshot),
            2 => Some(Producer::AdcResult),
            3 => Some(Producer::CaptureA),
            4 => Some(Producer::CaptureCount),
            _ => None,
        }
    }
}

/// Signal edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Edge {
    Falling,
    Rising,
}

/// What paces a producer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Trigger {
    /// The producer paces itself (ADC free-run, receivers, captures)
    Free,
    /// Fixed sampling rate in Hz
    Rate(u32),
    /// Protocol clock edge, plus the protocol's framing events
    Clock(Edge),
}

/// Parity setting of a hardware serial receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SerialParity {
    None,
    Odd,
    Even,
}

/// Hardware serial receiver setup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SerialConfig {
    /// Baud rate in bits per second
    pub baud: u32,
    /// Data bits per frame (5-8)
    pub data_bits: u8,
    /// Parity mode
    pub parity: SerialParity,
    /// Receive line is inverted (IrDA style)
    pub inverted: bool,
}

/// Sample producer control
///
/// `configure` is called once per mode entry. `start`/`stop` connect and
/// disconnect the producer from the buffer without losing the wiring,
/// which is how hold and overflow recovery are implemented.
pub trait Acquisition {
    /// Wire `producer` into the ring buffer, paced by `trigger`
    ///
    /// The producer is left running.
    fn configure(&mut self, producer: Producer, trigger: Trigger);

    /// Configure the hardware serial receivers
    ///
    /// Only meaningful for [`Producer::UartReceiver`].
    fn configure_serial(&mut self, config: SerialConfig);

    /// Connect the producer to the buffer
    fn start(&mut self);

    /// Disconnect the producer from the buffer
    fn stop(&mut self);

    /// Whether the producer is currently connected
    fn is_running(&self) -> bool;
}

/// Window comparator crossing direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Crossing {
    /// Input fell below the threshold
    Below,
    /// Input rose above the threshold
    Above,
}

/// Analog input selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AnalogInput {
    /// Probe through the voltage divider
    Voltage,
    /// Probe through the current shunt amplifier
    Current,
    /// Internally shorted input, used to measure the zero offset
    Zero,
}

/// Analog front-end control
///
/// Covers the ADC trim registers, the window comparator used by the
/// auto-zoom trigger and the one-shot trigger timeout. Comparator and
/// timeout events are delivered back to the active mode by the board.
pub trait AnalogFrontEnd {
    /// Program offset and gain correction
    fn set_trim(&mut self, offset: i16, gain: u16);

    /// Select the ADC input
    fn select_input(&mut self, input: AnalogInput);

    /// Arm the comparator to report `crossing` of `threshold`
    fn watch(&mut self, threshold: i16, crossing: Crossing);

    /// Disarm the comparator
    fn unwatch(&mut self);

    /// Restart the one-shot trigger timeout
    fn restart_trigger_timeout(&mut self);
}

/// Minimum clock period tracker
///
/// An auxiliary timer measures the shortest interval between protocol
/// clock edges. Decoders compare it against their glitch floor.
pub trait ClockMonitor {
    /// Shortest clock period seen since the last reset, in timer counts
    fn min_period(&self) -> u16;

    /// Start a new measurement
    fn reset(&mut self);
}
