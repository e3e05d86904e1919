//! Bus sample value types
//!
//! The port sampler stores raw pin snapshots. Decoders never look at bit
//! positions: a per-protocol layout turns each snapshot into a small
//! value with one named field per logical signal.

/// Raw port snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PortSample(u8);

impl PortSample {
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Level of pin `index`
    pub const fn pin(self, index: u8) -> bool {
        self.0 & (1 << index) != 0
    }

    /// Snapshot with pin `index` driven to `level`
    pub const fn with_pin(self, index: u8, level: bool) -> Self {
        if level {
            Self(self.0 | (1 << index))
        } else {
            Self(self.0 & !(1 << index))
        }
    }
}

/// TWI signals at one sampling event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TwiSample {
    /// Data line level
    pub sda: bool,
    /// Clock line level
    pub scl: bool,
    /// The event was a START/STOP pulse rather than a clock edge
    pub condition: bool,
}

/// Pin assignment for TWI snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TwiLayout {
    pub sda: u8,
    pub scl: u8,
    /// START/STOP pulse generator output, active low
    pub condition: u8,
}

impl TwiLayout {
    pub const DEFAULT: TwiLayout = TwiLayout {
        sda: 0,
        scl: 1,
        condition: 7,
    };

    pub const fn sample(&self, raw: PortSample) -> TwiSample {
        TwiSample {
            sda: raw.pin(self.sda),
            scl: raw.pin(self.scl),
            condition: !raw.pin(self.condition),
        }
    }

    /// Snapshot a producer would capture for these levels
    pub const fn encode(&self, sample: TwiSample) -> PortSample {
        PortSample::from_bits(0)
            .with_pin(self.sda, sample.sda)
            .with_pin(self.scl, sample.scl)
            .with_pin(self.condition, !sample.condition)
    }
}

/// SPI signals at one sampling event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpiSample {
    /// Raw chip-select level
    pub select: bool,
    pub miso: bool,
    pub mosi: bool,
}

/// Pin assignment for SPI snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiLayout {
    pub select: u8,
    pub miso: u8,
    pub mosi: u8,
}

impl SpiLayout {
    pub const DEFAULT: SpiLayout = SpiLayout {
        select: 0,
        miso: 1,
        mosi: 6,
    };

    pub const fn sample(&self, raw: PortSample) -> SpiSample {
        SpiSample {
            select: raw.pin(self.select),
            miso: raw.pin(self.miso),
            mosi: raw.pin(self.mosi),
        }
    }

    pub const fn encode(&self, sample: SpiSample) -> PortSample {
        PortSample::from_bits(0)
            .with_pin(self.select, sample.select)
            .with_pin(self.miso, sample.miso)
            .with_pin(self.mosi, sample.mosi)
    }
}

/// Serial line levels at one sampling event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SerialSample {
    /// Receive line (device to probe)
    pub rx: bool,
    /// Transmit line (probe-side second channel)
    pub tx: bool,
}

/// Pin assignment for serial snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialLayout {
    pub rx: u8,
    pub tx: u8,
}

impl SerialLayout {
    pub const DEFAULT: SerialLayout = SerialLayout { rx: 6, tx: 1 };

    pub const fn sample(&self, raw: PortSample) -> SerialSample {
        SerialSample {
            rx: raw.pin(self.rx),
            tx: raw.pin(self.tx),
        }
    }

    pub const fn encode(&self, sample: SerialSample) -> PortSample {
        PortSample::from_bits(0)
            .with_pin(self.rx, sample.rx)
            .with_pin(self.tx, sample.tx)
    }
}

/// Hardware receiver status byte, stored ahead of each received data byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReceiverStatus(u8);

impl ReceiverStatus {
    const RX: u8 = 0x80;
    const TX: u8 = 0x40;
    const FRAME_ERROR: u8 = 0x10;
    const PARITY_ERROR: u8 = 0x04;

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Status for a byte received on channel `direction`
    pub const fn received(direction: Direction, frame_error: bool, parity_error: bool) -> Self {
        let mut bits = match direction {
            Direction::Rx => Self::RX,
            Direction::Tx => Self::TX,
        };
        if frame_error {
            bits |= Self::FRAME_ERROR;
        }
        if parity_error {
            bits |= Self::PARITY_ERROR;
        }
        Self(bits)
    }

    /// Channel the record came from, `None` for records without data
    pub const fn direction(self) -> Option<Direction> {
        if self.0 & Self::RX != 0 {
            Some(Direction::Rx)
        } else if self.0 & Self::TX != 0 {
            Some(Direction::Tx)
        } else {
            None
        }
    }

    pub const fn frame_error(self) -> bool {
        self.0 & Self::FRAME_ERROR != 0
    }

    pub const fn parity_error(self) -> bool {
        self.0 & Self::PARITY_ERROR != 0
    }
}

/// Serial channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Rx,
    Tx,
}
