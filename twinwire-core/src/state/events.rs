//! Events that trigger protocol state transitions

/// Transfer direction encoded in the low bit of the address byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// R/W bit clear: master transmits the data byte
    Write,
    /// R/W bit set: peripheral transmits the data byte
    Read,
}

impl Direction {
    /// Direction from an address-plus-R/W byte
    pub const fn from_address_byte(byte: u8) -> Self {
        if byte & 0x01 != 0 {
            Direction::Read
        } else {
            Direction::Write
        }
    }
}

/// Events observed by the master during one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    // Request handling
    /// Request-valid pulse seen while idle
    RequestAccepted,

    // Bus conditions
    /// Data line pulled low while the clock is released
    StartIssued,
    /// Data line released while the clock is released
    StopIssued {
        /// An acknowledgment failure was latched during this transaction
        failed: bool,
    },

    // Byte framing
    /// All 8 address bits clocked out
    AddressShifted(Direction),
    /// All 8 address bits of an address-only transaction clocked out
    AddressOnlyShifted,
    /// All 8 data bits clocked out
    DataShifted,
    /// All 8 data bits sampled from the peripheral
    ByteReceived,
    /// Master acknowledgment window finished
    AckSent,

    // Acknowledgment from the peripheral
    /// Data line low at the acknowledgment sampling edge
    AckReceived,
    /// Data line high at the acknowledgment sampling edge
    NackReceived,
    /// No sampling edge within the acknowledgment timeout
    AckTimeout,

    // Completion
    /// Error flag latched
    ErrorLatched,
    /// Result presented for one tick
    ResultPresented,
}

impl Event {
    /// Check if this event means the peripheral did not acknowledge
    pub fn is_ack_failure(&self) -> bool {
        matches!(self, Event::NackReceived | Event::AckTimeout)
    }
}
