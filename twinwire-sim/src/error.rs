//! Testbench errors

use twinwire_core::master::RequestError;

/// Errors reported by [`crate::Testbench`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    /// The master flagged an acknowledgment failure
    NoAcknowledge,
    /// The transaction did not finish within the tick budget
    Timeout,
    /// The request could not be built
    Request(RequestError),
    /// A write carried more than the one data byte a transaction holds
    Unsupported,
}

impl From<RequestError> for BusError {
    fn from(e: RequestError) -> Self {
        BusError::Request(e)
    }
}

impl core::fmt::Display for BusError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BusError::NoAcknowledge => write!(f, "no acknowledge"),
            BusError::Timeout => write!(f, "transaction timed out"),
            BusError::Request(RequestError::Address(a)) => write!(f, "invalid address 0x{a:02x}"),
            BusError::Request(RequestError::ByteCount(n)) => write!(f, "invalid byte count {n}"),
            BusError::Unsupported => write!(f, "writes carry at most one data byte"),
        }
    }
}

impl std::error::Error for BusError {}

impl embedded_hal::i2c::Error for BusError {
    fn kind(&self) -> embedded_hal::i2c::ErrorKind {
        use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};

        match self {
            BusError::NoAcknowledge => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Unknown),
            _ => ErrorKind::Other,
        }
    }
}
