//! Transaction request

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::state::Direction;

/// Largest 7-bit device address
pub const MAX_ADDRESS: u8 = 0x7F;

/// Smallest accepted byte count
pub const MIN_BYTE_COUNT: u8 = 1;

/// Largest accepted byte count
pub const MAX_BYTE_COUNT: u8 = 20;

/// Request validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RequestError {
    /// Device address does not fit in 7 bits
    Address(u8),
    /// Byte count outside 1..=20
    ByteCount(u8),
}

/// One single-byte transaction
///
/// Captured by the master when the request-valid pulse is seen in idle and
/// left untouched until the transaction returns to idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Request {
    address_rw: u8,
    data: u8,
    byte_count: u8,
    /// Stop right after the address acknowledgment
    address_only: bool,
}

impl Default for Request {
    fn default() -> Self {
        Self::IDLE
    }
}

impl Request {
    /// Placeholder held by the master while no transaction is active
    pub(crate) const IDLE: Self = Self {
        address_rw: 0,
        data: 0,
        byte_count: MIN_BYTE_COUNT,
        address_only: false,
    };

    /// Write `data` to the device at 7-bit `address`
    pub const fn write(address: u8, data: u8) -> Result<Self, RequestError> {
        if address > MAX_ADDRESS {
            return Err(RequestError::Address(address));
        }
        Ok(Self {
            address_rw: address << 1,
            data,
            byte_count: MIN_BYTE_COUNT,
            address_only: false,
        })
    }

    /// Read one byte from the device at 7-bit `address`
    pub const fn read(address: u8) -> Result<Self, RequestError> {
        if address > MAX_ADDRESS {
            return Err(RequestError::Address(address));
        }
        Ok(Self {
            address_rw: (address << 1) | 0x01,
            data: 0,
            byte_count: MIN_BYTE_COUNT,
            address_only: false,
        })
    }

    /// Address the device at 7-bit `address` and stop after its
    /// acknowledgment, without a data byte
    pub const fn probe(address: u8) -> Result<Self, RequestError> {
        match Self::write(address, 0) {
            Ok(mut request) => {
                request.address_only = true;
                Ok(request)
            }
            Err(e) => Err(e),
        }
    }

    /// Annotate the request with the length of the burst it belongs to
    pub const fn with_byte_count(mut self, count: u8) -> Result<Self, RequestError> {
        if count < MIN_BYTE_COUNT || count > MAX_BYTE_COUNT {
            return Err(RequestError::ByteCount(count));
        }
        self.byte_count = count;
        Ok(self)
    }

    /// Address-plus-R/W byte as it appears on the wire
    pub const fn address_byte(&self) -> u8 {
        self.address_rw
    }

    /// 7-bit device address
    pub const fn address(&self) -> u8 {
        self.address_rw >> 1
    }

    /// Data byte shifted out by a write
    pub const fn data(&self) -> u8 {
        self.data
    }

    pub const fn byte_count(&self) -> u8 {
        self.byte_count
    }

    pub const fn direction(&self) -> Direction {
        Direction::from_address_byte(self.address_rw)
    }

    pub const fn is_read(&self) -> bool {
        matches!(self.direction(), Direction::Read)
    }

    /// Check if the transaction ends after the address byte
    pub const fn is_address_only(&self) -> bool {
        self.address_only
    }
}
