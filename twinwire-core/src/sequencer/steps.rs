//! Sequencer steps and their expansion into single-byte transactions

use super::registers::{reg, AXIS_BYTES, IDENTITY};
use crate::master::{Request, RequestError, MAX_BYTE_COUNT, MIN_BYTE_COUNT};

/// One step of the bring-up sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Step {
    /// Write a register pointer
    Select { register: u8 },
    /// Select a register, read it back and compare
    Identify { register: u8, expected: u8 },
    /// Read `count` consecutive registers, one pointer write and one
    /// single-byte read per register
    ReadBurst { register: u8, count: u8 },
}

impl Step {
    /// Number of master transactions this step expands to
    pub const fn transactions(&self) -> u8 {
        match self {
            Step::Select { .. } => 1,
            Step::Identify { .. } => 2,
            Step::ReadBurst { count, .. } => count.saturating_mul(2),
        }
    }

    /// Number of bytes this step reads from the device
    pub const fn reads(&self) -> u8 {
        match self {
            Step::Select { .. } => 0,
            Step::Identify { .. } => 1,
            Step::ReadBurst { count, .. } => *count,
        }
    }

    /// Check if transaction `index` of this step is a read
    pub const fn is_read(&self, index: u8) -> bool {
        match self {
            Step::Select { .. } => false,
            Step::Identify { .. } | Step::ReadBurst { .. } => index % 2 == 1,
        }
    }

    /// Build transaction `index` for the device at `address`
    pub fn transaction(&self, address: u8, index: u8) -> Result<Request, RequestError> {
        match *self {
            Step::Select { register } => Request::write(address, register),
            Step::Identify { register, .. } => {
                if index == 0 {
                    Request::write(address, register)
                } else {
                    Request::read(address)
                }
            }
            Step::ReadBurst { register, count } => {
                if index % 2 == 0 {
                    Request::write(address, register.wrapping_add(index / 2))
                } else {
                    Request::read(address)?.with_byte_count(count)
                }
            }
        }
    }

    /// Check the step's own parameters
    pub const fn validate(&self) -> Result<(), RequestError> {
        match self {
            Step::ReadBurst { count, .. } if *count < MIN_BYTE_COUNT || *count > MAX_BYTE_COUNT => {
                Err(RequestError::ByteCount(*count))
            }
            _ => Ok(()),
        }
    }
}

/// Power up, select the clock divider, identify, then sample both sensors
pub const DEFAULT_STEPS: [Step; 5] = [
    Step::Select {
        register: reg::PWR_MGMT_1,
    },
    Step::Select {
        register: reg::SMPLRT_DIV,
    },
    Step::Identify {
        register: reg::WHO_AM_I,
        expected: IDENTITY,
    },
    Step::ReadBurst {
        register: reg::ACCEL_XOUT_H,
        count: AXIS_BYTES,
    },
    Step::ReadBurst {
        register: reg::GYRO_XOUT_H,
        count: AXIS_BYTES,
    },
];
