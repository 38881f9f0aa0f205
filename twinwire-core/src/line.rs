//! Open-drain line model
//!
//! Both bus lines are shared wired-AND nets with an external pull-up.
//! Components only ever pull a line low or let go of it; the observed
//! level is resolved by [`wired_and`].

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What a component does to an open-drain line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Drive {
    /// Actively pull the line low
    Low,
    /// High impedance; the pull-up or another driver sets the level
    #[default]
    Released,
}

impl Drive {
    /// Drive for a data bit: `0` pulls low, `1` releases
    pub const fn from_bit(bit: bool) -> Self {
        if bit {
            Drive::Released
        } else {
            Drive::Low
        }
    }

    /// Check if this driver pulls the line low
    pub const fn is_low(self) -> bool {
        matches!(self, Drive::Low)
    }
}

/// Level observed on a line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Level {
    Low,
    #[default]
    High,
}

impl Level {
    pub const fn is_high(self) -> bool {
        matches!(self, Level::High)
    }

    pub const fn is_low(self) -> bool {
        matches!(self, Level::Low)
    }

    /// Level as a data bit
    pub const fn bit(self) -> u8 {
        match self {
            Level::Low => 0,
            Level::High => 1,
        }
    }
}

impl From<Drive> for Level {
    /// Level of a line with a single driver and a pull-up
    fn from(drive: Drive) -> Self {
        match drive {
            Drive::Low => Level::Low,
            Drive::Released => Level::High,
        }
    }
}

/// Resolve an open-drain net
///
/// Low if any driver pulls low, otherwise high through the pull-up.
pub fn wired_and(drivers: &[Drive]) -> Level {
    if drivers.iter().any(|d| d.is_low()) {
        Level::Low
    } else {
        Level::High
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bit_never_drives_high() {
        assert_eq!(Drive::from_bit(false), Drive::Low);
        assert_eq!(Drive::from_bit(true), Drive::Released);
    }

    #[test]
    fn test_wired_and() {
        assert_eq!(wired_and(&[]), Level::High);
        assert_eq!(wired_and(&[Drive::Released, Drive::Released]), Level::High);
        assert_eq!(wired_and(&[Drive::Released, Drive::Low]), Level::Low);
        assert_eq!(wired_and(&[Drive::Low, Drive::Low]), Level::Low);
    }

    #[test]
    fn test_level_bit() {
        assert_eq!(Level::High.bit(), 1);
        assert_eq!(Level::Low.bit(), 0);
        assert_eq!(Level::from(Drive::Released), Level::High);
    }
}
