//! Open-drain bus lines

use twinwire_core::line::{wired_and, Drive, Level};

/// Resolved level of both bus lines for one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusLines {
    pub scl: Level,
    pub sda: Level,
}

impl Default for BusLines {
    fn default() -> Self {
        Self::IDLE
    }
}

impl BusLines {
    /// Both lines pulled up
    pub const IDLE: Self = Self {
        scl: Level::High,
        sda: Level::High,
    };

    /// Resolve every driver on each line
    pub fn resolve(scl: &[Drive], sda: &[Drive]) -> Self {
        Self {
            scl: wired_and(scl),
            sda: wired_and(sda),
        }
    }

    /// Clock went high since `prev`
    pub fn scl_rose(&self, prev: &Self) -> bool {
        prev.scl.is_low() && self.scl.is_high()
    }

    /// Clock went low since `prev`
    pub fn scl_fell(&self, prev: &Self) -> bool {
        prev.scl.is_high() && self.scl.is_low()
    }

    /// Data fell while the clock stayed high
    pub fn is_start(&self, prev: &Self) -> bool {
        prev.scl.is_high() && self.scl.is_high() && prev.sda.is_high() && self.sda.is_low()
    }

    /// Data rose while the clock stayed high
    pub fn is_stop(&self, prev: &Self) -> bool {
        prev.scl.is_high() && self.scl.is_high() && prev.sda.is_low() && self.sda.is_high()
    }
}
