//! Two-stage synchronizers
//!
//! The data line can change at any time relative to the timebase, so it is
//! passed through two registers before any protocol decision looks at it.

use crate::config::ResetPolarity;
use crate::line::Level;

/// Two-stage delay chain for an asynchronous input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InputSynchronizer {
    first: Level,
    second: Level,
}

impl Default for InputSynchronizer {
    fn default() -> Self {
        Self::new()
    }
}

impl InputSynchronizer {
    /// Both stages start at the idle bus level
    pub const fn new() -> Self {
        Self {
            first: Level::High,
            second: Level::High,
        }
    }

    /// State after one tick with `raw` on the input
    pub const fn shift(self, raw: Level) -> Self {
        Self {
            first: raw,
            second: self.first,
        }
    }

    /// The only value protocol logic may trust
    pub const fn stable(&self) -> Level {
        self.second
    }
}

/// Reset synchronizer with configurable polarity
///
/// Assertion reaches the output on the same tick; release is delayed by
/// two ticks so every register leaves reset on a clean timebase edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ResetSynchronizer {
    polarity: ResetPolarity,
    stages: [Level; 2],
}

impl ResetSynchronizer {
    /// Create a synchronizer that starts out holding reset
    pub const fn new(polarity: ResetPolarity) -> Self {
        Self {
            polarity,
            stages: [polarity.asserted(); 2],
        }
    }

    /// Advance one tick and return the synchronized reset level
    pub fn tick(&mut self, raw: Level) -> Level {
        if self.polarity.is_asserted(raw) {
            self.stages = [raw; 2];
        } else {
            self.stages = [raw, self.stages[0]];
        }
        self.stages[1]
    }

    /// Check if the synchronized output currently holds reset
    pub const fn is_asserted(&self) -> bool {
        self.polarity.is_asserted(self.stages[1])
    }
}
