//! Master instantiation parameters

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::timing::BusTiming;
use crate::line::Level;

/// Active level of the reset input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ResetPolarity {
    /// Reset while the input is high
    #[default]
    ActiveHigh,
    /// Reset while the input is low
    ActiveLow,
}

impl ResetPolarity {
    /// Check if `level` holds the design in reset
    pub const fn is_asserted(self, level: Level) -> bool {
        match self {
            ResetPolarity::ActiveHigh => level.is_high(),
            ResetPolarity::ActiveLow => level.is_low(),
        }
    }

    /// Input level that asserts reset
    pub const fn asserted(self) -> Level {
        match self {
            ResetPolarity::ActiveHigh => Level::High,
            ResetPolarity::ActiveLow => Level::Low,
        }
    }

    /// Input level that releases reset
    pub const fn released(self) -> Level {
        match self {
            ResetPolarity::ActiveHigh => Level::Low,
            ResetPolarity::ActiveLow => Level::High,
        }
    }
}

/// Complete master configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MasterConfig {
    /// Bus clock timing
    pub timing: BusTiming,
    /// Reset input polarity
    pub reset_polarity: ResetPolarity,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            timing: BusTiming::FAST_MODE_50MHZ,
            reset_polarity: ResetPolarity::ActiveHigh,
        }
    }
}

impl MasterConfig {
    /// Create a config with the given timing and an active-high reset
    pub const fn new(timing: BusTiming) -> Self {
        Self {
            timing,
            reset_polarity: ResetPolarity::ActiveHigh,
        }
    }

    /// Use an active-low reset input
    pub const fn active_low_reset(mut self) -> Self {
        self.reset_polarity = ResetPolarity::ActiveLow;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_polarity() {
        assert!(ResetPolarity::ActiveHigh.is_asserted(Level::High));
        assert!(!ResetPolarity::ActiveHigh.is_asserted(Level::Low));
        assert!(ResetPolarity::ActiveLow.is_asserted(Level::Low));
        assert_eq!(ResetPolarity::ActiveLow.released(), Level::High);
    }

    #[test]
    fn test_default_config() {
        let config = MasterConfig::default();
        assert_eq!(config.timing.period(), 125);
        assert_eq!(config.reset_polarity, ResetPolarity::ActiveHigh);

        let low = MasterConfig::new(BusTiming::FAST_MODE_100MHZ).active_low_reset();
        assert_eq!(low.reset_polarity, ResetPolarity::ActiveLow);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize_checks_timing() {
        let config: MasterConfig =
            toml::from_str("reset_polarity = \"ActiveLow\"\n[timing]\nperiod = 125\n").unwrap();
        assert_eq!(config, MasterConfig::default().active_low_reset());

        let zero = toml::from_str::<MasterConfig>("reset_polarity = \"ActiveHigh\"\n[timing]\nperiod = 0\n");
        assert!(zero.is_err());
    }
}
