//! Bus clock timing derived from the timebase and target bus frequency
//!
//! One bus-clock period is `period` timebase ticks. The bus clock is
//! released for the first `duty` ticks of each period and pulled low for
//! the rest:
//!
//! ```text
//!  counter: 0 ........ start_stop .... duty ........ data_point ..... period-1
//!  SCL:     ‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾|___________________________________
//!                      ^ start/stop                  ^ SDA changes here
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use core::fmt;

/// Smallest period (in timebase ticks) that leaves distinct start/stop and
/// data points in each half of the bus clock
pub const MIN_PERIOD: u32 = 8;

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Timebase or bus frequency is zero
    ZeroFrequency,
    /// Bus frequency too high for the timebase
    BusTooFast {
        /// Period that the frequencies would yield, in timebase ticks
        period: u32,
    },
    /// Period does not fit the 32-bit tick counter
    BusTooSlow,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroFrequency => write!(f, "timebase and bus frequency must be non-zero"),
            ConfigError::BusTooFast { period } => {
                write!(f, "period of {period} ticks is below the minimum of {MIN_PERIOD}")
            }
            ConfigError::BusTooSlow => write!(f, "period exceeds the tick counter range"),
        }
    }
}

/// Bus clock timing constants
///
/// Serialized as its period alone; deserializing re-derives the other
/// points and rejects periods below [`MIN_PERIOD`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "TimingRepr", into = "TimingRepr"))]
pub struct BusTiming {
    period: u32,
    duty: u32,
    start_stop: u32,
    data_point: u32,
}

impl BusTiming {
    /// 50 MHz timebase, 400 kHz bus (period of 125 ticks)
    pub const FAST_MODE_50MHZ: Self = match Self::new(50, 400) {
        Ok(timing) => timing,
        Err(_) => panic!("invalid fast-mode timing"),
    };

    /// 100 MHz timebase, 400 kHz bus
    pub const FAST_MODE_100MHZ: Self = match Self::new(100, 400) {
        Ok(timing) => timing,
        Err(_) => panic!("invalid fast-mode timing"),
    };

    /// 50 MHz timebase, 100 kHz bus
    pub const STANDARD_MODE_50MHZ: Self = match Self::new(50, 100) {
        Ok(timing) => timing,
        Err(_) => panic!("invalid standard-mode timing"),
    };

    /// Derive timing from the timebase frequency and the desired bus frequency
    ///
    /// `period = 1000 * timebase_mhz / scl_khz`, `duty = period / 2`.
    pub const fn new(timebase_mhz: u32, scl_khz: u32) -> Result<Self, ConfigError> {
        if timebase_mhz == 0 || scl_khz == 0 {
            return Err(ConfigError::ZeroFrequency);
        }

        let wide = 1000 * timebase_mhz as u64 / scl_khz as u64;
        if wide > u32::MAX as u64 {
            return Err(ConfigError::BusTooSlow);
        }
        Self::from_period(wide as u32)
    }

    /// Derive timing from a period given directly in timebase ticks
    pub const fn from_period(period: u32) -> Result<Self, ConfigError> {
        if period < MIN_PERIOD {
            return Err(ConfigError::BusTooFast { period });
        }

        let duty = period / 2;
        Ok(Self {
            period,
            duty,
            start_stop: (duty as u64 * 3 / 4) as u32,
            data_point: duty + (period - duty) / 2,
        })
    }

    /// Timebase ticks per bus-clock period
    pub const fn period(&self) -> u32 {
        self.period
    }

    /// Counter value where the bus clock goes from released to low
    pub const fn duty(&self) -> u32 {
        self.duty
    }

    /// Counter value (inside the released phase) where start and stop
    /// conditions move the data line
    pub const fn start_stop(&self) -> u32 {
        self.start_stop
    }

    /// Counter value (inside the low phase) where the data line changes
    pub const fn data_point(&self) -> u32 {
        self.data_point
    }

    /// Bus frequency actually produced, in Hz
    pub const fn scl_hz(&self, timebase_mhz: u32) -> u32 {
        let hz = timebase_mhz as u64 * 1_000_000 / self.period as u64;
        if hz > u32::MAX as u64 {
            u32::MAX
        } else {
            hz as u32
        }
    }
}

/// Wire shape of [`BusTiming`]
#[cfg(feature = "serde")]
#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct TimingRepr {
    period: u32,
}

#[cfg(feature = "serde")]
impl TryFrom<TimingRepr> for BusTiming {
    type Error = ConfigError;

    fn try_from(repr: TimingRepr) -> Result<Self, Self::Error> {
        Self::from_period(repr.period)
    }
}

#[cfg(feature = "serde")]
impl From<BusTiming> for TimingRepr {
    fn from(timing: BusTiming) -> Self {
        Self {
            period: timing.period,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fast_mode_constants() {
        let timing = BusTiming::FAST_MODE_50MHZ;
        assert_eq!(timing.period(), 125);
        assert_eq!(timing.duty(), 62);
        assert_eq!(timing.start_stop(), 46);
        assert_eq!(timing.data_point(), 93);
        assert_eq!(timing.scl_hz(50), 400_000);
    }

    #[test]
    fn test_presets() {
        assert_eq!(BusTiming::FAST_MODE_100MHZ.period(), 250);
        assert_eq!(BusTiming::STANDARD_MODE_50MHZ.period(), 500);
        assert_eq!(BusTiming::STANDARD_MODE_50MHZ.scl_hz(50), 100_000);
    }

    #[test]
    fn test_points_fall_in_their_phase() {
        for (mhz, khz) in [(50, 400), (100, 400), (8, 400), (4, 400), (50, 100), (2, 250)] {
            let t = BusTiming::new(mhz, khz).unwrap();
            assert!(t.duty() > 0);
            assert!(t.start_stop() > 0 && t.start_stop() < t.duty());
            assert!(t.data_point() > t.duty());
            assert!(t.data_point() + 1 < t.period());
        }
    }

    #[test]
    fn test_zero_frequency_rejected() {
        assert_eq!(BusTiming::new(0, 400), Err(ConfigError::ZeroFrequency));
        assert_eq!(BusTiming::new(50, 0), Err(ConfigError::ZeroFrequency));
    }

    #[test]
    fn test_bus_too_fast_rejected() {
        // 1 MHz timebase cannot produce a 400 kHz bus with 8 ticks per period
        assert_eq!(
            BusTiming::new(1, 400),
            Err(ConfigError::BusTooFast { period: 2 })
        );
        // Ratio rounds to zero
        assert_eq!(
            BusTiming::new(1, 2000),
            Err(ConfigError::BusTooFast { period: 0 })
        );
    }

    #[test]
    fn test_period_overflow_rejected() {
        assert_eq!(BusTiming::new(4_294_968, 1), Err(ConfigError::BusTooSlow));
        assert_eq!(BusTiming::new(u32::MAX, 1), Err(ConfigError::BusTooSlow));

        let widest = BusTiming::new(4_294_967, 1).unwrap();
        assert_eq!(widest.period(), 4_294_967_000);
        assert_eq!(BusTiming::from_period(u32::MAX).unwrap().duty(), u32::MAX / 2);
    }

    #[test]
    fn test_from_period_matches_new() {
        assert_eq!(BusTiming::from_period(125), Ok(BusTiming::FAST_MODE_50MHZ));
        assert_eq!(
            BusTiming::from_period(MIN_PERIOD - 1),
            Err(ConfigError::BusTooFast { period: 7 })
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize_validates() {
        let timing: BusTiming = toml::from_str("period = 250").unwrap();
        assert_eq!(timing, BusTiming::FAST_MODE_100MHZ);
        assert_eq!(
            toml::to_string(&BusTiming::FAST_MODE_50MHZ).unwrap().trim(),
            "period = 125"
        );

        assert!(toml::from_str::<BusTiming>("period = 0").is_err());
        assert!(toml::from_str::<BusTiming>("period = 7").is_err());
        // Derived points are never taken from the input
        assert!(toml::from_str::<BusTiming>("period = 125\nduty = 0").is_err());
    }
}
