//! Clock generator and bus clock driver
//!
//! [`ClockGenerator`] is the single source of bit timing. The bus clock
//! waveform ([`SclDriver`]) and every data-line decision of the protocol
//! state machine are derived from the same counter, so clock and data can
//! never drift apart.

use crate::config::BusTiming;
use crate::line::Drive;

/// Bus-clock periods per byte frame (8 data bits plus acknowledge)
pub const FRAME_PERIODS: u8 = 9;

/// Edge count at which the last address bit has been clocked out
pub const ADDRESS_DONE: u8 = 8;

/// Edge count at which the last data bit has been clocked out
pub const DATA_DONE: u8 = ADDRESS_DONE + FRAME_PERIODS;

/// Free-running period counter plus elapsed-period count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockGenerator {
    counter: u32,
    edges: u8,
}

impl ClockGenerator {
    pub const fn new() -> Self {
        Self {
            counter: 0,
            edges: 0,
        }
    }

    /// State after one tick
    ///
    /// While disabled both counters hold at zero.
    pub const fn next(self, timing: &BusTiming, enabled: bool) -> Self {
        if !enabled {
            return Self::new();
        }

        if self.counter + 1 >= timing.period() {
            Self {
                counter: 0,
                edges: self.edges.saturating_add(1),
            }
        } else {
            Self {
                counter: self.counter + 1,
                edges: self.edges,
            }
        }
    }

    /// Position inside the current bus-clock period
    pub const fn counter(&self) -> u32 {
        self.counter
    }

    /// Bus-clock periods elapsed since the clock was enabled
    pub const fn edges(&self) -> u8 {
        self.edges
    }

    /// Position inside the current byte frame (0..9)
    pub const fn frame_edge(&self) -> u8 {
        self.edges % FRAME_PERIODS
    }

    /// Check if the bus clock is in its released phase
    pub const fn in_released_phase(&self, timing: &BusTiming) -> bool {
        self.counter < timing.duty()
    }

    /// Check if this tick is the start/stop point of the released phase
    pub const fn at_start_stop(&self, timing: &BusTiming) -> bool {
        self.counter == timing.start_stop()
    }

    /// Check if this tick is the data-change point of the low phase
    pub const fn at_data_point(&self, timing: &BusTiming) -> bool {
        self.counter == timing.data_point()
    }
}

/// Open-drain bus clock output with a one-tick history for edge detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SclDriver {
    output: Drive,
    previous: Drive,
}

impl Default for SclDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl SclDriver {
    pub const fn new() -> Self {
        Self {
            output: Drive::Released,
            previous: Drive::Released,
        }
    }

    /// State after one tick
    ///
    /// Released for the first `duty` ticks of each period, low for the
    /// rest, and released whenever the clock is disabled.
    pub const fn next(self, timing: &BusTiming, clock: &ClockGenerator, enabled: bool) -> Self {
        let output = if enabled && !clock.in_released_phase(timing) {
            Drive::Low
        } else {
            Drive::Released
        };

        Self {
            output,
            previous: self.output,
        }
    }

    /// Current drive on the clock line
    pub const fn output(&self) -> Drive {
        self.output
    }

    /// Bus clock was released this tick after being low
    pub const fn rising_edge(&self) -> bool {
        matches!((self.previous, self.output), (Drive::Low, Drive::Released))
    }

    /// Bus clock was pulled low this tick after being released
    pub const fn falling_edge(&self) -> bool {
        matches!((self.previous, self.output), (Drive::Released, Drive::Low))
    }
}
