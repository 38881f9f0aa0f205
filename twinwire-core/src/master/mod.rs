//! Bus master
//!
//! [`Master::tick`] is one synchronous register-transfer step: every
//! register's next value is computed from the previous tick's registers
//! and this tick's inputs, then all of them update together.
//!
//! Bit timing is taken from the shared [`ClockGenerator`]. Counting bus
//! periods from the start condition (`edges`):
//!
//! | edges  | released phase          | low phase (data point)         |
//! |--------|-------------------------|--------------------------------|
//! | 0      | start condition         | address bit 7                  |
//! | 1..=7  | address bits clocked    | address bits 6..0              |
//! | 8      | address bit 0 clocked   | release for acknowledge        |
//! | 9      | acknowledge sampled     | data bit 7 (write)             |
//! | 10..17 | data bits clocked       | data bits 6..0, then release   |
//! | 18     | acknowledge sampled     | pull low for stop              |
//! | 19     | stop condition          |                                |
//!
//! Reads sample the data line on the rising edges of periods 10..=17 and
//! drive the master acknowledgment during period 17's low phase.

pub mod request;

pub use request::{Request, RequestError, MAX_ADDRESS, MAX_BYTE_COUNT, MIN_BYTE_COUNT};

use crate::clock::{ClockGenerator, SclDriver, ADDRESS_DONE, DATA_DONE};
use crate::config::{BusTiming, MasterConfig};
use crate::line::{Drive, Level};
use crate::state::{Event, State};
use crate::sync::InputSynchronizer;

/// Bus-clock periods to wait in [`State::WaitAck`] before giving up
pub const ACK_TIMEOUT_PERIODS: u32 = 2;

/// Bit index of the most significant bit
const MSB: u8 = 7;

/// Inputs sampled by the master on each tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MasterInputs {
    /// Reset input level (polarity set by [`MasterConfig`])
    pub reset: Level,
    /// Observed data line level
    pub sda: Level,
    /// Request-valid pulse with its fields
    pub request: Option<Request>,
}

/// Registered outputs of the master
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MasterOutputs {
    /// Drive on the clock line
    pub scl: Drive,
    /// Drive on the data line
    pub sda: Drive,
    /// Last received byte (zero after a write)
    pub data: u8,
    /// One-tick pulse on transaction completion
    pub valid: bool,
    /// Acknowledgment failure, held until the master is idle again
    pub error: bool,
    /// A transaction is in progress; requests are ignored
    pub busy: bool,
}

/// All state updated by the master, owned exclusively by [`Master::tick`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
struct Registers {
    state: State,
    /// Clock enable, owned by the state machine
    scl_enable: bool,
    clock: ClockGenerator,
    scl: SclDriver,
    sync: InputSynchronizer,
    sda: Drive,
    request: Request,
    /// Next bit to shift (MSB first); saturates at zero
    bit_index: u8,
    shift_in: u8,
    data_out: u8,
    valid: bool,
    error: bool,
    /// Data line pulled low ahead of the stop condition
    stop_low: bool,
    ack_ticks: u32,
}

impl Registers {
    const fn reset() -> Self {
        Self {
            state: State::Idle,
            scl_enable: false,
            clock: ClockGenerator::new(),
            scl: SclDriver::new(),
            sync: InputSynchronizer::new(),
            sda: Drive::Released,
            request: Request::IDLE,
            bit_index: MSB,
            shift_in: 0,
            data_out: 0,
            valid: false,
            error: false,
            stop_low: false,
            ack_ticks: 0,
        }
    }
}

/// I2C bus master
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Master {
    config: MasterConfig,
    regs: Registers,
}

impl Master {
    /// Create a master in its reset state
    pub const fn new(config: MasterConfig) -> Self {
        Self {
            config,
            regs: Registers::reset(),
        }
    }

    pub const fn config(&self) -> &MasterConfig {
        &self.config
    }

    pub const fn timing(&self) -> &BusTiming {
        &self.config.timing
    }

    /// Current protocol state
    pub const fn state(&self) -> State {
        self.regs.state
    }

    /// Shared clock generator
    pub const fn clock(&self) -> &ClockGenerator {
        &self.regs.clock
    }

    /// Request captured for the transaction in progress
    pub fn request(&self) -> Option<&Request> {
        self.regs.state.is_busy().then_some(&self.regs.request)
    }

    /// Registered outputs
    pub fn outputs(&self) -> MasterOutputs {
        MasterOutputs {
            scl: self.regs.scl.output(),
            sda: self.regs.sda,
            data: self.regs.data_out,
            valid: self.regs.valid,
            error: self.regs.error,
            busy: self.regs.state.is_busy(),
        }
    }

    /// Advance one timebase tick
    pub fn tick(&mut self, inputs: MasterInputs) -> MasterOutputs {
        if self.config.reset_polarity.is_asserted(inputs.reset) {
            self.regs = Registers::reset();
            return self.outputs();
        }

        let cur = self.regs;
        let mut next = cur;
        let timing = self.config.timing;

        next.sync = cur.sync.shift(inputs.sda);
        next.clock = cur.clock.next(&timing, cur.scl_enable);
        next.scl = cur.scl.next(&timing, &cur.clock, cur.scl_enable);

        if let Some(event) = protocol(&timing, &cur, &mut next, inputs.request) {
            next.state = cur.state.transition(event);

            #[cfg(feature = "defmt")]
            {
                if event.is_ack_failure() {
                    defmt::warn!(
                        "i2c: no acknowledge from 0x{:02x} in {} (frame edge {})",
                        cur.request.address(),
                        cur.state,
                        cur.clock.frame_edge()
                    );
                }
                defmt::debug!("i2c: {} -> {} ({})", cur.state, next.state, event);
            }
        }
        next.scl_enable = next.state.clock_enabled();

        self.regs = next;
        self.outputs()
    }
}

/// Data-line and bookkeeping updates for one tick
///
/// Reads only `cur`, writes only `next`. Returns the event that moves the
/// state machine, if any.
fn protocol(
    timing: &BusTiming,
    cur: &Registers,
    next: &mut Registers,
    request: Option<Request>,
) -> Option<Event> {
    let clock = &cur.clock;

    match cur.state {
        State::Idle => {
            next.error = false;
            next.valid = false;
            next.sda = Drive::Released;
            next.stop_low = false;

            let request = request?;
            next.request = request;
            next.bit_index = MSB;
            next.shift_in = 0;
            next.ack_ticks = 0;
            Some(Event::RequestAccepted)
        }

        State::Start => {
            if clock.edges() == 0 && clock.at_start_stop(timing) {
                next.sda = Drive::Low;
                Some(Event::StartIssued)
            } else {
                None
            }
        }

        State::WriteAddress => shift_out(
            timing,
            cur,
            next,
            cur.request.address_byte(),
            ADDRESS_DONE,
            if cur.request.is_address_only() {
                Event::AddressOnlyShifted
            } else {
                Event::AddressShifted(cur.request.direction())
            },
        ),

        State::WriteData => shift_out(
            timing,
            cur,
            next,
            cur.request.data(),
            DATA_DONE,
            Event::DataShifted,
        ),

        State::WaitAck(_) => {
            next.ack_ticks = cur.ack_ticks.saturating_add(1);
            if cur.scl.rising_edge() {
                if cur.sync.stable().is_low() {
                    next.bit_index = MSB;
                    Some(Event::AckReceived)
                } else {
                    Some(Event::NackReceived)
                }
            } else if cur.ack_ticks >= ACK_TIMEOUT_PERIODS.saturating_mul(timing.period()) {
                // The acknowledge edge follows within one period while the
                // clock runs; only a stalled clock gets here
                Some(Event::AckTimeout)
            } else {
                None
            }
        }

        State::Read => {
            if !cur.scl.rising_edge() {
                return None;
            }
            if cur.sync.stable().is_high() {
                next.shift_in = cur.shift_in | (1 << cur.bit_index);
            }
            next.bit_index = cur.bit_index.saturating_sub(1);

            (clock.edges() >= DATA_DONE).then_some(Event::ByteReceived)
        }

        State::SendAck => {
            if clock.at_data_point(timing) && clock.edges() == DATA_DONE {
                next.sda = Drive::Low;
                None
            } else if cur.scl.falling_edge() && clock.edges() > DATA_DONE {
                // Acknowledge clock pulse is over
                next.sda = Drive::Released;
                Some(Event::AckSent)
            } else {
                None
            }
        }

        State::Error => {
            next.error = true;
            Some(Event::ErrorLatched)
        }

        State::Stop => {
            if !cur.stop_low {
                if clock.at_data_point(timing) {
                    next.sda = Drive::Low;
                    next.stop_low = true;
                }
                None
            } else if clock.at_start_stop(timing) {
                next.sda = Drive::Released;
                next.stop_low = false;
                Some(Event::StopIssued { failed: cur.error })
            } else {
                None
            }
        }

        State::Done => {
            next.valid = true;
            next.data_out = cur.shift_in;
            Some(Event::ResultPresented)
        }
    }
}

/// Shift one byte out MSB first, one bit per data point
///
/// Once `done_edge` periods have elapsed the data line is released for the
/// peripheral's acknowledgment.
fn shift_out(
    timing: &BusTiming,
    cur: &Registers,
    next: &mut Registers,
    byte: u8,
    done_edge: u8,
    done: Event,
) -> Option<Event> {
    if !cur.clock.at_data_point(timing) {
        return None;
    }

    if cur.clock.edges() >= done_edge {
        next.sda = Drive::Released;
        next.ack_ticks = 0;
        return Some(done);
    }

    next.sda = Drive::from_bit(byte & (1 << cur.bit_index) != 0);
    next.bit_index = cur.bit_index.saturating_sub(1);
    None
}
