//! Tick-driven I2C fast-mode bus master
//!
//! This crate models the master side of an open-drain two-wire bus as
//! synchronous logic advanced one timebase tick at a time:
//!
//! - Open-drain line model (drive low or release, never drive high)
//! - Input and reset synchronizers
//! - Clock generator and bus clock driver sharing one period counter
//! - Protocol state machine (start, address, data, acknowledge, stop)
//! - Peripheral sequencer for accelerometer/gyroscope bring-up
//! - Configuration types validated at construction
//!
//! Nothing here blocks. Waiting is expressed as counters that hold a
//! transition until its condition is met, so the whole master can be
//! stepped from a simulation loop or a hardware timer interrupt alike.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod clock;
pub mod config;
pub mod line;
pub mod master;
pub mod sequencer;
pub mod state;
pub mod sync;

pub use config::{BusTiming, ConfigError, MasterConfig, ResetPolarity};
pub use line::{Drive, Level};
pub use master::{Master, MasterInputs, MasterOutputs, Request, RequestError};
pub use sequencer::{SequenceError, SequenceStatus, Sequencer, SequencerConfig, Step, StepStatus};
pub use state::{Event, State};
