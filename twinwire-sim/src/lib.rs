//! Host-side simulation of a twinwire bus
//!
//! Wires a [`twinwire_core::Master`] to a simulated peripheral through an
//! open-drain bus model:
//!
//! - Bus line resolution (wired-AND of every driver)
//! - Simulated accelerometer/gyroscope peripheral
//! - Wire monitor that decodes start, stop, bytes and acknowledgments
//! - Testbench with an `embedded_hal::i2c::I2c` front end

#![deny(unsafe_code)]

pub mod bus;
pub mod error;
pub mod monitor;
pub mod peripheral;
pub mod testbench;

pub use bus::BusLines;
pub use error::BusError;
pub use monitor::{BusMonitor, Frame, WireEvent};
pub use peripheral::{AckMode, SimPeripheral};
pub use testbench::Testbench;
