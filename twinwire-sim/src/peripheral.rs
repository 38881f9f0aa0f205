//! Simulated accelerometer/gyroscope peripheral
//!
//! A bus slave that only sees the resolved bus lines, exactly like a real
//! device. It samples the data line on clock rising edges and changes its
//! own drive after clock falling edges.

use twinwire_core::line::{Drive, Level};
use twinwire_core::sequencer::registers::reg;

use crate::bus::BusLines;

/// Size of the register file
pub const REGISTER_COUNT: usize = 128;

/// Which bytes the peripheral acknowledges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AckMode {
    #[default]
    Always,
    /// Never acknowledge, as if nothing were attached
    Never,
    /// Acknowledge the address byte but refuse data
    AddressOnly,
}

/// Position within the current transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Address { bits: u8, value: u8 },
    /// `slot` is set once the acknowledge bit is on the line
    AckAddress { read: bool, ack: bool, slot: bool },
    Receive { bits: u8, value: u8 },
    AckData { ack: bool, slot: bool },
    Transmit { bits: u8, value: u8 },
    MasterAck,
    /// Not addressed, or finished; wait for the next start or stop
    Ignore,
}

/// Simulated peripheral on the bus
#[derive(Debug, Clone)]
pub struct SimPeripheral {
    address: u8,
    ack_mode: AckMode,
    registers: [u8; REGISTER_COUNT],
    pointer: u8,
    phase: Phase,
    sda: Drive,
    prev: BusLines,
    /// Master acknowledged the last transmitted byte
    master_acked: Option<bool>,
    transactions: u32,
}

impl SimPeripheral {
    /// Peripheral at 7-bit `address` with an all-zero register file
    pub fn new(address: u8) -> Self {
        Self {
            address,
            ack_mode: AckMode::Always,
            registers: [0; REGISTER_COUNT],
            pointer: 0,
            phase: Phase::Idle,
            sda: Drive::Released,
            prev: BusLines::IDLE,
            master_acked: None,
            transactions: 0,
        }
    }

    /// Peripheral preloaded like an accelerometer/gyroscope after power-up
    ///
    /// Identification register holds `identity`; the sensor output
    /// registers hold a recognizable ramp.
    pub fn accelerometer(address: u8, identity: u8) -> Self {
        let mut dev = Self::new(address);
        dev.set_register(reg::WHO_AM_I, identity);
        dev.set_register(reg::PWR_MGMT_1, 0x40);
        for (i, r) in (reg::ACCEL_XOUT_H..=reg::GYRO_XOUT_H + 5).enumerate() {
            dev.set_register(r, 0x10 + i as u8);
        }
        dev
    }

    pub fn with_ack_mode(mut self, mode: AckMode) -> Self {
        self.ack_mode = mode;
        self
    }

    pub fn set_ack_mode(&mut self, mode: AckMode) {
        self.ack_mode = mode;
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn set_register(&mut self, register: u8, value: u8) {
        self.registers[usize::from(register) % REGISTER_COUNT] = value;
    }

    pub fn register(&self, register: u8) -> u8 {
        self.registers[usize::from(register) % REGISTER_COUNT]
    }

    /// Register the next read is served from
    pub fn pointer(&self) -> u8 {
        self.pointer
    }

    /// Drive this peripheral puts on the data line
    pub fn sda(&self) -> Drive {
        self.sda
    }

    /// Whether the master acknowledged the last byte it read
    pub fn master_acked(&self) -> Option<bool> {
        self.master_acked
    }

    /// Transactions addressed to this peripheral
    pub fn transactions(&self) -> u32 {
        self.transactions
    }

    /// Check if the peripheral expects the bus to be idle
    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle
    }

    /// Advance one tick with the resolved bus lines
    pub fn tick(&mut self, lines: BusLines) {
        let prev = self.prev;
        self.prev = lines;

        if lines.is_start(&prev) {
            self.phase = Phase::Address { bits: 0, value: 0 };
            self.sda = Drive::Released;
            return;
        }
        if lines.is_stop(&prev) {
            self.phase = Phase::Idle;
            self.sda = Drive::Released;
            return;
        }

        if lines.scl_rose(&prev) {
            self.sample(lines.sda);
        } else if lines.scl_fell(&prev) {
            self.shift();
        }
    }

    /// Clock rising edge: the data line is valid
    fn sample(&mut self, sda: Level) {
        self.phase = match self.phase {
            Phase::Address { bits, value } => {
                let value = (value << 1) | sda.bit();
                if bits + 1 < 8 {
                    Phase::Address { bits: bits + 1, value }
                } else if value >> 1 == self.address {
                    self.transactions += 1;
                    Phase::AckAddress {
                        read: value & 0x01 != 0,
                        ack: self.ack_mode != AckMode::Never,
                        slot: false,
                    }
                } else {
                    Phase::Ignore
                }
            }
            Phase::Receive { bits, value } => {
                let value = (value << 1) | sda.bit();
                if bits + 1 < 8 {
                    Phase::Receive { bits: bits + 1, value }
                } else {
                    let ack = self.ack_mode == AckMode::Always;
                    if ack {
                        self.pointer = value % REGISTER_COUNT as u8;
                    }
                    Phase::AckData { ack, slot: false }
                }
            }
            Phase::Transmit { bits, value } => Phase::Transmit {
                bits: bits + 1,
                value,
            },
            Phase::MasterAck => {
                self.master_acked = Some(sda.is_low());
                Phase::Ignore
            }
            other => other,
        };
    }

    /// Clock falling edge: the data line may change
    fn shift(&mut self) {
        self.phase = match self.phase {
            Phase::AckAddress { read, ack, slot: false } => {
                self.sda = if ack { Drive::Low } else { Drive::Released };
                Phase::AckAddress { read, ack, slot: true }
            }
            Phase::AckAddress { ack: false, slot: true, .. } => {
                self.sda = Drive::Released;
                Phase::Ignore
            }
            Phase::AckAddress { read: true, slot: true, .. } => {
                let value = self.register(self.pointer);
                self.pointer = (self.pointer + 1) % REGISTER_COUNT as u8;
                self.sda = Drive::from_bit(value & 0x80 != 0);
                Phase::Transmit { bits: 0, value }
            }
            Phase::AckAddress { read: false, slot: true, .. } => {
                self.sda = Drive::Released;
                Phase::Receive { bits: 0, value: 0 }
            }
            Phase::AckData { ack, slot: false } => {
                self.sda = if ack { Drive::Low } else { Drive::Released };
                Phase::AckData { ack, slot: true }
            }
            Phase::AckData { slot: true, .. } => {
                // One pointer byte per transaction; anything more is refused
                self.sda = Drive::Released;
                Phase::Ignore
            }
            Phase::Transmit { bits, value } if bits < 8 => {
                self.sda = Drive::from_bit(value & (0x80 >> bits) != 0);
                Phase::Transmit { bits, value }
            }
            Phase::Transmit { .. } => {
                self.sda = Drive::Released;
                Phase::MasterAck
            }
            other => other,
        };
    }
}
