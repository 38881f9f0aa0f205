//! Master, peripheral and monitor on one simulated bus

use embedded_hal::i2c::{ErrorType, I2c, Operation, SevenBitAddress};
use twinwire_core::line::Level;
use twinwire_core::master::{Master, MasterInputs, MasterOutputs, Request};
use twinwire_core::sequencer::Sequencer;
use twinwire_core::sync::ResetSynchronizer;
use twinwire_core::MasterConfig;

use crate::bus::BusLines;
use crate::error::BusError;
use crate::monitor::BusMonitor;
use crate::peripheral::SimPeripheral;

/// Bus periods one transaction may take before it is abandoned
///
/// A complete transaction takes just over 19 periods.
pub const BUDGET_PERIODS: u64 = 32;

/// Simulated bus with one master and one peripheral
#[derive(Debug, Clone)]
pub struct Testbench {
    master: Master,
    reset: ResetSynchronizer,
    /// Raw reset input, before synchronization
    reset_input: Level,
    peripheral: SimPeripheral,
    monitor: BusMonitor,
    lines: BusLines,
    outputs: MasterOutputs,
    ticks: u64,
    budget: u64,
}

impl Testbench {
    /// Power up with reset held for the synchronizer's two ticks
    pub fn new(config: MasterConfig, peripheral: SimPeripheral) -> Self {
        Self {
            master: Master::new(config),
            reset: ResetSynchronizer::new(config.reset_polarity),
            reset_input: config.reset_polarity.released(),
            peripheral,
            monitor: BusMonitor::new(),
            lines: BusLines::IDLE,
            outputs: MasterOutputs::default(),
            ticks: 0,
            budget: u64::from(config.timing.period()) * BUDGET_PERIODS,
        }
    }

    /// Ticks allowed per transaction before [`BusError::Timeout`]
    pub fn with_budget(mut self, ticks: u64) -> Self {
        self.budget = ticks;
        self
    }

    pub fn master(&self) -> &Master {
        &self.master
    }

    pub fn peripheral(&self) -> &SimPeripheral {
        &self.peripheral
    }

    pub fn peripheral_mut(&mut self) -> &mut SimPeripheral {
        &mut self.peripheral
    }

    pub fn monitor(&self) -> &BusMonitor {
        &self.monitor
    }

    pub fn monitor_mut(&mut self) -> &mut BusMonitor {
        &mut self.monitor
    }

    /// Lines as resolved on the last tick
    pub fn lines(&self) -> BusLines {
        self.lines
    }

    /// Master outputs after the last tick
    pub fn outputs(&self) -> MasterOutputs {
        self.outputs
    }

    /// Ticks since power-up
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Drive the raw reset input
    pub fn set_reset(&mut self, asserted: bool) {
        let polarity = self.master.config().reset_polarity;
        self.reset_input = if asserted {
            polarity.asserted()
        } else {
            polarity.released()
        };
    }

    /// Advance the whole bench by one timebase tick
    ///
    /// Both sides see the same resolved lines, computed from the drives
    /// they registered on the previous tick.
    pub fn tick(&mut self, request: Option<Request>) -> MasterOutputs {
        self.lines = BusLines::resolve(
            &[self.outputs.scl],
            &[self.outputs.sda, self.peripheral.sda()],
        );
        self.monitor.observe(self.lines);

        let reset = self.reset.tick(self.reset_input);
        self.outputs = self.master.tick(MasterInputs {
            reset,
            sda: self.lines.sda,
            request,
        });
        self.peripheral.tick(self.lines);

        self.ticks += 1;
        self.outputs
    }

    /// Tick until the master can accept a request
    fn settle(&mut self) -> Result<(), BusError> {
        for _ in 0..self.budget {
            if !self.reset.is_asserted() && !self.outputs.busy {
                return Ok(());
            }
            self.tick(None);
        }
        Err(BusError::Timeout)
    }

    /// Run one transaction to completion
    ///
    /// Returns the received byte (zero for writes).
    pub fn run(&mut self, request: Request) -> Result<u8, BusError> {
        self.settle()?;
        self.tick(Some(request));

        for _ in 0..self.budget {
            let out = self.tick(None);
            if out.busy {
                continue;
            }
            if out.error {
                return Err(BusError::NoAcknowledge);
            }
            if out.valid {
                return Ok(out.data);
            }
        }
        Err(BusError::Timeout)
    }

    /// Step `sequencer` against the bus until it finishes
    ///
    /// Gives up after the tick budget has been spent once per transaction
    /// the sequence can issue, retries included.
    pub fn run_sequencer(&mut self, sequencer: &mut Sequencer) -> Result<u64, BusError> {
        let config = sequencer.config();
        let transactions: u64 = config
            .steps()
            .iter()
            .map(|s| u64::from(s.transactions()))
            .sum();
        let limit = self.budget * transactions.max(1) * (u64::from(config.retries()) + 1);

        self.settle()?;
        let start = self.ticks;

        while !sequencer.is_finished() {
            if self.ticks - start >= limit {
                return Err(BusError::Timeout);
            }
            let request = sequencer.tick(&self.outputs);
            self.tick(request);
        }
        Ok(self.ticks - start)
    }
}

impl ErrorType for Testbench {
    type Error = BusError;
}

/// Every byte is its own transaction: a write sends at most one data
/// byte, an empty write only addresses the device, and each read byte is
/// fetched with its own read.
impl I2c<SevenBitAddress> for Testbench {
    fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        // Refuse before anything reaches the bus
        if operations
            .iter()
            .any(|op| matches!(op, Operation::Write(bytes) if bytes.len() > 1))
        {
            return Err(BusError::Unsupported);
        }

        for op in operations {
            match op {
                Operation::Write([]) => {
                    self.run(Request::probe(address)?)?;
                }
                Operation::Write(bytes) => {
                    for byte in bytes.iter() {
                        self.run(Request::write(address, *byte)?)?;
                    }
                }
                Operation::Read(buffer) => {
                    let count = u8::try_from(buffer.len()).unwrap_or(u8::MAX);
                    for slot in buffer.iter_mut() {
                        let request = Request::read(address)?.with_byte_count(count)?;
                        *slot = self.run(request)?;
                    }
                }
            }
        }
        Ok(())
    }
}
