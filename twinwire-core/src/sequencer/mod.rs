//! Peripheral bring-up sequencer
//!
//! Walks a fixed list of [`Step`]s against one device, issuing a single
//! master transaction at a time. A new request is only offered while the
//! master reports idle, and the outcome of each transaction is taken from
//! the master's result pulse or error flag.

pub mod registers;
pub mod steps;

pub use steps::{Step, DEFAULT_STEPS};

use heapless::Vec;

use crate::master::{MasterOutputs, Request, RequestError};

/// Maximum steps in one sequence
pub const MAX_STEPS: usize = 8;

/// Maximum bytes read over a whole sequence
pub const MAX_READINGS: usize = 64;

/// Sequence configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SequencerConfigError {
    /// More than [`MAX_STEPS`] steps
    TooManySteps(usize),
    /// Steps read more than [`MAX_READINGS`] bytes in total
    TooManyReadings(usize),
    /// A step would build an invalid request
    Request(RequestError),
}

impl From<RequestError> for SequencerConfigError {
    fn from(e: RequestError) -> Self {
        SequencerConfigError::Request(e)
    }
}

/// Why a step failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SequenceError {
    /// The master flagged an acknowledgment failure
    NoAcknowledge,
    /// Identification register did not hold the expected value
    IdentityMismatch { found: u8 },
    /// A step built an invalid request
    Request(RequestError),
}

/// Progress of a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StepStatus {
    #[default]
    Pending,
    Active,
    Passed,
    Failed,
}

/// Progress of the whole sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SequenceStatus {
    Running,
    Complete,
    Failed { step: u8, error: SequenceError },
}

/// Device address, steps and retry budget
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencerConfig {
    address: u8,
    steps: Vec<Step, MAX_STEPS>,
    retries: u8,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            address: registers::DEFAULT_ADDRESS,
            steps: Vec::from_slice(&DEFAULT_STEPS).unwrap_or_default(),
            retries: 0,
        }
    }
}

impl SequencerConfig {
    /// Validate `steps` against the device at `address`
    pub fn new(address: u8, steps: &[Step]) -> Result<Self, SequencerConfigError> {
        let steps: Vec<Step, MAX_STEPS> =
            Vec::from_slice(steps).map_err(|_| SequencerConfigError::TooManySteps(steps.len()))?;

        let mut reads = 0usize;
        for step in &steps {
            step.validate()?;
            // Both request shapes of every step must be buildable
            step.transaction(address, 0)?;
            if step.transactions() > 1 {
                step.transaction(address, 1)?;
            }
            reads += usize::from(step.reads());
        }
        if reads > MAX_READINGS {
            return Err(SequencerConfigError::TooManyReadings(reads));
        }

        Ok(Self {
            address,
            steps,
            retries: 0,
        })
    }

    /// Retry a failed step up to `retries` times before giving up
    pub fn with_retries(mut self, retries: u8) -> Self {
        self.retries = retries;
        self
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn retries(&self) -> u8 {
        self.retries
    }
}

/// Where the sequencer is within the current transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Waiting for the master to go idle, then issue
    Issue,
    /// Request issued; `failed` once the master has raised its error flag
    Await { failed: bool },
    Finished,
}

/// Accelerometer/gyroscope bring-up sequencer
#[derive(Debug, Clone)]
pub struct Sequencer {
    config: SequencerConfig,
    phase: Phase,
    step: u8,
    /// Transaction index within the current step
    cursor: u8,
    attempts: u8,
    statuses: Vec<StepStatus, MAX_STEPS>,
    readings: Vec<u8, MAX_READINGS>,
    /// Readings length when the current step started
    step_mark: usize,
    status: SequenceStatus,
}

impl Sequencer {
    pub fn new(config: SequencerConfig) -> Self {
        let mut statuses = Vec::new();
        for _ in config.steps() {
            // Capacity matches the step list
            let _ = statuses.push(StepStatus::Pending);
        }
        let status = if config.steps().is_empty() {
            SequenceStatus::Complete
        } else {
            SequenceStatus::Running
        };
        let phase = match status {
            SequenceStatus::Running => Phase::Issue,
            _ => Phase::Finished,
        };

        Self {
            config,
            phase,
            step: 0,
            cursor: 0,
            attempts: 0,
            statuses,
            readings: Vec::new(),
            step_mark: 0,
            status,
        }
    }

    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    pub fn status(&self) -> SequenceStatus {
        self.status
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// Per-step progress, in step order
    pub fn statuses(&self) -> &[StepStatus] {
        &self.statuses
    }

    pub fn step_status(&self, index: usize) -> Option<StepStatus> {
        self.statuses.get(index).copied()
    }

    /// Bytes read so far, in the order they arrived
    pub fn readings(&self) -> &[u8] {
        &self.readings
    }

    /// One bit per passed step (bit 0 is the first step)
    pub fn indicators(&self) -> u8 {
        self.statuses
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == StepStatus::Passed)
            .fold(0, |acc, (i, _)| acc | (1 << i))
    }

    /// Check if the sequence stopped on a failed step
    pub fn fault(&self) -> bool {
        matches!(self.status, SequenceStatus::Failed { .. })
    }

    /// Step currently being worked on
    pub fn current_step(&self) -> Option<&Step> {
        match self.phase {
            Phase::Finished => None,
            _ => self.config.steps.get(usize::from(self.step)),
        }
    }

    /// Advance one tick with the master's registered outputs
    ///
    /// Returns the request to present to the master on this tick, if any.
    pub fn tick(&mut self, master: &MasterOutputs) -> Option<Request> {
        match self.phase {
            Phase::Finished => None,
            Phase::Issue => {
                if master.busy {
                    return None;
                }
                self.issue()
            }
            Phase::Await { failed } => {
                let failed = failed || master.error;
                if master.valid && !failed {
                    self.transaction_done(master.data);
                } else if failed && !master.busy {
                    self.step_failed(SequenceError::NoAcknowledge);
                } else {
                    self.phase = Phase::Await { failed };
                }
                None
            }
        }
    }

    fn issue(&mut self) -> Option<Request> {
        let step = *self.config.steps.get(usize::from(self.step))?;
        match step.transaction(self.config.address, self.cursor) {
            Ok(request) => {
                self.set_step_status(StepStatus::Active);
                self.phase = Phase::Await { failed: false };

                #[cfg(feature = "defmt")]
                defmt::trace!("seq: step {} transaction {}", self.step, self.cursor);

                Some(request)
            }
            Err(e) => {
                self.finish_failed(SequenceError::Request(e));
                None
            }
        }
    }

    fn transaction_done(&mut self, data: u8) {
        let Some(step) = self.config.steps.get(usize::from(self.step)).copied() else {
            return;
        };

        if step.is_read(self.cursor) {
            // Capacity checked against the step list at configuration
            let _ = self.readings.push(data);
        }
        if let Step::Identify { expected, .. } = step {
            if step.is_read(self.cursor) && data != expected {
                self.step_failed(SequenceError::IdentityMismatch { found: data });
                return;
            }
        }

        self.cursor += 1;
        self.phase = Phase::Issue;
        if self.cursor < step.transactions() {
            return;
        }

        self.set_step_status(StepStatus::Passed);

        #[cfg(feature = "defmt")]
        defmt::debug!("seq: step {} passed", self.step);

        self.step += 1;
        self.cursor = 0;
        self.attempts = 0;
        self.step_mark = self.readings.len();

        if usize::from(self.step) >= self.config.steps.len() {
            self.status = SequenceStatus::Complete;
            self.phase = Phase::Finished;

            #[cfg(feature = "defmt")]
            defmt::info!("seq: complete, {} bytes read", self.readings.len());
        }
    }

    fn step_failed(&mut self, error: SequenceError) {
        if self.attempts < self.config.retries {
            self.attempts += 1;
            self.cursor = 0;
            self.readings.truncate(self.step_mark);
            self.phase = Phase::Issue;

            #[cfg(feature = "defmt")]
            defmt::warn!(
                "seq: step {} failed ({}), retry {}/{}",
                self.step,
                error,
                self.attempts,
                self.config.retries
            );
            return;
        }
        self.finish_failed(error);
    }

    fn finish_failed(&mut self, error: SequenceError) {
        self.set_step_status(StepStatus::Failed);
        self.status = SequenceStatus::Failed {
            step: self.step,
            error,
        };
        self.phase = Phase::Finished;

        #[cfg(feature = "defmt")]
        defmt::error!("seq: step {} failed: {}", self.step, error);
    }

    fn set_step_status(&mut self, status: StepStatus) {
        if let Some(slot) = self.statuses.get_mut(usize::from(self.step)) {
            *slot = status;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::registers::{reg, DEFAULT_ADDRESS, IDENTITY};
    use super::*;

    /// Stand-in for the master: busy for a few ticks per request, then
    /// either a result pulse or an error flag
    struct FakeMaster {
        outputs: MasterOutputs,
        active: Option<Request>,
        remaining: u32,
        issued: std::vec::Vec<Request>,
        overlapping: u32,
        respond: Box<dyn FnMut(&Request, usize) -> Option<u8>>,
    }

    const BUSY_TICKS: u32 = 5;

    impl FakeMaster {
        fn new(respond: impl FnMut(&Request, usize) -> Option<u8> + 'static) -> Self {
            Self {
                outputs: MasterOutputs::default(),
                active: None,
                remaining: 0,
                issued: std::vec::Vec::new(),
                overlapping: 0,
                respond: Box::new(respond),
            }
        }

        fn tick(&mut self, request: Option<Request>) {
            let mut out = MasterOutputs::default();

            if let Some(active) = self.active {
                if request.is_some() {
                    self.overlapping += 1;
                }
                self.remaining -= 1;
                if self.remaining == 0 {
                    self.active = None;
                    let index = self.issued.len() - 1;
                    match (self.respond)(&active, index) {
                        Some(data) => {
                            out.valid = true;
                            out.data = data;
                        }
                        None => out.error = true,
                    }
                } else {
                    out.busy = true;
                    // Error is raised while the stop condition is still going out
                    out.error = self.remaining <= 2 && (self.respond)(&active, usize::MAX).is_none();
                }
            } else if let Some(request) = request {
                self.active = Some(request);
                self.remaining = BUSY_TICKS;
                self.issued.push(request);
                out.busy = true;
            }

            self.outputs = out;
        }
    }

    fn run(seq: &mut Sequencer, master: &mut FakeMaster) {
        for _ in 0..10_000 {
            if seq.is_finished() {
                return;
            }
            let request = seq.tick(&master.outputs);
            master.tick(request);
        }
        panic!("sequence did not finish");
    }

    fn healthy(request: &Request, _: usize) -> Option<u8> {
        if request.is_read() {
            Some(IDENTITY)
        } else {
            Some(0)
        }
    }

    #[test]
    fn test_default_sequence_completes() {
        let mut seq = Sequencer::new(SequencerConfig::default());
        let mut master = FakeMaster::new(healthy);
        run(&mut seq, &mut master);

        assert_eq!(seq.status(), SequenceStatus::Complete);
        assert!(!seq.fault());
        assert_eq!(seq.indicators(), 0b1_1111);
        assert!(seq.statuses().iter().all(|s| *s == StepStatus::Passed));
        // Identity plus two six-byte bursts
        assert_eq!(seq.readings().len(), 13);
        assert_eq!(seq.readings()[0], IDENTITY);
        assert_eq!(master.overlapping, 0);
    }

    #[test]
    fn test_request_order() {
        let mut seq = Sequencer::new(SequencerConfig::default());
        let mut master = FakeMaster::new(healthy);
        run(&mut seq, &mut master);

        let issued = &master.issued;
        assert_eq!(issued.len(), 1 + 1 + 2 + 12 + 12);
        assert!(issued.iter().all(|r| r.address() == DEFAULT_ADDRESS));

        assert_eq!(issued[0], Request::write(DEFAULT_ADDRESS, reg::PWR_MGMT_1).unwrap());
        assert_eq!(issued[1], Request::write(DEFAULT_ADDRESS, reg::SMPLRT_DIV).unwrap());
        assert_eq!(issued[2], Request::write(DEFAULT_ADDRESS, reg::WHO_AM_I).unwrap());
        assert!(issued[3].is_read());
        assert_eq!(issued[3].byte_count(), 1);

        // Accelerometer burst alternates pointer writes and reads
        for offset in 0..6u8 {
            let select = issued[4 + usize::from(offset) * 2];
            let read = issued[5 + usize::from(offset) * 2];
            assert_eq!(select.data(), reg::ACCEL_XOUT_H + offset);
            assert!(read.is_read());
            assert_eq!(read.byte_count(), 6);
        }
        assert_eq!(issued[16].data(), reg::GYRO_XOUT_H);
    }

    #[test]
    fn test_identity_mismatch() {
        let mut seq = Sequencer::new(SequencerConfig::default());
        let mut master = FakeMaster::new(|r: &Request, _| Some(if r.is_read() { 0x70 } else { 0 }));
        run(&mut seq, &mut master);

        assert_eq!(
            seq.status(),
            SequenceStatus::Failed {
                step: 2,
                error: SequenceError::IdentityMismatch { found: 0x70 },
            }
        );
        assert!(seq.fault());
        assert_eq!(seq.indicators(), 0b011);
        assert_eq!(seq.step_status(2), Some(StepStatus::Failed));
        assert_eq!(seq.step_status(3), Some(StepStatus::Pending));
        assert!(seq.current_step().is_none());
        // Nothing issued after the failing read
        assert_eq!(master.issued.len(), 4);
    }

    #[test]
    fn test_no_acknowledge_stops_sequence() {
        let mut seq = Sequencer::new(SequencerConfig::default());
        let mut master = FakeMaster::new(|_: &Request, _| None);
        run(&mut seq, &mut master);

        assert_eq!(
            seq.status(),
            SequenceStatus::Failed {
                step: 0,
                error: SequenceError::NoAcknowledge,
            }
        );
        assert_eq!(seq.indicators(), 0);
        assert_eq!(master.issued.len(), 1);
    }

    #[test]
    fn test_retry_restarts_step() {
        let config = SequencerConfig::default().with_retries(1);
        let mut seq = Sequencer::new(config);
        // First attempt at the accelerometer's third read fails
        let mut master = FakeMaster::new(|r: &Request, index| {
            if index == 9 {
                None
            } else {
                healthy(r, index)
            }
        });
        run(&mut seq, &mut master);

        assert_eq!(seq.status(), SequenceStatus::Complete);
        assert_eq!(seq.readings().len(), 13);
        // Burst restarted from its first register
        assert_eq!(master.issued[10].data(), reg::ACCEL_XOUT_H);
        assert_eq!(master.issued.len(), 28 + 6);
    }

    #[test]
    fn test_retries_exhausted() {
        let config = SequencerConfig::default().with_retries(2);
        let mut seq = Sequencer::new(config);
        let mut master = FakeMaster::new(|r: &Request, _| if r.is_read() { None } else { Some(0) });
        run(&mut seq, &mut master);

        assert_eq!(
            seq.status(),
            SequenceStatus::Failed {
                step: 2,
                error: SequenceError::NoAcknowledge,
            }
        );
        // Three attempts at identify, two transactions each
        assert_eq!(master.issued.len(), 2 + 3 * 2);
    }

    #[test]
    fn test_waits_for_idle_master() {
        let mut seq = Sequencer::new(SequencerConfig::default());
        let busy = MasterOutputs {
            busy: true,
            ..MasterOutputs::default()
        };
        for _ in 0..100 {
            assert!(seq.tick(&busy).is_none());
        }
        assert!(seq.tick(&MasterOutputs::default()).is_some());
        assert_eq!(seq.step_status(0), Some(StepStatus::Active));
        // Still awaiting the first result
        assert!(seq.tick(&MasterOutputs::default()).is_none());
    }

    #[test]
    fn test_config_validation() {
        let steps = [Step::Select { register: 0 }; MAX_STEPS + 1];
        assert_eq!(
            SequencerConfig::new(DEFAULT_ADDRESS, &steps),
            Err(SequencerConfigError::TooManySteps(MAX_STEPS + 1))
        );

        assert_eq!(
            SequencerConfig::new(0x80, &DEFAULT_STEPS),
            Err(SequencerConfigError::Request(RequestError::Address(0x80)))
        );

        let burst = [Step::ReadBurst { register: 0, count: 0 }];
        assert_eq!(
            SequencerConfig::new(DEFAULT_ADDRESS, &burst),
            Err(SequencerConfigError::Request(RequestError::ByteCount(0)))
        );

        let bursts = [Step::ReadBurst { register: 0, count: 20 }; 4];
        assert_eq!(
            SequencerConfig::new(DEFAULT_ADDRESS, &bursts),
            Err(SequencerConfigError::TooManyReadings(80))
        );

        let config = SequencerConfig::new(DEFAULT_ADDRESS, &DEFAULT_STEPS).unwrap();
        assert_eq!(config, SequencerConfig::default());
    }

    #[test]
    fn test_empty_sequence_is_complete() {
        let config = SequencerConfig::new(DEFAULT_ADDRESS, &[]).unwrap();
        let mut seq = Sequencer::new(config);
        assert_eq!(seq.status(), SequenceStatus::Complete);
        assert!(seq.tick(&MasterOutputs::default()).is_none());
    }
}
