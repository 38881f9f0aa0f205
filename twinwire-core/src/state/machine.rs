//! State machine definition
//!
//! What the master drives onto the bus is a function of the current state,
//! the shared clock counters and the synchronized data line.

use super::events::{Direction, Event};

/// Where to go after a successful acknowledgment from the peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AckTarget {
    /// Address acknowledged, shift out the data byte
    WriteData,
    /// Address acknowledged, shift in a byte from the peripheral
    Read,
    /// Data byte acknowledged, finish the transaction
    Stop,
}

/// Protocol states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// Bus released, waiting for a request
    #[default]
    Idle,
    /// Waiting for the start point of the first released clock phase
    Start,
    /// Shifting out the address-plus-R/W byte
    WriteAddress,
    /// Shifting out the data byte
    WriteData,
    /// Shifting in a byte from the peripheral
    Read,
    /// Driving the master acknowledgment after a read
    SendAck,
    /// Waiting for the peripheral to acknowledge
    WaitAck(AckTarget),
    /// Acknowledgment missing; flag is latched
    Error,
    /// Producing the stop condition
    Stop,
    /// Presenting the result for one tick
    Done,
}

impl State {
    /// Check if the master owns the bus in this state
    pub fn is_busy(&self) -> bool {
        !matches!(self, State::Idle)
    }

    /// Check if the bus clock runs in this state
    pub fn clock_enabled(&self) -> bool {
        !matches!(self, State::Idle | State::Done)
    }

    /// Process an event and return the next state
    ///
    /// This is the core state transition logic.
    pub fn transition(self, event: Event) -> Self {
        use Event::*;
        use State::*;

        match (self, event) {
            // Idle transitions
            (Idle, RequestAccepted) => Start,

            // Start transitions: the address byte always goes out first,
            // it carries the R/W flag
            (Start, StartIssued) => WriteAddress,

            // Address phase
            (WriteAddress, AddressShifted(Direction::Write)) => WaitAck(AckTarget::WriteData),
            (WriteAddress, AddressShifted(Direction::Read)) => WaitAck(AckTarget::Read),
            (WriteAddress, AddressOnlyShifted) => WaitAck(AckTarget::Stop),

            // Data phases
            (WriteData, DataShifted) => WaitAck(AckTarget::Stop),
            (Read, ByteReceived) => SendAck,
            (SendAck, AckSent) => Stop,

            // Acknowledgment from the peripheral
            (WaitAck(AckTarget::WriteData), AckReceived) => WriteData,
            (WaitAck(AckTarget::Read), AckReceived) => Read,
            (WaitAck(AckTarget::Stop), AckReceived) => Stop,
            (WaitAck(_), NackReceived) => Error,
            (WaitAck(_), AckTimeout) => Error,

            // A failed transaction is still terminated on the bus
            (Error, ErrorLatched) => Stop,

            // Stop transitions
            (Stop, StopIssued { failed: true }) => Idle,
            (Stop, StopIssued { failed: false }) => Done,

            // Done transitions
            (Done, ResultPresented) => Idle,

            // Default: stay in current state
            _ => self,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(mut state: State, events: &[Event]) -> State {
        for &event in events {
            state = state.transition(event);
        }
        state
    }

    #[test]
    fn test_write_flow() {
        let events = [
            Event::RequestAccepted,
            Event::StartIssued,
            Event::AddressShifted(Direction::Write),
            Event::AckReceived,
            Event::DataShifted,
            Event::AckReceived,
        ];
        assert_eq!(run(State::Idle, &events), State::Stop);

        let done = State::Stop.transition(Event::StopIssued { failed: false });
        assert_eq!(done, State::Done);
        assert_eq!(done.transition(Event::ResultPresented), State::Idle);
    }

    #[test]
    fn test_read_flow() {
        let events = [
            Event::RequestAccepted,
            Event::StartIssued,
            Event::AddressShifted(Direction::Read),
        ];
        let waiting = run(State::Idle, &events);
        assert_eq!(waiting, State::WaitAck(AckTarget::Read));

        let read = waiting.transition(Event::AckReceived);
        assert_eq!(read, State::Read);

        let ack = read.transition(Event::ByteReceived);
        assert_eq!(ack, State::SendAck);
        assert_eq!(ack.transition(Event::AckSent), State::Stop);
    }

    #[test]
    fn test_address_only_flow() {
        let events = [
            Event::RequestAccepted,
            Event::StartIssued,
            Event::AddressOnlyShifted,
        ];
        let waiting = run(State::Idle, &events);
        assert_eq!(waiting, State::WaitAck(AckTarget::Stop));
        assert_eq!(waiting.transition(Event::AckReceived), State::Stop);
    }

    #[test]
    fn test_nack_goes_through_stop_to_idle() {
        for target in [AckTarget::WriteData, AckTarget::Read, AckTarget::Stop] {
            let error = State::WaitAck(target).transition(Event::NackReceived);
            assert_eq!(error, State::Error);

            let stop = error.transition(Event::ErrorLatched);
            assert_eq!(stop, State::Stop);

            // Error path skips Done
            assert_eq!(stop.transition(Event::StopIssued { failed: true }), State::Idle);
        }
    }

    #[test]
    fn test_timeout_is_an_error() {
        let state = State::WaitAck(AckTarget::Stop);
        assert_eq!(state.transition(Event::AckTimeout), State::Error);
    }

    #[test]
    fn test_requests_ignored_while_busy() {
        let states = [
            State::Start,
            State::WriteAddress,
            State::WriteData,
            State::Read,
            State::SendAck,
            State::WaitAck(AckTarget::Stop),
            State::Error,
            State::Stop,
            State::Done,
        ];

        for state in states {
            assert_eq!(state.transition(Event::RequestAccepted), state);
        }
    }

    #[test]
    fn test_unexpected_events_hold() {
        assert_eq!(State::Idle.transition(Event::AckReceived), State::Idle);
        assert_eq!(State::WriteData.transition(Event::ByteReceived), State::WriteData);
        assert_eq!(State::Read.transition(Event::DataShifted), State::Read);
    }

    #[test]
    fn test_state_predicates() {
        assert!(!State::Idle.is_busy());
        assert!(State::Done.is_busy());
        assert!(State::Stop.clock_enabled());
        assert!(!State::Idle.clock_enabled());
    }
}
