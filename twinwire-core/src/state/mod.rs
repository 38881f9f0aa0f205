//! Protocol state machine
//!
//! The state machine is explicit, finite and deterministic. The master
//! decides each tick which [`Event`] (if any) its counters and the sampled
//! bus produced; [`State::transition`] maps it to the next state.

pub mod events;
pub mod machine;

pub use events::{Direction, Event};
pub use machine::{AckTarget, State};
