//! Configuration types
//!
//! Instantiation-time parameters of the master. Bus timing is derived from
//! two frequencies once and validated eagerly; nothing is checked per tick.

pub mod timing;
pub mod types;

pub use timing::*;
pub use types::*;
