//! Core emulation primitives (time keeping)

pub mod time;

pub use time::{TimeManager, TTI_SECONDS};
