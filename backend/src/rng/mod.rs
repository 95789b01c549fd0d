//! Deterministic random number generation
//!
//! Uses xorshift64* for fast, reproducible draws.
//! All randomness in the emulator (HARQ outcomes, delay jitter, traffic)
//! goes through this module. Independent streams are derived from one
//! master seed so that per-user work can run on any thread and still
//! produce the same sequence.

mod xorshift;

pub use xorshift::{derive_seed, RngManager};
