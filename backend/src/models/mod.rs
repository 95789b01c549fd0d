//! Domain models for the emulator link layer

pub mod data_unit;
pub mod direction;
pub mod transport_block;

// Re-exports
pub use data_unit::{BackhaulDelay, DataUnit, READY_TOLERANCE_BITS};
pub use direction::Direction;
pub use transport_block::TransportBlock;
