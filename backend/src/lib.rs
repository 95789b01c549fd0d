//! RAN Emulator Core - Rust Engine
//!
//! Discrete-time radio-access-network emulator. Every TTI (1 ms) it shares
//! the time/frequency resources of a carrier among competing users and
//! carries their data through a retransmission-aware link layer.
//!
//! # Architecture
//!
//! - **core**: TTI clock
//! - **models**: Domain types (Direction, DataUnit, TransportBlock)
//! - **policy**: Scheduling metrics and the round-robin cursor
//! - **scheduler**: Resource grid, resource units, TDD cycle, numerology tables
//! - **link**: Packet buffer, HARQ engine, release buffer, capture bridge
//! - **channel**: Channel-oracle seam
//! - **traffic**: Synthetic traffic generation
//! - **threading**: Barrier-synchronized worker pool
//! - **orchestrator**: Configuration and the TTI loop
//! - **rng**: Deterministic random number generation
//!
//! # Critical Invariants
//!
//! 1. All randomness is deterministic (seeded RNG, one stream per link)
//! 2. Buffered bits never exceed a packet buffer's capacity
//! 3. With ordering enabled, data is released in identifier order

// Module declarations
pub mod channel;
pub mod core;
pub mod link;
pub mod models;
pub mod orchestrator;
pub mod policy;
pub mod rng;
pub mod scheduler;
pub mod threading;
pub mod traffic;

// Re-exports for convenience
pub use crate::core::{TimeManager, TTI_SECONDS};
pub use channel::{ChannelOracle, ChannelState, StaticChannel, UserChannel};
pub use link::{LinkConfig, LinkPipeline, LinkStats, StatsWindow, Verdict};
pub use models::{DataUnit, Direction, TransportBlock};
pub use orchestrator::{
    ConfigError, Emulator, EmulatorConfig, EmulatorError, TickResult, UserConfig,
};
pub use policy::{MetricPolicy, MetricWeights};
pub use rng::RngManager;
pub use scheduler::{GridConfig, GridError, ResourceGrid};
pub use traffic::{TrafficConfig, TrafficModel};
