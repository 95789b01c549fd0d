//! Orchestrator - the TTI loop driving grids and links
//!
//! See `engine.rs` for the loop and `config.rs` for the JSON configuration.

pub mod config;
pub mod engine;

pub use config::{ConfigError, EmulatorConfig, UserConfig};
pub use engine::{
    DirectionTick, Emulator, EmulatorCore, EmulatorError, EmulatorJob, GridLayout, TickResult,
};
