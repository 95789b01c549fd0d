//! Emulator configuration
//!
//! Everything the driver needs to build grids, links and users, loadable
//! from JSON. Every struct carries serde defaults, so a partial document
//! such as `{"users": [{}, {}]}` is a complete configuration.

use crate::channel::UserChannel;
use crate::link::{LinkConfig, ModulationTable, ReleaseMode};
use crate::policy::MetricWeights;
use crate::scheduler::GridConfig;
use crate::traffic::TrafficConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

// ============================================================================
// Configuration Types
// ============================================================================

/// Complete emulator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmulatorConfig {
    /// Master seed; every random stream derives from it
    pub seed: u64,

    /// Worker threads (0 runs every job on the calling thread)
    pub worker_threads: usize,

    /// Grid layout shared by both directions
    pub grid: GridConfig,

    pub downlink: LinkConfig,
    pub uplink: LinkConfig,

    /// Modulation table selecting the BLER slice
    pub modulation: ModulationTable,

    /// Table-driven BLER instead of a flat failure probability
    pub use_bler_tables: bool,

    /// Failure probability per attempt when tables are off
    pub flat_error_probability: f64,

    pub users: Vec<UserConfig>,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            seed: 12345,
            worker_threads: 2,
            grid: GridConfig::default(),
            downlink: LinkConfig::default(),
            uplink: LinkConfig {
                release: ReleaseMode::Blocks,
                ..LinkConfig::default()
            },
            modulation: ModulationTable::default(),
            use_bler_tables: false,
            flat_error_probability: 0.1,
            users: vec![UserConfig::default()],
        }
    }
}

/// One user equipment
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    pub traffic: TrafficConfig,
    pub weights: MetricWeights,
    /// Static channel used when no external oracle is supplied
    pub channel: UserChannel,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl EmulatorConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values no component can work with
    ///
    /// Out-of-range ids (numerology, metric, duplexing...) are not errors;
    /// the grid falls back to defaults and warns.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.users.is_empty() {
            return Err(ConfigError::Invalid("at least one user is required".into()));
        }
        if !(self.grid.bandwidth_hz.is_finite() && self.grid.bandwidth_hz > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "bandwidth must be positive, got {} Hz",
                self.grid.bandwidth_hz
            )));
        }
        if !(0.0..=1.0).contains(&self.flat_error_probability) {
            return Err(ConfigError::Invalid(format!(
                "flat error probability must lie in [0, 1], got {}",
                self.flat_error_probability
            )));
        }
        for (label, link) in [("downlink", &self.downlink), ("uplink", &self.uplink)] {
            if link.capacity_bits == 0 {
                return Err(ConfigError::Invalid(format!("{label} buffer capacity must be positive")));
            }
            let timings = [
                link.harq.ack_period,
                link.harq.ack_period_var,
                link.harq.proc_delay,
                link.harq.proc_delay_var,
                link.backhaul.mean,
                link.backhaul.variance,
            ];
            if timings.iter().any(|t| !t.is_finite() || *t < 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "{label} delays must be finite and non-negative"
                )));
            }
        }
        for (index, user) in self.users.iter().enumerate() {
            if user.traffic.packet_size_bits == 0 {
                return Err(ConfigError::Invalid(format!("user {index}: packet size must be positive")));
            }
            let w = &user.weights;
            if w.priority < 0.0 || w.delay_target <= 0.0 || !(w.delta > 0.0 && w.delta <= 1.0) {
                return Err(ConfigError::Invalid(format!(
                    "user {index}: weights need priority >= 0, delay_target > 0 and delta in (0, 1]"
                )));
            }
            if user.channel.distance_m < 0.0 {
                return Err(ConfigError::Invalid(format!("user {index}: negative distance")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EmulatorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = EmulatorConfig::from_json_str(r#"{"seed": 7, "users": [{}, {}]}"#).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.users.len(), 2);
        assert_eq!(config.grid, GridConfig::default());
    }

    #[test]
    fn test_no_users_rejected() {
        let err = EmulatorConfig::from_json_str(r#"{"users": []}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_malformed_json() {
        let err = EmulatorConfig::from_json_str("{ seed: ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
