//! Synthetic traffic generation
//!
//! Produces the number of bits each user offers per TTI and direction.
//! All generation is deterministic for a given seed.
//!
//! # Models
//!
//! 1. **Constant**: target rate with uniform noise, `rate · dt · (1 + U(−1,1) · variation)`
//! 2. **Poisson**: Poisson-distributed packet count per TTI, each of `packet_size_bits`
//! 3. **Silent**: no synthetic traffic (captured traffic only)
//!
//! # Example
//!
//! ```
//! use ran_emulator_core::models::Direction;
//! use ran_emulator_core::traffic::{TrafficConfig, TrafficGenerator, TrafficModel};
//!
//! let config = TrafficConfig {
//!     model: TrafficModel::Constant {
//!         downlink_mbps: 10.0,
//!         uplink_mbps: 2.0,
//!         variation: 0.0,
//!     },
//!     packet_size_bits: 500,
//! };
//! let mut generator = TrafficGenerator::new(config, 42);
//! assert_eq!(generator.generate(Direction::Downlink, 0.001), 10_000);
//! assert_eq!(generator.generate(Direction::Uplink, 0.001), 2_000);
//! ```

use crate::models::Direction;
use crate::rng::RngManager;
use serde::{Deserialize, Serialize};

/// Traffic model of one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TrafficModel {
    /// Target rates with uniform relative noise
    Constant {
        downlink_mbps: f64,
        uplink_mbps: f64,
        /// Relative noise half-width (0.5 = ±50%)
        variation: f64,
    },
    /// Poisson packet arrivals
    Poisson {
        /// Expected packets per TTI on the downlink
        downlink_rate: f64,
        /// Expected packets per TTI on the uplink
        uplink_rate: f64,
    },
    Silent,
}

/// Traffic configuration of one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrafficConfig {
    pub model: TrafficModel,
    /// Size of generated data units in bits
    pub packet_size_bits: u64,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            model: TrafficModel::Constant {
                downlink_mbps: 50.0,
                uplink_mbps: 10.0,
                variation: 0.5,
            },
            packet_size_bits: 500,
        }
    }
}

/// Per-user traffic generator
#[derive(Debug, Clone)]
pub struct TrafficGenerator {
    config: TrafficConfig,
    rng: RngManager,
}

impl TrafficGenerator {
    pub fn new(config: TrafficConfig, seed: u64) -> Self {
        Self {
            config,
            rng: RngManager::new(seed),
        }
    }

    pub fn packet_size_bits(&self) -> u64 {
        self.config.packet_size_bits
    }

    /// Bits offered in `direction` over an interval of `dt` seconds
    pub fn generate(&mut self, direction: Direction, dt: f64) -> u64 {
        match &self.config.model {
            TrafficModel::Constant {
                downlink_mbps,
                uplink_mbps,
                variation,
            } => {
                let mbps = match direction {
                    Direction::Downlink => *downlink_mbps,
                    Direction::Uplink => *uplink_mbps,
                };
                let noise = if *variation != 0.0 {
                    variation * self.rng.symmetric()
                } else {
                    0.0
                };
                let bits = mbps * 1e6 * dt * (1.0 + noise);
                bits.max(0.0).round() as u64
            }
            TrafficModel::Poisson {
                downlink_rate,
                uplink_rate,
            } => {
                let rate = match direction {
                    Direction::Downlink => *downlink_rate,
                    Direction::Uplink => *uplink_rate,
                };
                self.rng.poisson(rate) * self.config.packet_size_bits
            }
            TrafficModel::Silent => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_traffic() {
        let config = TrafficConfig::default();
        let mut a = TrafficGenerator::new(config.clone(), 9);
        let mut b = TrafficGenerator::new(config, 9);
        for _ in 0..50 {
            assert_eq!(
                a.generate(Direction::Downlink, 0.001),
                b.generate(Direction::Downlink, 0.001)
            );
        }
    }

    #[test]
    fn test_constant_noise_bounds() {
        let mut generator = TrafficGenerator::new(TrafficConfig::default(), 3);
        for _ in 0..200 {
            let bits = generator.generate(Direction::Downlink, 0.001);
            assert!((25_000..=75_000).contains(&bits), "bits {} outside ±50%", bits);
        }
    }

    #[test]
    fn test_poisson_packets_are_whole() {
        let config = TrafficConfig {
            model: TrafficModel::Poisson {
                downlink_rate: 3.0,
                uplink_rate: 0.0,
            },
            packet_size_bits: 1_000,
        };
        let mut generator = TrafficGenerator::new(config, 5);
        for _ in 0..100 {
            assert_eq!(generator.generate(Direction::Downlink, 0.001) % 1_000, 0);
            assert_eq!(generator.generate(Direction::Uplink, 0.001), 0);
        }
    }

    #[test]
    fn test_silent_generates_nothing() {
        let config = TrafficConfig {
            model: TrafficModel::Silent,
            packet_size_bits: 500,
        };
        let mut generator = TrafficGenerator::new(config, 1);
        assert_eq!(generator.generate(Direction::Uplink, 0.001), 0);
    }
}
