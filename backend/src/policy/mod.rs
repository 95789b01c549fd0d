//! Scheduling metric policies
//!
//! A resource unit hands each competing user to the [`MetricEvaluator`],
//! which scores the user with the grid's configured [`MetricPolicy`]. The
//! highest score wins the unit for this TTI.
//!
//! # Policies
//!
//! | id | Policy | Score |
//! |----|--------|-------|
//! | 0 | `Fifo` | `p × (now − request_time)` |
//! | 1 | `BlindEqualThroughput` | `p / (β·avg + (1 − β)·current)` |
//! | 2 | `DistanceToDelay` | `p / (delay_target − delay)` |
//! | 3 | `WeightedDelay` | `−ln(δ) / delay_target × p × delay` |
//! | 4 | `MaxThroughput` | `p × current` |
//! | 5 | `RoundRobin` | 1 for the designated user, else 0 |
//! | 6 | `ProportionalFair` | `p × current / avg^β` |
//!
//! Unknown ids fall back to proportional fair.
//!
//! # Example
//!
//! ```rust
//! use ran_emulator_core::policy::{MetricEvaluator, MetricInfo, MetricPolicy, MetricWeights};
//!
//! let mut evaluator = MetricEvaluator::new(MetricPolicy::MaxThroughput);
//! evaluator.begin_pass();
//!
//! let info = MetricInfo {
//!     current_throughput: 120.0,
//!     ..MetricInfo::default()
//! };
//! assert_eq!(evaluator.score(0, 0, 1, 0.0, &info), 120.0);
//! ```

mod evaluator;
mod round_robin;

pub use evaluator::{evaluate, MetricEvaluator};
pub use round_robin::RoundRobinCursor;

use serde::{Deserialize, Serialize};

/// Smallest slack used by the distance-to-delay metric once a user has
/// reached or passed its delay target
pub const MIN_DELAY_SLACK: f64 = 1e-6;

/// Scheduling metric selected for a grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricPolicy {
    Fifo,
    BlindEqualThroughput,
    DistanceToDelay,
    /// Larmo's weighted-delay metric
    WeightedDelay,
    MaxThroughput,
    RoundRobin,
    ProportionalFair,
}

impl MetricPolicy {
    /// Map a configuration id to a policy
    ///
    /// Returns `None` for ids outside 0..=6.
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(MetricPolicy::Fifo),
            1 => Some(MetricPolicy::BlindEqualThroughput),
            2 => Some(MetricPolicy::DistanceToDelay),
            3 => Some(MetricPolicy::WeightedDelay),
            4 => Some(MetricPolicy::MaxThroughput),
            5 => Some(MetricPolicy::RoundRobin),
            6 => Some(MetricPolicy::ProportionalFair),
            _ => None,
        }
    }

    /// Map a configuration id, falling back to proportional fair with a warning
    pub fn from_id_or_default(id: u8) -> Self {
        Self::from_id(id).unwrap_or_else(|| {
            log::warn!(
                "unknown scheduling metric id {}, using proportional fair",
                id
            );
            MetricPolicy::default()
        })
    }

    pub fn id(self) -> u8 {
        match self {
            MetricPolicy::Fifo => 0,
            MetricPolicy::BlindEqualThroughput => 1,
            MetricPolicy::DistanceToDelay => 2,
            MetricPolicy::WeightedDelay => 3,
            MetricPolicy::MaxThroughput => 4,
            MetricPolicy::RoundRobin => 5,
            MetricPolicy::ProportionalFair => 6,
        }
    }
}

impl Default for MetricPolicy {
    fn default() -> Self {
        MetricPolicy::ProportionalFair
    }
}

/// Per-user metric parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricWeights {
    /// Scaling factor applied by every metric
    pub priority: f64,
    /// Averaging weight (BET) or fairness exponent (PF)
    pub beta: f64,
    /// Acceptable delay-violation probability (weighted delay)
    pub delta: f64,
    /// Delay target in seconds
    pub delay_target: f64,
}

impl Default for MetricWeights {
    fn default() -> Self {
        Self {
            priority: 1.0,
            beta: 0.9,
            delta: 0.8,
            delay_target: 0.001,
        }
    }
}

/// Scheduling state of one user on one frequency index
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MetricInfo {
    /// Oldest pending timestamp (seconds)
    pub request_time: f64,
    /// Long-run average delivered bits per TTI
    pub avg_throughput: f64,
    /// Achievable bits per symbol on this frequency index
    pub current_throughput: f64,
    /// Current queuing delay (seconds)
    pub delay: f64,
    pub weights: MetricWeights,
}
