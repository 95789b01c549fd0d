//! Resource grid
//!
//! Lays out the time/frequency resource units of one direction from the
//! carrier configuration and runs the per-TTI scheduling pass.
//!
//! # Layout
//!
//! ```text
//! resource blocks  = min(floor(bw / (scs · 12)), N_RB_MAX[μ])   (bw halved for FDD)
//! frequency groups = resource blocks / RBG size                  (remainder unused)
//! time rows        = 2^μ rows of 14 symbols   (distributed)
//!                  = 1 row of 14 · 2^μ symbols (localized)
//! ```
//!
//! # Example
//!
//! ```rust
//! use ran_emulator_core::models::Direction;
//! use ran_emulator_core::scheduler::{GridConfig, ResourceGrid};
//!
//! let config = GridConfig {
//!     numerology: 1,
//!     bandwidth_hz: 18e6,
//!     ..GridConfig::default()
//! };
//! let grid = ResourceGrid::new(Direction::Downlink, &config).unwrap();
//! assert_eq!(grid.resource_blocks(), 50);
//! assert_eq!(grid.rbg_size(), 4);
//! assert_eq!(grid.freq_groups(), 12);
//! ```

use crate::models::Direction;
use crate::policy::{MetricEvaluator, MetricPolicy};
use crate::scheduler::numerology::{
    checked_numerology, rbg_size, slots_per_subframe, subcarrier_spacing_hz,
    MAX_RESOURCE_BLOCKS, MIN_RESOURCE_BLOCKS, SUBCARRIERS_PER_RB, SYMBOLS_PER_SLOT,
};
use crate::scheduler::resource_unit::ResourceUnit;
use crate::scheduler::tdd::{TddCycle, TddPattern};
use crate::scheduler::LinkDirectory;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Configuration Types
// ============================================================================

/// Carrier configuration shared by the downlink and uplink grids
///
/// Mode fields are numeric ids; unknown ids fall back to a default with a
/// warning rather than failing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Spatial layers
    pub mimo_layers: u32,
    /// Numerology μ (0..=5)
    pub numerology: u8,
    /// Carrier bandwidth in Hz (split between directions under FDD)
    pub bandwidth_hz: f64,
    /// 0 distributed, 1 localized
    pub scheduling_mode: u8,
    /// 0 table-driven resource-block groups, 1 no grouping
    pub grouping: u8,
    /// RBG table column (0 or 1) used with table-driven grouping
    pub grouping_config: u8,
    /// Scheduling metric id (see [`MetricPolicy::from_id`])
    pub metric: u8,
    /// 0 TDD, 1 FDD
    pub duplexing: u8,
    /// TDD pattern (ignored under FDD)
    pub tdd: TddPattern,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            mimo_layers: 1,
            numerology: 1,
            bandwidth_hz: 20e6,
            scheduling_mode: 1,
            grouping: 0,
            grouping_config: 0,
            metric: MetricPolicy::default().id(),
            duplexing: 0,
            tdd: TddPattern::default(),
        }
    }
}

/// How a subframe is split into time rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulingMode {
    /// One row per slot
    Distributed,
    /// One row spanning the whole subframe
    Localized,
}

impl SchedulingMode {
    fn from_id(id: u8) -> Self {
        match id {
            0 => SchedulingMode::Distributed,
            1 => SchedulingMode::Localized,
            other => {
                log::warn!("unknown scheduling mode {}, using localized", other);
                SchedulingMode::Localized
            }
        }
    }
}

/// Resource-block grouping rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grouping {
    /// RBG size from the 3GPP table column `config`
    Table { config: u8 },
    /// Every resource block is its own group
    Single,
}

impl Grouping {
    fn from_ids(grouping: u8, config: u8) -> Self {
        match grouping {
            0 => Grouping::Table { config },
            1 => Grouping::Single,
            other => {
                log::warn!("unknown grouping type {}, using no grouping", other);
                Grouping::Single
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Duplexing {
    Tdd,
    Fdd,
}

impl Duplexing {
    fn from_id(id: u8) -> Self {
        match id {
            0 => Duplexing::Tdd,
            1 => Duplexing::Fdd,
            other => {
                log::warn!("unknown duplexing mode {}, using TDD", other);
                Duplexing::Tdd
            }
        }
    }
}

/// Grid construction failures
#[derive(Debug, Error, PartialEq)]
pub enum GridError {
    #[error(
        "bandwidth {bandwidth_hz} Hz at numerology {numerology} gives {resource_blocks} resource blocks, minimum is {minimum}"
    )]
    InsufficientBandwidth {
        bandwidth_hz: f64,
        numerology: u8,
        resource_blocks: u32,
        minimum: u32,
    },
}

/// Summary of one scheduling pass
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GridReport {
    /// Sum of granted bit budgets
    pub granted_bits: f64,
    /// Bits the links actually accepted
    pub delivered_bits: f64,
    /// Units that produced a grant
    pub grants: usize,
    /// Units left unassigned
    pub idle_units: usize,
}

// ============================================================================
// Resource Grid
// ============================================================================

/// Time/frequency grid of one direction
pub struct ResourceGrid {
    direction: Direction,
    numerology: u8,
    mimo_layers: u32,
    mode: SchedulingMode,
    duplexing: Duplexing,
    resource_blocks: u32,
    rbg_size: u32,
    freq_groups: usize,
    time_rows: usize,
    symbols_per_row: u32,
    /// Row-major: `units[row * freq_groups + freq]`
    units: Vec<ResourceUnit>,
    evaluator: MetricEvaluator,
    tdd: Option<TddCycle>,
}

impl ResourceGrid {
    /// Build the grid for `direction`
    ///
    /// # Errors
    ///
    /// [`GridError::InsufficientBandwidth`] when the carrier yields fewer than
    /// [`MIN_RESOURCE_BLOCKS`] resource blocks.
    pub fn new(direction: Direction, config: &GridConfig) -> Result<Self, GridError> {
        let numerology = checked_numerology(config.numerology);
        let duplexing = Duplexing::from_id(config.duplexing);
        let mode = SchedulingMode::from_id(config.scheduling_mode);
        let grouping = Grouping::from_ids(config.grouping, config.grouping_config);
        let policy = MetricPolicy::from_id_or_default(config.metric);

        let bandwidth_hz = match duplexing {
            Duplexing::Fdd => config.bandwidth_hz / 2.0,
            Duplexing::Tdd => config.bandwidth_hz,
        };
        let rb_width_hz = subcarrier_spacing_hz(numerology) * f64::from(SUBCARRIERS_PER_RB);
        let fitting = (bandwidth_hz / rb_width_hz).floor().max(0.0) as u32;
        let resource_blocks = fitting.min(MAX_RESOURCE_BLOCKS[usize::from(numerology)]);
        if resource_blocks < MIN_RESOURCE_BLOCKS {
            return Err(GridError::InsufficientBandwidth {
                bandwidth_hz,
                numerology,
                resource_blocks,
                minimum: MIN_RESOURCE_BLOCKS,
            });
        }

        let rbg_size = match grouping {
            Grouping::Table { config } => rbg_size(resource_blocks, config),
            Grouping::Single => 1,
        };
        let freq_groups = (resource_blocks / rbg_size) as usize;

        let slots = slots_per_subframe(numerology);
        let (time_rows, symbols_per_row) = match mode {
            SchedulingMode::Distributed => (slots as usize, SYMBOLS_PER_SLOT),
            SchedulingMode::Localized => (1, SYMBOLS_PER_SLOT * slots),
        };

        let units = (0..time_rows)
            .flat_map(|t| (0..freq_groups).map(move |f| ResourceUnit::new(t, f, direction)))
            .collect();

        let tdd = match duplexing {
            Duplexing::Tdd => Some(TddCycle::new(config.tdd, direction)),
            Duplexing::Fdd => None,
        };

        let grid = Self {
            direction,
            numerology,
            mimo_layers: config.mimo_layers.max(1),
            mode,
            duplexing,
            resource_blocks,
            rbg_size,
            freq_groups,
            time_rows,
            symbols_per_row,
            units,
            evaluator: MetricEvaluator::new(policy),
            tdd,
        };

        log::info!(
            "{} grid: μ={} {} RBs, RBG size {} → {} groups × {} rows, {} REs per TTI, metric {:?}",
            direction,
            numerology,
            resource_blocks,
            rbg_size,
            freq_groups,
            time_rows,
            grid.resource_elements_per_tti(),
            policy
        );

        Ok(grid)
    }

    /// Run one scheduling pass at time `now`
    ///
    /// Rows are processed in order; within a row every unit estimates and
    /// then immediately hands its grant to `directory`, so later units see
    /// the queue state left by earlier grants.
    pub fn step<D: LinkDirectory + ?Sized>(&mut self, now: f64, directory: &mut D) -> GridReport {
        let mut report = GridReport::default();
        self.evaluator.begin_pass();

        for row in 0..self.time_rows {
            let symbols = match self.tdd.as_mut() {
                Some(cycle) => cycle.take(self.symbols_per_row),
                None => self.symbols_per_row,
            };
            let start = row * self.freq_groups;
            for unit in &mut self.units[start..start + self.freq_groups] {
                unit.estimate(symbols, now, &*directory, &mut self.evaluator);
                match unit.handle(symbols, directory) {
                    Some(outcome) => {
                        report.grants += 1;
                        report.granted_bits += outcome.grant.bits;
                        report.delivered_bits += outcome.delivered;
                    }
                    None => report.idle_units += 1,
                }
            }
        }

        report
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn numerology(&self) -> u8 {
        self.numerology
    }

    pub fn mimo_layers(&self) -> u32 {
        self.mimo_layers
    }

    pub fn scheduling_mode(&self) -> SchedulingMode {
        self.mode
    }

    pub fn duplexing(&self) -> Duplexing {
        self.duplexing
    }

    pub fn policy(&self) -> MetricPolicy {
        self.evaluator.policy()
    }

    /// Resource blocks in frequency
    pub fn resource_blocks(&self) -> u32 {
        self.resource_blocks
    }

    pub fn rbg_size(&self) -> u32 {
        self.rbg_size
    }

    /// Resource-block groups in frequency
    pub fn freq_groups(&self) -> usize {
        self.freq_groups
    }

    pub fn time_rows(&self) -> usize {
        self.time_rows
    }

    pub fn symbols_per_row(&self) -> u32 {
        self.symbols_per_row
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Resource elements in one TTI across all resource blocks
    pub fn resource_elements_per_tti(&self) -> u64 {
        u64::from(self.resource_blocks)
            * u64::from(SUBCARRIERS_PER_RB)
            * u64::from(SYMBOLS_PER_SLOT)
            * u64::from(slots_per_subframe(self.numerology))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fdd_halves_bandwidth() {
        let config = GridConfig {
            numerology: 0,
            bandwidth_hz: 20e6,
            duplexing: 1,
            grouping: 1,
            ..GridConfig::default()
        };
        let grid = ResourceGrid::new(Direction::Uplink, &config).unwrap();
        // 10 MHz / 180 kHz = 55.5
        assert_eq!(grid.resource_blocks(), 55);
        assert_eq!(grid.freq_groups(), 55);
    }

    #[test]
    fn test_rb_count_capped_by_numerology() {
        let config = GridConfig {
            numerology: 0,
            bandwidth_hz: 100e6,
            ..GridConfig::default()
        };
        let grid = ResourceGrid::new(Direction::Downlink, &config).unwrap();
        assert_eq!(grid.resource_blocks(), 270);
    }

    #[test]
    fn test_distributed_rows_per_slot() {
        let config = GridConfig {
            numerology: 2,
            bandwidth_hz: 40e6,
            scheduling_mode: 0,
            ..GridConfig::default()
        };
        let grid = ResourceGrid::new(Direction::Downlink, &config).unwrap();
        assert_eq!(grid.time_rows(), 4);
        assert_eq!(grid.symbols_per_row(), 14);
        assert_eq!(grid.unit_count(), 4 * grid.freq_groups());
    }

    #[test]
    fn test_too_narrow_carrier_fails() {
        let config = GridConfig {
            numerology: 3,
            bandwidth_hz: 20e6,
            ..GridConfig::default()
        };
        let err = ResourceGrid::new(Direction::Downlink, &config).err().unwrap();
        assert!(matches!(
            err,
            GridError::InsufficientBandwidth { resource_blocks: 13, .. }
        ));
    }
}
