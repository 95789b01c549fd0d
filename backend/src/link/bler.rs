//! Block error rate tables
//!
//! BLER is indexed by modulation table, resource-block-group size class,
//! spatial layer count, MCS and SINR bucket. The table is generated once
//! from a logistic waterfall curve per MCS and shared read-only between
//! all HARQ engines.

use serde::{Deserialize, Serialize};

/// Lowest SINR bucket (dB)
pub const MIN_SINR_DB: f64 = -10.0;
/// Highest SINR bucket (dB)
pub const MAX_SINR_DB: f64 = 35.0;
/// SINR bucket width (dB)
pub const SINR_STEP_DB: f64 = 0.5;

pub const SINR_BUCKETS: usize = 91;
pub const MODULATION_TABLES: usize = 2;
pub const RBG_CLASSES: usize = 4;
pub const MAX_LAYERS: usize = 4;
pub const MCS_LEVELS: usize = 28;

/// Flat failure probability used when tables are disabled
pub const TARGET_BLER: f64 = 0.1;

/// Failure probability reduction per extra attempt (soft-combining gain)
pub const HARQ_COMBINING_GAIN: f64 = 0.2;

/// Modulation table of a link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ModulationTable {
    Qam64,
    #[default]
    Qam256,
}

impl ModulationTable {
    fn index(self) -> usize {
        match self {
            ModulationTable::Qam64 => 0,
            ModulationTable::Qam256 => 1,
        }
    }
}

/// Static link parameters that select a BLER table slice
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkProfile {
    pub modulation: ModulationTable,
    /// Spatial layers (clamped to 1..=4)
    pub layers: u32,
    /// Resource blocks per group
    pub rbg_size: u32,
}

impl Default for LinkProfile {
    fn default() -> Self {
        Self {
            modulation: ModulationTable::default(),
            layers: 1,
            rbg_size: 1,
        }
    }
}

/// Dense BLER lookup table
///
/// # Example
/// ```
/// use ran_emulator_core::link::{BlerTable, LinkProfile};
///
/// let table = BlerTable::generate();
/// let profile = LinkProfile::default();
/// let low = table.lookup(&profile, 20, -5.0);
/// let high = table.lookup(&profile, 20, 34.0);
/// assert!(low > 0.9);
/// assert!(high < 0.01);
/// ```
#[derive(Debug, Clone)]
pub struct BlerTable {
    values: Vec<f64>,
}

impl BlerTable {
    /// Build the table from the logistic waterfall model
    pub fn generate() -> Self {
        let len = MODULATION_TABLES * RBG_CLASSES * MAX_LAYERS * MCS_LEVELS * SINR_BUCKETS;
        let mut values = Vec::with_capacity(len);
        for modulation in 0..MODULATION_TABLES {
            for rbg_class in 0..RBG_CLASSES {
                for layer in 0..MAX_LAYERS {
                    for mcs in 0..MCS_LEVELS {
                        let threshold = waterfall_threshold(modulation, layer, mcs);
                        let slope = 1.2 + 0.3 * rbg_class as f64;
                        for bucket in 0..SINR_BUCKETS {
                            let sinr = MIN_SINR_DB + bucket as f64 * SINR_STEP_DB;
                            let bler = 1.0 / (1.0 + (slope * (sinr - threshold)).exp());
                            values.push(bler.clamp(1e-6, 1.0));
                        }
                    }
                }
            }
        }
        Self { values }
    }

    /// BLER for `profile` at `mcs` and `sinr_db`
    ///
    /// MCS and SINR outside the table are clamped to its edges.
    pub fn lookup(&self, profile: &LinkProfile, mcs: u8, sinr_db: f64) -> f64 {
        let m = profile.modulation.index();
        let r = rbg_class(profile.rbg_size);
        let l = (profile.layers.clamp(1, MAX_LAYERS as u32) - 1) as usize;
        let c = usize::from(mcs).min(MCS_LEVELS - 1);
        let s = sinr_index(sinr_db);
        let offset = (((m * RBG_CLASSES + r) * MAX_LAYERS + l) * MCS_LEVELS + c) * SINR_BUCKETS + s;
        self.values[offset]
    }
}

/// SINR (dB) at which an MCS reaches 50% BLER
fn waterfall_threshold(modulation: usize, layer: usize, mcs: usize) -> f64 {
    let base = match modulation {
        0 => -6.0 + 0.9 * mcs as f64,
        _ => -4.0 + 1.1 * mcs as f64,
    };
    base + 1.5 * layer as f64
}

/// Bucket index for a SINR value, clamped to the table
pub fn sinr_index(sinr_db: f64) -> usize {
    if !sinr_db.is_finite() || sinr_db <= MIN_SINR_DB {
        return if sinr_db == f64::INFINITY { SINR_BUCKETS - 1 } else { 0 };
    }
    let idx = ((sinr_db - MIN_SINR_DB) / SINR_STEP_DB).round() as usize;
    idx.min(SINR_BUCKETS - 1)
}

/// Size class of a resource-block group: 1, 2, 4, 8+ → 0..=3
pub fn rbg_class(rbg_size: u32) -> usize {
    match rbg_size {
        0 | 1 => 0,
        2 | 3 => 1,
        4..=7 => 2,
        _ => 3,
    }
}

/// Failure model used by the HARQ engines
#[derive(Debug, Clone)]
pub enum HarqErrorModel {
    /// Table-driven BLER with compounding across attempts
    Tables(BlerTable),
    /// Fixed failure probability for every attempt
    Flat(f64),
}

impl HarqErrorModel {
    /// Probability that attempt number `attempt` (0 = first) fails
    pub fn failure_probability(
        &self,
        profile: &LinkProfile,
        mcs: u8,
        sinr_db: f64,
        attempt: u32,
    ) -> f64 {
        match self {
            HarqErrorModel::Flat(p) => *p,
            HarqErrorModel::Tables(table) => {
                let bler = table.lookup(profile, mcs, sinr_db);
                let success = (1.0 - bler).powi(attempt as i32 + 1);
                let gain = (1.0 - HARQ_COMBINING_GAIN).powi(attempt.saturating_sub(1) as i32);
                ((1.0 - success) * gain).clamp(0.0, 1.0)
            }
        }
    }
}

impl Default for HarqErrorModel {
    fn default() -> Self {
        HarqErrorModel::Flat(TARGET_BLER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_dimensions() {
        let table = BlerTable::generate();
        assert_eq!(
            table.values.len(),
            MODULATION_TABLES * RBG_CLASSES * MAX_LAYERS * MCS_LEVELS * SINR_BUCKETS
        );
    }

    #[test]
    fn test_bler_decreases_with_sinr() {
        let table = BlerTable::generate();
        let profile = LinkProfile::default();
        let mut last = 1.0;
        for step in 0..SINR_BUCKETS {
            let sinr = MIN_SINR_DB + step as f64 * SINR_STEP_DB;
            let bler = table.lookup(&profile, 15, sinr);
            assert!(bler <= last);
            last = bler;
        }
    }

    #[test]
    fn test_higher_mcs_is_less_robust() {
        let table = BlerTable::generate();
        let profile = LinkProfile::default();
        assert!(table.lookup(&profile, 27, 10.0) > table.lookup(&profile, 5, 10.0));
    }

    #[test]
    fn test_sinr_index_clamps() {
        assert_eq!(sinr_index(-40.0), 0);
        assert_eq!(sinr_index(100.0), SINR_BUCKETS - 1);
        assert_eq!(sinr_index(f64::NAN), 0);
        assert_eq!(sinr_index(0.0), 20);
    }

    #[test]
    fn test_flat_model_ignores_attempt() {
        let model = HarqErrorModel::Flat(0.3);
        let profile = LinkProfile::default();
        assert_eq!(model.failure_probability(&profile, 0, 0.0, 0), 0.3);
        assert_eq!(model.failure_probability(&profile, 0, 0.0, 3), 0.3);
    }
}
