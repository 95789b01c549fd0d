//! Transport block model
//!
//! A transport block is the HARQ unit: the set of data-unit fragments that
//! fill one granted bit budget. A block is owned by exactly one buffer at a
//! time (packet buffer drain → HARQ queue → release buffer) and is moved,
//! never copied, between them.

use crate::models::data_unit::{BackhaulDelay, DataUnit};
use serde::{Deserialize, Serialize};

/// One HARQ transport block
///
/// # Example
/// ```
/// use ran_emulator_core::models::{BackhaulDelay, DataUnit, TransportBlock};
///
/// let mut block = TransportBlock::new(0, 0.005, 12, 150.0, BackhaulDelay::default());
/// block.push_unit(DataUnit::new(3, None, 800, 0.001, BackhaulDelay::default()));
///
/// assert_eq!(block.bits(), 800);
/// assert_eq!(block.oldest_ingress(), 0.001);
/// assert_eq!(block.retransmissions(), 0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportBlock {
    id: u64,
    units: Vec<DataUnit>,
    bits: u64,
    retransmissions: u32,
    mcs: u8,
    distance_m: f64,
    created_at: f64,
    oldest_ingress: f64,
    due_at: f64,
    backhaul: BackhaulDelay,
}

impl TransportBlock {
    /// Create an empty block built at `created_at`
    pub fn new(
        id: u64,
        created_at: f64,
        mcs: u8,
        distance_m: f64,
        backhaul: BackhaulDelay,
    ) -> Self {
        Self {
            id,
            units: Vec::new(),
            bits: 0,
            retransmissions: 0,
            mcs,
            distance_m,
            created_at,
            oldest_ingress: created_at,
            due_at: created_at,
            backhaul,
        }
    }

    /// Append a unit (or fragment) to the block
    pub fn push_unit(&mut self, unit: DataUnit) {
        if self.units.is_empty() || unit.ingress_at() < self.oldest_ingress {
            self.oldest_ingress = unit.ingress_at();
        }
        self.bits += unit.size();
        self.units.push(unit);
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn units(&self) -> &[DataUnit] {
        &self.units
    }

    pub fn into_units(self) -> Vec<DataUnit> {
        self.units
    }

    /// Total bits carried
    pub fn bits(&self) -> u64 {
        self.bits
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Number of retransmissions already scheduled for this block
    pub fn retransmissions(&self) -> u32 {
        self.retransmissions
    }

    /// MCS assigned at first transmission
    pub fn mcs(&self) -> u8 {
        self.mcs
    }

    pub fn distance_m(&self) -> f64 {
        self.distance_m
    }

    pub fn created_at(&self) -> f64 {
        self.created_at
    }

    /// Ingress time of the oldest unit carried
    pub fn oldest_ingress(&self) -> f64 {
        self.oldest_ingress
    }

    /// Time at which the ACK/NACK for the last attempt is due
    pub fn due_at(&self) -> f64 {
        self.due_at
    }

    pub fn backhaul(&self) -> BackhaulDelay {
        self.backhaul
    }

    pub(crate) fn set_due_at(&mut self, t: f64) {
        self.due_at = t;
    }

    pub(crate) fn bump_retransmissions(&mut self) {
        self.retransmissions += 1;
    }

    pub(crate) fn set_distance(&mut self, distance_m: f64) {
        self.distance_m = distance_m;
    }
}
