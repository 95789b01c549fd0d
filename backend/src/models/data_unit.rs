//! Data unit model
//!
//! A data unit is the emulator's view of one IP packet travelling through
//! the link layer. Each unit has:
//! - A monotonically increasing identifier and an optional predecessor id
//! - Current size and immutable original size, both in bits
//! - Creation, ingress and release timestamps (seconds)
//! - An erase flag set when the unit is known to be lost
//!
//! Units are split into fragments when a grant cannot carry them whole.
//! Fragments keep the identifier of their parent so the release buffer can
//! sum them back together.

use serde::{Deserialize, Serialize};

/// Maximum size difference (bits) at which a reassembled unit counts as complete
pub const READY_TOLERANCE_BITS: u64 = 10;

/// Backhaul delay parameters applied when a unit leaves the radio link
///
/// The effective delay is `mean + U(-1, 1) * variance`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BackhaulDelay {
    /// Mean backhaul delay in seconds
    pub mean: f64,
    /// Half-width of the uniform jitter in seconds
    pub variance: f64,
}

/// One IP packet (or fragment of one) inside the link layer
///
/// # Example
/// ```
/// use ran_emulator_core::models::{BackhaulDelay, DataUnit};
///
/// let mut unit = DataUnit::new(7, Some(6), 1_000, 0.002, BackhaulDelay::default());
/// let head = unit.split_off(400);
///
/// assert_eq!(head.size(), 400);
/// assert_eq!(unit.size(), 600);
/// assert!(head.is_fragment());
/// assert_eq!(head.id(), unit.id());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataUnit {
    id: u32,
    prev_id: Option<u32>,
    size: u64,
    original_size: u64,
    created_at: f64,
    ingress_at: f64,
    release_at: f64,
    erased: bool,
    backhaul: BackhaulDelay,
}

impl DataUnit {
    /// Create a complete (non-fragment) unit
    ///
    /// Ingress time defaults to the creation time.
    pub fn new(
        id: u32,
        prev_id: Option<u32>,
        size: u64,
        created_at: f64,
        backhaul: BackhaulDelay,
    ) -> Self {
        Self {
            id,
            prev_id,
            size,
            original_size: size,
            created_at,
            ingress_at: created_at,
            release_at: created_at,
            erased: false,
            backhaul,
        }
    }

    /// Set the ingress timestamp (arrival time of a captured packet)
    pub fn with_ingress(mut self, ingress_at: f64) -> Self {
        self.ingress_at = ingress_at;
        self
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn prev_id(&self) -> Option<u32> {
        self.prev_id
    }

    /// Bits currently carried by this unit
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn original_size(&self) -> u64 {
        self.original_size
    }

    pub fn created_at(&self) -> f64 {
        self.created_at
    }

    pub fn ingress_at(&self) -> f64 {
        self.ingress_at
    }

    pub fn release_at(&self) -> f64 {
        self.release_at
    }

    pub fn is_erased(&self) -> bool {
        self.erased
    }

    pub fn backhaul(&self) -> BackhaulDelay {
        self.backhaul
    }

    /// True while the unit carries only part of its original bits
    pub fn is_fragment(&self) -> bool {
        self.size != self.original_size
    }

    /// True once the carried bits are within tolerance of the original size
    pub fn is_ready(&self) -> bool {
        self.size.abs_diff(self.original_size) <= READY_TOLERANCE_BITS
    }

    /// Move `bits` out of this unit into a new fragment with the same id
    ///
    /// # Panics
    /// Panics if `bits` exceeds the carried size.
    pub fn split_off(&mut self, bits: u64) -> DataUnit {
        assert!(bits <= self.size, "cannot split more bits than carried");
        let mut fragment = self.clone();
        fragment.size = bits;
        self.size -= bits;
        fragment
    }

    pub(crate) fn absorb(&mut self, bits: u64) {
        self.size += bits;
    }

    pub(crate) fn mark_erased(&mut self) {
        self.erased = true;
    }

    pub(crate) fn set_release_at(&mut self, t: f64) {
        self.release_at = t;
    }

    pub(crate) fn set_ingress_at(&mut self, t: f64) {
        self.ingress_at = t;
    }
}
