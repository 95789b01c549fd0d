//! Time management for the emulator
//!
//! The emulator advances in discrete Transmission Time Intervals (TTIs).
//! One TTI lasts one millisecond; every timestamp handed to buffers and
//! metrics is expressed in seconds derived from the TTI counter.

use serde::{Deserialize, Serialize};

/// Default TTI length in seconds
pub const TTI_SECONDS: f64 = 0.001;

/// Manages emulation time in discrete TTIs
///
/// # Example
/// ```
/// use ran_emulator_core::TimeManager;
///
/// let mut time = TimeManager::new(0.001);
/// assert_eq!(time.current_tti(), 0);
///
/// time.advance_tti();
/// assert_eq!(time.current_tti(), 1);
/// assert!((time.now() - 0.001).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeManager {
    /// TTIs elapsed since start
    current_tti: u64,
    /// Length of one TTI in seconds
    tti_seconds: f64,
}

impl TimeManager {
    /// Create a new TimeManager
    ///
    /// # Panics
    /// Panics if `tti_seconds` is not positive.
    pub fn new(tti_seconds: f64) -> Self {
        assert!(tti_seconds > 0.0, "tti_seconds must be positive");
        Self {
            current_tti: 0,
            tti_seconds,
        }
    }

    /// Advance time by one TTI
    pub fn advance_tti(&mut self) {
        self.current_tti += 1;
    }

    /// TTIs elapsed since start
    pub fn current_tti(&self) -> u64 {
        self.current_tti
    }

    /// Current time in seconds
    pub fn now(&self) -> f64 {
        self.current_tti as f64 * self.tti_seconds
    }

    /// Length of one TTI in seconds
    pub fn tti_seconds(&self) -> f64 {
        self.tti_seconds
    }
}

impl Default for TimeManager {
    fn default() -> Self {
        Self::new(TTI_SECONDS)
    }
}
