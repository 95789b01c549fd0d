//! Resource scheduling
//!
//! Each direction owns one [`ResourceGrid`]: a 2-D array of
//! [`ResourceUnit`]s (time rows × frequency groups). Every TTI the grid
//! asks each unit to pick the best user and then delivers the resulting
//! grant to that user's link.
//!
//! # Seams
//!
//! The grid never holds references to users. During a pass it reads user
//! state through a [`SchedulingView`] and asks for mutations by sending a
//! [`Grant`] to a [`LinkDirectory`]. Users are addressed by their stable
//! index in the emulator's arena.
//!
//! ```text
//! for each time row:
//!     symbols = TDD cycle (or fixed, FDD)
//!     for each frequency group:
//!         unit.estimate(symbols)   → best candidate (view)
//!         unit.handle(symbols)     → Grant to directory
//! ```

pub mod grid;
pub mod numerology;
pub mod resource_unit;
pub mod tdd;

pub use grid::{Duplexing, GridConfig, GridError, GridReport, Grouping, ResourceGrid, SchedulingMode};
pub use resource_unit::ResourceUnit;
pub use tdd::{TddCycle, TddPattern};

use crate::models::Direction;
use crate::policy::MetricInfo;

/// What the scheduler needs to know about one user on one frequency group
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CandidateInfo {
    /// User has data waiting (fresh or a due retransmission)
    pub has_data: bool,
    /// Achievable bits per symbol on this frequency group
    pub throughput: f64,
    /// Inputs for the scheduling metric
    pub metric: MetricInfo,
}

/// Read-only view of the users competing for a grid
pub trait SchedulingView {
    /// Number of users (indices are `0..user_count()`)
    fn user_count(&self) -> usize;

    /// Scheduling state of `user` on frequency group `freq` at time `now`
    fn candidate(&self, user: usize, freq: usize, now: f64) -> CandidateInfo;
}

/// A scheduling decision for one resource unit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grant {
    pub user: usize,
    pub direction: Direction,
    /// Frequency group the grant was made on
    pub freq: usize,
    /// Granted bit budget (throughput × symbols)
    pub bits: f64,
}

/// Receives grants and applies them to the users' links
pub trait LinkDirectory: SchedulingView {
    /// Apply a grant and return the bits actually delivered
    fn deliver(&mut self, grant: Grant) -> f64;
}
