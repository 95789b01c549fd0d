//! TDD symbol cycle
//!
//! A TDD pattern is a fixed sequence of OFDM symbols:
//!
//! ```text
//! [DL × dl_slots·14] [transition slot: DL, flexible, UL] [UL × ul_slots·14]
//! ```
//!
//! The cycle keeps a cursor into the sequence. Each TTI a grid takes one
//! subframe worth of symbols and learns how many of them belong to its
//! direction. Flexible symbols are never granted.

use crate::models::Direction;
use crate::scheduler::numerology::SYMBOLS_PER_SLOT;
use serde::{Deserialize, Serialize};

/// Transition slot layouts `[DL, flexible, UL]`, indexed by configuration id
///
/// Id 0 is reserved and never selected.
pub const TRANSITION_TABLE: [[u32; 3]; 7] = [
    [14, 0, 0],
    [10, 2, 2],
    [6, 4, 4],
    [4, 2, 8],
    [2, 2, 10],
    [12, 2, 0],
    [0, 2, 12],
];

/// Transition id used when the configured one is invalid
pub const FALLBACK_TRANSITION: u8 = 1;

/// One symbol of the TDD pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SymbolKind {
    Downlink,
    Flexible,
    Uplink,
}

impl SymbolKind {
    fn serves(self, direction: Direction) -> bool {
        matches!(
            (self, direction),
            (SymbolKind::Downlink, Direction::Downlink) | (SymbolKind::Uplink, Direction::Uplink)
        )
    }
}

/// TDD pattern parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TddPattern {
    /// Full downlink slots before the transition slot
    pub dl_slots: u32,
    /// Full uplink slots after the transition slot
    pub ul_slots: u32,
    /// Transition slot layout id (1..=6)
    pub transition: u8,
}

impl Default for TddPattern {
    fn default() -> Self {
        Self {
            dl_slots: 3,
            ul_slots: 1,
            transition: 1,
        }
    }
}

/// Cyclic TDD symbol sequence with a cursor
///
/// # Example
/// ```
/// use ran_emulator_core::models::Direction;
/// use ran_emulator_core::scheduler::{TddCycle, TddPattern};
///
/// let pattern = TddPattern { dl_slots: 1, ul_slots: 1, transition: 1 };
/// let mut dl = TddCycle::new(pattern, Direction::Downlink);
///
/// assert_eq!(dl.len(), 42);
/// assert_eq!(dl.take(14), 14); // first slot is all downlink
/// assert_eq!(dl.take(14), 10); // transition slot: 10 DL symbols
/// assert_eq!(dl.take(14), 0);  // uplink slot
/// assert_eq!(dl.take(14), 14); // wrapped around
/// ```
#[derive(Debug, Clone)]
pub struct TddCycle {
    pattern: Vec<SymbolKind>,
    direction: Direction,
    cursor: usize,
}

impl TddCycle {
    /// Build the cycle for one direction
    ///
    /// An invalid transition id logs a warning and uses [`FALLBACK_TRANSITION`].
    pub fn new(config: TddPattern, direction: Direction) -> Self {
        let transition = if (1..TRANSITION_TABLE.len() as u8).contains(&config.transition) {
            config.transition
        } else {
            log::warn!(
                "invalid TDD transition configuration {}, using {}",
                config.transition,
                FALLBACK_TRANSITION
            );
            FALLBACK_TRANSITION
        };
        let [dl, flex, ul] = TRANSITION_TABLE[usize::from(transition)];

        let mut pattern = Vec::new();
        let push = |pattern: &mut Vec<SymbolKind>, kind: SymbolKind, n: u32| {
            pattern.extend(std::iter::repeat(kind).take(n as usize))
        };
        push(&mut pattern, SymbolKind::Downlink, config.dl_slots * SYMBOLS_PER_SLOT);
        push(&mut pattern, SymbolKind::Downlink, dl);
        push(&mut pattern, SymbolKind::Flexible, flex);
        push(&mut pattern, SymbolKind::Uplink, ul);
        push(&mut pattern, SymbolKind::Uplink, config.ul_slots * SYMBOLS_PER_SLOT);

        Self {
            pattern,
            direction,
            cursor: 0,
        }
    }

    /// Symbols in one full cycle
    pub fn len(&self) -> usize {
        self.pattern.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pattern.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Count symbols of this direction in the next `symbols` positions
    ///
    /// Does not move the cursor.
    pub fn available(&self, symbols: u32) -> u32 {
        let len = self.pattern.len();
        (0..symbols as usize)
            .map(|i| self.pattern[(self.cursor + i) % len])
            .filter(|kind| kind.serves(self.direction))
            .count() as u32
    }

    /// Move the cursor forward by `symbols` positions, wrapping
    pub fn advance(&mut self, symbols: u32) {
        self.cursor = (self.cursor + symbols as usize) % self.pattern.len();
    }

    /// Count and consume the next `symbols` positions
    ///
    /// Called once per time row per TTI.
    pub fn take(&mut self, symbols: u32) -> u32 {
        let available = self.available(symbols);
        self.advance(symbols);
        available
    }
}
