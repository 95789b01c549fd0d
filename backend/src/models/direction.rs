//! Link direction

use serde::{Deserialize, Serialize};

/// Direction of a link or resource grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Base station to user
    Downlink,
    /// User to base station
    Uplink,
}

impl Direction {
    /// Both directions, downlink first
    pub const ALL: [Direction; 2] = [Direction::Downlink, Direction::Uplink];

    /// Stable index (0 downlink, 1 uplink) for per-direction arrays
    pub fn index(self) -> usize {
        match self {
            Direction::Downlink => 0,
            Direction::Uplink => 1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Direction::Downlink => "DL",
            Direction::Uplink => "UL",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
