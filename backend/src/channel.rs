//! Channel-model seam
//!
//! The physical layer is an external collaborator. The emulator only asks
//! it for numbers: per-symbol throughput, MCS and SINR for a user on a
//! frequency group, and the user's distance to the base station.

use crate::models::Direction;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Channel conditions of one user on one frequency group
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelState {
    /// Achievable bits per OFDM symbol on the group
    pub throughput_per_symbol: f64,
    pub mcs: u8,
    pub sinr_db: f64,
}

/// Numeric channel oracle consulted during scheduling
///
/// Implementations are shared by the worker threads and must only be read.
pub trait ChannelOracle: Send + Sync {
    fn observe(&self, user: usize, direction: Direction, freq: usize, now: f64) -> ChannelState;

    /// Distance from the user to the base station in metres
    fn distance_m(&self, user: usize, now: f64) -> f64;
}

/// Static per-user channel description used in configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserChannel {
    pub distance_m: f64,
    pub downlink: ChannelState,
    pub uplink: ChannelState,
}

impl Default for UserChannel {
    fn default() -> Self {
        Self {
            distance_m: 100.0,
            downlink: ChannelState {
                throughput_per_symbol: 200.0,
                mcs: 20,
                sinr_db: 25.0,
            },
            uplink: ChannelState {
                throughput_per_symbol: 100.0,
                mcs: 15,
                sinr_db: 20.0,
            },
        }
    }
}

/// Time-invariant channel table
///
/// Every frequency group sees the user's flat state unless an override was
/// set for that group.
///
/// # Example
/// ```
/// use ran_emulator_core::channel::{ChannelOracle, ChannelState, StaticChannel, UserChannel};
/// use ran_emulator_core::models::Direction;
///
/// let mut channel = StaticChannel::new(vec![UserChannel::default(); 2]);
/// channel.set_group(1, Direction::Downlink, 3, ChannelState {
///     throughput_per_symbol: 0.0,
///     mcs: 0,
///     sinr_db: -10.0,
/// });
///
/// assert_eq!(channel.observe(1, Direction::Downlink, 3, 0.0).throughput_per_symbol, 0.0);
/// assert_eq!(channel.observe(1, Direction::Downlink, 2, 0.0).throughput_per_symbol, 200.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticChannel {
    users: Vec<UserChannel>,
    overrides: HashMap<(usize, Direction, usize), ChannelState>,
}

impl StaticChannel {
    pub fn new(users: Vec<UserChannel>) -> Self {
        Self {
            users,
            overrides: HashMap::new(),
        }
    }

    /// Override the state of one frequency group
    pub fn set_group(&mut self, user: usize, direction: Direction, freq: usize, state: ChannelState) {
        self.overrides.insert((user, direction, freq), state);
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}

impl ChannelOracle for StaticChannel {
    fn observe(&self, user: usize, direction: Direction, freq: usize, _now: f64) -> ChannelState {
        if let Some(state) = self.overrides.get(&(user, direction, freq)) {
            return *state;
        }
        match (self.users.get(user), direction) {
            (Some(u), Direction::Downlink) => u.downlink,
            (Some(u), Direction::Uplink) => u.uplink,
            (None, _) => ChannelState::default(),
        }
    }

    fn distance_m(&self, user: usize, _now: f64) -> f64 {
        self.users.get(user).map(|u| u.distance_m).unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_user_sees_no_channel() {
        let channel = StaticChannel::new(vec![UserChannel::default()]);
        let state = channel.observe(4, Direction::Uplink, 0, 0.0);
        assert_eq!(state, ChannelState::default());
        assert_eq!(state.throughput_per_symbol, 0.0);
        assert_eq!(state.mcs, 0);
        assert_eq!(channel.distance_m(4, 0.0), 0.0);
    }
}
