//! Windowed and cumulative accumulators
//!
//! Every link statistic can be read two ways: the mean since the last
//! windowed read (the window resets on read), or the lifetime mean.

use crate::core::time::TTI_SECONDS;
use serde::{Deserialize, Serialize};

/// Which accumulation window a statistics query reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatsWindow {
    /// Mean since the previous `SinceLastQuery` read, then reset
    SinceLastQuery,
    /// Lifetime mean
    Cumulative,
}

/// Mean of per-step sums
///
/// Values added between two `step()` calls form one sample.
///
/// # Example
/// ```
/// use ran_emulator_core::link::{StatsWindow, WindowedMean};
///
/// let mut m = WindowedMean::new();
/// m.add(10.0);
/// m.step();
/// m.add(30.0);
/// m.step();
///
/// assert_eq!(m.read(StatsWindow::SinceLastQuery), 20.0);
/// assert_eq!(m.read(StatsWindow::SinceLastQuery), 0.0);
/// assert_eq!(m.read(StatsWindow::Cumulative), 20.0);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WindowedMean {
    window_sum: f64,
    window_steps: u64,
    pending: f64,
    total_mean: f64,
    total_steps: u64,
}

impl WindowedMean {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: f64) {
        self.window_sum += value;
        self.pending += value;
    }

    /// Close the current sample
    pub fn step(&mut self) {
        self.window_steps += 1;
        self.total_steps += 1;
        self.total_mean += (self.pending - self.total_mean) / self.total_steps as f64;
        self.pending = 0.0;
    }

    /// Mean since the last windowed read; resets the window
    pub fn take(&mut self) -> f64 {
        let mean = self.window_sum / self.window_steps.max(1) as f64;
        self.window_sum = 0.0;
        self.window_steps = 0;
        mean
    }

    /// Lifetime mean over all closed samples
    pub fn total(&self) -> f64 {
        self.total_mean
    }

    pub fn read(&mut self, window: StatsWindow) -> f64 {
        match window {
            StatsWindow::SinceLastQuery => self.take(),
            StatsWindow::Cumulative => self.total(),
        }
    }
}

/// Convert a mean of bits per TTI into Mbit/s
pub fn bits_per_tti_to_mbps(bits: f64) -> f64 {
    bits / TTI_SECONDS * 1e-6
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_window_reads_zero() {
        let mut m = WindowedMean::new();
        assert_eq!(m.take(), 0.0);
        assert_eq!(m.total(), 0.0);
    }

    #[test]
    fn test_cumulative_survives_windowed_reads() {
        let mut m = WindowedMean::new();
        for v in [4.0, 8.0, 0.0, 4.0] {
            m.add(v);
            m.step();
            let _ = m.take();
        }
        assert_eq!(m.total(), 4.0);
    }

    #[test]
    fn test_mbps_conversion() {
        assert!((bits_per_tti_to_mbps(1_000.0) - 1.0).abs() < 1e-12);
    }
}
