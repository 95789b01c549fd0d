//! HARQ retransmission engine
//!
//! Models a single HARQ process per user per direction:
//!
//! ```text
//! empty → queued (due > now) → ready (due ≤ now) → retransmit (re-queued)
//!                                               └→ release / drop
//! ```
//!
//! Whether an attempt fails is drawn from the shared [`HarqErrorModel`].
//! The due time of the ACK/NACK is
//!
//! ```text
//! now + 2·distance/c + ack_period (± ack jitter) + processing (± processing jitter)
//! ```
//!
//! Jitter for each term is enabled at construction when its variance is
//! nonzero.

use crate::link::bler::{HarqErrorModel, LinkProfile};
use crate::models::TransportBlock;
use crate::rng::RngManager;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;

/// Speed of light in m/s
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Smallest ACK/NACK delay; keeps every queued block strictly in the future
pub const MIN_ACK_DELAY: f64 = 1e-9;

/// HARQ timing and retry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarqConfig {
    /// Maximum retransmissions per block
    pub max_retransmissions: u32,
    /// ACK/NACK period in seconds
    pub ack_period: f64,
    /// Half-width of the uniform ACK/NACK period jitter
    pub ack_period_var: f64,
    /// ACK/NACK processing delay in seconds
    pub proc_delay: f64,
    /// Half-width of the uniform processing delay jitter
    pub proc_delay_var: f64,
}

impl Default for HarqConfig {
    fn default() -> Self {
        Self {
            max_retransmissions: 4,
            ack_period: 0.004,
            ack_period_var: 0.0,
            proc_delay: 0.001,
            proc_delay_var: 0.0,
        }
    }
}

/// Outcome of handing a failed block back to the engine
#[derive(Debug)]
pub enum Requeue {
    /// Block scheduled for another attempt
    Scheduled,
    /// Retransmissions exhausted; the block is returned for dropping
    Exhausted(TransportBlock),
}

/// Per-link HARQ state machine
pub struct HarqEngine {
    config: HarqConfig,
    profile: LinkProfile,
    model: Arc<HarqErrorModel>,
    rng: RngManager,
    jitter_ack: bool,
    jitter_proc: bool,
    /// Ordered by due time, earliest first
    queue: VecDeque<TransportBlock>,
    retransmitted_bits: u64,
    now: f64,
}

impl HarqEngine {
    pub fn new(
        config: HarqConfig,
        profile: LinkProfile,
        model: Arc<HarqErrorModel>,
        rng: RngManager,
    ) -> Self {
        let jitter_ack = config.ack_period_var != 0.0;
        let jitter_proc = config.proc_delay_var != 0.0;
        Self {
            config,
            profile,
            model,
            rng,
            jitter_ack,
            jitter_proc,
            queue: VecDeque::new(),
            retransmitted_bits: 0,
            now: 0.0,
        }
    }

    pub fn step(&mut self, now: f64) {
        self.now = now;
    }

    /// Draw whether attempt `attempt` (0 = first) of a block fails
    pub fn attempt_fails(&mut self, mcs: u8, sinr_db: f64, attempt: u32) -> bool {
        let p = self
            .model
            .failure_probability(&self.profile, mcs, sinr_db, attempt);
        self.rng.next_f64() < p
    }

    /// Schedule the first retransmission of a block whose first attempt failed
    ///
    /// With retransmissions disabled the block is handed straight back.
    pub fn enqueue_first(&mut self, block: TransportBlock) -> Requeue {
        if self.config.max_retransmissions == 0 {
            return Requeue::Exhausted(block);
        }
        let distance_m = block.distance_m();
        self.schedule(block, distance_m);
        Requeue::Scheduled
    }

    /// Record a failed retransmission and schedule the next one
    ///
    /// The block's counter counts retransmissions performed; once it
    /// reaches the configured maximum the block is handed back for dropping.
    pub fn requeue(&mut self, mut block: TransportBlock, distance_m: f64) -> Requeue {
        block.bump_retransmissions();
        if block.retransmissions() >= self.config.max_retransmissions {
            return Requeue::Exhausted(block);
        }
        self.schedule(block, distance_m);
        Requeue::Scheduled
    }

    fn schedule(&mut self, mut block: TransportBlock, distance_m: f64) {
        self.retransmitted_bits += block.bits();
        block.set_distance(distance_m);
        let due = self.now + self.ack_delay(distance_m);
        block.set_due_at(due);
        self.insert(block);
    }

    fn insert(&mut self, block: TransportBlock) {
        let at = self
            .queue
            .partition_point(|queued| queued.due_at() <= block.due_at());
        self.queue.insert(at, block);
    }

    fn ack_delay(&mut self, distance_m: f64) -> f64 {
        let mut delay = 2.0 * distance_m / SPEED_OF_LIGHT;
        delay += self.config.ack_period;
        if self.jitter_ack {
            delay += self.config.ack_period_var * self.rng.symmetric();
        }
        delay += self.config.proc_delay;
        if self.jitter_proc {
            delay += self.config.proc_delay_var * self.rng.symmetric();
        }
        delay.max(MIN_ACK_DELAY)
    }

    /// True when the earliest-due block's ACK/NACK time has passed
    pub fn is_ready(&self) -> bool {
        self.queue
            .front()
            .is_some_and(|block| block.due_at() <= self.now)
    }

    /// Remove the ready block, if any
    pub fn take_ready(&mut self) -> Option<TransportBlock> {
        if self.is_ready() {
            self.queue.pop_front()
        } else {
            None
        }
    }

    /// Creation time of the earliest-due block, or the current time when empty
    pub fn oldest_timestamp(&self) -> f64 {
        self.queue
            .front()
            .map(|b| b.created_at())
            .unwrap_or(self.now)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Megabits sent again because of failed attempts
    pub fn retransmitted_mbit(&self) -> f64 {
        self.retransmitted_bits as f64 * 1e-6
    }

    pub fn config(&self) -> &HarqConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BackhaulDelay;

    fn engine(config: HarqConfig) -> HarqEngine {
        HarqEngine::new(
            config,
            LinkProfile::default(),
            Arc::new(HarqErrorModel::default()),
            RngManager::new(7),
        )
    }

    fn block(bits: u64) -> TransportBlock {
        let mut b = TransportBlock::new(0, 0.0, 10, 0.0, BackhaulDelay::default());
        b.push_unit(crate::models::DataUnit::new(0, None, bits, 0.0, BackhaulDelay::default()));
        b
    }

    #[test]
    fn test_deterministic_delay() {
        let mut h = engine(HarqConfig::default());
        h.step(1.0);
        assert!(matches!(h.enqueue_first(block(100)), Requeue::Scheduled));
        assert!(!h.is_ready());
        h.step(1.004);
        assert!(!h.is_ready());
        h.step(1.0051);
        assert!(h.is_ready());
    }

    #[test]
    fn test_jittered_delay_within_bounds() {
        let config = HarqConfig {
            ack_period_var: 0.001,
            proc_delay_var: 0.0005,
            ..HarqConfig::default()
        };
        let mut h = engine(config);
        for _ in 0..200 {
            let d = h.ack_delay(0.0);
            assert!(d >= 0.005 - 0.0015 - 1e-12 && d <= 0.005 + 0.0015 + 1e-12);
        }
    }

    #[test]
    fn test_counter_never_exceeds_maximum() {
        let config = HarqConfig {
            max_retransmissions: 2,
            ..HarqConfig::default()
        };
        let mut h = engine(config);
        assert!(matches!(h.enqueue_first(block(100)), Requeue::Scheduled));
        h.step(1.0);
        let b = h.take_ready().unwrap();
        assert!(matches!(h.requeue(b, 0.0), Requeue::Scheduled));
        h.step(2.0);
        let b = h.take_ready().unwrap();
        match h.requeue(b, 0.0) {
            Requeue::Exhausted(b) => assert_eq!(b.retransmissions(), 2),
            Requeue::Scheduled => panic!("expected exhaustion"),
        }
        assert!(h.is_empty());
    }

    #[test]
    fn test_disabled_retransmissions_drop_immediately() {
        let config = HarqConfig {
            max_retransmissions: 0,
            ..HarqConfig::default()
        };
        let mut h = engine(config);
        assert!(matches!(h.enqueue_first(block(100)), Requeue::Exhausted(_)));
    }

    #[test]
    fn test_flat_model_certain_failure() {
        let mut h = HarqEngine::new(
            HarqConfig::default(),
            LinkProfile::default(),
            Arc::new(HarqErrorModel::Flat(1.0)),
            RngManager::new(1),
        );
        assert!((0..50).all(|_| h.attempt_fails(0, 0.0, 0)));
    }
}
