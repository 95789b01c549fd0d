//! Link orchestrator
//!
//! One [`LinkPipeline`] per user per direction ties together the packet
//! buffer, the HARQ engine and the release buffer, and decides where a
//! grant's bits go:
//!
//! ```text
//! grant(bits)
//!   ├─ HARQ block ready?  yes → retry it: success → release
//!   │                                      failure → re-queue or drop
//!   └─ no → drain buffer into a new block: success → release
//!                                          failure → HARQ queue
//! ```
//!
//! Only one HARQ process is modeled: while a block is ready, no fresh
//! block is built.

use crate::link::bler::{HarqErrorModel, LinkProfile};
use crate::link::capture::{CaptureEndpoint, CaptureError, CapturedPacket};
use crate::link::harq::{HarqConfig, HarqEngine, Requeue};
use crate::link::packet_buffer::{BufferError, PacketBuffer, DEFAULT_CAPACITY_BITS};
use crate::link::release::{ReleaseBuffer, ReleaseMode};
use crate::link::stats::StatsWindow;
use crate::models::{BackhaulDelay, DataUnit, Direction, TransportBlock};
use crate::rng::{derive_seed, RngManager};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ============================================================================
// Configuration Types
// ============================================================================

/// Per-direction link configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub harq: HarqConfig,
    /// Backhaul delay applied before release
    pub backhaul: BackhaulDelay,
    pub release: ReleaseMode,
    /// Packet buffer capacity in bits
    pub capacity_bits: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            harq: HarqConfig::default(),
            backhaul: BackhaulDelay {
                mean: 0.005,
                variance: 0.001,
            },
            release: ReleaseMode::default(),
            capacity_bits: DEFAULT_CAPACITY_BITS,
        }
    }
}

/// Channel conditions attached to a grant
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LinkContext {
    pub mcs: u8,
    pub sinr_db: f64,
    pub distance_m: f64,
}

/// Snapshot of a link's accumulators
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LinkStats {
    /// Admitted traffic (Mbit/s)
    pub generated_mbps: f64,
    /// Rejected or dropped traffic (Mbit/s)
    pub error_mbps: f64,
    /// Released traffic (Mbit/s)
    pub throughput_mbps: f64,
    /// Block creation to release (s)
    pub latency_s: f64,
    /// Ingress to release (s)
    pub ingress_latency_s: f64,
    /// Total bits retransmitted so far (Mbit)
    pub retransmitted_mbit: f64,
}

// ============================================================================
// Link Pipeline
// ============================================================================

/// Packet buffer → HARQ → release buffer for one user and direction
pub struct LinkPipeline {
    direction: Direction,
    buffer: PacketBuffer,
    harq: HarqEngine,
    release: ReleaseBuffer,
    backhaul: BackhaulDelay,
    capture: Option<CaptureEndpoint>,
    next_block_id: u64,
    now: f64,
}

impl LinkPipeline {
    /// Build a pipeline whose randomness derives from `seed`
    pub fn new(
        direction: Direction,
        config: &LinkConfig,
        profile: LinkProfile,
        model: Arc<HarqErrorModel>,
        seed: u64,
    ) -> Self {
        Self {
            direction,
            buffer: PacketBuffer::new(config.capacity_bits),
            harq: HarqEngine::new(
                config.harq.clone(),
                profile,
                model,
                RngManager::new(derive_seed(seed, 0)),
            ),
            release: ReleaseBuffer::new(config.release, RngManager::new(derive_seed(seed, 1))),
            backhaul: config.backhaul,
            capture: None,
            next_block_id: 0,
            now: 0.0,
        }
    }

    /// Feed this link from a capture bridge
    ///
    /// Verdicts are per packet, so the link must release in reassembly mode.
    pub fn attach_capture(&mut self, endpoint: CaptureEndpoint) -> Result<(), CaptureError> {
        if self.release.mode() == ReleaseMode::Blocks {
            return Err(CaptureError::BlockRelease);
        }
        self.capture = Some(endpoint);
        Ok(())
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Advance every stage to `now`
    pub fn step(&mut self, now: f64) {
        self.now = now;
        self.buffer.step(now);
        self.harq.step(now);
        self.release.step(now);
    }

    /// Admit synthetic traffic
    pub fn generate(&mut self, bits: u64, pkt_size: u64) -> Result<usize, BufferError> {
        self.buffer.generate(bits, pkt_size, self.now, self.backhaul)
    }

    /// Move captured packets into the packet buffer
    ///
    /// Packets that do not fit go straight to the drop path and are
    /// rejected in sequence by the release buffer. Returns the number
    /// admitted.
    pub fn ingest_captured(&mut self) -> usize {
        let Some(capture) = self.capture.as_ref() else {
            return 0;
        };
        let mut admitted = 0;
        let packets: Vec<CapturedPacket> = capture.incoming().collect();
        for packet in packets {
            let unit = DataUnit::new(
                packet.packet_id,
                packet.prev_id,
                u64::from(packet.bytes) * 8,
                packet.arrival_s,
                self.backhaul,
            );
            match self.buffer.admit(unit.clone()) {
                Ok(()) => admitted += 1,
                Err(err) => {
                    log::debug!("{} capture packet {} rejected: {}", self.direction, packet.packet_id, err);
                    self.release.drop_unit(unit);
                }
            }
        }
        admitted
    }

    /// Spend a grant of `bits` bits; returns the bits delivered this TTI
    pub fn handle_grant(&mut self, bits: u64, ctx: LinkContext) -> u64 {
        if let Some(block) = self.harq.take_ready() {
            let attempt = block.retransmissions() + 1;
            if self.harq.attempt_fails(block.mcs(), ctx.sinr_db, attempt) {
                let outcome = self.harq.requeue(block, ctx.distance_m);
                self.drop_if_exhausted(outcome);
                return 0;
            }
            let delivered = block.bits();
            self.release.push(block);
            return delivered;
        }

        if bits == 0 || !self.buffer.has_data() {
            return 0;
        }
        let mut block = TransportBlock::new(
            self.next_block_id,
            self.now,
            ctx.mcs,
            ctx.distance_m,
            self.backhaul,
        );
        self.next_block_id += 1;
        let drained = self.buffer.drain(bits, &mut block);

        if self.harq.attempt_fails(ctx.mcs, ctx.sinr_db, 0) {
            let outcome = self.harq.enqueue_first(block);
            self.drop_if_exhausted(outcome);
            0
        } else {
            self.release.push(block);
            drained
        }
    }

    fn drop_if_exhausted(&mut self, outcome: Requeue) {
        if let Requeue::Exhausted(block) = outcome {
            log::debug!(
                "{} block {} dropped after {} retransmissions",
                self.direction,
                block.id(),
                block.retransmissions()
            );
            self.buffer.record_loss(block.bits());
            self.release.drop_block(block);
        }
    }

    /// Release due data downstream; returns the bits released
    pub fn release(&mut self) -> u64 {
        let summary = self.release.release();
        if let Some(capture) = self.capture.as_ref() {
            for verdict in &summary.verdicts {
                capture.report(*verdict);
            }
        }
        summary.bits
    }

    /// Fresh data buffered or a retransmission due
    pub fn has_data(&self) -> bool {
        self.buffer.has_data() || self.harq.is_ready()
    }

    /// Timestamp of the oldest data waiting for a grant
    pub fn oldest_timestamp(&self) -> f64 {
        if self.harq.is_ready() {
            self.harq.oldest_timestamp()
        } else if self.buffer.has_data() {
            self.buffer.oldest_timestamp()
        } else {
            self.now
        }
    }

    /// Lifetime mean of released bits per TTI
    pub fn average_throughput(&self) -> f64 {
        self.release.average_bits_per_tti()
    }

    pub fn buffered_bits(&self) -> u64 {
        self.buffer.buffered_bits()
    }

    /// Blocks waiting in the HARQ queue
    pub fn harq_backlog(&self) -> usize {
        self.harq.len()
    }

    /// Units or blocks waiting for release
    pub fn release_backlog(&self) -> usize {
        self.release.len()
    }

    pub fn stats(&mut self, window: StatsWindow) -> LinkStats {
        LinkStats {
            generated_mbps: self.buffer.generated_mbps(window),
            error_mbps: self.buffer.error_mbps(window),
            throughput_mbps: self.release.throughput_mbps(window),
            latency_s: self.release.latency(window),
            ingress_latency_s: self.release.ingress_latency(window),
            retransmitted_mbit: self.harq.retransmitted_mbit(),
        }
    }
}
