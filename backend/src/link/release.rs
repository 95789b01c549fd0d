//! Release/drop buffer
//!
//! Receives transport blocks that left the radio link, applies the backhaul
//! delay, and releases data downstream once it is due.
//!
//! Two modes exist:
//!
//! - **Blocks**: whole blocks leave when their delayed due time passes.
//!   Used for synthetic traffic where no one tracks individual packets.
//! - **Reassembly**: fragments are summed back into their data units by
//!   identifier. Units leave in ascending identifier order; with strict
//!   ordering a unit that names a predecessor also waits for it once the
//!   stream has started. The first unit released starts the stream; units
//!   completing later with a lower identifier are rejected as stale.
//!   Dropped units are rejected in sequence. The scan stops at the first
//!   unit that cannot leave, so a stalled unit holds back all later ones.

use crate::link::stats::{bits_per_tti_to_mbps, StatsWindow, WindowedMean};
use crate::models::{DataUnit, TransportBlock, READY_TOLERANCE_BITS};
use crate::rng::RngManager;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Bound;

/// Release behaviour selected in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReleaseMode {
    Blocks,
    Reassembly { strict_order: bool },
}

impl Default for ReleaseMode {
    fn default() -> Self {
        ReleaseMode::Reassembly { strict_order: true }
    }
}

/// Downstream signal for one data unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// Unit delivered
    Accept(u32),
    /// Unit lost
    Reject(u32),
}

/// Result of one `release` call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReleaseSummary {
    /// Original bits of every released unit (or block bits in block mode)
    pub bits: u64,
    pub verdicts: Vec<Verdict>,
}

enum Store {
    Blocks {
        /// `(release time, block)`
        pending: Vec<(f64, TransportBlock)>,
    },
    Reassembly {
        entries: BTreeMap<u32, DataUnit>,
        strict_order: bool,
        last_released: Option<u32>,
    },
}

/// Per-link release buffer
///
/// # Example
/// ```
/// use ran_emulator_core::link::{ReleaseBuffer, ReleaseMode, Verdict};
/// use ran_emulator_core::models::{BackhaulDelay, DataUnit, TransportBlock};
/// use ran_emulator_core::RngManager;
///
/// let mut release = ReleaseBuffer::new(
///     ReleaseMode::Reassembly { strict_order: true },
///     RngManager::new(1),
/// );
/// let mut block = TransportBlock::new(0, 0.0, 10, 0.0, BackhaulDelay::default());
/// block.push_unit(DataUnit::new(0, None, 800, 0.0, BackhaulDelay::default()));
/// release.push(block);
///
/// release.step(0.001);
/// let summary = release.release();
/// assert_eq!(summary.bits, 800);
/// assert_eq!(summary.verdicts, vec![Verdict::Accept(0)]);
/// ```
pub struct ReleaseBuffer {
    store: Store,
    rng: RngManager,
    now: f64,
    throughput: WindowedMean,
    latency: WindowedMean,
    ingress_latency: WindowedMean,
}

impl ReleaseBuffer {
    pub fn new(mode: ReleaseMode, rng: RngManager) -> Self {
        let store = match mode {
            ReleaseMode::Blocks => Store::Blocks {
                pending: Vec::new(),
            },
            ReleaseMode::Reassembly { strict_order } => Store::Reassembly {
                entries: BTreeMap::new(),
                strict_order,
                last_released: None,
            },
        };
        Self {
            store,
            rng,
            now: 0.0,
            throughput: WindowedMean::new(),
            latency: WindowedMean::new(),
            ingress_latency: WindowedMean::new(),
        }
    }

    pub fn mode(&self) -> ReleaseMode {
        match &self.store {
            Store::Blocks { .. } => ReleaseMode::Blocks,
            Store::Reassembly { strict_order, .. } => ReleaseMode::Reassembly {
                strict_order: *strict_order,
            },
        }
    }

    /// Close the throughput sample of the previous TTI and move to `now`
    pub fn step(&mut self, now: f64) {
        self.throughput.step();
        self.now = now;
    }

    fn delayed_due(&mut self, block: &TransportBlock) -> f64 {
        let backhaul = block.backhaul();
        block.due_at() + backhaul.mean + self.rng.symmetric() * backhaul.variance
    }

    /// Accept a successfully transmitted block
    pub fn push(&mut self, block: TransportBlock) {
        let release_at = self.delayed_due(&block);
        match &mut self.store {
            Store::Blocks { pending } => pending.push((release_at, block)),
            Store::Reassembly { entries, .. } => {
                for mut unit in block.into_units() {
                    if let Some(entry) = entries.get_mut(&unit.id()) {
                        entry.absorb(unit.size());
                        if release_at > entry.release_at() {
                            entry.set_release_at(release_at);
                        }
                        if unit.ingress_at() < entry.ingress_at() {
                            entry.set_ingress_at(unit.ingress_at());
                        }
                    } else if !unit.is_fragment() || unit.size() > READY_TOLERANCE_BITS {
                        unit.set_release_at(release_at);
                        entries.insert(unit.id(), unit);
                    }
                }
            }
        }
    }

    /// Accept a block that exhausted its retransmissions
    ///
    /// In reassembly mode every carried unit is marked erased so that it is
    /// rejected downstream once all its fragments are accounted for.
    pub fn drop_block(&mut self, block: TransportBlock) {
        for unit in block.into_units() {
            self.drop_unit(unit);
        }
    }

    /// Mark one unit (or fragment) as lost
    ///
    /// Block mode only accounts drops upstream and ignores the unit. A
    /// fragment of at most [`READY_TOLERANCE_BITS`] without an entry is
    /// ignored, as in [`push`](Self::push): its unit has already left.
    pub fn drop_unit(&mut self, mut unit: DataUnit) {
        if let Store::Reassembly { entries, .. } = &mut self.store {
            if let Some(entry) = entries.get_mut(&unit.id()) {
                entry.mark_erased();
                entry.absorb(unit.size());
            } else if !unit.is_fragment() || unit.size() > READY_TOLERANCE_BITS {
                unit.mark_erased();
                entries.insert(unit.id(), unit);
            }
        }
    }

    /// Release everything that is due at the current time
    pub fn release(&mut self) -> ReleaseSummary {
        let now = self.now;
        let mut summary = ReleaseSummary::default();
        let mut latency = 0.0;
        let mut ingress_latency = 0.0;
        let mut count = 0u64;

        match &mut self.store {
            Store::Blocks { pending } => {
                pending.retain(|(release_at, block)| {
                    if *release_at <= now {
                        summary.bits += block.bits();
                        latency += now - block.created_at();
                        ingress_latency += now - block.oldest_ingress();
                        count += 1;
                        false
                    } else {
                        true
                    }
                });
            }
            Store::Reassembly {
                entries,
                strict_order,
                last_released,
            } => {
                while let Some((id, action)) =
                    next_action(entries, *strict_order, *last_released, now)
                {
                    let Some(unit) = entries.remove(&id) else {
                        break;
                    };
                    match action {
                        Action::Stale => {
                            log::debug!("unit {} completed behind the release cursor, rejecting", id);
                            summary.verdicts.push(Verdict::Reject(id));
                        }
                        Action::Reject => {
                            *last_released = Some(id);
                            summary.verdicts.push(Verdict::Reject(id));
                        }
                        Action::Accept => {
                            summary.bits += unit.original_size();
                            latency += now - unit.created_at();
                            ingress_latency += now - unit.ingress_at();
                            count += 1;
                            *last_released = Some(id);
                            summary.verdicts.push(Verdict::Accept(id));
                        }
                    }
                }
            }
        }

        self.throughput.add(summary.bits as f64);
        if count > 0 {
            self.latency.add(latency / count as f64);
            self.ingress_latency.add(ingress_latency / count as f64);
            self.latency.step();
            self.ingress_latency.step();
        }
        summary
    }

    /// Blocks (block mode) or units (reassembly mode) still held
    pub fn len(&self) -> usize {
        match &self.store {
            Store::Blocks { pending } => pending.len(),
            Store::Reassembly { entries, .. } => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Identifier of the last unit released or rejected (reassembly mode)
    pub fn last_released(&self) -> Option<u32> {
        match &self.store {
            Store::Blocks { .. } => None,
            Store::Reassembly { last_released, .. } => *last_released,
        }
    }

    /// Lifetime mean of released bits per TTI
    pub fn average_bits_per_tti(&self) -> f64 {
        self.throughput.total()
    }

    /// Released traffic in Mbit/s
    pub fn throughput_mbps(&mut self, window: StatsWindow) -> f64 {
        bits_per_tti_to_mbps(self.throughput.read(window))
    }

    /// Mean time from block creation to release, in seconds
    pub fn latency(&mut self, window: StatsWindow) -> f64 {
        self.latency.read(window)
    }

    /// Mean time from ingress to release, in seconds
    pub fn ingress_latency(&mut self, window: StatsWindow) -> f64 {
        self.ingress_latency.read(window)
    }
}

/// What the release scan does with the lowest entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Accept,
    Reject,
    /// Completed after the stream moved past it
    Stale,
}

/// Decide the fate of the lowest entry, or `None` to stop the scan
fn next_action(
    entries: &BTreeMap<u32, DataUnit>,
    strict_order: bool,
    last_released: Option<u32>,
    now: f64,
) -> Option<(u32, Action)> {
    let (&id, unit) = entries.first_key_value()?;
    if !unit.is_ready() {
        return None;
    }
    if strict_order {
        match last_released {
            Some(last) if id <= last => return Some((id, Action::Stale)),
            Some(last) if unit.prev_id().is_some_and(|prev| prev != last) => return None,
            // A lost unit opens the stream only once later data is waiting
            None if unit.is_erased() && unit.prev_id().is_some() => {
                let later_ready = entries
                    .range((Bound::Excluded(id), Bound::Unbounded))
                    .any(|(_, u)| u.is_ready() && !u.is_erased());
                if !later_ready {
                    return None;
                }
            }
            _ => {}
        }
    }
    if unit.is_erased() {
        return Some((id, Action::Reject));
    }
    if unit.release_at() > now {
        return None;
    }
    Some((id, Action::Accept))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BackhaulDelay;

    fn block_of(units: Vec<DataUnit>) -> TransportBlock {
        let mut block = TransportBlock::new(0, 0.0, 0, 0.0, BackhaulDelay::default());
        for unit in units {
            block.push_unit(unit);
        }
        block
    }

    #[test]
    fn test_tiny_fragment_without_entry_is_ignored() {
        let mut release =
            ReleaseBuffer::new(ReleaseMode::Reassembly { strict_order: false }, RngManager::new(1));
        let mut unit = DataUnit::new(4, None, 1_000, 0.0, BackhaulDelay::default());
        let tiny = unit.split_off(8);
        release.push(block_of(vec![tiny]));
        assert!(release.is_empty());
    }

    #[test]
    fn test_small_complete_unit_is_tracked() {
        let mut release =
            ReleaseBuffer::new(ReleaseMode::Reassembly { strict_order: true }, RngManager::new(1));
        release.push(block_of(vec![DataUnit::new(0, None, 6, 0.0, BackhaulDelay::default())]));
        assert_eq!(release.len(), 1);
    }

    #[test]
    fn test_erased_unit_waits_for_predecessor() {
        let mut release =
            ReleaseBuffer::new(ReleaseMode::Reassembly { strict_order: true }, RngManager::new(1));
        release.drop_block(block_of(vec![DataUnit::new(1, Some(0), 100, 0.0, BackhaulDelay::default())]));
        release.step(0.001);
        assert!(release.release().verdicts.is_empty());

        release.push(block_of(vec![DataUnit::new(0, None, 100, 0.0, BackhaulDelay::default())]));
        assert_eq!(
            release.release().verdicts,
            vec![Verdict::Accept(0), Verdict::Reject(1)]
        );
    }

    #[test]
    fn test_first_unit_starts_the_stream() {
        let mut release =
            ReleaseBuffer::new(ReleaseMode::Reassembly { strict_order: true }, RngManager::new(1));
        release.push(block_of(vec![DataUnit::new(4, Some(3), 100, 0.0, BackhaulDelay::default())]));
        release.step(0.001);
        assert_eq!(release.release().verdicts, vec![Verdict::Accept(4)]);
        assert_eq!(release.last_released(), Some(4));
    }

    #[test]
    fn test_lost_unit_opens_stream_once_data_waits() {
        let mut release =
            ReleaseBuffer::new(ReleaseMode::Reassembly { strict_order: true }, RngManager::new(1));
        release.drop_block(block_of(vec![DataUnit::new(101, Some(100), 100, 0.0, BackhaulDelay::default())]));
        release.step(0.001);
        assert!(release.release().verdicts.is_empty());

        release.push(block_of(vec![DataUnit::new(102, Some(101), 100, 0.0, BackhaulDelay::default())]));
        assert_eq!(
            release.release().verdicts,
            vec![Verdict::Reject(101), Verdict::Accept(102)]
        );
    }

    #[test]
    fn test_tiny_dropped_tail_of_released_unit_is_ignored() {
        let mut release =
            ReleaseBuffer::new(ReleaseMode::Reassembly { strict_order: false }, RngManager::new(1));
        let mut unit = DataUnit::new(0, None, 1_000, 0.0, BackhaulDelay::default());
        let head = unit.split_off(995);
        release.push(block_of(vec![head]));
        release.step(0.001);
        assert_eq!(release.release().verdicts, vec![Verdict::Accept(0)]);

        release.drop_block(block_of(vec![unit]));
        assert!(release.is_empty());
    }

    #[test]
    fn test_block_mode_waits_for_backhaul() {
        let mut release = ReleaseBuffer::new(ReleaseMode::Blocks, RngManager::new(1));
        let backhaul = BackhaulDelay {
            mean: 0.005,
            variance: 0.0,
        };
        let mut block = TransportBlock::new(0, 0.0, 0, 0.0, backhaul);
        block.push_unit(DataUnit::new(0, None, 400, 0.0, backhaul));
        release.push(block);

        release.step(0.004);
        assert_eq!(release.release().bits, 0);
        release.step(0.005);
        let summary = release.release();
        assert_eq!(summary.bits, 400);
        assert!(summary.verdicts.is_empty());
        assert!(release.is_empty());
    }
}
