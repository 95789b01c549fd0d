//! Ingress packet buffer
//!
//! Holds the data units waiting for a grant. Admission is all-or-nothing
//! against a fixed capacity; rejected bits are accounted as loss. Grants
//! drain the queue oldest-first, splitting the head unit when it does not
//! fit entirely.

use crate::link::stats::{bits_per_tti_to_mbps, StatsWindow, WindowedMean};
use crate::models::{BackhaulDelay, DataUnit, TransportBlock};
use std::collections::VecDeque;
use thiserror::Error;

/// Default buffer capacity: 20 maximum-size IP packets (65 500 bytes)
pub const DEFAULT_CAPACITY_BITS: u64 = 65_500 * 8 * 20;

/// Admission failures
#[derive(Debug, Error, PartialEq)]
pub enum BufferError {
    #[error("admitting {requested} bits would exceed capacity ({buffered}/{capacity} bits buffered)")]
    Overflow {
        requested: u64,
        buffered: u64,
        capacity: u64,
    },

    #[error("packet size must be positive")]
    InvalidPacketSize,
}

/// Fragmentable FIFO of data units
///
/// # Example
/// ```
/// use ran_emulator_core::link::PacketBuffer;
/// use ran_emulator_core::models::{BackhaulDelay, TransportBlock};
///
/// let mut buffer = PacketBuffer::default();
/// buffer.generate(1_200, 500, 0.0, BackhaulDelay::default()).unwrap();
/// assert_eq!(buffer.len(), 3); // 500 + 500 + 200
///
/// let mut block = TransportBlock::new(0, 0.0, 10, 100.0, BackhaulDelay::default());
/// assert_eq!(buffer.drain(700, &mut block), 700);
/// assert_eq!(block.units().len(), 2);
/// assert!(block.units()[1].is_fragment());
/// assert_eq!(buffer.buffered_bits(), 500);
/// ```
#[derive(Debug, Clone)]
pub struct PacketBuffer {
    units: VecDeque<DataUnit>,
    capacity_bits: u64,
    buffered_bits: u64,
    next_id: u32,
    now: f64,
    generated: WindowedMean,
    errors: WindowedMean,
}

impl PacketBuffer {
    pub fn new(capacity_bits: u64) -> Self {
        Self {
            units: VecDeque::new(),
            capacity_bits,
            buffered_bits: 0,
            next_id: 0,
            now: 0.0,
            generated: WindowedMean::new(),
            errors: WindowedMean::new(),
        }
    }

    /// Close the accumulators for the previous TTI and move to `now`
    pub fn step(&mut self, now: f64) {
        self.generated.step();
        self.errors.step();
        self.now = now;
    }

    /// Admit `bits` as units of `pkt_size` bits (last one holds the remainder)
    ///
    /// Identifiers increase monotonically and each unit names the previous
    /// one as its predecessor. Returns the number of units created.
    ///
    /// # Errors
    ///
    /// [`BufferError::Overflow`] if the bits do not fit; nothing is admitted
    /// and the bits are counted as loss.
    pub fn generate(
        &mut self,
        bits: u64,
        pkt_size: u64,
        now: f64,
        backhaul: BackhaulDelay,
    ) -> Result<usize, BufferError> {
        if pkt_size == 0 {
            return Err(BufferError::InvalidPacketSize);
        }
        if bits == 0 {
            return Ok(0);
        }
        self.check_capacity(bits)?;

        let count = bits.div_ceil(pkt_size) as usize;
        let mut left = bits;
        for _ in 0..count {
            let size = left.min(pkt_size);
            left -= size;
            let prev_id = self.next_id.checked_sub(1);
            self.units
                .push_back(DataUnit::new(self.next_id, prev_id, size, now, backhaul));
            self.next_id = self.next_id.wrapping_add(1);
        }

        self.buffered_bits += bits;
        self.generated.add(bits as f64);
        Ok(count)
    }

    /// Admit one externally created unit (captured packet)
    pub fn admit(&mut self, unit: DataUnit) -> Result<(), BufferError> {
        self.check_capacity(unit.size())?;
        self.buffered_bits += unit.size();
        self.generated.add(unit.size() as f64);
        self.units.push_back(unit);
        Ok(())
    }

    fn check_capacity(&mut self, bits: u64) -> Result<(), BufferError> {
        if self.buffered_bits + bits > self.capacity_bits {
            self.errors.add(bits as f64);
            return Err(BufferError::Overflow {
                requested: bits,
                buffered: self.buffered_bits,
                capacity: self.capacity_bits,
            });
        }
        Ok(())
    }

    /// Move up to `bits` bits into `block`, oldest first
    ///
    /// A head unit that fits entirely moves whole. Otherwise a fragment of
    /// exactly the remaining bits moves and the rest stays at the head.
    /// Returns the bits moved, which is less than `bits` only when the
    /// buffer runs dry.
    pub fn drain(&mut self, bits: u64, block: &mut TransportBlock) -> u64 {
        let mut remaining = bits;
        while remaining > 0 {
            let Some(head) = self.units.front_mut() else {
                break;
            };
            if remaining >= head.size() {
                remaining -= head.size();
                if let Some(unit) = self.units.pop_front() {
                    block.push_unit(unit);
                }
            } else {
                block.push_unit(head.split_off(remaining));
                remaining = 0;
            }
        }
        let moved = bits - remaining;
        self.buffered_bits -= moved;
        moved
    }

    /// Account bits lost after leaving the buffer (HARQ exhaustion)
    pub fn record_loss(&mut self, bits: u64) {
        self.errors.add(bits as f64);
    }

    /// Creation time of the oldest waiting unit, or the current time when empty
    pub fn oldest_timestamp(&self) -> f64 {
        self.units
            .front()
            .map(|u| u.created_at())
            .unwrap_or(self.now)
    }

    pub fn has_data(&self) -> bool {
        !self.units.is_empty()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn buffered_bits(&self) -> u64 {
        self.buffered_bits
    }

    pub fn capacity_bits(&self) -> u64 {
        self.capacity_bits
    }

    /// Admitted traffic in Mbit/s
    pub fn generated_mbps(&mut self, window: StatsWindow) -> f64 {
        bits_per_tti_to_mbps(self.generated.read(window))
    }

    /// Lost traffic (rejected or dropped) in Mbit/s
    pub fn error_mbps(&mut self, window: StatsWindow) -> f64 {
        bits_per_tti_to_mbps(self.errors.read(window))
    }
}

impl Default for PacketBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY_BITS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predecessor_chain() {
        let mut buffer = PacketBuffer::default();
        buffer
            .generate(1_500, 500, 0.0, BackhaulDelay::default())
            .unwrap();
        let mut block = TransportBlock::new(0, 0.0, 0, 0.0, BackhaulDelay::default());
        buffer.drain(1_500, &mut block);
        let prev: Vec<Option<u32>> = block.units().iter().map(|u| u.prev_id()).collect();
        assert_eq!(prev, vec![None, Some(0), Some(1)]);
    }

    #[test]
    fn test_zero_packet_size_rejected() {
        let mut buffer = PacketBuffer::default();
        assert_eq!(
            buffer.generate(100, 0, 0.0, BackhaulDelay::default()),
            Err(BufferError::InvalidPacketSize)
        );
    }

    #[test]
    fn test_exact_fit_moves_whole_unit() {
        let mut buffer = PacketBuffer::default();
        buffer
            .generate(500, 500, 0.0, BackhaulDelay::default())
            .unwrap();
        let mut block = TransportBlock::new(0, 0.0, 0, 0.0, BackhaulDelay::default());
        assert_eq!(buffer.drain(500, &mut block), 500);
        assert!(!block.units()[0].is_fragment());
        assert!(buffer.is_empty());
    }
}
