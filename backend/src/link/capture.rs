//! Live-packet capture bridge
//!
//! The capture collaborator submits intercepted packets through a
//! [`CaptureHandle`] and learns each packet's fate from the verdict
//! stream. The link side owns the matching [`CaptureEndpoint`].
//!
//! ```text
//! collaborator ──submit(packet)──▶ endpoint ──▶ packet buffer
//! collaborator ◀──── Verdict ───── endpoint ◀── release buffer
//! ```

use crate::link::release::Verdict;
use crossbeam_channel::{unbounded, Receiver, Sender, TryIter};
use thiserror::Error;

/// One intercepted packet
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapturedPacket {
    /// Arrival timestamp in emulator seconds
    pub arrival_s: f64,
    /// Packet length in bytes
    pub bytes: u32,
    /// Monotonically increasing packet identifier
    pub packet_id: u32,
    /// Identifier of the previous packet on this link
    pub prev_id: Option<u32>,
}

#[derive(Debug, Error, PartialEq)]
pub enum CaptureError {
    #[error("capture endpoint has been dropped")]
    Disconnected,

    #[error("link releases whole blocks and cannot report per-packet verdicts")]
    BlockRelease,
}

/// Collaborator side of the bridge
#[derive(Debug, Clone)]
pub struct CaptureHandle {
    packets: Sender<CapturedPacket>,
    verdicts: Receiver<Verdict>,
}

impl CaptureHandle {
    /// Hand an intercepted packet to the emulator
    pub fn submit(
        &self,
        arrival_s: f64,
        bytes: u32,
        packet_id: u32,
        prev_id: Option<u32>,
    ) -> Result<(), CaptureError> {
        self.packets
            .send(CapturedPacket {
                arrival_s,
                bytes,
                packet_id,
                prev_id,
            })
            .map_err(|_| CaptureError::Disconnected)
    }

    /// Blocking receiver of release/drop verdicts
    pub fn verdicts(&self) -> &Receiver<Verdict> {
        &self.verdicts
    }

    /// Verdicts available right now
    pub fn pending_verdicts(&self) -> Vec<Verdict> {
        self.verdicts.try_iter().collect()
    }
}

/// Link side of the bridge
#[derive(Debug)]
pub struct CaptureEndpoint {
    packets: Receiver<CapturedPacket>,
    verdicts: Sender<Verdict>,
}

impl CaptureEndpoint {
    /// Packets submitted since the last call
    pub fn incoming(&self) -> TryIter<'_, CapturedPacket> {
        self.packets.try_iter()
    }

    /// Report a verdict; ignored once the collaborator is gone
    pub fn report(&self, verdict: Verdict) {
        if self.verdicts.send(verdict).is_err() {
            log::debug!("capture collaborator gone, dropping {:?}", verdict);
        }
    }
}

/// Create a connected handle/endpoint pair
pub fn capture_channel() -> (CaptureHandle, CaptureEndpoint) {
    let (packet_tx, packet_rx) = unbounded();
    let (verdict_tx, verdict_rx) = unbounded();
    (
        CaptureHandle {
            packets: packet_tx,
            verdicts: verdict_rx,
        },
        CaptureEndpoint {
            packets: packet_rx,
            verdicts: verdict_tx,
        },
    )
}
