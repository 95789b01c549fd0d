//! Link layer: the packet lifecycle behind every grant
//!
//! Data enters a [`PacketBuffer`], leaves in [`TransportBlock`]s sized by
//! scheduler grants, may bounce through the [`HarqEngine`] for
//! retransmission, and is finally released or dropped by the
//! [`ReleaseBuffer`]. [`LinkPipeline`] wires the three together for one
//! user and direction.
//!
//! [`TransportBlock`]: crate::models::TransportBlock

pub mod bler;
pub mod capture;
pub mod harq;
pub mod packet_buffer;
pub mod pipeline;
pub mod release;
pub mod stats;

pub use bler::{BlerTable, HarqErrorModel, LinkProfile, ModulationTable};
pub use capture::{capture_channel, CaptureEndpoint, CaptureError, CaptureHandle, CapturedPacket};
pub use harq::{HarqConfig, HarqEngine, Requeue};
pub use packet_buffer::{BufferError, PacketBuffer, DEFAULT_CAPACITY_BITS};
pub use pipeline::{LinkConfig, LinkContext, LinkPipeline, LinkStats};
pub use release::{ReleaseBuffer, ReleaseMode, ReleaseSummary, Verdict};
pub use stats::{bits_per_tti_to_mbps, StatsWindow, WindowedMean};
