//! The engines behind a reliability layer: acknowledgement and resend bookkeeping, congestion
//! control, splitting and reassembly, and arranging messages per channel.

pub use self::acknowledgment::{AcknowledgmentHandler, SentPacket};
pub use self::congestion::{CongestionWindow, RttEstimator};
pub use self::fragmenter::{next_split_packet_id, split_packet, Reassembly, SplitPacketAssembler};

pub mod arranging;

mod acknowledgment;
mod congestion;
mod fragmenter;
