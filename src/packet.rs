//! This module provides all the logic around the packet, such as reading, parsing, and constructing records.

pub use self::enums::{Priority, Reliability, PRIORITY_COUNT};
pub use self::frame_writer::FrameWriter;
pub use self::internal_packet::{InternalPacket, Record};
pub use self::packet_reader::PacketReader;
pub use self::packet_structure::{Message, Packet};

pub mod header;

mod enums;
mod frame_writer;
mod internal_packet;
mod packet_reader;
mod packet_structure;

/// An ordering channel, below `ORDERING_CHANNEL_COUNT`.
pub type ChannelNumber = u8;
/// The number every reliable record carries for acknowledgement and duplicate detection.
pub type SequenceNumber = u16;
/// The position of a message on its ordering channel.
pub type OrderingIndex = u16;
/// Identifies all fragments of one split message.
pub type SplitPacketId = u32;
/// The position of a fragment within its split message.
pub type SplitPacketIndex = u32;

/// Half of the sequence number space; a number at most this far ahead of another is newer.
pub const SEQUENCE_MID: SequenceNumber = ((SequenceNumber::MAX - 1) / 2) + 1;

/// Converts an enum to the value it is written as.
pub trait EnumConverter {
    type Enum;

    fn to_u8(&self) -> u8;
}
