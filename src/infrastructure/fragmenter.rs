use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use log::debug;

use crate::bitstream::{bits_to_bytes, BitWriter};
use crate::error::{DecodingErrorKind, ErrorKind, Result};
use crate::net::MomentInTime;
use crate::packet::header::{ArrangingHeader, FragmentHeader};
use crate::packet::{InternalPacket, Reliability, SplitPacketId, SplitPacketIndex};

// Shared by every connection of the process.
static SPLIT_PACKET_ID: AtomicU32 = AtomicU32::new(0);

/// Returns a fresh id for the fragments of one split message.
pub fn next_split_packet_id() -> SplitPacketId {
    SPLIT_PACKET_ID.fetch_add(1, Ordering::Relaxed)
}

/// Splits a message into fragments whose encoding fits into `frame_bits`.
///
/// All fragments but the last carry the same whole number of bytes. Every fragment gets the
/// reliability and arranging header of the message; sequence numbers are left to the caller.
pub fn split_packet(
    reliability: Reliability,
    payload: &[u8],
    bit_length: usize,
    arranging: Option<ArrangingHeader>,
    frame_bits: usize,
    max_split_count: u32,
) -> Result<Vec<InternalPacket>> {
    let bytes = bits_to_bytes(bit_length);
    let header_bits = InternalPacket::header_bit_length_for(reliability, true);
    let chunk_bytes = frame_bits.saturating_sub(header_bits) / 8;
    if chunk_bytes == 0 {
        return Err(ErrorKind::PayloadTooLarge {
            size: bytes,
            max: 0,
        });
    }

    let count = (bytes.max(1) - 1) / chunk_bytes + 1;
    if count > max_split_count as usize {
        return Err(ErrorKind::PayloadTooLarge {
            size: bytes,
            max: chunk_bytes * max_split_count as usize,
        });
    }

    let id = next_split_packet_id();
    let fragments = payload[..bytes]
        .chunks(chunk_bytes)
        .enumerate()
        .map(|(index, chunk)| {
            let fragment_bits = if index + 1 == count {
                bit_length - index * chunk_bytes * 8
            } else {
                chunk_bytes * 8
            };
            InternalPacket::new(reliability, chunk.into(), fragment_bits)
                .with_arranging(arranging)
                .with_fragment(Some(FragmentHeader::new(
                    id,
                    index as SplitPacketIndex,
                    count as SplitPacketIndex,
                )))
        })
        .collect();

    Ok(fragments)
}

/// Result of handing a fragment to the `SplitPacketAssembler`.
#[derive(Debug, PartialEq, Eq)]
pub enum Reassembly {
    /// The fragment completed its message.
    Complete(InternalPacket),
    /// More fragments are needed.
    Pending,
    /// The fragment arrived before.
    Duplicate,
}

#[derive(Debug)]
struct SplitRecord<T> {
    count: SplitPacketIndex,
    reliable: bool,
    created: T,
    fragments: BTreeMap<SplitPacketIndex, InternalPacket>,
}

/// Collects fragments until their message is complete.
#[derive(Debug)]
pub struct SplitPacketAssembler<T: MomentInTime> {
    records: HashMap<SplitPacketId, SplitRecord<T>>,
    max_split_count: u32,
}

impl<T: MomentInTime> SplitPacketAssembler<T> {
    /// Creates an assembler rejecting messages of more than `max_split_count` fragments.
    pub fn new(max_split_count: u32) -> SplitPacketAssembler<T> {
        SplitPacketAssembler {
            records: HashMap::new(),
            max_split_count,
        }
    }

    /// Returns the number of messages waiting for fragments.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true when no message waits for fragments.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Adds a fragment. Packets without a split descriptor complete immediately.
    pub fn insert(&mut self, packet: InternalPacket, now: T) -> Result<Reassembly> {
        let fragment = match packet.fragment() {
            Some(fragment) => fragment,
            None => return Ok(Reassembly::Complete(packet)),
        };

        if fragment.count() > self.max_split_count {
            return Err(DecodingErrorKind::SplitDescriptor.into());
        }

        let record = self
            .records
            .entry(fragment.id())
            .or_insert_with(|| SplitRecord {
                count: fragment.count(),
                reliable: packet.reliability().is_reliable(),
                created: now,
                fragments: BTreeMap::new(),
            });

        if record.count != fragment.count() {
            return Err(DecodingErrorKind::SplitDescriptor.into());
        }
        if record.fragments.contains_key(&fragment.index()) {
            return Ok(Reassembly::Duplicate);
        }
        record.fragments.insert(fragment.index(), packet);

        if record.fragments.len() < record.count as usize {
            return Ok(Reassembly::Pending);
        }

        match self.records.remove(&fragment.id()) {
            Some(record) => Ok(Reassembly::Complete(assemble(record.fragments))),
            None => Ok(Reassembly::Pending),
        }
    }

    /// Drops incomplete unreliable messages older than `timeout`.
    ///
    /// Reliable fragments are never dropped, their resends will complete the message.
    /// Returns the number of dropped messages.
    pub fn expire(&mut self, now: T, timeout: Duration) -> usize {
        let before = self.records.len();
        self.records.retain(|id, record| {
            let expired = !record.reliable && now.duration_since(record.created) > timeout;
            if expired {
                debug!(
                    "Dropping split packet {} with {}/{} fragments",
                    id,
                    record.fragments.len(),
                    record.count
                );
            }
            !expired
        });
        before - self.records.len()
    }

    /// Drops every incomplete message.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

// Joins the fragments in index order into one packet.
fn assemble(fragments: BTreeMap<SplitPacketIndex, InternalPacket>) -> InternalPacket {
    let total_bits = fragments.values().map(InternalPacket::bit_length).sum();
    let mut writer = BitWriter::with_capacity(bits_to_bytes(total_bits));

    let mut header = None;
    for packet in fragments.into_values() {
        if header.is_none() {
            header = Some((packet.reliability(), packet.arranging()));
        }
        writer.write_bit_slice(packet.payload(), packet.bit_length());
    }

    let (reliability, arranging) = header.unwrap_or((Reliability::Unreliable, None));
    InternalPacket::new(reliability, writer.into_bytes().into_boxed_slice(), total_bits)
        .with_arranging(arranging)
}
