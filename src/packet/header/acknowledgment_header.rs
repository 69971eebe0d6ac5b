use crate::bitstream::{BitReader, BitWriter};
use crate::error::Result;
use crate::packet::SequenceNumber;

use super::{HeaderReader, HeaderWriter};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
/// This header acknowledges a single reliable packet of the remote host.
pub struct AcknowledgmentHeader {
    sequence: SequenceNumber,
}

impl AcknowledgmentHeader {
    /// Creates a new acknowledgment for the given sequence number.
    pub fn new(sequence: SequenceNumber) -> Self {
        AcknowledgmentHeader { sequence }
    }

    /// Returns the acknowledged sequence number.
    pub fn sequence(&self) -> SequenceNumber {
        self.sequence
    }
}

impl HeaderWriter for AcknowledgmentHeader {
    fn write(&self, writer: &mut BitWriter) {
        writer.write_u16(self.sequence);
    }
}

impl HeaderReader for AcknowledgmentHeader {
    type Header = Result<AcknowledgmentHeader>;

    fn read(reader: &mut BitReader<'_>) -> Self::Header {
        Ok(AcknowledgmentHeader {
            sequence: reader.read_u16()?,
        })
    }

    fn size() -> usize {
        16
    }
}
