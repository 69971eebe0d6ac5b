use std::convert::TryFrom;

use crate::bitstream::{BitReader, BitWriter};
use crate::error::Result;
use crate::net::constants::RELIABILITY_BITS;
use crate::packet::{EnumConverter, Reliability, SequenceNumber};

use super::{HeaderReader, HeaderWriter};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
/// This header starts every data record: the reliability kind and, for reliable kinds, the sequence number.
pub struct StandardHeader {
    reliability: Reliability,
    sequence: Option<SequenceNumber>,
}

impl StandardHeader {
    /// Creates new header.
    ///
    /// The sequence number is only kept for reliable kinds.
    pub fn new(reliability: Reliability, sequence: Option<SequenceNumber>) -> Self {
        StandardHeader {
            reliability,
            sequence: sequence.filter(|_| reliability.is_reliable()),
        }
    }

    /// Returns the reliability kind.
    pub fn reliability(&self) -> Reliability {
        self.reliability
    }

    /// Returns the sequence number, present for reliable kinds.
    pub fn sequence(&self) -> Option<SequenceNumber> {
        self.sequence
    }

    /// Returns the number of bits this header takes for the given kind.
    pub fn size_for(reliability: Reliability) -> usize {
        if reliability.is_reliable() {
            RELIABILITY_BITS as usize + 16
        } else {
            RELIABILITY_BITS as usize
        }
    }
}

impl HeaderWriter for StandardHeader {
    fn write(&self, writer: &mut BitWriter) {
        writer.write_bits(self.reliability.to_u8() as u64, RELIABILITY_BITS);
        if self.reliability.is_reliable() {
            writer.write_u16(self.sequence.unwrap_or_default());
        }
    }
}

impl HeaderReader for StandardHeader {
    type Header = Result<StandardHeader>;

    fn read(reader: &mut BitReader<'_>) -> Self::Header {
        let reliability = Reliability::try_from(reader.read_bits(RELIABILITY_BITS)? as u8)?;
        let sequence = if reliability.is_reliable() {
            Some(reader.read_u16()?)
        } else {
            None
        };

        Ok(StandardHeader {
            reliability,
            sequence,
        })
    }

    fn size() -> usize {
        RELIABILITY_BITS as usize + 16
    }
}

#[cfg(test)]
mod tests {
    use crate::bitstream::{BitReader, BitWriter};
    use crate::error::ErrorKind;
    use crate::packet::header::{HeaderReader, HeaderWriter, StandardHeader};
    use crate::packet::Reliability;

    #[test]
    fn serialize_reliable() {
        let mut writer = BitWriter::new();
        StandardHeader::new(Reliability::Reliable, Some(0xABCD)).write(&mut writer);

        assert_eq!(writer.bits_written(), 19);
        // tag 2 in three bits followed by the sequence
        assert_eq!(writer.as_bytes()[0] >> 5, 2);
    }

    #[test]
    fn unreliable_kinds_drop_the_sequence() {
        let header = StandardHeader::new(Reliability::UnreliableSequenced, Some(7));
        assert_eq!(header.sequence(), None);

        let mut writer = BitWriter::new();
        header.write(&mut writer);
        assert_eq!(writer.bits_written(), StandardHeader::size_for(Reliability::Unreliable));
    }

    #[test]
    fn serialize_then_deserialize() {
        let mut writer = BitWriter::new();
        StandardHeader::new(Reliability::ReliableSequenced, Some(65535)).write(&mut writer);

        let bytes = writer.into_bytes();
        let header = StandardHeader::read(&mut BitReader::new(&bytes)).unwrap();
        assert_eq!(header.reliability(), Reliability::ReliableSequenced);
        assert_eq!(header.sequence(), Some(65535));
    }

    #[test]
    fn invalid_tag_is_rejected() {
        let buffer = [0b1110_0000u8, 0, 0];
        match StandardHeader::read(&mut BitReader::new(&buffer)) {
            Err(ErrorKind::InvalidReliabilityKind(7)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn size() {
        assert_eq!(StandardHeader::size(), 19);
    }
}
