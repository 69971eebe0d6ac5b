use crate::bitstream::{max_compressed_bits, BitReader, BitWriter};
use crate::error::{DecodingErrorKind, Result};
use crate::packet::{SplitPacketId, SplitPacketIndex};

use super::{HeaderReader, HeaderWriter};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
/// This header represents one fragment of a split message.
pub struct FragmentHeader {
    id: SplitPacketId,
    index: SplitPacketIndex,
    count: SplitPacketIndex,
}

impl FragmentHeader {
    /// Create new fragment header.
    pub fn new(id: SplitPacketId, index: SplitPacketIndex, count: SplitPacketIndex) -> Self {
        FragmentHeader { id, index, count }
    }

    /// Returns the id shared by all fragments of the message.
    pub fn id(&self) -> SplitPacketId {
        self.id
    }

    /// Returns the position of this fragment in the message.
    pub fn index(&self) -> SplitPacketIndex {
        self.index
    }

    /// Returns the total number of fragments in the message.
    pub fn count(&self) -> SplitPacketIndex {
        self.count
    }
}

impl HeaderWriter for FragmentHeader {
    fn write(&self, writer: &mut BitWriter) {
        writer.write_u32(self.id);
        writer.write_compressed_u32(self.index);
        writer.write_compressed_u32(self.count);
    }
}

impl HeaderReader for FragmentHeader {
    type Header = Result<FragmentHeader>;

    fn read(reader: &mut BitReader<'_>) -> Self::Header {
        let id = reader.read_u32()?;
        let index = reader.read_compressed_u32()?;
        let count = reader.read_compressed_u32()?;

        if count == 0 || index >= count {
            return Err(DecodingErrorKind::SplitDescriptor.into());
        }

        Ok(FragmentHeader { id, index, count })
    }

    fn size() -> usize {
        32 + max_compressed_bits(4) * 2
    }
}

#[cfg(test)]
mod tests {
    use crate::bitstream::{BitReader, BitWriter};
    use crate::error::{DecodingErrorKind, ErrorKind};
    use crate::packet::header::{FragmentHeader, HeaderReader, HeaderWriter};

    #[test]
    fn serialize_then_deserialize() {
        let mut writer = BitWriter::new();
        FragmentHeader::new(0xDEAD_BEEF, 4, 5).write(&mut writer);
        assert!(writer.bits_written() <= FragmentHeader::size());

        let bytes = writer.into_bytes();
        let header = FragmentHeader::read(&mut BitReader::new(&bytes)).unwrap();
        assert_eq!(header.id(), 0xDEAD_BEEF);
        assert_eq!(header.index(), 4);
        assert_eq!(header.count(), 5);
    }

    #[test]
    fn index_beyond_count_is_rejected() {
        let mut writer = BitWriter::new();
        FragmentHeader::new(1, 5, 5).write(&mut writer);

        let bytes = writer.into_bytes();
        match FragmentHeader::read(&mut BitReader::new(&bytes)) {
            Err(ErrorKind::DecodingError(DecodingErrorKind::SplitDescriptor)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn size() {
        assert_eq!(FragmentHeader::size(), 32 + 33 + 33);
    }
}
