use crate::bitstream::{BitReader, BitWriter};
use crate::error::Result;
use crate::net::constants::CHANNEL_BITS;
use crate::packet::{ChannelNumber, OrderingIndex};

use super::{HeaderReader, HeaderWriter};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
/// This header carries the ordering channel and index of sequenced and ordered packets.
pub struct ArrangingHeader {
    channel: ChannelNumber,
    index: OrderingIndex,
}

impl ArrangingHeader {
    /// Creates a new arranging header.
    pub fn new(channel: ChannelNumber, index: OrderingIndex) -> Self {
        ArrangingHeader { channel, index }
    }

    /// Returns the ordering channel.
    pub fn channel(&self) -> ChannelNumber {
        self.channel
    }

    /// Returns the ordering index on the channel.
    pub fn index(&self) -> OrderingIndex {
        self.index
    }
}

impl HeaderWriter for ArrangingHeader {
    fn write(&self, writer: &mut BitWriter) {
        writer.write_bits(self.channel as u64, CHANNEL_BITS);
        writer.write_u16(self.index);
    }
}

impl HeaderReader for ArrangingHeader {
    type Header = Result<ArrangingHeader>;

    fn read(reader: &mut BitReader<'_>) -> Self::Header {
        let channel = reader.read_bits(CHANNEL_BITS)? as ChannelNumber;
        let index = reader.read_u16()?;

        Ok(ArrangingHeader { channel, index })
    }

    fn size() -> usize {
        CHANNEL_BITS as usize + 16
    }
}

#[cfg(test)]
mod tests {
    use crate::bitstream::{BitReader, BitWriter};
    use crate::packet::header::{ArrangingHeader, HeaderReader, HeaderWriter};

    #[test]
    fn serialize() {
        let mut writer = BitWriter::new();
        ArrangingHeader::new(31, 0x0102).write(&mut writer);

        assert_eq!(writer.bits_written(), ArrangingHeader::size());
        assert_eq!(writer.as_bytes()[0] >> 3, 31);
    }

    #[test]
    fn deserialize() {
        // channel 2, index 1
        let buffer = [0b0001_0000u8, 0b0000_0000, 0b0000_1000];
        let header = ArrangingHeader::read(&mut BitReader::new(&buffer)).unwrap();

        assert_eq!(header.channel(), 2);
        assert_eq!(header.index(), 1);
    }

    #[test]
    fn size() {
        assert_eq!(ArrangingHeader::size(), 21);
    }
}
