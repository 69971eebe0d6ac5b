use crate::bitstream::BitReader;
use crate::error::Result;
use crate::packet::Record;

/// Can be used to read the records of a received frame.
///
/// # Remarks
/// - `PacketReader` is using an underlying `BitReader`, every read is bounds checked.
/// - Reading stops once fewer than eight bits are left; those are the padding of the last byte.
/// - After an error the reader is exhausted, the rest of the frame can not be trusted.
pub struct PacketReader<'s> {
    reader: BitReader<'s>,
    failed: bool,
}

impl<'s> PacketReader<'s> {
    /// Construct a new instance of `PacketReader`, the given `buffer` will be used to read records from.
    pub fn new(buffer: &'s [u8]) -> PacketReader<'s> {
        PacketReader {
            reader: BitReader::new(buffer),
            failed: false,
        }
    }

    /// Returns the number of bits that have not been read yet.
    pub fn remaining_bits(&self) -> usize {
        self.reader.remaining_bits()
    }
}

impl<'s> Iterator for PacketReader<'s> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.reader.remaining_bits() < 8 {
            return None;
        }

        let record = Record::decode(&mut self.reader);
        self.failed = record.is_err();
        Some(record)
    }
}

#[cfg(test)]
mod tests {
    use crate::packet::{FrameWriter, InternalPacket, PacketReader, Record, Reliability};

    #[test]
    fn reads_back_to_back_records() {
        let mut frame = FrameWriter::new(1000);
        frame.write_acknowledgement(7);
        frame.write_packet(&InternalPacket::new(Reliability::Unreliable, vec![1, 2].into(), 16));
        frame.write_acknowledgement(8);
        let bytes = frame.into_bytes();

        let records: Vec<Record> = PacketReader::new(&bytes).map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0], Record::Acknowledgement(7));
        assert!(matches!(records[1], Record::Data(_)));
        assert_eq!(records[2], Record::Acknowledgement(8));
    }

    #[test]
    fn stops_after_a_corrupt_record() {
        let mut frame = FrameWriter::new(1000);
        frame.write_acknowledgement(1);
        frame.write_packet(&InternalPacket::new(Reliability::Reliable, vec![9; 8].into(), 64));
        let bytes = frame.into_bytes();
        let truncated = &bytes[..bytes.len() - 3];

        let mut reader = PacketReader::new(truncated);
        assert_eq!(reader.next().unwrap().unwrap(), Record::Acknowledgement(1));
        assert!(reader.next().unwrap().is_err());
        assert!(reader.next().is_none());
    }

    #[test]
    fn empty_buffer_yields_nothing() {
        assert!(PacketReader::new(&[]).next().is_none());
        assert!(PacketReader::new(&[0x00]).next().is_some());
    }
}
