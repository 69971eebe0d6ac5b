use crate::bitstream::{bits_to_bytes, max_compressed_bits, BitReader, BitWriter};
use crate::error::{DecodingErrorKind, Result};
use crate::net::constants::MAXIMUM_MTU_SIZE;
use crate::packet::header::{
    AcknowledgmentHeader, ArrangingHeader, FragmentHeader, HeaderReader, HeaderWriter,
    StandardHeader,
};
use crate::packet::{Reliability, SequenceNumber};

/// One record of a frame: either an acknowledgement or a data packet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Record {
    /// Acknowledges the reliable packet with the given sequence number.
    Acknowledgement(SequenceNumber),
    /// Carries (a fragment of) a message.
    Data(InternalPacket),
}

impl Record {
    /// Writes this record to the bit stream.
    pub fn encode(&self, writer: &mut BitWriter) {
        match self {
            Record::Acknowledgement(sequence) => {
                writer.write_bit(true);
                AcknowledgmentHeader::new(*sequence).write(writer);
            }
            Record::Data(packet) => packet.encode(writer),
        }
    }

    /// Reads one record from the bit stream.
    pub fn decode(reader: &mut BitReader<'_>) -> Result<Record> {
        if reader.read_bit()? {
            let header = AcknowledgmentHeader::read(reader)?;
            Ok(Record::Acknowledgement(header.sequence()))
        } else {
            Ok(Record::Data(InternalPacket::decode_body(reader)?))
        }
    }
}

/// One fragment of one logical send, as it travels on the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InternalPacket {
    standard: StandardHeader,
    arranging: Option<ArrangingHeader>,
    fragment: Option<FragmentHeader>,
    payload: Box<[u8]>,
    bit_length: usize,
}

impl InternalPacket {
    /// Creates a packet without sequence number, arranging or split information.
    ///
    /// `bit_length` must not exceed the bits in `payload`.
    pub fn new(reliability: Reliability, payload: Box<[u8]>, bit_length: usize) -> Self {
        debug_assert!(bit_length <= payload.len() * 8);
        InternalPacket {
            standard: StandardHeader::new(reliability, None),
            arranging: None,
            fragment: None,
            payload,
            bit_length,
        }
    }

    /// Returns the packet with the given sequence number. Ignored for unreliable kinds.
    pub fn with_sequence(mut self, sequence: SequenceNumber) -> Self {
        self.standard = StandardHeader::new(self.standard.reliability(), Some(sequence));
        self
    }

    /// Returns the packet with the given arranging header.
    pub fn with_arranging(mut self, arranging: Option<ArrangingHeader>) -> Self {
        self.arranging = arranging;
        self
    }

    /// Returns the packet with the given split descriptor.
    pub fn with_fragment(mut self, fragment: Option<FragmentHeader>) -> Self {
        self.fragment = fragment;
        self
    }

    /// Returns the reliability kind.
    pub fn reliability(&self) -> Reliability {
        self.standard.reliability()
    }

    /// Returns the sequence number, present on reliable kinds once assigned.
    pub fn sequence(&self) -> Option<SequenceNumber> {
        self.standard.sequence()
    }

    /// Returns the ordering channel and index for sequenced and ordered kinds.
    pub fn arranging(&self) -> Option<ArrangingHeader> {
        self.arranging
    }

    /// Returns the split descriptor of a fragment.
    pub fn fragment(&self) -> Option<FragmentHeader> {
        self.fragment
    }

    /// Returns the payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Returns the number of meaningful payload bits.
    pub fn bit_length(&self) -> usize {
        self.bit_length
    }

    /// Consumes the packet, returning its payload.
    pub fn into_payload(self) -> Box<[u8]> {
        self.payload
    }

    /// Returns an upper bound for the header bits of a packet of this kind.
    ///
    /// The bound only depends on the reliability kind and whether the packet is a fragment.
    pub fn header_bit_length_for(reliability: Reliability, split: bool) -> usize {
        let mut bits = 1 + StandardHeader::size_for(reliability);
        if reliability.is_arranged() {
            bits += ArrangingHeader::size();
        }
        bits += 1;
        if split {
            bits += FragmentHeader::size();
        }
        bits + max_compressed_bits(2)
    }

    /// Returns an upper bound for the header bits of this packet.
    pub fn header_bit_length(&self) -> usize {
        Self::header_bit_length_for(self.reliability(), self.fragment.is_some())
    }

    /// Returns an upper bound for the encoded size of this packet in bits.
    pub fn encoded_bit_length(&self) -> usize {
        self.header_bit_length() + self.bit_length
    }

    /// Writes this packet as a data record.
    pub fn encode(&self, writer: &mut BitWriter) {
        writer.write_bit(false);
        self.standard.write(writer);
        if self.reliability().is_arranged() {
            self.arranging
                .unwrap_or_else(|| ArrangingHeader::new(0, 0))
                .write(writer);
        }

        writer.write_bit(self.fragment.is_some());
        if let Some(fragment) = &self.fragment {
            fragment.write(writer);
        }

        writer.write_compressed_u16(self.bit_length as u16);
        writer.write_bit_slice(&self.payload, self.bit_length);
    }

    // Reads everything after the record flag of a data record.
    fn decode_body(reader: &mut BitReader<'_>) -> Result<InternalPacket> {
        let standard = StandardHeader::read(reader)?;
        let arranging = if standard.reliability().is_arranged() {
            Some(ArrangingHeader::read(reader)?)
        } else {
            None
        };

        let fragment = if reader.read_bit()? {
            Some(FragmentHeader::read(reader)?)
        } else {
            None
        };

        let bit_length = reader.read_compressed_u16()? as usize;
        if bit_length == 0 || bits_to_bytes(bit_length) > MAXIMUM_MTU_SIZE {
            return Err(DecodingErrorKind::PayloadLength(bit_length as u32).into());
        }
        let payload = reader.read_bit_slice(bit_length)?;

        Ok(InternalPacket {
            standard,
            arranging,
            fragment,
            payload: payload.into_boxed_slice(),
            bit_length,
        })
    }
}

#[cfg(test)]
mod tests {
    use quickcheck::{Arbitrary, Gen};
    use quickcheck_macros::quickcheck;

    use super::{InternalPacket, Record};
    use crate::bitstream::{BitReader, BitWriter};
    use crate::error::{DecodingErrorKind, ErrorKind};
    use crate::net::constants::ACK_BIT_LENGTH;
    use crate::packet::header::{ArrangingHeader, FragmentHeader};
    use crate::packet::Reliability;

    impl Arbitrary for Reliability {
        fn arbitrary(g: &mut Gen) -> Self {
            *g.choose(&[
                Reliability::Unreliable,
                Reliability::UnreliableSequenced,
                Reliability::Reliable,
                Reliability::ReliableOrdered,
                Reliability::ReliableSequenced,
            ])
            .unwrap()
        }
    }

    fn packet(reliability: Reliability, payload: &[u8]) -> InternalPacket {
        InternalPacket::new(reliability, payload.to_vec().into_boxed_slice(), payload.len() * 8)
    }

    fn decode_one(bytes: &[u8]) -> InternalPacket {
        match Record::decode(&mut BitReader::new(bytes)).unwrap() {
            Record::Data(packet) => packet,
            other => panic!("expected data, got {:?}", other),
        }
    }

    #[test]
    fn acknowledgement_record_has_fixed_size() {
        let mut writer = BitWriter::new();
        Record::Acknowledgement(513).encode(&mut writer);
        assert_eq!(writer.bits_written(), ACK_BIT_LENGTH);

        let bytes = writer.into_bytes();
        assert_eq!(
            Record::decode(&mut BitReader::new(&bytes)).unwrap(),
            Record::Acknowledgement(513)
        );
    }

    #[test]
    fn reliable_ordered_fragment_survives_encoding() {
        let original = packet(Reliability::ReliableOrdered, b"fragment")
            .with_sequence(9)
            .with_arranging(Some(ArrangingHeader::new(30, 65535)))
            .with_fragment(Some(FragmentHeader::new(77, 2, 3)));

        let mut writer = BitWriter::new();
        original.encode(&mut writer);
        assert!(writer.bits_written() <= original.encoded_bit_length());

        assert_eq!(decode_one(&writer.into_bytes()), original);
    }

    #[test]
    fn partial_byte_payload_keeps_its_bit_length() {
        let original = InternalPacket::new(Reliability::Unreliable, vec![0b1010_0000].into(), 3);

        let mut writer = BitWriter::new();
        original.encode(&mut writer);
        let decoded = decode_one(&writer.into_bytes());

        assert_eq!(decoded.bit_length(), 3);
        assert_eq!(decoded.payload(), &[0b1010_0000]);
    }

    #[test]
    fn unreliable_packet_carries_no_sequence() {
        let original = packet(Reliability::Unreliable, &[1, 2, 3]).with_sequence(4);
        assert_eq!(original.sequence(), None);
        assert_eq!(
            original.header_bit_length(),
            InternalPacket::header_bit_length_for(Reliability::Unreliable, false)
        );
    }

    #[test]
    fn truncated_record_is_rejected() {
        let mut writer = BitWriter::new();
        packet(Reliability::Reliable, &[1, 2, 3, 4]).with_sequence(1).encode(&mut writer);
        let bytes = writer.into_bytes();

        let truncated = &bytes[..bytes.len() - 2];
        match Record::decode(&mut BitReader::new(truncated)) {
            Err(ErrorKind::DecodingError(DecodingErrorKind::Truncated { .. })) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn zero_length_payload_is_rejected() {
        // data record, unreliable, not split, compressed length 0 as a nibble
        let mut writer = BitWriter::new();
        writer.write_bit(false);
        writer.write_bits(0, 3);
        writer.write_bit(false);
        writer.write_compressed_u16(0);

        let bytes = writer.into_bytes();
        match Record::decode(&mut BitReader::new(&bytes)) {
            Err(ErrorKind::DecodingError(DecodingErrorKind::PayloadLength(0))) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[quickcheck]
    fn data_records_survive_encoding(
        reliability: Reliability,
        payload: Vec<u8>,
        sequence: u16,
        channel: u8,
        index: u16,
    ) -> bool {
        if payload.is_empty() {
            return true;
        }
        let arranging = if reliability.is_arranged() {
            Some(ArrangingHeader::new(channel % 32, index))
        } else {
            None
        };
        let original = packet(reliability, &payload)
            .with_sequence(sequence)
            .with_arranging(arranging);

        let mut writer = BitWriter::new();
        original.encode(&mut writer);
        writer.bits_written() <= original.encoded_bit_length()
            && decode_one(&writer.into_bytes()) == original
    }
}
