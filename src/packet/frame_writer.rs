use crate::bitstream::BitWriter;
use crate::net::constants::ACK_BIT_LENGTH;
use crate::packet::{InternalPacket, Record, SequenceNumber};

/// Packs records into a single frame bounded by the usable transmission unit.
#[derive(Debug)]
pub struct FrameWriter {
    writer: BitWriter,
    max_bits: usize,
}

impl FrameWriter {
    /// Creates a writer that accepts at most `max_bits` bits.
    pub fn new(max_bits: usize) -> FrameWriter {
        FrameWriter {
            writer: BitWriter::with_capacity(max_bits / 8 + 1),
            max_bits,
        }
    }

    /// Returns the number of bits written.
    pub fn bits_written(&self) -> usize {
        self.writer.bits_written()
    }

    /// Returns true when no record has been written.
    pub fn is_empty(&self) -> bool {
        self.writer.is_empty()
    }

    /// Returns true when a record of `bits` bits still fits.
    pub fn fits(&self, bits: usize) -> bool {
        self.writer.bits_written() + bits <= self.max_bits
    }

    /// Returns true when another acknowledgement fits.
    pub fn fits_acknowledgement(&self) -> bool {
        self.fits(ACK_BIT_LENGTH)
    }

    /// Returns true when the packet fits, using its header upper bound.
    pub fn fits_packet(&self, packet: &InternalPacket) -> bool {
        self.fits(packet.encoded_bit_length())
    }

    /// Writes an acknowledgement record and returns the bits it used.
    pub fn write_acknowledgement(&mut self, sequence: SequenceNumber) -> usize {
        let start = self.writer.bits_written();
        Record::Acknowledgement(sequence).encode(&mut self.writer);
        self.writer.bits_written() - start
    }

    /// Writes a data record and returns the bits it used.
    pub fn write_packet(&mut self, packet: &InternalPacket) -> usize {
        let start = self.writer.bits_written();
        packet.encode(&mut self.writer);
        self.writer.bits_written() - start
    }

    /// Consumes the writer, returning the frame bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.writer.into_bytes()
    }
}
