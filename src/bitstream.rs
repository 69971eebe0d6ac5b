//! Bit-granular reading and writing over owned byte buffers.
//!
//! Bits are stored most significant first within each byte. Every read is bounds checked and
//! reports `DecodingErrorKind::Truncated` instead of reading past the end of the buffer.
//!
//! # Compressed integers
//! Unsigned integers can be written in a compressed form which drops leading zero bytes.
//! Walking from the most significant byte down, every zero byte costs a single `1` bit. The
//! first non-zero byte is announced with a `0` bit, after which it and all lower bytes follow
//! verbatim. When only the lowest byte is left it is written as `1` plus a nibble if its upper
//! half is zero, or as `0` plus the full byte otherwise.

use crate::error::{DecodingErrorKind, Result};

/// Returns the number of bytes needed to hold `bits` bits.
pub fn bits_to_bytes(bits: usize) -> usize {
    (bits + 7) >> 3
}

/// Returns the largest number of bits a compressed integer of `bytes` bytes can occupy.
pub const fn max_compressed_bits(bytes: u32) -> usize {
    1 + 8 * bytes as usize
}

/// Appends bits to a growable buffer.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BitWriter {
    buffer: Vec<u8>,
    bit_length: usize,
}

impl BitWriter {
    /// Constructs an empty writer.
    #[cfg(test)]
    pub fn new() -> BitWriter {
        BitWriter::default()
    }

    /// Constructs an empty writer with room for `bytes` bytes before reallocating.
    pub fn with_capacity(bytes: usize) -> BitWriter {
        BitWriter {
            buffer: Vec::with_capacity(bytes),
            bit_length: 0,
        }
    }

    /// Returns the number of bits written so far.
    pub fn bits_written(&self) -> usize {
        self.bit_length
    }

    /// Returns true when nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.bit_length == 0
    }

    /// Discards everything written, keeping the allocation.
    #[cfg(test)]
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.bit_length = 0;
    }

    /// Writes a single bit.
    pub fn write_bit(&mut self, bit: bool) {
        let offset = self.bit_length & 7;
        if offset == 0 {
            self.buffer.push(0);
        }
        if bit {
            let last = self.buffer.len() - 1;
            self.buffer[last] |= 0x80 >> offset;
        }
        self.bit_length += 1;
    }

    /// Writes the lowest `count` bits of `value`, most significant first.
    pub fn write_bits(&mut self, value: u64, count: u8) {
        debug_assert!(count <= 64);
        if count == 0 {
            return;
        }

        // whole bytes can be appended directly when the writer is aligned
        if self.bit_length & 7 == 0 && count & 7 == 0 {
            for shift in (0..count / 8).rev() {
                self.buffer.push((value >> (shift * 8)) as u8);
            }
            self.bit_length += count as usize;
            return;
        }

        for shift in (0..count).rev() {
            self.write_bit((value >> shift) & 1 == 1);
        }
    }

    /// Writes a byte.
    #[cfg(test)]
    pub fn write_u8(&mut self, value: u8) {
        self.write_bits(value as u64, 8);
    }

    /// Writes a 16-bit value.
    pub fn write_u16(&mut self, value: u16) {
        self.write_bits(value as u64, 16);
    }

    /// Writes a 32-bit value.
    pub fn write_u32(&mut self, value: u32) {
        self.write_bits(value as u64, 32);
    }

    /// Writes a 16-bit value in compressed form.
    pub fn write_compressed_u16(&mut self, value: u16) {
        self.write_compressed(value as u64, 2);
    }

    /// Writes a 32-bit value in compressed form.
    pub fn write_compressed_u32(&mut self, value: u32) {
        self.write_compressed(value as u64, 4);
    }

    fn write_compressed(&mut self, value: u64, bytes: u32) {
        for index in (1..bytes).rev() {
            let byte = (value >> (index * 8)) & 0xff;
            if byte == 0 {
                self.write_bit(true);
            } else {
                self.write_bit(false);
                self.write_bits(value, ((index + 1) * 8) as u8);
                return;
            }
        }

        let low = value & 0xff;
        if low & 0xf0 == 0 {
            self.write_bit(true);
            self.write_bits(low, 4);
        } else {
            self.write_bit(false);
            self.write_bits(low, 8);
        }
    }

    /// Writes the first `bit_length` bits of `data`.
    ///
    /// The bits of a trailing partial byte are taken from its most significant end.
    pub fn write_bit_slice(&mut self, data: &[u8], bit_length: usize) {
        debug_assert!(bits_to_bytes(bit_length) <= data.len());
        let whole_bytes = bit_length >> 3;

        if self.bit_length & 7 == 0 {
            self.buffer.extend_from_slice(&data[..whole_bytes]);
            self.bit_length += whole_bytes * 8;
        } else {
            for byte in &data[..whole_bytes] {
                self.write_bits(*byte as u64, 8);
            }
        }

        let tail = (bit_length & 7) as u8;
        if tail > 0 {
            self.write_bits((data[whole_bytes] >> (8 - tail)) as u64, tail);
        }
    }

    /// Returns the written bytes; unused bits of the last byte are zero.
    #[cfg(test)]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Consumes the writer, returning the written bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}

/// Reads bits from a borrowed buffer.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    position: usize,
    bit_length: usize,
}

impl<'a> BitReader<'a> {
    /// Constructs a reader over all bits of `data`.
    pub fn new(data: &'a [u8]) -> BitReader<'a> {
        BitReader {
            data,
            position: 0,
            bit_length: data.len() * 8,
        }
    }

    /// Returns the number of bits left to read.
    pub fn remaining_bits(&self) -> usize {
        self.bit_length - self.position
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        let available = self.remaining_bits();
        if needed > available {
            return Err(DecodingErrorKind::Truncated { needed, available }.into());
        }
        Ok(())
    }

    /// Reads a single bit.
    pub fn read_bit(&mut self) -> Result<bool> {
        self.ensure(1)?;
        let byte = self.data[self.position >> 3];
        let bit = byte & (0x80 >> (self.position & 7)) != 0;
        self.position += 1;
        Ok(bit)
    }

    /// Reads `count` bits into the low end of a `u64`, most significant first.
    pub fn read_bits(&mut self, count: u8) -> Result<u64> {
        debug_assert!(count <= 64);
        self.ensure(count as usize)?;

        let mut value = 0u64;
        if self.position & 7 == 0 && count & 7 == 0 {
            for _ in 0..count / 8 {
                value = (value << 8) | self.data[self.position >> 3] as u64;
                self.position += 8;
            }
            return Ok(value);
        }

        for _ in 0..count {
            value = (value << 1) | self.read_bit()? as u64;
        }
        Ok(value)
    }

    /// Reads a byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bits(8)? as u8)
    }

    /// Reads a 16-bit value.
    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(self.read_bits(16)? as u16)
    }

    /// Reads a 32-bit value.
    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(self.read_bits(32)? as u32)
    }

    /// Reads a 16-bit value written by `BitWriter::write_compressed_u16`.
    pub fn read_compressed_u16(&mut self) -> Result<u16> {
        Ok(self.read_compressed(2)? as u16)
    }

    /// Reads a 32-bit value written by `BitWriter::write_compressed_u32`.
    pub fn read_compressed_u32(&mut self) -> Result<u32> {
        Ok(self.read_compressed(4)? as u32)
    }

    fn read_compressed(&mut self, bytes: u32) -> Result<u64> {
        for index in (1..bytes).rev() {
            if !self.read_bit()? {
                return self.read_bits(((index + 1) * 8) as u8);
            }
        }

        if self.read_bit()? {
            self.read_bits(4)
        } else {
            self.read_bits(8)
        }
    }

    /// Reads `bit_length` bits into a new buffer, packed from the most significant end.
    pub fn read_bit_slice(&mut self, bit_length: usize) -> Result<Vec<u8>> {
        self.ensure(bit_length)?;
        let whole_bytes = bit_length >> 3;
        let mut out = Vec::with_capacity(bits_to_bytes(bit_length));

        if self.position & 7 == 0 {
            let start = self.position >> 3;
            out.extend_from_slice(&self.data[start..start + whole_bytes]);
            self.position += whole_bytes * 8;
        } else {
            for _ in 0..whole_bytes {
                out.push(self.read_u8()?);
            }
        }

        let tail = (bit_length & 7) as u8;
        if tail > 0 {
            let bits = self.read_bits(tail)? as u8;
            out.push(bits << (8 - tail));
        }
        Ok(out)
    }
}
