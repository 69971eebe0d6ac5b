//! Header readers and writers for the records packed into a frame.

pub use self::acknowledgment_header::AcknowledgmentHeader;
pub use self::arranging_header::ArrangingHeader;
pub use self::fragment_header::FragmentHeader;
pub use self::standard_header::StandardHeader;

use crate::bitstream::{BitReader, BitWriter};

mod acknowledgment_header;
mod arranging_header;
mod fragment_header;
mod standard_header;

/// Trait for writing a header onto a bit stream.
pub trait HeaderWriter {
    /// Writes the header to the given writer.
    fn write(&self, writer: &mut BitWriter);
}

/// Trait for reading a header from a bit stream.
pub trait HeaderReader {
    /// Associated type for the header; the read result.
    type Header;

    /// Reads the header from the given reader.
    fn read(reader: &mut BitReader<'_>) -> Self::Header;

    /// Returns the largest number of bits this header can occupy.
    fn size() -> usize;
}
