use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    io, result,
};

use crossbeam_channel::SendError;

use crate::packet::Packet;

/// Wrapped result type for strand errors.
pub type Result<T> = result::Result<T, ErrorKind>;

/// Enum with all possible network errors that could occur.
#[derive(Debug)]
pub enum ErrorKind {
    /// Error in decoding the packet
    DecodingError(DecodingErrorKind),
    /// The reliability tag does not name a known reliability kind
    InvalidReliabilityKind(u8),
    /// The ordering channel is outside of `0..ORDERING_CHANNEL_COUNT`
    ChannelOutOfRange(u8),
    /// A payload without any bits can not be sent
    EmptyPayload,
    /// The stated bit length does not fit the supplied payload
    BitLengthOutOfRange {
        /// Bit length that was requested.
        bits: usize,
        /// Bits available in the payload buffer.
        available: usize,
    },
    /// The payload would need more split packets than allowed
    PayloadTooLarge {
        /// Size of the rejected payload in bytes.
        size: usize,
        /// The largest payload that can be sent in bytes.
        max: usize,
    },
    /// The connection has been declared dead; no further sends are accepted
    ConnectionDead,
    /// Wrapper around a std io::Error
    IOError(io::Error),
    /// Did not receive enough data
    ReceivedDataToShort,
    /// The installed cipher rejected the datagram
    CouldNotDecrypt,
    /// Could not send on the user channel `SendChannel`
    SendError(SendError<Packet>),
}

impl Display for ErrorKind {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::DecodingError(e) => write!(
                fmt,
                "Something went wrong with decoding a packet record. Reason: {}.",
                e
            ),
            ErrorKind::InvalidReliabilityKind(tag) => {
                write!(fmt, "The reliability tag {} is not a known reliability kind.", tag)
            }
            ErrorKind::ChannelOutOfRange(channel) => {
                write!(fmt, "Ordering channel {} is out of range.", channel)
            }
            ErrorKind::EmptyPayload => write!(fmt, "Can not send a payload without data."),
            ErrorKind::BitLengthOutOfRange { bits, available } => write!(
                fmt,
                "A bit length of {} does not fit a payload of {} bits.",
                bits, available
            ),
            ErrorKind::PayloadTooLarge { size, max } => write!(
                fmt,
                "The payload of {} bytes exceeds the maximum of {} bytes.",
                size, max
            ),
            ErrorKind::ConnectionDead => write!(fmt, "The connection is dead."),
            ErrorKind::IOError(e) => write!(fmt, "An IO Error occurred. Reason: {:?}.", e),
            ErrorKind::ReceivedDataToShort => {
                write!(fmt, "The received data did not have any length.")
            }
            ErrorKind::CouldNotDecrypt => write!(fmt, "The datagram could not be decrypted."),
            ErrorKind::SendError(e) => {
                write!(fmt, "Could not sent on channel because it was closed. Reason: {:?}", e)
            }
        }
    }
}

impl Error for ErrorKind {}

/// Errors that could occur while decoding a packet record from a frame.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum DecodingErrorKind {
    /// The frame ended before the record was complete
    Truncated {
        /// Bits the reader needed.
        needed: usize,
        /// Bits that were left in the frame.
        available: usize,
    },
    /// The payload bit length is zero or larger than the maximum transmission unit
    PayloadLength(u32),
    /// The split descriptor is inconsistent (index out of range or zero count)
    SplitDescriptor,
}

impl Display for DecodingErrorKind {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> fmt::Result {
        match *self {
            DecodingErrorKind::Truncated { needed, available } => write!(
                fmt,
                "needed {} bits but only {} are left",
                needed, available
            ),
            DecodingErrorKind::PayloadLength(bits) => {
                write!(fmt, "payload length of {} bits is invalid", bits)
            }
            DecodingErrorKind::SplitDescriptor => write!(fmt, "split descriptor is invalid"),
        }
    }
}

impl From<io::Error> for ErrorKind {
    fn from(inner: io::Error) -> ErrorKind {
        ErrorKind::IOError(inner)
    }
}

impl From<DecodingErrorKind> for ErrorKind {
    fn from(inner: DecodingErrorKind) -> Self {
        ErrorKind::DecodingError(inner)
    }
}

impl From<SendError<Packet>> for ErrorKind {
    fn from(inner: SendError<Packet>) -> Self {
        ErrorKind::SendError(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::{DecodingErrorKind, ErrorKind};

    #[test]
    fn able_to_box_errors() {
        let _: Box<dyn std::error::Error> = Box::new(ErrorKind::EmptyPayload);
    }

    #[test]
    fn decoding_error_displays_reason() {
        let error = ErrorKind::from(DecodingErrorKind::Truncated {
            needed: 16,
            available: 3,
        });
        assert_eq!(
            error.to_string(),
            "Something went wrong with decoding a packet record. Reason: needed 16 bits but only 3 are left."
        );
    }
}
