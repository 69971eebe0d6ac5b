use std::time::Duration;

use crate::packet::ChannelNumber;

/// Bytes reserved for the IP and UDP headers of every datagram.
pub const UDP_HEADER_SIZE: usize = 28;
/// Number of independent ordering channels on one connection.
pub const ORDERING_CHANNEL_COUNT: ChannelNumber = 32;
/// Number of bits the ordering channel takes on the wire.
pub const CHANNEL_BITS: u8 = 5;
/// Number of bits the reliability tag takes on the wire.
pub const RELIABILITY_BITS: u8 = 3;
/// Bits used by one acknowledgement record: the record flag plus the sequence number.
pub const ACK_BIT_LENGTH: usize = 17;
/// Default maximum transmission unit, including the UDP header allowance.
///
/// 576 is the smallest datagram every IPv4 host must accept.
pub const DEFAULT_MTU_SIZE: usize = 576;
/// The largest maximum transmission unit that can be configured.
pub const MAXIMUM_MTU_SIZE: usize = 8000;
/// The smallest congestion window; also the pending acknowledgement count that forces a flush.
pub const MINIMUM_WINDOW_SIZE: usize = 5;
/// The largest congestion window: as many acknowledgements as fit into one maximum sized frame.
pub const MAXIMUM_WINDOW_SIZE: usize = (MAXIMUM_MTU_SIZE - UDP_HEADER_SIZE) * 8 / ACK_BIT_LENGTH;
/// Default time before an unacknowledged reliable packet is sent again.
pub const DEFAULT_RESEND_AFTER: Duration = Duration::from_millis(1000);
/// Resend delays below this value are raised to it.
pub const MINIMUM_RESEND_DELAY: Duration = Duration::from_millis(150);
/// Default ceiling for the doubling resend backoff.
pub const DEFAULT_MAX_RESEND_DELAY: Duration = Duration::from_secs(8);
/// Default time without any acknowledgement, while data is outstanding, before the connection is dead.
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);
/// Default time a receiver waits for a missing reliable sequence number before skipping it.
///
/// Longer than a sender keeps resending with the default backoff and retry limit.
pub const DEFAULT_RECEIVE_HOLE_TIMEOUT: Duration = Duration::from_secs(120);
/// Default lifetime of an incomplete unreliable split packet.
pub const DEFAULT_SPLIT_PACKET_TIMEOUT: Duration = Duration::from_secs(5);
/// Default number of fragments a single message may be split into.
pub const DEFAULT_MAX_SPLIT_COUNT: u32 = 65535;
/// Extra bytes a block cipher may add to a datagram when the cipher does not say otherwise.
pub const DEFAULT_CIPHER_OVERHEAD: usize = 16;
