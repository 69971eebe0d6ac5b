//! strand is a reliability layer on top of UDP.
//!
//! It turns a lossy, reordering and duplicating datagram transport into channels with the
//! guarantees an application asks for:
//!
//! - unreliable and unreliable-sequenced messages for state that is superseded quickly,
//! - reliable messages that are resent with a doubling backoff until acknowledged,
//! - reliable-ordered messages, ordered per channel,
//! - reliable-sequenced messages where only the newest on a channel matters,
//! - messages of any size, split into datagram-sized fragments and reassembled.
//!
//! A congestion window limits the number of unacknowledged packets in flight, acknowledgements
//! are batched and piggybacked on data, and every connection keeps statistics.
//!
//! The per-connection engine is [`ReliabilityLayer`]; it does no I/O and takes the current time
//! as an argument. [`Socket`] runs one layer per remote address over a real UDP socket.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Instant;
//! use strand::{Packet, Socket, SocketEvent};
//!
//! let mut socket = Socket::<Instant>::bind("127.0.0.1:12345").unwrap();
//! let server = "127.0.0.1:12346".parse().unwrap();
//!
//! socket
//!     .send(Packet::reliable_ordered(server, b"hello".to_vec(), Some(1)))
//!     .unwrap();
//!
//! loop {
//!     socket.manual_poll(Instant::now());
//!     if let Some(SocketEvent::Packet(packet)) = socket.recv() {
//!         println!("{:?}", packet.payload());
//!         break;
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![allow(clippy::new_without_default)]

mod bitstream;
mod cipher;
mod config;
mod error;
mod infrastructure;
mod net;
mod packet;
mod sequence_buffer;

#[cfg(feature = "tester")]
mod throughput;

#[cfg(feature = "tester")]
pub use self::throughput::ThroughputMonitoring;

#[cfg(test)]
mod test_utils;

pub use self::cipher::BlockCipher;
pub use self::config::Config;
pub use self::error::{DecodingErrorKind, ErrorKind, Result};
pub use self::net::constants;
pub use self::net::{
    Connection, ConnectionEventAddress, ConnectionManager, ConnectionMessenger, DatagramSocket,
    LinkConditioner, MomentInTime, ReliabilityLayer, Socket, SocketEvent, Statistics,
    VirtualConnection,
};
pub use self::packet::{ChannelNumber, Message, Packet, Priority, Reliability};
