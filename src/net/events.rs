use std::net::SocketAddr;

use crate::packet::Packet;

/// Events that can occur and are pushed through the event receiver of a socket.
#[derive(Debug, PartialEq)]
pub enum SocketEvent {
    /// A message was received from a remote host.
    Packet(Packet),
    /// A new connection was established: both a datagram was sent to and received from the
    /// remote host.
    Connect(SocketAddr),
    /// The remote host stopped acknowledging reliable data, or nothing was heard from it within
    /// the idle timeout.
    Timeout(SocketAddr),
    /// An established connection was dropped.
    Disconnect(SocketAddr),
    /// A datagram from the remote host failed to decode or decrypt. The connection is dropped
    /// on the next update.
    Tampered(SocketAddr),
}
