//! This module provides the logic between the low-level abstract types and the types that the user will be interacting with.
//! You can think of the reliability layer, connection management and the socket.

pub use self::connection::{Connection, ConnectionEventAddress, ConnectionMessenger, MomentInTime};
pub use self::connection_manager::{ConnectionManager, DatagramSocket};
pub use self::events::SocketEvent;
pub use self::link_conditioner::LinkConditioner;
pub use self::reliability_layer::ReliabilityLayer;
pub use self::socket::Socket;
pub use self::statistics::Statistics;
pub use self::virtual_connection::VirtualConnection;

mod connection;
mod connection_impl;
mod connection_manager;
mod events;
mod link_conditioner;
mod reliability_layer;
mod socket;
mod statistics;
mod virtual_connection;

pub mod constants;
