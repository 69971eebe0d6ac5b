use std::net::SocketAddr;
use std::time::Duration;

use log::{debug, error, warn};

use crate::error::ErrorKind;
use crate::packet::Packet;

use super::connection::MomentInTime;
use super::{
    events::SocketEvent, Connection, ConnectionEventAddress, ConnectionMessenger, VirtualConnection,
};

/// Required by `ConnectionManager` to properly handle connection event.
impl ConnectionEventAddress for SocketEvent {
    /// Returns event address.
    fn address(&self) -> SocketAddr {
        match self {
            SocketEvent::Packet(packet) => packet.addr(),
            SocketEvent::Connect(addr) => *addr,
            SocketEvent::Timeout(addr) => *addr,
            SocketEvent::Disconnect(addr) => *addr,
            SocketEvent::Tampered(addr) => *addr,
        }
    }
}

/// Required by `ConnectionManager` to properly handle user event.
impl ConnectionEventAddress for Packet {
    /// Returns event address.
    fn address(&self) -> SocketAddr {
        self.addr()
    }
}

impl MomentInTime for coarsetime::Instant {
    fn duration_since(&self, other: Self) -> Duration {
        if *self <= other {
            Duration::ZERO
        } else {
            coarsetime::Instant::duration_since(self, other).into()
        }
    }

    fn after(&self, duration: Duration) -> Self {
        *self + coarsetime::Duration::from(duration)
    }

    /// Returns the current time.
    fn now() -> Self {
        coarsetime::Instant::now()
    }
}

impl MomentInTime for std::time::Instant {
    fn duration_since(&self, other: Self) -> Duration {
        self.saturating_duration_since(other)
    }

    fn after(&self, duration: Duration) -> Self {
        *self + duration
    }

    /// Returns the current time.
    fn now() -> Self {
        std::time::Instant::now()
    }
}

impl<T: MomentInTime> Connection for VirtualConnection<T> {
    /// Defines a user event type.
    type SendEvent = Packet;
    /// Defines a connection event type.
    type ReceiveEvent = SocketEvent;
    /// Defines a moment in time.
    type Instant = T;

    /// Creates new connection.
    /// * address - defines a address that connection is associated with.
    /// * time - creation time, used by connection, so that it doesn't get dropped immediately.
    fn create_connection(
        messenger: &mut impl ConnectionMessenger<Self::ReceiveEvent>,
        address: SocketAddr,
        time: Self::Instant,
    ) -> VirtualConnection<Self::Instant> {
        VirtualConnection::new(address, messenger.config(), time)
    }

    ///  Connections are considered established once they both have had a send and a receive.
    fn is_established(&self) -> bool {
        self.is_established()
    }

    /// Determines if the given `Connection` should be dropped due to its state.
    fn should_drop(
        &mut self,
        messenger: &mut impl ConnectionMessenger<Self::ReceiveEvent>,
        time: Self::Instant,
    ) -> bool {
        let dead = self.is_dead();
        let too_late = self.last_heard(time) >= messenger.config().idle_connection_timeout;
        let tampered = self.is_tampered();
        let should_drop = dead || too_late || tampered;
        if should_drop {
            if dead || too_late {
                warn!(
                    "Connection timeout for [{}]: {}ms since last heard",
                    self.remote_address,
                    self.last_heard(time).as_millis()
                );
                messenger.send_event(&self.remote_address, SocketEvent::Timeout(self.remote_address));
            }
            if tampered {
                warn!("Connection dropped for [{}]: corrupt datagrams", self.remote_address);
            }
            if self.is_established() {
                messenger.send_event(
                    &self.remote_address,
                    SocketEvent::Disconnect(self.remote_address),
                );
            }
        }
        should_drop
    }

    /// Processes a received datagram: feed it to the reliability layer and emit the messages
    /// that became ready.
    fn process_packet(
        &mut self,
        messenger: &mut impl ConnectionMessenger<Self::ReceiveEvent>,
        payload: &[u8],
        time: Self::Instant,
    ) {
        if payload.is_empty() {
            warn!("Error processing packet: {}", ErrorKind::ReceivedDataToShort);
            return;
        }

        if !self.process_incoming(payload, time) {
            debug!("Corrupt datagram from [{}]", self.remote_address);
            messenger.send_event(&self.remote_address, SocketEvent::Tampered(self.remote_address));
            return;
        }

        if self.record_recv() {
            messenger.send_event(&self.remote_address, SocketEvent::Connect(self.remote_address));
        }

        while let Some(message) = self.receive() {
            messenger.send_event(
                &self.remote_address,
                SocketEvent::Packet(message.into_packet(self.remote_address)),
            );
        }
    }

    /// Processes a user packet: queue it on the reliability layer.
    fn process_event(
        &mut self,
        messenger: &mut impl ConnectionMessenger<Self::ReceiveEvent>,
        event: Self::SendEvent,
        time: Self::Instant,
    ) {
        if let Err(err) = self.send(&event, time) {
            error!(
                "Error occured queueing packet for [{}] (len={}): {}",
                self.remote_address,
                event.payload().len(),
                err
            );
            return;
        }

        if self.record_send() {
            messenger.send_event(&self.remote_address, SocketEvent::Connect(self.remote_address));
        }
    }

    /// Processes various connection-related tasks: resend dropped packets, flush acknowledgements
    /// and queued packets, keep an idle connection alive. This function gets called very frequently.
    fn update(
        &mut self,
        messenger: &mut impl ConnectionMessenger<Self::ReceiveEvent>,
        time: Self::Instant,
    ) {
        let address = self.remote_address;
        let frames = VirtualConnection::update(self, time);
        for frame in frames.iter() {
            messenger.send_packet(&address, frame);
        }

        // send heartbeat packets if required
        if frames.is_empty() && self.is_established() {
            if let Some(heartbeat_interval) = messenger.config().heartbeat_interval {
                if self.last_sent(time) >= heartbeat_interval {
                    messenger.send_packet(&address, self.heartbeat(time));
                }
            }
        }
    }
}
