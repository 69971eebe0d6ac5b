use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use crate::cipher::BlockCipher;
use crate::config::Config;
use crate::error::Result;
use crate::net::reliability_layer::HEARTBEAT_DATAGRAM;
use crate::net::{MomentInTime, ReliabilityLayer, Statistics};
use crate::packet::{Message, Packet};

/// Contains the information about a certain 'virtual connection' over udp.
/// This connections also keeps track of the reliability layer that serves the remote host.
pub struct VirtualConnection<T: MomentInTime> {
    /// Last time we received a datagram from this client.
    last_heard: T,
    /// Last time we sent a datagram to this client.
    last_sent: T,
    /// The address of the remote endpoint.
    pub remote_address: SocketAddr,

    any_sent: bool,
    any_received: bool,
    max_frames_per_update: usize,
    layer: ReliabilityLayer<T>,
}

impl<T: MomentInTime> VirtualConnection<T> {
    /// Creates and returns a new VirtualConnection that wraps the provided socket address.
    pub fn new(addr: SocketAddr, config: &Config, time: T) -> VirtualConnection<T> {
        VirtualConnection {
            last_heard: time,
            last_sent: time,
            remote_address: addr,
            any_sent: false,
            any_received: false,
            max_frames_per_update: config.max_frames_per_update.max(1),
            layer: ReliabilityLayer::new(config),
        }
    }

    /// Records that this connection has sent a datagram. Returns whether the connection has
    /// become established due to this send.
    pub fn record_send(&mut self) -> bool {
        let was_est = self.is_established();
        self.any_sent = true;

        !was_est && self.is_established()
    }

    /// Records that this connection has received a datagram. Returns whether the connection has
    /// become established due to this receive.
    pub fn record_recv(&mut self) -> bool {
        let was_est = self.is_established();
        self.any_received = true;

        !was_est && self.is_established()
    }

    /// Connections are considered established once they have both had a send and a receive.
    pub fn is_established(&self) -> bool {
        self.any_sent && self.any_received
    }

    /// Returns a [Duration] representing the interval since we last heard from the client.
    pub fn last_heard(&self, time: T) -> Duration {
        time.duration_since(self.last_heard)
    }

    /// Returns a [Duration] representing the interval since we last sent to the client.
    pub fn last_sent(&self, time: T) -> Duration {
        time.duration_since(self.last_sent)
    }

    /// Queues a user packet on the reliability layer.
    pub fn send(&mut self, packet: &Packet, time: T) -> Result<()> {
        self.layer.send(
            packet.payload(),
            packet.priority(),
            packet.reliability(),
            packet.channel(),
            time,
        )
    }

    /// Feeds a received datagram to the reliability layer.
    ///
    /// Returns false when the datagram was corrupt.
    pub fn process_incoming(&mut self, datagram: &[u8], time: T) -> bool {
        self.last_heard = time;
        self.layer.handle_datagram(datagram, time)
    }

    /// Returns the next message ready for the application.
    pub fn receive(&mut self) -> Option<Message> {
        self.layer.receive()
    }

    /// Produces the datagrams due at `time`, at most `max_frames_per_update` of them.
    pub fn update(&mut self, time: T) -> Vec<Vec<u8>> {
        let mut frames = Vec::new();
        while frames.len() < self.max_frames_per_update {
            match self.layer.update(time) {
                Some(frame) => frames.push(frame),
                None => break,
            }
        }
        if !frames.is_empty() {
            self.last_sent = time;
        }
        frames
    }

    /// Returns a keepalive datagram and records it as sent.
    pub fn heartbeat(&mut self, time: T) -> &'static [u8] {
        self.last_sent = time;
        HEARTBEAT_DATAGRAM
    }

    /// Returns true once the remote host stopped acknowledging reliable data.
    pub fn is_dead(&self) -> bool {
        self.layer.is_dead_connection()
    }

    /// Returns true once a corrupt datagram was received from the remote host.
    pub fn is_tampered(&self) -> bool {
        self.layer.is_tamper_detected()
    }

    /// Returns the traffic counters of this connection.
    pub fn statistics(&self) -> Statistics {
        self.layer.statistics()
    }

    /// Installs or removes the cipher applied to every datagram of this connection.
    pub fn set_cipher(&mut self, cipher: Option<Box<dyn BlockCipher>>) {
        self.layer.set_cipher(cipher);
    }
}

impl<T: MomentInTime> fmt::Debug for VirtualConnection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            self.remote_address.ip(),
            self.remote_address.port()
        )
    }
}
