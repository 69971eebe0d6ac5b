use std::net::SocketAddr;

use crate::packet::{ChannelNumber, Priority, Reliability};

#[derive(Clone, PartialEq, Eq, Debug)]
/// This is a user friendly packet containing the payload, endpoint, and delivery guarantees.
///
/// | Reliability Type             | Packet Drop     | Packet Duplication | Packet Order     | Packet Splitting | Packet Delivery |
/// | :-------------:              | :-------------: | :-------------:    | :-------------:  | :-------------:  | :-------------: |
/// |   **Unreliable**             |       Any       |      No            |     No           |      Yes         |   No            |
/// |   **Unreliable Sequenced**   |    Any + old    |      No            |     Sequenced    |      Yes         |   No            |
/// |   **Reliable Unordered**     |       No        |      No            |     No           |      Yes         |   Yes           |
/// |   **Reliable Ordered**       |       No        |      No            |     Ordered      |      Yes         |   Yes           |
/// |   **Reliable Sequenced**     |    Only old     |      No            |     Sequenced    |      Yes         |   Only newest   |
///
/// The priority only decides how soon a packet is packed into a frame on the sending side. Packets
/// handed out by the receiving side always report `Priority::Medium`.
pub struct Packet {
    /// The endpoint from where it came or where it goes.
    addr: SocketAddr,
    /// The raw payload of the packet.
    payload: Box<[u8]>,
    /// Defines on how the packet will be delivered.
    reliability: Reliability,
    /// Defines how soon the packet is sent.
    priority: Priority,
    /// The channel on which the packet is ordered or sequenced.
    channel: ChannelNumber,
}

impl Packet {
    /// Creates a new packet by passing the receiver, data, and guarantees on how this packet should be delivered.
    pub(crate) fn new(
        addr: SocketAddr,
        payload: Box<[u8]>,
        reliability: Reliability,
        channel: ChannelNumber,
    ) -> Packet {
        Packet {
            addr,
            payload,
            reliability,
            priority: Priority::default(),
            channel,
        }
    }

    /// Creates a new unreliable packet by passing the receiver, data.
    ///
    /// Basically just bare UDP. The packet may or may not be delivered.
    pub fn unreliable(addr: SocketAddr, payload: Vec<u8>) -> Packet {
        Packet::new(addr, payload.into_boxed_slice(), Reliability::Unreliable, 0)
    }

    /// Creates a new unreliable sequenced packet by passing the receiver, data.
    ///
    /// Packets can be dropped, but will not be duplicated and only the newest on the channel is kept.
    pub fn unreliable_sequenced(
        addr: SocketAddr,
        payload: Vec<u8>,
        channel: Option<ChannelNumber>,
    ) -> Packet {
        Packet::new(
            addr,
            payload.into_boxed_slice(),
            Reliability::UnreliableSequenced,
            channel.unwrap_or_default(),
        )
    }

    /// Creates a new reliable packet by passing the receiver, data.
    ///
    /// All packets will be sent and received, but without order.
    pub fn reliable_unordered(addr: SocketAddr, payload: Vec<u8>) -> Packet {
        Packet::new(addr, payload.into_boxed_slice(), Reliability::Reliable, 0)
    }

    /// Creates a new reliable ordered packet by passing the receiver, data and channel.
    ///
    /// All packets will be sent and received in the order they were sent on the channel.
    pub fn reliable_ordered(
        addr: SocketAddr,
        payload: Vec<u8>,
        channel: Option<ChannelNumber>,
    ) -> Packet {
        Packet::new(
            addr,
            payload.into_boxed_slice(),
            Reliability::ReliableOrdered,
            channel.unwrap_or_default(),
        )
    }

    /// Creates a new reliable sequenced packet by passing the receiver, data and channel.
    ///
    /// Packets are resent until acknowledged or superseded by a newer packet on the channel;
    /// older arrivals are discarded.
    pub fn reliable_sequenced(
        addr: SocketAddr,
        payload: Vec<u8>,
        channel: Option<ChannelNumber>,
    ) -> Packet {
        Packet::new(
            addr,
            payload.into_boxed_slice(),
            Reliability::ReliableSequenced,
            channel.unwrap_or_default(),
        )
    }

    /// Returns the packet with the given send priority.
    pub fn with_priority(mut self, priority: Priority) -> Packet {
        self.priority = priority;
        self
    }

    /// Returns the payload of this packet.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Returns the address of this packet.
    ///
    /// # Remark
    /// Could be both the receiving endpoint or the one to send this packet to.
    /// This depends whether it is a packet that has been received or one that needs to be send.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the reliability kind of this packet.
    pub fn reliability(&self) -> Reliability {
        self.reliability
    }

    /// Returns the send priority of this packet.
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Returns the ordering channel of this packet.
    pub fn channel(&self) -> ChannelNumber {
        self.channel
    }
}

/// A fully reassembled message, delivered in the order its reliability kind promises.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Message {
    payload: Box<[u8]>,
    bit_length: usize,
    reliability: Reliability,
    channel: ChannelNumber,
}

impl Message {
    pub(crate) fn new(
        payload: Box<[u8]>,
        bit_length: usize,
        reliability: Reliability,
        channel: ChannelNumber,
    ) -> Message {
        Message {
            payload,
            bit_length,
            reliability,
            channel,
        }
    }

    /// Returns the payload bytes; bits past `bit_length` in the last byte are zero.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Returns the number of meaningful payload bits.
    pub fn bit_length(&self) -> usize {
        self.bit_length
    }

    /// Returns the reliability kind the message was sent with.
    pub fn reliability(&self) -> Reliability {
        self.reliability
    }

    /// Returns the ordering channel; zero for kinds without one.
    pub fn channel(&self) -> ChannelNumber {
        self.channel
    }

    /// Consumes the message, returning its payload.
    pub fn into_payload(self) -> Box<[u8]> {
        self.payload
    }

    /// Turns the message into a packet from the given address.
    pub fn into_packet(self, addr: SocketAddr) -> Packet {
        Packet::new(addr, self.payload, self.reliability, self.channel)
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use crate::packet::{Message, Packet, Priority, Reliability};

    fn addr() -> SocketAddr {
        "127.0.0.1:12345".parse().unwrap()
    }

    #[test]
    fn assure_creation_unreliable_packet() {
        let packet = Packet::unreliable(addr(), test_payload());

        assert_eq!(packet.addr(), addr());
        assert_eq!(packet.payload(), test_payload().as_slice());
        assert_eq!(packet.reliability(), Reliability::Unreliable);
        assert_eq!(packet.channel(), 0);
    }

    #[test]
    fn assure_creation_unreliable_sequenced() {
        let packet = Packet::unreliable_sequenced(addr(), test_payload(), Some(1));

        assert_eq!(packet.reliability(), Reliability::UnreliableSequenced);
        assert_eq!(packet.channel(), 1);
    }

    #[test]
    fn assure_creation_reliable() {
        let packet = Packet::reliable_unordered(addr(), test_payload());

        assert_eq!(packet.reliability(), Reliability::Reliable);
        assert_eq!(packet.priority(), Priority::Medium);
    }

    #[test]
    fn assure_creation_reliable_ordered() {
        let packet = Packet::reliable_ordered(addr(), test_payload(), Some(31));

        assert_eq!(packet.reliability(), Reliability::ReliableOrdered);
        assert_eq!(packet.channel(), 31);
    }

    #[test]
    fn assure_creation_reliable_sequenced() {
        let packet = Packet::reliable_sequenced(addr(), test_payload(), None)
            .with_priority(Priority::High);

        assert_eq!(packet.reliability(), Reliability::ReliableSequenced);
        assert_eq!(packet.channel(), 0);
        assert_eq!(packet.priority(), Priority::High);
    }

    #[test]
    fn message_turns_into_received_packet() {
        let message = Message::new(
            test_payload().into_boxed_slice(),
            test_payload().len() * 8,
            Reliability::ReliableOrdered,
            4,
        );

        assert_eq!(
            message.into_packet(addr()),
            Packet::reliable_ordered(addr(), test_payload(), Some(4))
        );
    }

    fn test_payload() -> Vec<u8> {
        b"test".to_vec()
    }
}
