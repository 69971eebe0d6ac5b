use std::{
    io,
    net::{Ipv4Addr, SocketAddr, SocketAddrV4, ToSocketAddrs, UdpSocket},
    thread::{sleep, yield_now},
    time::Duration,
};

use crossbeam_channel::{Receiver, Sender};
use log::debug;

use crate::{
    config::Config,
    error::Result,
    net::{
        events::SocketEvent, ConnectionManager, DatagramSocket, LinkConditioner, Statistics,
        VirtualConnection,
    },
    packet::Packet,
};

use super::connection::MomentInTime;

fn create_socket(listen_addr: SocketAddr, config: &Config) -> io::Result<UdpSocket> {
    let socket = socket2::Socket::new(
        match listen_addr.is_ipv4() {
            true => socket2::Domain::IPV4,
            false => socket2::Domain::IPV6,
        },
        socket2::Type::DGRAM,
        Some(socket2::Protocol::UDP),
    )?;
    socket.set_reuse_address(true)?;
    socket.bind(&listen_addr.into())?;
    socket.set_nonblocking(!config.blocking_mode)?;
    if config.blocking_mode {
        socket.set_read_timeout(config.socket_polling_timeout)?;
    }
    Ok(socket.into())
}

// Wraps `LinkConditioner` and `UdpSocket` together.
#[derive(Debug)]
struct SocketWithConditioner {
    is_blocking_mode: bool,
    socket: UdpSocket,
    link_conditioner: Option<LinkConditioner>,
}

impl SocketWithConditioner {
    fn new(socket: UdpSocket, is_blocking_mode: bool) -> Self {
        SocketWithConditioner {
            is_blocking_mode,
            socket,
            link_conditioner: None,
        }
    }

    fn set_link_conditioner(&mut self, link_conditioner: Option<LinkConditioner>) {
        self.link_conditioner = link_conditioner;
    }
}

/// Provides a `DatagramSocket` implementation for `SocketWithConditioner`
impl DatagramSocket for SocketWithConditioner {
    // Determinate whether packet will be sent or not based on `LinkConditioner` if enabled.
    fn send_packet(&mut self, addr: &SocketAddr, payload: &[u8]) -> io::Result<usize> {
        if let Some(link) = &mut self.link_conditioner {
            if !link.should_send() {
                debug!("Link conditioner dropped a datagram to [{}]", addr);
                return Ok(0);
            }
        }
        self.socket.send_to(payload, addr)
    }

    /// Receives a single packet from UDP socket.
    fn receive_packet<'a>(&mut self, buffer: &'a mut [u8]) -> io::Result<(&'a [u8], SocketAddr)> {
        let (recv_len, address) = self.socket.recv_from(buffer)?;
        Ok((&buffer[..recv_len], address))
    }

    /// Returns the socket address that this socket was created from.
    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Returns whether socket operates in blocking or non-blocking mode.
    fn is_blocking_mode(&self) -> bool {
        self.is_blocking_mode
    }
}

/// A reliable UDP socket implementation with configurable reliability and ordering guarantees.
#[derive(Debug)]
pub struct Socket<T: MomentInTime> {
    handler: ConnectionManager<SocketWithConditioner, VirtualConnection<T>>,
}

impl<T: MomentInTime> Socket<T> {
    /// Binds to the socket and then sets up `ActiveConnections` to manage the "connections".
    /// Because UDP connections are not persistent, we can only infer the status of the remote
    /// endpoint by looking to see if they are still sending packets or not
    pub fn bind<A: ToSocketAddrs>(addresses: A) -> Result<Self> {
        Self::bind_with_config(addresses, Config::default())
    }

    /// Binds to any local port on the system, if available
    pub fn bind_any() -> Result<Self> {
        Self::bind_any_with_config(Config::default())
    }

    /// Binds to any local port on the system, if available, with a given config
    pub fn bind_any_with_config(config: Config) -> Result<Self> {
        let loopback = Ipv4Addr::new(127, 0, 0, 1);
        let address = SocketAddrV4::new(loopback, 0);
        let socket = create_socket(address.into(), &config)?;
        Ok(Self::bind_internal(socket, config))
    }

    /// Binds to the socket and then sets up `ActiveConnections` to manage the "connections".
    /// Because UDP connections are not persistent, we can only infer the status of the remote
    /// endpoint by looking to see if they are still sending packets or not
    ///
    /// This function allows you to configure strand with the passed configuration.
    pub fn bind_with_config<A: ToSocketAddrs>(addresses: A, config: Config) -> Result<Self> {
        let address = addresses.to_socket_addrs()?.next().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "no address to bind to")
        })?;
        let socket = create_socket(address, &config)?;
        Ok(Self::bind_internal(socket, config))
    }

    fn bind_internal(socket: UdpSocket, config: Config) -> Self {
        Socket {
            handler: ConnectionManager::new(
                SocketWithConditioner::new(socket, config.blocking_mode),
                config,
            ),
        }
    }

    /// Returns a handle to the packet sender which provides a thread-safe way to enqueue packets
    /// to be processed. This should be used when the socket is busy running its polling loop in a
    /// separate thread.
    pub fn get_packet_sender(&self) -> Sender<Packet> {
        self.handler.event_sender().clone()
    }

    /// Returns a handle to the event receiver which provides a thread-safe way to retrieve events
    /// from the socket. This should be used when the socket is busy running its polling loop in
    /// a separate thread.
    pub fn get_event_receiver(&self) -> Receiver<SocketEvent> {
        self.handler.event_receiver().clone()
    }

    /// Queues a single packet; it goes out on the next poll.
    pub fn send(&mut self, packet: Packet) -> Result<()> {
        self.handler.event_sender().send(packet)?;
        Ok(())
    }

    /// Receives a single event
    pub fn recv(&mut self) -> Option<SocketEvent> {
        self.handler.event_receiver().try_recv().ok()
    }

    /// Runs the polling loop with the default '1ms' sleep duration. This should run in a spawned thread
    /// since calls to `self.manual_poll` are blocking.
    pub fn start_polling(&mut self) {
        self.start_polling_with_duration(Some(Duration::from_millis(1)))
    }

    /// Runs the polling loop with a specified sleep duration. This should run in a spawned thread
    /// since calls to `self.manual_poll` are blocking.
    pub fn start_polling_with_duration(&mut self, sleep_duration: Option<Duration>) {
        // nothing should break out of this loop!
        loop {
            self.manual_poll(T::now());
            match sleep_duration {
                None => yield_now(),
                Some(duration) => sleep(duration),
            };
        }
    }

    /// Processes any inbound/outbound packets and handle idle clients
    pub fn manual_poll(&mut self, time: T) {
        self.handler.manual_poll(time);
    }

    /// Returns the local socket address
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.handler.socket().local_addr()?)
    }

    /// Returns the traffic counters of the connection to `address`, if one is tracked.
    pub fn statistics(&self, address: &SocketAddr) -> Option<Statistics> {
        self.handler
            .connection(address)
            .map(VirtualConnection::statistics)
    }

    /// Sets the link conditioner for this socket. See [LinkConditioner] for further details.
    pub fn set_link_conditioner(&mut self, link_conditioner: Option<LinkConditioner>) {
        self.handler
            .socket_mut()
            .set_link_conditioner(link_conditioner);
    }
}

#[cfg(test)]
mod tests {
    use std::thread::sleep;
    use std::time::{Duration, Instant};

    use super::Socket;
    use crate::{Packet, SocketEvent};

    #[test]
    fn bind_rejects_garbage_addresses() {
        assert!(Socket::<Instant>::bind("not an address").is_err());
    }

    #[test]
    fn sockets_talk_over_loopback() {
        let mut server = Socket::<Instant>::bind_any().unwrap();
        let mut client = Socket::<Instant>::bind_any().unwrap();
        let server_address = server.local_addr().unwrap();

        client
            .send(Packet::reliable_ordered(
                server_address,
                b"over the wire".to_vec(),
                Some(1),
            ))
            .unwrap();

        for _ in 0..200 {
            let now = Instant::now();
            client.manual_poll(now);
            server.manual_poll(now);

            while let Some(event) = server.recv() {
                if let SocketEvent::Packet(packet) = event {
                    assert_eq!(packet.payload(), b"over the wire");
                    assert_eq!(packet.addr(), client.local_addr().unwrap());
                    assert!(server.statistics(&packet.addr()).is_some());
                    return;
                }
            }
            sleep(Duration::from_millis(5));
        }

        panic!("Packet did not arrive over loopback");
    }
}
