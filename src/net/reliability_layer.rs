use std::collections::VecDeque;
use std::mem;
use std::time::Duration;

use log::{debug, trace, warn};

use crate::cipher::BlockCipher;
use crate::config::Config;
use crate::error::{ErrorKind, Result};
use crate::infrastructure::arranging::{Arranging, ArrangingSystem, OrderingSystem, SequencingSystem};
use crate::infrastructure::{
    split_packet, AcknowledgmentHandler, CongestionWindow, Reassembly, SplitPacketAssembler,
};
use crate::net::constants::{MINIMUM_RESEND_DELAY, ORDERING_CHANNEL_COUNT, UDP_HEADER_SIZE};
use crate::net::{MomentInTime, Statistics};
use crate::packet::header::ArrangingHeader;
use crate::packet::{
    ChannelNumber, FrameWriter, InternalPacket, Message, PacketReader, Priority, Record,
    Reliability, PRIORITY_COUNT,
};

/// A datagram that only tells the remote host we are still there. `handle_datagram` ignores it.
pub(crate) const HEARTBEAT_DATAGRAM: &[u8] = &[0];

/// The per-connection protocol engine.
///
/// Turns a lossy, reordering, duplicating datagram transport into reliable, ordered, sequenced
/// and split-capable channels. It does no I/O on its own:
///
/// - `send` queues a message,
/// - `update` is called every few milliseconds and returns the next datagram to transmit,
/// - `handle_datagram` feeds a received datagram,
/// - `receive` hands out the messages that are ready.
///
/// Every call takes the current time, and all calls must come from the same thread.
#[derive(Debug)]
pub struct ReliabilityLayer<T: MomentInTime> {
    config: Config,
    send_queues: [VecDeque<InternalPacket>; PRIORITY_COUNT],
    acknowledgments: AcknowledgmentHandler<T>,
    congestion: CongestionWindow<T>,
    ordering_system: OrderingSystem<InternalPacket>,
    sequencing_system: SequencingSystem<InternalPacket>,
    split_packets: SplitPacketAssembler<T>,
    output: VecDeque<Message>,
    statistics: Statistics,
    cipher: Option<Box<dyn BlockCipher>>,
    // Set by a datagram full of acknowledgements, consumed by the next update
    window_growth_due: bool,
    dead: bool,
    tamper_detected: bool,
}

impl<T: MomentInTime> ReliabilityLayer<T> {
    /// Creates the layer for a new connection.
    pub fn new(config: &Config) -> ReliabilityLayer<T> {
        ReliabilityLayer {
            config: config.clone(),
            send_queues: Default::default(),
            acknowledgments: AcknowledgmentHandler::new(config),
            congestion: CongestionWindow::new(config),
            ordering_system: OrderingSystem::new(),
            sequencing_system: SequencingSystem::new(),
            split_packets: SplitPacketAssembler::new(config.max_split_count),
            output: VecDeque::new(),
            statistics: Statistics::default(),
            cipher: None,
            window_growth_due: false,
            dead: false,
            tamper_detected: false,
        }
    }

    /// Queues a byte-aligned message for sending.
    pub fn send(
        &mut self,
        payload: &[u8],
        priority: Priority,
        reliability: Reliability,
        channel: ChannelNumber,
        time: T,
    ) -> Result<()> {
        self.send_bits(payload, payload.len() * 8, priority, reliability, channel, time)
    }

    /// Queues a message of `bit_length` bits, taken from the front of `payload`.
    ///
    /// Messages too large for one datagram are split. Nothing is queued when an error is returned.
    pub fn send_bits(
        &mut self,
        payload: &[u8],
        bit_length: usize,
        priority: Priority,
        reliability: Reliability,
        channel: ChannelNumber,
        time: T,
    ) -> Result<()> {
        if bit_length == 0 {
            return Err(ErrorKind::EmptyPayload);
        }
        if bit_length > payload.len() * 8 {
            return Err(ErrorKind::BitLengthOutOfRange {
                bits: bit_length,
                available: payload.len() * 8,
            });
        }
        if channel >= ORDERING_CHANNEL_COUNT {
            return Err(ErrorKind::ChannelOutOfRange(channel));
        }
        self.check_timeout(time);
        if self.dead {
            return Err(ErrorKind::ConnectionDead);
        }

        let frame_bits = self.frame_bits();
        let unsplit_bits = InternalPacket::header_bit_length_for(reliability, false) + bit_length;
        let packets = if unsplit_bits > frame_bits {
            split_packet(
                reliability,
                payload,
                bit_length,
                None,
                frame_bits,
                self.config.max_split_count,
            )?
        } else {
            let bytes = &payload[..(bit_length + 7) / 8];
            vec![InternalPacket::new(reliability, bytes.into(), bit_length)]
        };

        let arranging = if reliability.is_ordered() {
            let stream = self.ordering_system.get_or_create_stream(channel);
            Some(ArrangingHeader::new(channel, stream.new_item_identifier()))
        } else if reliability.is_sequenced() {
            let stream = self.sequencing_system.get_or_create_stream(channel);
            Some(ArrangingHeader::new(channel, stream.new_item_identifier()))
        } else {
            None
        };

        let index = priority.index();
        if packets.len() > 1 {
            self.statistics.split_messages += 1;
            self.statistics.total_splits += packets.len() as u64;
        } else {
            self.statistics.unsplit_messages += 1;
        }
        self.statistics.messages_sent[index] += 1;
        self.statistics.message_data_bits_sent[index] += bit_length as u64;

        trace!(
            "Queued {:?} message of {} bits in {} packet(s) on channel {}",
            reliability,
            bit_length,
            packets.len(),
            channel
        );
        for packet in packets {
            let mut packet = packet.with_arranging(arranging);
            if reliability.is_reliable() {
                packet = packet.with_sequence(self.acknowledgments.next_sequence_number());
            }
            self.send_queues[index].push_back(packet);
        }
        Ok(())
    }

    /// Processes a datagram received from the remote host.
    ///
    /// Datagrams of at most one byte are heartbeats and carry nothing. Returns false when the
    /// datagram was corrupt or failed to decrypt; the remote host should be considered
    /// malfunctioning or hostile.
    pub fn handle_datagram(&mut self, datagram: &[u8], time: T) -> bool {
        if datagram.len() <= 1 || self.dead {
            return true;
        }
        self.statistics.packets_received += 1;
        self.statistics.total_bits_received += datagram.len() as u64 * 8;

        let decrypted;
        let plain = match &mut self.cipher {
            Some(cipher) => match cipher.decrypt(datagram) {
                Ok(bytes) => {
                    decrypted = bytes;
                    decrypted.as_slice()
                }
                Err(e) => {
                    warn!("Dropping datagram that failed to decrypt: {}", e);
                    self.statistics.packets_with_bad_crc_received += 1;
                    self.tamper_detected = true;
                    return false;
                }
            },
            None => datagram,
        };

        let mut acknowledgements = 0;
        for record in PacketReader::new(plain) {
            match record {
                Ok(Record::Acknowledgement(sequence)) => {
                    if self.handle_acknowledgement(sequence, time) {
                        acknowledgements += 1;
                    }
                }
                Ok(Record::Data(packet)) => self.handle_packet(packet, time),
                Err(e) => {
                    warn!("Dropping the rest of a corrupt datagram: {}", e);
                    self.statistics.invalid_messages_received += 1;
                    self.tamper_detected = true;
                    return false;
                }
            }
        }

        // low priority traffic alone does not grow the window
        let data_waiting = self.send_queues[..Priority::Low.index()]
            .iter()
            .any(|queue| !queue.is_empty());
        if acknowledgements >= self.congestion.size() && data_waiting {
            self.window_growth_due = true;
        }
        true
    }

    /// Returns the next message ready for the application, if any.
    pub fn receive(&mut self) -> Option<Message> {
        self.output.pop_front()
    }

    /// Assembles the next datagram to send: acknowledgements, due resends and queued messages,
    /// in that order and by priority.
    ///
    /// Returns `None` when nothing is due or the connection is dead.
    pub fn update(&mut self, time: T) -> Option<Vec<u8>> {
        if self.dead {
            return None;
        }
        self.statistics.expired_split_messages += self
            .split_packets
            .expire(time, self.config.split_packet_timeout) as u64;
        self.check_timeout(time);
        if self.dead {
            return None;
        }
        // at most one step per update, however many datagrams arrived
        if mem::take(&mut self.window_growth_due) {
            self.congestion.on_acks(time);
        }

        let mut frame = FrameWriter::new(self.frame_bits());
        if self
            .acknowledgments
            .acknowledgements_due(time, self.config.min_window_size)
        {
            self.write_acknowledgements(&mut frame);
        }

        if !self.write_resends(&mut frame, time) {
            return None;
        }
        self.write_new_packets(&mut frame, time);

        // acknowledgements ride along with data
        if !frame.is_empty() {
            self.write_acknowledgements(&mut frame);
        }
        if frame.is_empty() {
            return None;
        }

        let plain = frame.into_bytes();
        let datagram = match &mut self.cipher {
            Some(cipher) => {
                let encrypted = cipher.encrypt(&plain);
                self.statistics.encryption_bits_sent +=
                    encrypted.len().saturating_sub(plain.len()) as u64 * 8;
                encrypted
            }
            None => plain,
        };
        self.statistics.packets_sent += 1;
        self.statistics.total_bits_sent += datagram.len() as u64 * 8;
        Some(datagram)
    }

    /// Returns a snapshot of the traffic counters and queue sizes.
    pub fn statistics(&self) -> Statistics {
        let mut statistics = self.statistics.clone();
        for (size, queue) in statistics
            .message_send_buffer
            .iter_mut()
            .zip(self.send_queues.iter())
        {
            *size = queue.len();
        }
        statistics.acknowledgements_pending = self.acknowledgments.pending_acknowledgements();
        statistics.messages_on_resend_queue = self.acknowledgments.packets_in_flight();
        statistics.messages_waiting_for_reassembly = self.split_packets.len();
        statistics.messages_waiting_for_order = self.ordering_system.buffered();
        statistics.output_queue_size = self.output.len();
        statistics.window_size = self.congestion.size();
        statistics.lossy_window_size = self.congestion.lossy_size().unwrap_or(0);
        statistics.round_trip_time = self.acknowledgments.rtt().smoothed();
        statistics
    }

    /// Returns true once the remote host stopped acknowledging reliable data.
    ///
    /// A dead connection stays dead: `send` fails and `update` produces nothing.
    pub fn is_dead_connection(&self) -> bool {
        self.dead
    }

    /// Returns true once a corrupt datagram was received.
    pub fn is_tamper_detected(&self) -> bool {
        self.tamper_detected
    }

    /// Returns true while anything is waiting to be sent or acknowledged.
    pub fn is_data_waiting(&self) -> bool {
        self.send_queues.iter().any(|queue| !queue.is_empty())
            || self.acknowledgments.packets_in_flight() > 0
            || self.acknowledgments.pending_acknowledgements() > 0
    }

    /// Declares the connection dead and releases every queue.
    pub fn kill_connection(&mut self) {
        self.dead = true;
        self.release();
    }

    /// Returns to the state of a fresh connection. The cipher stays installed.
    pub fn reset(&mut self) {
        self.release();
        self.output.clear();
        self.statistics = Statistics::default();
        self.dead = false;
        self.tamper_detected = false;
    }

    /// Changes the initial resend delay; the window growth interval follows at twice that.
    pub fn set_resend_delay(&mut self, resend_after: Duration) {
        let resend_after = resend_after.max(MINIMUM_RESEND_DELAY);
        self.acknowledgments.set_resend_delay(resend_after);
        self.congestion.set_increase_interval(resend_after * 2);
    }

    /// Installs or removes the cipher applied to every datagram.
    pub fn set_cipher(&mut self, cipher: Option<Box<dyn BlockCipher>>) {
        self.cipher = cipher;
    }

    // The number of bits one datagram may carry.
    fn frame_bits(&self) -> usize {
        let overhead = self.cipher.as_ref().map_or(0, |cipher| cipher.overhead());
        self.config
            .mtu()
            .saturating_sub(UDP_HEADER_SIZE + overhead)
            * 8
    }

    fn check_timeout(&mut self, time: T) {
        if !self.dead
            && self
                .acknowledgments
                .is_timed_out(time, self.config.connection_timeout)
        {
            warn!(
                "Connection dead: no acknowledgement within {:?}",
                self.config.connection_timeout
            );
            self.kill_connection();
        }
    }

    fn release(&mut self) {
        self.window_growth_due = false;
        for queue in self.send_queues.iter_mut() {
            queue.clear();
        }
        self.acknowledgments.clear();
        self.congestion.reset();
        self.ordering_system.reset();
        self.sequencing_system.reset();
        self.split_packets.clear();
    }

    fn write_acknowledgements(&mut self, frame: &mut FrameWriter) {
        while frame.fits_acknowledgement() {
            let sequence = match self.acknowledgments.pop_acknowledgement() {
                Some(sequence) => sequence,
                None => break,
            };
            let bits = frame.write_acknowledgement(sequence);
            self.statistics.acknowledgements_sent += 1;
            self.statistics.acknowledgement_bits_sent += bits as u64;
        }
    }

    // Returns false when a packet ran out of retries and the connection died.
    fn write_resends(&mut self, frame: &mut FrameWriter, time: T) -> bool {
        let mut resent = false;
        for sequence in self.acknowledgments.due_resends(time) {
            let sent = match self.acknowledgments.sent_packet(sequence) {
                Some(sent) => sent,
                None => continue,
            };
            if sent.retries >= self.config.max_retries {
                warn!(
                    "Connection dead: packet {} was resent {} times without acknowledgement",
                    sequence, sent.retries
                );
                self.kill_connection();
                return false;
            }
            if !frame.fits_packet(&sent.packet) && !frame.is_empty() {
                break;
            }

            let bits = frame.write_packet(&sent.packet);
            self.statistics.messages_resent += 1;
            self.statistics.message_data_bits_resent += sent.packet.bit_length() as u64;
            self.statistics.message_total_bits_resent += bits as u64;
            trace!("Resending packet {} after {} retries", sequence, sent.retries);

            self.acknowledgments.reschedule(sequence, time);
            resent = true;
        }

        if resent {
            self.congestion.on_loss(time);
        }
        true
    }

    fn write_new_packets(&mut self, frame: &mut FrameWriter, time: T) {
        for priority in Priority::ALL.iter() {
            let index = priority.index();
            while let Some(packet) = self.send_queues[index].pop_front() {
                if self
                    .congestion
                    .is_throttled(self.acknowledgments.packets_in_flight())
                {
                    self.send_queues[index].push_front(packet);
                    return;
                }
                if !frame.fits_packet(&packet) && !frame.is_empty() {
                    self.send_queues[index].push_front(packet);
                    break;
                }

                let bits = frame.write_packet(&packet);
                self.statistics.message_total_bits_sent[index] += bits as u64;
                if packet.reliability().is_reliable() {
                    self.acknowledgments.process_outgoing(packet, time);
                }
            }
        }
    }

    // Returns true when the acknowledgement matched a packet in flight.
    fn handle_acknowledgement(&mut self, sequence: u16, time: T) -> bool {
        let in_flight = self.acknowledgments.packets_in_flight();
        match self.acknowledgments.process_acknowledgment(sequence, time) {
            Some(_) => {
                self.statistics.acknowledgements_received += 1;
                self.statistics.superseded_messages_dropped +=
                    (in_flight - 1 - self.acknowledgments.packets_in_flight()) as u64;
                true
            }
            None => {
                self.statistics.duplicate_acknowledgements_received += 1;
                false
            }
        }
    }

    fn handle_packet(&mut self, packet: InternalPacket, time: T) {
        self.statistics.messages_received += 1;

        if let Some(sequence) = packet.sequence() {
            if !self.acknowledgments.process_incoming(sequence, time) {
                debug!("Dropping duplicate packet {}", sequence);
                self.statistics.duplicate_messages_received += 1;
                return;
            }
        }

        let packet = match self.split_packets.insert(packet, time) {
            Ok(Reassembly::Complete(packet)) => packet,
            Ok(Reassembly::Pending) => return,
            Ok(Reassembly::Duplicate) => {
                self.statistics.duplicate_messages_received += 1;
                return;
            }
            Err(e) => {
                debug!("Dropping split packet: {}", e);
                self.statistics.invalid_messages_received += 1;
                return;
            }
        };

        let reliability = packet.reliability();
        match packet.arranging() {
            Some(arranging) if reliability.is_sequenced() => {
                let stream = self.sequencing_system.get_or_create_stream(arranging.channel());
                if arranging.index() == stream.expected_index() {
                    self.statistics.sequenced_messages_in_order += 1;
                } else {
                    self.statistics.sequenced_messages_out_of_order += 1;
                }

                match stream.arrange(arranging.index(), packet) {
                    Some(packet) => self.output.push_back(into_message(packet)),
                    None => debug!(
                        "Dropping stale sequenced message {} on channel {}",
                        arranging.index(),
                        arranging.channel()
                    ),
                }
            }
            Some(arranging) if reliability.is_ordered() => {
                let stream = self.ordering_system.get_or_create_stream(arranging.channel());
                if arranging.index() == stream.expected_index() {
                    self.statistics.ordered_messages_in_order += 1;
                } else {
                    self.statistics.ordered_messages_out_of_order += 1;
                }

                if let Some(packet) = stream.arrange(arranging.index(), packet) {
                    self.output.push_back(into_message(packet));
                    self.output.extend(stream.iter_mut().map(into_message));
                }
            }
            _ => self.output.push_back(into_message(packet)),
        }
    }
}

fn into_message(packet: InternalPacket) -> Message {
    let bit_length = packet.bit_length();
    let reliability = packet.reliability();
    let channel = packet.arranging().map_or(0, |arranging| arranging.channel());
    Message::new(packet.into_payload(), bit_length, reliability, channel)
}
