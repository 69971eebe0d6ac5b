use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::Duration;

use linked_hash_set::LinkedHashSet;

use super::RttEstimator;
use crate::config::Config;
use crate::net::MomentInTime;
use crate::packet::{ChannelNumber, InternalPacket, OrderingIndex, Reliability, SequenceNumber};
use crate::sequence_buffer::{sequence_less_than, ReceivedWindow};

const DEFAULT_SEND_PACKETS_SIZE: usize = 256;
// 2^16 times the resend delay is far beyond any sensible ceiling
const MAX_BACKOFF_SHIFT: u32 = 16;

/// Responsible for handling the acknowledgment of packets.
///
/// Outgoing: reliable packets wait here until acknowledged, each with its own resend deadline.
/// Incoming: sequence numbers of received reliable packets are queued as acknowledgements and
/// checked against the duplicate window.
#[derive(Debug)]
pub struct AcknowledgmentHandler<T: MomentInTime> {
    // Packets will be resent after at least this delay, doubling on every retry
    resend_after: Duration,
    max_resend_delay: Duration,
    // Acknowledgements may wait this long for data to piggyback on
    ack_delay: Duration,
    // Local sequence number which we'll bump each time we enqueue a reliable packet.
    sequence_number: SequenceNumber,
    sent_packets: HashMap<SequenceNumber, SentPacket<T>>,
    // Acknowledgements we still owe the remote host, oldest first.
    pending_acks: LinkedHashSet<SequenceNumber>,
    oldest_pending_ack: Option<T>,
    received_packets: ReceivedWindow<T>,
    rtt: RttEstimator,
    // Running while reliable data is unacknowledged, restarted by every acknowledgement.
    last_ack: Option<T>,
}

impl<T: MomentInTime> AcknowledgmentHandler<T> {
    /// Constructs a new `AcknowledgmentHandler` with which you can perform acknowledgment operations.
    pub fn new(config: &Config) -> Self {
        AcknowledgmentHandler {
            resend_after: config.resend_after(),
            max_resend_delay: config.max_resend_delay,
            ack_delay: config.ack_delay,
            sequence_number: 0,
            sent_packets: HashMap::with_capacity(DEFAULT_SEND_PACKETS_SIZE),
            pending_acks: LinkedHashSet::new(),
            oldest_pending_ack: None,
            received_packets: ReceivedWindow::new(config.receive_hole_timeout),
            rtt: RttEstimator::new(config.rtt_smoothing_factor),
            last_ack: None,
        }
    }

    /// Returns the current number of not yet acknowledged packets
    pub fn packets_in_flight(&self) -> usize {
        self.sent_packets.len()
    }

    /// Returns the number of acknowledgements waiting to be sent.
    pub fn pending_acknowledgements(&self) -> usize {
        self.pending_acks.len()
    }

    /// Returns the round-trip estimation.
    pub fn rtt(&self) -> &RttEstimator {
        &self.rtt
    }

    /// Returns the sequence number for the next reliable packet and bumps the counter.
    pub fn next_sequence_number(&mut self) -> SequenceNumber {
        let sequence = self.sequence_number;
        self.sequence_number = self.sequence_number.wrapping_add(1);
        sequence
    }

    /// Returns the acknowledgement-pending entry for the sequence number.
    pub fn sent_packet(&self, sequence: SequenceNumber) -> Option<&SentPacket<T>> {
        self.sent_packets.get(&sequence)
    }

    /// Enqueues a reliable packet, just written to a frame, for acknowledgment.
    pub fn process_outgoing(&mut self, packet: InternalPacket, now: T) {
        let sequence = match packet.sequence() {
            Some(sequence) => sequence,
            None => return,
        };

        if self.last_ack.is_none() {
            self.last_ack = Some(now);
        }
        self.sent_packets.insert(
            sequence,
            SentPacket {
                packet,
                first_sent: now,
                next_resend: now.after(self.backoff(0)),
                retries: 0,
            },
        );
    }

    /// Process the sequence number of an incoming reliable packet.
    ///
    /// The number is always acknowledged, so a lost acknowledgement gets repeated. Returns false
    /// when the packet was received before and must be dropped.
    pub fn process_incoming(&mut self, sequence: SequenceNumber, now: T) -> bool {
        if self.pending_acks.insert(sequence) && self.oldest_pending_ack.is_none() {
            self.oldest_pending_ack = Some(now);
        }
        self.received_packets.insert(sequence, now)
    }

    /// Process an acknowledgement from the remote host.
    ///
    /// Returns the entry it acknowledged, `None` for acknowledgements of unknown packets.
    pub fn process_acknowledgment(
        &mut self,
        sequence: SequenceNumber,
        now: T,
    ) -> Option<SentPacket<T>> {
        let acked = self.sent_packets.remove(&sequence);
        if let Some(sent) = &acked {
            // a resent packet can't tell which copy got acknowledged
            if sent.retries == 0 {
                self.rtt.update(now.duration_since(sent.first_sent));
            }
            if sent.packet.reliability() == Reliability::ReliableSequenced {
                if let Some(arranging) = sent.packet.arranging() {
                    self.purge_superseded(arranging.channel(), arranging.index());
                }
            }
        }

        self.last_ack = if self.sent_packets.is_empty() {
            None
        } else {
            Some(now)
        };
        acked
    }

    /// Drops reliable-sequenced packets on the channel that are older than `index`.
    ///
    /// Returns the number of dropped packets.
    pub fn purge_superseded(&mut self, channel: ChannelNumber, index: OrderingIndex) -> usize {
        let before = self.sent_packets.len();
        self.sent_packets.retain(|_, sent| {
            let superseded = sent.packet.reliability() == Reliability::ReliableSequenced
                && sent.packet.arranging().map_or(false, |arranging| {
                    arranging.channel() == channel && sequence_less_than(arranging.index(), index)
                });
            !superseded
        });
        before - self.sent_packets.len()
    }

    /// Returns the sequence numbers of packets whose resend deadline passed, earliest first.
    pub fn due_resends(&self, now: T) -> Vec<SequenceNumber> {
        let mut due: Vec<(SequenceNumber, T)> = self
            .sent_packets
            .iter()
            .filter(|(_, sent)| sent.next_resend <= now)
            .map(|(sequence, sent)| (*sequence, sent.next_resend))
            .collect();
        due.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        due.into_iter().map(|(sequence, _)| sequence).collect()
    }

    /// Records that the packet was resent and schedules the next attempt.
    pub fn reschedule(&mut self, sequence: SequenceNumber, now: T) {
        if let Some(retries) = self.sent_packets.get(&sequence).map(|sent| sent.retries + 1) {
            let next_resend = now.after(self.backoff(retries));
            if let Some(sent) = self.sent_packets.get_mut(&sequence) {
                sent.retries = retries;
                sent.next_resend = next_resend;
            }
        }
    }

    /// Returns true when reliable data went unacknowledged for longer than `timeout`.
    pub fn is_timed_out(&self, now: T, timeout: Duration) -> bool {
        !self.sent_packets.is_empty()
            && self
                .last_ack
                .map_or(false, |last| now.duration_since(last) > timeout)
    }

    /// Returns true when acknowledgements should be sent even without data to piggyback on.
    pub fn acknowledgements_due(&self, now: T, batch_size: usize) -> bool {
        if self.pending_acks.is_empty() {
            return false;
        }
        self.pending_acks.len() >= batch_size
            || self
                .oldest_pending_ack
                .map_or(true, |oldest| now.duration_since(oldest) >= self.ack_delay)
    }

    /// Removes the oldest acknowledgement we owe.
    pub fn pop_acknowledgement(&mut self) -> Option<SequenceNumber> {
        let sequence = self.pending_acks.pop_front();
        if self.pending_acks.is_empty() {
            self.oldest_pending_ack = None;
        }
        sequence
    }

    /// Changes the initial resend delay. The acknowledgement delay follows at a quarter of it.
    pub fn set_resend_delay(&mut self, resend_after: Duration) {
        self.resend_after = resend_after;
        self.ack_delay = resend_after / 4;
    }

    /// Forgets every packet and acknowledgement, as for a new connection.
    pub fn clear(&mut self) {
        self.sequence_number = 0;
        self.sent_packets.clear();
        self.pending_acks.clear();
        self.oldest_pending_ack = None;
        self.received_packets.clear();
        self.rtt.reset();
        self.last_ack = None;
    }

    // Delay before the attempt following `retries` resends.
    fn backoff(&self, retries: u32) -> Duration {
        let timeout = self
            .resend_after
            .max(self.rtt.retransmission_timeout())
            .min(self.max_resend_delay);
        timeout
            .saturating_mul(1 << retries.min(MAX_BACKOFF_SHIFT))
            .min(self.max_resend_delay)
    }
}

/// A reliable packet waiting for its acknowledgement.
#[derive(Clone, Debug, PartialEq)]
pub struct SentPacket<T: MomentInTime> {
    pub packet: InternalPacket,
    pub first_sent: T,
    pub next_resend: T,
    pub retries: u32,
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::AcknowledgmentHandler;
    use crate::config::Config;
    use crate::packet::header::ArrangingHeader;
    use crate::packet::{InternalPacket, Reliability};

    fn config() -> Config {
        Config {
            resend_after: Duration::from_millis(200),
            max_resend_delay: Duration::from_secs(1),
            ack_delay: Duration::from_millis(50),
            ..Default::default()
        }
    }

    fn send(
        handler: &mut AcknowledgmentHandler<Instant>,
        reliability: Reliability,
        now: Instant,
    ) -> u16 {
        let sequence = handler.next_sequence_number();
        let packet =
            InternalPacket::new(reliability, vec![1, 2, 3].into(), 24).with_sequence(sequence);
        handler.process_outgoing(packet, now);
        sequence
    }

    fn sequenced(
        handler: &mut AcknowledgmentHandler<Instant>,
        channel: u8,
        index: u16,
        now: Instant,
    ) -> u16 {
        let sequence = handler.next_sequence_number();
        let packet = InternalPacket::new(Reliability::ReliableSequenced, vec![1].into(), 8)
            .with_sequence(sequence)
            .with_arranging(Some(ArrangingHeader::new(channel, index)));
        handler.process_outgoing(packet, now);
        sequence
    }

    #[test]
    fn local_seq_num_wraps_on_overflow() {
        let mut handler = AcknowledgmentHandler::<Instant>::new(&config());
        handler.sequence_number = u16::max_value();
        assert_eq!(handler.next_sequence_number(), u16::max_value());
        assert_eq!(handler.next_sequence_number(), 0);
    }

    #[test]
    fn unreliable_packets_are_not_tracked() {
        let mut handler = AcknowledgmentHandler::new(&config());
        let packet = InternalPacket::new(Reliability::Unreliable, vec![1].into(), 8);
        handler.process_outgoing(packet, Instant::now());
        assert_eq!(handler.packets_in_flight(), 0);
    }

    #[test]
    fn resends_follow_the_doubling_schedule() {
        let start = Instant::now();
        let mut handler = AcknowledgmentHandler::new(&config());
        let sequence = send(&mut handler, Reliability::Reliable, start);

        let mut resent_at = Vec::new();
        for tick in 0..=200u64 {
            let now = start + Duration::from_millis(tick * 10);
            for due in handler.due_resends(now) {
                assert_eq!(due, sequence);
                resent_at.push(tick * 10);
                handler.reschedule(due, now);
            }
        }
        // 200, then 400 and 800 later; the next one is capped at a second
        assert_eq!(resent_at, vec![200, 600, 1400]);
        assert_eq!(handler.sent_packet(sequence).map(|sent| sent.retries), Some(3));
    }

    #[test]
    fn acknowledged_packet_is_not_resent() {
        let start = Instant::now();
        let mut handler = AcknowledgmentHandler::new(&config());
        let sequence = send(&mut handler, Reliability::Reliable, start);

        let later = start + Duration::from_millis(300);
        assert_eq!(handler.due_resends(later), vec![sequence]);
        handler.reschedule(sequence, later);

        assert!(handler.process_acknowledgment(sequence, later).is_some());
        assert!(handler.due_resends(start + Duration::from_secs(10)).is_empty());
        assert!(handler.process_acknowledgment(sequence, later).is_none());
    }

    #[test]
    fn first_transmission_ack_measures_rtt() {
        let start = Instant::now();
        let mut handler = AcknowledgmentHandler::new(&config());
        let first = send(&mut handler, Reliability::Reliable, start);
        let second = send(&mut handler, Reliability::Reliable, start);

        handler.reschedule(second, start);
        handler.process_acknowledgment(second, start + Duration::from_millis(500));
        assert_eq!(handler.rtt().smoothed(), None);

        handler.process_acknowledgment(first, start + Duration::from_millis(40));
        assert_eq!(handler.rtt().smoothed(), Some(Duration::from_millis(40)));
    }

    #[test]
    fn due_resends_come_earliest_first() {
        let start = Instant::now();
        let mut handler = AcknowledgmentHandler::new(&config());
        let late = send(&mut handler, Reliability::Reliable, start + Duration::from_millis(50));
        let early = send(&mut handler, Reliability::Reliable, start);

        assert_eq!(
            handler.due_resends(start + Duration::from_secs(1)),
            vec![early, late]
        );
    }

    #[test]
    fn duplicates_are_acknowledged_but_reported() {
        let now = Instant::now();
        let mut handler = AcknowledgmentHandler::<Instant>::new(&config());
        assert!(handler.process_incoming(7, now));
        assert_eq!(handler.pop_acknowledgement(), Some(7));

        assert!(!handler.process_incoming(7, now));
        assert_eq!(handler.pending_acknowledgements(), 1);
    }

    #[test]
    fn acknowledgements_wait_for_a_batch_or_the_delay() {
        let start = Instant::now();
        let mut handler = AcknowledgmentHandler::<Instant>::new(&config());
        assert!(!handler.acknowledgements_due(start, 3));

        handler.process_incoming(0, start);
        handler.process_incoming(1, start);
        assert!(!handler.acknowledgements_due(start, 3));
        assert!(handler.acknowledgements_due(start + Duration::from_millis(50), 3));

        handler.process_incoming(2, start);
        assert!(handler.acknowledgements_due(start, 3));

        assert_eq!(handler.pop_acknowledgement(), Some(0));
        while handler.pop_acknowledgement().is_some() {}
        assert!(!handler.acknowledgements_due(start + Duration::from_secs(1), 3));
    }

    #[test]
    fn newer_sequenced_ack_purges_older_sends() {
        let now = Instant::now();
        let mut handler = AcknowledgmentHandler::new(&config());
        sequenced(&mut handler, 1, 0, now);
        sequenced(&mut handler, 1, 1, now);
        sequenced(&mut handler, 2, 0, now);
        let newest = sequenced(&mut handler, 1, 2, now);
        send(&mut handler, Reliability::Reliable, now);

        handler.process_acknowledgment(newest, now);
        // the other channel and the plain reliable packet stay
        assert_eq!(handler.packets_in_flight(), 2);
    }

    #[test]
    fn timeout_runs_only_while_data_is_unacknowledged() {
        let start = Instant::now();
        let timeout = Duration::from_secs(10);
        let mut handler = AcknowledgmentHandler::new(&config());
        assert!(!handler.is_timed_out(start + Duration::from_secs(60), timeout));

        let first = send(&mut handler, Reliability::Reliable, start);
        send(&mut handler, Reliability::Reliable, start);
        assert!(!handler.is_timed_out(start + Duration::from_secs(10), timeout));
        assert!(handler.is_timed_out(start + Duration::from_secs(11), timeout));

        // an acknowledgement restarts the timer
        handler.process_acknowledgment(first, start + Duration::from_secs(5));
        assert!(!handler.is_timed_out(start + Duration::from_secs(11), timeout));
        assert!(handler.is_timed_out(start + Duration::from_secs(16), timeout));
    }

    #[test]
    fn clear_forgets_everything() {
        let now = Instant::now();
        let mut handler = AcknowledgmentHandler::new(&config());
        send(&mut handler, Reliability::Reliable, now);
        handler.process_incoming(3, now);
        handler.clear();

        assert_eq!(handler.packets_in_flight(), 0);
        assert_eq!(handler.pending_acknowledgements(), 0);
        assert_eq!(handler.next_sequence_number(), 0);
        assert!(handler.process_incoming(3, now));
    }
}
