use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use crate::packet::{Priority, PRIORITY_COUNT};

/// Counters describing the traffic of one connection.
///
/// Obtained through `ReliabilityLayer::statistics`; the counters only ever grow, the gauges at the
/// bottom describe the moment the snapshot was taken.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Statistics {
    /// Messages accepted for sending, per priority.
    pub messages_sent: [u64; PRIORITY_COUNT],
    /// Payload bits accepted for sending, per priority.
    pub message_data_bits_sent: [u64; PRIORITY_COUNT],
    /// Encoded bits of first transmissions, headers included, per priority.
    pub message_total_bits_sent: [u64; PRIORITY_COUNT],

    /// Acknowledgement records sent.
    pub acknowledgements_sent: u64,
    /// Bits used by acknowledgement records.
    pub acknowledgement_bits_sent: u64,
    /// Packets sent again because their acknowledgement did not arrive in time.
    pub messages_resent: u64,
    /// Payload bits of resent packets.
    pub message_data_bits_resent: u64,
    /// Encoded bits of resent packets, headers included.
    pub message_total_bits_resent: u64,
    /// Reliable-sequenced packets that were dropped from the resend queue after a newer one
    /// was acknowledged.
    pub superseded_messages_dropped: u64,
    /// Datagrams produced.
    pub packets_sent: u64,
    /// Bits in the datagrams produced, after encryption.
    pub total_bits_sent: u64,
    /// Bits added by the cipher.
    pub encryption_bits_sent: u64,

    /// Acknowledgement records received that matched a packet in flight.
    pub acknowledgements_received: u64,
    /// Acknowledgement records received for packets no longer in flight.
    pub duplicate_acknowledgements_received: u64,
    /// Data records received.
    pub messages_received: u64,
    /// Datagrams that failed to decode.
    pub invalid_messages_received: u64,
    /// Reliable packets received more than once.
    pub duplicate_messages_received: u64,
    /// Datagrams received.
    pub packets_received: u64,
    /// Datagrams the cipher rejected.
    pub packets_with_bad_crc_received: u64,
    /// Bits in the datagrams received.
    pub total_bits_received: u64,
    /// Sequenced messages that were delivered at their expected index.
    pub sequenced_messages_in_order: u64,
    /// Sequenced messages that skipped ahead or were dropped as stale.
    pub sequenced_messages_out_of_order: u64,
    /// Ordered messages that arrived at their expected index.
    pub ordered_messages_in_order: u64,
    /// Ordered messages that had to wait for a gap or were dropped as old.
    pub ordered_messages_out_of_order: u64,
    /// Messages that fitted into one packet.
    pub unsplit_messages: u64,
    /// Messages that had to be split.
    pub split_messages: u64,
    /// Fragments produced by splitting.
    pub total_splits: u64,
    /// Incomplete unreliable split messages dropped after the split timeout.
    pub expired_split_messages: u64,

    /// Gauge: packets waiting to be sent, per priority.
    pub message_send_buffer: [usize; PRIORITY_COUNT],
    /// Gauge: acknowledgements waiting to be sent.
    pub acknowledgements_pending: usize,
    /// Gauge: reliable packets waiting for their acknowledgement.
    pub messages_on_resend_queue: usize,
    /// Gauge: split messages waiting for fragments.
    pub messages_waiting_for_reassembly: usize,
    /// Gauge: ordered messages waiting for a gap to close.
    pub messages_waiting_for_order: usize,
    /// Gauge: messages ready to be received by the application.
    pub output_queue_size: usize,
    /// Gauge: the congestion window.
    pub window_size: usize,
    /// Gauge: the lossy window ceiling, zero while unbounded.
    pub lossy_window_size: usize,
    /// Gauge: smoothed round trip time, once an acknowledgement has been timed.
    pub round_trip_time: Option<Duration>,
}

impl Statistics {
    /// Returns the bits sent over all priorities, headers included.
    pub fn message_bits_sent(&self) -> u64 {
        self.message_total_bits_sent.iter().sum()
    }

    /// Returns the share of sent packets that had to be resent.
    pub fn packet_loss(&self) -> f64 {
        let sent: u64 = self.messages_sent.iter().sum();
        if sent == 0 {
            0.0
        } else {
            self.messages_resent as f64 / sent as f64
        }
    }
}

impl Display for Statistics {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "Messages in send buffer:")?;
        for priority in Priority::ALL.iter() {
            writeln!(
                f,
                "  {:?}: {}",
                priority,
                self.message_send_buffer[priority.index()]
            )?;
        }
        writeln!(f, "Messages sent ({} bits):", self.message_bits_sent())?;
        for priority in Priority::ALL.iter() {
            let index = priority.index();
            writeln!(
                f,
                "  {:?}: {} ({} data bits, {} total bits)",
                priority,
                self.messages_sent[index],
                self.message_data_bits_sent[index],
                self.message_total_bits_sent[index]
            )?;
        }
        writeln!(
            f,
            "Acknowledgements sent: {} ({} bits), pending: {}",
            self.acknowledgements_sent, self.acknowledgement_bits_sent, self.acknowledgements_pending
        )?;
        writeln!(
            f,
            "Messages resent: {} ({} data bits, {} total bits), on resend queue: {}",
            self.messages_resent,
            self.message_data_bits_resent,
            self.message_total_bits_resent,
            self.messages_on_resend_queue
        )?;
        writeln!(
            f,
            "Packets sent: {} ({} bits, {} encryption bits)",
            self.packets_sent, self.total_bits_sent, self.encryption_bits_sent
        )?;
        writeln!(
            f,
            "Acknowledgements received: {} ({} duplicate)",
            self.acknowledgements_received, self.duplicate_acknowledgements_received
        )?;
        writeln!(
            f,
            "Messages received: {} ({} invalid, {} duplicate)",
            self.messages_received, self.invalid_messages_received, self.duplicate_messages_received
        )?;
        writeln!(
            f,
            "Packets received: {} ({} bits, {} with bad CRC)",
            self.packets_received, self.total_bits_received, self.packets_with_bad_crc_received
        )?;
        writeln!(
            f,
            "Sequenced messages: {} in order, {} out of order",
            self.sequenced_messages_in_order, self.sequenced_messages_out_of_order
        )?;
        writeln!(
            f,
            "Ordered messages: {} in order, {} out of order, {} waiting",
            self.ordered_messages_in_order,
            self.ordered_messages_out_of_order,
            self.messages_waiting_for_order
        )?;
        writeln!(
            f,
            "Split messages: {} ({} fragments), unsplit: {}, expired: {}, waiting: {}",
            self.split_messages,
            self.total_splits,
            self.unsplit_messages,
            self.expired_split_messages,
            self.messages_waiting_for_reassembly
        )?;
        writeln!(f, "Output queue: {}", self.output_queue_size)?;
        if let Some(rtt) = self.round_trip_time {
            writeln!(f, "Round trip time: {:?}", rtt)?;
        }
        write!(
            f,
            "Window size: {}, lossy window size: {}",
            self.window_size, self.lossy_window_size
        )
    }
}

#[cfg(test)]
mod tests {
    use super::Statistics;

    #[test]
    fn packet_loss_without_traffic_is_zero() {
        assert_eq!(Statistics::default().packet_loss(), 0.0);
    }

    #[test]
    fn packet_loss_is_the_resend_share() {
        let statistics = Statistics {
            messages_sent: [2, 0, 2, 0],
            messages_resent: 1,
            ..Default::default()
        };
        assert_eq!(statistics.packet_loss(), 0.25);
    }

    #[test]
    fn report_names_every_priority() {
        let statistics = Statistics {
            messages_sent: [1, 2, 3, 4],
            window_size: 7,
            ..Default::default()
        };
        let report = statistics.to_string();

        for name in ["System", "High", "Medium", "Low"] {
            assert!(report.contains(name), "missing {} in {}", name, report);
        }
        assert!(report.contains("Window size: 7"));
    }
}
