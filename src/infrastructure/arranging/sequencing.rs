//! Module with logic for arranging items in-sequence on multiple channels.
//!
//! "_Sequencing is the process of only caring about the newest items._"
//!
//! With sequencing, we only care about the newest items. When old items arrive we just toss them away.
//!
//! Example: sequence `1,3,2,5,4` will result into `1,3,5`.
//!
//! # Remarks
//! - See [super-module](../index.html) description for more details.

use std::{collections::HashMap, marker::PhantomData};

use crate::net::constants::ORDERING_CHANNEL_COUNT;
use crate::packet::{ChannelNumber, OrderingIndex};
use crate::sequence_buffer::sequence_less_than;

use super::{Arranging, ArrangingSystem};

/// A sequencing system that can arrange items in sequence across different channels.
///
/// Checkout [`SequencingStream`](./struct.SequencingStream.html), or module description for more details.
#[derive(Debug)]
pub struct SequencingSystem<T> {
    // '[HashMap]' with streams on which items can be arranged in-sequence.
    streams: HashMap<ChannelNumber, SequencingStream<T>>,
}

impl<T> SequencingSystem<T> {
    /// Constructs a new [`SequencingSystem`](./struct.SequencingSystem.html).
    pub fn new() -> SequencingSystem<T> {
        SequencingSystem {
            streams: HashMap::with_capacity(ORDERING_CHANNEL_COUNT as usize),
        }
    }

    /// Resets the sequencing system after the connection was reset.
    pub fn reset(&mut self) {
        self.streams.clear();
    }
}

impl<T> Default for SequencingSystem<T> {
    fn default() -> Self {
        SequencingSystem::new()
    }
}

impl<T> ArrangingSystem for SequencingSystem<T> {
    type Stream = SequencingStream<T>;

    /// Returns the number of sequencing streams currently created.
    fn stream_count(&self) -> usize {
        self.streams.len()
    }

    /// Tries to get an [`SequencingStream`](./struct.SequencingStream.html) by `channel`.
    /// When the stream does not exist, it will be inserted by the given `channel` and returned.
    fn get_or_create_stream(&mut self, channel: ChannelNumber) -> &mut Self::Stream {
        self.streams
            .entry(channel)
            .or_insert_with(|| SequencingStream::new(channel))
    }
}

/// A stream on which items will be arranged in-sequence.
///
/// # Algorithm
///
/// With every sequencing operation an `expected_index` is given.
///
/// There are two scenarios that are important to us.
/// 1. `incoming_index` is not older than `expected_index`.
/// This item is the newest we have seen. We return it to the user and expect the one after it.
/// 2. `incoming_index` is older than `expected_index`.
/// A newer item was already delivered, so this one is tossed away.
///
/// # Remarks
/// - See [super-module](../index.html) for more information about channels.
#[derive(Debug)]
pub struct SequencingStream<T> {
    // the channel of this stream.
    _channel: ChannelNumber,
    // the index we expect next; anything older is stale.
    expected_index: OrderingIndex,
    // Needs `PhantomData`, otherwise, it can't use a generic in the `Arranging` implementation because `T` is not constrained.
    phantom: PhantomData<T>,
    // unique identifier which should be used for sequencing on the remote endpoint.
    unique_item_identifier: OrderingIndex,
}

impl<T> SequencingStream<T> {
    /// Constructs a new, empty '[SequencingStream](./struct.SequencingStream.html)'.
    pub fn new(channel: ChannelNumber) -> SequencingStream<T> {
        SequencingStream {
            _channel: channel,
            expected_index: 0,
            phantom: PhantomData,
            unique_item_identifier: 0,
        }
    }

    /// Returns the channel of this stream.
    #[cfg(test)]
    pub fn channel(&self) -> ChannelNumber {
        self._channel
    }

    /// Returns the index expected next.
    pub fn expected_index(&self) -> OrderingIndex {
        self.expected_index
    }

    /// Returns the unique identifier which should be used for sequencing on the remote endpoint.
    pub fn new_item_identifier(&mut self) -> OrderingIndex {
        let id = self.unique_item_identifier;
        self.unique_item_identifier = self.unique_item_identifier.wrapping_add(1);
        id
    }
}

impl<T> Arranging for SequencingStream<T> {
    type ArrangingItem = T;

    /// Arranges the given item based on a sequencing algorithm.
    ///
    /// # Remark
    /// - All old items will be tossed away.
    /// - None is returned when an old item is received.
    fn arrange(
        &mut self,
        incoming_index: OrderingIndex,
        item: Self::ArrangingItem,
    ) -> Option<Self::ArrangingItem> {
        if sequence_less_than(incoming_index, self.expected_index) {
            return None;
        }

        self.expected_index = incoming_index.wrapping_add(1);
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use crate::packet::{ChannelNumber, OrderingIndex};

    use super::{Arranging, ArrangingSystem, SequencingSystem};

    #[derive(Debug, PartialEq, Clone)]
    struct Packet {
        pub sequence: OrderingIndex,
        pub channel: ChannelNumber,
    }

    impl Packet {
        fn new(sequence: OrderingIndex, channel: ChannelNumber) -> Packet {
            Packet { sequence, channel }
        }
    }

    #[test]
    fn create_stream() {
        let mut system: SequencingSystem<Packet> = SequencingSystem::new();
        let stream = system.get_or_create_stream(1);

        assert_eq!(stream.channel(), 1);
    }

    #[test]
    fn create_existing_stream() {
        let mut system: SequencingSystem<Packet> = SequencingSystem::new();

        system.get_or_create_stream(1);
        let stream = system.get_or_create_stream(1);

        assert_eq!(stream.channel(), 1);
        assert_eq!(system.stream_count(), 1);
    }

    #[test]
    fn item_identifiers_increase_per_stream() {
        let mut system: SequencingSystem<Packet> = SequencingSystem::new();
        assert_eq!(system.get_or_create_stream(1).new_item_identifier(), 0);
        assert_eq!(system.get_or_create_stream(1).new_item_identifier(), 1);
        assert_eq!(system.get_or_create_stream(2).new_item_identifier(), 0);
    }

    /// asserts that the given collection, on the left, should result - after it is sequenced - into the given collection, on the right.
    macro_rules! assert_sequence {
        ( [$( $x:expr ),*], [$( $y:expr),*], $channel:expr) => {
            {
                let before = [$($x,)*];
                let after = [$($y,)*];

                let mut sequence_system = SequencingSystem::<Packet>::new();
                let stream = sequence_system.get_or_create_stream($channel);

                let sequenced_packets: Vec<_> = before.into_iter()
                    .filter_map(|seq| stream.arrange(seq, Packet::new(seq, $channel))
                        .map(|p| p.sequence))
                    .collect();

               assert_eq!(after.to_vec(), sequenced_packets);
            }
        };
    }

    #[test]
    fn can_sequence() {
        assert_sequence!([2, 0, 1], [2], 0);
        assert_sequence!([1, 3, 5, 4, 2], [1, 3, 5], 1);
        assert_sequence!([1, 5, 4, 3, 2], [1, 5], 1);
        assert_sequence!([5, 3, 4, 2, 1], [5], 1);
        assert_sequence!([4, 3, 2, 1, 5], [4, 5], 1);
        assert_sequence!([2, 1, 4, 3, 5], [2, 4, 5], 1);
        assert_sequence!([5, 2, 1, 4, 3], [5], 1);
        assert_sequence!([3, 2, 4, 1, 5], [3, 4, 5], 1);
    }

    #[test]
    fn sequence_on_multiple_channels() {
        assert_sequence!([1, 3, 5, 4, 2], [1, 3, 5], 1);
        assert_sequence!([1, 5, 4, 3, 2], [1, 5], 2);
        assert_sequence!([5, 3, 4, 2, 1], [5], 3);
        assert_sequence!([4, 3, 2, 1, 5], [4, 5], 4);
        assert_sequence!([2, 1, 4, 3, 5], [2, 4, 5], 5);
        assert_sequence!([5, 2, 1, 4, 3], [5], 6);
        assert_sequence!([3, 2, 4, 1, 5], [3, 4, 5], 7);
    }

    #[test]
    fn duplicate_of_the_newest_is_dropped() {
        assert_sequence!([3, 3], [3], 1);
    }

    #[test]
    fn sequencing_wraps_around() {
        assert_sequence!(
            [32000, 64000, 65535, 0, 65535, 1],
            [32000, 64000, 65535, 0, 1],
            1
        );
    }
}
