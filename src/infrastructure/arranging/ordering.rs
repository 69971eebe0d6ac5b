//! Module with logic for arranging items in-order on multiple channels.
//!
//! "_Ordering is the process of putting something in a particular order._"
//!
//! - Items arrive in any order, for example `1,3,2,5,4`.
//! - Items are handed out as `1,2,3,4,5`, each one only once every earlier item was handed out.
//!
//! # How ordering works
//! Every item carries the index it was sent with. The stream knows which index it expects next.
//! 1. The expected item arrives: it is returned right away, after which items buffered while
//!    waiting for it can be taken out with [`iter_mut`](./struct.OrderingStream.html#method.iter_mut).
//! 2. A newer item arrives: it is buffered until the gap before it closes.
//! 3. An older item arrives: it was delivered before, so it is dropped.
//!
//! # Remarks
//! - See [super-module](../index.html) description for more details.

use std::collections::HashMap;

use crate::net::constants::ORDERING_CHANNEL_COUNT;
use crate::packet::{ChannelNumber, OrderingIndex};
use crate::sequence_buffer::sequence_greater_than;

use super::{Arranging, ArrangingSystem};

/// An ordering system that can arrange items in order across different channels.
///
/// Checkout [`OrderingStream`](./struct.OrderingStream.html), or module description for more details.
#[derive(Debug)]
pub struct OrderingSystem<T> {
    // '[HashMap]' with streams on which items can be ordered.
    streams: HashMap<ChannelNumber, OrderingStream<T>>,
}

impl<T> OrderingSystem<T> {
    /// Constructs a new [`OrderingSystem`](./struct.OrderingSystem.html).
    pub fn new() -> OrderingSystem<T> {
        OrderingSystem {
            streams: HashMap::with_capacity(ORDERING_CHANNEL_COUNT as usize),
        }
    }

    /// Returns the number of items waiting for a gap to close, over all channels.
    pub fn buffered(&self) -> usize {
        self.streams.values().map(OrderingStream::len).sum()
    }

    /// Resets the ordering system after the connection was reset.
    pub fn reset(&mut self) {
        self.streams.clear();
    }
}

impl<T> Default for OrderingSystem<T> {
    fn default() -> Self {
        OrderingSystem::new()
    }
}

impl<T> ArrangingSystem for OrderingSystem<T> {
    type Stream = OrderingStream<T>;

    /// Returns the number of ordering streams currently created.
    fn stream_count(&self) -> usize {
        self.streams.len()
    }

    /// Tries to get an [`OrderingStream`](./struct.OrderingStream.html) by `channel`.
    /// When the stream does not exist, it will be inserted by the given `channel` and returned.
    fn get_or_create_stream(&mut self, channel: ChannelNumber) -> &mut Self::Stream {
        self.streams
            .entry(channel)
            .or_insert_with(|| OrderingStream::new(channel))
    }
}

/// A stream on which items will be arranged in-order.
///
/// # Remarks
/// - See [super-module](../index.html) for more information about channels.
#[derive(Debug)]
pub struct OrderingStream<T> {
    // the channel of this stream.
    _channel: ChannelNumber,
    // the storage for items that are waiting for earlier items to arrive.
    storage: HashMap<OrderingIndex, T>,
    // the index we expect to hand out next.
    expected_index: OrderingIndex,
    // unique identifier which should be used for ordering on the remote endpoint.
    unique_item_identifier: OrderingIndex,
}

impl<T> OrderingStream<T> {
    /// Constructs a new, empty [`OrderingStream`](./struct.OrderingStream.html).
    pub fn new(channel: ChannelNumber) -> OrderingStream<T> {
        OrderingStream {
            _channel: channel,
            storage: HashMap::new(),
            expected_index: 0,
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

    /// Returns the number of buffered items.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Returns true when no items are buffered.
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Returns the unique identifier which should be used for ordering on the remote endpoint.
    pub fn new_item_identifier(&mut self) -> OrderingIndex {
        let id = self.unique_item_identifier;
        self.unique_item_identifier = self.unique_item_identifier.wrapping_add(1);
        id
    }

    /// Returns an iterator over the buffered items that are next in order.
    ///
    /// Every yielded item is removed from the buffer and advances the expected index; the
    /// iterator stops at the first gap.
    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        IterMut { stream: self }
    }
}

impl<T> Arranging for OrderingStream<T> {
    type ArrangingItem = T;

    /// Arranges the given item based on an ordering algorithm.
    ///
    /// # Remark
    /// - Returns the item only when it is the expected one.
    /// - Newer items are buffered, older ones are dropped.
    fn arrange(
        &mut self,
        incoming_index: OrderingIndex,
        item: Self::ArrangingItem,
    ) -> Option<Self::ArrangingItem> {
        if incoming_index == self.expected_index {
            self.expected_index = self.expected_index.wrapping_add(1);
            return Some(item);
        }

        if sequence_greater_than(incoming_index, self.expected_index) {
            self.storage.entry(incoming_index).or_insert(item);
        }
        None
    }
}

/// Hands out buffered items of an [`OrderingStream`](./struct.OrderingStream.html) while they are
/// next in order.
pub struct IterMut<'a, T> {
    stream: &'a mut OrderingStream<T>,
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.stream.storage.remove(&self.stream.expected_index)?;
        self.stream.expected_index = self.stream.expected_index.wrapping_add(1);
        Some(item)
    }
}
