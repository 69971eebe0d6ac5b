//! This module is about arranging items, over different channels, based on an certain algorithm.
//!
//! The above sentence contains a lot of important information, lets zoom in at the above sentence.
//!
//! ## Items
//!
//! By messages, we mean reassembled packets of the sequenced and ordered reliability kinds.
//!
//! ## Arranging
//!
//! To arrange items means to deliver them according to their ordering index.
//! There are two ways of arranging:
//!
//! 1. Sequencing, only the newest items are delivered, older ones are dropped.
//! 2. Ordering, items are delivered in the order they were sent, waiting for gaps to close.
//!
//! ## Channels
//!
//! A connection multiplexes `ORDERING_CHANNEL_COUNT` independent channels. Items on one channel
//! are arranged without regard to the others, so a gap on channel 1 never holds back channel 2.
//! Every channel keeps two counters: the index assigned to the next item sent on it and the index
//! expected next from the remote host.

pub use self::ordering::{IterMut, OrderingStream, OrderingSystem};
pub use self::sequencing::{SequencingStream, SequencingSystem};

use crate::packet::{ChannelNumber, OrderingIndex};

mod ordering;
mod sequencing;

/// A trait which can be implemented for arranging operations.
pub trait Arranging {
    /// The type of item that is arranged.
    type ArrangingItem;

    /// Arranges the given item based on the arranging algorithm.
    ///
    /// Returns the item when it can be delivered right away, `None` when it was buffered or
    /// dropped.
    fn arrange(
        &mut self,
        incoming_index: OrderingIndex,
        item: Self::ArrangingItem,
    ) -> Option<Self::ArrangingItem>;
}

/// An arranging system is a system that arranges items over channels.
pub trait ArrangingSystem {
    /// The type of stream that is used for arranging items.
    type Stream;

    /// Returns the number of channels with arranging state.
    fn stream_count(&self) -> usize;

    /// Returns the stream for the channel, creating it when it does not exist yet.
    fn get_or_create_stream(&mut self, channel: ChannelNumber) -> &mut Self::Stream;
}
