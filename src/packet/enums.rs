use std::convert::TryFrom;

use crate::{error::ErrorKind, packet::EnumConverter};

/// Number of send priorities, and therefore of send queues.
pub const PRIORITY_COUNT: usize = 4;

/// Delivery guarantee of a message.
///
/// | Reliability             | Dropped     | Duplicated | Order      |
/// | :---------------------: | :---------: | :--------: | :--------: |
/// | **Unreliable**          | Any         | No         | None       |
/// | **UnreliableSequenced** | Any + old   | No         | Sequenced  |
/// | **Reliable**            | No          | No         | None       |
/// | **ReliableOrdered**     | No          | No         | Ordered    |
/// | **ReliableSequenced**   | Only old    | No         | Sequenced  |
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Reliability {
    /// Plain datagram semantics.
    Unreliable,
    /// May be dropped; older arrivals than the newest seen are discarded.
    UnreliableSequenced,
    /// Resent until acknowledged, delivered in arrival order.
    Reliable,
    /// Resent until acknowledged, delivered in send order per channel.
    ReliableOrdered,
    /// Resent until acknowledged or superseded, older arrivals are discarded.
    ReliableSequenced,
}

impl Reliability {
    /// Returns true when packets of this kind are resent until acknowledged.
    pub fn is_reliable(self) -> bool {
        matches!(
            self,
            Reliability::Reliable | Reliability::ReliableOrdered | Reliability::ReliableSequenced
        )
    }

    /// Returns true for the latest-wins kinds.
    pub fn is_sequenced(self) -> bool {
        matches!(
            self,
            Reliability::UnreliableSequenced | Reliability::ReliableSequenced
        )
    }

    /// Returns true for the strictly ordered kind.
    pub fn is_ordered(self) -> bool {
        self == Reliability::ReliableOrdered
    }

    /// Returns true when packets of this kind carry an ordering channel and index.
    pub fn is_arranged(self) -> bool {
        self.is_sequenced() || self.is_ordered()
    }
}

impl EnumConverter for Reliability {
    type Enum = Reliability;

    fn to_u8(&self) -> u8 {
        *self as u8
    }
}

impl TryFrom<u8> for Reliability {
    type Error = ErrorKind;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Reliability::Unreliable),
            1 => Ok(Reliability::UnreliableSequenced),
            2 => Ok(Reliability::Reliable),
            3 => Ok(Reliability::ReliableOrdered),
            4 => Ok(Reliability::ReliableSequenced),
            _ => Err(ErrorKind::InvalidReliabilityKind(value)),
        }
    }
}

/// Send priority. Higher priorities are packed into frames first; the wire does not carry it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Priority {
    /// Reserved for connection housekeeping.
    System,
    /// Sent before medium and low priority messages.
    High,
    /// The default priority.
    Medium,
    /// Sent when nothing else is waiting.
    Low,
}

impl Priority {
    /// All priorities, highest first.
    pub const ALL: [Priority; PRIORITY_COUNT] =
        [Priority::System, Priority::High, Priority::Medium, Priority::Low];

    /// Returns the index of the send queue for this priority.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

impl EnumConverter for Priority {
    type Enum = Priority;

    fn to_u8(&self) -> u8 {
        *self as u8
    }
}

#[cfg(test)]
mod tests {
    use std::convert::TryFrom;

    use crate::error::ErrorKind;
    use crate::packet::{EnumConverter, Priority, Reliability};

    #[test]
    fn reliability_tags_are_stable() {
        assert_eq!(Reliability::Unreliable.to_u8(), 0);
        assert_eq!(Reliability::UnreliableSequenced.to_u8(), 1);
        assert_eq!(Reliability::Reliable.to_u8(), 2);
        assert_eq!(Reliability::ReliableOrdered.to_u8(), 3);
        assert_eq!(Reliability::ReliableSequenced.to_u8(), 4);
    }

    #[test]
    fn reliability_round_trips_through_its_tag() {
        for tag in 0..5u8 {
            assert_eq!(Reliability::try_from(tag).unwrap().to_u8(), tag);
        }
    }

    #[test]
    fn unknown_reliability_tag_is_rejected() {
        match Reliability::try_from(5) {
            Err(ErrorKind::InvalidReliabilityKind(5)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn kind_predicates() {
        assert!(!Reliability::Unreliable.is_reliable());
        assert!(!Reliability::Unreliable.is_arranged());
        assert!(Reliability::UnreliableSequenced.is_sequenced());
        assert!(!Reliability::UnreliableSequenced.is_reliable());
        assert!(Reliability::Reliable.is_reliable());
        assert!(!Reliability::Reliable.is_arranged());
        assert!(Reliability::ReliableOrdered.is_ordered());
        assert!(!Reliability::ReliableOrdered.is_sequenced());
        assert!(Reliability::ReliableSequenced.is_reliable());
        assert!(Reliability::ReliableSequenced.is_sequenced());
    }

    #[test]
    fn priorities_are_ordered_highest_first() {
        assert!(Priority::System < Priority::High);
        assert!(Priority::High < Priority::Medium);
        assert!(Priority::Medium < Priority::Low);
        assert_eq!(Priority::ALL[3], Priority::Low);
        assert_eq!(Priority::default().index(), 2);
    }
}
