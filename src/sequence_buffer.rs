pub use self::received_window::ReceivedWindow;

use crate::packet::{SequenceNumber, SEQUENCE_MID};

mod received_window;

/// Bigger than the other sequence number, taking wrap-around into account.
///
/// `s1` is newer than `s2` when it lies less than half the number space ahead of it.
pub fn sequence_greater_than(s1: SequenceNumber, s2: SequenceNumber) -> bool {
    s1 != s2 && s1.wrapping_sub(s2) < SEQUENCE_MID
}

/// Smaller than the other sequence number, taking wrap-around into account.
pub fn sequence_less_than(s1: SequenceNumber, s2: SequenceNumber) -> bool {
    sequence_greater_than(s2, s1)
}

#[cfg(test)]
mod tests {
    use quickcheck_macros::quickcheck;

    use super::{sequence_greater_than, sequence_less_than};

    #[test]
    fn ordinary_numbers_compare_as_usual() {
        assert!(sequence_greater_than(2, 1));
        assert!(sequence_less_than(1, 2));
        assert!(!sequence_greater_than(1, 1));
        assert!(!sequence_less_than(1, 1));
    }

    #[test]
    fn comparison_wraps_around() {
        assert!(sequence_greater_than(0, u16::max_value()));
        assert!(sequence_less_than(u16::max_value(), 0));
        assert!(sequence_greater_than(10, 65500));
    }

    #[test]
    fn half_range_boundary() {
        // exactly half the space apart counts as older
        assert!(!sequence_greater_than(0x8000, 0));
        assert!(sequence_greater_than(0x7FFF, 0));
    }

    #[quickcheck]
    fn at_most_one_direction_holds(a: u16, b: u16) -> bool {
        !(sequence_greater_than(a, b) && sequence_less_than(a, b))
    }
}
