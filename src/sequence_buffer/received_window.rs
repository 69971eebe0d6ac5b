use std::collections::VecDeque;
use std::time::Duration;

use crate::net::MomentInTime;
use crate::packet::{SequenceNumber, SEQUENCE_MID};

/// Remembers which reliable sequence numbers arrived so duplicates can be dropped.
///
/// Everything before `base` has been seen or given up on. The slots describe `base`,
/// `base + 1`, ...; a slot is either received or a hole waiting for its packet. A hole is kept
/// until `hole_timeout` after it opened, so a packet the sender stops resending (a superseded
/// sequenced packet, for example) cannot pin the window forever. Received slots at the front
/// are dropped right away. Numbers up to half the sequence space behind `base` are treated as
/// duplicates.
#[derive(Debug)]
pub struct ReceivedWindow<T: MomentInTime> {
    base: SequenceNumber,
    // `None` once received, otherwise the moment the hole may be skipped
    slots: VecDeque<Option<T>>,
    hole_timeout: Duration,
}

impl<T: MomentInTime> ReceivedWindow<T> {
    /// Creates an empty window expecting sequence number zero next.
    pub fn new(hole_timeout: Duration) -> ReceivedWindow<T> {
        ReceivedWindow {
            base: 0,
            slots: VecDeque::new(),
            hole_timeout,
        }
    }

    /// Returns the lowest sequence number that has neither been seen nor skipped yet.
    pub fn base(&self) -> SequenceNumber {
        self.base
    }

    /// Returns the number of sequence numbers tracked beyond the base.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true when no gaps are being tracked.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Marks the sequence number as received at `now`.
    ///
    /// Holes at the front whose timeout passed are skipped first. Returns false when the number
    /// was received before, in which case nothing else changes.
    pub fn insert(&mut self, sequence: SequenceNumber, now: T) -> bool {
        self.advance(now);

        let offset = sequence.wrapping_sub(self.base) as usize;
        if offset >= SEQUENCE_MID as usize {
            return false;
        }

        if offset < self.slots.len() {
            if self.slots[offset].is_none() {
                return false;
            }
            self.slots[offset] = None;
        } else {
            let deadline = now.after(self.hole_timeout);
            self.slots.resize(offset, Some(deadline));
            self.slots.push_back(None);
        }

        self.advance(now);
        true
    }

    /// Forgets everything, expecting sequence number zero next.
    pub fn clear(&mut self) {
        self.base = 0;
        self.slots.clear();
    }

    fn advance(&mut self, now: T) {
        while let Some(slot) = self.slots.front() {
            match slot {
                Some(deadline) if *deadline > now => break,
                _ => {
                    self.slots.pop_front();
                    self.base = self.base.wrapping_add(1);
                }
            }
        }
    }
}
