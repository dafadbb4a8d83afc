//! Per-room sequence tracking for subscribers

/// Result of observing a sequence number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceCheck {
    /// Exactly one past the last observed number
    InOrder,
    /// Already observed; the event must be discarded
    Duplicate,
    /// One or more events were skipped; the subscriber must resynchronize
    Gap { expected: u64, received: u64 },
}

/// Tracks the last delivered sequence number of one room for one subscriber
///
/// A gap does not advance the tracker. After a resync the caller resets it
/// to the snapshot's sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SequenceTracker {
    last: u64,
}

impl SequenceTracker {
    /// Start tracking after `last` (0 for a room that has emitted nothing)
    pub fn new(last: u64) -> Self {
        Self { last }
    }

    #[inline]
    pub fn last(&self) -> u64 {
        self.last
    }

    pub fn observe(&mut self, seq: u64) -> SequenceCheck {
        if seq <= self.last {
            SequenceCheck::Duplicate
        } else if seq == self.last + 1 {
            self.last = seq;
            SequenceCheck::InOrder
        } else {
            SequenceCheck::Gap {
                expected: self.last + 1,
                received: seq,
            }
        }
    }

    /// Jump to a resynchronized position
    pub fn reset(&mut self, last: u64) {
        self.last = last;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_order_sequence() {
        let mut tracker = SequenceTracker::new(0);
        assert_eq!(tracker.observe(1), SequenceCheck::InOrder);
        assert_eq!(tracker.observe(2), SequenceCheck::InOrder);
        assert_eq!(tracker.last(), 2);
    }

    #[test]
    fn test_duplicates_are_discarded() {
        let mut tracker = SequenceTracker::new(5);
        assert_eq!(tracker.observe(5), SequenceCheck::Duplicate);
        assert_eq!(tracker.observe(3), SequenceCheck::Duplicate);
        assert_eq!(tracker.last(), 5);
    }

    #[test]
    fn test_gap_requires_reset() {
        let mut tracker = SequenceTracker::new(2);
        assert_eq!(
            tracker.observe(5),
            SequenceCheck::Gap {
                expected: 3,
                received: 5
            }
        );
        // Still waiting for 3 until resynchronized
        assert_eq!(tracker.last(), 2);

        tracker.reset(5);
        assert_eq!(tracker.observe(6), SequenceCheck::InOrder);
    }
}
