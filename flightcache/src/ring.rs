//! Fixed-capacity ring buffer of telemetry records.
//!
//! The ring holds at most `capacity` records in insertion order. Its storage
//! is allocated once at construction and never grows, so the capacity bound is
//! a property of the structure rather than a counter that has to be checked.
//!
//! # Design
//!
//! - `head` is the physical slot of the oldest record
//! - `len` is the number of live records
//! - the newest record lives at `(head + len - 1) % capacity`
//! - pushing into a full ring overwrites the oldest slot and advances `head`
//!
//! The ring itself never persists anything. [`FlightCache`](crate::cache::FlightCache)
//! decides whether a displaced record must be written out before it is
//! removed.

use std::iter::FusedIterator;

use crate::error::{ConfigError, Result};
use crate::record::LogRecord;

/// A fixed-capacity FIFO of [`LogRecord`]s.
///
/// # Thread Safety
///
/// `RecordRing` is a plain data structure with no interior mutability.
/// Mutation requires `&mut self`.
#[derive(Debug, Clone)]
pub struct RecordRing {
    /// Slot storage; length equals the capacity.
    slots: Box<[LogRecord]>,
    /// Physical index of the oldest record.
    head: usize,
    /// Number of live records.
    len: usize,
}

impl RecordRing {
    /// Creates an empty ring holding at most `capacity` records.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidCapacity`] if `capacity` is zero.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use flightcache::ring::RecordRing;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let ring = RecordRing::new(20)?;
    /// assert_eq!(ring.capacity(), 20);
    /// assert!(ring.is_empty());
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(ConfigError::InvalidCapacity { capacity }.into());
        }

        Ok(Self {
            slots: vec![LogRecord::default(); capacity].into_boxed_slice(),
            head: 0,
            len: 0,
        })
    }

    /// Returns the maximum number of records the ring can hold.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns the number of records currently held.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns whether the ring holds no records.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns whether the next push would displace the oldest record.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Maps a logical position (0 = oldest) to a physical slot.
    #[inline]
    fn physical(&self, logical: usize) -> usize {
        (self.head + logical) % self.capacity()
    }

    /// Appends a record at the newest end.
    ///
    /// If the ring is full, the oldest record is overwritten and returned.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use flightcache::LogRecord;
    /// use flightcache::ring::RecordRing;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let mut ring = RecordRing::new(2)?;
    /// let at = |t: f64| LogRecord { timestamp: t, ..LogRecord::default() };
    ///
    /// assert_eq!(ring.push(at(1.0)), None);
    /// assert_eq!(ring.push(at(2.0)), None);
    /// assert_eq!(ring.push(at(3.0)), Some(at(1.0)));
    /// # Ok(())
    /// # }
    /// ```
    pub fn push(&mut self, record: LogRecord) -> Option<LogRecord> {
        if self.is_full() {
            let displaced = std::mem::replace(&mut self.slots[self.head], record);
            self.head = (self.head + 1) % self.capacity();
            Some(displaced)
        } else {
            let slot = self.physical(self.len);
            self.slots[slot] = record;
            self.len += 1;
            None
        }
    }

    /// Removes and returns the oldest record.
    pub fn pop_oldest(&mut self) -> Option<LogRecord> {
        if self.is_empty() {
            return None;
        }

        let record = self.slots[self.head];
        self.head = (self.head + 1) % self.capacity();
        self.len -= 1;
        Some(record)
    }

    /// Returns the oldest record.
    pub fn oldest(&self) -> Option<&LogRecord> {
        self.get(0)
    }

    /// Returns the newest record.
    pub fn newest(&self) -> Option<&LogRecord> {
        self.len.checked_sub(1).and_then(|last| self.get(last))
    }

    /// Returns the record at a logical position, where 0 is the oldest.
    pub fn get(&self, index: usize) -> Option<&LogRecord> {
        if index < self.len {
            Some(&self.slots[self.physical(index)])
        } else {
            None
        }
    }

    /// Drops every record. Storage is kept.
    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    /// Iterates from oldest to newest.
    ///
    /// The iterator is double-ended, so `.rev()` yields newest first.
    pub fn iter(&self) -> RingIterator<'_> {
        RingIterator {
            ring: self,
            front: 0,
            back: self.len,
        }
    }
}

impl<'a> IntoIterator for &'a RecordRing {
    type Item = &'a LogRecord;
    type IntoIter = RingIterator<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the records of a [`RecordRing`], oldest first.
#[derive(Debug, Clone)]
pub struct RingIterator<'a> {
    ring: &'a RecordRing,
    /// Next logical index from the front.
    front: usize,
    /// One past the next logical index from the back.
    back: usize,
}

impl<'a> Iterator for RingIterator<'a> {
    type Item = &'a LogRecord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        let record = self.ring.get(self.front);
        self.front += 1;
        record
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back - self.front;
        (remaining, Some(remaining))
    }
}

impl DoubleEndedIterator for RingIterator<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        self.ring.get(self.back)
    }
}

impl ExactSizeIterator for RingIterator<'_> {}

impl FusedIterator for RingIterator<'_> {}
