//! Fixed-capacity ring of timestamped items.
//!
//! Slots are addressed by `uid % capacity`. The valid window is
//! `[next_uid - len, next_uid)`; once the ring is full every accepted write
//! overwrites the oldest slot in place, so steady-state acquisition never
//! allocates.
//!
//! All state sits behind one mutex. Single calls lock internally; sequences
//! that must be atomic (reserve slot + copy payload + stamp metadata) go
//! through [`TimestampedCircularBuffer::lock`], which hands out a scoped
//! [`RingGuard`].

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use contracts::{BufferError, BufferItem, BufferStats, ItemError, ItemUid, SourceId};

/// Scoped lock over a ring. Dropping it releases the buffer.
pub type RingGuard<'a, T> = MutexGuard<'a, Ring<T>>;

/// Slot reserved by [`Ring::prepare_for_new_frame`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewSlot {
    /// Uid assigned to the new item
    pub uid: ItemUid,
    /// Position in the slot array
    pub index: usize,
}

/// Ring state. Only reachable through a [`RingGuard`].
#[derive(Clone)]
pub struct Ring<T> {
    slots: Vec<BufferItem<T>>,
    next_uid: ItemUid,
    len: usize,
    local_time_offset: f64,
    estimated_clock_offset: Option<f64>,
    rejected_count: u64,
    evicted_count: u64,
}

impl<T> fmt::Debug for Ring<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ring")
            .field("capacity", &self.slots.len())
            .field("len", &self.len)
            .field("next_uid", &self.next_uid)
            .field("rejected", &self.rejected_count)
            .field("evicted", &self.evicted_count)
            .finish()
    }
}

impl<T> Ring<T> {
    #[inline]
    fn slot_index(&self, uid: ItemUid) -> usize {
        (uid % self.slots.len() as u64) as usize
    }

    #[inline]
    fn slot_at(&self, position: usize) -> &BufferItem<T> {
        &self.slots[self.slot_index(self.oldest_uid() + position as u64)]
    }

    /// Slot count
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of valid items
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Uid the next accepted write will receive
    #[inline]
    pub fn next_uid(&self) -> ItemUid {
        self.next_uid
    }

    /// First uid of the valid window (equals `next_uid` when empty)
    #[inline]
    pub fn oldest_uid(&self) -> ItemUid {
        self.next_uid - self.len as u64
    }

    /// Uid of the newest valid item
    pub fn latest_uid(&self) -> Result<ItemUid, ItemError> {
        if self.is_empty() {
            return Err(ItemError::NotAvailableYet);
        }
        Ok(self.next_uid - 1)
    }

    /// Filtered timestamp of the newest valid item
    pub fn latest_timestamp(&self) -> Result<f64, ItemError> {
        if self.is_empty() {
            return Err(ItemError::NotAvailableYet);
        }
        Ok(self.slot_at(self.len - 1).filtered_timestamp)
    }

    /// Filtered timestamp of the oldest valid item
    pub fn oldest_timestamp(&self) -> Result<f64, ItemError> {
        if self.is_empty() {
            return Err(ItemError::NotAvailableYet);
        }
        Ok(self.slot_at(0).filtered_timestamp)
    }

    /// Reserve the slot for a new item.
    ///
    /// Succeeds only if the buffer is empty or `filtered_timestamp` is
    /// strictly newer than the latest committed item. On success the uid and
    /// filtered timestamp are already stamped into the slot; the caller fills
    /// in payload and remaining metadata through [`Ring::slot_mut`] before
    /// releasing the guard.
    pub fn prepare_for_new_frame(&mut self, filtered_timestamp: f64) -> Result<NewSlot, BufferError> {
        if !filtered_timestamp.is_finite() {
            self.rejected_count += 1;
            return Err(BufferError::InvalidTimestamp {
                timestamp: filtered_timestamp,
            });
        }

        if let Ok(latest) = self.latest_timestamp() {
            if filtered_timestamp <= latest {
                self.rejected_count += 1;
                return Err(BufferError::DuplicateTimestamp {
                    timestamp: filtered_timestamp,
                    latest,
                });
            }
        }

        let uid = self.next_uid;
        let index = self.slot_index(uid);

        if self.len == self.slots.len() {
            self.evicted_count += 1;
        } else {
            self.len += 1;
        }
        self.next_uid += 1;

        let slot = &mut self.slots[index];
        slot.uid = uid;
        slot.filtered_timestamp = filtered_timestamp;
        slot.unfiltered_timestamp = filtered_timestamp;
        slot.index = None;

        Ok(NewSlot { uid, index })
    }

    /// Mutable access to a slot reserved under the same guard
    #[inline]
    pub fn slot_mut(&mut self, slot: &NewSlot) -> &mut BufferItem<T> {
        &mut self.slots[slot.index]
    }

    /// Look up a valid item by uid
    pub fn item(&self, uid: ItemUid) -> Result<&BufferItem<T>, ItemError> {
        if uid >= self.next_uid {
            return Err(ItemError::NotAvailableYet);
        }
        if uid < self.oldest_uid() {
            return Err(ItemError::NotAvailableAnymore);
        }
        Ok(&self.slots[self.slot_index(uid)])
    }

    /// Uid of the latest item whose filtered timestamp is `<= time`.
    ///
    /// Times before the oldest item report `NotAvailableAnymore`, times after
    /// the newest item (or any time on an empty buffer) `NotAvailableYet`.
    pub fn item_uid_from_time(&self, time: f64) -> Result<ItemUid, ItemError> {
        if time.is_nan() {
            return Err(ItemError::unknown("requested time is NaN"));
        }
        let oldest = self.oldest_timestamp()?;
        let latest = self.latest_timestamp()?;
        if time < oldest {
            return Err(ItemError::NotAvailableAnymore);
        }
        if time > latest {
            return Err(ItemError::NotAvailableYet);
        }

        // Timestamps increase with uid, so the window is sorted.
        let (mut lo, mut hi) = (0usize, self.len);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.slot_at(mid).filtered_timestamp <= time {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }

        // lo >= 1 because the oldest item satisfies the predicate
        Ok(self.oldest_uid() + lo as u64 - 1)
    }

    /// Invalidate every item. Slots keep their allocations and `next_uid`
    /// keeps counting, so uids are never handed out twice.
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Apply `f` to every slot, valid or not.
    pub fn for_each_slot_mut(&mut self, mut f: impl FnMut(&mut BufferItem<T>)) {
        self.slots.iter_mut().for_each(|slot| f(slot));
    }

    /// Iterate valid items from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &BufferItem<T>> + '_ {
        (0..self.len).map(move |position| self.slot_at(position))
    }

    #[inline]
    pub fn local_time_offset(&self) -> f64 {
        self.local_time_offset
    }

    #[inline]
    pub fn set_local_time_offset(&mut self, offset: f64) {
        self.local_time_offset = offset;
    }

    #[inline]
    pub fn estimated_clock_offset(&self) -> Option<f64> {
        self.estimated_clock_offset
    }

    #[inline]
    pub fn set_estimated_clock_offset(&mut self, offset: f64) {
        self.estimated_clock_offset = Some(offset);
    }

    #[inline]
    pub fn rejected_count(&self) -> u64 {
        self.rejected_count
    }

    #[inline]
    pub fn evicted_count(&self) -> u64 {
        self.evicted_count
    }

    /// Diagnostic snapshot
    pub fn stats(&self, buffer_id: &SourceId) -> BufferStats {
        BufferStats {
            buffer_id: buffer_id.clone(),
            capacity: self.capacity(),
            len: self.len,
            oldest_uid: self.oldest_uid(),
            next_uid: self.next_uid,
            oldest_timestamp: self.oldest_timestamp().ok(),
            latest_timestamp: self.latest_timestamp().ok(),
            rejected_count: self.rejected_count,
            evicted_count: self.evicted_count,
            local_time_offset: self.local_time_offset,
            estimated_clock_offset: self.estimated_clock_offset,
        }
    }
}

impl<T: Default> Ring<T> {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: empty_slots(capacity),
            next_uid: 0,
            len: 0,
            local_time_offset: 0.0,
            estimated_clock_offset: None,
            rejected_count: 0,
            evicted_count: 0,
        }
    }

    /// Change the slot count.
    ///
    /// The `min(len, capacity)` most recent items survive and keep their
    /// uids; the rest count as evicted. New slots hold `T::default()`.
    pub fn resize(&mut self, capacity: usize) -> Result<(), BufferError> {
        if capacity == 0 {
            return Err(BufferError::InvalidBufferSize {
                requested: capacity,
            });
        }
        if capacity == self.slots.len() {
            return Ok(());
        }

        let keep = self.len.min(capacity);
        let first_kept = self.next_uid - keep as u64;
        let mut slots = empty_slots(capacity);
        for uid in first_kept..self.next_uid {
            let old_index = self.slot_index(uid);
            slots[(uid % capacity as u64) as usize] = std::mem::take(&mut self.slots[old_index]);
        }

        self.evicted_count += (self.len - keep) as u64;
        self.slots = slots;
        self.len = keep;
        Ok(())
    }
}

impl<T: Clone + Default> Ring<T> {
    /// Replace slots, valid window and time offsets with those of `source`.
    ///
    /// Copied items keep their uids unless that would move `next_uid`
    /// backwards; then every copied uid is shifted by the same amount.
    /// Rejection and eviction counters stay with this ring.
    pub fn copy_from(&mut self, source: &Ring<T>) {
        let shift = self.next_uid.saturating_sub(source.oldest_uid());
        let capacity = source.capacity();
        let mut slots = empty_slots(capacity);
        for item in source.iter() {
            let uid = item.uid + shift;
            let slot = &mut slots[(uid % capacity as u64) as usize];
            slot.copy_from(item);
            slot.uid = uid;
        }

        self.slots = slots;
        self.next_uid = source.next_uid + shift;
        self.len = source.len;
        self.local_time_offset = source.local_time_offset;
        self.estimated_clock_offset = source.estimated_clock_offset;
    }
}

fn empty_slots<T: Default>(capacity: usize) -> Vec<BufferItem<T>> {
    std::iter::repeat_with(BufferItem::default)
        .take(capacity)
        .collect()
}

/// Thread-safe timestamped circular buffer.
///
/// One producer, any number of readers. Readers copy items out under the
/// lock and never observe a half-written slot.
pub struct TimestampedCircularBuffer<T> {
    ring: Mutex<Ring<T>>,
}

impl<T> fmt::Debug for TimestampedCircularBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TimestampedCircularBuffer")
            .field(&*self.lock())
            .finish()
    }
}

impl<T: Default> TimestampedCircularBuffer<T> {
    /// Create an empty buffer with `capacity` slots
    pub fn new(capacity: usize) -> Result<Self, BufferError> {
        if capacity == 0 {
            return Err(BufferError::InvalidBufferSize {
                requested: capacity,
            });
        }
        Ok(Self {
            ring: Mutex::new(Ring::with_capacity(capacity)),
        })
    }

    /// See [`Ring::resize`]. Must not race an acquisition session.
    pub fn set_buffer_size(&self, capacity: usize) -> Result<(), BufferError> {
        self.lock().resize(capacity)
    }
}

impl<T> TimestampedCircularBuffer<T> {
    /// Acquire the buffer lock.
    ///
    /// Writers validate their payload before reserving a slot and slot
    /// writes are infallible copies, so a poisoned lock is recovered rather
    /// than propagated.
    #[inline]
    pub fn lock(&self) -> RingGuard<'_, T> {
        self.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserve a slot and write a payload in one critical section
    pub fn push(
        &self,
        payload: T,
        unfiltered_timestamp: f64,
        filtered_timestamp: f64,
        index: Option<i64>,
    ) -> Result<ItemUid, BufferError> {
        let mut ring = self.lock();
        let slot = ring.prepare_for_new_frame(filtered_timestamp)?;
        let item = ring.slot_mut(&slot);
        item.payload = payload;
        item.unfiltered_timestamp = unfiltered_timestamp;
        item.index = index;
        Ok(slot.uid)
    }

    /// Copy of the item with the given uid
    pub fn get_item(&self, uid: ItemUid) -> Result<BufferItem<T>, ItemError>
    where
        T: Clone,
    {
        self.lock().item(uid).cloned()
    }

    /// Copy the item with the given uid into `out`, reusing its allocation
    pub fn get_item_into(&self, uid: ItemUid, out: &mut BufferItem<T>) -> Result<(), ItemError>
    where
        T: Clone,
    {
        let ring = self.lock();
        out.copy_from(ring.item(uid)?);
        Ok(())
    }

    /// See [`Ring::item_uid_from_time`]
    pub fn get_item_uid_from_time(&self, time: f64) -> Result<ItemUid, ItemError> {
        self.lock().item_uid_from_time(time)
    }

    /// Copy of the latest item at or before `time`
    pub fn get_item_from_time(&self, time: f64) -> Result<BufferItem<T>, ItemError>
    where
        T: Clone,
    {
        let ring = self.lock();
        let uid = ring.item_uid_from_time(time)?;
        ring.item(uid).cloned()
    }

    pub fn latest_timestamp(&self) -> Result<f64, ItemError> {
        self.lock().latest_timestamp()
    }

    pub fn oldest_timestamp(&self) -> Result<f64, ItemError> {
        self.lock().oldest_timestamp()
    }

    pub fn latest_uid(&self) -> Result<ItemUid, ItemError> {
        self.lock().latest_uid()
    }

    pub fn oldest_uid(&self) -> ItemUid {
        self.lock().oldest_uid()
    }

    pub fn next_uid(&self) -> ItemUid {
        self.lock().next_uid()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn buffer_size(&self) -> usize {
        self.lock().capacity()
    }

    /// See [`Ring::clear`]
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn local_time_offset(&self) -> f64 {
        self.lock().local_time_offset()
    }

    pub fn set_local_time_offset(&self, offset: f64) {
        self.lock().set_local_time_offset(offset);
    }

    pub fn stats(&self, buffer_id: &SourceId) -> BufferStats {
        self.lock().stats(buffer_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(capacity: usize, timestamps: &[f64]) -> TimestampedCircularBuffer<u32> {
        let buffer = TimestampedCircularBuffer::new(capacity).unwrap();
        for (i, &t) in timestamps.iter().enumerate() {
            buffer.push(i as u32, t, t, Some(i as i64)).unwrap();
        }
        buffer
    }

    #[test]
    fn test_uids_increase_by_one_and_round_trip() {
        let buffer = TimestampedCircularBuffer::new(8).unwrap();
        for i in 0..5u32 {
            let uid = buffer.push(i * 10, i as f64, i as f64 + 0.5, None).unwrap();
            assert_eq!(uid, i as u64);
        }
        for uid in 0..5u64 {
            let item = buffer.get_item(uid).unwrap();
            assert_eq!(item.uid, uid);
            assert_eq!(item.payload, uid as u32 * 10);
            assert_eq!(item.filtered_timestamp, uid as f64 + 0.5);
            assert_eq!(item.unfiltered_timestamp, uid as f64);
        }
    }

    #[test]
    fn test_capacity_three_scenario() {
        let buffer = filled(3, &[1.0, 2.0, 3.0, 4.0]);

        assert_eq!(buffer.get_item(0), Err(ItemError::NotAvailableAnymore));
        let item = buffer.get_item(3).unwrap();
        assert_eq!(item.filtered_timestamp, 4.0);
        assert_eq!(buffer.get_item_uid_from_time(2.5), Ok(1));
    }

    #[test]
    fn test_duplicate_timestamp_rejected() {
        let buffer = TimestampedCircularBuffer::new(4).unwrap();
        buffer.push(1u32, 5.0, 5.0, None).unwrap();

        let err = buffer.push(2u32, 5.0, 5.0, None).unwrap_err();
        assert!(matches!(err, BufferError::DuplicateTimestamp { .. }));
        assert!(err.is_transient());
        assert_eq!(buffer.next_uid(), 1);
        assert_eq!(buffer.latest_timestamp(), Ok(5.0));
        assert_eq!(buffer.get_item(0).unwrap().payload, 1);
    }

    #[test]
    fn test_older_timestamp_rejected() {
        let buffer = filled(4, &[1.0, 2.0]);
        assert!(buffer.push(9, 1.5, 1.5, None).is_err());
        assert_eq!(buffer.next_uid(), 2);
        assert_eq!(buffer.lock().rejected_count(), 1);
    }

    #[test]
    fn test_non_finite_timestamp_rejected() {
        let buffer = TimestampedCircularBuffer::<u32>::new(4).unwrap();
        let err = buffer.push(0, f64::NAN, f64::NAN, None).unwrap_err();
        assert!(matches!(err, BufferError::InvalidTimestamp { .. }));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_window_after_wraparound() {
        let capacity = 4;
        for k in 0..6usize {
            let timestamps: Vec<f64> = (0..capacity + k).map(|i| i as f64).collect();
            let buffer = filled(capacity, &timestamps);
            let next = buffer.next_uid();
            assert_eq!(buffer.oldest_uid(), next - capacity as u64);
            for uid in 0..buffer.oldest_uid() {
                assert_eq!(buffer.get_item(uid), Err(ItemError::NotAvailableAnymore));
            }
            assert_eq!(buffer.lock().evicted_count(), k as u64);
        }
    }

    #[test]
    fn test_future_uid_not_available_yet() {
        let buffer = filled(4, &[1.0, 2.0]);
        assert_eq!(buffer.get_item(2), Err(ItemError::NotAvailableYet));
        assert_eq!(buffer.get_item(100), Err(ItemError::NotAvailableYet));
    }

    #[test]
    fn test_uid_from_time_floor_and_ranges() {
        let buffer = filled(8, &[1.0, 2.0, 3.0, 4.0]);

        assert_eq!(buffer.get_item_uid_from_time(1.0), Ok(0));
        assert_eq!(buffer.get_item_uid_from_time(3.999), Ok(2));
        assert_eq!(buffer.get_item_uid_from_time(4.0), Ok(3));
        assert_eq!(
            buffer.get_item_uid_from_time(0.5),
            Err(ItemError::NotAvailableAnymore)
        );
        assert_eq!(
            buffer.get_item_uid_from_time(4.5),
            Err(ItemError::NotAvailableYet)
        );
        assert!(matches!(
            buffer.get_item_uid_from_time(f64::NAN),
            Err(ItemError::Unknown { .. })
        ));
    }

    #[test]
    fn test_uid_from_time_after_wraparound() {
        let timestamps: Vec<f64> = (0..10).map(|i| i as f64 * 0.1).collect();
        let buffer = filled(4, &timestamps);
        // window holds uids 6..=9 (t = 0.6 .. 0.9)
        assert_eq!(buffer.get_item_uid_from_time(0.75), Ok(7));
        assert_eq!(
            buffer.get_item_uid_from_time(0.55),
            Err(ItemError::NotAvailableAnymore)
        );
    }

    #[test]
    fn test_empty_buffer_lookups() {
        let buffer = TimestampedCircularBuffer::<u32>::new(2).unwrap();
        assert_eq!(buffer.latest_timestamp(), Err(ItemError::NotAvailableYet));
        assert_eq!(buffer.latest_uid(), Err(ItemError::NotAvailableYet));
        assert_eq!(
            buffer.get_item_uid_from_time(1.0),
            Err(ItemError::NotAvailableYet)
        );
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(matches!(
            TimestampedCircularBuffer::<u32>::new(0),
            Err(BufferError::InvalidBufferSize { requested: 0 })
        ));

        let buffer = filled(4, &[1.0, 2.0]);
        assert!(buffer.set_buffer_size(0).is_err());
        assert_eq!(buffer.buffer_size(), 4);
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_shrink_keeps_most_recent_items() {
        let buffer = filled(6, &[1.0, 2.0, 3.0, 4.0, 5.0]);
        buffer.set_buffer_size(3).unwrap();

        assert_eq!(buffer.buffer_size(), 3);
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.oldest_uid(), 2);
        assert_eq!(buffer.next_uid(), 5);
        for uid in 2..5u64 {
            let item = buffer.get_item(uid).unwrap();
            assert_eq!(item.uid, uid);
            assert_eq!(item.payload, uid as u32);
        }
        assert_eq!(buffer.get_item(1), Err(ItemError::NotAvailableAnymore));

        // writing continues with the next uid
        assert_eq!(buffer.push(5, 6.0, 6.0, None), Ok(5));
        assert_eq!(buffer.oldest_uid(), 3);
    }

    #[test]
    fn test_grow_keeps_everything() {
        let buffer = filled(3, &[1.0, 2.0, 3.0, 4.0]);
        buffer.set_buffer_size(10).unwrap();
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.oldest_uid(), 1);
        assert_eq!(buffer.get_item_uid_from_time(3.5), Ok(2));
    }

    #[test]
    fn test_clear_never_reuses_uids() {
        let buffer = filled(4, &[1.0, 2.0, 3.0]);
        buffer.clear();

        assert!(buffer.is_empty());
        assert_eq!(buffer.get_item(1), Err(ItemError::NotAvailableAnymore));
        assert_eq!(buffer.push(7, 0.5, 0.5, None), Ok(3));
    }

    #[test]
    fn test_copy_into_fresh_ring_keeps_uids() {
        let source = filled(3, &[1.0, 2.0, 3.0, 4.0]);
        source.set_local_time_offset(0.5);
        let copy = TimestampedCircularBuffer::<u32>::new(8).unwrap();
        copy.lock().copy_from(&source.lock());

        assert_eq!(copy.buffer_size(), 3);
        assert_eq!(copy.oldest_uid(), 1);
        assert_eq!(copy.next_uid(), 4);
        assert_eq!(copy.get_item(1).unwrap().payload, 1);
        assert_eq!(copy.get_item(3).unwrap().filtered_timestamp, 4.0);
        assert_eq!(copy.local_time_offset(), 0.5);
        // source untouched
        assert_eq!(source.len(), 3);
    }

    #[test]
    fn test_copy_never_moves_uids_backwards() {
        let source = filled(3, &[1.0, 2.0, 3.0, 4.0]);
        let copy = filled(2, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0]);
        copy.lock().copy_from(&source.lock());

        assert_eq!(copy.oldest_uid(), 10);
        assert_eq!(copy.next_uid(), 13);
        let item = copy.get_item(10).unwrap();
        assert_eq!(item.uid, 10);
        assert_eq!(item.payload, 1);
        assert_eq!(item.filtered_timestamp, 2.0);
        assert_eq!(copy.get_item_uid_from_time(3.5), Ok(11));
    }

    #[test]
    fn test_iter_in_uid_order() {
        let buffer = filled(3, &[1.0, 2.0, 3.0, 4.0, 5.0]);
        let ring = buffer.lock();
        let uids: Vec<_> = ring.iter().map(|item| item.uid).collect();
        assert_eq!(uids, vec![2, 3, 4]);
    }

    #[test]
    fn test_stats_snapshot() {
        let buffer = filled(3, &[1.0, 2.0, 3.0, 4.0]);
        buffer.set_local_time_offset(-0.25);
        let stats = buffer.stats(&"probe".into());

        assert_eq!(stats.capacity, 3);
        assert_eq!(stats.len, 3);
        assert_eq!(stats.oldest_uid, 1);
        assert_eq!(stats.next_uid, 4);
        assert_eq!(stats.oldest_timestamp, Some(2.0));
        assert_eq!(stats.latest_timestamp, Some(4.0));
        assert_eq!(stats.evicted_count, 1);
        assert_eq!(stats.local_time_offset, -0.25);
    }
}
