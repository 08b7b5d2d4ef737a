//! Typed buffer: one item format enforced across every slot of a ring.
//!
//! Lock order is always control, then ring. Producers hold both for the
//! whole prepare / copy / stamp sequence; readers take the control lock only
//! to look up the current format and release it before touching the ring.

use std::sync::{Mutex, MutexGuard, PoisonError};

use contracts::{
    lookup_status, AddResult, BufferConfig, BufferError, BufferItem, BufferStats, ErrorSeverity,
    FilterMode, ItemError, ItemUid, SourceId, TimestampFilterConfig, TimingSample,
};
use observability::metrics;
use tracing::{debug, error, info, warn};

use crate::circular::TimestampedCircularBuffer;
use crate::filter::TimestampFilter;
use crate::format::ItemFormat;
use crate::state::StreamState;

/// How the timestamps of a new item are obtained
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ItemTiming {
    /// Caller supplies both timestamps
    Stamped { unfiltered: f64, filtered: f64 },

    /// Filtered timestamp comes from the buffer's timestamp filter
    Sample(TimingSample),
}

struct Control<F> {
    state: StreamState,
    format: Option<F>,
    filter: TimestampFilter,
}

/// Format-enforcing façade over a [`TimestampedCircularBuffer`].
///
/// Shared as `Arc<ItemFacade<_>>` between one producer (a device thread)
/// and any number of readers.
pub struct ItemFacade<F: ItemFormat> {
    id: SourceId,
    control: Mutex<Control<F>>,
    ring: TimestampedCircularBuffer<F::Payload>,
}

impl<F: ItemFormat> std::fmt::Debug for ItemFacade<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let control = self.control();
        f.debug_struct("ItemFacade")
            .field("id", &self.id)
            .field("state", &control.state)
            .field("format", &control.format)
            .finish()
    }
}

impl<F: ItemFormat> ItemFacade<F> {
    /// Empty buffer without a format
    pub fn new(id: impl Into<SourceId>, capacity: usize) -> Result<Self, BufferError> {
        Ok(Self {
            id: id.into(),
            control: Mutex::new(Control {
                state: StreamState::Uninitialized,
                format: None,
                filter: TimestampFilter::default(),
            }),
            ring: TimestampedCircularBuffer::new(capacity)?,
        })
    }

    /// Buffer set up from configuration, format applied
    pub fn from_config(
        id: impl Into<SourceId>,
        format: F,
        buffer: &BufferConfig,
        filter: &TimestampFilterConfig,
    ) -> Result<Self, BufferError> {
        let facade = Self::new(id, buffer.capacity)?;
        facade.set_local_time_offset(buffer.local_time_offset);
        facade.set_filter_config(filter.clone());
        facade.set_frame_format(format)?;
        Ok(facade)
    }

    fn control(&self) -> MutexGuard<'_, Control<F>> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> &SourceId {
        &self.id
    }

    pub fn state(&self) -> StreamState {
        self.control().state
    }

    pub fn format(&self) -> Option<F> {
        self.control().format.clone()
    }

    /// Underlying ring, for callers that need a [`crate::RingGuard`]
    pub fn buffer(&self) -> &TimestampedCircularBuffer<F::Payload> {
        &self.ring
    }

    // ===== Format & lifecycle =====

    /// Whether `candidate` equals the current format
    pub fn check_frame_format(&self, candidate: &F) -> bool {
        self.control().format.as_ref() == Some(candidate)
    }

    /// Apply a slot format.
    ///
    /// The same format again is a no-op that keeps all items. A different
    /// format reallocates every slot and invalidates the stored items; their
    /// uids report `NotAvailableAnymore` from then on. Formats that cannot
    /// hold an item are refused with `InvalidFormat`.
    pub fn set_frame_format(&self, format: F) -> Result<(), BufferError> {
        format.check()?;
        let mut control = self.control();
        let next_state = control.state.on_set_format()?;
        if control.format.as_ref() == Some(&format) {
            control.state = next_state;
            return Ok(());
        }

        let mut ring = self.ring.lock();
        let dropped = ring.len();
        ring.for_each_slot_mut(|slot| slot.payload = format.allocate());
        ring.clear();
        drop(ring);

        info!(
            buffer_id = %self.id,
            previous = ?control.format.as_ref().map(ToString::to_string),
            format = %format,
            dropped,
            "Buffer format changed"
        );
        control.format = Some(format);
        control.state = next_state;
        Ok(())
    }

    pub fn start(&self) -> Result<(), BufferError> {
        self.transition("start", StreamState::on_start)
    }

    pub fn pause(&self) -> Result<(), BufferError> {
        self.transition("pause", StreamState::on_pause)
    }

    pub fn resume(&self) -> Result<(), BufferError> {
        self.transition("resume", StreamState::on_resume)
    }

    /// Release slot payloads. Valid from any state; the buffer accepts no
    /// further writes.
    pub fn close(&self) {
        let mut control = self.control();
        let mut ring = self.ring.lock();
        ring.for_each_slot_mut(|slot| *slot = BufferItem::default());
        ring.clear();
        drop(ring);
        debug!(buffer_id = %self.id, from = %control.state, "Buffer closed");
        control.state = StreamState::Closed;
    }

    fn transition(
        &self,
        operation: &'static str,
        step: fn(StreamState) -> Result<StreamState, BufferError>,
    ) -> Result<(), BufferError> {
        let mut control = self.control();
        let next = step(control.state).inspect_err(|e| {
            warn!(buffer_id = %self.id, operation, error = %e, "Rejected state change");
        })?;
        debug!(buffer_id = %self.id, from = %control.state, to = %next, "Buffer state");
        control.state = next;
        Ok(())
    }

    // ===== Configuration =====

    /// Resize the ring, keeping the most recent items. Rejected while
    /// streaming.
    pub fn set_buffer_size(&self, capacity: usize) -> Result<(), BufferError> {
        let control = self.control();
        control.state.check_reconfigure("resize")?;

        let mut ring = self.ring.lock();
        ring.resize(capacity)?;
        if let Some(format) = control.format.as_ref() {
            ring.for_each_slot_mut(|slot| {
                if !format.describes(&slot.payload) {
                    slot.payload = format.allocate();
                }
            });
        }
        Ok(())
    }

    pub fn buffer_size(&self) -> usize {
        self.ring.buffer_size()
    }

    /// Drop all items. Uids keep counting.
    pub fn clear(&self) -> Result<(), BufferError> {
        let mut control = self.control();
        control.state.check_reconfigure("clear")?;
        self.ring.clear();
        control.filter.reset();
        Ok(())
    }

    /// Turn this buffer into a copy of `source`: format, slot count, time
    /// offsets, filter settings and every valid item.
    ///
    /// Refused while streaming or closed. Uids of the copied items are kept
    /// unless this buffer already handed out higher ones (see
    /// [`crate::Ring::copy_from`]).
    pub fn copy_from(&self, source: &Self) -> Result<(), BufferError> {
        if std::ptr::eq(self, source) {
            return Ok(());
        }
        // snapshot first so the two buffers are never locked together
        let (format, filter_config, snapshot) = {
            let control = source.control();
            let format = control.format.clone().ok_or(BufferError::FormatNotSet)?;
            let ring = source.ring.lock();
            (format, control.filter.config().clone(), ring.clone())
        };

        let mut control = self.control();
        control.state.check_reconfigure("copy")?;
        let next_state = control.state.on_set_format()?;
        if let Some(previous) = control.format.as_ref().filter(|f| **f != format) {
            warn!(
                buffer_id = %self.id,
                source_id = %source.id,
                previous = %previous,
                format = %format,
                "Copied buffer has a different format"
            );
        }

        let mut ring = self.ring.lock();
        ring.copy_from(&snapshot);
        let copied = ring.len();
        drop(ring);

        control.filter.set_config(filter_config);
        control.format = Some(format);
        control.state = next_state;
        info!(buffer_id = %self.id, source_id = %source.id, copied, "Buffer copied");
        Ok(())
    }

    pub fn set_local_time_offset(&self, offset: f64) {
        self.ring.set_local_time_offset(offset);
    }

    pub fn local_time_offset(&self) -> f64 {
        self.ring.local_time_offset()
    }

    /// Replace the timestamp filter settings, discarding its history
    pub fn set_filter_config(&self, config: TimestampFilterConfig) {
        self.control().filter.set_config(config);
    }

    pub fn filter_config(&self) -> TimestampFilterConfig {
        self.control().filter.config().clone()
    }

    // ===== Producer =====

    /// Commit one item.
    ///
    /// `validate` runs against the current format before anything is
    /// reserved; `write` fills the reserved slot and cannot fail. Any error
    /// leaves the buffer unchanged.
    pub(crate) fn commit(
        &self,
        timing: ItemTiming,
        index: Option<i64>,
        validate: impl FnOnce(&F) -> Result<(), BufferError>,
        write: impl FnOnce(&F, &mut F::Payload),
    ) -> AddResult {
        let result = self.try_commit(timing, index, validate, write);
        match &result {
            Ok(_) => metrics::record_item_added(&self.id, F::KIND),
            Err(e) => self.report_rejection(e),
        }
        result
    }

    fn try_commit(
        &self,
        timing: ItemTiming,
        index: Option<i64>,
        validate: impl FnOnce(&F) -> Result<(), BufferError>,
        write: impl FnOnce(&F, &mut F::Payload),
    ) -> AddResult {
        let mut control = self.control();
        if !control.state.accepts_writes() {
            return Err(BufferError::invalid_state("add item", control.state));
        }
        let Control { format, filter, .. } = &mut *control;
        let format = format.as_ref().ok_or(BufferError::FormatNotSet)?;
        validate(format)?;

        let mut ring = self.ring.lock();
        let (unfiltered, filtered) = match timing {
            ItemTiming::Stamped {
                unfiltered,
                filtered,
            } => (unfiltered, filtered),
            ItemTiming::Sample(sample) => {
                let out = filter.filter(&sample, ring.local_time_offset());
                if let Some(offset) = out.clock_offset {
                    ring.set_estimated_clock_offset(offset);
                }
                if out.window_reset {
                    warn!(
                        buffer_id = %self.id,
                        residual = out.residual,
                        frame = ?sample.frame_number,
                        "Timestamp deviates from regression line, filter restarted"
                    );
                }
                if filter.config().mode != FilterMode::None {
                    metrics::record_filter_residual(&self.id, out.residual);
                }
                (sample.unfiltered, out.filtered)
            }
        };

        let slot = ring.prepare_for_new_frame(filtered)?;
        let item = ring.slot_mut(&slot);
        write(format, &mut item.payload);
        item.unfiltered_timestamp = unfiltered;
        item.index = index;
        Ok(slot.uid)
    }

    fn report_rejection(&self, e: &BufferError) {
        metrics::record_item_rejected(&self.id, e.reason());
        match e.severity() {
            ErrorSeverity::Transient => {
                debug!(buffer_id = %self.id, error = %e, "Item rejected")
            }
            ErrorSeverity::Configuration => {
                warn!(buffer_id = %self.id, error = %e, "Item does not fit buffer")
            }
            ErrorSeverity::Fatal => error!(buffer_id = %self.id, error = %e, "Item write failed"),
        }
    }

    // ===== Consumer =====

    fn observe<T>(&self, result: Result<T, ItemError>) -> Result<T, ItemError> {
        metrics::record_lookup(&self.id, lookup_status(&result));
        result
    }

    /// Point `out` at the current format so copies never land in a stale
    /// layout.
    fn rehome(&self, out: &mut BufferItem<F::Payload>) {
        if let Some(format) = self.control().format.as_ref() {
            if !format.describes(&out.payload) {
                out.payload = format.allocate();
            }
        }
    }

    pub fn get_item(&self, uid: ItemUid) -> Result<BufferItem<F::Payload>, ItemError> {
        self.observe(self.ring.get_item(uid))
    }

    /// Copy the item into `out`, reusing its payload allocation
    pub fn get_item_into(
        &self,
        uid: ItemUid,
        out: &mut BufferItem<F::Payload>,
    ) -> Result<(), ItemError> {
        self.rehome(out);
        self.observe(self.ring.get_item_into(uid, out))
    }

    pub fn get_item_uid_from_time(&self, time: f64) -> Result<ItemUid, ItemError> {
        self.observe(self.ring.get_item_uid_from_time(time))
    }

    /// Latest item at or before `time`
    pub fn get_item_from_time(&self, time: f64) -> Result<BufferItem<F::Payload>, ItemError> {
        self.observe(self.ring.get_item_from_time(time))
    }

    pub fn get_item_from_time_into(
        &self,
        time: f64,
        out: &mut BufferItem<F::Payload>,
    ) -> Result<(), ItemError> {
        self.rehome(out);
        let ring = self.ring.lock();
        let result = ring
            .item_uid_from_time(time)
            .and_then(|uid| ring.item(uid))
            .map(|item| out.copy_from(item));
        drop(ring);
        self.observe(result)
    }

    pub fn latest_timestamp(&self) -> Result<f64, ItemError> {
        self.ring.latest_timestamp()
    }

    pub fn oldest_timestamp(&self) -> Result<f64, ItemError> {
        self.ring.oldest_timestamp()
    }

    pub fn latest_uid(&self) -> Result<ItemUid, ItemError> {
        self.ring.latest_uid()
    }

    pub fn oldest_uid(&self) -> ItemUid {
        self.ring.oldest_uid()
    }

    pub fn next_uid(&self) -> ItemUid {
        self.ring.next_uid()
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn stats(&self) -> BufferStats {
        let stats = self.ring.stats(&self.id);
        metrics::record_buffer_fill(&stats);
        stats
    }
}
