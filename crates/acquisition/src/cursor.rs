//! Sequential reader over a buffer's uids.
//!
//! A consumer that falls more than one ring behind loses items; the cursor
//! reports how many and continues at the oldest item still held.

use std::sync::Arc;

use contracts::{BufferItem, ItemError, ItemUid};
use timestamped_buffer::{ItemFacade, ItemFormat};
use tracing::debug;

/// Outcome of one [`ItemCursor::advance`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorStep {
    /// Item `uid` was copied into the cursor
    Item(ItemUid),

    /// Items were overwritten before they could be read
    Gap { skipped: u64, resume_at: ItemUid },

    /// Caught up with the producer
    Idle,
}

/// Forward reader that copies every item into a reused slot.
pub struct ItemCursor<F: ItemFormat> {
    buffer: Arc<ItemFacade<F>>,
    next: ItemUid,
    item: BufferItem<F::Payload>,
    delivered: u64,
    skipped: u64,
}

impl<F: ItemFormat> ItemCursor<F> {
    /// Start at the oldest item currently held
    pub fn from_oldest(buffer: Arc<ItemFacade<F>>) -> Self {
        let next = buffer.oldest_uid();
        Self::at(buffer, next)
    }

    /// Start with the next item the producer writes
    pub fn from_latest(buffer: Arc<ItemFacade<F>>) -> Self {
        let next = buffer.next_uid();
        Self::at(buffer, next)
    }

    pub fn at(buffer: Arc<ItemFacade<F>>, next: ItemUid) -> Self {
        Self {
            buffer,
            next,
            item: BufferItem::default(),
            delivered: 0,
            skipped: 0,
        }
    }

    /// Advance by one uid.
    ///
    /// `Unknown` lookups (never produced by uid reads today) are passed through.
    pub fn advance(&mut self) -> Result<CursorStep, ItemError> {
        match self.buffer.get_item_into(self.next, &mut self.item) {
            Ok(()) => {
                let uid = self.next;
                self.next += 1;
                self.delivered += 1;
                Ok(CursorStep::Item(uid))
            }
            Err(ItemError::NotAvailableYet) => Ok(CursorStep::Idle),
            Err(ItemError::NotAvailableAnymore) => {
                let resume_at = self.buffer.oldest_uid().max(self.next);
                let skipped = resume_at - self.next;
                if skipped == 0 {
                    return Ok(CursorStep::Idle);
                }
                self.next = resume_at;
                self.skipped += skipped;
                observability::record_cursor_gap(self.buffer.id(), skipped);
                debug!(buffer_id = %self.buffer.id(), skipped, resume_at, "Cursor fell behind");
                Ok(CursorStep::Gap { skipped, resume_at })
            }
            Err(e) => Err(e),
        }
    }

    /// Read everything available, calling `f` per item. Returns the number
    /// of items visited.
    pub fn drain(
        &mut self,
        mut f: impl FnMut(&BufferItem<F::Payload>),
    ) -> Result<usize, ItemError> {
        let mut visited = 0;
        loop {
            match self.advance()? {
                CursorStep::Item(_) => {
                    f(&self.item);
                    visited += 1;
                }
                CursorStep::Gap { .. } => {}
                CursorStep::Idle => return Ok(visited),
            }
        }
    }

    /// Item copied by the last successful step
    pub fn current(&self) -> &BufferItem<F::Payload> {
        &self.item
    }

    /// Uid the next step will read
    pub fn position(&self) -> ItemUid {
        self.next
    }

    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    pub fn buffer(&self) -> &Arc<ItemFacade<F>> {
        &self.buffer
    }
}
