//! Capacity-bounded numeric store shared by every machine.
//!
//! A [`ResourceBuffer`] holds an integer quantity (energy units or
//! millibuckets of fluid) between zero and its capacity. All mutation goes
//! through [`receive`](ResourceBuffer::receive),
//! [`extract`](ResourceBuffer::extract) and
//! [`set_level`](ResourceBuffer::set_level); every call clamps instead of
//! failing and reports the amount actually moved.
//!
//! Successful non-simulated transfers raise a change flag exactly once per
//! call. The owning machine drains it with
//! [`take_changed`](ResourceBuffer::take_changed) to feed its sync
//! notification.

use serde::{Deserialize, Serialize};

use crate::persist::{Persist, Record};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceBuffer {
    capacity: i64,
    max_in: i64,
    max_out: i64,
    level: i64,
    #[serde(skip)]
    changed: bool,
    #[serde(skip)]
    revision: u64,
}

impl ResourceBuffer {
    /// Create an empty buffer. Negative limits are clamped to zero.
    pub fn new(capacity: i64, max_in: i64, max_out: i64) -> Self {
        Self {
            capacity: capacity.max(0),
            max_in: max_in.max(0),
            max_out: max_out.max(0),
            level: 0,
            changed: false,
            revision: 0,
        }
    }

    /// A buffer whose per-call rates equal its capacity.
    pub fn unthrottled(capacity: i64) -> Self {
        Self::new(capacity, capacity, capacity)
    }

    pub fn capacity(&self) -> i64 {
        self.capacity
    }

    pub fn max_in(&self) -> i64 {
        self.max_in
    }

    pub fn max_out(&self) -> i64 {
        self.max_out
    }

    pub fn level(&self) -> i64 {
        self.level
    }

    /// Free space left before the buffer is full.
    pub fn headroom(&self) -> i64 {
        self.capacity - self.level
    }

    pub fn is_empty(&self) -> bool {
        self.level == 0
    }

    pub fn is_full(&self) -> bool {
        self.level >= self.capacity
    }

    /// Offer `amount` to the buffer. Returns how much was (or would be)
    /// accepted, never more than `max_in` or the free space.
    pub fn receive(&mut self, amount: i64, simulate: bool) -> i64 {
        let accepted = amount.max(0).min(self.max_in).min(self.headroom());
        if !simulate && accepted > 0 {
            self.level += accepted;
            self.mark_changed();
        }
        accepted
    }

    /// Withdraw up to `amount`. Returns how much was (or would be) removed,
    /// never more than `max_out` or the current level.
    pub fn extract(&mut self, amount: i64, simulate: bool) -> i64 {
        let removed = amount.max(0).min(self.max_out).min(self.level);
        if !simulate && removed > 0 {
            self.level -= removed;
            self.mark_changed();
        }
        removed
    }

    /// Overwrite the level, clamped to `[0, capacity]`. Returns the stored value.
    pub fn set_level(&mut self, value: i64) -> i64 {
        let clamped = value.clamp(0, self.capacity);
        if clamped != self.level {
            self.level = clamped;
            self.mark_changed();
        }
        clamped
    }

    /// Put back `amount` that was withdrawn earlier in the same tick,
    /// ignoring the `max_in` rate cap. Clamped to the free space.
    pub fn restore(&mut self, amount: i64) -> i64 {
        let restored = amount.max(0).min(self.headroom());
        if restored > 0 {
            self.level += restored;
            self.mark_changed();
        }
        restored
    }

    /// Number of mutations since creation. Not persisted.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Return and clear the change flag.
    pub fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    fn mark_changed(&mut self) {
        self.changed = true;
        self.revision += 1;
    }
}

/// Equality ignores the change flag and revision counter.
impl PartialEq for ResourceBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.capacity == other.capacity
            && self.max_in == other.max_in
            && self.max_out == other.max_out
            && self.level == other.level
    }
}

impl Eq for ResourceBuffer {}

impl Persist for ResourceBuffer {
    fn save(&self) -> Record {
        let mut record = Record::new();
        record.put_i64("level", self.level);
        record
    }

    fn load(&mut self, record: &Record) {
        let stored = record.get_i64("level", 0);
        if !(0..=self.capacity).contains(&stored) {
            tracing::warn!(stored, capacity = self.capacity, "buffer level out of range, clamping");
        }
        self.level = stored.clamp(0, self.capacity);
        self.changed = false;
    }
}
