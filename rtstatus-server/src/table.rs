//! # Slot Table
//!
//! Fixed array of [`SlotRecord`]s, one per (server, thread) pair, allocated
//! and zeroed once from the configured [`Limits`].
//!
//! ## Design Principles
//! 1. **Single writer per slot**: a slot is written only by the worker that
//!    occupies it, so writes take no lock.
//! 2. **Unsynchronized readers**: aggregation loads slots while writers keep
//!    going. A reader may see a half-applied update, never a corrupt value.
//! 3. **No reset on reuse**: a slot handed to a new worker keeps its
//!    counters and window.
//! 4. **Padded slots**: each record sits on its own cache lines so writers
//!    on neighbouring slots do not contend.

use crossbeam::utils::CachePadded;
use rtstatus_common::Limits;

use crate::slot::SlotRecord;

/// Identity of a worker slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId {
    pub server: usize,
    pub thread: usize,
}

impl SlotId {
    pub fn new(server: usize, thread: usize) -> Self {
        Self { server, thread }
    }
}

pub struct SlotTable {
    limits: Limits,
    slots: Box<[CachePadded<SlotRecord>]>,
}

impl SlotTable {
    /// Allocates `server_limit * thread_limit` zeroed slots.
    ///
    /// Panics if either limit is zero.
    pub fn new(limits: Limits) -> Self {
        assert!(
            limits.server_limit > 0 && limits.thread_limit > 0,
            "slot table limits must be non-zero: {limits:?}"
        );
        let slots = (0..limits.slots())
            .map(|_| CachePadded::new(SlotRecord::new()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self { limits, slots }
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Flattened position of `id`: `server * thread_limit + thread`.
    ///
    /// Panics when `id` lies outside the configured limits.
    pub fn index_of(&self, id: SlotId) -> usize {
        assert!(
            id.server < self.limits.server_limit && id.thread < self.limits.thread_limit,
            "slot {id:?} out of range for {:?}",
            self.limits
        );
        id.server * self.limits.thread_limit + id.thread
    }

    pub fn id_of(&self, index: usize) -> SlotId {
        assert!(index < self.slots.len(), "slot index {index} out of range");
        SlotId::new(index / self.limits.thread_limit, index % self.limits.thread_limit)
    }

    pub fn slot(&self, id: SlotId) -> &SlotRecord {
        &self.slots[self.index_of(id)]
    }

    /// Records one completed request into the caller's own slot.
    ///
    /// The caller must be the worker occupying `id`.
    pub fn record(&self, id: SlotId, status: u16, bytes: u64, elapsed_ms: i64, now_ms: u64) {
        self.slot(id).record(status, bytes, elapsed_ms, now_ms);
    }

    /// All slots, ordered by server then thread.
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &SlotRecord)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .map(|(index, slot)| (self.id_of(index), &**slot))
    }
}
