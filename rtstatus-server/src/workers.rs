//! Worker liveness board and slot leases.
//!
//! The HTTP host has no fixed worker threads, so a "worker" is whoever holds
//! a [`SlotLease`]. A lease is the exclusive right to write one slot; the
//! free list guarantees at most one holder per slot.

use std::sync::atomic::{AtomicU8, Ordering::Relaxed};
use std::sync::Arc;

use crossbeam::queue::ArrayQueue;
use parking_lot::Mutex;
use rtstatus_common::{Limits, WorkerState};

use crate::table::{SlotId, SlotTable};

/// Source of per-slot worker states consulted during aggregation.
pub trait WorkerStates: Send + Sync {
    fn state(&self, id: SlotId) -> WorkerState;

    /// What the slot is serving or last served. Sources that do not track
    /// requests report an empty activity.
    fn activity(&self, _id: SlotId) -> SlotActivity {
        SlotActivity::default()
    }
}

/// Who asked for what, as shown in the per-slot view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestInfo {
    /// Peer IP address, empty when the transport does not expose it.
    pub client: String,
    /// `METHOD URI VERSION`
    pub request: String,
    /// `Host` header, empty when absent.
    pub vhost: String,
}

/// Request bookkeeping for one slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotActivity {
    pub request: RequestInfo,
    /// Monotonic start of the current or last request.
    pub started_ms: u64,
    /// Wall-clock time the last request finished, 0 if none has.
    pub last_used_ms: u64,
    /// Duration of the last finished request.
    pub last_req_ms: u64,
    pub in_flight: bool,
}

impl SlotActivity {
    /// Whole seconds since the slot last finished a request.
    pub fn since_used_secs(&self, now_ms: u64) -> u64 {
        if self.last_used_ms == 0 {
            return 0;
        }
        now_ms.saturating_sub(self.last_used_ms) / 1000
    }

    /// Running time of the request in flight, else the duration of the last one.
    pub fn request_ms(&self, monotonic_ms: u64) -> u64 {
        if self.in_flight {
            monotonic_ms.saturating_sub(self.started_ms)
        } else {
            self.last_req_ms
        }
    }
}

/// One state byte per slot. Every slot starts `Dead`.
///
/// Request activity sits behind a per-slot lock. Only the lease holder
/// writes it and only the report reads it, so the lock is uncontended on
/// the request path.
pub struct WorkerBoard {
    limits: Limits,
    states: Box<[AtomicU8]>,
    activity: Box<[Mutex<SlotActivity>]>,
}

impl WorkerBoard {
    pub fn new(limits: Limits) -> Self {
        let states = (0..limits.slots())
            .map(|_| AtomicU8::new(WorkerState::Dead.as_u8()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        let activity = (0..limits.slots())
            .map(|_| Mutex::new(SlotActivity::default()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self { limits, states, activity }
    }

    pub fn set(&self, id: SlotId, state: WorkerState) {
        self.states[self.index_of(id)].store(state.as_u8(), Relaxed);
    }

    /// Stamps the request a slot has started serving.
    pub fn begin(&self, id: SlotId, request: RequestInfo, started_ms: u64) {
        let mut activity = self.activity[self.index_of(id)].lock();
        activity.request = request;
        activity.started_ms = started_ms;
        activity.in_flight = true;
    }

    /// Stamps the end of the slot's request.
    pub fn finish(&self, id: SlotId, now_ms: u64, elapsed_ms: u64) {
        let mut activity = self.activity[self.index_of(id)].lock();
        activity.last_used_ms = now_ms;
        activity.last_req_ms = elapsed_ms;
        activity.in_flight = false;
    }

    fn index_of(&self, id: SlotId) -> usize {
        assert!(
            id.server < self.limits.server_limit && id.thread < self.limits.thread_limit,
            "slot {id:?} out of range for {:?}",
            self.limits
        );
        id.server * self.limits.thread_limit + id.thread
    }
}

impl WorkerStates for WorkerBoard {
    fn state(&self, id: SlotId) -> WorkerState {
        WorkerState::from_u8(self.states[self.index_of(id)].load(Relaxed))
    }

    fn activity(&self, id: SlotId) -> SlotActivity {
        self.activity[self.index_of(id)].lock().clone()
    }
}

/// Hands out exclusive leases on free slots.
pub struct WorkerPool {
    table: Arc<SlotTable>,
    board: Arc<WorkerBoard>,
    free: ArrayQueue<SlotId>,
}

impl WorkerPool {
    /// Creates a pool with every slot of `table` free, in table order.
    pub fn new(table: Arc<SlotTable>, board: Arc<WorkerBoard>) -> Self {
        let free = ArrayQueue::new(table.len());
        for (id, _) in table.iter() {
            // capacity equals the slot count
            let _ = free.push(id);
        }
        Self { table, board, free }
    }

    /// Takes a free slot and marks it `BusyRead`, or `None` when every slot
    /// is leased.
    pub fn claim(self: &Arc<Self>) -> Option<SlotLease> {
        let id = self.free.pop()?;
        self.board.set(id, WorkerState::BusyRead);
        Some(SlotLease { pool: Arc::clone(self), id })
    }

    /// Number of slots not currently leased.
    pub fn available(&self) -> usize {
        self.free.len()
    }
}

/// Exclusive write access to one slot. Dropping it marks the slot `Ready`
/// and returns it to the pool.
pub struct SlotLease {
    pool: Arc<WorkerPool>,
    id: SlotId,
}

impl SlotLease {
    pub fn id(&self) -> SlotId {
        self.id
    }

    pub fn set_state(&self, state: WorkerState) {
        self.pool.board.set(self.id, state);
    }

    /// Stamps the request this lease is about to serve.
    pub fn begin(&self, request: RequestInfo, started_ms: u64) {
        self.pool.board.begin(self.id, request, started_ms);
    }

    /// Records one completed request into the leased slot and stamps the
    /// slot's last use.
    pub fn record(&self, status: u16, bytes: u64, elapsed_ms: i64, now_ms: u64) {
        self.pool.table.record(self.id, status, bytes, elapsed_ms, now_ms);
        self.pool.board.finish(self.id, now_ms, elapsed_ms.max(0) as u64);
    }
}

impl Drop for SlotLease {
    fn drop(&mut self) {
        self.pool.board.set(self.id, WorkerState::Ready);
        let _ = self.pool.free.push(self.id);
    }
}
