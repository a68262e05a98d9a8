//! Per-worker metrics record.

use std::sync::atomic::{AtomicU64, Ordering::Relaxed};

use rtstatus_common::{LatencyBucket, StatusClass};

use crate::config::WINDOW_CAPACITY;
use crate::window::PercentileWindow;

/// Metrics of one worker slot.
///
/// Exactly one writer (the worker occupying the slot) mutates a record at a
/// time; any number of readers may load it concurrently. Counters only grow.
#[derive(Debug, Default)]
pub struct SlotRecord {
    requests: [AtomicU64; StatusClass::COUNT],
    bytes: [AtomicU64; StatusClass::COUNT],
    latency: [AtomicU64; LatencyBucket::COUNT],
    window: PercentileWindow,
}

impl SlotRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one completed request.
    ///
    /// The status class counters and the histogram are always updated; a
    /// non-positive elapsed time falls in the first bucket. The percentile
    /// window only sees strictly positive elapsed times.
    pub fn record(&self, status: u16, bytes: u64, elapsed_ms: i64, now_ms: u64) {
        let class = StatusClass::classify(status).index();
        self.requests[class].fetch_add(1, Relaxed);
        self.bytes[class].fetch_add(bytes, Relaxed);

        let clamped = elapsed_ms.max(0) as u64;
        if clamped > 0 {
            self.window.observe(clamped, now_ms);
        }
        self.latency[LatencyBucket::classify(clamped).index()].fetch_add(1, Relaxed);
    }

    pub fn requests(&self, class: StatusClass) -> u64 {
        self.requests[class.index()].load(Relaxed)
    }

    pub fn bytes(&self, class: StatusClass) -> u64 {
        self.bytes[class.index()].load(Relaxed)
    }

    pub fn latency(&self, bucket: LatencyBucket) -> u64 {
        self.latency[bucket.index()].load(Relaxed)
    }

    pub fn window(&self) -> &PercentileWindow {
        &self.window
    }

    /// Copies every field. Fields are loaded one by one, so the copy can mix
    /// values from before and after a concurrent update.
    pub fn snapshot(&self) -> SlotSnapshot {
        SlotSnapshot {
            requests: std::array::from_fn(|i| self.requests[i].load(Relaxed)),
            bytes: std::array::from_fn(|i| self.bytes[i].load(Relaxed)),
            latency: std::array::from_fn(|i| self.latency[i].load(Relaxed)),
            last_ms: self.window.last(),
            avg_ms: self.window.avg(),
            percentile_ms: self.window.percentile(),
            window_start_ms: self.window.window_start(),
            samples: self.window.samples(),
            write_pos: self.window.write_pos(),
        }
    }
}

/// Plain copy of a [`SlotRecord`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotSnapshot {
    pub requests: [u64; StatusClass::COUNT],
    pub bytes: [u64; StatusClass::COUNT],
    pub latency: [u64; LatencyBucket::COUNT],
    pub last_ms: u64,
    pub avg_ms: u64,
    pub percentile_ms: u64,
    pub window_start_ms: u64,
    pub samples: [u64; WINDOW_CAPACITY],
    pub write_pos: usize,
}

impl SlotSnapshot {
    /// Requests completed by this slot, all classes.
    pub fn accesses(&self) -> u64 {
        self.requests.iter().sum()
    }

    pub fn total_bytes(&self) -> u64 {
        self.bytes.iter().sum()
    }
}
