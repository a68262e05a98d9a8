//! # Percentile Window
//!
//! Online, bounded-memory 90th-percentile estimator embedded in every slot.
//!
//! Samples are appended into a ten-entry buffer. When a sample arrives and
//! the buffer is already full, the buffer is sorted and the estimate snaps to
//! the 9th smallest value; the window then restarts. A window older than
//! [`WINDOW_DURATION_MS`] is restarted on the next sample with the running
//! average as its estimate.
//!
//! ## Notes
//! - `avg` is an exponential filter, `avg' = (avg + x) / 2`, seeded with the
//!   first sample. It weighs every new sample by one half. It is not a mean.
//! - A sample that restarts an expired window is appended twice: once by the
//!   restart and once by the regular append that follows it.
//! - Every field is an atomic so concurrent readers never race with the
//!   owning writer. Updates across fields are not atomic as a group.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering::Relaxed};

use crate::config::{WINDOW_CAPACITY, WINDOW_DURATION_MS, WINDOW_PERCENTILE_INDEX};

#[derive(Debug, Default)]
pub struct PercentileWindow {
    last: AtomicU64,
    avg: AtomicU64,
    percentile: AtomicU64,
    window_start: AtomicU64,
    samples: [AtomicU64; WINDOW_CAPACITY],
    write_pos: AtomicUsize,
}

impl PercentileWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one positive elapsed time observed at `now_ms`.
    ///
    /// Must only be called by the slot's owning writer.
    ///
    /// **Logic**:
    /// 1. `last = elapsed`, then fold it into `avg`.
    /// 2. If the window expired: estimate = `avg`, restart the window and
    ///    append the sample.
    /// 3. Append the sample if there is room, otherwise sort the buffer,
    ///    estimate = 9th smallest, restart the window.
    /// 4. A zero estimate falls back to `avg`.
    pub fn observe(&self, elapsed_ms: u64, now_ms: u64) {
        debug_assert!(elapsed_ms > 0, "only positive elapsed times are sampled");

        self.last.store(elapsed_ms, Relaxed);

        let prev = self.avg.load(Relaxed);
        let avg = if prev == 0 { elapsed_ms } else { (prev + elapsed_ms) / 2 };
        self.avg.store(avg, Relaxed);

        if now_ms.saturating_sub(self.window_start.load(Relaxed)) > WINDOW_DURATION_MS {
            self.percentile.store(avg, Relaxed);
            self.window_start.store(now_ms, Relaxed);
            self.write_pos.store(0, Relaxed);
            self.append(elapsed_ms);
        }

        if self.write_pos.load(Relaxed) < WINDOW_CAPACITY {
            self.append(elapsed_ms);
        } else {
            let mut sorted = self.samples();
            sorted.sort_unstable();
            for (slot, value) in self.samples.iter().zip(sorted) {
                slot.store(value, Relaxed);
            }
            self.percentile.store(sorted[WINDOW_PERCENTILE_INDEX], Relaxed);
            self.window_start.store(now_ms, Relaxed);
            self.write_pos.store(0, Relaxed);
        }

        if self.percentile.load(Relaxed) == 0 {
            self.percentile.store(avg, Relaxed);
            self.window_start.store(now_ms, Relaxed);
        }
    }

    fn append(&self, elapsed_ms: u64) {
        let pos = self.write_pos.load(Relaxed);
        self.samples[pos].store(elapsed_ms, Relaxed);
        self.write_pos.store(pos + 1, Relaxed);
    }

    /// Most recent positive elapsed time.
    pub fn last(&self) -> u64 {
        self.last.load(Relaxed)
    }

    pub fn avg(&self) -> u64 {
        self.avg.load(Relaxed)
    }

    /// Current 90th-percentile estimate.
    pub fn percentile(&self) -> u64 {
        self.percentile.load(Relaxed)
    }

    pub fn window_start(&self) -> u64 {
        self.window_start.load(Relaxed)
    }

    pub fn write_pos(&self) -> usize {
        self.write_pos.load(Relaxed)
    }

    /// Raw buffer contents, including stale entries past `write_pos`.
    pub fn samples(&self) -> [u64; WINDOW_CAPACITY] {
        std::array::from_fn(|i| self.samples[i].load(Relaxed))
    }
}
