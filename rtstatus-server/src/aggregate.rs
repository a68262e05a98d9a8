//! # Aggregator
//!
//! On-demand scan of the whole slot table into global totals.
//!
//! Counters are summed over every slot regardless of worker state. The
//! response-time average and the per-slot percentiles only come from live
//! slots (neither `Dead` nor `Starting`) holding a non-zero value. The global
//! percentile is the 90th percentile of the sorted per-slot estimates.
//!
//! The scan takes no lock. Slots keep changing while it runs, so two passes
//! may disagree and a single pass is not a consistent cut.

use rtstatus_common::{LatencyBucket, StatusClass, WorkerState};
use tracing::debug;

use crate::config::AGGREGATE_QUANTILE;
use crate::table::SlotTable;
use crate::workers::WorkerStates;

/// Global view produced by one aggregation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregatedStats {
    pub requests: [u64; StatusClass::COUNT],
    pub bytes: [u64; StatusClass::COUNT],
    pub latency: [u64; LatencyBucket::COUNT],
    /// Mean of the live slots' averages, 0 when none has data.
    pub avg_ms: u64,
    /// 90th percentile of `percentiles`, 0 when it is empty.
    pub percentile_ms: u64,
    /// Live slots' percentile estimates, ascending.
    pub percentiles: Vec<u64>,
    pub total_accesses: u64,
    pub total_kbytes: u64,
    pub busy_workers: usize,
    pub idle_workers: usize,
    pub slots_scanned: usize,
}

impl AggregatedStats {
    pub fn requests_for(&self, class: StatusClass) -> u64 {
        self.requests[class.index()]
    }

    pub fn bytes_for(&self, class: StatusClass) -> u64 {
        self.bytes[class.index()]
    }

    pub fn latency_for(&self, bucket: LatencyBucket) -> u64 {
        self.latency[bucket.index()]
    }
}

/// Runs one aggregation pass over `table`.
///
/// **Logic**:
/// 1. Sum every counter of every slot, in server then thread order.
/// 2. For live slots, collect non-zero averages and non-zero percentiles.
/// 3. Average the collected averages (guarded against an empty set).
/// 4. Sort the collected percentiles and pick index `floor(n * 0.9)`.
pub fn snapshot(table: &SlotTable, states: &dyn WorkerStates) -> AggregatedStats {
    let mut stats = AggregatedStats::default();
    let mut total_avg: u64 = 0;
    let mut count_avg: u64 = 0;

    for (id, slot) in table.iter() {
        for class in StatusClass::ALL {
            stats.requests[class.index()] += slot.requests(class);
            stats.bytes[class.index()] += slot.bytes(class);
        }
        for bucket in LatencyBucket::ALL {
            stats.latency[bucket.index()] += slot.latency(bucket);
        }

        let state = states.state(id);
        if state.is_live() {
            let avg = slot.window().avg();
            if avg > 0 {
                total_avg += avg;
                count_avg += 1;
            }
            let percentile = slot.window().percentile();
            if percentile > 0 {
                stats.percentiles.push(percentile);
            }
        }
        if state.is_busy() {
            stats.busy_workers += 1;
        } else if state == WorkerState::Ready {
            stats.idle_workers += 1;
        }
        stats.slots_scanned += 1;
    }

    if count_avg > 0 {
        stats.avg_ms = total_avg / count_avg;
    }

    stats.percentiles.sort_unstable();
    stats.percentile_ms = percentile(&stats.percentiles, AGGREGATE_QUANTILE);

    stats.total_accesses = stats.requests.iter().sum();
    stats.total_kbytes = stats.bytes.iter().sum::<u64>() >> 10;

    debug!(
        slots = stats.slots_scanned,
        with_percentile = stats.percentiles.len(),
        accesses = stats.total_accesses,
        "aggregation pass complete"
    );
    stats
}

/// Element at index `floor(p * n)` of an ascending slice. Returns 0 for an
/// empty slice.
fn percentile(sorted: &[u64], p: f64) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let idx = (p * sorted.len() as f64).floor() as usize;
    sorted[idx.min(sorted.len() - 1)]
}
