use rtstatus_common::{LatencyBucket, Limits, StatusClass, WorkerState};
use rtstatus_server::aggregate::snapshot;
use rtstatus_server::table::{SlotId, SlotTable};
use rtstatus_server::workers::WorkerStates;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

// --- Test helpers ---

/// Every slot reports `default` unless overridden.
struct FixedStates {
    default: WorkerState,
    overrides: HashMap<SlotId, WorkerState>,
}

impl FixedStates {
    fn all(state: WorkerState) -> Self {
        Self { default: state, overrides: HashMap::new() }
    }

    fn with(mut self, id: SlotId, state: WorkerState) -> Self {
        self.overrides.insert(id, state);
        self
    }
}

impl WorkerStates for FixedStates {
    fn state(&self, id: SlotId) -> WorkerState {
        self.overrides.get(&id).copied().unwrap_or(self.default)
    }
}

fn id(thread: usize) -> SlotId {
    SlotId::new(0, thread)
}

// --- Averages ---

#[test]
fn test_average_of_live_slot_averages() {
    let table = SlotTable::new(Limits::new(1, 3));
    table.record(id(0), 200, 0, 10, 0);
    table.record(id(1), 200, 0, 20, 0);
    // id(2) has no timed sample: avg == 0, excluded from sum and count.
    table.record(id(2), 200, 0, 0, 0);

    let stats = snapshot(&table, &FixedStates::all(WorkerState::Ready));
    assert_eq!(stats.avg_ms, 15);
}

#[test]
fn test_empty_table_yields_zero_fallbacks() {
    let table = SlotTable::new(Limits::new(2, 2));
    let stats = snapshot(&table, &FixedStates::all(WorkerState::Ready));

    assert_eq!(stats.avg_ms, 0);
    assert_eq!(stats.percentile_ms, 0);
    assert!(stats.percentiles.is_empty());
    assert_eq!(stats.total_accesses, 0);
    assert_eq!(stats.slots_scanned, 4);
}

#[test]
fn test_only_dead_slots_with_data_yield_zero_fallbacks() {
    let table = SlotTable::new(Limits::new(1, 2));
    table.record(id(0), 200, 0, 80, 0);
    table.record(id(1), 200, 0, 90, 0);

    let stats = snapshot(&table, &FixedStates::all(WorkerState::Dead));
    assert_eq!(stats.avg_ms, 0);
    assert_eq!(stats.percentile_ms, 0);
    assert!(stats.percentiles.is_empty());
    // Counters are summed regardless of liveness.
    assert_eq!(stats.requests_for(StatusClass::Ok), 2);
}

#[test]
fn test_dead_and_starting_slots_are_excluded_from_timings() {
    let table = SlotTable::new(Limits::new(1, 3));
    table.record(id(0), 200, 0, 10, 0);
    table.record(id(1), 200, 0, 1_000, 0);
    table.record(id(2), 200, 0, 5_000, 0);

    let states = FixedStates::all(WorkerState::BusyWrite)
        .with(id(1), WorkerState::Dead)
        .with(id(2), WorkerState::Starting);
    let stats = snapshot(&table, &states);

    assert_eq!(stats.avg_ms, 10);
    assert_eq!(stats.percentiles, vec![10]);
    assert_eq!(stats.percentile_ms, 10);
    assert_eq!(stats.requests_for(StatusClass::Ok), 3);
}

// --- Global percentile ---

#[test]
fn test_global_percentile_picks_floor_of_ninety_percent() {
    let table = SlotTable::new(Limits::new(2, 5));
    // Slot percentiles descend in scan order: 100, 90, ..., 10.
    for (i, (sid, _)) in table.iter().enumerate() {
        table.record(sid, 200, 0, (100 - 10 * i) as i64, 0);
    }
    let stats = snapshot(&table, &FixedStates::all(WorkerState::Ready));

    assert_eq!(stats.percentiles, vec![10, 20, 30, 40, 50, 60, 70, 80, 90, 100]);
    // floor(10 * 0.9) = 9
    assert_eq!(stats.percentile_ms, 100);
}

#[test]
fn test_global_percentile_small_sets() {
    let table = SlotTable::new(Limits::new(1, 3));
    table.record(id(0), 200, 0, 300, 0);
    table.record(id(1), 200, 0, 100, 0);
    table.record(id(2), 200, 0, 200, 0);

    let stats = snapshot(&table, &FixedStates::all(WorkerState::Ready));
    // floor(3 * 0.9) = 2
    assert_eq!(stats.percentiles, vec![100, 200, 300]);
    assert_eq!(stats.percentile_ms, 300);

    let one = SlotTable::new(Limits::new(1, 1));
    one.record(id(0), 200, 0, 42, 0);
    assert_eq!(snapshot(&one, &FixedStates::all(WorkerState::Ready)).percentile_ms, 42);
}

// --- Counters ---

#[test]
fn test_counters_are_summed_across_slots() {
    let table = SlotTable::new(Limits::new(2, 2));
    table.record(SlotId::new(0, 0), 200, 1_000, 20, 0);
    table.record(SlotId::new(0, 1), 200, 24, 70, 0);
    table.record(SlotId::new(1, 0), 404, 300, 400, 0);
    table.record(SlotId::new(1, 1), 500, 1_024, 0, 0);

    let stats = snapshot(&table, &FixedStates::all(WorkerState::Ready));
    assert_eq!(stats.requests_for(StatusClass::Ok), 2);
    assert_eq!(stats.bytes_for(StatusClass::Ok), 1_024);
    assert_eq!(stats.requests_for(StatusClass::NotFound), 1);
    assert_eq!(stats.requests_for(StatusClass::ServerError), 1);
    // The 0 ms request lands in the first bucket too.
    assert_eq!(stats.latency_for(LatencyBucket::UpTo50ms), 2);
    assert_eq!(stats.latency_for(LatencyBucket::UpTo100ms), 1);
    assert_eq!(stats.latency_for(LatencyBucket::UpTo500ms), 1);
    assert_eq!(stats.total_accesses, 4);
    assert_eq!(stats.total_kbytes, 2);
}

#[test]
fn test_counter_totals_do_not_depend_on_slot_order() {
    let work: [(u16, u64, i64); 4] = [(200, 10, 5), (302, 20, 120), (404, 30, 3_000), (101, 40, 0)];

    let forward = SlotTable::new(Limits::new(1, 4));
    let reversed = SlotTable::new(Limits::new(2, 2));
    for (i, (status, bytes, elapsed)) in work.iter().enumerate() {
        forward.record(SlotId::new(0, i), *status, *bytes, *elapsed, 0);
        let j = 3 - i;
        reversed.record(SlotId::new(j / 2, j % 2), *status, *bytes, *elapsed, 0);
    }

    let states = FixedStates::all(WorkerState::Ready);
    let a = snapshot(&forward, &states);
    let b = snapshot(&reversed, &states);
    assert_eq!(a.requests, b.requests);
    assert_eq!(a.bytes, b.bytes);
    assert_eq!(a.latency, b.latency);
    assert_eq!(a.total_accesses, b.total_accesses);
}

#[test]
fn test_worker_counts() {
    let table = SlotTable::new(Limits::new(1, 5));
    let states = FixedStates::all(WorkerState::Dead)
        .with(id(0), WorkerState::Ready)
        .with(id(1), WorkerState::Ready)
        .with(id(2), WorkerState::BusyWrite)
        .with(id(3), WorkerState::IdleKill);

    let stats = snapshot(&table, &states);
    assert_eq!(stats.idle_workers, 2);
    assert_eq!(stats.busy_workers, 1);
}

// --- Concurrency ---

#[test]
fn test_aggregation_under_concurrent_writers() {
    const WRITERS: usize = 4;
    const PER_WRITER: u64 = 20_000;

    let table = Arc::new(SlotTable::new(Limits::new(1, WRITERS)));
    let states = FixedStates::all(WorkerState::BusyWrite);
    let done = Arc::new(AtomicBool::new(false));

    let handles: Vec<_> = (0..WRITERS)
        .map(|thread| {
            let table = Arc::clone(&table);
            thread::spawn(move || {
                for n in 0..PER_WRITER {
                    table.record(SlotId::new(0, thread), 200, 1, (n % 50 + 1) as i64, n);
                }
            })
        })
        .collect();

    let reader = {
        let table = Arc::clone(&table);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let states = FixedStates::all(WorkerState::BusyWrite);
            let mut previous = 0;
            while !done.load(Ordering::Relaxed) {
                let stats = snapshot(&table, &states);
                let seen = stats.requests_for(StatusClass::Ok);
                assert!(seen >= previous, "counter went backwards: {seen} < {previous}");
                assert!(seen <= WRITERS as u64 * PER_WRITER);
                previous = seen;
            }
        })
    };

    for handle in handles {
        handle.join().unwrap();
    }
    done.store(true, Ordering::Relaxed);
    reader.join().unwrap();

    let stats = snapshot(&table, &states);
    assert_eq!(stats.requests_for(StatusClass::Ok), WRITERS as u64 * PER_WRITER);
    assert_eq!(stats.bytes_for(StatusClass::Ok), WRITERS as u64 * PER_WRITER);
    assert_eq!(stats.latency_for(LatencyBucket::UpTo50ms), WRITERS as u64 * PER_WRITER);
    assert_eq!(stats.percentiles.len(), WRITERS);
}
