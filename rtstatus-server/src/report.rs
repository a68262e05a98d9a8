//! Builds the text report from an aggregation pass.

use std::path::Path;

use rtstatus_common::report::{self, WorkerRow};
use rtstatus_common::{LatencyBucket, Limits, Report, StatusClass, WorkerState};

use crate::aggregate::AggregatedStats;
use crate::table::SlotTable;
use crate::workers::WorkerStates;

/// Host facts printed in the report header.
#[derive(Debug, Clone)]
pub struct ReportContext<'a> {
    pub document_root: &'a Path,
    pub listen: &'a str,
    pub limits: Limits,
    pub started_at_ms: u64,
    pub now_ms: u64,
    /// Monotonic reading taken with `now_ms`, for requests still in flight.
    pub monotonic_ms: u64,
}

/// Full report: header, global totals, then one row per slot that has
/// served a request or is neither `Ready` nor `Dead`.
pub fn render(
    ctx: &ReportContext<'_>,
    stats: &AggregatedStats,
    table: &SlotTable,
    states: &dyn WorkerStates,
) -> Report {
    let mut out = Report::new();

    out.push(report::VERSION, env!("CARGO_PKG_VERSION"));
    out.push(report::DOCUMENT_ROOT, ctx.document_root.display());
    out.push(report::LISTEN, format!("http://{}", ctx.listen));
    out.push(report::SERVER_LIMIT, ctx.limits.server_limit);
    out.push(report::THREAD_LIMIT, ctx.limits.thread_limit);
    out.push(report::CURRENT_TIME, ctx.now_ms);
    out.push(report::START_TIME, ctx.started_at_ms);
    out.push(report::UPTIME, ctx.now_ms.saturating_sub(ctx.started_at_ms) / 1000);

    for class in StatusClass::ALL {
        out.push(report::requests_key(class), stats.requests_for(class));
    }
    for class in StatusClass::ALL {
        out.push(report::bytes_key(class), stats.bytes_for(class));
    }
    for bucket in LatencyBucket::ALL {
        out.push(report::latency_key(bucket), stats.latency_for(bucket));
    }

    out.push(report::AVG_RESPONSE_TIME, stats.avg_ms);
    let array = stats
        .percentiles
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(",");
    out.push(report::PERCENTILE_ARRAY, array);
    out.push(report::PERCENTILE_90, stats.percentile_ms);

    out.push(report::TOTAL_ACCESSES, stats.total_accesses);
    out.push(report::TOTAL_KBYTES, stats.total_kbytes);
    out.push(report::BUSY_WORKERS, stats.busy_workers);
    out.push(report::IDLE_WORKERS, stats.idle_workers);
    out.push(report::SCOREBOARD, scoreboard(table, states));

    for row in worker_rows(ctx, table, states) {
        out.push(row.key(), row.value());
    }
    out
}

/// One state flag per slot, in table order.
pub fn scoreboard(table: &SlotTable, states: &dyn WorkerStates) -> String {
    table.iter().map(|(id, _)| states.state(id).flag()).collect()
}

/// Per-slot detail view.
pub fn worker_rows(
    ctx: &ReportContext<'_>,
    table: &SlotTable,
    states: &dyn WorkerStates,
) -> Vec<WorkerRow> {
    table
        .iter()
        .filter_map(|(id, slot)| {
            let snap = slot.snapshot();
            let state = states.state(id);
            let accesses = snap.accesses();
            if accesses == 0 && matches!(state, WorkerState::Ready | WorkerState::Dead) {
                return None;
            }
            let activity = states.activity(id);
            Some(WorkerRow {
                server: id.server,
                thread: id.thread,
                state: state.label().to_string(),
                accesses,
                since_used_secs: activity.since_used_secs(ctx.now_ms),
                last_ms: snap.last_ms,
                avg_ms: snap.avg_ms,
                percentile_ms: snap.percentile_ms,
                request_ms: activity.request_ms(ctx.monotonic_ms),
                bytes: snap.total_bytes(),
                client: activity.request.client,
                request: activity.request.request,
                vhost: activity.request.vhost,
            })
        })
        .collect()
}
