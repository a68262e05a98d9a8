use clap::Parser;
use std::io::Write;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use rtstatus_client::{Client, ClientConfig};
use rtstatus_common::report as keys;
use rtstatus_common::{Limits, Report};
use rtstatus_stress_tests::metrics::Metrics;
use rtstatus_stress_tests::reconcile::{histogram_total, reconcile, Mismatch};
use rtstatus_stress_tests::server::Host;
use rtstatus_stress_tests::worker;
use rtstatus_stress_tests::workload::WorkloadProfile;

#[derive(Parser)]
#[command(name = "rtstatus-stress", about = "RtStatus stress test harness")]
struct Args {
    /// How long to run (seconds)
    #[arg(long, default_value_t = 5)]
    duration: u64,

    /// Workload profile: hits-only | balanced | miss-heavy
    #[arg(long, default_value = "balanced")]
    workload: String,

    /// Number of concurrent client tasks
    #[arg(long, default_value_t = 8)]
    concurrency: usize,

    /// Server groups in the slot table
    #[arg(long, default_value_t = 2)]
    server_limit: usize,

    /// Slots per server group
    #[arg(long, default_value_t = 8)]
    thread_limit: usize,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let profile = WorkloadProfile::from_name(&args.workload).unwrap_or_else(|| {
        eprintln!(
            "Unknown workload {:?}. Valid values: hits-only, balanced, miss-heavy",
            args.workload
        );
        process::exit(3);
    });

    let limits = Limits::new(args.server_limit, args.thread_limit);
    if limits.slots() == 0 || args.concurrency == 0 {
        eprintln!("--server-limit, --thread-limit and --concurrency must be at least 1");
        process::exit(3);
    }

    let host = Host::build_and_spawn(limits).unwrap_or_else(|e| {
        eprintln!("Failed to start server: {e}");
        process::exit(3);
    });
    let addr = host.process.addr.to_string();

    println!("Server ready:  {}  ({} slots)", addr, limits.slots());

    let duration = Duration::from_secs(args.duration);

    print!("Running {}s {} workload ", args.duration, profile.as_name());
    std::io::stdout().flush().ok();

    let dot_handle = tokio::spawn(async {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        interval.tick().await; // consume the immediate first tick
        loop {
            interval.tick().await;
            print!(".");
            std::io::stdout().flush().ok();
        }
    });

    let files = Arc::new(host.files.clone());
    let metrics = worker::run(addr.clone(), profile, files, args.concurrency, duration).await;

    dot_handle.abort();
    println!();

    let report = Client::new(ClientConfig { addr }).report().await.unwrap_or_else(|e| {
        eprintln!("Failed to fetch status report: {e}");
        process::exit(3);
    });
    drop(host);

    let mismatches = reconcile(&report, &metrics).unwrap_or_else(|e| {
        eprintln!("Status report is incomplete: {e}");
        process::exit(3);
    });

    print_report(&args, profile, &metrics, &report, &mismatches);

    for m in &mismatches {
        eprintln!("MISMATCH {m}");
    }

    process::exit(if mismatches.is_empty() { 0 } else { 1 });
}

fn print_report(
    args: &Args,
    profile: WorkloadProfile,
    metrics: &Metrics,
    report: &Report,
    mismatches: &[Mismatch],
) {
    let server_value = |key: &str| report.get(key).unwrap_or("?").to_string();

    println!("RtStatus Stress Test Results");
    println!("============================");
    println!("Duration:              {:.1} s", args.duration as f64);
    println!("Workload:              {}", profile.as_name());
    println!("Concurrency:           {}", args.concurrency);
    println!("Slots:                 {} x {}", args.server_limit, args.thread_limit);
    println!();
    println!("Requests:              {}", format_thousands(metrics.requests_total));
    println!("Throughput:            {:.1} rps", metrics.throughput_rps());
    println!("Client P50 latency:    {:.1} ms", ns_to_ms(metrics.p50_ns()));
    println!("Client P99 latency:    {:.1} ms", ns_to_ms(metrics.p99_ns()));
    println!("Network errors:        {}", metrics.network_errors);
    println!();
    println!("Server accesses:       {}", server_value(keys::TOTAL_ACCESSES));
    println!("Server avg:            {} ms", server_value(keys::AVG_RESPONSE_TIME));
    println!("Server p90:            {} ms", server_value(keys::PERCENTILE_90));
    if let Ok(histogram) = histogram_total(report) {
        println!("Histogram entries:     {}", format_thousands(histogram));
    }
    println!();
    println!(
        "Reconciliation:        {} mismatches  {}",
        mismatches.len(),
        if mismatches.is_empty() { "✓" } else { "✗" }
    );
    println!();
    println!("Result: {}", if mismatches.is_empty() { "PASS" } else { "FAIL" });
}

fn format_thousands(n: u64) -> String {
    if n >= 1_000_000 {
        format!("~{}M", n / 1_000_000)
    } else if n >= 1_000 {
        format!("~{}K", n / 1_000)
    } else {
        n.to_string()
    }
}

fn ns_to_ms(ns: u64) -> f64 {
    ns as f64 / 1_000_000.0
}
