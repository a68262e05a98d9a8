use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::{Duration, Instant};
use rtstatus_client::{Client, ClientConfig};

use crate::metrics::Metrics;
use crate::server::FORBIDDEN_DIR;
use crate::workload::{Op, WorkloadProfile};

/// Drive the server at `addr` with `concurrency` tasks for `duration`.
/// Every task finishes its in-flight request before returning, so all
/// requests counted here have completed when this returns.
pub async fn run(
    addr: String,
    profile: WorkloadProfile,
    files: Arc<Vec<String>>,
    concurrency: usize,
    duration: Duration,
) -> Metrics {
    let client = Arc::new(Client::new(ClientConfig { addr }));
    let run_start = Instant::now();

    let tasks: Vec<_> = (0..concurrency)
        .map(|_| {
            let client = Arc::clone(&client);
            let files = Arc::clone(&files);
            tokio::spawn(async move {
                let mut rng = StdRng::from_entropy();
                let mut metrics = Metrics::default();
                while run_start.elapsed() < duration {
                    let path = path_for(profile.sample(&mut rng), &files, &mut rng);
                    let op_start = Instant::now();
                    match client.get(&path).await {
                        Ok(status) => metrics.record(status, op_start.elapsed().as_nanos() as u64),
                        Err(_) => metrics.network_errors += 1,
                    }
                }
                metrics
            })
        })
        .collect();

    let mut metrics = Metrics::default();
    for task in tasks {
        match task.await {
            Ok(m) => metrics.merge(m),
            Err(_) => metrics.network_errors += 1,
        }
    }
    metrics.elapsed_secs = run_start.elapsed().as_secs_f64();
    metrics
}

/// Request path for `op`. Misses get a random name that no file carries.
pub fn path_for(op: Op, files: &[String], rng: &mut impl Rng) -> String {
    match op {
        Op::Hit if !files.is_empty() => files[rng.gen_range(0..files.len())].clone(),
        Op::Hit | Op::Miss => format!("/missing_{}.html", rng.gen::<u32>()),
        Op::Forbidden => format!("/{FORBIDDEN_DIR}"),
    }
}
