use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct Metrics {
    /// Requests that got an HTTP response, whatever its status.
    pub requests_total: u64,
    /// Requests that failed before any response arrived.
    pub network_errors: u64,
    pub by_status: BTreeMap<u16, u64>,
    /// One entry per completed request, in insertion order (unsorted).
    pub latency_ns: Vec<u64>,
    pub elapsed_secs: f64,
}

impl Metrics {
    pub fn record(&mut self, status: u16, latency_ns: u64) {
        self.requests_total += 1;
        *self.by_status.entry(status).or_insert(0) += 1;
        self.latency_ns.push(latency_ns);
    }

    /// Fold another worker's metrics into this one. `elapsed_secs` is kept.
    pub fn merge(&mut self, other: Metrics) {
        self.requests_total += other.requests_total;
        self.network_errors += other.network_errors;
        for (status, n) in other.by_status {
            *self.by_status.entry(status).or_insert(0) += n;
        }
        self.latency_ns.extend(other.latency_ns);
    }

    pub fn count(&self, status: u16) -> u64 {
        self.by_status.get(&status).copied().unwrap_or(0)
    }

    /// Client errors other than 404, the server's `40x` class.
    pub fn other_client_errors(&self) -> u64 {
        self.by_status
            .iter()
            .filter(|(&s, _)| (400..500).contains(&s) && s != 404)
            .map(|(_, n)| n)
            .sum()
    }

    pub fn p50_ns(&self) -> u64 {
        percentile(&self.latency_ns, 0.50)
    }

    pub fn p99_ns(&self) -> u64 {
        percentile(&self.latency_ns, 0.99)
    }

    pub fn throughput_rps(&self) -> f64 {
        self.requests_total as f64 / self.elapsed_secs
    }
}

/// Sort `data` ascending and return the element at index `floor(p * n)`.
/// Returns 0 for an empty slice.
fn percentile(data: &[u64], p: f64) -> u64 {
    if data.is_empty() {
        return 0;
    }
    let mut sorted = data.to_vec();
    sorted.sort_unstable();
    let idx = (p * sorted.len() as f64).floor() as usize;
    sorted[idx.min(sorted.len() - 1)]
}
