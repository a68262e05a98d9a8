/// Number of samples a percentile window holds before it is closed.
pub const WINDOW_CAPACITY: usize = 10;

/// A window older than this is discarded and restarted on the next sample.
pub const WINDOW_DURATION_MS: u64 = 10_000;

/// Index read from the sorted window when it closes: the 9th smallest of 10,
/// i.e. the 90th percentile.
pub const WINDOW_PERCENTILE_INDEX: usize = 8;

/// Quantile taken over the sorted per-slot percentiles during aggregation.
pub const AGGREGATE_QUANTILE: f64 = 0.9;

