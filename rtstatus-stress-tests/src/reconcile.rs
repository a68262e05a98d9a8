//! Cross-checks the server's report against what the load clients saw.
//!
//! Only valid once every load request has completed: the server records a
//! request before its response is sent, so a finished request is always
//! visible to a later report.

use std::fmt;

use rtstatus_common::report::{self as keys, latency_key, requests_key};
use rtstatus_common::{LatencyBucket, Report, RtStatusError, StatusClass};

use crate::metrics::Metrics;

/// A report value that disagrees with the client-side expectation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    /// `key` should equal `expected`.
    Count { key: String, expected: u64, actual: u64 },
    /// Every recorded request lands in exactly one latency bucket.
    HistogramMismatch { histogram: u64, total_accesses: u64 },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::Count { key, expected, actual } => {
                write!(f, "{key}: expected {expected}, report says {actual}")
            }
            Mismatch::HistogramMismatch { histogram, total_accesses } => write!(
                f,
                "latency histogram holds {histogram} entries but TotalAccesses is {total_accesses}"
            ),
        }
    }
}

/// Sum of every latency bucket in `report`.
pub fn histogram_total(report: &Report) -> Result<u64, RtStatusError> {
    LatencyBucket::ALL
        .iter()
        .map(|&bucket| report.get_u64(&latency_key(bucket)))
        .sum()
}

/// Compare `report` against `metrics`. 503 replies are never recorded by the
/// server, so they are left out of the expected total.
pub fn reconcile(report: &Report, metrics: &Metrics) -> Result<Vec<Mismatch>, RtStatusError> {
    let mut mismatches = Vec::new();

    let expected = [
        (requests_key(StatusClass::Ok), metrics.count(200)),
        (requests_key(StatusClass::NotFound), metrics.count(404)),
        (requests_key(StatusClass::ClientErrorOther), metrics.other_client_errors()),
        (keys::TOTAL_ACCESSES.to_string(), metrics.requests_total - metrics.count(503)),
    ];
    for (key, expected) in expected {
        let actual = report.get_u64(&key)?;
        if actual != expected {
            mismatches.push(Mismatch::Count { key, expected, actual });
        }
    }

    let histogram = histogram_total(report)?;
    let total_accesses = report.get_u64(keys::TOTAL_ACCESSES)?;
    if histogram != total_accesses {
        mismatches.push(Mismatch::HistogramMismatch { histogram, total_accesses });
    }

    Ok(mismatches)
}
