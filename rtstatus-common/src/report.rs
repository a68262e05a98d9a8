//! Text report model shared by the server (rendering) and the client (parsing).
//!
//! A report is an ordered list of `Key: value` lines. Keys are matched
//! case-insensitively when a single attribute is looked up.

use std::fmt;

use crate::{LatencyBucket, Result, RtStatusError, StatusClass};

pub const VERSION: &str = "Version";
pub const DOCUMENT_ROOT: &str = "DocumentRoot";
pub const LISTEN: &str = "Listen";
pub const SERVER_LIMIT: &str = "ServerLimit";
pub const THREAD_LIMIT: &str = "ThreadLimit";
pub const CURRENT_TIME: &str = "CurrentTime";
pub const START_TIME: &str = "StartTime";
pub const UPTIME: &str = "Uptime";
pub const AVG_RESPONSE_TIME: &str = "Avg_ResponseTime";
pub const PERCENTILE_ARRAY: &str = "Percentil_Array";
pub const PERCENTILE_90: &str = "90Percentil_ResponseTime";
pub const TOTAL_ACCESSES: &str = "TotalAccesses";
pub const TOTAL_KBYTES: &str = "TotalKBytes";
pub const BUSY_WORKERS: &str = "BusyWorkers";
pub const IDLE_WORKERS: &str = "IdleWorkers";
pub const SCOREBOARD: &str = "Scoreboard";

const WORKER_PREFIX: &str = "Worker[";

/// Report key holding the request count of a status class.
pub fn requests_key(class: StatusClass) -> String {
    format!("NB_Reqs_{}", class.suffix())
}

/// Report key holding the byte count of a status class.
pub fn bytes_key(class: StatusClass) -> String {
    format!("NB_Bytes_{}", class.suffix())
}

/// Report key holding the request count of a latency bucket.
pub fn latency_key(bucket: LatencyBucket) -> String {
    format!("NB_Reqs_{}", bucket.suffix())
}

/// Parsed or rendered status report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    entries: Vec<(String, String)>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line. Order of insertion is the rendering order.
    pub fn push(&mut self, key: impl Into<String>, value: impl fmt::Display) {
        self.entries.push((key.into(), value.to_string()));
    }

    /// Parse `Key: value` lines. Blank lines are skipped.
    pub fn parse(text: &str) -> Result<Self> {
        let mut report = Report::new();
        for line in text.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let (key, value) = line
                .split_once(':')
                .ok_or_else(|| RtStatusError::MalformedReport(format!("missing separator in {line:?}")))?;
            report.entries.push((key.trim().to_string(), value.trim().to_string()));
        }
        Ok(report)
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// Look up a value by key, ignoring ASCII case.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn get_u64(&self, key: &str) -> Result<u64> {
        let value = self
            .get(key)
            .ok_or_else(|| RtStatusError::UnknownAttribute(key.to_string()))?;
        value
            .parse()
            .map_err(|_| RtStatusError::MalformedReport(format!("{key} is not a number: {value:?}")))
    }

    /// The sorted per-slot percentiles listed under `Percentil_Array`.
    pub fn percentile_array(&self) -> Result<Vec<u64>> {
        let value = self
            .get(PERCENTILE_ARRAY)
            .ok_or_else(|| RtStatusError::UnknownAttribute(PERCENTILE_ARRAY.to_string()))?;
        if value.is_empty() {
            return Ok(Vec::new());
        }
        value
            .split(',')
            .map(|v| {
                v.trim().parse().map_err(|_| {
                    RtStatusError::MalformedReport(format!("bad percentile entry {v:?}"))
                })
            })
            .collect()
    }

    /// Per-slot detail rows, in report order.
    pub fn workers(&self) -> Result<Vec<WorkerRow>> {
        self.entries
            .iter()
            .filter(|(k, _)| k.starts_with(WORKER_PREFIX))
            .map(|(k, v)| WorkerRow::parse(k, v))
            .collect()
    }

    /// Render as `Key: value` lines, each terminated by `\n`.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.entries {
            out.push_str(key);
            out.push_str(": ");
            out.push_str(value);
            out.push('\n');
        }
        out
    }
}

/// One line of the per-slot listing:
/// `Worker[<server>-<thread>]: <state>;<accesses>;<since used s>;<last>;<avg>;<percentile>;<request ms>;<bytes>;<client>|<request>|<vhost>`.
///
/// The trailing field is free text and may itself hold `;`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerRow {
    pub server: usize,
    pub thread: usize,
    pub state: String,
    pub accesses: u64,
    /// Whole seconds since the slot last finished a request.
    pub since_used_secs: u64,
    pub last_ms: u64,
    pub avg_ms: u64,
    pub percentile_ms: u64,
    /// Running time of the request in flight, else of the last one.
    pub request_ms: u64,
    pub bytes: u64,
    pub client: String,
    pub request: String,
    pub vhost: String,
}

const WORKER_FIELDS: usize = 9;

impl WorkerRow {
    pub fn key(&self) -> String {
        format!("{WORKER_PREFIX}{}-{}]", self.server, self.thread)
    }

    pub fn value(&self) -> String {
        format!(
            "{};{};{};{};{};{};{};{};{}|{}|{}",
            self.state,
            self.accesses,
            self.since_used_secs,
            self.last_ms,
            self.avg_ms,
            self.percentile_ms,
            self.request_ms,
            self.bytes,
            self.client,
            self.request,
            self.vhost
        )
    }

    fn parse(key: &str, value: &str) -> Result<Self> {
        let malformed = || RtStatusError::MalformedReport(format!("bad worker line {key}: {value}"));

        let ids = key
            .strip_prefix(WORKER_PREFIX)
            .and_then(|rest| rest.strip_suffix(']'))
            .ok_or_else(malformed)?;
        let (server, thread) = ids.split_once('-').ok_or_else(malformed)?;

        let fields: Vec<&str> = value.splitn(WORKER_FIELDS, ';').collect();
        if fields.len() != WORKER_FIELDS {
            return Err(malformed());
        }
        let num = |s: &str| s.parse::<u64>().map_err(|_| malformed());

        // Neither the peer address nor the Host header can hold `|`; the
        // request line can.
        let (client, rest) = fields[8].split_once('|').ok_or_else(malformed)?;
        let (request, vhost) = rest.rsplit_once('|').ok_or_else(malformed)?;

        Ok(WorkerRow {
            server: server.parse().map_err(|_| malformed())?,
            thread: thread.parse().map_err(|_| malformed())?,
            state: fields[0].to_string(),
            accesses: num(fields[1])?,
            since_used_secs: num(fields[2])?,
            last_ms: num(fields[3])?,
            avg_ms: num(fields[4])?,
            percentile_ms: num(fields[5])?,
            request_ms: num(fields[6])?,
            bytes: num(fields[7])?,
            client: client.to_string(),
            request: request.to_string(),
            vhost: vhost.to_string(),
        })
    }
}
