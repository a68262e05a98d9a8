//! Response classification shared by the recorder and the report.

/// Bucket a completed request is counted under, by response status.
///
/// Declaration order is report order; `index()` addresses the per-slot
/// counter arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusClass {
    /// Status below 100.
    Other,
    Informational,
    Ok,
    SuccessOther,
    MovedPermanently,
    Found,
    NotModified,
    RedirectOther,
    NotFound,
    ClientErrorOther,
    ServerError,
}

impl StatusClass {
    pub const COUNT: usize = 11;

    pub const ALL: [StatusClass; StatusClass::COUNT] = [
        StatusClass::Other,
        StatusClass::Informational,
        StatusClass::Ok,
        StatusClass::SuccessOther,
        StatusClass::MovedPermanently,
        StatusClass::Found,
        StatusClass::NotModified,
        StatusClass::RedirectOther,
        StatusClass::NotFound,
        StatusClass::ClientErrorOther,
        StatusClass::ServerError,
    ];

    /// Classify a response status. The first matching rule wins, checked from
    /// the highest range down.
    pub fn classify(status: u16) -> Self {
        match status {
            500..=u16::MAX => StatusClass::ServerError,
            404 => StatusClass::NotFound,
            400..=499 => StatusClass::ClientErrorOther,
            301 => StatusClass::MovedPermanently,
            302 => StatusClass::Found,
            304 => StatusClass::NotModified,
            300..=399 => StatusClass::RedirectOther,
            200 => StatusClass::Ok,
            201..=299 => StatusClass::SuccessOther,
            100..=199 => StatusClass::Informational,
            _ => StatusClass::Other,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Suffix used in report keys (`NB_Reqs_<suffix>`).
    pub fn suffix(self) -> &'static str {
        match self {
            StatusClass::Other => "xxx",
            StatusClass::Informational => "10x",
            StatusClass::Ok => "200",
            StatusClass::SuccessOther => "20x",
            StatusClass::MovedPermanently => "301",
            StatusClass::Found => "302",
            StatusClass::NotModified => "304",
            StatusClass::RedirectOther => "30x",
            StatusClass::NotFound => "404",
            StatusClass::ClientErrorOther => "40x",
            StatusClass::ServerError => "50x",
        }
    }
}

/// Response-time histogram bucket, in milliseconds.
///
/// Every range is closed on the right except `UpTo30s`, which stops at
/// 29 999 ms; 30 000 ms and above land in `Over30s`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LatencyBucket {
    UpTo50ms,
    UpTo100ms,
    UpTo300ms,
    UpTo500ms,
    UpTo1s,
    UpTo1500ms,
    UpTo2s,
    UpTo5s,
    UpTo10s,
    UpTo15s,
    UpTo20s,
    UpTo30s,
    Over30s,
}

impl LatencyBucket {
    pub const COUNT: usize = 13;

    pub const ALL: [LatencyBucket; LatencyBucket::COUNT] = [
        LatencyBucket::UpTo50ms,
        LatencyBucket::UpTo100ms,
        LatencyBucket::UpTo300ms,
        LatencyBucket::UpTo500ms,
        LatencyBucket::UpTo1s,
        LatencyBucket::UpTo1500ms,
        LatencyBucket::UpTo2s,
        LatencyBucket::UpTo5s,
        LatencyBucket::UpTo10s,
        LatencyBucket::UpTo15s,
        LatencyBucket::UpTo20s,
        LatencyBucket::UpTo30s,
        LatencyBucket::Over30s,
    ];

    pub fn classify(elapsed_ms: u64) -> Self {
        match elapsed_ms {
            0..=50 => LatencyBucket::UpTo50ms,
            51..=100 => LatencyBucket::UpTo100ms,
            101..=300 => LatencyBucket::UpTo300ms,
            301..=500 => LatencyBucket::UpTo500ms,
            501..=1_000 => LatencyBucket::UpTo1s,
            1_001..=1_500 => LatencyBucket::UpTo1500ms,
            1_501..=2_000 => LatencyBucket::UpTo2s,
            2_001..=5_000 => LatencyBucket::UpTo5s,
            5_001..=10_000 => LatencyBucket::UpTo10s,
            10_001..=15_000 => LatencyBucket::UpTo15s,
            15_001..=20_000 => LatencyBucket::UpTo20s,
            20_001..=29_999 => LatencyBucket::UpTo30s,
            _ => LatencyBucket::Over30s,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Suffix used in report keys (`NB_Reqs_<suffix>`).
    pub fn suffix(self) -> &'static str {
        match self {
            LatencyBucket::UpTo50ms => "50ms",
            LatencyBucket::UpTo100ms => "100ms",
            LatencyBucket::UpTo300ms => "300ms",
            LatencyBucket::UpTo500ms => "500ms",
            LatencyBucket::UpTo1s => "1s",
            LatencyBucket::UpTo1500ms => "1_5s",
            LatencyBucket::UpTo2s => "2s",
            LatencyBucket::UpTo5s => "5s",
            LatencyBucket::UpTo10s => "10s",
            LatencyBucket::UpTo15s => "15s",
            LatencyBucket::UpTo20s => "20s",
            LatencyBucket::UpTo30s => "30s",
            LatencyBucket::Over30s => "xs",
        }
    }
}
