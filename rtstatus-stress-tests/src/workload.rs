use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// GET an existing file (200).
    Hit,
    /// GET a path that does not exist (404).
    Miss,
    /// GET a directory, which the server refuses (403).
    Forbidden,
}

/// Workload profiles controlling the mix of requests the workers issue.
///
/// | Profile    | Hit % | Miss % | Forbidden % |
/// |------------|-------|--------|-------------|
/// | HitsOnly   |  100  |    0   |      0      |
/// | Balanced   |   80  |   15   |      5      |
/// | MissHeavy  |   30  |   60   |     10      |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadProfile {
    HitsOnly,
    Balanced,
    MissHeavy,
}

impl WorkloadProfile {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "hits-only" => Some(WorkloadProfile::HitsOnly),
            "balanced" => Some(WorkloadProfile::Balanced),
            "miss-heavy" => Some(WorkloadProfile::MissHeavy),
            _ => None,
        }
    }

    pub fn as_name(&self) -> &'static str {
        match self {
            WorkloadProfile::HitsOnly => "hits-only",
            WorkloadProfile::Balanced => "balanced",
            WorkloadProfile::MissHeavy => "miss-heavy",
        }
    }

    /// Draw a random operation using `rng`.
    pub fn sample(&self, rng: &mut impl Rng) -> Op {
        let roll: u32 = rng.gen_range(0..100);
        self.op_for_roll(roll)
    }

    /// Map a roll in `0..100` to an `Op` according to the profile's percentages.
    /// Exposed for deterministic testing.
    pub fn op_for_roll(&self, roll: u32) -> Op {
        match self {
            WorkloadProfile::HitsOnly => Op::Hit,
            WorkloadProfile::Balanced => {
                if roll < 80 { Op::Hit } else if roll < 95 { Op::Miss } else { Op::Forbidden }
            }
            WorkloadProfile::MissHeavy => {
                if roll < 30 { Op::Hit } else if roll < 90 { Op::Miss } else { Op::Forbidden }
            }
        }
    }
}
