/// Lifecycle state of the worker occupying a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WorkerState {
    Dead = 0,
    Starting,
    Ready,
    BusyRead,
    BusyWrite,
    Keepalive,
    Logging,
    Dns,
    Closing,
    Graceful,
    IdleKill,
}

impl WorkerState {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Decode a stored state byte. Unknown values decode as `Dead`.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => WorkerState::Starting,
            2 => WorkerState::Ready,
            3 => WorkerState::BusyRead,
            4 => WorkerState::BusyWrite,
            5 => WorkerState::Keepalive,
            6 => WorkerState::Logging,
            7 => WorkerState::Dns,
            8 => WorkerState::Closing,
            9 => WorkerState::Graceful,
            10 => WorkerState::IdleKill,
            _ => WorkerState::Dead,
        }
    }

    /// Whether the slot's averages and percentiles take part in aggregation.
    pub fn is_live(self) -> bool {
        !matches!(self, WorkerState::Dead | WorkerState::Starting)
    }

    /// Whether the worker is currently handling a request.
    pub fn is_busy(self) -> bool {
        !matches!(
            self,
            WorkerState::Dead | WorkerState::Starting | WorkerState::Ready | WorkerState::IdleKill
        )
    }

    /// One-character scoreboard flag.
    pub fn flag(self) -> char {
        match self {
            WorkerState::Dead => '.',
            WorkerState::Starting => 'S',
            WorkerState::Ready => '_',
            WorkerState::BusyRead => 'R',
            WorkerState::BusyWrite => 'W',
            WorkerState::Keepalive => 'K',
            WorkerState::Logging => 'L',
            WorkerState::Dns => 'D',
            WorkerState::Closing => 'C',
            WorkerState::Graceful => 'G',
            WorkerState::IdleKill => 'I',
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WorkerState::Dead => "Dead",
            WorkerState::Starting => "Starting",
            WorkerState::Ready => "Ready",
            WorkerState::BusyRead => "Read",
            WorkerState::BusyWrite => "Write",
            WorkerState::Keepalive => "Keepalive",
            WorkerState::Logging => "Logging",
            WorkerState::Dns => "DNS lookup",
            WorkerState::Closing => "Closing",
            WorkerState::Graceful => "Graceful",
            WorkerState::IdleKill => "Dying",
        }
    }
}
