use std::collections::HashMap;
use std::fmt;
use std::io;
use std::sync::{Mutex, MutexGuard};

/// Classification bucket for a failed connect attempt. Used only as a
/// histogram key; nothing branches on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Timeout,
    Refused,
    Other(String),
}

impl ErrorKind {
    /// Maps an OS-level connect error onto the closed set of report buckets.
    pub fn classify(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut => ErrorKind::Timeout,
            io::ErrorKind::ConnectionRefused => ErrorKind::Refused,
            kind => ErrorKind::Other(format!("{kind:?}")),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Timeout => write!(f, "timeout"),
            ErrorKind::Refused => write!(f, "refused"),
            ErrorKind::Other(label) => write!(f, "{label}"),
        }
    }
}

/// Point-in-time copy of every counter the run has produced so far.
#[derive(Debug, Clone, Default)]
pub struct AggregateStats {
    pub connected: u64,
    pub failed: u64,
    /// Placeholders for the future pacing mode; the hold-only engine keeps
    /// them at zero.
    pub messages_sent: u64,
    pub bytes_sent: u64,
    pub errors: HashMap<ErrorKind, u64>,
}

impl AggregateStats {
    pub fn attempted(&self) -> u64 {
        self.connected + self.failed
    }

    pub fn success_rate(&self) -> f64 {
        if self.attempted() == 0 {
            0.0
        } else {
            self.connected as f64 / self.attempted() as f64
        }
    }
}

/// Many workers write, one orchestrator reads. A single mutex guards every
/// field together so a snapshot can never mix counters from different
/// moments. No I/O happens inside the lock.
#[derive(Debug, Default)]
pub struct StatsAggregator {
    inner: Mutex<AggregateStats>,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_connected(&self) {
        self.lock().connected += 1;
    }

    pub fn record_failed(&self, kind: ErrorKind) {
        let mut stats = self.lock();
        stats.failed += 1;
        *stats.errors.entry(kind).or_insert(0) += 1;
    }

    /// Consistent copy of all counters, taken under one critical section.
    pub fn snapshot(&self) -> AggregateStats {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, AggregateStats> {
        // A poisoned lock still holds valid counters.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
