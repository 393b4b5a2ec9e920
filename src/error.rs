use thiserror::Error;

/// Errors surfaced by the profiler, the worker pool and snapshot I/O.
///
/// Assertion-class failures (scope exit mismatch, unbalanced guards) are
/// `debug_assert!`s rather than variants here; see the invariants on
/// [`crate::profiler::Profiler`].
#[derive(Debug, Error)]
pub enum Error {
    /// A constructor argument was out of range (zero pool workers,
    /// negative barrier count, interval-tree capacity exceeded).
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(&'static str),

    /// More distinct threads touched the identity table than
    /// [`crate::settings::MAX_THREADS`] allows.
    #[error("thread identity table is full ({limit} slots)")]
    TooManyThreads { limit: usize },

    /// A task was submitted after the pool started shutting down.
    #[error("task submitted to a pool that is shutting down")]
    PoolClosed,

    /// `notify_completed` was called more times than the barrier's count.
    #[error("barrier notified more times than its configured task count")]
    BarrierOverNotified,

    /// Snapshot file could not be read or written.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Snapshot bytes did not parse: bad magic, unsupported version or a
    /// malformed string.
    #[error("snapshot format error: {0}")]
    Format(String),
}
