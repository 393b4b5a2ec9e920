//! Timed value types shared by the recorder, the frame ledger and
//! snapshots.
//!
//! The `Serialize` impls are a convenience for dumping recordings to
//! JSON-ish sinks; the on-disk snapshot layout lives in
//! [`format`](super::format) and is independent of serde.

use super::scope::ScopeKey;
use serde::Serialize;

/// A start/end pair measured in nanoseconds since the clock epoch.
///
/// Invariant: `end_ns >= start_ns` for every span that left the recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeSpan {
    pub start_ns: i64,
    pub end_ns: i64,
}

impl TimeSpan {
    /// An open span: started, end not yet stamped.
    pub fn open(start_ns: i64) -> Self {
        Self {
            start_ns,
            end_ns: 0,
        }
    }

    pub fn new(start_ns: i64, end_ns: i64) -> Self {
        Self { start_ns, end_ns }
    }

    /// Start and end differ (the span was actually stamped).
    pub fn is_valid(&self) -> bool {
        self.start_ns != self.end_ns
    }

    /// The span has a proper extent.
    pub fn is_complete(&self) -> bool {
        self.start_ns < self.end_ns
    }

    pub fn duration_ns(&self) -> i64 {
        self.end_ns - self.start_ns
    }
}

/// A completed scope instance on one thread.
///
/// `depth` is the caller-thread nesting depth at entry, 0 for the
/// outermost instrumented scope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScopeEvent {
    pub key: ScopeKey,
    pub depth: i32,
    pub span: TimeSpan,
    /// Per-thread monotonic counter, for debugging event order.
    #[cfg(feature = "cookie")]
    pub cookie: u64,
}

/// A user-delimited outer interval grouping events for visualization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Frame {
    pub number: u64,
    pub span: TimeSpan,
}

impl Frame {
    pub fn open(number: u64, start_ns: i64) -> Self {
        Self {
            number,
            span: TimeSpan::open(start_ns),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_validity_and_completeness() {
        let open = TimeSpan::open(100);
        assert!(open.is_valid());
        assert!(!open.is_complete());

        let complete = TimeSpan::new(100, 200);
        assert!(complete.is_valid());
        assert!(complete.is_complete());
        assert_eq!(complete.duration_ns(), 100);

        // A zero-length span is neither valid nor complete.
        let point = TimeSpan::new(100, 100);
        assert!(!point.is_valid());
        assert!(!point.is_complete());
    }

    #[test]
    fn open_frame_is_incomplete_until_stamped() {
        let mut frame = Frame::open(3, 1_000);
        assert_eq!(frame.number, 3);
        assert!(!frame.span.is_complete());
        frame.span.end_ns = 2_000;
        assert!(frame.span.is_complete());
    }
}
