#![doc = include_str!("../README.md")]

pub mod error;
pub mod pool;
pub mod registry;
pub mod settings;

#[cfg(feature = "draw-model")]
pub mod draw;
#[cfg(feature = "profiling")]
pub mod profiler;

mod macros;

pub use error::Error;
pub use pool::{Barrier, TaskFuture, WorkerPool};
pub use settings::{Tag, TagColor};

#[cfg(feature = "profiling")]
pub use profiler::{DrawOutcome, ProfileSnapshot, ScopeGuard, ScopeKey};

use std::path::Path;

/// What the profiler is currently doing, as reported by [`status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfilerStatus {
    /// Built without the `profiling` feature; every operation is a no-op.
    Disabled,
    /// Compiled in, but not capturing events.
    EnabledNotRecording,
    /// Compiled in and capturing events.
    EnabledRecording,
}

/// Marker returned by [`results_to_string`] in builds without the
/// `profiling` feature.
pub const PROFILER_DISABLED_TEXT: &str = "PROFILER-IS-DISABLED";

/// Enable or disable event capture on the process-wide profiler.
#[cfg(feature = "profiling")]
pub fn set_recording(state: bool) {
    profiler::global().set_recording(state)
}

/// No-op without the `profiling` feature.
#[cfg(not(feature = "profiling"))]
pub fn set_recording(_state: bool) {}

/// Close the current frame and, when recording, open the next one.
#[cfg(feature = "profiling")]
pub fn next_frame() {
    profiler::global().next_frame()
}

/// No-op without the `profiling` feature.
#[cfg(not(feature = "profiling"))]
pub fn next_frame() {}

/// The process-wide profiler's current state.
#[cfg(feature = "profiling")]
pub fn status() -> ProfilerStatus {
    if profiler::global().is_recording() {
        ProfilerStatus::EnabledRecording
    } else {
        ProfilerStatus::EnabledNotRecording
    }
}

/// Always [`ProfilerStatus::Disabled`] without the `profiling` feature.
#[cfg(not(feature = "profiling"))]
pub fn status() -> ProfilerStatus {
    ProfilerStatus::Disabled
}

/// Stop recording and extract everything recorded so far.
#[cfg(feature = "profiling")]
pub fn take_results() -> ProfileSnapshot {
    profiler::global().take_results()
}

/// Stop recording, extract, and write the binary artifact to `path`.
#[cfg(feature = "profiling")]
pub fn results_to_file(path: impl AsRef<Path>) -> Result<(), Error> {
    take_results().write_to_file(path)
}

/// No-op without the `profiling` feature.
#[cfg(not(feature = "profiling"))]
pub fn results_to_file(_path: impl AsRef<Path>) -> Result<(), Error> {
    Ok(())
}

/// Stop recording, extract, and render the recording as text.
#[cfg(feature = "profiling")]
pub fn results_to_string() -> String {
    take_results().render_text()
}

/// Returns [`PROFILER_DISABLED_TEXT`] without the `profiling` feature.
#[cfg(not(feature = "profiling"))]
pub fn results_to_string() -> String {
    PROFILER_DISABLED_TEXT.to_string()
}
