//! The immutable, owning bundle of recorded data.

use super::events::{Frame, ScopeEvent};
use super::format;
use super::scope::{ScopeKey, ScopeRecord, TagInfo};
use crate::error::Error;
use crate::settings;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// What a draw request produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawOutcome {
    /// The model is valid and its projections may be rendered.
    Drawn,
    /// Validation failed; a human-readable error is retained instead.
    Failed,
    /// The crate was built without the `draw-model` feature.
    Unavailable,
}

/// Everything one extraction produced: frames, scope and tag tables,
/// per-thread event sequences and thread names, plus the flags that
/// describe how the data was obtained.
///
/// A snapshot owns its data outright and has no ties to the profiler it
/// came from; it may outlive it, be persisted with
/// [`write_to_file`](Self::write_to_file) and compared structurally after
/// a round-trip.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileSnapshot {
    pub(crate) frames: Vec<Frame>,
    pub(crate) scopes: HashMap<ScopeKey, ScopeRecord>,
    pub(crate) tags: HashMap<u32, TagInfo>,
    /// Indexed by thread id; parallel to `thread_names`.
    pub(crate) events: Vec<Vec<ScopeEvent>>,
    pub(crate) thread_names: Vec<String>,
    pub(crate) frame_data_missing: bool,
    pub(crate) any_records: bool,
    pub(crate) with_cookie: bool,
}

impl ProfileSnapshot {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        frames: Vec<Frame>,
        scopes: HashMap<ScopeKey, ScopeRecord>,
        tags: HashMap<u32, TagInfo>,
        events: Vec<Vec<ScopeEvent>>,
        thread_names: Vec<String>,
        frame_data_missing: bool,
        any_records: bool,
        with_cookie: bool,
    ) -> Self {
        Self {
            frames,
            scopes,
            tags,
            events,
            thread_names,
            frame_data_missing,
            any_records,
            with_cookie,
        }
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn scopes(&self) -> &HashMap<ScopeKey, ScopeRecord> {
        &self.scopes
    }

    pub fn tags(&self) -> &HashMap<u32, TagInfo> {
        &self.tags
    }

    pub fn thread_count(&self) -> usize {
        self.thread_names.len()
    }

    /// Name of the thread that owns slot `thread`.
    pub fn thread_name(&self, thread: usize) -> &str {
        &self.thread_names[thread]
    }

    /// Events recorded on slot `thread`, sorted by start time.
    pub fn events(&self, thread: usize) -> &[ScopeEvent] {
        &self.events[thread]
    }

    /// True when no frame marker was ever observed and the single frame
    /// in this snapshot was synthesized during extraction.
    pub fn is_frame_data_missing(&self) -> bool {
        self.frame_data_missing
    }

    /// True when at least one event was recorded. When false every
    /// per-thread event sequence is empty (though scope metadata may
    /// still be present).
    pub fn has_any_records(&self) -> bool {
        self.any_records
    }

    /// True when events carry ordering cookies.
    pub fn carries_cookies(&self) -> bool {
        self.with_cookie
    }

    /// Write the snapshot as the versioned binary artifact.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        format::write_snapshot(&mut writer, self)?;
        Ok(())
    }

    /// Load a snapshot previously produced by
    /// [`write_to_file`](Self::write_to_file).
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        format::read_snapshot(&mut reader)
    }

    /// Build the analytic model used for interactive visualization.
    /// Renderers that issue windowed queries should keep the model
    /// around instead of going through [`draw`](Self::draw) each time.
    #[cfg(feature = "draw-model")]
    pub fn draw_model(&self) -> crate::draw::DrawModel<'_> {
        crate::draw::DrawModel::build(self)
    }

    /// Validate the snapshot and report whether it can be rendered.
    #[cfg(feature = "draw-model")]
    pub fn draw(&self) -> DrawOutcome {
        self.draw_model().draw()
    }

    /// Drawing requires the `draw-model` feature.
    #[cfg(not(feature = "draw-model"))]
    pub fn draw(&self) -> DrawOutcome {
        DrawOutcome::Unavailable
    }

    /// Render the recording as a newline-delimited human-readable
    /// document. Durations use the unit configured in
    /// [`settings`](crate::settings).
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for (thread, events) in self.events.iter().enumerate() {
            let _ = writeln!(
                out,
                "THREAD: {}; Event count: {}",
                self.thread_names[thread],
                events.len()
            );

            if self.frames.is_empty() {
                continue;
            }
            let last = self.frames.len() - 1;
            let mut current = 0;
            push_frame_line(&mut out, &self.frames[current]);

            for event in events {
                let start = event.span.start_ns;
                if start < self.frames[current].span.start_ns {
                    // Recorded before the first frame opened.
                    continue;
                }
                if start > self.frames[current].span.end_ns {
                    if current == last {
                        // Recorded after the last frame closed.
                        continue;
                    }
                    while start > self.frames[current].span.end_ns && current != last {
                        current += 1;
                    }
                    push_frame_line(&mut out, &self.frames[current]);
                }

                let Some(record) = self.scopes.get(&event.key) else {
                    debug_assert!(false, "event references an unknown scope");
                    continue;
                };
                let indent = (event.depth * 2 + 4).max(0) as usize;
                let duration = settings::text_duration(event.span.duration_ns());
                let _ = write!(out, "{:indent$}SCOPE: {}", "", record.name);
                #[cfg(feature = "cookie")]
                {
                    let _ = write!(out, "; Cookie: {}", event.cookie);
                }
                let _ = writeln!(
                    out,
                    "; Function: {}; Duration: {}{}",
                    record.function,
                    duration,
                    settings::TEXT_DURATION_NAME
                );
            }
        }
        out
    }
}

fn push_frame_line(out: &mut String, frame: &Frame) {
    let duration = settings::text_duration(frame.span.duration_ns());
    let _ = writeln!(
        out,
        "  FRAME: {}; Duration: {}{}",
        frame.number,
        duration,
        settings::TEXT_DURATION_NAME
    );
}
