//! Read-only analytics over a snapshot for interactive visualization.
//!
//! Building the model validates the snapshot, indexes every thread's
//! events in an interval tree for viewport queries, and aggregates
//! per-scope call statistics. The drawing surface itself is out of
//! scope: renderers consume the projections exposed here.

mod interval_tree;

pub use interval_tree::{Interval, IntervalTree};

use crate::error::Error;
use crate::profiler::{DrawOutcome, Frame, ProfileSnapshot, ScopeKey, ScopeRecord, TagInfo};
use serde::Serialize;
use std::collections::HashMap;

/// A lightweight reference to one recorded event, storable in the
/// interval tree and resolvable back through the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventHandle {
    /// Index into the owning thread's event slice.
    pub index: usize,
    pub start_ns: i64,
    pub end_ns: i64,
}

impl Interval for EventHandle {
    fn start(&self) -> i64 {
        self.start_ns
    }
    fn end(&self) -> i64 {
        self.end_ns
    }
}

/// Aggregate call statistics for one scope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScopeStats {
    pub total_calls: u64,
    pub mean_duration_ns: f64,
    pub min_duration_ns: i64,
    /// Frame (relative to the snapshot's first frame) carrying the
    /// shortest call.
    pub min_frame: u64,
    pub max_duration_ns: i64,
    /// Frame (relative to the snapshot's first frame) carrying the
    /// longest call.
    pub max_frame: u64,
}

impl ScopeStats {
    fn first(duration_ns: i64, frame: u64) -> Self {
        Self {
            total_calls: 1,
            mean_duration_ns: duration_ns as f64,
            min_duration_ns: duration_ns,
            min_frame: frame,
            max_duration_ns: duration_ns,
            max_frame: frame,
        }
    }

    fn accumulate(&mut self, duration_ns: i64, frame: u64) {
        self.total_calls += 1;
        // Sum here; divided into a mean once all events are in.
        self.mean_duration_ns += duration_ns as f64;
        if duration_ns < self.min_duration_ns {
            self.min_duration_ns = duration_ns;
            self.min_frame = frame;
        }
        if duration_ns > self.max_duration_ns {
            self.max_duration_ns = duration_ns;
            self.max_frame = frame;
        }
    }
}

/// One row of the summary table: a scope with its tag and statistics.
#[derive(Debug, Clone)]
pub struct ScopeRow<'a> {
    pub record: &'a ScopeRecord,
    pub tag: &'a TagInfo,
    pub stats: ScopeStats,
}

/// Sort orders for the summary table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeOrder {
    Name,
    TotalCalls,
    MeanDuration,
    MinDuration,
    MaxDuration,
}

/// The model. Borrowing the snapshot keeps event payloads unduplicated;
/// the trees hold handles only.
pub struct DrawModel<'a> {
    results: &'a ProfileSnapshot,
    error: Option<String>,
    max_depths: Vec<i32>,
    trees: Vec<IntervalTree<EventHandle>>,
    scope_stats: HashMap<ScopeKey, ScopeStats>,
    rows: Vec<ScopeRow<'a>>,
    shortest_frame_ns: i64,
    longest_frame_ns: i64,
}

impl<'a> DrawModel<'a> {
    /// Validate `results` and derive the projections. Validation failure
    /// is retained as a human-readable error, reported by [`draw`]
    /// (`Self::draw`); it is not an `Err` because a viewer should stay up
    /// and display it.
    pub fn build(results: &'a ProfileSnapshot) -> Self {
        let mut model = Self {
            results,
            error: None,
            max_depths: Vec::new(),
            trees: Vec::new(),
            scope_stats: HashMap::new(),
            rows: Vec::new(),
            shortest_frame_ns: i64::MAX,
            longest_frame_ns: 0,
        };
        if let Err(message) = model.populate() {
            tracing::debug!(%message, "draw model validation failed");
            model.error = Some(message);
        }
        model
    }

    fn populate(&mut self) -> Result<(), String> {
        // Reborrow at the snapshot's own lifetime so row references
        // outlive this call.
        let results: &'a ProfileSnapshot = self.results;

        if !results.has_any_records() {
            return Err(
                "No records. Did you instrument the code and start the recording?".to_string(),
            );
        }

        let frames = results.frames();
        if frames.is_empty() {
            return Err("No frames were recorded.".to_string());
        }
        for pair in frames.windows(2) {
            if pair[1].number != pair[0].number + 1 {
                return Err("The recorded frames are not sequential.".to_string());
            }
        }
        for frame in frames {
            let duration = frame.span.duration_ns();
            self.shortest_frame_ns = self.shortest_frame_ns.min(duration);
            self.longest_frame_ns = self.longest_frame_ns.max(duration);
        }

        let thread_count = results.thread_count();
        self.max_depths = (0..thread_count)
            .map(|thread| {
                results
                    .events(thread)
                    .iter()
                    .map(|event| event.depth)
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let first_frame = frames[0].number;
        self.trees.reserve(thread_count);
        for thread in 0..thread_count {
            let events = results.events(thread);
            let mut tree = IntervalTree::with_capacity(events.len());
            for (index, event) in events.iter().enumerate() {
                let record = results
                    .scopes()
                    .get(&event.key)
                    .ok_or_else(|| "Missing scope information.".to_string())?;
                if !results.tags().contains_key(&record.tag.id()) {
                    return Err("Missing tag information.".to_string());
                }

                tree.insert(EventHandle {
                    index,
                    start_ns: event.span.start_ns,
                    end_ns: event.span.end_ns,
                })
                .map_err(|error: Error| error.to_string())?;

                let frame = frame_number_at(frames, event.span.start_ns, first_frame);
                let duration = event.span.duration_ns();
                self.scope_stats
                    .entry(event.key)
                    .and_modify(|stats| stats.accumulate(duration, frame))
                    .or_insert_with(|| ScopeStats::first(duration, frame));
            }
            tree.rebuild_maxima();
            self.trees.push(tree);
        }

        for stats in self.scope_stats.values_mut() {
            stats.mean_duration_ns /= stats.total_calls as f64;
        }

        self.rows.reserve(results.scopes().len());
        for record in results.scopes().values() {
            let tag = results
                .tags()
                .get(&record.tag.id())
                .ok_or_else(|| "Missing tag information.".to_string())?;
            // Scopes that never fired get zeroed stats so the table still
            // lists them.
            let stats = self.scope_stats.get(&record.key).copied().unwrap_or(ScopeStats {
                total_calls: 0,
                mean_duration_ns: 0.0,
                min_duration_ns: 0,
                min_frame: 0,
                max_duration_ns: 0,
                max_frame: 0,
            });
            self.rows.push(ScopeRow { record, tag, stats });
        }
        self.rows
            .sort_by(|a, b| a.record.name.cmp(&b.record.name));

        Ok(())
    }

    /// Whether the model may be rendered.
    pub fn draw(&self) -> DrawOutcome {
        if self.error.is_some() {
            DrawOutcome::Failed
        } else {
            DrawOutcome::Drawn
        }
    }

    /// The validation error retained by a failed build.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Deepest nesting observed on `thread`.
    pub fn max_depth(&self, thread: usize) -> i32 {
        self.max_depths.get(thread).copied().unwrap_or(0)
    }

    /// Shortest and longest frame durations, for scaling a frame strip.
    pub fn frame_duration_range_ns(&self) -> (i64, i64) {
        (self.shortest_frame_ns, self.longest_frame_ns)
    }

    /// Collect handles for every event on `thread` overlapping the
    /// viewport window `[start_ns, end_ns]`.
    pub fn events_in_window(
        &self,
        thread: usize,
        start_ns: i64,
        end_ns: i64,
        out: &mut Vec<EventHandle>,
    ) {
        if let Some(tree) = self.trees.get(thread) {
            tree.query(start_ns, end_ns, out);
        }
    }

    /// Aggregate statistics for one scope, if it fired at all.
    pub fn scope_stats(&self, key: ScopeKey) -> Option<&ScopeStats> {
        self.scope_stats.get(&key)
    }

    /// The summary table, in the most recently requested order
    /// (initially by name).
    pub fn scope_rows(&self) -> &[ScopeRow<'a>] {
        &self.rows
    }

    /// Re-sort the summary table.
    pub fn sort_rows(&mut self, order: ScopeOrder, ascending: bool) {
        self.rows.sort_by(|a, b| {
            let ordering = match order {
                ScopeOrder::Name => a.record.name.cmp(&b.record.name),
                ScopeOrder::TotalCalls => a.stats.total_calls.cmp(&b.stats.total_calls),
                ScopeOrder::MeanDuration => a
                    .stats
                    .mean_duration_ns
                    .total_cmp(&b.stats.mean_duration_ns),
                ScopeOrder::MinDuration => a.stats.min_duration_ns.cmp(&b.stats.min_duration_ns),
                ScopeOrder::MaxDuration => a.stats.max_duration_ns.cmp(&b.stats.max_duration_ns),
            };
            if ascending { ordering } else { ordering.reverse() }
        });
    }
}

/// Number (relative to `first_frame`) of the frame containing `value`,
/// by binary search over frame end times.
fn frame_number_at(frames: &[Frame], value: i64, first_frame: u64) -> u64 {
    let index = frames.partition_point(|frame| frame.span.end_ns < value);
    match frames.get(index) {
        Some(frame) => frame.number - first_frame,
        None => frames[0].number - first_frame,
    }
}
