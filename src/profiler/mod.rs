//! Recording orchestration: scope entry/exit, frame advance and result
//! extraction.

pub mod clock;
mod events;
mod format;
mod frames;
mod recorder;
pub(crate) mod results;
mod scope;
mod spinlock;

pub use events::{Frame, ScopeEvent, TimeSpan};
pub use results::{DrawOutcome, ProfileSnapshot};
pub use scope::{ScopeKey, ScopeRecord, ScopeTable, TagInfo};
pub use spinlock::{Spinlock, SpinlockGuard};

use crate::registry;
use crate::settings::{self, Tag};
use frames::FrameLedger;
use recorder::{ActiveScope, EventQueues, ACTIVE, DROP_WARNED};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

/// The recording engine.
///
/// One process-wide instance (see [`global`]) serves the instrumentation
/// macros; standalone instances are constructible for tests. The active
/// stack and depth counters are thread-local and shared by every
/// instance, so enter/exit pairs must stay balanced per instance on a
/// given thread.
pub struct Profiler {
    recording: AtomicBool,
    scopes: ScopeTable,
    frames: FrameLedger,
    queues: EventQueues,
}

impl Profiler {
    pub fn new() -> Self {
        Self {
            recording: AtomicBool::new(false),
            scopes: ScopeTable::new(),
            frames: FrameLedger::new(),
            queues: EventQueues::new(),
        }
    }

    /// Enable or disable event capture. After enabling returns, scope
    /// entries on any thread become eligible for capture. Disabling does
    /// not drain in-flight scopes: only scopes whose *exit* observes the
    /// disabled state are dropped.
    pub fn set_recording(&self, state: bool) {
        self.recording.store(state, Ordering::Release);
    }

    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::Acquire)
    }

    /// Intern scope metadata, returning the stable key for it.
    pub fn insert_scope(
        &self,
        name: &str,
        identifier: &str,
        function: &str,
        file: &str,
        line: u32,
        tag: Tag,
    ) -> ScopeKey {
        self.scopes.intern(name, identifier, function, file, line, tag)
    }

    /// Record entry into `key`'s scope on the calling thread.
    ///
    /// The start time is captured even while recording is off, so a scope
    /// that spans a recording-on transition is preserved correctly at
    /// exit. Entries and exits must nest LIFO per thread; prefer
    /// [`ScopeGuard`] or the `profile_scope!` macro, which guarantee
    /// that.
    pub fn enter(&self, key: ScopeKey) {
        let start_ns = clock::now_nanos();
        ACTIVE.with(|active| {
            let mut active = active.borrow_mut();
            active.depth += 1;
            let depth = active.depth;
            #[cfg(feature = "cookie")]
            let cookie = {
                let cookie = active.cookie;
                active.cookie += 1;
                cookie
            };
            active.stack.push(ActiveScope {
                key,
                depth,
                start_ns,
                #[cfg(feature = "cookie")]
                cookie,
            });
        });
    }

    /// Record exit from `key`'s scope on the calling thread.
    pub fn exit(&self, key: ScopeKey) {
        let recording = self.is_recording();
        ACTIVE.with(|active| {
            let mut active = active.borrow_mut();
            let popped = active.stack.pop();
            active.depth -= 1;
            let Some(entered) = popped else {
                debug_assert!(false, "scope exit without a matching enter");
                return;
            };
            debug_assert_eq!(
                entered.key, key,
                "scope exit does not match the innermost entered scope"
            );
            if !recording {
                return;
            }
            // Stamp the end before touching the queue lock; the lock is
            // held only for the append of a fully built event.
            let event = ScopeEvent {
                key: entered.key,
                depth: entered.depth,
                span: TimeSpan::new(entered.start_ns, clock::now_nanos()),
                #[cfg(feature = "cookie")]
                cookie: entered.cookie,
            };
            match registry::current_thread_id() {
                Ok(slot) => self.queues.push(slot, event),
                Err(_) => {
                    if !DROP_WARNED.replace(true) {
                        tracing::warn!(
                            limit = settings::MAX_THREADS,
                            "thread identity table is full; dropping this thread's events"
                        );
                    }
                }
            }
        });
    }

    /// Close the current frame and, when recording, open the next one.
    pub fn next_frame(&self) {
        self.frames.advance(self.is_recording(), clock::now_nanos());
    }

    /// Stop recording and move everything recorded so far into an owning
    /// snapshot, leaving the profiler empty and ready for a new run.
    pub fn take_results(&self) -> ProfileSnapshot {
        self.set_recording(false);

        let thread_count = registry::registered_thread_count();
        let mut events: Vec<Vec<ScopeEvent>> = Vec::with_capacity(thread_count);
        let mut thread_names = Vec::with_capacity(thread_count);
        let frames;
        let scopes;
        {
            // Hold both structure locks while swapping so a re-enable
            // cannot interleave with the extraction.
            let scope_guard = self.scopes.lock();
            let mut frame_guard = self.frames.lock();
            scopes = scope_guard.clone();
            frames = std::mem::take(&mut frame_guard.frames);
            for slot in 0..thread_count {
                events.push(self.queues.drain(slot));
                thread_names.push(registry::thread_name(slot));
            }
        }

        let mut tags = HashMap::with_capacity(settings::TAG_COUNT as usize);
        for id in 0..settings::TAG_COUNT {
            tags.insert(id, TagInfo::for_tag(Tag(id)));
        }

        let any_records = events.iter().any(|per_thread| !per_thread.is_empty());

        let mut frames = frames;
        let frame_data_missing = if frames.is_empty() && !any_records {
            frames.push(Frame {
                number: 0,
                span: TimeSpan::new(0, 1),
            });
            true
        } else if frames.is_empty() {
            let mut first = i64::MAX;
            let mut last = i64::MIN;
            for per_thread in &events {
                for event in per_thread {
                    first = first.min(event.span.start_ns);
                    last = last.max(event.span.start_ns);
                }
            }
            frames.push(Frame {
                number: 0,
                span: TimeSpan::new(first, last),
            });
            true
        } else {
            if let Some(last) = frames.last_mut()
                && !last.span.is_complete()
            {
                last.span.end_ns = clock::now_nanos();
            }
            false
        };

        for per_thread in &mut events {
            per_thread.sort_by_key(|event| event.span.start_ns);
        }

        let total: usize = events.iter().map(Vec::len).sum();
        tracing::debug!(
            threads = thread_count,
            frames = frames.len(),
            events = total,
            "profiler results extracted"
        );

        ProfileSnapshot::from_parts(
            frames,
            scopes,
            tags,
            events,
            thread_names,
            frame_data_missing,
            any_records,
            cfg!(feature = "cookie"),
        )
    }
}

impl Default for Profiler {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL: OnceLock<Profiler> = OnceLock::new();

/// The process-wide profiler used by the instrumentation macros.
pub fn global() -> &'static Profiler {
    GLOBAL.get_or_init(Profiler::new)
}

/// Enters a scope on construction and exits it when dropped, on every
/// exit path including unwinding.
///
/// Not `Send`: the exit must happen on the thread that entered.
pub struct ScopeGuard {
    key: ScopeKey,
    profiler: &'static Profiler,
    _not_send: PhantomData<*const ()>,
}

impl ScopeGuard {
    /// Enter `key` on the global profiler.
    pub fn enter(key: ScopeKey) -> Self {
        let profiler = global();
        profiler.enter(key);
        Self {
            key,
            profiler,
            _not_send: PhantomData,
        }
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        self.profiler.exit(self.key);
    }
}
