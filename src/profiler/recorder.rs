//! Per-thread recording state.
//!
//! The active-scope stack, the nesting depth and the cookie counter are
//! thread-local and therefore need no synchronization. Completed events
//! land in one of [`MAX_THREADS`] shared queues, indexed by the calling
//! thread's registry id, so that result extraction can drain every
//! thread's recording from one place. Each queue has its own spinlock;
//! the only contention on it is the extraction path.

use super::events::ScopeEvent;
use super::scope::ScopeKey;
use super::spinlock::Spinlock;
use crate::settings::MAX_THREADS;
use std::cell::{Cell, RefCell};

/// Reserved capacity of the active stack. Entry must never reallocate,
/// so this is sized generously above any sane nesting depth.
const ACTIVE_STACK_RESERVE: usize = 256;

/// An in-flight scope: entered, not yet exited.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ActiveScope {
    pub key: ScopeKey,
    pub depth: i32,
    pub start_ns: i64,
    #[cfg(feature = "cookie")]
    pub cookie: u64,
}

/// The calling thread's stack of in-flight scopes.
///
/// Depth starts at -1 so the first entry lands at depth 0. The stack is
/// maintained whether or not the profiler is recording; that keeps depth
/// accounting correct across mid-flight recording toggles.
pub(crate) struct ThreadStack {
    pub stack: Vec<ActiveScope>,
    pub depth: i32,
    #[cfg(feature = "cookie")]
    pub cookie: u64,
}

impl ThreadStack {
    fn new() -> Self {
        Self {
            stack: Vec::with_capacity(ACTIVE_STACK_RESERVE),
            depth: -1,
            #[cfg(feature = "cookie")]
            cookie: 0,
        }
    }
}

thread_local! {
    pub(crate) static ACTIVE: RefCell<ThreadStack> = RefCell::new(ThreadStack::new());
    /// Whether this thread already warned about a full identity table.
    pub(crate) static DROP_WARNED: Cell<bool> = const { Cell::new(false) };
}

/// One completed-event queue per identity-table slot.
pub(crate) struct EventQueues {
    slots: Vec<Spinlock<Vec<ScopeEvent>>>,
}

impl EventQueues {
    pub fn new() -> Self {
        Self {
            slots: (0..MAX_THREADS).map(|_| Spinlock::new(Vec::new())).collect(),
        }
    }

    /// Append a fully stamped event to `slot`'s queue.
    pub fn push(&self, slot: usize, event: ScopeEvent) {
        self.slots[slot].lock().push(event);
    }

    /// Take everything recorded for `slot`, leaving the queue empty.
    pub fn drain(&self, slot: usize) -> Vec<ScopeEvent> {
        std::mem::take(&mut *self.slots[slot].lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiler::events::TimeSpan;

    fn event(start_ns: i64) -> ScopeEvent {
        ScopeEvent {
            key: ScopeKey::from_raw(7),
            depth: 0,
            span: TimeSpan::new(start_ns, start_ns + 1),
            #[cfg(feature = "cookie")]
            cookie: 0,
        }
    }

    #[test]
    fn queues_preserve_append_order() {
        let queues = EventQueues::new();
        queues.push(0, event(30));
        queues.push(0, event(10));
        queues.push(0, event(20));
        let drained = queues.drain(0);
        assert_eq!(
            drained.iter().map(|e| e.span.start_ns).collect::<Vec<_>>(),
            vec![30, 10, 20]
        );
        assert!(queues.drain(0).is_empty());
    }

    #[test]
    fn queues_are_independent_per_slot() {
        let queues = EventQueues::new();
        queues.push(0, event(1));
        queues.push(3, event(2));
        assert_eq!(queues.drain(0).len(), 1);
        assert_eq!(queues.drain(3).len(), 1);
        assert!(queues.drain(1).is_empty());
    }
}
