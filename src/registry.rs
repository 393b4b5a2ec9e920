//! The process-wide thread identity table.
//!
//! Every observing thread is assigned a dense id in
//! `[0, MAX_THREADS)` and a name on first touch. Both are cached in
//! thread-local slots, so only the very first call on a thread takes the
//! registry mutex. A binding never changes and a slot is never released,
//! even after the thread exits.

use crate::error::Error;
use crate::settings::MAX_THREADS;
use std::cell::{Cell, RefCell};
use std::sync::Mutex;

struct RegistryState {
    counter: usize,
    names: Vec<String>,
}

static REGISTRY: Mutex<RegistryState> = Mutex::new(RegistryState {
    counter: 0,
    names: Vec::new(),
});

thread_local! {
    static CACHED_ID: Cell<Option<usize>> = const { Cell::new(None) };
    static CACHED_NAME: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Claim the next free slot for the calling thread, assigning `name` (or
/// the `Thread<id>` default when `name` is empty).
fn assign_next(name: &str) -> Result<usize, Error> {
    let mut registry = REGISTRY.lock().unwrap();
    if registry.names.is_empty() {
        registry.names = (0..MAX_THREADS).map(|i| format!("Thread{i}")).collect();
    }

    let id = registry.counter;
    if id >= MAX_THREADS {
        return Err(Error::TooManyThreads { limit: MAX_THREADS });
    }
    registry.counter += 1;

    if !name.is_empty() {
        registry.names[id] = name.to_string();
    }

    CACHED_ID.with(|cell| cell.set(Some(id)));
    CACHED_NAME.with(|cell| *cell.borrow_mut() = Some(registry.names[id].clone()));
    Ok(id)
}

/// The calling thread's id, assigning one (with a default name) on first
/// call. Subsequent calls read a thread-local and never lock.
pub fn current_thread_id() -> Result<usize, Error> {
    if let Some(id) = CACHED_ID.with(|cell| cell.get()) {
        return Ok(id);
    }
    assign_next("")
}

/// The calling thread's name, assigning an id and default name on first
/// call.
pub fn current_thread_name() -> Result<String, Error> {
    current_thread_id()?;
    Ok(CACHED_NAME.with(|cell| cell.borrow().clone()).unwrap_or_default())
}

/// Assign a name to the calling thread.
///
/// Returns `Ok(true)` if the name was bound together with a fresh id and
/// `Ok(false)` if the thread already had an id (names are immutable after
/// binding, so the argument is ignored in that case). An empty name
/// yields the `Thread<id>` default.
pub fn assign_thread_name(name: &str) -> Result<bool, Error> {
    if CACHED_ID.with(|cell| cell.get()).is_some() {
        return Ok(false);
    }
    assign_next(name)?;
    Ok(true)
}

/// Number of threads that have been assigned ids so far.
pub fn registered_thread_count() -> usize {
    REGISTRY.lock().unwrap().counter
}

/// Name bound to slot `id`. Used during snapshot extraction; `id` must be
/// below [`registered_thread_count`].
pub(crate) fn thread_name(id: usize) -> String {
    let registry = REGISTRY.lock().unwrap();
    registry.names.get(id).cloned().unwrap_or_else(|| format!("Thread{id}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    // The registry is process-global and test binaries run every test in
    // its own thread, so these assertions are written to hold regardless
    // of how many other tests already claimed slots.

    #[test]
    fn id_is_stable_and_name_is_immutable() {
        let first = assign_thread_name("registry-test").unwrap();
        let id = current_thread_id().unwrap();
        let name = current_thread_name().unwrap();

        if first {
            assert_eq!(name, "registry-test");
        }
        // A second assignment on the same thread is always rejected.
        assert!(!assign_thread_name("other-name").unwrap());
        assert_eq!(current_thread_id().unwrap(), id);
        assert_eq!(current_thread_name().unwrap(), name);
        assert!(registered_thread_count() > id);
    }

    #[test]
    fn spawned_thread_gets_its_own_slot() {
        let here = current_thread_id().unwrap();
        let there = std::thread::spawn(move || {
            let id = current_thread_id().unwrap();
            // Default names follow the Thread<id> pattern.
            assert_eq!(current_thread_name().unwrap(), format!("Thread{id}"));
            id
        })
        .join()
        .unwrap();
        assert_ne!(here, there);
    }
}
