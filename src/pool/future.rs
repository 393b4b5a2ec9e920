//! The strongly-typed result cell behind result-bearing submissions.
//!
//! The pool queue stores homogeneous boxed closures; a result-bearing
//! task moves a [`TaskPromise`] into its closure and the caller keeps the
//! matching [`TaskFuture`]. The pair shares a mutex-guarded slot plus a
//! condvar, so `get` blocks without spinning.

use std::sync::{Arc, Condvar, Mutex};

struct Shared<T> {
    slot: Mutex<Option<T>>,
    ready: Condvar,
}

/// The caller's handle to a task's eventual return value.
pub struct TaskFuture<T> {
    shared: Arc<Shared<T>>,
}

/// The worker-side half; fulfilled exactly once when the task returns.
pub(crate) struct TaskPromise<T> {
    shared: Arc<Shared<T>>,
}

pub(crate) fn task_channel<T>() -> (TaskPromise<T>, TaskFuture<T>) {
    let shared = Arc::new(Shared {
        slot: Mutex::new(None),
        ready: Condvar::new(),
    });
    (
        TaskPromise {
            shared: shared.clone(),
        },
        TaskFuture { shared },
    )
}

impl<T> TaskPromise<T> {
    pub(crate) fn fulfill(self, value: T) {
        *self.shared.slot.lock().unwrap() = Some(value);
        self.shared.ready.notify_all();
    }
}

impl<T> TaskFuture<T> {
    /// Block until the task has run, then take its return value.
    pub fn get(self) -> T {
        let mut slot = self.shared.slot.lock().unwrap();
        loop {
            if let Some(value) = slot.take() {
                return value;
            }
            slot = self.shared.ready.wait(slot).unwrap();
        }
    }

    /// Take the value if the task already finished.
    pub fn try_get(&self) -> Option<T> {
        self.shared.slot.lock().unwrap().take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn get_returns_a_value_fulfilled_later() {
        let (promise, future) = task_channel();
        let producer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(5));
            promise.fulfill(42usize);
        });
        assert_eq!(future.get(), 42);
        producer.join().unwrap();
    }

    #[test]
    fn try_get_is_non_blocking() {
        let (promise, future) = task_channel();
        assert!(future.try_get().is_none());
        promise.fulfill("done");
        assert_eq!(future.try_get(), Some("done"));
        assert!(future.try_get().is_none());
    }
}
