//! Countdown synchronizer for barrier-linked task submissions.

use crate::error::Error;
use std::sync::{Condvar, Mutex};

/// Blocks a waiter until a fixed number of tasks have signaled
/// completion.
///
/// Create it with the exact number of barrier-linked tasks that will be
/// submitted. Submitting fewer leaves `wait_for_all` blocked forever;
/// that is the caller's responsibility, not detected here.
pub struct Barrier {
    remaining: Mutex<i64>,
    done: Condvar,
}

impl Barrier {
    /// A barrier that releases after `count` completions. `count` must be
    /// non-negative; zero releases waiters immediately.
    pub fn new(count: i64) -> Result<Self, Error> {
        if count < 0 {
            return Err(Error::InvalidConfiguration(
                "barrier task count must be non-negative",
            ));
        }
        Ok(Self {
            remaining: Mutex::new(count),
            done: Condvar::new(),
        })
    }

    /// Block the calling thread until the counter reaches zero.
    pub fn wait_for_all(&self) {
        let mut remaining = self.remaining.lock().unwrap();
        while *remaining != 0 {
            remaining = self.done.wait(remaining).unwrap();
        }
    }

    /// Signal that one linked task finished. Called by the pool after the
    /// task's closure returns.
    pub fn notify_completed(&self) -> Result<(), Error> {
        {
            let mut remaining = self.remaining.lock().unwrap();
            *remaining -= 1;
            if *remaining < 0 {
                *remaining = 0;
                return Err(Error::BarrierOverNotified);
            }
        }
        self.done.notify_one();
        Ok(())
    }
}
