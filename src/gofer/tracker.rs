//! In-flight task accounting shared by the gofer adapters.

use super::{GoferError, GoferResult};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
pub(crate) struct Tracker {
    closed: AtomicBool,
    in_flight: Mutex<usize>,
    idle: Condvar,
}

/// Counts one running task until dropped
pub(crate) struct TaskGuard {
    tracker: Arc<Tracker>,
}

impl Tracker {
    /// Register a task, unless closed
    pub(crate) fn admit(self: &Arc<Self>) -> GoferResult<TaskGuard> {
        if self.closed.load(Ordering::Acquire) {
            return Err(GoferError::Closed);
        }
        let mut in_flight = self.in_flight.lock();
        if self.closed.load(Ordering::Acquire) {
            return Err(GoferError::Closed);
        }
        *in_flight += 1;
        Ok(TaskGuard {
            tracker: self.clone(),
        })
    }

    pub(crate) fn close(&self) -> GoferResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(GoferError::Closed);
        }
        let _in_flight = self.in_flight.lock();
        if self.closed.load(Ordering::Acquire) {
            return Err(GoferError::Closed);
        }
        self.closed.store(true, Ordering::Release);
        Ok(())
    }

    pub(crate) fn in_flight(&self) -> usize {
        *self.in_flight.lock()
    }

    pub(crate) fn wait_idle(&self, deadline: Option<Duration>) -> GoferResult<()> {
        let mut in_flight = self.in_flight.lock();
        match deadline {
            None => {
                self.idle.wait_while(&mut in_flight, |n| *n > 0);
                Ok(())
            }
            Some(deadline) => {
                let result = self
                    .idle
                    .wait_while_for(&mut in_flight, |n| *n > 0, deadline);
                if result.timed_out() && *in_flight > 0 {
                    return Err(GoferError::Timeout(deadline));
                }
                Ok(())
            }
        }
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        let mut in_flight = self.tracker.in_flight.lock();
        *in_flight -= 1;
        if *in_flight == 0 {
            self.tracker.idle.notify_all();
        }
    }
}
