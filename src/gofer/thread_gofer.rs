use super::tracker::Tracker;
use super::{run_contained, Gofer, GoferResult, Task};
use crate::thread_management::ThreadBuilder;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// [`Gofer`] that runs every task on a fresh named thread
///
/// Threads are named `{prefix}-{n}`.
pub struct ThreadGofer {
    prefix: String,
    next_id: AtomicUsize,
    tracker: Arc<Tracker>,
}

impl ThreadGofer {
    pub fn new<S: Into<String>>(prefix: S) -> Self {
        Self {
            prefix: prefix.into(),
            next_id: AtomicUsize::new(0),
            tracker: Arc::default(),
        }
    }

    /// Number of tasks that have not finished yet
    pub fn in_flight(&self) -> usize {
        self.tracker.in_flight()
    }
}

impl Default for ThreadGofer {
    fn default() -> Self {
        Self::new("gofer")
    }
}

impl Gofer for ThreadGofer {
    fn go(&self, task: Task) -> GoferResult<()> {
        let guard = self.tracker.admit()?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        ThreadBuilder::new()
            .thread_name(format!("{prefix}-{id}", prefix = self.prefix))
            .spawn(move || {
                let _guard = guard;
                run_contained(task);
            })?
            .detach();
        Ok(())
    }

    fn close(&self, deadline: Option<Duration>) -> GoferResult<()> {
        self.tracker.close()?;
        tracing::debug!(in_flight = self.in_flight(), "closing thread gofer");
        self.tracker.wait_idle(deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gofer::GoferError;
    use parking_lot::Mutex;

    #[test]
    fn test_tasks_run_on_named_threads() {
        let gofer = ThreadGofer::new("worker");
        let names = Arc::new(Mutex::new(Vec::new()));

        for _ in 0..3 {
            let names = names.clone();
            gofer
                .go(Box::new(move || {
                    let name = std::thread::current().name().map(str::to_string);
                    names.lock().push(name.unwrap_or_default());
                }))
                .unwrap();
        }
        gofer.close(None).unwrap();

        let mut names = names.lock().clone();
        names.sort();
        assert_eq!(names, vec!["worker-1", "worker-2", "worker-3"]);
    }

    #[test]
    fn test_go_after_close() {
        let gofer = ThreadGofer::default();
        gofer.close(None).unwrap();
        assert!(matches!(gofer.go(Box::new(|| {})), Err(GoferError::Closed)));
    }

    #[test]
    fn test_close_deadline_exceeded() {
        let gofer = ThreadGofer::default();
        gofer
            .go(Box::new(|| std::thread::sleep(Duration::from_millis(300))))
            .unwrap();
        assert!(matches!(
            gofer.close(Some(Duration::from_millis(10))),
            Err(GoferError::Timeout(_))
        ));
    }
}
