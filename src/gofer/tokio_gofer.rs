use super::tracker::Tracker;
use super::{run_contained, Gofer, GoferError, GoferResult, Task};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

/// [`Gofer`] backed by a tokio runtime
///
/// Tasks are synchronous closures and run on the runtime's blocking pool.
/// [`close`](Gofer::close) blocks the calling thread, so call it from outside
/// the runtime's async context (or from `spawn_blocking`).
pub struct TokioGofer {
    handle: Handle,
    tracker: Arc<Tracker>,
}

impl TokioGofer {
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            tracker: Arc::default(),
        }
    }

    /// Use the runtime the caller is running on
    pub fn current() -> GoferResult<Self> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| GoferError::Runtime(e.to_string()))
    }

    /// Number of tasks that have not finished yet
    pub fn in_flight(&self) -> usize {
        self.tracker.in_flight()
    }
}

impl Gofer for TokioGofer {
    fn go(&self, task: Task) -> GoferResult<()> {
        let guard = self.tracker.admit()?;
        self.handle.spawn_blocking(move || {
            let _guard = guard;
            run_contained(task);
        });
        Ok(())
    }

    fn close(&self, deadline: Option<Duration>) -> GoferResult<()> {
        self.tracker.close()?;
        tracing::debug!(in_flight = self.in_flight(), "closing tokio gofer");
        self.tracker.wait_idle(deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap()
    }

    #[test]
    fn test_go_then_close_waits_for_tasks() {
        let rt = runtime();
        let gofer = TokioGofer::new(rt.handle().clone());
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..16 {
            let counter = counter.clone();
            gofer
                .go(Box::new(move || {
                    std::thread::sleep(Duration::from_millis(5));
                    counter.fetch_add(1, Ordering::SeqCst);
                }))
                .unwrap();
        }

        gofer.close(None).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 16);
        assert_eq!(gofer.in_flight(), 0);
    }

    #[test]
    fn test_go_after_close() {
        let rt = runtime();
        let gofer = TokioGofer::new(rt.handle().clone());
        gofer.close(Some(Duration::from_secs(1))).unwrap();
        assert!(matches!(gofer.go(Box::new(|| {})), Err(GoferError::Closed)));
        assert!(matches!(gofer.close(None), Err(GoferError::Closed)));
    }

    #[test]
    fn test_close_deadline_exceeded() {
        let rt = runtime();
        let gofer = TokioGofer::new(rt.handle().clone());
        gofer
            .go(Box::new(|| std::thread::sleep(Duration::from_millis(300))))
            .unwrap();

        assert!(matches!(
            gofer.close(Some(Duration::from_millis(10))),
            Err(GoferError::Timeout(_))
        ));
    }

    #[test]
    fn test_panicking_task_is_contained() {
        let rt = runtime();
        let gofer = TokioGofer::new(rt.handle().clone());
        gofer.go(Box::new(|| panic!("task failure"))).unwrap();
        gofer.close(Some(Duration::from_secs(5))).unwrap();
    }

    #[test]
    fn test_current_without_runtime() {
        assert!(matches!(TokioGofer::current(), Err(GoferError::Runtime(_))));
    }

    #[test]
    fn test_current_inside_runtime() {
        let rt = runtime();
        let gofer = rt.block_on(async { TokioGofer::current() });
        assert!(gofer.is_ok());
    }
}
