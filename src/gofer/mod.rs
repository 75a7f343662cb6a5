//! Task submission interface
//!
//! A [`Gofer`] fires off units of work asynchronously and, on close, waits for
//! all outstanding work to finish. The batching group does not depend on it;
//! it exists for components that need "run this in the background / wait for
//! everything on shutdown" over an existing executor.
//!
//! Two adapters are provided:
//!
//! - [`TokioGofer`] runs tasks on a tokio runtime's blocking pool.
//! - [`ThreadGofer`] runs each task on its own named OS thread.

mod thread_gofer;
mod tokio_gofer;
mod tracker;

pub use thread_gofer::ThreadGofer;
pub use tokio_gofer::TokioGofer;

use std::time::Duration;

/// A unit of work
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Errors returned by [`Gofer`] implementations
#[derive(Debug, thiserror::Error)]
pub enum GoferError {
    #[error("gofer is closed")]
    Closed,

    #[error("tasks still running after {0:?}")]
    Timeout(Duration),

    #[error("no runtime available: {0}")]
    Runtime(String),

    #[error("failed to spawn task thread: {0}")]
    Spawn(#[from] std::io::Error),
}

pub type GoferResult<T> = std::result::Result<T, GoferError>;

/// Asynchronous task executor
pub trait Gofer: Send + Sync {
    /// Start `task` in the background
    ///
    /// Fails with [`GoferError::Closed`] after [`close`](Gofer::close).
    fn go(&self, task: Task) -> GoferResult<()>;

    /// Stop accepting tasks and wait for the outstanding ones
    ///
    /// With a deadline, gives up waiting once it elapses and returns
    /// [`GoferError::Timeout`]; the tasks keep running. A second call fails
    /// with [`GoferError::Closed`].
    fn close(&self, deadline: Option<Duration>) -> GoferResult<()>;
}

/// Run a task, logging instead of unwinding if it panics
pub(crate) fn run_contained(task: Task) {
    if let Err(failure) = crate::batch::recovery::catch_panic(task) {
        tracing::error!(
            panic = %failure.message(),
            backtrace = %failure.backtrace(),
            "gofer task panicked"
        );
    }
}
