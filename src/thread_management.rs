//! Named background threads with explicit join and detach
//!
//! The batching event loop and the thread-per-task gofer both run on threads
//! spawned through [`ThreadBuilder`]. A [`ManagedThread`] joins on drop unless
//! it was explicitly detached.

use std::thread::{self, JoinHandle};

/// Handle to a spawned background thread
pub struct ManagedThread {
    join_handle: Option<JoinHandle<()>>,
    thread_name: String,
}

impl ManagedThread {
    pub(crate) fn new(join_handle: JoinHandle<()>, thread_name: String) -> Self {
        Self {
            join_handle: Some(join_handle),
            thread_name,
        }
    }

    /// Get the thread name
    ///
    /// # Returns
    /// The name the thread was spawned with
    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }

    /// Join the thread, waiting for it to complete
    ///
    /// # Returns
    /// The panic payload if the thread body panicked
    pub fn join(mut self) -> thread::Result<()> {
        match self.join_handle.take() {
            Some(handle) => handle.join(),
            None => Ok(()),
        }
    }

    /// Let the thread run to completion on its own
    ///
    /// Used when the caller must not block, such as a group closed from its
    /// own event loop thread. Dropping a detached handle does not block.
    pub fn detach(mut self) {
        if self.join_handle.take().is_some() {
            tracing::debug!(thread = %self.thread_name, "detached background thread");
        }
    }

    /// Check if the thread is still running
    pub fn is_running(&self) -> bool {
        self.join_handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Whether the caller is running on this thread
    ///
    /// Joining from the thread itself would never return, so callers check
    /// this before [`join`](ManagedThread::join). Always `false` after detach.
    pub fn is_current(&self) -> bool {
        self.join_handle
            .as_ref()
            .is_some_and(|h| h.thread().id() == thread::current().id())
    }
}

impl Drop for ManagedThread {
    fn drop(&mut self) {
        if let Some(handle) = self.join_handle.take() {
            // Never propagate a panic out of drop
            if handle.join().is_err() {
                tracing::warn!(thread = %self.thread_name, "background thread panicked");
            }
        }
    }
}

/// Thread builder with naming support
///
/// # Examples
///
/// ```rust
/// use asyncbatch::thread_management::ThreadBuilder;
///
/// let worker = ThreadBuilder::new()
///     .thread_name("flush-worker")
///     .spawn(|| println!("running"))
///     .unwrap();
/// assert_eq!(worker.thread_name(), "flush-worker");
/// worker.join().unwrap();
/// ```
#[derive(Debug, Default)]
pub struct ThreadBuilder {
    name: Option<String>,
}

impl ThreadBuilder {
    /// Create a new thread builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set thread name
    ///
    /// # Arguments
    /// * `name` - The name for the thread
    pub fn thread_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Spawn a thread with the configured settings
    ///
    /// # Arguments
    /// * `f` - The function to run in the thread
    ///
    /// # Returns
    /// A ManagedThread that can be used to control the thread lifecycle
    ///
    /// # Errors
    /// Any error the OS reports when creating the thread
    pub fn spawn<F>(self, f: F) -> std::io::Result<ManagedThread>
    where
        F: FnOnce() + Send + 'static,
    {
        let thread_name = self.name.unwrap_or_else(|| "asyncbatch-worker".to_string());
        let join_handle = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(f)?;

        tracing::trace!(thread = %thread_name, "spawned background thread");
        Ok(ManagedThread::new(join_handle, thread_name))
    }
}
