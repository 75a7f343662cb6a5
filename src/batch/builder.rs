//! Fluent construction of batching groups
//!
//! ```rust
//! use asyncbatch::{Group, HandlerPanic};
//! use std::time::Duration;
//!
//! let group = Group::builder()
//!     .size(100)
//!     .interval(Duration::from_millis(250))
//!     .thread_name("metrics-batcher")
//!     .recover(|failure: &HandlerPanic| eprintln!("flush failed: {failure}"))
//!     .handler(|batch: Vec<String>| {
//!         // write the batch somewhere
//!         let _ = batch;
//!     })
//!     .build()
//!     .unwrap();
//! # group.close().unwrap();
//! ```

use crate::batch::group::Group;
use crate::batch::options::Options;
use crate::batch::recovery::{
    BatchHandler, ClosureRecoveryHandler, HandlerPanic, LogRecoveryHandler, RecoveryHandler,
};
use crate::batch::{BatchError, Result};
use std::sync::Arc;
use std::time::Duration;

/// Builder for [`Group`]
///
/// Starts from [`Options::default`]. Every setter consumes and returns the
/// builder; [`build`](GroupBuilder::build) resolves zero values to the
/// defaults and spawns the event loop. A handler is required, a recovery
/// handler is not: without one, panics are reported by
/// [`LogRecoveryHandler`].
pub struct GroupBuilder<T> {
    options: Options,
    recovery: Option<Arc<dyn RecoveryHandler>>,
    handler: Option<BatchHandler<T>>,
}

impl<T: Send + 'static> GroupBuilder<T> {
    /// Create a builder with default options and no handler
    pub fn new() -> Self {
        Self {
            options: Options::default(),
            recovery: None,
            handler: None,
        }
    }

    /// Replace all options at once
    ///
    /// Setters called afterwards override individual fields.
    ///
    /// # Arguments
    /// * `options` - Options to start from, e.g. loaded with [`Options::from_env`]
    pub fn options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Set the flush threshold
    ///
    /// # Arguments
    /// * `size` - Number of pending items that triggers a flush; zero selects
    ///   [`DEFAULT_SIZE`](crate::DEFAULT_SIZE)
    pub fn size(mut self, size: usize) -> Self {
        self.options.size = size;
        self
    }

    /// Set the flush timer period
    ///
    /// # Arguments
    /// * `interval` - How often pending items are flushed regardless of
    ///   size; zero selects [`DEFAULT_INTERVAL`](crate::DEFAULT_INTERVAL)
    pub fn interval(mut self, interval: Duration) -> Self {
        self.options.interval = interval;
        self
    }

    /// Set the event loop thread name
    ///
    /// # Arguments
    /// * `name` - The name for the thread, `asyncbatch-loop` if never set
    pub fn thread_name<S: Into<String>>(mut self, name: S) -> Self {
        self.options.thread_name = Some(name.into());
        self
    }

    /// Handle batch handler panics with a closure
    ///
    /// # Arguments
    /// * `f` - Called on the event loop thread with each contained panic
    pub fn recover<F>(self, f: F) -> Self
    where
        F: Fn(&HandlerPanic) + Send + Sync + 'static,
    {
        self.recovery_handler(ClosureRecoveryHandler::new(f))
    }

    /// Handle batch handler panics with a [`RecoveryHandler`]
    ///
    /// # Arguments
    /// * `recovery` - Replaces the default [`LogRecoveryHandler`]
    pub fn recovery_handler<R>(mut self, recovery: R) -> Self
    where
        R: RecoveryHandler + 'static,
    {
        self.recovery = Some(Arc::new(recovery));
        self
    }

    /// Set the batch handler
    ///
    /// The handler receives each batch by value, in submission order, and is
    /// never called concurrently with itself.
    ///
    /// # Arguments
    /// * `handler` - Called on the event loop thread with every batch
    pub fn handler<H>(mut self, handler: H) -> Self
    where
        H: FnMut(Vec<T>) + Send + 'static,
    {
        self.handler = Some(Box::new(handler));
        self
    }

    /// Resolve the options and start the event loop
    ///
    /// # Returns
    /// A running [`Group`]
    ///
    /// # Errors
    /// [`BatchError::MissingHandler`] if no handler was given, and
    /// [`BatchError::Spawn`] if the event loop thread could not be started.
    pub fn build(self) -> Result<Group<T>> {
        let handler = self.handler.ok_or(BatchError::MissingHandler)?;
        let recovery: Arc<dyn RecoveryHandler> = match self.recovery {
            Some(recovery) => recovery,
            None => Arc::new(LogRecoveryHandler),
        };
        Group::start(self.options, handler, recovery)
    }
}

impl<T: Send + 'static> Default for GroupBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}
