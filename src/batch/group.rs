//! Group handle: submit items, close and drain.

use crate::batch::buffer::SharedBuffer;
use crate::batch::builder::GroupBuilder;
use crate::batch::event_loop::{EventLoop, Flusher};
use crate::batch::options::Options;
use crate::batch::recovery::{BatchHandler, GuardedHandler, RecoveryHandler};
use crate::batch::signal::{CoalescingSignal, ShutdownTrigger};
use crate::batch::{BatchError, Result};
use crate::thread_management::{ManagedThread, ThreadBuilder};
use crossbeam::channel::{bounded, Receiver, RecvTimeoutError};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A batching stream
///
/// Items passed to [`submit`](Group::submit) are buffered and handed to the
/// batch handler, in submission order, once `size` of them are pending or
/// once `interval` elapses. The handler only ever runs on the group's event
/// loop thread, one batch at a time.
///
/// # Examples
///
/// ```rust
/// use asyncbatch::Group;
/// use std::time::Duration;
///
/// let group = Group::builder()
///     .size(3)
///     .interval(Duration::from_secs(1))
///     .handler(|batch: Vec<u32>| println!("got {batch:?}"))
///     .build()
///     .unwrap();
///
/// group.submit(1).unwrap();
/// group.submit(2).unwrap();
///
/// // Delivers [1, 2] before returning
/// group.close().unwrap();
/// assert!(group.submit(3).is_err());
/// ```
pub struct Group<T: Send + 'static> {
    options: Options,
    buffer: Arc<SharedBuffer<T>>,
    signal: CoalescingSignal,
    shutdown: ShutdownTrigger,
    terminated: Receiver<()>,
    worker: Mutex<Option<ManagedThread>>,
}

impl<T: Send + 'static> Group<T> {
    /// Start configuring a group
    pub fn builder() -> GroupBuilder<T> {
        GroupBuilder::new()
    }

    /// Create a group with the default recovery handler
    ///
    /// The event loop starts immediately.
    pub fn new<H>(handler: H, options: Options) -> Result<Self>
    where
        H: FnMut(Vec<T>) + Send + 'static,
    {
        Self::builder().options(options).handler(handler).build()
    }

    pub(crate) fn start(
        options: Options,
        handler: BatchHandler<T>,
        recovery: Arc<dyn RecoveryHandler>,
    ) -> Result<Self> {
        let options = options.corrected();
        let buffer = Arc::new(SharedBuffer::new(options.size));
        let (signal, signal_rx) = CoalescingSignal::new();
        let (shutdown, shutdown_rx) = ShutdownTrigger::new();
        let (terminated_tx, terminated) = bounded(0);

        let event_loop = EventLoop {
            flusher: Flusher {
                buffer: buffer.clone(),
                task: GuardedHandler::new(handler, recovery),
            },
            interval: options.interval,
            signal: signal_rx,
            shutdown: shutdown_rx,
            terminated: terminated_tx,
        };

        let worker = ThreadBuilder::new()
            .thread_name(options.loop_thread_name())
            .spawn(move || event_loop.run())?;

        Ok(Self {
            options,
            buffer,
            signal,
            shutdown,
            terminated,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Queue an item for the next batch
    ///
    /// Never waits for the handler. Fails with [`BatchError::Closed`] once
    /// closing has begun, in which case the item is dropped.
    pub fn submit(&self, item: T) -> Result<()> {
        if self.buffer.push(item)? && !self.signal.notify() {
            tracing::trace!("size signal already pending");
        }
        Ok(())
    }

    /// Stop accepting items, deliver the backlog and stop the event loop
    ///
    /// Blocks until every accepted item has been handed to the handler. A
    /// second call fails with [`BatchError::Closed`].
    pub fn close(&self) -> Result<()> {
        self.begin_close()?;
        self.wait_terminated(None)
    }

    /// Like [`close`](Group::close), but waits at most `deadline`
    ///
    /// If the drain is still running when the deadline passes, this returns
    /// [`BatchError::CloseTimeout`] and the drain continues in the background.
    pub fn close_timeout(&self, deadline: Duration) -> Result<()> {
        self.begin_close()?;
        self.wait_terminated(Some(deadline))
    }

    /// Number of items waiting for dispatch
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether closing has begun
    pub fn is_closed(&self) -> bool {
        self.buffer.is_closed()
    }

    /// The resolved options
    pub fn options(&self) -> &Options {
        &self.options
    }

    fn begin_close(&self) -> Result<()> {
        self.buffer.mark_closed()?;
        self.shutdown.fire();
        tracing::debug!(pending = self.buffer.len(), "closing batch group");
        Ok(())
    }

    fn wait_terminated(&self, deadline: Option<Duration>) -> Result<()> {
        let Some(worker) = self.worker.lock().take() else {
            return Ok(());
        };

        // Closed from inside the handler: the drain runs once the handler returns
        if worker.is_current() {
            worker.detach();
            return Ok(());
        }

        if let Some(deadline) = deadline {
            if let Err(RecvTimeoutError::Timeout) = self.terminated.recv_timeout(deadline) {
                tracing::warn!(?deadline, "batch group drain exceeded deadline");
                worker.detach();
                return Err(BatchError::CloseTimeout(deadline));
            }
        }

        if worker.join().is_err() {
            tracing::error!("asyncbatch event loop thread panicked");
        }
        Ok(())
    }
}

impl<T: Send + 'static> Drop for Group<T> {
    fn drop(&mut self) {
        if !self.is_closed() {
            let _ = self.close();
        }
    }
}

impl<T: Send + 'static> fmt::Debug for Group<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("options", &self.options)
            .field("pending", &self.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}
