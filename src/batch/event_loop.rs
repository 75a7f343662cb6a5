//! The single background loop that owns every flush decision.

use crate::batch::buffer::SharedBuffer;
use crate::batch::recovery::GuardedHandler;
use crossbeam::channel::{select, tick, Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// What woke the loop up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FlushReason {
    Size,
    Interval,
    Shutdown,
}

pub(crate) struct EventLoop<T> {
    pub(crate) flusher: Flusher<T>,
    pub(crate) interval: Duration,
    pub(crate) signal: Receiver<()>,
    pub(crate) shutdown: Receiver<()>,
    /// Dropped when the loop exits, which is what closers wait on
    pub(crate) terminated: Sender<()>,
}

impl<T> EventLoop<T> {
    pub(crate) fn run(self) {
        let EventLoop {
            mut flusher,
            interval,
            signal,
            shutdown,
            terminated: _terminated,
        } = self;
        let ticker = tick(interval);
        debug!(?interval, "asyncbatch event loop started");

        loop {
            select! {
                recv(signal) -> _ => flusher.on_signal(),
                recv(ticker) -> _ => flusher.on_tick(),
                recv(shutdown) -> _ => {
                    flusher.on_shutdown();
                    break;
                }
            }
        }

        debug!("asyncbatch event loop terminated");
    }
}

/// Detaches batches from the buffer and hands them to the guarded handler
pub(crate) struct Flusher<T> {
    pub(crate) buffer: Arc<SharedBuffer<T>>,
    pub(crate) task: GuardedHandler<T>,
}

impl<T> Flusher<T> {
    fn on_signal(&mut self) {
        match self.buffer.take_full() {
            Some(batch) => self.dispatch(FlushReason::Size, batch),
            None => trace!("stale size signal"),
        }
    }

    fn on_tick(&mut self) {
        if let Some(batch) = self.buffer.take_due() {
            self.dispatch(FlushReason::Interval, batch);
        }
    }

    fn on_shutdown(&mut self) {
        let chunks = self.buffer.drain_chunks();
        debug!(batches = chunks.len(), "draining backlog on close");
        for batch in chunks {
            self.dispatch(FlushReason::Shutdown, batch);
        }
    }

    fn dispatch(&mut self, reason: FlushReason, batch: Vec<T>) {
        let len = batch.len();
        trace!(?reason, len, "flushing batch");
        if !self.task.invoke(batch) {
            debug!(?reason, len, "batch handler panicked");
        }
    }
}
