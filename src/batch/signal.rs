//! Wake-up channels between the group handle and its event loop.

use crossbeam::channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;

/// Capacity-one wake-up
///
/// Posting never blocks; if a wake-up is already pending the new one is
/// dropped. A pending wake-up means "the buffer may be full", so the
/// receiver must re-check the buffer length.
pub(crate) struct CoalescingSignal {
    tx: Sender<()>,
}

impl CoalescingSignal {
    pub(crate) fn new() -> (Self, Receiver<()>) {
        let (tx, rx) = bounded(1);
        (Self { tx }, rx)
    }

    /// Returns `false` when the wake-up coalesced into a pending one.
    pub(crate) fn notify(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(())) | Err(TrySendError::Disconnected(())) => false,
        }
    }
}

/// One-shot shutdown event
///
/// Firing drops the only sender, which makes every pending and future
/// `recv` on the receiver return immediately.
pub(crate) struct ShutdownTrigger {
    tx: Mutex<Option<Sender<()>>>,
}

impl ShutdownTrigger {
    pub(crate) fn new() -> (Self, Receiver<()>) {
        let (tx, rx) = bounded(0);
        (
            Self {
                tx: Mutex::new(Some(tx)),
            },
            rx,
        )
    }

    pub(crate) fn fire(&self) {
        self.tx.lock().take();
    }
}
