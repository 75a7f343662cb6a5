//! Panic containment for batch handlers
//!
//! Every batch handed to the user handler goes through [`GuardedHandler`],
//! which catches a panic raised by the handler and forwards it to the group's
//! [`RecoveryHandler`]. The event loop carries on with the next flush as if
//! the call had returned normally.
//!
//! The backtrace is taken by a process-wide panic hook while the panic is
//! still in flight, so it shows the frames of the panicking handler. The hook
//! only records on a thread that is inside `catch_panic`; every other panic
//! is passed to the hook that was installed before it.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Once};

thread_local! {
    static CAPTURE_ARMED: Cell<bool> = const { Cell::new(false) };
    static CAPTURED_TRACE: RefCell<Option<Backtrace>> = const { RefCell::new(None) };
}

static INSTALL_CAPTURE_HOOK: Once = Once::new();

fn install_capture_hook() {
    INSTALL_CAPTURE_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if CAPTURE_ARMED.with(Cell::get) {
                let trace = Backtrace::force_capture();
                CAPTURED_TRACE.with(|slot| *slot.borrow_mut() = Some(trace));
            } else {
                previous(info);
            }
        }));
    });
}

/// Run `f`, turning a panic into a [`HandlerPanic`]
///
/// The returned backtrace is the one recorded at the panic site. If another
/// hook has replaced ours since, it falls back to the current stack.
pub(crate) fn catch_panic<R>(f: impl FnOnce() -> R) -> Result<R, HandlerPanic> {
    install_capture_hook();
    CAPTURED_TRACE.with(|slot| slot.borrow_mut().take());

    let was_armed = CAPTURE_ARMED.with(|armed| armed.replace(true));
    let result = panic::catch_unwind(AssertUnwindSafe(f));
    CAPTURE_ARMED.with(|armed| armed.set(was_armed));

    result.map_err(|payload| match CAPTURED_TRACE.with(|slot| slot.borrow_mut().take()) {
        Some(trace) => HandlerPanic::with_backtrace(payload, trace),
        None => HandlerPanic::new(payload),
    })
}

/// A panic raised by a batch handler
pub struct HandlerPanic {
    payload: Box<dyn Any + Send>,
    backtrace: Backtrace,
}

impl HandlerPanic {
    /// Wrap a caught panic payload, capturing the current backtrace
    pub fn new(payload: Box<dyn Any + Send>) -> Self {
        Self {
            payload,
            backtrace: Backtrace::force_capture(),
        }
    }

    /// Wrap a caught panic payload with a backtrace recorded elsewhere
    pub fn with_backtrace(payload: Box<dyn Any + Send>, backtrace: Backtrace) -> Self {
        Self { payload, backtrace }
    }

    /// The raw value passed to `panic!`
    pub fn payload(&self) -> &(dyn Any + Send) {
        &*self.payload
    }

    /// The panic message, if the payload is a string
    pub fn message(&self) -> &str {
        if let Some(message) = self.payload.downcast_ref::<&'static str>() {
            *message
        } else if let Some(message) = self.payload.downcast_ref::<String>() {
            message.as_str()
        } else {
            "<non-string panic payload>"
        }
    }

    /// Backtrace of the panicking thread, taken while the panic unwound
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }
}

impl fmt::Debug for HandlerPanic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerPanic")
            .field("message", &self.message())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for HandlerPanic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch handler panicked: {}", self.message())
    }
}

/// Receives panics contained while running a batch handler
///
/// Implementations are called on the event loop thread, once per failing
/// handler invocation.
pub trait RecoveryHandler: Send + Sync {
    /// Handle a panic raised by the batch handler
    fn on_handler_panic(&self, failure: &HandlerPanic);
}

/// Default recovery handler
///
/// Reports the panic message and backtrace through `tracing` at error level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogRecoveryHandler;

impl RecoveryHandler for LogRecoveryHandler {
    fn on_handler_panic(&self, failure: &HandlerPanic) {
        tracing::error!(
            panic = %failure.message(),
            backtrace = %failure.backtrace(),
            "asyncbatch: panic in batch handler"
        );
    }
}

/// Recovery handler that drops every failure silently
#[derive(Debug, Default, Clone, Copy)]
pub struct IgnoreRecoveryHandler;

impl RecoveryHandler for IgnoreRecoveryHandler {
    fn on_handler_panic(&self, _failure: &HandlerPanic) {}
}

/// Closure-based recovery handler
pub struct ClosureRecoveryHandler<F>
where
    F: Fn(&HandlerPanic) + Send + Sync,
{
    handler: F,
}

impl<F> ClosureRecoveryHandler<F>
where
    F: Fn(&HandlerPanic) + Send + Sync,
{
    pub fn new(handler: F) -> Self {
        Self { handler }
    }
}

impl<F> RecoveryHandler for ClosureRecoveryHandler<F>
where
    F: Fn(&HandlerPanic) + Send + Sync,
{
    fn on_handler_panic(&self, failure: &HandlerPanic) {
        (self.handler)(failure);
    }
}

pub(crate) type BatchHandler<T> = Box<dyn FnMut(Vec<T>) + Send>;

/// The user handler wrapped once, at construction, with panic containment
pub(crate) struct GuardedHandler<T> {
    handler: BatchHandler<T>,
    recovery: Arc<dyn RecoveryHandler>,
}

impl<T> GuardedHandler<T> {
    pub(crate) fn new(handler: BatchHandler<T>, recovery: Arc<dyn RecoveryHandler>) -> Self {
        Self { handler, recovery }
    }

    /// Run the handler on one batch
    ///
    /// Returns `false` if the handler panicked.
    pub(crate) fn invoke(&mut self, batch: Vec<T>) -> bool {
        let handler = &mut self.handler;
        let Err(failure) = catch_panic(|| handler(batch)) else {
            return true;
        };

        let recovery = &self.recovery;
        if panic::catch_unwind(AssertUnwindSafe(|| recovery.on_handler_panic(&failure))).is_err() {
            tracing::error!(
                panic = %failure.message(),
                "asyncbatch: recovery handler panicked while handling a batch handler panic"
            );
        }
        false
    }
}
