//! Batching Group
//!
//! A [`Group`] accumulates submitted items and hands them to a batch handler
//! once `size` items are pending or once `interval` elapses, whichever comes
//! first. A single background event loop owns every handler invocation, so
//! batches are delivered in submission order and never overlap.
//!
//! ```text
//!   submit() ──► SharedBuffer ──(len >= size)──► CoalescingSignal ─┐
//!                     ▲                                            │
//!                     │                 ticker(interval) ──────────┤
//!                     │                 shutdown (close) ──────────┤
//!                     │                                            ▼
//!                     └──────── detach batch ◄──────────── EventLoop ──► handler(batch)
//! ```

pub mod builder;
pub mod group;
pub mod options;
pub mod recovery;

mod buffer;
mod event_loop;
mod signal;

#[cfg(test)]
mod property_tests;

pub use builder::GroupBuilder;
pub use group::Group;
pub use options::{Options, DEFAULT_INTERVAL, DEFAULT_SIZE};
pub use recovery::{
    ClosureRecoveryHandler, HandlerPanic, IgnoreRecoveryHandler, LogRecoveryHandler,
    RecoveryHandler,
};

use std::time::Duration;

/// Errors returned by [`Group`] operations
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("asyncbatch: batch handler is missing")]
    MissingHandler,

    #[error("asyncbatch: group is closed")]
    Closed,

    #[error("asyncbatch: drain did not finish within {0:?}")]
    CloseTimeout(Duration),

    #[error("asyncbatch: failed to spawn event loop thread: {0}")]
    Spawn(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BatchError>;
