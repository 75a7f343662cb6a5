//! `AsyncBatch` - Time/Size-Triggered Batching Engine
//!
//! Callers submit individual items; a background event loop accumulates them
//! and invokes a batch handler once a count threshold is reached or a flush
//! interval elapses, whichever comes first.
//!
//! ## Features
//!
//! - **Ordered**: batches are delivered in submission order
//! - **Serialized**: the handler never runs concurrently with itself
//! - **Lossless**: closing drains every accepted item before returning
//! - **Contained failures**: a panicking handler is reported, not fatal
//! - **Non-blocking submit**: submitters never wait on handler execution
//!
//! ## Quick Start
//!
//! ```rust
//! use asyncbatch::Group;
//! use std::time::Duration;
//!
//! let group = Group::builder()
//!     .size(64)
//!     .interval(Duration::from_millis(100))
//!     .handler(|batch: Vec<u64>| {
//!         println!("flushing {} items", batch.len());
//!     })
//!     .build()
//!     .unwrap();
//!
//! for i in 0..1000 {
//!     group.submit(i).unwrap();
//! }
//!
//! // Drains the backlog, then stops the event loop
//! group.close().unwrap();
//! ```
//!
//! ## Architecture
//!
//! - **`Group`**: the handle callers submit to and close
//! - **`Options`**: flush threshold, flush interval and loop thread name
//! - **`RecoveryHandler`**: receives panics raised by the batch handler
//! - **`Gofer`**: fire-and-wait task submission over existing executors

pub mod batch;
pub mod gofer;
pub mod thread_management;

// Re-export the main types for convenience
pub use batch::{
    // Error types
    BatchError,
    ClosureRecoveryHandler,
    // Core types
    Group,
    GroupBuilder,
    // Failure containment
    HandlerPanic,
    IgnoreRecoveryHandler,
    LogRecoveryHandler,
    Options,
    RecoveryHandler,
    Result,
    // Constants
    DEFAULT_INTERVAL,
    DEFAULT_SIZE,
};
pub use gofer::{Gofer, GoferError, ThreadGofer, TokioGofer};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get the version of the `AsyncBatch` library
#[must_use]
pub fn version() -> &'static str {
    VERSION
}
