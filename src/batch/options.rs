//! Group configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Flush threshold used when none (or zero) is configured
pub const DEFAULT_SIZE: usize = 64;

/// Flush interval used when none (or zero) is configured
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(128);

const DEFAULT_THREAD_NAME: &str = "asyncbatch-loop";

/// Configuration for a batching [`Group`](crate::batch::Group)
///
/// Deserializes from any serde format; the interval is given in milliseconds:
///
/// ```json
/// { "size": 100, "interval_ms": 250 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Number of pending items that triggers a flush
    pub size: usize,

    /// Period of the flush timer
    #[serde(rename = "interval_ms", with = "duration_millis")]
    pub interval: Duration,

    /// Name of the event loop thread
    pub thread_name: Option<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            size: DEFAULT_SIZE,
            interval: DEFAULT_INTERVAL,
            thread_name: None,
        }
    }
}

impl Options {
    /// Replace unusable values with the defaults
    ///
    /// A zero size or a zero interval falls back to [`DEFAULT_SIZE`] and
    /// [`DEFAULT_INTERVAL`]. This never fails.
    #[must_use]
    pub fn corrected(mut self) -> Self {
        if self.size == 0 {
            self.size = DEFAULT_SIZE;
        }
        if self.interval.is_zero() {
            self.interval = DEFAULT_INTERVAL;
        }
        self
    }

    /// Read overrides from `ASYNCBATCH_SIZE` and `ASYNCBATCH_INTERVAL_MS`
    ///
    /// Unset or unparsable variables leave the default in place.
    pub fn from_env() -> Self {
        let mut options = Self::default();

        if let Ok(val) = std::env::var("ASYNCBATCH_SIZE") {
            if let Ok(n) = val.parse() {
                options.size = n;
            }
        }

        if let Ok(val) = std::env::var("ASYNCBATCH_INTERVAL_MS") {
            if let Ok(n) = val.parse() {
                options.interval = Duration::from_millis(n);
            }
        }

        options.corrected()
    }

    pub(crate) fn loop_thread_name(&self) -> String {
        self.thread_name
            .clone()
            .unwrap_or_else(|| DEFAULT_THREAD_NAME.to_string())
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
