//! Generic timestamp wrapper.

use serde::{Deserialize, Serialize};

/// A value tagged with the capture time of the data it came from.
///
/// Timestamps are in microseconds on the recording clock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Timestamped<T> {
    pub data: T,
    pub timestamp_us: u64,
}

impl<T> Timestamped<T> {
    #[inline]
    pub fn new(data: T, timestamp_us: u64) -> Self {
        Self { data, timestamp_us }
    }
}
