// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A clock that provides the current time.
///
/// Every component that reasons about pacing (the scheduler tick, retry
/// backoff, job timeouts) takes a `Clock` rather than calling
/// `SystemTime::now()` directly, so tests can control time deterministically.
pub trait Clock: Clone + Send + Sync + 'static {
    /// Milliseconds since the Unix epoch.
    fn epoch_ms(&self) -> u64;

    /// Current instant as a `chrono::DateTime<Utc>`.
    fn now_utc(&self) -> chrono::DateTime<chrono::Utc> {
        let ms = self.epoch_ms() as i64;
        chrono::DateTime::from_timestamp_millis(ms).unwrap_or_else(chrono::Utc::now)
    }
}

/// Real system clock.
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn epoch_ms(&self) -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
    }
}

/// Fake clock for testing with controllable time.
#[derive(Clone)]
pub struct FakeClock {
    epoch_ms: Arc<Mutex<u64>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self { epoch_ms: Arc::new(Mutex::new(1_700_000_000_000)) }
    }

    pub fn at(epoch_ms: u64) -> Self {
        Self { epoch_ms: Arc::new(Mutex::new(epoch_ms)) }
    }

    /// Advance the clock by the given duration.
    pub fn advance(&self, duration: Duration) {
        *self.epoch_ms.lock() += duration.as_millis() as u64;
    }

    /// Set the clock to a specific epoch-ms value.
    pub fn set_epoch_ms(&self, ms: u64) {
        *self.epoch_ms.lock() = ms;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn epoch_ms(&self) -> u64 {
        *self.epoch_ms.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_clock_advances() {
        let clock = FakeClock::at(1_000);
        clock.advance(Duration::from_secs(1));
        assert_eq!(clock.epoch_ms(), 2_000);
    }
}
