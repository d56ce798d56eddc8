//! Clock abstraction so the throttling, scheduling, and self-state algorithms
//! never call `SystemTime::now()` directly.
//!
//! All of the timing-sensitive algorithms in this workspace read "now" through
//! this trait instead. In production the default [`SystemClock`] delegates to
//! the real wall clock; tests use [`FixedClock`] to pin "now" to one of the
//! literal scenario timestamps without racing real time.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;

/// Seconds-precision UNIX timestamp, matching the precision every timestamp
/// in the store and the wire contract uses.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current time as a UNIX timestamp in seconds.
    fn now(&self) -> i64;

    /// Sleep for the given duration. Replaces `tokio::time::sleep` so test
    /// clocks can make loops advance without real delay.
    async fn sleep(&self, duration: Duration);
}

/// The default clock, backed by the real system clock and `tokio::time`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// A clock pinned to a fixed instant, adjustable at runtime.
///
/// Used by unit and integration tests to reproduce the literal end-to-end
/// scenarios anchored at a specific UNIX timestamp without depending on
/// wall-clock time.
#[derive(Debug)]
pub struct FixedClock(AtomicI64);

impl FixedClock {
    #[must_use]
    pub const fn new(now: i64) -> Self {
        Self(AtomicI64::new(now))
    }

    pub fn advance(&self, seconds: i64) {
        self.0.fetch_add(seconds, Ordering::SeqCst);
    }

    pub fn set(&self, now: i64) {
        self.0.store(now, Ordering::SeqCst);
    }
}

#[async_trait]
impl Clock for FixedClock {
    fn now(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }

    async fn sleep(&self, _duration: Duration) {
        // Deterministic tests never want to actually wait.
    }
}
