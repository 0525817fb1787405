//! Environment abstraction for deterministic testing.
//!
//! Decouples the click resolver from system resources (time, randomness).
//! Production uses the real clock and OS entropy; tests use tokio's virtual
//! clock and a seeded RNG so delayed actions resolve deterministically.

use std::time::Duration;

/// Abstract environment providing time, randomness, and async primitives.
///
/// Implementations MUST guarantee:
///
/// - `now()` never goes backwards
/// - `sleep()` and `now()` observe the same clock, so a lock that expires
///   after `d` has expired once `sleep(d)` returns
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    ///
    /// Production environments use `std::time::Instant`, simulation
    /// environments use virtual time (`tokio::time::Instant` under a paused
    /// clock).
    type Instant: Copy
        + Ord
        + Send
        + Sync
        + std::fmt::Debug
        + std::ops::Add<Duration, Output = Self::Instant>
        + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic).
    fn now(&self) -> Self::Instant;

    /// `from + after`, or `None` if that instant is not representable.
    fn deadline(&self, from: Self::Instant, after: Duration) -> Option<Self::Instant>;

    /// Sleeps for the specified duration.
    ///
    /// Used only by the delay step of click resolution. Never called while a
    /// room's internal state is locked.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Fills the provided buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Milliseconds since the Unix epoch.
    ///
    /// Durable lock stores record expiry against this clock so records
    /// survive a process restart.
    fn wall_clock_millis(&self) -> u64;

    /// Generates a random `u64`.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }

    /// Random index in `0..len`. Returns 0 when `len` is 0.
    fn random_index(&self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        (self.random_u64() % len as u64) as usize
    }
}
