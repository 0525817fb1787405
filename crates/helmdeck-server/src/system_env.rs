//! Real clock and OS entropy.

use std::time::{Duration, Instant, SystemTime};

use helmdeck_core::Environment;

/// Environment the `helmdeck` binary runs on.
///
/// Lock expiry in [`MemoryLockStore`](crate::MemoryLockStore) follows the
/// monotonic clock; [`RedbLockStore`](crate::RedbLockStore) records expiry
/// against the system clock so records outlive the process. Delays are
/// tokio timers and must be awaited inside a tokio runtime.
///
/// # Panics
///
/// [`Environment::random_bytes`] panics if the OS RNG fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// The system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = Instant;

    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn deadline(&self, from: Instant, after: Duration) -> Option<Instant> {
        from.checked_add(after)
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer).expect("invariant: OS entropy source is available");
    }

    /// Clamped to 0 if the system clock is set before 1970.
    #[allow(clippy::disallowed_methods)]
    fn wall_clock_millis(&self) -> u64 {
        SystemTime::UNIX_EPOCH
            .elapsed()
            .map_or(0, |since| u64::try_from(since.as_millis()).unwrap_or(u64::MAX))
    }
}
