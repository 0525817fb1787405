//! Simulated environment on tokio's virtual clock.

#![allow(clippy::disallowed_types, reason = "Locking simple RNG state")]

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use helmdeck_core::Environment;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::time::Instant;

/// Wall clock at simulation start: 2024-01-01T00:00:00Z.
const EPOCH_MILLIS: u64 = 1_704_067_200_000;

/// Deterministic environment for tests.
///
/// Time is `tokio::time::Instant`, so under a paused runtime `sleep` advances
/// the virtual clock instead of waiting. Randomness comes from a seeded
/// ChaCha RNG shared by all clones. The wall clock is a fixed epoch plus the
/// virtual time elapsed since construction.
#[derive(Clone)]
pub struct SimEnv {
    rng: Arc<Mutex<ChaCha8Rng>>,
    started: Instant,
}

impl SimEnv {
    /// Environment seeded with 0.
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    /// Environment with an explicit RNG seed.
    pub fn with_seed(seed: u64) -> Self {
        Self { rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))), started: Instant::now() }
    }

    /// Virtual time elapsed since construction.
    pub fn elapsed(&self) -> Duration {
        Instant::now().duration_since(self.started)
    }
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for SimEnv {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn deadline(&self, from: Instant, after: Duration) -> Option<Instant> {
        from.checked_add(after)
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner).fill_bytes(buffer);
    }

    fn wall_clock_millis(&self) -> u64 {
        let elapsed = u64::try_from(self.elapsed().as_millis()).unwrap_or(u64::MAX);
        EPOCH_MILLIS.saturating_add(elapsed)
    }
}
