//! Fault-injecting lock store.
//!
//! Wraps another store and fails a seeded fraction of calls with
//! `StorageError::Io`. Click-resolution tests use it to check that store
//! failures abort a click cleanly and never strand a pending entry.

#![allow(clippy::disallowed_types, reason = "Locking simple RNG state")]

use std::{
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use super::{KeyTtl, LockStore, StorageError};

const DEFAULT_SEED: u64 = 0x1234_5678_9ABC_DEF0;

/// Lock store that fails a seeded fraction of operations.
///
/// Clones share the failure schedule and the operation counter.
#[derive(Clone)]
pub struct ChaoticLockStore<S: LockStore> {
    inner: S,
    failure_rate: f64,
    schedule: Arc<Mutex<FailureSchedule>>,
    operations: Arc<AtomicUsize>,
}

/// Reproducible coin flips (64-bit LCG, Knuth's MMIX constants).
struct FailureSchedule {
    state: u64,
}

impl FailureSchedule {
    fn roll(&mut self) -> f64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        // Top 53 bits give a uniform f64 in [0, 1)
        (self.state >> 11) as f64 / (1u64 << 53) as f64
    }
}

impl<S: LockStore> ChaoticLockStore<S> {
    /// Wrap `inner` with the default seed. `failure_rate` is clamped to
    /// `0.0..=1.0`.
    pub fn new(inner: S, failure_rate: f64) -> Self {
        Self::with_seed(inner, failure_rate, DEFAULT_SEED)
    }

    /// Wrap `inner` with an explicit seed.
    pub fn with_seed(inner: S, failure_rate: f64, seed: u64) -> Self {
        Self {
            inner,
            failure_rate: failure_rate.clamp(0.0, 1.0),
            schedule: Arc::new(Mutex::new(FailureSchedule { state: seed })),
            operations: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The wrapped store, for checking what actually got written.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Operations attempted so far, failed ones included.
    pub fn operation_count(&self) -> usize {
        self.operations.load(Ordering::Relaxed)
    }

    fn gate(&self, op: &str, key: &str) -> Result<(), StorageError> {
        self.operations.fetch_add(1, Ordering::Relaxed);

        let roll = self.schedule.lock().unwrap_or_else(PoisonError::into_inner).roll();
        if roll < self.failure_rate {
            tracing::trace!(op, key, "injecting lock store failure");
            return Err(StorageError::Io(format!("injected {op} failure on {key}")));
        }
        Ok(())
    }
}

impl<S: LockStore> LockStore for ChaoticLockStore<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.gate("get", key)?;
        self.inner.get(key)
    }

    fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StorageError> {
        self.gate("set_ex", key)?;
        self.inner.set_ex(key, value, ttl)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.gate("set", key)?;
        self.inner.set(key, value)
    }

    fn del(&self, key: &str) -> Result<bool, StorageError> {
        self.gate("del", key)?;
        self.inner.del(key)
    }

    fn ttl(&self, key: &str) -> Result<KeyTtl, StorageError> {
        self.gate("ttl", key)?;
        self.inner.ttl(key)
    }
}
