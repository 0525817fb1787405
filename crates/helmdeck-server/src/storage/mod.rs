//! Lock store abstraction.
//!
//! A keyed string store with per-key expiry: the subset of Redis the engine
//! needs (`GET`, `SET key value [EX seconds]`, `DEL`, `TTL`). The trait is
//! synchronous; every command is individually atomic and no transactions are
//! assumed across commands. The check-then-set window between reading a lock
//! and taking it is accepted as best effort.

mod chaotic;
mod error;
mod memory;
mod redb;

use std::time::Duration;

pub use chaotic::ChaoticLockStore;
pub use error::StorageError;
pub use memory::MemoryLockStore;

pub use self::redb::RedbLockStore;

/// Remaining lifetime of a key, as reported by `TTL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// No live key (Redis `-2`).
    Missing,
    /// Key exists without expiry (Redis `-1`).
    Persistent,
    /// Key expires after this long.
    Expires(Duration),
}

impl KeyTtl {
    /// Remaining time, if the key is live and expiring.
    pub fn remaining(self) -> Option<Duration> {
        match self {
            Self::Expires(d) => Some(d),
            Self::Missing | Self::Persistent => None,
        }
    }
}

/// Keyed store with per-key expiry.
///
/// Must be Clone (shared between rooms and the resolver tasks they spawn),
/// Send + Sync, and synchronous. Implementations share internal state via
/// Arc, so clones access the same keys.
///
/// Expired keys are indistinguishable from missing keys on every read.
pub trait LockStore: Clone + Send + Sync + 'static {
    /// Value of a live key.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write `key` with an expiry of `ttl`.
    ///
    /// Overwrites any previous value and expiry. A zero `ttl` is rejected
    /// with [`StorageError::InvalidTtl`].
    fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StorageError>;

    /// Write `key` without expiry.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Returns whether a live key was removed.
    fn del(&self, key: &str) -> Result<bool, StorageError>;

    /// Remaining lifetime of `key`.
    fn ttl(&self, key: &str) -> Result<KeyTtl, StorageError>;
}

/// Reject zero TTLs the way Redis rejects `EX 0`.
fn check_ttl(key: &str, ttl: Duration) -> Result<(), StorageError> {
    if ttl.is_zero() {
        return Err(StorageError::InvalidTtl { key: key.to_string() });
    }
    Ok(())
}
