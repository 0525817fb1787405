#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use helmdeck_core::Environment;

use super::{KeyTtl, LockStore, StorageError, check_ttl};

/// In-memory lock store for single-process deployments and tests
///
/// Uses `HashMap` keyed by the full lock key. Expiry is measured against the
/// environment's monotonic clock, so a simulated environment drives expiry
/// with virtual time. Expired entries are purged lazily when touched. All
/// state is wrapped in Arc<Mutex<>> so clones share keys.
#[derive(Clone)]
pub struct MemoryLockStore<E: Environment> {
    env: E,
    inner: Arc<Mutex<HashMap<String, Entry<E::Instant>>>>,
}

struct Entry<I> {
    value: String,
    /// `None` for keys written without expiry
    expires_at: Option<I>,
}

impl<E: Environment> MemoryLockStore<E> {
    /// Create a new empty store on `env`'s clock.
    pub fn new(env: E) -> Self {
        Self { env, inner: Arc::new(Mutex::new(HashMap::new())) }
    }

    /// Number of live keys.
    ///
    /// Useful for debugging and testing.
    pub fn len(&self) -> usize {
        let now = self.env.now();
        self.entries().values().filter(|e| is_live(e, now)).count()
    }

    /// Whether no live key exists.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry<E::Instant>>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the map and read the clock once for a single command.
    fn live_entries(&self) -> (MutexGuard<'_, HashMap<String, Entry<E::Instant>>>, E::Instant) {
        let now = self.env.now();
        let entries = self.entries();
        (entries, now)
    }
}

fn is_live<I: Ord>(entry: &Entry<I>, now: I) -> bool {
    entry.expires_at.as_ref().is_none_or(|at| now < *at)
}

impl<E: Environment> LockStore for MemoryLockStore<E> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let (mut entries, now) = self.live_entries();
        match entries.get(key) {
            Some(entry) if is_live(entry, now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            },
            None => Ok(None),
        }
    }

    fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StorageError> {
        check_ttl(key, ttl)?;
        let (mut entries, now) = self.live_entries();
        // A ttl past the end of the clock never expires
        let expires_at = self.env.deadline(now, ttl);
        entries.insert(key.to_string(), Entry { value: value.to_string(), expires_at });
        Ok(())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries()
            .insert(key.to_string(), Entry { value: value.to_string(), expires_at: None });
        Ok(())
    }

    fn del(&self, key: &str) -> Result<bool, StorageError> {
        let (mut entries, now) = self.live_entries();
        Ok(entries.remove(key).is_some_and(|entry| is_live(&entry, now)))
    }

    fn ttl(&self, key: &str) -> Result<KeyTtl, StorageError> {
        let (mut entries, now) = self.live_entries();
        let ttl = match entries.get(key) {
            None => KeyTtl::Missing,
            Some(Entry { expires_at: None, .. }) => KeyTtl::Persistent,
            Some(Entry { expires_at: Some(at), .. }) if now < *at => KeyTtl::Expires(*at - now),
            Some(_) => {
                entries.remove(key);
                KeyTtl::Missing
            },
        };
        Ok(ttl)
    }
}
