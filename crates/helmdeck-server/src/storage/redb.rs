//! Redb-backed durable lock store.
//!
//! Uses Redb's ACID transactions so every command is atomic. Records carry
//! their expiry as wall-clock milliseconds, so locks taken before a restart
//! still expire on schedule after it.

use std::{path::Path, sync::Arc, time::Duration};

use helmdeck_core::Environment;
use redb::{Database, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};

use super::{KeyTtl, LockStore, StorageError, check_ttl};

/// Table: locks
/// Key: full lock key (UTF-8)
/// Value: CBOR-encoded LockRecord
const LOCKS: TableDefinition<&str, &[u8]> = TableDefinition::new("locks");

/// Stored form of one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct LockRecord {
    value: String,
    /// Wall-clock expiry in Unix milliseconds; `None` for persistent keys
    expires_at_ms: Option<u64>,
}

impl LockRecord {
    fn is_live(&self, now_ms: u64) -> bool {
        self.expires_at_ms.is_none_or(|at| now_ms < at)
    }
}

/// Durable lock store backed by Redb.
///
/// Thread-safe through Redb's internal locking. Clone is cheap (Arc).
#[derive(Clone)]
pub struct RedbLockStore<E: Environment> {
    db: Arc<Database>,
    env: E,
}

impl<E: Environment> RedbLockStore<E> {
    /// Open or create a Redb database at the given path.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the database cannot be opened or created.
    pub fn open(path: impl AsRef<Path>, env: E) -> Result<Self, StorageError> {
        let db = Database::create(path.as_ref()).map_err(io)?;

        let txn = db.begin_write().map_err(io)?;
        {
            let _ = txn.open_table(LOCKS).map_err(io)?;
        }
        txn.commit().map_err(io)?;

        Ok(Self { db: Arc::new(db), env })
    }

    fn read_record(&self, key: &str) -> Result<Option<LockRecord>, StorageError> {
        let txn = self.db.begin_read().map_err(io)?;
        let table = txn.open_table(LOCKS).map_err(io)?;

        match table.get(key).map_err(io)? {
            Some(bytes) => decode(bytes.value()).map(Some),
            None => Ok(None),
        }
    }

    fn write_record(&self, key: &str, record: &LockRecord) -> Result<(), StorageError> {
        let bytes = encode(record)?;

        let txn = self.db.begin_write().map_err(io)?;
        {
            let mut table = txn.open_table(LOCKS).map_err(io)?;
            table.insert(key, bytes.as_slice()).map_err(io)?;
        }
        txn.commit().map_err(io)?;

        Ok(())
    }

    /// Remove `key`, returning the record it held.
    fn remove_record(&self, key: &str) -> Result<Option<LockRecord>, StorageError> {
        let txn = self.db.begin_write().map_err(io)?;
        let removed = {
            let mut table = txn.open_table(LOCKS).map_err(io)?;
            let removed = table.remove(key).map_err(io)?;
            match removed {
                Some(bytes) => Some(decode(bytes.value())?),
                None => None,
            }
        };
        txn.commit().map_err(io)?;

        Ok(removed)
    }

    /// Remove `key` only if the record it holds now is expired at `now_ms`.
    ///
    /// Check and removal share one write transaction, so a record rewritten
    /// after the caller's read survives.
    fn purge_expired(&self, key: &str, now_ms: u64) -> Result<(), StorageError> {
        let txn = self.db.begin_write().map_err(io)?;
        {
            let mut table = txn.open_table(LOCKS).map_err(io)?;
            let expired = match table.get(key).map_err(io)? {
                Some(bytes) => !decode(bytes.value())?.is_live(now_ms),
                None => false,
            };
            if expired {
                table.remove(key).map_err(io)?;
            }
        }
        txn.commit().map_err(io)?;

        Ok(())
    }

    /// Live record for `key`, purging it if it has expired.
    fn live_record(&self, key: &str) -> Result<Option<(LockRecord, u64)>, StorageError> {
        let now_ms = self.env.wall_clock_millis();
        match self.read_record(key)? {
            Some(record) if record.is_live(now_ms) => Ok(Some((record, now_ms))),
            Some(_) => {
                self.purge_expired(key, now_ms)?;
                Ok(None)
            },
            None => Ok(None),
        }
    }
}

impl<E: Environment> LockStore for RedbLockStore<E> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.live_record(key)?.map(|(record, _)| record.value))
    }

    fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StorageError> {
        check_ttl(key, ttl)?;
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        // A ttl past the end of the clock never expires
        let record = LockRecord {
            value: value.to_string(),
            expires_at_ms: self.env.wall_clock_millis().checked_add(ttl_ms),
        };
        self.write_record(key, &record)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.write_record(key, &LockRecord { value: value.to_string(), expires_at_ms: None })
    }

    fn del(&self, key: &str) -> Result<bool, StorageError> {
        let now_ms = self.env.wall_clock_millis();
        Ok(self.remove_record(key)?.is_some_and(|record| record.is_live(now_ms)))
    }

    fn ttl(&self, key: &str) -> Result<KeyTtl, StorageError> {
        let ttl = match self.live_record(key)? {
            None => KeyTtl::Missing,
            Some((LockRecord { expires_at_ms: None, .. }, _)) => KeyTtl::Persistent,
            Some((LockRecord { expires_at_ms: Some(at), .. }, now_ms)) => {
                KeyTtl::Expires(Duration::from_millis(at.saturating_sub(now_ms)))
            },
        };
        Ok(ttl)
    }
}

fn io(err: impl std::fmt::Display) -> StorageError {
    StorageError::Io(err.to_string())
}

fn encode(record: &LockRecord) -> Result<Vec<u8>, StorageError> {
    let mut bytes = Vec::new();
    ciborium::into_writer(record, &mut bytes)
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
    Ok(bytes)
}

fn decode(bytes: &[u8]) -> Result<LockRecord, StorageError> {
    ciborium::from_reader(bytes).map_err(|e| StorageError::Serialization(e.to_string()))
}
