//! Lock store errors.

use thiserror::Error;

/// Errors from lock store operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Backend I/O failed (disk, network, injected chaos).
    ///
    /// Transient: the click fails and the actor may retry.
    #[error("I/O error: {0}")]
    Io(String),

    /// A stored record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A TTL of zero was requested. Expiring keys need a non-zero lifetime.
    #[error("invalid ttl for key {key}")]
    InvalidTtl {
        /// Key the write was for
        key: String,
    },
}

impl From<StorageError> for helmdeck_core::ControlError {
    fn from(err: StorageError) -> Self {
        Self::Store(err.to_string())
    }
}
