//! Room and application error types.

use std::fmt;

use helmdeck_core::{ConfigError, HandlerError, SurfaceError};
use thiserror::Error;

use crate::storage::StorageError;

/// Errors from opening a room or resolving a click.
///
/// Lookup misses, lock conflicts and cancelled waits are not errors; they are
/// reported as [`ClickOutcome`](crate::ClickOutcome) variants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoomError {
    /// The control tree is misconfigured. Fatal to room startup.
    #[error("invalid control tree: {0}")]
    Config(#[from] ConfigError),

    /// The lock store failed. The click is abandoned; the actor may retry.
    #[error("lock store error: {0}")]
    Storage(#[from] StorageError),

    /// The render surface failed to send, edit or reply.
    #[error("surface error: {0}")]
    Surface(#[from] SurfaceError),

    /// A callback handler failed.
    #[error(transparent)]
    Handler(#[from] HandlerError),
}

/// Errors that stop the `helmdeck` binary.
#[derive(Debug)]
pub enum AppError {
    /// Invalid command-line configuration.
    ///
    /// Fatal at startup. Fix the arguments and restart.
    Config(String),

    /// Opening or resolving the room failed.
    Room(RoomError),

    /// The lock store could not be opened.
    Storage(StorageError),

    /// Reading commands from stdin failed.
    Io(std::io::Error),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::Room(err) => write!(f, "room error: {err}"),
            Self::Storage(err) => write!(f, "storage error: {err}"),
            Self::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Room(err) => Some(err),
            Self::Storage(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Config(_) => None,
        }
    }
}

impl From<RoomError> for AppError {
    fn from(err: RoomError) -> Self {
        Self::Room(err)
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}
