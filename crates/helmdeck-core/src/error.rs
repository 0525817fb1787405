//! Error types for the helmdeck core.
//!
//! [`ConfigError`] covers construction-time violations of the control tree.
//! These are fatal to room startup: a misconfigured tree must not silently
//! start. The remaining types cross the collaborator seams (render surface,
//! game-logic handlers).

use thiserror::Error;

use crate::ids::ControlId;

/// A control tree violates a structural invariant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// More than [`MAX_ROWS`](crate::tree::MAX_ROWS) rows.
    #[error("too many rows: {rows} (max {max})")]
    TooManyRows {
        /// Number of rows supplied
        rows: usize,
        /// Limit
        max: usize,
    },

    /// A row (or a choice's children) holds more than
    /// [`MAX_CONTROLS_PER_ROW`](crate::tree::MAX_CONTROLS_PER_ROW) controls.
    #[error("too many controls in row {row}: {len} (max {max})")]
    TooManyControlsInRow {
        /// Index of the offending row (the enclosing top-level row for
        /// nested choices)
        row: usize,
        /// Number of controls in that row
        len: usize,
        /// Limit
        max: usize,
    },

    /// Two actions in the same tree share a control id.
    #[error("control {0} already exists")]
    DuplicateControl(ControlId),

    /// `replace_cell` addressed a cell that does not exist.
    #[error("no cell at row {row}, column {col}")]
    CellOutOfBounds {
        /// Row index
        row: usize,
        /// Column index
        col: usize,
    },
}

/// The render/transport collaborator failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    /// The message to edit no longer exists.
    #[error("message not found: {0}")]
    MessageNotFound(String),

    /// The event can no longer be replied to (expired or already answered).
    #[error("interaction expired")]
    InteractionExpired,

    /// Transport-level failure.
    #[error("transport error: {0}")]
    Transport(String),
}

/// A game-logic handler failed while resolving a click.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("handler failed: {0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    /// Build a handler error from any displayable cause.
    pub fn new(reason: impl std::fmt::Display) -> Self {
        Self(reason.to_string())
    }
}

/// Errors surfaced to game logic through [`RoomControls`](crate::RoomControls).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    /// The requested mutation would break the tree invariants.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The lock store rejected or failed the operation.
    #[error("lock store error: {0}")]
    Store(String),

    /// Rendering the room failed.
    #[error(transparent)]
    Surface(#[from] SurfaceError),
}

impl From<ControlError> for HandlerError {
    fn from(err: ControlError) -> Self {
        Self(err.to_string())
    }
}

impl From<SurfaceError> for HandlerError {
    fn from(err: SurfaceError) -> Self {
        Self(err.to_string())
    }
}
