//! Helmdeck core.
//!
//! Pure data model and validation for interactive control surfaces: no I/O,
//! no clock, no lock store. The server crate wires these types to a lock
//! store, a render surface and the tokio runtime.
//!
//! # Components
//!
//! - [`action`]: [`Action`] as a product of timing, exclusivity and
//!   resolution axes
//! - [`tree`]: [`ActionTree`], the validated rows a room renders
//! - [`registry`]: [`ControlRegistry`], flat id → action lookup
//! - [`surface`]: render/transport collaborator traits
//! - [`controls`]: handler seam and [`RoomControls`]
//! - [`env`]: [`Environment`] abstraction over time and randomness

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod action;
pub mod content;
pub mod controls;
pub mod env;
pub mod error;
pub mod ids;
pub mod registry;
pub mod surface;
pub mod tree;

pub use action::{Action, Delay, Exclusivity, Resolution, Timing};
pub use content::{
    Content, Control, ControlStyle, DELAY_PLACEHOLDER, Embed, SurfaceMessage, USER_PLACEHOLDER,
};
pub use controls::{Click, FnHandler, Handler, HandlerResult, PendingInteraction, RoomControls};
pub use env::Environment;
pub use error::{ConfigError, ControlError, HandlerError, SurfaceError};
pub use ids::{ActorId, ControlId, GroupId, MessageId};
pub use registry::{ControlRegistry, build_registry};
pub use surface::{EventHandle, Surface};
pub use tree::{ActionTree, MAX_CONTROLS_PER_ROW, MAX_ROWS};
