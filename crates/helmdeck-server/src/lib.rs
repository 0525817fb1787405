//! Helmdeck room engine.
//!
//! Wires [`helmdeck_core`]'s action model to a lock store, a render surface
//! and the tokio runtime.
//!
//! # Architecture
//!
//! A [`Room`] owns its control tree, registry and pending-interaction table.
//! Clicks are resolved by [`Room::handle_click`] (inline) or
//! [`Room::dispatch`] (as an independent task). Locks live in a
//! [`LockStore`], the only state shared across processes.
//!
//! # Components
//!
//! - [`Room`]: tree, registry, click resolver and the [`RoomControls`]
//!   surface exposed to game logic
//! - [`storage`]: [`LockStore`] trait with memory, chaotic and redb backends
//! - [`LockKeys`]: busy / exclusive / game-logic key families
//! - [`EngineConfig`], [`RoomOptions`]: configuration
//! - [`SystemEnv`]: production environment (real time, OS randomness)
//!
//! [`RoomControls`]: helmdeck_core::RoomControls

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod locks;
mod pending;
mod room;
pub mod storage;
mod system_env;

pub use config::{DEFAULT_BUSY_MESSAGE, DEFAULT_NAMESPACE, EngineConfig, RoomOptions};
pub use error::{AppError, RoomError};
pub use locks::LockKeys;
pub use pending::PendingTable;
pub use room::{ClickEvent, ClickOutcome, Room};
pub use storage::{
    ChaoticLockStore, KeyTtl, LockStore, MemoryLockStore, RedbLockStore, StorageError,
};
pub use system_env::SystemEnv;
