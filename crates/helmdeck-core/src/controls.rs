//! Game-logic seam.
//!
//! Handlers receive a [`Click`] carrying the actor, the resolved action, the
//! event's reply channel and an object-safe view of the room
//! ([`RoomControls`]) through which they mutate the tree, register follow-up
//! controls, and interrupt other actors.

use std::{future::Future, num::NonZeroU32, sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::{
    action::Action,
    content::{Content, SurfaceMessage},
    error::{ControlError, HandlerError},
    ids::ActorId,
    surface::EventHandle,
};

/// What a handler returns: an optional reply for the clicking actor.
///
/// `Some` is delivered by editing the actor's existing reply (for delayed
/// actions, the wait message) or replying fresh.
pub type HandlerResult = Result<Option<SurfaceMessage>, HandlerError>;

/// A resolved click handed to a [`Handler`].
#[derive(Clone)]
pub struct Click {
    /// Who clicked
    pub actor: ActorId,
    /// The action being resolved
    pub action: Arc<Action>,
    /// The room the control belongs to
    pub room: Arc<dyn RoomControls>,
    /// Reply channel for this click
    pub handle: Arc<dyn EventHandle>,
}

/// Terminal effect of a callback action.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Resolve the click.
    async fn handle(&self, click: Click) -> HandlerResult;
}

/// Adapts an async closure into a [`Handler`].
pub struct FnHandler<F> {
    f: F,
}

impl<F> FnHandler<F> {
    /// Wrap `f`.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(Click) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn handle(&self, click: Click) -> HandlerResult {
        (self.f)(click).await
    }
}

/// An actor's in-flight delayed action (or hold).
#[derive(Clone)]
pub struct PendingInteraction {
    /// The action the actor is waiting on. Its delay deny message answers
    /// the actor's other clicks.
    pub action: Arc<Action>,
    /// Reply channel of the click that started the wait
    pub handle: Arc<dyn EventHandle>,
}

impl std::fmt::Debug for PendingInteraction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingInteraction")
            .field("control", self.action.id())
            .field("replied", &self.handle.replied())
            .finish()
    }
}

/// Room operations exposed to game logic.
#[async_trait]
pub trait RoomControls: Send + Sync {
    /// Room display name.
    fn name(&self) -> &str;

    /// Swap the action at `(row, col)`, register it (and its children), and
    /// re-render the room.
    async fn replace_cell(&self, row: usize, col: usize, action: Action)
    -> Result<(), ControlError>;

    /// Make `actions` (and their nested children) clickable without
    /// changing the rendered tree. Returns the number of ids registered.
    fn register_dynamic(&self, actions: Vec<Action>) -> usize;

    /// Drop `actor`'s pending entry. Returns whether one existed.
    ///
    /// Locks are not released; they expire with their TTL.
    fn cancel(&self, actor: &ActorId) -> bool;

    /// Drop and return `actor`'s pending entry.
    fn take_pending(&self, actor: &ActorId) -> Option<PendingInteraction>;

    /// Occupy `actor` for `ttl` without a timer: sets the busy lock and a
    /// pending entry whose `action` supplies the deny message.
    fn hold(
        &self,
        actor: &ActorId,
        action: Action,
        handle: Arc<dyn EventHandle>,
        ttl: Duration,
    ) -> Result<(), ControlError>;

    /// Delete `actor`'s busy lock. Returns whether a live lock was removed.
    fn release_busy(&self, actor: &ActorId) -> Result<bool, ControlError>;

    /// Run the delay sequence (locks, pending entry, wait reply, sleep) for
    /// a wait the handler chooses itself.
    ///
    /// Returns `false` if the wait was cancelled.
    async fn delay(
        &self,
        actor: &ActorId,
        action: Arc<Action>,
        handle: Arc<dyn EventHandle>,
        seconds: NonZeroU32,
        wait_message: Content,
    ) -> Result<bool, ControlError>;

    /// Remaining time on a namespaced cooldown key. `None` when not set.
    fn cooldown(&self, key: &str) -> Result<Option<Duration>, ControlError>;

    /// Start a namespaced cooldown key.
    fn set_cooldown(&self, key: &str, ttl: Duration) -> Result<(), ControlError>;

    /// How `actor` is referenced inside message text.
    fn mention(&self, actor: &ActorId) -> String;

    /// Re-render the room's persistent message from the current tree.
    async fn render(&self) -> Result<(), ControlError>;
}
