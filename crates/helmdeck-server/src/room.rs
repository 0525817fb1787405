//! Room: the control tree, its registry and the click resolver.
//!
//! A room owns one persistent message on the render surface. Clicks on its
//! controls run through a fixed sequence:
//!
//! ```text
//! lookup → busy check → exclusive check → (delay wait) → resolution
//! ```
//!
//! Each click resolves independently: [`Room::dispatch`] spawns it as its
//! own task. The only suspension point is the delay wait, and no internal
//! lock is held across it. Room state lives behind a short-lived
//! `std::sync::Mutex`; the lock store is the only state shared across
//! processes.
//!
//! Busy and exclusive locks are never released when a wait completes or is
//! cancelled. They expire with their TTL.

#![allow(clippy::disallowed_types, reason = "Room state is never held across await")]

use std::{
    num::NonZeroU32,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use helmdeck_core::{
    Action, ActionTree, ActorId, Click, Content, Control, ControlError, ControlId,
    ControlRegistry, DELAY_PLACEHOLDER, EventHandle, Exclusivity, MessageId, PendingInteraction,
    Resolution, RoomControls, Surface, SurfaceError, SurfaceMessage, USER_PLACEHOLDER,
    build_registry, env::Environment,
};
use tokio::task::JoinHandle;

use crate::{
    config::{EngineConfig, RoomOptions},
    error::RoomError,
    locks::LockKeys,
    pending::PendingTable,
    storage::{KeyTtl, LockStore, StorageError},
};

/// An inbound click on one of a room's controls.
#[derive(Clone)]
pub struct ClickEvent {
    /// Id of the clicked control
    pub control_id: ControlId,
    /// Who clicked
    pub actor: ActorId,
    /// Reply channel scoped to this click
    pub handle: Arc<dyn EventHandle>,
}

impl ClickEvent {
    /// Click on `control_id` by `actor`.
    pub fn new(
        control_id: impl Into<ControlId>,
        actor: impl Into<ActorId>,
        handle: Arc<dyn EventHandle>,
    ) -> Self {
        Self { control_id: control_id.into(), actor: actor.into(), handle }
    }
}

/// How a click ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// No action is bound to the control. Logged, nothing replied.
    Unbound,
    /// The actor is busy with another action and was denied.
    Busy,
    /// Another actor holds the action's exclusive group.
    Exclusive {
        /// Current holder of the group
        holder: ActorId,
    },
    /// The actor's wait was cancelled before it completed. Nothing replied.
    Cancelled,
    /// The action resolved.
    Resolved,
}

/// Mutable room state. Never locked across an await point.
struct RoomState {
    tree: ActionTree,
    registry: ControlRegistry,
    pending: PendingTable,
}

/// An interactive control surface backed by a lock store.
pub struct Room<E: Environment, L: LockStore> {
    name: String,
    content: Content,
    message_id: MessageId,
    config: EngineConfig,
    keys: LockKeys,
    env: E,
    store: L,
    surface: Arc<dyn Surface>,
    state: Mutex<RoomState>,
}

impl<E: Environment, L: LockStore> Room<E, L> {
    /// Validate the tree, build the registry and render the room.
    ///
    /// Edits the message named by `options.message_id`, or sends a new one
    /// and keeps its id.
    ///
    /// # Errors
    ///
    /// - `RoomError::Config` if the tree is oversized or has duplicate ids
    /// - `RoomError::Surface` if the initial render fails
    pub async fn open(
        options: RoomOptions,
        config: EngineConfig,
        env: E,
        store: L,
        surface: Arc<dyn Surface>,
    ) -> Result<Arc<Self>, RoomError> {
        let RoomOptions { name, content, message_id, rows } = options;
        let (tree, registry) = build_registry(rows, Vec::new())?;

        let message = SurfaceMessage::with_rows(content.clone(), tree.controls());
        let message_id = match message_id {
            Some(id) => {
                surface.edit(&id, message).await?;
                id
            },
            None => surface.send(message).await?,
        };

        tracing::info!(room = %name, %message_id, controls = registry.len(), "room opened");

        Ok(Arc::new(Self {
            name,
            content,
            message_id,
            keys: LockKeys::new(config.namespace.clone()),
            config,
            env,
            store,
            surface,
            state: Mutex::new(RoomState { tree, registry, pending: PendingTable::new() }),
        }))
    }

    /// Room display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Id of the room's persistent message.
    pub fn message_id(&self) -> &MessageId {
        &self.message_id
    }

    /// Lock key builder for this room's namespace.
    pub fn keys(&self) -> &LockKeys {
        &self.keys
    }

    /// The lock store.
    pub fn store(&self) -> &L {
        &self.store
    }

    /// The environment.
    pub fn env(&self) -> &E {
        &self.env
    }

    /// Grid of controls currently rendered.
    pub fn controls(&self) -> Vec<Vec<Control>> {
        self.state().tree.controls()
    }

    /// Action at `(row, col)` of the tree.
    pub fn cell(&self, row: usize, col: usize) -> Option<Action> {
        self.state().tree.cell(row, col).cloned()
    }

    /// Whether a click on `id` would find an action.
    pub fn is_registered(&self, id: &str) -> bool {
        self.state().registry.contains(id)
    }

    /// Whether `actor` has a pending entry.
    pub fn is_pending(&self, actor: &ActorId) -> bool {
        self.state().pending.contains(actor)
    }

    fn state(&self) -> MutexGuard<'_, RoomState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolve a click as an independent task.
    ///
    /// The handle reports lock-store, surface and handler failures,
    /// including those that happen during the delay wait.
    pub fn dispatch(
        self: &Arc<Self>,
        event: ClickEvent,
    ) -> JoinHandle<Result<ClickOutcome, RoomError>> {
        let room = Arc::clone(self);
        tokio::spawn(async move { room.handle_click(event).await })
    }

    /// Resolve a click inline.
    ///
    /// # Errors
    ///
    /// Lock-store and surface failures abort the click. A handler failure
    /// is logged and returned; nothing is replied on its behalf.
    pub async fn handle_click(
        self: &Arc<Self>,
        event: ClickEvent,
    ) -> Result<ClickOutcome, RoomError> {
        let ClickEvent { control_id, actor, handle } = event;

        let lookup = self.state().registry.get(control_id.as_str());
        let Some(action) = lookup else {
            tracing::warn!(
                room = %self.name,
                control = %control_id,
                "no action bound to control {control_id} in room {}",
                self.name
            );
            return Ok(ClickOutcome::Unbound);
        };

        if !self.config.is_wait_exception(&control_id)
            && self.store.get(&self.keys.busy(&actor))?.is_some()
        {
            let pending_deny = self
                .state()
                .pending
                .get(&actor)
                .and_then(|pending| pending.action.timing.deny_message().cloned());
            let deny = pending_deny.unwrap_or_else(|| self.config.busy_message.clone());

            tracing::debug!(room = %self.name, %actor, control = %control_id, "busy, denied");
            handle.respond(SurfaceMessage::new(deny)).await?;
            return Ok(ClickOutcome::Busy);
        }

        if let Exclusivity::Exclusive { group, deny_message } = &action.exclusivity {
            let holder = self.store.get(&self.keys.exclusive(group))?.map(ActorId::new);
            if let Some(holder) = holder.filter(|holder| *holder != actor) {
                let mention = self.surface.mention(&holder);
                let deny = deny_message.substitute(USER_PLACEHOLDER, &mention);

                tracing::debug!(
                    room = %self.name,
                    %actor,
                    %holder,
                    %group,
                    "exclusive group held, denied"
                );
                handle.respond(SurfaceMessage::new(deny)).await?;
                return Ok(ClickOutcome::Exclusive { holder });
            }
        }

        if let Some(delay) = action.delay() {
            let completed = self
                .delay(
                    &actor,
                    Arc::clone(&action),
                    Arc::clone(&handle),
                    delay.seconds,
                    &delay.wait_message,
                )
                .await?;
            if !completed {
                tracing::debug!(room = %self.name, %actor, control = %control_id, "wait cancelled");
                return Ok(ClickOutcome::Cancelled);
            }
        }

        self.resolve(actor, action, handle).await
    }

    async fn resolve(
        self: &Arc<Self>,
        actor: ActorId,
        action: Arc<Action>,
        handle: Arc<dyn EventHandle>,
    ) -> Result<ClickOutcome, RoomError> {
        match &action.resolution {
            Resolution::Callback(handler) => {
                let room: Arc<dyn RoomControls> = self.clone();
                let click = Click {
                    actor: actor.clone(),
                    action: Arc::clone(&action),
                    room,
                    handle: Arc::clone(&handle),
                };

                match handler.handle(click).await {
                    Ok(Some(reply)) => handle.respond(reply).await?,
                    Ok(None) => {},
                    Err(err) => {
                        tracing::error!(
                            room = %self.name,
                            %actor,
                            control = %action.id(),
                            "handler failed: {err}"
                        );
                        return Err(err.into());
                    },
                }
            },
            Resolution::Choice { prompt, children } => {
                self.register_dynamic(children.clone());
                let row = children.iter().map(|child| child.control.clone()).collect();
                handle.respond(SurfaceMessage::with_row(prompt.clone(), row)).await?;
            },
        }

        tracing::info!(room = %self.name, %actor, control = %action.id(), "resolution completed");
        Ok(ClickOutcome::Resolved)
    }

    /// Take the locks, install a pending entry, reply with the wait message
    /// and sleep for `seconds`.
    ///
    /// Returns `false` if the actor's entry was cancelled or taken before the
    /// timer fired. A wait superseded by a newer one still returns `true`.
    ///
    /// A failed wait reply is logged; the wait still runs.
    pub async fn delay(
        &self,
        actor: &ActorId,
        action: Arc<Action>,
        handle: Arc<dyn EventHandle>,
        seconds: NonZeroU32,
        wait_message: &Content,
    ) -> Result<bool, StorageError> {
        let ttl = Duration::from_secs(u64::from(seconds.get()));

        let exclusive_key = match &action.exclusivity {
            Exclusivity::Exclusive { group, .. } => {
                let key = self.keys.exclusive(group);
                self.store.set_ex(&key, actor.as_str(), ttl)?;
                Some(key)
            },
            Exclusivity::Shared => None,
        };
        if let Err(err) = self.store.set_ex(&self.keys.busy(actor), action.id().as_str(), ttl) {
            tracing::error!(room = %self.name, %actor, "busy lock write failed: {err}");
            if let Some(key) = exclusive_key {
                if let Err(cleanup) = self.store.del(&key) {
                    tracing::error!(room = %self.name, %key, "exclusive cleanup failed: {cleanup}");
                }
            }
            return Err(err);
        }

        let control = action.id().clone();
        let interaction = PendingInteraction { action, handle: Arc::clone(&handle) };
        let seq = self.state().pending.insert_wait(actor.clone(), interaction);

        tracing::debug!(
            room = %self.name,
            %actor,
            %control,
            seconds = seconds.get(),
            "wait started"
        );

        let wait = wait_message.substitute(DELAY_PLACEHOLDER, &seconds.to_string());
        if let Err(err) = handle.respond(SurfaceMessage::new(wait)).await {
            tracing::error!(room = %self.name, %actor, %control, "wait reply failed: {err}");
        }

        self.env.sleep(ttl).await;

        Ok(self.state().pending.complete(actor, seq))
    }

    /// Re-render the persistent message from the current tree.
    pub async fn render(&self) -> Result<(), SurfaceError> {
        let message = SurfaceMessage::with_rows(self.content.clone(), self.controls());
        self.surface.edit(&self.message_id, message).await.inspect_err(|err| {
            tracing::error!(
                room = %self.name,
                message_id = %self.message_id,
                "render failed: {err}"
            );
        })
    }

    /// Swap the action at `(row, col)`, register it and re-render.
    ///
    /// Rejects out-of-range cells and replacements whose ids collide with
    /// another cell; the tree and registry are unchanged on error.
    pub async fn replace_cell(
        &self,
        row: usize,
        col: usize,
        action: Action,
    ) -> Result<(), ControlError> {
        {
            let mut state = self.state();
            let new_id = action.id().clone();
            let old = state.tree.replace(row, col, action.clone())?;
            state.registry.register(action);
            tracing::info!(
                room = %self.name,
                row,
                col,
                old = %old.id(),
                new = %new_id,
                "cell replaced"
            );
        }
        self.render().await?;
        Ok(())
    }

    /// Make `actions` and their nested children clickable without touching
    /// the rendered tree. Returns the number of ids registered.
    pub fn register_dynamic(&self, actions: Vec<Action>) -> usize {
        let count = self.state().registry.register_all(actions);
        tracing::debug!(room = %self.name, count, "dynamic controls registered");
        count
    }

    /// Drop `actor`'s pending entry. Locks are left to expire.
    pub fn cancel(&self, actor: &ActorId) -> bool {
        let cancelled = self.state().pending.remove(actor).is_some();
        tracing::debug!(room = %self.name, %actor, cancelled, "cancel");
        cancelled
    }

    /// Drop and return `actor`'s pending entry.
    pub fn take_pending(&self, actor: &ActorId) -> Option<PendingInteraction> {
        self.state().pending.remove(actor)
    }

    /// Occupy `actor` for `ttl` without a timer.
    ///
    /// `action`'s delay deny message answers the actor's other clicks.
    pub fn hold(
        &self,
        actor: &ActorId,
        action: Action,
        handle: Arc<dyn EventHandle>,
        ttl: Duration,
    ) -> Result<(), StorageError> {
        self.store.set_ex(&self.keys.busy(actor), action.id().as_str(), ttl)?;

        tracing::debug!(room = %self.name, %actor, control = %action.id(), ?ttl, "actor held");
        let interaction = PendingInteraction { action: Arc::new(action), handle };
        self.state().pending.insert_hold(actor.clone(), interaction);
        Ok(())
    }

    /// Delete `actor`'s busy lock.
    pub fn release_busy(&self, actor: &ActorId) -> Result<bool, StorageError> {
        self.store.del(&self.keys.busy(actor))
    }

    /// Remaining time on a namespaced cooldown key.
    ///
    /// A key set without expiry reports `Duration::MAX`.
    pub fn cooldown(&self, key: &str) -> Result<Option<Duration>, StorageError> {
        let remaining = match self.store.ttl(&self.keys.scoped(key))? {
            KeyTtl::Missing => None,
            KeyTtl::Persistent => Some(Duration::MAX),
            KeyTtl::Expires(remaining) => Some(remaining),
        };
        Ok(remaining)
    }

    /// Start a namespaced cooldown key.
    pub fn set_cooldown(&self, key: &str, ttl: Duration) -> Result<(), StorageError> {
        self.store.set_ex(&self.keys.scoped(key), "true", ttl)
    }

    /// How `actor` is referenced inside message text.
    pub fn mention(&self, actor: &ActorId) -> String {
        self.surface.mention(actor)
    }
}

#[async_trait]
impl<E: Environment, L: LockStore> RoomControls for Room<E, L> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn replace_cell(
        &self,
        row: usize,
        col: usize,
        action: Action,
    ) -> Result<(), ControlError> {
        Room::replace_cell(self, row, col, action).await
    }

    fn register_dynamic(&self, actions: Vec<Action>) -> usize {
        Room::register_dynamic(self, actions)
    }

    fn cancel(&self, actor: &ActorId) -> bool {
        Room::cancel(self, actor)
    }

    fn take_pending(&self, actor: &ActorId) -> Option<PendingInteraction> {
        Room::take_pending(self, actor)
    }

    fn hold(
        &self,
        actor: &ActorId,
        action: Action,
        handle: Arc<dyn EventHandle>,
        ttl: Duration,
    ) -> Result<(), ControlError> {
        Ok(Room::hold(self, actor, action, handle, ttl)?)
    }

    fn release_busy(&self, actor: &ActorId) -> Result<bool, ControlError> {
        Ok(Room::release_busy(self, actor)?)
    }

    async fn delay(
        &self,
        actor: &ActorId,
        action: Arc<Action>,
        handle: Arc<dyn EventHandle>,
        seconds: NonZeroU32,
        wait_message: Content,
    ) -> Result<bool, ControlError> {
        Ok(Room::delay(self, actor, action, handle, seconds, &wait_message).await?)
    }

    fn cooldown(&self, key: &str) -> Result<Option<Duration>, ControlError> {
        Ok(Room::cooldown(self, key)?)
    }

    fn set_cooldown(&self, key: &str, ttl: Duration) -> Result<(), ControlError> {
        Ok(Room::set_cooldown(self, key, ttl)?)
    }

    fn mention(&self, actor: &ActorId) -> String {
        Room::mention(self, actor)
    }

    async fn render(&self) -> Result<(), ControlError> {
        Ok(Room::render(self).await?)
    }
}
