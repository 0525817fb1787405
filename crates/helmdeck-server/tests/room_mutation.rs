//! Room mutation through game logic.
//!
//! Covers the operations handlers reach through `Click::room`: swapping
//! cells, dynamic registration, holds, cooldowns and handler-chosen waits.
//! Also covers how a room binds to its persistent message at startup.

use std::{num::NonZeroU32, sync::Arc, time::Duration};

use helmdeck_core::{
    Action, ActorId, Click, ConfigError, Control, ControlError, ControlStyle, Environment,
    HandlerError, SurfaceError, SurfaceMessage,
};
use helmdeck_harness::{RecordedReply, RecordingHandle, RecordingSurface, SimEnv, SurfaceCall};
use helmdeck_server::{
    ClickEvent, ClickOutcome, EngineConfig, LockStore, MemoryLockStore, Room, RoomError,
    RoomOptions,
};

type TestRoom = Room<SimEnv, MemoryLockStore<SimEnv>>;

fn control(id: &str) -> Control {
    Control::new(id, id, ControlStyle::Secondary)
}

fn noop(id: &str) -> Action {
    Action::callback_fn(control(id), |_click: Click| async { Ok(None) })
}

async fn open_on(
    rows: Vec<Vec<Action>>,
    surface: Arc<RecordingSurface>,
) -> (Arc<TestRoom>, SimEnv) {
    let env = SimEnv::with_seed(11);
    let room = Room::open(
        RoomOptions::new("Galley", "Mind the stove.", rows),
        EngineConfig::default(),
        env.clone(),
        MemoryLockStore::new(env.clone()),
        surface,
    )
    .await
    .unwrap();
    (room, env)
}

async fn click(
    room: &Arc<TestRoom>,
    id: &str,
    actor: &str,
) -> (ClickOutcome, Arc<RecordingHandle>) {
    let handle = RecordingHandle::new(actor);
    let outcome = room.handle_click(ClickEvent::new(id, actor, handle.clone())).await.unwrap();
    (outcome, handle)
}

#[tokio::test(start_paused = true)]
async fn new_room_sends_then_edits_its_message() {
    let surface = RecordingSurface::new();
    let (room, _env) = open_on(vec![vec![noop("stove")]], surface.clone()).await;

    assert_eq!(room.message_id().as_str(), "msg-1");
    assert_eq!(surface.calls().len(), 1);
    assert!(matches!(surface.calls()[0], SurfaceCall::Send { .. }));

    room.render().await.unwrap();
    assert_eq!(surface.edit_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn existing_message_is_edited_in_place() {
    let surface = RecordingSurface::with_existing("board-7");
    let env = SimEnv::with_seed(3);
    let room = Room::open(
        RoomOptions::new("Galley", "Mind the stove.", vec![vec![noop("stove")]])
            .with_message_id("board-7"),
        EngineConfig::default(),
        env.clone(),
        MemoryLockStore::new(env),
        surface.clone(),
    )
    .await
    .unwrap();

    assert_eq!(room.message_id().as_str(), "board-7");
    assert_eq!(surface.edit_count(), 1);
    assert_eq!(surface.last().unwrap().rows, vec![vec![control("stove")]]);
}

#[tokio::test(start_paused = true)]
async fn missing_message_fails_startup() {
    let env = SimEnv::with_seed(3);
    let result = Room::open(
        RoomOptions::new("Galley", "x", Vec::new()).with_message_id("gone"),
        EngineConfig::default(),
        env.clone(),
        MemoryLockStore::new(env),
        RecordingSurface::new(),
    )
    .await;

    assert_eq!(
        result.err(),
        Some(RoomError::Surface(SurfaceError::MessageNotFound("gone".to_string())))
    );
}

#[tokio::test(start_paused = true)]
async fn oversized_choice_fails_startup() {
    let children = (0..6).map(|i| noop(&format!("dish-{i}"))).collect();
    let menu = Action::choice(control("menu"), "Pick a dish", children);

    let env = SimEnv::with_seed(3);
    let result = Room::open(
        RoomOptions::new("Galley", "x", vec![vec![menu]]),
        EngineConfig::default(),
        env.clone(),
        MemoryLockStore::new(env),
        RecordingSurface::new(),
    )
    .await;

    assert!(matches!(
        result.err(),
        Some(RoomError::Config(ConfigError::TooManyControlsInRow { len: 6, .. }))
    ));
}

#[tokio::test(start_paused = true)]
async fn replace_cell_rerenders_and_registers() {
    let surface = RecordingSurface::new();
    let (room, _env) = open_on(vec![vec![noop("stove"), noop("sink")]], surface.clone()).await;

    room.replace_cell(0, 0, noop("oven")).await.unwrap();

    assert_eq!(surface.edit_count(), 1);
    assert_eq!(surface.last().unwrap().rows, vec![vec![control("oven"), control("sink")]]);
    assert!(room.is_registered("oven"));
    assert!(room.is_registered("stove"), "earlier registrations stay resolvable");
    assert_eq!(room.cell(0, 0).map(|a| a.id().clone()), Some("oven".into()));
}

#[tokio::test(start_paused = true)]
async fn colliding_replacement_is_rejected() {
    let surface = RecordingSurface::new();
    let (room, _env) = open_on(vec![vec![noop("stove"), noop("sink")]], surface.clone()).await;
    let before = room.controls();

    let clash = Action::choice(control("tap"), "Which tap?", vec![noop("sink")]);
    let err = room.replace_cell(0, 0, clash).await.unwrap_err();

    assert_eq!(err, ControlError::Config(ConfigError::DuplicateControl("sink".into())));
    assert_eq!(room.controls(), before);
    assert!(!room.is_registered("tap"));
    assert_eq!(surface.edit_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn replace_outside_tree_is_rejected() {
    let (room, _env) = open_on(vec![vec![noop("stove")]], RecordingSurface::new()).await;

    let err = room.replace_cell(3, 0, noop("oven")).await.unwrap_err();
    assert_eq!(err, ControlError::Config(ConfigError::CellOutOfBounds { row: 3, col: 0 }));
}

#[tokio::test(start_paused = true)]
async fn handler_swaps_its_own_cell() {
    let toggle = Action::callback_fn(control("light-on"), |click: Click| async move {
        click.room.replace_cell(0, 0, noop("light-off")).await?;
        Ok(Some(SurfaceMessage::new("Click.")))
    });
    let surface = RecordingSurface::new();
    let (room, _env) = open_on(vec![vec![toggle]], surface.clone()).await;

    let (outcome, handle) = click(&room, "light-on", "A").await;

    assert_eq!(outcome, ClickOutcome::Resolved);
    assert_eq!(handle.texts(), vec!["Click.".to_string()]);
    assert_eq!(surface.last().unwrap().rows, vec![vec![control("light-off")]]);
}

#[tokio::test(start_paused = true)]
async fn dynamic_registration_leaves_tree_alone() {
    let surface = RecordingSurface::new();
    let (room, _env) = open_on(vec![vec![noop("stove")]], surface.clone()).await;
    let before = room.controls();

    let nested = Action::choice(control("spices"), "Which?", vec![noop("salt"), noop("pepper")]);
    let count = room.register_dynamic(vec![nested, noop("ladle")]);

    assert_eq!(count, 4);
    for id in ["spices", "salt", "pepper", "ladle"] {
        assert!(room.is_registered(id), "{id} should resolve");
    }
    assert_eq!(room.controls(), before);
    assert_eq!(surface.edit_count(), 0);

    let (outcome, _) = click(&room, "salt", "A").await;
    assert_eq!(outcome, ClickOutcome::Resolved);
}

#[tokio::test(start_paused = true)]
async fn hold_occupies_actor_until_released() {
    let seat_deny = "You are seated. Stand up first.";
    let seat = Action::callback_fn(control("sit"), move |click: Click| async move {
        let placeholder = noop("seated").delayed(NonZeroU32::new(60).unwrap(), "", seat_deny);
        click.room.hold(&click.actor, placeholder, click.handle.clone(), Duration::from_secs(60))?;
        Ok(Some(SurfaceMessage::new("You sit down.")))
    });
    let stand = Action::callback_fn(control("stand"), |click: Click| async move {
        click.room.release_busy(&click.actor)?;
        let was_seated = click.room.take_pending(&click.actor).is_some();
        let reply = if was_seated { "You stand up." } else { "You were not seated." };
        Ok(Some(SurfaceMessage::new(reply)))
    });
    let config = EngineConfig::default().with_wait_exception("stand");
    let env = SimEnv::with_seed(5);
    let room = Room::open(
        RoomOptions::new("Galley", "x", vec![vec![seat, stand, noop("stove")]]),
        config,
        env.clone(),
        MemoryLockStore::new(env),
        RecordingSurface::new(),
    )
    .await
    .unwrap();

    click(&room, "sit", "A").await;
    assert!(room.is_pending(&ActorId::new("A")));

    let (outcome, handle) = click(&room, "stove", "A").await;
    assert_eq!(outcome, ClickOutcome::Busy);
    assert_eq!(handle.texts(), vec![seat_deny.to_string()]);

    let (_, handle) = click(&room, "stand", "A").await;
    assert_eq!(handle.texts(), vec!["You stand up.".to_string()]);
    assert!(!room.is_pending(&ActorId::new("A")));

    let (outcome, _) = click(&room, "stove", "A").await;
    assert_eq!(outcome, ClickOutcome::Resolved);
}

#[tokio::test(start_paused = true)]
async fn cooldowns_expire_with_their_ttl() {
    let (room, env) = open_on(Vec::new(), RecordingSurface::new()).await;

    assert_eq!(room.cooldown("mood-A").unwrap(), None);

    room.set_cooldown("mood-A", Duration::from_secs(10)).unwrap();
    env.sleep(Duration::from_secs(4)).await;
    let remaining = room.cooldown("mood-A").unwrap().unwrap();
    assert!(remaining <= Duration::from_secs(6), "{remaining:?}");

    env.sleep(Duration::from_secs(7)).await;
    assert_eq!(room.cooldown("mood-A").unwrap(), None);

    room.store().set(&room.keys().scoped("forever"), "true").unwrap();
    assert_eq!(room.cooldown("forever").unwrap(), Some(Duration::MAX));
}

#[tokio::test(start_paused = true)]
async fn unbounded_cooldown_never_lapses() {
    let (room, env) = open_on(Vec::new(), RecordingSurface::new()).await;

    room.set_cooldown("grudge-A", Duration::MAX).unwrap();
    env.sleep(Duration::from_secs(365 * 86_400)).await;

    assert_eq!(room.cooldown("grudge-A").unwrap(), Some(Duration::MAX));
}

#[tokio::test(start_paused = true)]
async fn zero_cooldown_is_rejected() {
    let (room, _env) = open_on(Vec::new(), RecordingSurface::new()).await;
    assert!(room.set_cooldown("mood-A", Duration::ZERO).is_err());
}

/// Handler that runs its own wait and reports whether it finished.
fn brew() -> Action {
    Action::callback_fn(control("brew"), |click: Click| async move {
        let seconds = NonZeroU32::new(3).ok_or_else(|| HandlerError::new("zero wait"))?;
        let Click { actor, action, room, handle } = click;
        let completed = room.delay(&actor, action, handle, seconds, "Brewing...".into()).await?;
        Ok(completed.then(|| SurfaceMessage::new("Tea is ready.")))
    })
}

#[tokio::test(start_paused = true)]
async fn handler_chosen_wait_edits_reply() {
    let (room, _env) = open_on(vec![vec![brew()]], RecordingSurface::new()).await;

    let (outcome, handle) = click(&room, "brew", "A").await;

    assert_eq!(outcome, ClickOutcome::Resolved);
    assert_eq!(handle.replies(), vec![
        RecordedReply::Reply(SurfaceMessage::new("Brewing...")),
        RecordedReply::Edit(SurfaceMessage::new("Tea is ready.")),
    ]);
}

#[tokio::test(start_paused = true)]
async fn handler_chosen_wait_can_be_cancelled() {
    let (room, env) = open_on(vec![vec![brew()]], RecordingSurface::new()).await;

    let handle = RecordingHandle::new("A");
    let task = room.dispatch(ClickEvent::new("brew", "A", handle.clone()));
    env.sleep(Duration::from_secs(1)).await;
    assert!(room.cancel(&ActorId::new("A")));

    assert_eq!(task.await.unwrap().unwrap(), ClickOutcome::Resolved);
    assert_eq!(handle.texts(), vec!["Brewing...".to_string()]);
}
