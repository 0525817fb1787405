//! Click resolution scenarios.
//!
//! Every test runs on a paused tokio clock through `SimEnv`, so delays of
//! tens of seconds resolve instantly and deterministically.

use std::{
    num::NonZeroU32,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use helmdeck_core::{
    Action, ActorId, Click, Content, Control, ControlStyle, Embed, Environment, HandlerError,
    SurfaceMessage,
};
use helmdeck_harness::{RecordedReply, RecordingHandle, RecordingSurface, SimEnv};
use helmdeck_server::{
    ClickEvent, ClickOutcome, EngineConfig, KeyTtl, LockStore, MemoryLockStore, Room, RoomError,
    RoomOptions, StorageError,
};

type TestRoom = Room<SimEnv, MemoryLockStore<SimEnv>>;

fn secs(n: u32) -> NonZeroU32 {
    NonZeroU32::new(n).unwrap()
}

fn control(id: &str) -> Control {
    Control::new(id, id, ControlStyle::Primary)
}

/// Instant callback that bumps `counter` and replies `"{id} done"`.
fn counting(id: &'static str, counter: &Arc<AtomicUsize>) -> Action {
    let counter = Arc::clone(counter);
    Action::callback_fn(control(id), move |_click: Click| {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Some(SurfaceMessage::new(format!("{id} done"))))
        }
    })
}

async fn open(rows: Vec<Vec<Action>>, config: EngineConfig) -> (Arc<TestRoom>, SimEnv) {
    let env = SimEnv::with_seed(7);
    let room = Room::open(
        RoomOptions::new("Crow's Nest", "Look out.", rows),
        config,
        env.clone(),
        MemoryLockStore::new(env.clone()),
        RecordingSurface::new(),
    )
    .await
    .unwrap();
    (room, env)
}

fn event(control: &str, actor: &str) -> (ClickEvent, Arc<RecordingHandle>) {
    let handle = RecordingHandle::new(actor);
    (ClickEvent::new(control, actor, handle.clone()), handle)
}

async fn click(
    room: &Arc<TestRoom>,
    control: &str,
    actor: &str,
) -> (ClickOutcome, Arc<RecordingHandle>) {
    let (event, handle) = event(control, actor);
    (room.handle_click(event).await.unwrap(), handle)
}

#[tokio::test(start_paused = true)]
async fn six_rows_fail_room_startup() {
    let counter = Arc::new(AtomicUsize::new(0));
    let ids = ["r0", "r1", "r2", "r3", "r4", "r5"];
    let rows = ids.iter().map(|id| vec![counting(id, &counter)]).collect();

    let env = SimEnv::with_seed(1);
    let surface = RecordingSurface::new();
    let result = Room::open(
        RoomOptions::new("Overfull", "x", rows),
        EngineConfig::default(),
        env.clone(),
        MemoryLockStore::new(env),
        surface.clone(),
    )
    .await;

    let err = result.err().unwrap();
    assert!(matches!(err, RoomError::Config(_)));
    assert_eq!(err.to_string(), "invalid control tree: too many rows: 6 (max 5)");
    assert!(surface.calls().is_empty(), "a misconfigured room must not render");
}

#[tokio::test(start_paused = true)]
async fn exclusive_group_denies_other_actor_until_expiry() {
    let counter = Arc::new(AtomicUsize::new(0));
    let c1 = counting("c1", &counter)
        .exclusive("telescope", "${user} is using the telescope.")
        .delayed(secs(5), "Calibrating...", "Still calibrating.");
    let c2 = counting("c2", &counter).exclusive("telescope", "${user} got there first.");
    let (room, env) = open(vec![vec![c1, c2]], EngineConfig::default()).await;

    let (a_click, a_handle) = event("c1", "A");
    let a_task = room.dispatch(a_click);

    env.sleep(Duration::from_secs(1)).await;
    let (outcome, b_handle) = click(&room, "c2", "B").await;
    assert_eq!(outcome, ClickOutcome::Exclusive { holder: ActorId::new("A") });
    assert_eq!(b_handle.texts(), vec!["<@A> got there first.".to_string()]);
    assert_eq!(counter.load(Ordering::SeqCst), 0);

    env.sleep(Duration::from_secs(5)).await;
    let (outcome, b_handle) = click(&room, "c2", "B").await;
    assert_eq!(outcome, ClickOutcome::Resolved);
    assert_eq!(b_handle.texts(), vec!["c2 done".to_string()]);

    assert_eq!(a_task.await.unwrap().unwrap(), ClickOutcome::Resolved);
    assert_eq!(a_handle.texts(), vec!["Calibrating...".to_string(), "c1 done".to_string()]);
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn cancelled_wait_fires_silently() {
    let counter = Arc::new(AtomicUsize::new(0));
    let slow = counting("slow", &counter).delayed(secs(10), "Working...", "Busy working.");
    let (room, env) = open(vec![vec![slow]], EngineConfig::default()).await;

    let (a_click, a_handle) = event("slow", "A");
    let a_task = room.dispatch(a_click);

    env.sleep(Duration::from_secs(3)).await;
    assert!(room.cancel(&ActorId::new("A")));
    assert!(!room.cancel(&ActorId::new("A")));

    assert_eq!(a_task.await.unwrap().unwrap(), ClickOutcome::Cancelled);
    assert_eq!(counter.load(Ordering::SeqCst), 0);
    assert_eq!(a_handle.replies(), vec![RecordedReply::Reply(SurfaceMessage::new("Working..."))]);
}

#[tokio::test(start_paused = true)]
async fn cancelled_wait_leaves_room_untouched() {
    let remodel = Action::callback_fn(control("remodel"), |click: Click| async move {
        let rebuilt = Action::callback_fn(control("rebuilt"), |_click: Click| async { Ok(None) });
        click.room.replace_cell(0, 0, rebuilt).await?;
        let hidden = Action::callback_fn(control("hidden"), |_click: Click| async { Ok(None) });
        click.room.register_dynamic(vec![hidden]);
        Ok(Some(SurfaceMessage::new("Remodelled.")))
    })
    .delayed(secs(4), "Remodelling...", "Still remodelling.");

    let env = SimEnv::with_seed(7);
    let surface = RecordingSurface::new();
    let room: Arc<TestRoom> = Room::open(
        RoomOptions::new("Crow's Nest", "Look out.", vec![vec![remodel]]),
        EngineConfig::default(),
        env.clone(),
        MemoryLockStore::new(env.clone()),
        surface.clone(),
    )
    .await
    .unwrap();
    let before = room.controls();

    let (a_click, a_handle) = event("remodel", "A");
    let a_task = room.dispatch(a_click);
    env.sleep(Duration::from_secs(1)).await;
    assert!(room.cancel(&ActorId::new("A")));

    assert_eq!(a_task.await.unwrap().unwrap(), ClickOutcome::Cancelled);

    // ORACLE: a cancelled wait never reaches its handler
    assert_eq!(room.controls(), before);
    assert!(!room.is_registered("rebuilt"));
    assert!(!room.is_registered("hidden"));
    assert_eq!(surface.edit_count(), 0);
    assert_eq!(a_handle.texts(), vec!["Remodelling...".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn reclick_at_expiry_resolves_both_waits() {
    let counter = Arc::new(AtomicUsize::new(0));
    let slow = counting("slow", &counter).delayed(secs(3), "Working...", "Busy working.");
    let (room, env) = open(vec![vec![slow]], EngineConfig::default()).await;

    let (first, first_handle) = event("slow", "A");
    let first_task = room.dispatch(first);

    // Lands on the same tick as the first wait's timer, after its busy lock lapsed
    let second_task = {
        let room = Arc::clone(&room);
        let env = env.clone();
        tokio::spawn(async move {
            env.sleep(Duration::from_secs(3)).await;
            let (second, handle) = event("slow", "A");
            (room.handle_click(second).await, handle)
        })
    };

    assert_eq!(first_task.await.unwrap().unwrap(), ClickOutcome::Resolved);
    let (second, second_handle) = second_task.await.unwrap();
    assert_eq!(second.unwrap(), ClickOutcome::Resolved);

    // ORACLE: replacement by a newer wait is not a cancellation
    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert_eq!(first_handle.texts(), vec!["Working...".to_string(), "slow done".to_string()]);
    assert_eq!(second_handle.texts(), vec!["Working...".to_string(), "slow done".to_string()]);
    assert!(!room.is_pending(&ActorId::new("A")));
}

/// Memory store whose busy-lock writes fail.
#[derive(Clone)]
struct BusyWritesFail(MemoryLockStore<SimEnv>);

impl LockStore for BusyWritesFail {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.0.get(key)
    }

    fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StorageError> {
        if key.contains(":delay-") {
            return Err(StorageError::Io("disk full".to_string()));
        }
        self.0.set_ex(key, value, ttl)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.0.set(key, value)
    }

    fn del(&self, key: &str) -> Result<bool, StorageError> {
        self.0.del(key)
    }

    fn ttl(&self, key: &str) -> Result<KeyTtl, StorageError> {
        self.0.ttl(key)
    }
}

#[tokio::test(start_paused = true)]
async fn failed_busy_write_releases_exclusive_group() {
    let counter = Arc::new(AtomicUsize::new(0));
    let dock = counting("dock", &counter)
        .exclusive("pier", "${user} is docking.")
        .delayed(secs(30), "Docking...", "Still docking.");

    let env = SimEnv::with_seed(7);
    let store = BusyWritesFail(MemoryLockStore::new(env.clone()));
    let room = Room::open(
        RoomOptions::new("Harbour", "Berths.", vec![vec![dock]]),
        EngineConfig::default(),
        env.clone(),
        store.clone(),
        RecordingSurface::new(),
    )
    .await
    .unwrap();

    let (a_click, _a_handle) = event("dock", "A");
    let result = room.handle_click(a_click).await;

    assert!(matches!(result, Err(RoomError::Storage(StorageError::Io(_)))), "{result:?}");
    assert_eq!(store.get(&room.keys().exclusive(&"pier".into())).unwrap(), None);
    assert!(!room.is_pending(&ActorId::new("A")));
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn choice_children_become_clickable() {
    let flag = Arc::new(AtomicUsize::new(0));
    let x = counting("x", &flag).delayed(secs(2), "Doing x...", "Busy with x.");
    let y = counting("y", &flag);
    let choice = Action::choice(control("pick"), "Pick one", vec![x, y]);
    let (room, _env) = open(vec![vec![choice]], EngineConfig::default()).await;
    let rendered = room.controls();

    let (outcome, handle) = click(&room, "pick", "A").await;
    assert_eq!(outcome, ClickOutcome::Resolved);
    assert_eq!(handle.replies(), vec![RecordedReply::Reply(SurfaceMessage::with_row(
        "Pick one",
        vec![control("x"), control("y")]
    ))]);
    assert!(room.is_registered("x"));
    assert!(room.is_registered("y"));
    assert_eq!(room.controls(), rendered);

    let (outcome, handle) = click(&room, "x", "A").await;
    assert_eq!(outcome, ClickOutcome::Resolved);
    assert_eq!(flag.load(Ordering::SeqCst), 1);
    assert_eq!(handle.replies(), vec![
        RecordedReply::Reply(SurfaceMessage::new("Doing x...")),
        RecordedReply::Edit(SurfaceMessage::new("x done")),
    ]);
}

#[tokio::test(start_paused = true)]
async fn busy_actor_gets_pending_deny_message() {
    let counter = Arc::new(AtomicUsize::new(0));
    let p = counting("p", &counter).delayed(secs(10), "Working on p...", "You are still on p.");
    let q = counting("q", &counter);
    let (room, env) = open(vec![vec![p, q]], EngineConfig::default()).await;

    let (a_click, _) = event("p", "A");
    let a_task = room.dispatch(a_click);
    env.sleep(Duration::from_secs(1)).await;

    let (outcome, handle) = click(&room, "q", "A").await;
    assert_eq!(outcome, ClickOutcome::Busy);
    assert_eq!(handle.texts(), vec!["You are still on p.".to_string()]);
    assert_eq!(counter.load(Ordering::SeqCst), 0);

    let (outcome, _) = click(&room, "q", "B").await;
    assert_eq!(outcome, ClickOutcome::Resolved);

    assert_eq!(a_task.await.unwrap().unwrap(), ClickOutcome::Resolved);
}

#[tokio::test(start_paused = true)]
async fn unbound_control_is_ignored() {
    let (room, _env) = open(Vec::new(), EngineConfig::default()).await;

    let (outcome, handle) = click(&room, "ghost", "A").await;
    assert_eq!(outcome, ClickOutcome::Unbound);
    assert!(handle.replies().is_empty());
}

#[tokio::test(start_paused = true)]
async fn cancelled_actor_stays_busy_until_ttl() {
    let counter = Arc::new(AtomicUsize::new(0));
    let slow = counting("slow", &counter).delayed(secs(10), "Working...", "Busy working.");
    let other = counting("other", &counter);
    let (room, env) = open(vec![vec![slow, other]], EngineConfig::default()).await;

    let (a_click, _) = event("slow", "A");
    let a_task = room.dispatch(a_click);
    env.sleep(Duration::from_secs(3)).await;
    room.cancel(&ActorId::new("A"));

    let (outcome, handle) = click(&room, "other", "A").await;
    assert_eq!(outcome, ClickOutcome::Busy);
    assert_eq!(handle.texts(), vec![helmdeck_server::DEFAULT_BUSY_MESSAGE.to_string()]);

    assert_eq!(a_task.await.unwrap().unwrap(), ClickOutcome::Cancelled);
    let (outcome, _) = click(&room, "other", "A").await;
    assert_eq!(outcome, ClickOutcome::Resolved);
}

#[tokio::test(start_paused = true)]
async fn wait_exception_skips_busy_check() {
    let counter = Arc::new(AtomicUsize::new(0));
    let slow = counting("slow", &counter).delayed(secs(10), "Working...", "Busy working.");
    let leave = counting("leave", &counter);
    let config = EngineConfig::default().with_wait_exception("leave");
    let (room, env) = open(vec![vec![slow, leave]], config).await;

    let (a_click, _) = event("slow", "A");
    let _a_task = room.dispatch(a_click);
    env.sleep(Duration::from_secs(1)).await;

    let (outcome, _) = click(&room, "leave", "A").await;
    assert_eq!(outcome, ClickOutcome::Resolved);
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn exclusive_holder_may_reenter() {
    let counter = Arc::new(AtomicUsize::new(0));
    let wheel = counting("wheel", &counter).exclusive("helm", "${user} is steering.");
    let (room, _env) = open(vec![vec![wheel]], EngineConfig::default()).await;

    let key = room.keys().exclusive(&"helm".into());
    room.store().set_ex(&key, "A", Duration::from_secs(30)).unwrap();

    let (outcome, _) = click(&room, "wheel", "A").await;
    assert_eq!(outcome, ClickOutcome::Resolved);

    let (outcome, _) = click(&room, "wheel", "B").await;
    assert_eq!(outcome, ClickOutcome::Exclusive { holder: ActorId::new("A") });
}

#[tokio::test(start_paused = true)]
async fn placeholders_substitute_in_embeds_and_waits() {
    let counter = Arc::new(AtomicUsize::new(0));
    let deny =
        Embed { description: Some("${user} holds the cannon.".to_string()), ..Embed::default() };
    let fire = counting("fire", &counter)
        .exclusive("cannon", deny)
        .delayed(secs(8), "Loading for ${delay} seconds.", "Still loading.");
    let (room, env) = open(vec![vec![fire]], EngineConfig::default()).await;

    let (a_click, a_handle) = event("fire", "A");
    let _a_task = room.dispatch(a_click);
    env.sleep(Duration::from_secs(1)).await;
    assert_eq!(a_handle.texts().first().map(String::as_str), Some("Loading for 8 seconds."));

    let (_, b_handle) = click(&room, "fire", "B").await;
    let expected =
        Embed { description: Some("<@A> holds the cannon.".to_string()), ..Embed::default() };
    assert_eq!(b_handle.last().unwrap().content, Content::Embed(expected));
}

#[tokio::test(start_paused = true)]
async fn handler_failure_is_returned_without_reply() {
    let broken = Action::callback_fn(control("broken"), |_click: Click| async {
        Err(HandlerError::new("cannon jammed"))
    });
    let (room, _env) = open(vec![vec![broken]], EngineConfig::default()).await;

    let (click_event, handle) = event("broken", "A");
    let result = room.handle_click(click_event).await;

    assert_eq!(result, Err(RoomError::Handler(HandlerError::new("cannon jammed"))));
    assert!(handle.replies().is_empty());
}

#[tokio::test(start_paused = true)]
async fn actors_wait_concurrently() {
    let counter = Arc::new(AtomicUsize::new(0));
    let slow = counting("slow", &counter).delayed(secs(5), "Working...", "Busy working.");
    let (room, env) = open(vec![vec![slow]], EngineConfig::default()).await;
    let start = env.now();

    let tasks: Vec<_> =
        ["A", "B", "C"].iter().map(|actor| room.dispatch(event("slow", actor).0)).collect();
    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap(), ClickOutcome::Resolved);
    }

    let elapsed = env.now() - start;
    assert!(elapsed >= Duration::from_secs(5) && elapsed < Duration::from_secs(6), "{elapsed:?}");
    assert_eq!(counter.load(Ordering::SeqCst), 3);
}
