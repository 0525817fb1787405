//! Demo room for the console front end.
//!
//! One room exercising every engine feature:
//!
//! - row 0: delayed mood reports
//! - row 1: a hull panel that swaps between an instant "knock" and an
//!   exclusive delayed "repair"
//! - row 2: a lifeboat that holds the actor after boarding; "leave" stays
//!   clickable while held
//! - row 3: a telescope whose follow-up choices are generated per sweep

#![allow(clippy::disallowed_types, reason = "Scouting log is locked only synchronously")]

use std::{
    num::NonZeroU32,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use helmdeck_core::{
    Action, ActorId, Click, Content, Control, ControlStyle, Embed, Environment, Handler,
    HandlerError, HandlerResult, RoomControls, SurfaceMessage,
};
use helmdeck_server::{EngineConfig, RoomOptions};

/// Row and column of the hull panel.
const HULL_CELL: (usize, usize) = (1, 0);

const LIFEBOAT_LEAVE: &str = "lifeboat-leave";
const LIFEBOAT_HOLD: Duration = Duration::from_secs(300);

const TELESCOPE_GROUP: &str = "telescope";
const SCOUTING_COOLDOWN: Duration = Duration::from_secs(300);
/// Percent chance that a sweep finds something new.
const SWEEP_HIT_PERCENT: usize = 60;
/// A sweep offers another sweep until this many targets are found.
const MAX_FOUND: usize = 3;

/// Things the telescope can find: (name, what examining it reveals).
const TARGETS: [(&str, &str); 4] = [
    ("Ice Comet", "The comet's tail is rich in water ice. Worth a detour to refuel."),
    ("Derelict Freighter", "The freighter is empty, its cargo bay scorched from the inside."),
    ("Pulsing Nebula", "The nebula pulses every nine seconds. Navigation logs a warning."),
    ("Hull Termites", "Something is chewing the outer hull plates. Shields should shake them off."),
];

/// Engine configuration for the demo: `lifeboat-leave` skips the busy check.
pub fn engine_config(namespace: &str) -> EngineConfig {
    EngineConfig { namespace: namespace.to_string(), ..EngineConfig::default() }
        .with_wait_exception(LIFEBOAT_LEAVE)
}

/// The demo room. `env` drives the telescope's randomness.
pub fn room_options<E: Environment>(env: E) -> RoomOptions {
    let description = Embed {
        title: Some("Bridge".to_string()),
        description: Some("The ship hums. Pick a station.".to_string()),
        color: Some(0x2f_3136),
        ..Embed::default()
    };

    RoomOptions::new("Bridge", description, vec![
        vec![mood_report("calm", "Report Calm"), mood_report("alarm", "Report Alarm")],
        vec![hull_knock()],
        vec![lifeboat_enter()],
        vec![telescope_use(env)],
    ])
}

fn secs(n: u32) -> NonZeroU32 {
    NonZeroU32::new(n).unwrap_or(NonZeroU32::MIN)
}

fn mood_report(mood: &'static str, label: &str) -> Action {
    Action::callback_fn(
        Control::new(format!("report-{mood}"), label, ControlStyle::Success),
        move |click: Click| async move {
            click.room.set_cooldown(&format!("mood-{}", click.actor), Duration::from_secs(60))?;
            Ok(Some(SurfaceMessage::new(format!("You reported feeling {mood}."))))
        },
    )
    .delayed(
        secs(10),
        "Filing your report (${delay}s)...",
        "You are still filing your report.",
    )
}

fn hull_knock() -> Action {
    Action::callback_fn(
        Control::new("hull-knock", "Knock on Hull", ControlStyle::Secondary),
        |click: Click| async move {
            let (row, col) = HULL_CELL;
            click.room.replace_cell(row, col, hull_repair()).await?;
            Ok(Some(SurfaceMessage::new("A weakened plate cracks. The hull needs repair.")))
        },
    )
}

fn hull_repair() -> Action {
    Action::callback_fn(
        Control::new("hull-repair", "Repair Hull", ControlStyle::Danger),
        |click: Click| async move {
            let (row, col) = HULL_CELL;
            click.room.replace_cell(row, col, hull_knock()).await?;
            Ok(Some(SurfaceMessage::new("The hull plates are sealed again.")))
        },
    )
    .exclusive("hull-repair", "${user} is already welding the hull.")
    .delayed(secs(30), "Welding hull plates (${delay}s)...", "You are busy welding.")
}

fn lifeboat_enter() -> Action {
    Action::callback_fn(
        Control::new("lifeboat-enter", "Enter Lifeboat", ControlStyle::Primary),
        |click: Click| async move {
            let leave = lifeboat_leave();
            let leave_control = leave.control.clone();
            click.room.register_dynamic(vec![leave]);
            let handle = Arc::clone(&click.handle);
            click.room.hold(&click.actor, lifeboat_wait(), handle, LIFEBOAT_HOLD)?;

            Ok(Some(SurfaceMessage::with_row(
                "You strap into the lifeboat and wait for launch.",
                vec![leave_control],
            )))
        },
    )
    .delayed(
        secs(15),
        "Climbing into the lifeboat (${delay}s)...",
        "You are climbing into a lifeboat.",
    )
}

/// Placeholder action describing a held lifeboat passenger. Never rendered;
/// its deny message answers the passenger's other clicks.
fn lifeboat_wait() -> Action {
    Action::callback_fn(
        Control::new("lifeboat-wait", "Wait for Launch", ControlStyle::Danger),
        |_click: Click| async { Ok(None) },
    )
    .delayed(
        secs(300),
        "Waiting for launch.",
        "You are sitting in a lifeboat. Leave it first.",
    )
}

fn lifeboat_leave() -> Action {
    Action::callback_fn(
        Control::new(LIFEBOAT_LEAVE, "Leave Lifeboat", ControlStyle::Danger),
        |click: Click| async move {
            click.room.release_busy(&click.actor)?;
            click.room.cancel(&click.actor);
            Ok(Some(SurfaceMessage::new("You climb back out of the lifeboat.")))
        },
    )
}

fn telescope_use<E: Environment>(env: E) -> Action {
    Action::callback_fn(
        Control::new("telescope-use", "Scout Galaxy", ControlStyle::Primary),
        move |click: Click| {
            let env = env.clone();
            async move {
                if let Some(blocked) = scouting_blocked(&click)? {
                    return Ok(Some(blocked));
                }

                let calibrated = click
                    .room
                    .delay(
                        &click.actor,
                        Arc::clone(&click.action),
                        Arc::clone(&click.handle),
                        secs(5),
                        Content::text("Calibrating the telescope (${delay}s)..."),
                    )
                    .await?;
                if !calibrated {
                    return Ok(None);
                }

                let scout = Scout::new(env, click.actor.clone());
                Ok(Some(scout.sweep(click.room.as_ref())))
            }
        },
    )
    .exclusive(TELESCOPE_GROUP, "${user} is at the telescope right now.")
}

fn scouting_key(actor: &ActorId) -> String {
    format!("scouting-{actor}")
}

/// Reply for an actor still on scouting cooldown.
fn scouting_blocked(click: &Click) -> Result<Option<SurfaceMessage>, HandlerError> {
    let remaining = click.room.cooldown(&scouting_key(&click.actor))?;
    Ok(remaining.map(|left| {
        SurfaceMessage::new(format!(
            "The telescope is recalibrating. Try again in {} seconds.",
            left.as_secs()
        ))
    }))
}

/// One actor's scouting session.
///
/// The found log is owned by the session and shared only with the
/// follow-up actions it generates.
#[derive(Clone)]
struct Scout<E> {
    env: E,
    actor: ActorId,
    found: Arc<Mutex<Vec<usize>>>,
}

impl<E: Environment> Scout<E> {
    fn new(env: E, actor: ActorId) -> Self {
        Self { env, actor, found: Arc::new(Mutex::new(Vec::new())) }
    }

    fn found(&self) -> Vec<usize> {
        self.found.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Roll for a new target, then reply with the follow-up controls.
    fn sweep(&self, room: &dyn RoomControls) -> SurfaceMessage {
        let text = match self.roll().and_then(|index| TARGETS.get(index)) {
            Some((name, _)) => format!("The telescope picks out a {name}."),
            None => "Nothing but static this sweep.".to_string(),
        };

        let actions = self.follow_ups();
        let row = actions.iter().map(|action| action.control.clone()).collect();
        room.register_dynamic(actions);
        SurfaceMessage::with_row(text, row)
    }

    fn roll(&self) -> Option<usize> {
        if self.env.random_index(100) >= SWEEP_HIT_PERCENT {
            return None;
        }

        let mut found = self.found.lock().unwrap_or_else(PoisonError::into_inner);
        let unseen: Vec<usize> = (0..TARGETS.len()).filter(|i| !found.contains(i)).collect();
        let pick = *unseen.get(self.env.random_index(unseen.len()))?;
        found.push(pick);
        Some(pick)
    }

    /// An examine control per found target, plus another sweep while fewer
    /// than [`MAX_FOUND`] are found.
    fn follow_ups(&self) -> Vec<Action> {
        let found = self.found();
        let mut actions: Vec<Action> =
            found.iter().filter_map(|&index| self.examine(index)).collect();

        if found.len() < MAX_FOUND {
            let sweep = Action::callback(
                Control::new(
                    format!("telescope-sweep-{}", self.actor),
                    "Scout Again",
                    ControlStyle::Secondary,
                ),
                Arc::new(self.clone()),
            )
            .exclusive(TELESCOPE_GROUP, "${user} is at the telescope right now.")
            .delayed(secs(25), "Sweeping the sky (${delay}s)...", "You are busy scouting.");
            actions.push(sweep);
        }
        actions
    }

    fn examine(&self, index: usize) -> Option<Action> {
        let (name, finding) = *TARGETS.get(index)?;
        let id = format!("telescope-examine-{index}-{}", self.actor);
        let action = Action::callback_fn(
            Control::new(id, name, ControlStyle::Primary),
            move |click: Click| async move {
                if let Some(blocked) = scouting_blocked(&click)? {
                    return Ok(Some(blocked));
                }
                click.room.set_cooldown(&scouting_key(&click.actor), SCOUTING_COOLDOWN)?;
                tracing::info!(actor = %click.actor, object = name, "telescope report filed");
                Ok(Some(SurfaceMessage::new(finding)))
            },
        )
        .exclusive(TELESCOPE_GROUP, "${user} is at the telescope right now.")
        .delayed(secs(35), "Launching a probe (${delay}s)...", "You are busy with the probe.");
        Some(action)
    }
}

#[async_trait]
impl<E: Environment> Handler for Scout<E> {
    async fn handle(&self, click: Click) -> HandlerResult {
        Ok(Some(self.sweep(click.room.as_ref())))
    }
}
