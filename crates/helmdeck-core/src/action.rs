//! The action data model.
//!
//! An [`Action`] is the full behavioural descriptor of one control. It is a
//! product of three independent axes, each a closed sum type:
//!
//! - [`Timing`]: resolve immediately, or after a delay during which the actor
//!   is busy
//! - [`Exclusivity`]: any number of actors, or one actor per resource group
//! - [`Resolution`]: run a game-logic handler, or present a follow-up choice
//!
//! Matching is exhaustive on every axis, so an action can never satisfy an
//! axis by accident.

use std::{fmt, future::Future, num::NonZeroU32, sync::Arc, time::Duration};

use crate::{
    Click,
    content::{Content, Control},
    controls::{FnHandler, Handler, HandlerResult},
    ids::{ControlId, GroupId},
};

/// Wait parameters of a delayed action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delay {
    /// Length of the wait. Also the TTL of the locks taken for it.
    pub seconds: NonZeroU32,
    /// Ephemeral reply sent when the wait begins. `${delay}` is replaced
    /// with `seconds`.
    pub wait_message: Content,
    /// Reply to any other click by the same actor during the wait.
    pub deny_message: Content,
}

impl Delay {
    /// The wait as a `Duration`.
    pub fn duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.seconds.get()))
    }
}

/// When an action resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Timing {
    /// Resolve as soon as the checks pass.
    Instant,
    /// Occupy the actor, wait, then resolve unless cancelled.
    Delayed(Delay),
}

impl Timing {
    /// Message shown to the actor if they click something else while this
    /// action is pending. `None` for instant actions.
    pub fn deny_message(&self) -> Option<&Content> {
        match self {
            Self::Instant => None,
            Self::Delayed(delay) => Some(&delay.deny_message),
        }
    }
}

/// Who may use an action concurrently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exclusivity {
    /// Any number of actors.
    Shared,
    /// One actor per group at a time.
    Exclusive {
        /// Resource group
        group: GroupId,
        /// Reply to other actors while the group is held. `${user}` is
        /// replaced with the holder's mention.
        deny_message: Content,
    },
}

/// What happens once an action resolves.
#[derive(Clone)]
pub enum Resolution {
    /// Run a game-logic handler.
    Callback(Arc<dyn Handler>),
    /// Reply with a prompt and the children as the next set of controls.
    ///
    /// Children become clickable when the choice resolves; they are never
    /// part of the persistent tree.
    Choice {
        /// Prompt shown above the children
        prompt: Content,
        /// Follow-up actions, rendered as one row
        children: Vec<Action>,
    },
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Callback(_) => f.write_str("Callback(..)"),
            Self::Choice { prompt, children } => f
                .debug_struct("Choice")
                .field("prompt", prompt)
                .field("children", children)
                .finish(),
        }
    }
}

/// Behavioural descriptor of one control.
#[derive(Debug, Clone)]
pub struct Action {
    /// The rendered control; its id is the action's identity
    pub control: Control,
    /// Instant or delayed
    pub timing: Timing,
    /// Shared or exclusive
    pub exclusivity: Exclusivity,
    /// Callback or choice
    pub resolution: Resolution,
}

impl Action {
    /// Instant, shared action resolved by `handler`.
    pub fn callback(control: Control, handler: Arc<dyn Handler>) -> Self {
        Self {
            control,
            timing: Timing::Instant,
            exclusivity: Exclusivity::Shared,
            resolution: Resolution::Callback(handler),
        }
    }

    /// Instant, shared action resolved by an async closure.
    pub fn callback_fn<F, Fut>(control: Control, handler: F) -> Self
    where
        F: Fn(Click) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self::callback(control, Arc::new(FnHandler::new(handler)))
    }

    /// Instant, shared action that presents `children` under `prompt`.
    pub fn choice(control: Control, prompt: impl Into<Content>, children: Vec<Action>) -> Self {
        Self {
            control,
            timing: Timing::Instant,
            exclusivity: Exclusivity::Shared,
            resolution: Resolution::Choice { prompt: prompt.into(), children },
        }
    }

    /// Make this action delayed.
    #[must_use]
    pub fn delayed(
        mut self,
        seconds: NonZeroU32,
        wait_message: impl Into<Content>,
        deny_message: impl Into<Content>,
    ) -> Self {
        self.timing = Timing::Delayed(Delay {
            seconds,
            wait_message: wait_message.into(),
            deny_message: deny_message.into(),
        });
        self
    }

    /// Make this action exclusive within `group`.
    #[must_use]
    pub fn exclusive(
        mut self,
        group: impl Into<GroupId>,
        deny_message: impl Into<Content>,
    ) -> Self {
        self.exclusivity =
            Exclusivity::Exclusive { group: group.into(), deny_message: deny_message.into() };
        self
    }

    /// This action's control id.
    pub fn id(&self) -> &ControlId {
        &self.control.id
    }

    /// The delay, if this action is delayed.
    pub fn delay(&self) -> Option<&Delay> {
        match &self.timing {
            Timing::Instant => None,
            Timing::Delayed(delay) => Some(delay),
        }
    }

    /// Children of a choice; empty for callbacks.
    pub fn children(&self) -> &[Action] {
        match &self.resolution {
            Resolution::Callback(_) => &[],
            Resolution::Choice { children, .. } => children,
        }
    }

    /// Visit this action and, recursively, every nested choice child
    /// (pre-order).
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Action)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    /// Every control id reachable from this action, itself included.
    pub fn control_ids(&self) -> Vec<&ControlId> {
        let mut ids = Vec::new();
        self.walk(&mut |action| ids.push(action.id()));
        ids
    }
}
