//! Engine and room configuration.

use std::collections::HashSet;

use helmdeck_core::{Action, Content, ControlId, MessageId};

/// Default lock-store namespace.
pub const DEFAULT_NAMESPACE: &str = "mm-space";

/// Default reply to a busy actor with no pending entry.
pub const DEFAULT_BUSY_MESSAGE: &str = "You are currently waiting for another action to finish.";

/// Settings shared by every room in a process.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Prefix of every lock-store key
    pub namespace: String,
    /// Deny reply for busy actors without a pending entry
    pub busy_message: Content,
    /// Controls that skip the busy check
    pub wait_exceptions: HashSet<ControlId>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            busy_message: Content::text(DEFAULT_BUSY_MESSAGE),
            wait_exceptions: HashSet::new(),
        }
    }
}

impl EngineConfig {
    /// Add `control` to the busy-check allowlist.
    #[must_use]
    pub fn with_wait_exception(mut self, control: impl Into<ControlId>) -> Self {
        self.wait_exceptions.insert(control.into());
        self
    }

    /// Whether `control` stays clickable while its actor is busy.
    pub fn is_wait_exception(&self, control: &ControlId) -> bool {
        self.wait_exceptions.contains(control)
    }
}

/// What a room renders and where.
#[derive(Debug, Clone)]
pub struct RoomOptions {
    /// Display name, used in logs
    pub name: String,
    /// Body of the room's persistent message
    pub content: Content,
    /// Existing message to take over; a new one is sent when `None`
    pub message_id: Option<MessageId>,
    /// Initial action tree
    pub rows: Vec<Vec<Action>>,
}

impl RoomOptions {
    /// Room that will post a fresh message.
    pub fn new(
        name: impl Into<String>,
        content: impl Into<Content>,
        rows: Vec<Vec<Action>>,
    ) -> Self {
        Self { name: name.into(), content: content.into(), message_id: None, rows }
    }

    /// Take over an existing message instead of posting one.
    #[must_use]
    pub fn with_message_id(mut self, message_id: impl Into<MessageId>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }
}
