//! Recording surface and event handle.
//!
//! Both keep every call in order so tests can assert on exactly what an
//! actor (or the room) was shown.

#![allow(clippy::disallowed_types, reason = "Recording call logs")]

use std::{
    collections::HashSet,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use helmdeck_core::{ActorId, EventHandle, MessageId, Surface, SurfaceError, SurfaceMessage};

/// One call made against a [`RecordingSurface`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceCall {
    /// A new message was posted
    Send {
        /// Id assigned to it
        message_id: MessageId,
        /// What was posted
        message: SurfaceMessage,
    },
    /// An existing message was replaced
    Edit {
        /// Message edited
        message_id: MessageId,
        /// New content
        message: SurfaceMessage,
    },
}

impl SurfaceCall {
    /// The message carried by this call.
    pub fn message(&self) -> &SurfaceMessage {
        match self {
            Self::Send { message, .. } | Self::Edit { message, .. } => message,
        }
    }
}

/// In-memory [`Surface`] that records sends and edits.
///
/// Editing a message the surface never posted (and was not told about via
/// [`RecordingSurface::with_existing`]) fails with
/// [`SurfaceError::MessageNotFound`].
#[derive(Default)]
pub struct RecordingSurface {
    calls: Mutex<Vec<SurfaceCall>>,
    known: Mutex<HashSet<MessageId>>,
    next_id: AtomicU64,
}

impl RecordingSurface {
    /// Empty surface.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Surface on which `message_id` already exists.
    pub fn with_existing(message_id: impl Into<MessageId>) -> Arc<Self> {
        let surface = Self::default();
        surface.known.lock().unwrap_or_else(PoisonError::into_inner).insert(message_id.into());
        Arc::new(surface)
    }

    /// Every call so far, oldest first.
    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// The messages of every call so far, oldest first.
    pub fn messages(&self) -> Vec<SurfaceMessage> {
        self.calls().iter().map(|call| call.message().clone()).collect()
    }

    /// The most recent send or edit.
    pub fn last(&self) -> Option<SurfaceMessage> {
        let calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
        calls.last().map(|c| c.message().clone())
    }

    /// Number of edits so far.
    pub fn edit_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|call| matches!(call, SurfaceCall::Edit { .. }))
            .count()
    }

    fn record(&self, call: SurfaceCall) {
        tracing::trace!(?call, "surface call");
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(call);
    }
}

#[async_trait]
impl Surface for RecordingSurface {
    async fn send(&self, message: SurfaceMessage) -> Result<MessageId, SurfaceError> {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let message_id = MessageId::new(format!("msg-{n}"));
        self.known.lock().unwrap_or_else(PoisonError::into_inner).insert(message_id.clone());
        self.record(SurfaceCall::Send { message_id: message_id.clone(), message });
        Ok(message_id)
    }

    async fn edit(
        &self,
        message_id: &MessageId,
        message: SurfaceMessage,
    ) -> Result<(), SurfaceError> {
        if !self.known.lock().unwrap_or_else(PoisonError::into_inner).contains(message_id) {
            return Err(SurfaceError::MessageNotFound(message_id.to_string()));
        }
        self.record(SurfaceCall::Edit { message_id: message_id.clone(), message });
        Ok(())
    }
}

/// One reply made through a [`RecordingHandle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedReply {
    /// First reply
    Reply(SurfaceMessage),
    /// Replacement of the existing reply
    Edit(SurfaceMessage),
}

impl RecordedReply {
    /// The message sent.
    pub fn message(&self) -> &SurfaceMessage {
        match self {
            Self::Reply(message) | Self::Edit(message) => message,
        }
    }
}

/// In-memory [`EventHandle`] for one simulated click.
pub struct RecordingHandle {
    actor: ActorId,
    replies: Mutex<Vec<RecordedReply>>,
    replied: AtomicBool,
}

impl RecordingHandle {
    /// Handle for a click by `actor`.
    pub fn new(actor: impl Into<ActorId>) -> Arc<Self> {
        Arc::new(Self {
            actor: actor.into(),
            replies: Mutex::new(Vec::new()),
            replied: AtomicBool::new(false),
        })
    }

    /// The actor this handle replies to.
    pub fn actor(&self) -> &ActorId {
        &self.actor
    }

    /// Every reply so far, oldest first.
    pub fn replies(&self) -> Vec<RecordedReply> {
        self.replies.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Plain text of every reply so far, oldest first.
    pub fn texts(&self) -> Vec<String> {
        self.replies().iter().map(|r| r.message().content.plain_text().to_string()).collect()
    }

    /// The most recent reply or edit.
    pub fn last(&self) -> Option<SurfaceMessage> {
        let replies = self.replies.lock().unwrap_or_else(PoisonError::into_inner);
        replies.last().map(|r| r.message().clone())
    }

    fn record(&self, reply: RecordedReply) {
        tracing::trace!(actor = %self.actor, ?reply, "event reply");
        self.replies.lock().unwrap_or_else(PoisonError::into_inner).push(reply);
    }
}

#[async_trait]
impl EventHandle for RecordingHandle {
    async fn reply(&self, message: SurfaceMessage) -> Result<(), SurfaceError> {
        self.replied.store(true, Ordering::SeqCst);
        self.record(RecordedReply::Reply(message));
        Ok(())
    }

    async fn edit_reply(&self, message: SurfaceMessage) -> Result<(), SurfaceError> {
        if !self.replied() {
            return Err(SurfaceError::InteractionExpired);
        }
        self.record(RecordedReply::Edit(message));
        Ok(())
    }

    fn replied(&self) -> bool {
        self.replied.load(Ordering::SeqCst)
    }
}
