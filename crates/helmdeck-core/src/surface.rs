//! Render/transport collaborator seam.
//!
//! The engine never talks to a chat platform directly. A [`Surface`] owns the
//! persistent room message; an [`EventHandle`] is the reply channel scoped to
//! one inbound click.

use async_trait::async_trait;

use crate::{
    content::SurfaceMessage,
    error::SurfaceError,
    ids::{ActorId, MessageId},
};

/// Persistent message rendering for a room.
#[async_trait]
pub trait Surface: Send + Sync {
    /// Post a new message and return its id.
    async fn send(&self, message: SurfaceMessage) -> Result<MessageId, SurfaceError>;

    /// Replace the content and controls of an existing message.
    async fn edit(&self, message_id: &MessageId, message: SurfaceMessage)
    -> Result<(), SurfaceError>;

    /// How an actor is referenced inside message text.
    fn mention(&self, actor: &ActorId) -> String {
        format!("<@{actor}>")
    }
}

/// Reply channel for a single click event.
///
/// Replies are ephemeral: only the clicking actor sees them.
#[async_trait]
pub trait EventHandle: Send + Sync {
    /// Send the first reply to this event.
    async fn reply(&self, message: SurfaceMessage) -> Result<(), SurfaceError>;

    /// Replace the reply already sent for this event.
    async fn edit_reply(&self, message: SurfaceMessage) -> Result<(), SurfaceError>;

    /// Whether a reply has been sent.
    fn replied(&self) -> bool;

    /// Edit the existing reply if there is one, otherwise reply.
    async fn respond(&self, message: SurfaceMessage) -> Result<(), SurfaceError> {
        if self.replied() { self.edit_reply(message).await } else { self.reply(message).await }
    }
}
