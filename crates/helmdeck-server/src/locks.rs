//! Lock key families.
//!
//! Every key the engine writes lives under one namespace so several
//! deployments can share a lock store:
//!
//! - busy lock: `{ns}:delay-{actor}` → id of the control occupying the actor
//! - exclusive lock: `{ns}:exclusive-{group}` → id of the holding actor
//! - game-logic keys (cooldowns, status flags): `{ns}:{key}`

use helmdeck_core::{ActorId, GroupId};

/// Builds namespaced lock-store keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockKeys {
    namespace: String,
}

impl LockKeys {
    /// Keys under `namespace`.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self { namespace: namespace.into() }
    }

    /// The namespace prefix.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Busy lock for `actor`.
    pub fn busy(&self, actor: &ActorId) -> String {
        format!("{}:delay-{actor}", self.namespace)
    }

    /// Exclusive lock for `group`.
    pub fn exclusive(&self, group: &GroupId) -> String {
        format!("{}:exclusive-{group}", self.namespace)
    }

    /// Free-form game-logic key.
    pub fn scoped(&self, key: &str) -> String {
        format!("{}:{key}", self.namespace)
    }
}
