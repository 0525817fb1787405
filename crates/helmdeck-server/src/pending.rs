//! Pending-interaction table.
//!
//! At most one entry per actor. Each insert is stamped with a sequence
//! number. A wait ends as cancelled only when its own entry was taken out
//! through [`PendingTable::remove`]; an entry overwritten by a newer wait of
//! the same actor still completes when its timer fires.

use std::collections::{HashMap, HashSet};

use helmdeck_core::{ActorId, PendingInteraction};

#[derive(Debug)]
struct Entry {
    seq: u64,
    interaction: PendingInteraction,
    /// A timer will call `complete` for this entry
    timed: bool,
}

/// Per-actor record of in-flight delayed actions and holds.
#[derive(Debug, Default)]
pub struct PendingTable {
    entries: HashMap<ActorId, Entry>,
    /// Timed entries removed before their timer fired
    cancelled: HashSet<u64>,
    next_seq: u64,
}

impl PendingTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a wait whose timer will call [`complete`](Self::complete)
    /// with the returned sequence number.
    pub fn insert_wait(&mut self, actor: ActorId, interaction: PendingInteraction) -> u64 {
        self.insert(actor, interaction, true)
    }

    /// Install a hold. No timer completes it; it ends by removal.
    pub fn insert_hold(&mut self, actor: ActorId, interaction: PendingInteraction) {
        self.insert(actor, interaction, false);
    }

    fn insert(&mut self, actor: ActorId, interaction: PendingInteraction, timed: bool) -> u64 {
        self.next_seq += 1;
        let seq = self.next_seq;

        let entry = Entry { seq, interaction, timed };
        if let Some(previous) = self.entries.insert(actor.clone(), entry) {
            tracing::debug!(
                %actor,
                replaced = %previous.interaction.action.id(),
                "pending entry superseded"
            );
        }
        seq
    }

    /// Entry for `actor`.
    pub fn get(&self, actor: &ActorId) -> Option<&PendingInteraction> {
        self.entries.get(actor).map(|entry| &entry.interaction)
    }

    /// Take out `actor`'s entry. A timed entry's wait will end cancelled.
    pub fn remove(&mut self, actor: &ActorId) -> Option<PendingInteraction> {
        let entry = self.entries.remove(actor)?;
        if entry.timed {
            self.cancelled.insert(entry.seq);
        }
        Some(entry.interaction)
    }

    /// Called by the timer of wait `seq`. Returns `false` if the wait was
    /// cancelled.
    ///
    /// Drops `actor`'s entry if it is still wait `seq`; a newer entry that
    /// superseded it is left in place.
    pub fn complete(&mut self, actor: &ActorId, seq: u64) -> bool {
        if self.cancelled.remove(&seq) {
            return false;
        }
        if self.entries.get(actor).is_some_and(|entry| entry.seq == seq) {
            self.entries.remove(actor);
        }
        true
    }

    /// Whether `actor` has an entry.
    pub fn contains(&self, actor: &ActorId) -> bool {
        self.entries.contains_key(actor)
    }

    /// Number of actors with an entry.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no actor has an entry.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
