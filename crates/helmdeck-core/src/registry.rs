//! Control registry: flat lookup from control id to action.
//!
//! Derived by walking the action tree (nested choices included) and grown by
//! dynamic registration of follow-up controls produced mid-resolution. The
//! registry is always a superset of the ids reachable from the current tree.
//! Entries are never pruned; dynamic entries are small and bounded by game
//! content.

use std::{collections::HashMap, sync::Arc};

use crate::{action::Action, error::ConfigError, ids::ControlId, tree::ActionTree};

/// Flat map from control id to action.
#[derive(Debug, Clone, Default)]
pub struct ControlRegistry {
    actions: HashMap<ControlId, Arc<Action>>,
}

/// Validate `rows`, then build the tree and its registry.
///
/// `dynamic` entries are registered after the tree; they may overwrite tree
/// entries with the same id.
pub fn build_registry(
    rows: Vec<Vec<Action>>,
    dynamic: Vec<Action>,
) -> Result<(ActionTree, ControlRegistry), ConfigError> {
    let tree = ActionTree::new(rows)?;
    let mut registry = ControlRegistry::from_tree(&tree);
    registry.register_all(dynamic);
    Ok((tree, registry))
}

impl ControlRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every action reachable from `tree`.
    pub fn from_tree(tree: &ActionTree) -> Self {
        let mut registry = Self::new();
        for action in tree.rows().iter().flatten() {
            registry.register(action.clone());
        }
        registry
    }

    /// Register `action` and, recursively, its choice children.
    ///
    /// Existing entries with the same id are overwritten; unrelated entries
    /// are kept. Returns the number of ids registered.
    pub fn register(&mut self, action: Action) -> usize {
        let mut count = 0;
        action.walk(&mut |a| {
            self.actions.insert(a.id().clone(), Arc::new(a.clone()));
            count += 1;
        });
        count
    }

    /// Register several actions. Returns the number of ids registered.
    pub fn register_all(&mut self, actions: impl IntoIterator<Item = Action>) -> usize {
        actions.into_iter().map(|action| self.register(action)).sum()
    }

    /// Action bound to `id`.
    pub fn get(&self, id: &str) -> Option<Arc<Action>> {
        self.actions.get(id).cloned()
    }

    /// Whether `id` is bound.
    pub fn contains(&self, id: &str) -> bool {
        self.actions.contains_key(id)
    }

    /// Number of bound ids.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether no id is bound.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// All bound ids. Order is not guaranteed.
    pub fn ids(&self) -> impl Iterator<Item = &ControlId> + '_ {
        self.actions.keys()
    }
}
