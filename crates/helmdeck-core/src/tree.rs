//! The action tree: the rows of controls a room renders.
//!
//! Built once at room construction and thereafter mutated cell by cell,
//! never rebuilt wholesale. The 5×5 limit is inherited from the platform's
//! component grid.

use std::collections::HashSet;

use crate::{action::Action, content::Control, error::ConfigError, ids::ControlId};

/// Maximum number of rows in a tree.
pub const MAX_ROWS: usize = 5;

/// Maximum number of controls in a row, and of children in a choice.
pub const MAX_CONTROLS_PER_ROW: usize = 5;

/// Validated rows of actions.
///
/// # Invariants
///
/// - At most [`MAX_ROWS`] rows, each with at most [`MAX_CONTROLS_PER_ROW`]
///   actions
/// - Every choice has at most [`MAX_CONTROLS_PER_ROW`] children
/// - Control ids are unique across the whole tree, nested choices included
#[derive(Debug, Clone, Default)]
pub struct ActionTree {
    rows: Vec<Vec<Action>>,
}

impl ActionTree {
    /// Validate `rows` and build a tree.
    pub fn new(rows: Vec<Vec<Action>>) -> Result<Self, ConfigError> {
        if rows.len() > MAX_ROWS {
            return Err(ConfigError::TooManyRows { rows: rows.len(), max: MAX_ROWS });
        }

        let mut seen = HashSet::new();
        for (index, row) in rows.iter().enumerate() {
            check_width(index, row.len())?;
            for action in row {
                check_action(index, action, &mut seen)?;
            }
        }

        Ok(Self { rows })
    }

    /// Empty tree (a room with no controls).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Rows of actions, top to bottom.
    pub fn rows(&self) -> &[Vec<Action>] {
        &self.rows
    }

    /// Action at `(row, col)`.
    pub fn cell(&self, row: usize, col: usize) -> Option<&Action> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Every action in the tree, nested choices included (pre-order, row by
    /// row).
    pub fn actions(&self) -> Vec<&Action> {
        let mut out = Vec::new();
        for action in self.rows.iter().flatten() {
            action.walk(&mut |a| out.push(a));
        }
        out
    }

    /// Swap the action at `(row, col)`, returning the previous one.
    ///
    /// The replacement is validated against the rest of the tree: its ids
    /// (recursively) must not collide with any other cell. On error the tree
    /// is unchanged.
    pub fn replace(
        &mut self,
        row: usize,
        col: usize,
        action: Action,
    ) -> Result<Action, ConfigError> {
        if self.cell(row, col).is_none() {
            return Err(ConfigError::CellOutOfBounds { row, col });
        }

        let mut seen = HashSet::new();
        for (r, cells) in self.rows.iter().enumerate() {
            for (c, other) in cells.iter().enumerate() {
                if (r, c) != (row, col) {
                    other.walk(&mut |a| {
                        seen.insert(a.id().clone());
                    });
                }
            }
        }
        check_action(row, &action, &mut seen)?;

        let slot = self
            .rows
            .get_mut(row)
            .and_then(|r| r.get_mut(col))
            .ok_or(ConfigError::CellOutOfBounds { row, col })?;
        Ok(std::mem::replace(slot, action))
    }

    /// The grid of controls the surface should display.
    pub fn controls(&self) -> Vec<Vec<Control>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(|action| action.control.clone()).collect())
            .collect()
    }
}

fn check_width(row: usize, len: usize) -> Result<(), ConfigError> {
    if len > MAX_CONTROLS_PER_ROW {
        return Err(ConfigError::TooManyControlsInRow { row, len, max: MAX_CONTROLS_PER_ROW });
    }
    Ok(())
}

/// Check `action` and its nested children, recording ids in `seen`.
fn check_action(
    row: usize,
    action: &Action,
    seen: &mut HashSet<ControlId>,
) -> Result<(), ConfigError> {
    if !seen.insert(action.id().clone()) {
        return Err(ConfigError::DuplicateControl(action.id().clone()));
    }

    let children = action.children();
    check_width(row, children.len())?;
    for child in children {
        check_action(row, child, seen)?;
    }

    Ok(())
}
