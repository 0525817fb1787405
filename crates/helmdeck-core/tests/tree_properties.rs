//! Property-based tests for action tree validation
//!
//! These tests verify the construction invariants for all tree shapes:
//! dimension limits and control-id uniqueness through nested choices.

use helmdeck_core::{
    Action, ActionTree, ConfigError, Control, ControlRegistry, ControlStyle, MAX_CONTROLS_PER_ROW,
    MAX_ROWS, build_registry,
};
use proptest::prelude::*;

fn noop(id: String) -> Action {
    Action::callback_fn(Control::new(id.clone(), id, ControlStyle::Primary), |_click| async {
        Ok(None)
    })
}

/// Rows of uniquely-named actions with the given widths.
fn rows_with_widths(widths: &[usize]) -> Vec<Vec<Action>> {
    widths
        .iter()
        .enumerate()
        .map(|(r, &w)| (0..w).map(|c| noop(format!("r{r}c{c}"))).collect())
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: any tree within 5x5 with unique ids builds
    #[test]
    fn prop_within_limits_builds(
        widths in prop::collection::vec(0usize..=MAX_CONTROLS_PER_ROW, 0..=MAX_ROWS)
    ) {
        let total: usize = widths.iter().sum();
        let tree = ActionTree::new(rows_with_widths(&widths))?;

        prop_assert_eq!(tree.rows().len(), widths.len());
        prop_assert_eq!(ControlRegistry::from_tree(&tree).len(), total);
    }

    /// Property: more than 5 rows always fails with TooManyRows
    #[test]
    fn prop_too_many_rows_fails(
        widths in prop::collection::vec(1usize..=MAX_CONTROLS_PER_ROW, (MAX_ROWS + 1)..12)
    ) {
        let result = ActionTree::new(rows_with_widths(&widths));
        let is_too_many_rows = matches!(result, Err(ConfigError::TooManyRows { .. }));
        prop_assert!(is_too_many_rows);
    }

    /// Property: any row wider than 5 fails, naming that row
    #[test]
    fn prop_wide_row_fails(
        mut widths in prop::collection::vec(0usize..=MAX_CONTROLS_PER_ROW, 1..=MAX_ROWS),
        wide in (MAX_CONTROLS_PER_ROW + 1)..10usize,
        at in any::<prop::sample::Index>(),
    ) {
        let row = at.index(widths.len());
        widths[row] = wide;

        let first_wide = widths.iter().position(|&w| w > MAX_CONTROLS_PER_ROW);
        let result = ActionTree::new(rows_with_widths(&widths));
        let expected = Err(ConfigError::TooManyControlsInRow {
            row: first_wide.unwrap_or(row),
            len: wide,
            max: MAX_CONTROLS_PER_ROW,
        });
        prop_assert_eq!(result.map(|_| ()), expected);
    }

    /// Property: a duplicated id anywhere (top level or nested under
    /// different choices) fails construction
    #[test]
    fn prop_duplicate_anywhere_fails(
        first_row in 0usize..MAX_ROWS,
        second_row in 0usize..MAX_ROWS,
        nest_first in any::<bool>(),
        nest_second in any::<bool>(),
    ) {
        let mut rows: Vec<Vec<Action>> =
            (0..MAX_ROWS).map(|r| vec![noop(format!("filler-{r}"))]).collect();

        let place = |nested: bool, owner: String| {
            if nested {
                Action::choice(
                    Control::new(owner, "Choose", ControlStyle::Secondary),
                    "Pick one",
                    vec![noop("dup".to_string())],
                )
            } else {
                noop("dup".to_string())
            }
        };

        rows[first_row].push(place(nest_first, "choice-a".to_string()));
        rows[second_row].push(place(nest_second, "choice-b".to_string()));

        let result = build_registry(rows, Vec::new());
        let is_duplicate = matches!(
            result,
            Err(ConfigError::DuplicateControl(ref id)) if id.as_str() == "dup"
        );
        prop_assert!(is_duplicate);
    }
}
