#![forbid(unsafe_code)]

//! Single vs multi selection policy.
//!
//! The policy pass runs once per commit, before any delta is applied. Under
//! a single-select mode it rewrites the pending sets so that the live set
//! holds at most one item after the commit:
//!
//! - more than one pending select: only the most recent request survives;
//! - exactly one pending select: every other live entry is marked for
//!   unselect;
//! - no pending select: among live entries not already being unselected,
//!   the primary (first) survives and the rest are marked for unselect.

use std::hash::Hash;

use crate::item::ItemRef;
use crate::set::SelectionSet;

/// How many items a selector may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "state-persistence",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum SelectionMode {
    /// At most one selected item.
    #[default]
    Single,
    /// Any number of items; each request toggles independently.
    Multiple,
    /// Any number of items; range gestures are the host's concern.
    Extended,
}

impl SelectionMode {
    /// Whether more than one item may be selected.
    #[inline]
    #[must_use]
    pub const fn allows_multiple(self) -> bool {
        !matches!(self, Self::Single)
    }
}

/// Rewrite pending sets so the post-commit live set obeys `mode`.
///
/// Returns whether anything was collapsed.
pub(crate) fn apply_policy<T: Eq + Hash + Clone>(
    mode: SelectionMode,
    live: &SelectionSet<T>,
    to_select: &mut SelectionSet<T>,
    to_unselect: &mut SelectionSet<T>,
) -> bool {
    if mode.allows_multiple() {
        return false;
    }

    let mut collapsed = false;
    if to_select.len() > 1 {
        let latest = to_select.iter().last().cloned();
        to_select.clear();
        if let Some(latest) = latest {
            to_select.add(latest);
        }
        collapsed = true;
    }

    let doomed: Vec<ItemRef<T>> = match to_select.first() {
        Some(survivor) => live
            .iter()
            .filter(|e| !e.key_eq(survivor) && !to_unselect.contains(e))
            .cloned()
            .collect(),
        None => live
            .iter()
            .filter(|e| !to_unselect.contains(e))
            .skip(1)
            .cloned()
            .collect(),
    };
    collapsed |= !doomed.is_empty();
    for entry in doomed {
        to_unselect.add(entry);
    }
    collapsed
}
