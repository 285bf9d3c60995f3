#![forbid(unsafe_code)]

//! Persistable selection state.

use crate::policy::SelectionMode;

/// Selection state that should survive sessions.
///
/// Items are stored by value, so a snapshot can be restored before the
/// backing data has loaded; anything not yet in the source becomes a
/// deferred request.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "state-persistence",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct SelectionSnapshot<T> {
    /// Selection mode at capture time.
    pub mode: SelectionMode,
    /// Selected items in insertion order.
    pub selected: Vec<T>,
    /// Items requested but not yet present in the source.
    pub deferred: Vec<T>,
}

impl<T> Default for SelectionSnapshot<T> {
    fn default() -> Self {
        Self {
            mode: SelectionMode::default(),
            selected: Vec::new(),
            deferred: Vec::new(),
        }
    }
}

impl<T> SelectionSnapshot<T> {
    /// Whether the snapshot selects or requests nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty() && self.deferred.is_empty()
    }
}
