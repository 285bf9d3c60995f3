#![forbid(unsafe_code)]

//! Host collaborator interface.
//!
//! The engine talks to the outside world only through [`SelectionHost`]:
//! queries against the backing item collection, the per-item selected flag,
//! the single per-commit change notification, and the optional current-item
//! cursor. Everything else (containers, visual state, input) stays on the
//! host side.
//!
//! [`VecHost`] is a complete in-memory host. It records every callback so
//! widget code and tests can inspect what the engine did.

use std::collections::BTreeMap;
use std::hash::Hash;

use ahash::AHashSet;

use crate::item::{ContainerId, ItemRef};

/// Collaborator queried and notified by a [`Selector`](crate::Selector).
///
/// Only [`source_len`](Self::source_len) and
/// [`source_item`](Self::source_item) are required. Callbacks are invoked
/// synchronously from inside a commit and must not assume the selection is
/// in a stable state other than what they are handed.
pub trait SelectionHost<T> {
    /// Number of items in the backing collection.
    fn source_len(&self) -> usize;

    /// Item at `index` in the backing collection.
    fn source_item(&self, index: usize) -> Option<&T>;

    /// Whether `item` may be selected at all (e.g. separators may not).
    fn is_selectable(&self, _item: &T) -> bool {
        true
    }

    /// Position of `item` in the backing collection.
    fn source_index_of(&self, item: &T) -> Option<usize>
    where
        T: PartialEq,
    {
        (0..self.source_len()).find(|&i| self.source_item(i) == Some(item))
    }

    /// Whether the backing collection currently holds `item`.
    fn source_contains(&self, item: &T) -> bool
    where
        T: PartialEq,
    {
        self.source_index_of(item).is_some()
    }

    /// Realized container for the item at `index`, if one exists.
    fn container_at(&self, _index: usize) -> Option<ContainerId> {
        None
    }

    /// Push the selected flag onto the item's representation.
    ///
    /// Called once per add/remove. Must tolerate the value it already holds.
    fn set_selected_flag(&mut self, _item: &ItemRef<T>, _selected: bool) {}

    /// One notification per commit with the exact delta, in insertion order.
    fn on_selection_changed(&mut self, _removed: &[ItemRef<T>], _added: &[ItemRef<T>]) {}

    /// The primary selection changed; recompute derived properties
    /// (selected item, selected index, selected value).
    fn primary_changed(&mut self, _primary: Option<&ItemRef<T>>) {}

    /// Current position of the host's current-item cursor.
    fn current_item(&self) -> Option<ItemRef<T>> {
        None
    }

    /// Move the host's current-item cursor.
    fn set_current_item(&mut self, _item: Option<&ItemRef<T>>) {}
}

/// One recorded change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedChange<T> {
    /// Items reported as unselected.
    pub removed: Vec<T>,
    /// Items reported as selected.
    pub added: Vec<T>,
}

/// In-memory host backed by a `Vec`.
///
/// Containers are realized explicitly with [`realize`](Self::realize) to
/// model virtualization.
#[derive(Debug, Clone)]
pub struct VecHost<T> {
    items: Vec<T>,
    containers: BTreeMap<usize, ContainerId>,
    unselectable: AHashSet<T>,
    flags: Vec<(T, bool)>,
    changes: Vec<RecordedChange<T>>,
    primary: Option<T>,
    cursor: Option<T>,
    cursor_moves: usize,
}

impl<T: Eq + Hash + Clone> VecHost<T> {
    /// Create a host over `items` with no realized containers.
    #[must_use]
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            containers: BTreeMap::new(),
            unselectable: AHashSet::new(),
            flags: Vec::new(),
            changes: Vec::new(),
            primary: None,
            cursor: None,
            cursor_moves: 0,
        }
    }

    /// Backing items.
    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Append an item to the source.
    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    /// Insert an item at `index`, shifting realized containers along.
    pub fn insert(&mut self, index: usize, item: T) {
        self.items.insert(index, item);
        self.containers = std::mem::take(&mut self.containers)
            .into_iter()
            .map(|(i, c)| if i >= index { (i + 1, c) } else { (i, c) })
            .collect();
    }

    /// Remove the first occurrence of `item` from the source.
    pub fn remove(&mut self, item: &T) -> Option<T> {
        let index = self.items.iter().position(|i| i == item)?;
        self.containers.remove(&index);
        self.containers = std::mem::take(&mut self.containers)
            .into_iter()
            .map(|(i, c)| if i > index { (i - 1, c) } else { (i, c) })
            .collect();
        Some(self.items.remove(index))
    }

    /// Replace the whole source, dropping realized containers.
    pub fn reset(&mut self, items: Vec<T>) {
        self.items = items;
        self.containers.clear();
    }

    /// Realize a container for the item at `index`.
    pub fn realize(&mut self, index: usize, container: ContainerId) {
        self.containers.insert(index, container);
    }

    /// Mark an item as not selectable.
    pub fn set_unselectable(&mut self, item: T) {
        self.unselectable.insert(item);
    }

    /// Move the cursor without notifying any selector.
    pub fn move_cursor(&mut self, item: Option<T>) {
        self.cursor = item;
    }

    /// Cursor position.
    #[must_use]
    pub fn cursor(&self) -> Option<&T> {
        self.cursor.as_ref()
    }

    /// How many times the engine moved the cursor.
    #[must_use]
    pub fn cursor_moves(&self) -> usize {
        self.cursor_moves
    }

    /// Every selected-flag push, in call order.
    #[must_use]
    pub fn flag_log(&self) -> &[(T, bool)] {
        &self.flags
    }

    /// Last flag value pushed for `item`.
    #[must_use]
    pub fn flag(&self, item: &T) -> Option<bool> {
        self.flags
            .iter()
            .rev()
            .find(|(i, _)| i == item)
            .map(|&(_, selected)| selected)
    }

    /// Every change notification received, in order.
    #[must_use]
    pub fn changes(&self) -> &[RecordedChange<T>] {
        &self.changes
    }

    /// Primary item as last reported through `primary_changed`.
    #[must_use]
    pub fn primary(&self) -> Option<&T> {
        self.primary.as_ref()
    }

    /// Forget recorded callbacks.
    pub fn clear_log(&mut self) {
        self.flags.clear();
        self.changes.clear();
        self.cursor_moves = 0;
    }
}

impl<T: Eq + Hash + Clone> SelectionHost<T> for VecHost<T> {
    fn source_len(&self) -> usize {
        self.items.len()
    }

    fn source_item(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    fn is_selectable(&self, item: &T) -> bool {
        !self.unselectable.contains(item)
    }

    fn source_index_of(&self, item: &T) -> Option<usize> {
        self.items.iter().position(|i| i == item)
    }

    fn container_at(&self, index: usize) -> Option<ContainerId> {
        self.containers.get(&index).copied()
    }

    fn set_selected_flag(&mut self, item: &ItemRef<T>, selected: bool) {
        self.flags.push((item.item().clone(), selected));
    }

    fn on_selection_changed(&mut self, removed: &[ItemRef<T>], added: &[ItemRef<T>]) {
        self.changes.push(RecordedChange {
            removed: removed.iter().map(|r| r.item().clone()).collect(),
            added: added.iter().map(|r| r.item().clone()).collect(),
        });
    }

    fn primary_changed(&mut self, primary: Option<&ItemRef<T>>) {
        self.primary = primary.map(|r| r.item().clone());
    }

    fn current_item(&self) -> Option<ItemRef<T>> {
        let item = self.cursor.clone()?;
        let index = self.source_index_of(&item);
        let mut r = ItemRef::new(item);
        if let Some(index) = index {
            r = r.with_index(index);
            if let Some(container) = self.container_at(index) {
                r = r.with_container(container);
            }
        }
        Some(r)
    }

    fn set_current_item(&mut self, item: Option<&ItemRef<T>>) {
        self.cursor = item.map(|r| r.item().clone());
        self.cursor_moves += 1;
    }
}
