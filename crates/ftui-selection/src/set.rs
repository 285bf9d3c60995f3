#![forbid(unsafe_code)]

//! Ordered selection storage with optional identity hashing.
//!
//! [`SelectionSet`] keeps [`ItemRef`]s in insertion order; the first live
//! entry is the primary selection. The ordered list is authoritative. The
//! optional hash index (`item -> ItemRef`) only speeds up lookups and never
//! changes what a lookup returns.
//!
//! # Invariants
//!
//! 1. `resolved_count() + unresolved_count() == len()`
//! 2. No two live entries key-match (the set is a set, not a multiset)
//! 3. When hashing is enabled the index holds exactly the live entries
//! 4. Outside a deferred-removal scope there are no tombstones
//!
//! # Cost
//!
//! With hashing enabled, `contains`, `find` and `find_item` are O(1) and a
//! removal that misses returns without scanning. A removal that hits still
//! locates the entry by a linear scan, so removal is O(n) in either mode.
//!
//! # Deferred removal
//!
//! Removing from the middle of a `Vec` is O(n). A commit that removes many
//! entries opens a [`DeferredRemoval`] scope: removals inside it only
//! tombstone entries, and the backing list is compacted once when the
//! outermost scope drops.
//!
//! ```
//! use ftui_selection::{ItemRef, SelectionSet};
//!
//! let mut set = SelectionSet::new();
//! for i in 0..5 {
//!     set.add(ItemRef::new(i));
//! }
//! {
//!     let mut scope = set.with_deferred_removal();
//!     scope.remove(&ItemRef::new(1));
//!     scope.remove(&ItemRef::new(3));
//!     assert_eq!(scope.len(), 3);
//! }
//! assert_eq!(set.items().copied().collect::<Vec<_>>(), vec![0, 2, 4]);
//! ```

use std::hash::Hash;
use std::ops::{Deref, DerefMut};

use ahash::AHashMap;

use crate::item::{EqualityMode, ItemRef, RefState};

/// Ordered, logically unique collection of [`ItemRef`]s.
#[derive(Debug, Clone)]
pub struct SelectionSet<T> {
    entries: Vec<ItemRef<T>>,
    index: Option<AHashMap<T, ItemRef<T>>>,
    mode: EqualityMode,
    resolved: usize,
    unresolved: usize,
    defer_depth: usize,
    tombstones: usize,
}

impl<T> Default for SelectionSet<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: None,
            mode: EqualityMode::KeyOnly,
            resolved: 0,
            unresolved: 0,
            defer_depth: 0,
            tombstones: 0,
        }
    }
}

impl<T> SelectionSet<T> {
    /// Number of live entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.resolved + self.unresolved
    }

    /// Whether the set has no live entries.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live entries with a realized container.
    #[inline]
    #[must_use]
    pub fn resolved_count(&self) -> usize {
        self.resolved
    }

    /// Live entries without a container.
    #[inline]
    #[must_use]
    pub fn unresolved_count(&self) -> usize {
        self.unresolved
    }

    /// Equality mode used by [`remove`](Self::remove), [`contains`](Self::contains)
    /// and [`find`](Self::find).
    #[must_use]
    pub const fn mode(&self) -> EqualityMode {
        self.mode
    }

    /// Whether the identity hash index is enabled.
    #[must_use]
    pub fn uses_identity_hashing(&self) -> bool {
        self.index.is_some()
    }

    /// Live entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ItemRef<T>> {
        self.entries.iter().filter(|e| !e.is_removed())
    }

    /// Live items in insertion order.
    pub fn items(&self) -> impl Iterator<Item = &T> {
        self.iter().map(ItemRef::item)
    }

    /// The primary (first live) entry.
    #[must_use]
    pub fn first(&self) -> Option<&ItemRef<T>> {
        self.iter().next()
    }

    /// Whether a deferred-removal scope is currently open.
    #[must_use]
    pub fn is_deferring_removal(&self) -> bool {
        self.defer_depth > 0
    }

    /// Open a deferred-removal scope.
    ///
    /// Scopes nest; compaction happens once, when the outermost guard drops,
    /// and only if something was removed inside it.
    pub fn with_deferred_removal(&mut self) -> DeferredRemoval<'_, T> {
        self.defer_depth += 1;
        DeferredRemoval { set: self }
    }

    /// Forget cached indices and containers after the source was replaced.
    pub(crate) fn invalidate_resolution(&mut self) {
        for entry in self.entries.iter_mut().filter(|e| !e.is_removed()) {
            entry.set_container(None);
            entry.set_index(None);
        }
        if let Some(index) = self.index.as_mut() {
            for entry in index.values_mut() {
                entry.set_container(None);
                entry.set_index(None);
            }
        }
        self.unresolved += self.resolved;
        self.resolved = 0;
    }

    fn compact(&mut self) {
        self.entries.retain(|e| !e.is_removed());
        self.tombstones = 0;
    }

    fn count_in(&mut self, state: RefState) {
        match state {
            RefState::Resolved => self.resolved += 1,
            RefState::Unresolved => self.unresolved += 1,
            RefState::Removed => {}
        }
    }

    fn count_out(&mut self, state: RefState) {
        match state {
            RefState::Resolved => self.resolved -= 1,
            RefState::Unresolved => self.unresolved -= 1,
            RefState::Removed => {}
        }
    }
}

impl<T: Eq + Hash + Clone> SelectionSet<T> {
    /// Create an empty key-only set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty set using the given equality mode.
    #[must_use]
    pub fn with_mode(mode: EqualityMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Append an entry.
    ///
    /// The caller guarantees no live entry key-matches `entry`; a duplicate
    /// add breaks the uniqueness invariant.
    pub fn add(&mut self, entry: ItemRef<T>) {
        debug_assert!(
            !entry.is_removed(),
            "tombstoned refs cannot be added to a selection set"
        );
        debug_assert!(
            self.find_with(&entry, EqualityMode::KeyOnly).is_none(),
            "duplicate add violates selection set uniqueness"
        );
        self.count_in(entry.state());
        if let Some(index) = self.index.as_mut() {
            index.insert(entry.item().clone(), entry.clone());
        }
        self.entries.push(entry);
    }

    /// Remove the entry matching `key` under the set's mode.
    pub fn remove(&mut self, key: &ItemRef<T>) -> bool {
        self.take_with(key, self.mode).is_some()
    }

    /// Remove and return the entry matching `key` under `mode`.
    ///
    /// Inside a deferred-removal scope the entry is tombstoned in place and
    /// a live copy is returned. A hit is located by a linear scan.
    pub fn take_with(&mut self, key: &ItemRef<T>, mode: EqualityMode) -> Option<ItemRef<T>> {
        if let Some(index) = self.index.as_ref()
            && !index.get(key.item()).is_some_and(|e| e.matches(key, mode))
        {
            return None;
        }
        let pos = self.position_with(key, mode)?;
        let state = self.entries[pos].state();
        self.count_out(state);
        if let Some(index) = self.index.as_mut() {
            index.remove(key.item());
        }
        let removed = if self.defer_depth > 0 {
            let live = self.entries[pos].clone();
            self.entries[pos].mark_removed();
            self.tombstones += 1;
            live
        } else {
            self.entries.remove(pos)
        };
        Some(removed)
    }

    /// Whether an entry matches `key` under the set's mode.
    #[must_use]
    pub fn contains(&self, key: &ItemRef<T>) -> bool {
        self.find(key).is_some()
    }

    /// Whether any live entry holds `item` (key-only).
    #[must_use]
    pub fn contains_item(&self, item: &T) -> bool {
        self.find_item(item).is_some()
    }

    /// Look up the entry matching `key` under the set's mode.
    #[must_use]
    pub fn find(&self, key: &ItemRef<T>) -> Option<&ItemRef<T>> {
        self.find_with(key, self.mode)
    }

    /// Look up the entry matching `key` under an explicit mode.
    #[must_use]
    pub fn find_with(&self, key: &ItemRef<T>, mode: EqualityMode) -> Option<&ItemRef<T>> {
        match self.index.as_ref() {
            Some(index) => index.get(key.item()).filter(|e| e.matches(key, mode)),
            None => self.iter().find(|e| e.matches(key, mode)),
        }
    }

    /// Look up the live entry holding `item`, ignoring containers.
    #[must_use]
    pub fn find_item(&self, item: &T) -> Option<&ItemRef<T>> {
        match self.index.as_ref() {
            Some(index) => index.get(item),
            None => self.iter().find(|e| e.item() == item),
        }
    }

    /// Enable or disable the identity hash index.
    ///
    /// Enabling builds the index from the current contents in one pass.
    pub fn set_identity_hashing(&mut self, enabled: bool) {
        if enabled == self.uses_identity_hashing() {
            return;
        }
        self.index = enabled.then(|| {
            self.entries
                .iter()
                .filter(|e| !e.is_removed())
                .map(|e| (e.item().clone(), e.clone()))
                .collect()
        });
    }

    /// Remove every entry, returning the live ones in order.
    pub fn clear(&mut self) -> Vec<ItemRef<T>> {
        let drained: Vec<_> = if self.defer_depth > 0 {
            let live = self.iter().cloned().collect();
            for entry in &mut self.entries {
                if !entry.is_removed() {
                    entry.mark_removed();
                    self.tombstones += 1;
                }
            }
            live
        } else {
            self.tombstones = 0;
            self.entries.drain(..).filter(|e| !e.is_removed()).collect()
        };
        if let Some(index) = self.index.as_mut() {
            index.clear();
        }
        self.resolved = 0;
        self.unresolved = 0;
        drained
    }

    fn position_with(&self, key: &ItemRef<T>, mode: EqualityMode) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| !e.is_removed() && e.matches(key, mode))
    }
}

/// RAII scope that batches compaction of removed entries.
///
/// Dereferences to the underlying [`SelectionSet`]. Dropping the outermost
/// guard compacts the set once if anything was removed while it was open,
/// on every exit path including early returns.
#[derive(Debug)]
pub struct DeferredRemoval<'a, T> {
    set: &'a mut SelectionSet<T>,
}

impl<T> Deref for DeferredRemoval<'_, T> {
    type Target = SelectionSet<T>;

    fn deref(&self) -> &Self::Target {
        self.set
    }
}

impl<T> DerefMut for DeferredRemoval<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.set
    }
}

impl<T> Drop for DeferredRemoval<'_, T> {
    fn drop(&mut self) {
        self.set.defer_depth -= 1;
        if self.set.defer_depth == 0 && self.set.tombstones > 0 {
            self.set.compact();
        }
    }
}
