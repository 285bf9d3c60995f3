#![forbid(unsafe_code)]

//! Identity-resolved references to selectable items.
//!
//! An [`ItemRef`] names a logical item and, once the host has realized a
//! representation for it, the [`ContainerId`] of that representation. The
//! engine never owns containers; a `ContainerId` is a plain handle into a
//! host-owned arena.
//!
//! # Equality
//!
//! Two comparison modes exist (see [`EqualityMode`]):
//!
//! - **Explicit**: item and container must both match.
//! - **Key-only**: the item alone decides. This is what lets an unresolved
//!   request (no container yet) match an entry that has since been realized.
//!
//! Item equality itself comes from `T: Eq + Hash`. Hosts whose payloads
//! should compare by a key wrap them in [`Keyed`].

use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Handle to a realized container in a host-owned arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(pub u64);

impl ContainerId {
    /// Create a container handle from a raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw handle value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Materialization state of an [`ItemRef`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefState {
    /// A container has been realized for the item.
    Resolved,
    /// No container yet.
    Unresolved,
    /// Tombstoned inside a deferred-removal scope; awaiting compaction.
    Removed,
}

/// How two [`ItemRef`]s are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "state-persistence",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum EqualityMode {
    /// Item and container must match.
    Explicit,
    /// Item match suffices; containers are ignored.
    #[default]
    KeyOnly,
}

/// Reference to a logical item, optionally carrying a container and index.
#[derive(Clone)]
pub struct ItemRef<T> {
    item: T,
    container: Option<ContainerId>,
    index: Option<usize>,
    removed: bool,
}

impl<T> ItemRef<T> {
    /// Create an unresolved reference with no known index.
    #[must_use]
    pub const fn new(item: T) -> Self {
        Self {
            item,
            container: None,
            index: None,
            removed: false,
        }
    }

    /// Attach a realized container.
    #[must_use]
    pub fn with_container(mut self, container: ContainerId) -> Self {
        self.container = Some(container);
        self
    }

    /// Attach a source index.
    #[must_use]
    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// The logical item.
    #[inline]
    #[must_use]
    pub fn item(&self) -> &T {
        &self.item
    }

    /// Consume the reference, returning the item.
    #[must_use]
    pub fn into_item(self) -> T {
        self.item
    }

    /// Realized container, if any.
    #[inline]
    #[must_use]
    pub fn container(&self) -> Option<ContainerId> {
        self.container
    }

    /// Cached source index. May be stale after structural source changes.
    #[inline]
    #[must_use]
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// Current materialization state.
    #[must_use]
    pub fn state(&self) -> RefState {
        if self.removed {
            RefState::Removed
        } else if self.container.is_some() {
            RefState::Resolved
        } else {
            RefState::Unresolved
        }
    }

    /// Whether a container has been realized and the entry is live.
    #[inline]
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.state() == RefState::Resolved
    }

    pub(crate) fn set_container(&mut self, container: Option<ContainerId>) {
        self.container = container;
    }

    pub(crate) fn set_index(&mut self, index: Option<usize>) {
        self.index = index;
    }

    pub(crate) fn mark_removed(&mut self) {
        self.removed = true;
    }

    pub(crate) fn is_removed(&self) -> bool {
        self.removed
    }
}

impl<T: PartialEq> ItemRef<T> {
    /// Key-only equality: compares items, ignoring containers.
    #[inline]
    #[must_use]
    pub fn key_eq(&self, other: &Self) -> bool {
        self.item == other.item
    }

    /// Explicit equality: items and containers must both match.
    #[inline]
    #[must_use]
    pub fn explicit_eq(&self, other: &Self) -> bool {
        self.item == other.item && self.container == other.container
    }

    /// Compare under the given mode.
    #[must_use]
    pub fn matches(&self, other: &Self, mode: EqualityMode) -> bool {
        match mode {
            EqualityMode::Explicit => self.explicit_eq(other),
            EqualityMode::KeyOnly => self.key_eq(other),
        }
    }
}

impl<T: PartialEq> PartialEq for ItemRef<T> {
    fn eq(&self, other: &Self) -> bool {
        self.explicit_eq(other)
    }
}

impl<T: Eq> Eq for ItemRef<T> {}

impl<T: fmt::Debug> fmt::Debug for ItemRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemRef")
            .field("item", &self.item)
            .field("container", &self.container)
            .field("index", &self.index)
            .field("state", &self.state())
            .finish()
    }
}

impl<T> From<T> for ItemRef<T> {
    fn from(item: T) -> Self {
        Self::new(item)
    }
}

/// Payload compared and hashed by key only.
///
/// Use this when items carry data that must not take part in identity,
/// e.g. selecting rows by primary key while the row contents change.
#[derive(Debug, Clone)]
pub struct Keyed<K, V> {
    /// Identity of the item.
    pub key: K,
    /// Data carried along, ignored by equality and hashing.
    pub value: V,
}

impl<K, V> Keyed<K, V> {
    /// Pair a key with its payload.
    #[must_use]
    pub const fn new(key: K, value: V) -> Self {
        Self { key, value }
    }
}

impl<K: PartialEq, V> PartialEq for Keyed<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<K: Eq, V> Eq for Keyed<K, V> {}

impl<K: Hash, V> Hash for Keyed<K, V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl<K, V> Borrow<K> for Keyed<K, V> {
    fn borrow(&self) -> &K {
        &self.key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn state_follows_container_and_tombstone() {
        let mut r = ItemRef::new("a");
        assert_eq!(r.state(), RefState::Unresolved);
        r.set_container(Some(ContainerId::new(7)));
        assert_eq!(r.state(), RefState::Resolved);
        assert!(r.is_resolved());
        r.mark_removed();
        assert_eq!(r.state(), RefState::Removed);
        assert!(!r.is_resolved());
    }

    #[test]
    fn key_only_ignores_container() {
        let unresolved = ItemRef::new(5);
        let resolved = ItemRef::new(5).with_container(ContainerId(1));
        assert!(unresolved.key_eq(&resolved));
        assert!(!unresolved.explicit_eq(&resolved));
        assert!(unresolved.matches(&resolved, EqualityMode::KeyOnly));
        assert!(!unresolved.matches(&resolved, EqualityMode::Explicit));
        assert_ne!(unresolved, resolved);
    }

    #[test]
    fn index_does_not_affect_equality() {
        let a = ItemRef::new('x').with_index(1);
        let b = ItemRef::new('x').with_index(9);
        assert_eq!(a, b);
    }

    #[test]
    fn keyed_compares_by_key_only() {
        let a = Keyed::new(1u32, "first");
        let b = Keyed::new(1u32, "renamed");
        let c = Keyed::new(2u32, "first");
        assert_eq!(a, b);
        assert_ne!(a, c);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
        assert!(set.contains(&1u32));
    }

    #[test]
    fn debug_includes_state() {
        let r = ItemRef::new(3).with_index(2);
        let text = format!("{r:?}");
        assert!(text.contains("Unresolved"));
        assert!(text.contains("index: Some(2)"));
    }
}
