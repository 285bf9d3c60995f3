#![forbid(unsafe_code)]

//! Selection transactions.
//!
//! A transaction accumulates select/unselect requests in scratch sets and
//! reconciles them against the live selection on commit.
//!
//! ```text
//!            begin()              end()
//!   Idle ───────────► Active ───────────► Committing ──► Idle
//!                        │
//!                        │ cancel()
//!                        └──────────────► Cancelled ───► Idle
//! ```
//!
//! # Invariants
//!
//! 1. At most one transaction is open per selector; there is no nesting.
//! 2. `to_select` and `to_unselect` are empty whenever the state is `Idle`.
//! 3. `to_defer_select` survives commits. Edits made to it inside a
//!    cancelled transaction are rolled back. It is drained only by
//!    promotion, by `unselect`, or explicitly.
//! 4. A commit applies every unselect before any select.

use std::hash::Hash;

use bitflags::bitflags;

use crate::host::SelectionHost;
use crate::item::{EqualityMode, ItemRef};
use crate::selector::Selector;
use crate::set::SelectionSet;

/// Lifecycle state of a selector's transaction slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionState {
    /// No transaction open.
    #[default]
    Idle,
    /// Accepting requests.
    Active,
    /// Applying the delta and notifying the host.
    Committing,
    /// Discarding pending requests.
    Cancelled,
}

impl TransactionState {
    /// Whether a transaction is open (accepting requests or committing).
    #[inline]
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active | Self::Committing)
    }
}

bitflags! {
    /// What a commit changed.
    ///
    /// An empty set means the live selection is untouched and no change
    /// notification was sent.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ChangeFlags: u8 {
        /// Items were unselected.
        const REMOVED         = 0b0_0001;
        /// Items were selected.
        const ADDED           = 0b0_0010;
        /// The primary (first) selected item changed.
        const PRIMARY_CHANGED = 0b0_0100;
        /// Deferred requests were promoted into this commit.
        const PROMOTED        = 0b0_1000;
        /// The single-select policy rewrote the pending sets.
        const COLLAPSED       = 0b1_0000;
    }
}

/// Edit to the deferred set made inside an open transaction.
#[derive(Debug, Clone)]
enum DeferEdit<T> {
    Parked(ItemRef<T>),
    Dropped(ItemRef<T>),
}

/// Scratch sets owned by a selector.
#[derive(Debug, Clone)]
pub(crate) struct PendingChanges<T> {
    pub(crate) to_select: SelectionSet<T>,
    pub(crate) to_unselect: SelectionSet<T>,
    pub(crate) to_defer_select: SelectionSet<T>,
    defer_journal: Vec<DeferEdit<T>>,
}

impl<T: Eq + Hash + Clone> PendingChanges<T> {
    pub(crate) fn new(identity_hashing: bool) -> Self {
        let mut pending = Self {
            to_select: SelectionSet::new(),
            to_unselect: SelectionSet::new(),
            to_defer_select: SelectionSet::new(),
            defer_journal: Vec::new(),
        };
        pending.set_identity_hashing(identity_hashing);
        pending
    }

    pub(crate) fn set_identity_hashing(&mut self, enabled: bool) {
        self.to_select.set_identity_hashing(enabled);
        self.to_unselect.set_identity_hashing(enabled);
        self.to_defer_select.set_identity_hashing(enabled);
    }

    /// Park a request for an item missing from the source.
    pub(crate) fn park(&mut self, item: ItemRef<T>) {
        self.defer_journal.push(DeferEdit::Parked(item.clone()));
        self.to_defer_select.add(item);
    }

    /// Drop the deferred request for `item`, if any.
    pub(crate) fn unpark(&mut self, item: &ItemRef<T>) -> bool {
        match self.to_defer_select.take_with(item, EqualityMode::KeyOnly) {
            Some(dropped) => {
                self.defer_journal.push(DeferEdit::Dropped(dropped));
                true
            }
            None => false,
        }
    }

    /// Drop every deferred request, journaling each one.
    pub(crate) fn unpark_all(&mut self) {
        for dropped in self.to_defer_select.clear() {
            self.defer_journal.push(DeferEdit::Dropped(dropped));
        }
    }

    /// Drop per-transaction requests; deferred requests stay.
    pub(crate) fn clear_scratch(&mut self) {
        self.to_select.clear();
        self.to_unselect.clear();
        self.defer_journal.clear();
    }

    /// Undo deferred-set edits made since the transaction began.
    pub(crate) fn rollback_deferred(&mut self) {
        while let Some(edit) = self.defer_journal.pop() {
            match edit {
                DeferEdit::Parked(item) => {
                    self.to_defer_select.take_with(&item, EqualityMode::KeyOnly);
                }
                DeferEdit::Dropped(item) => self.to_defer_select.add(item),
            }
        }
    }

    pub(crate) fn scratch_is_empty(&self) -> bool {
        self.to_select.is_empty() && self.to_unselect.is_empty()
    }
}

/// RAII handle to an open transaction.
///
/// Obtained from [`Selector::transaction`]. Requests only touch scratch
/// state until [`commit`](Self::commit). Dropping the handle without
/// committing cancels the transaction, so an early return or `?` leaves the
/// selection exactly as it was.
///
/// ```
/// use ftui_selection::{ItemRef, Selector, SelectorConfig, VecHost};
///
/// let mut selector = Selector::new(VecHost::new(vec!["a", "b"]), SelectorConfig::multiple());
/// {
///     let mut tx = selector.transaction().unwrap();
///     tx.select(ItemRef::new("a"));
///     // dropped without commit
/// }
/// assert!(selector.is_empty());
/// ```
#[derive(Debug)]
pub struct SelectionTransaction<'a, T, H>
where
    T: Eq + Hash + Clone,
    H: SelectionHost<T>,
{
    selector: &'a mut Selector<T, H>,
    finished: bool,
}

impl<'a, T, H> SelectionTransaction<'a, T, H>
where
    T: Eq + Hash + Clone,
    H: SelectionHost<T>,
{
    pub(crate) fn new(selector: &'a mut Selector<T, H>) -> Self {
        Self {
            selector,
            finished: false,
        }
    }

    /// Request selection of `item`.
    ///
    /// Items missing from the source are parked as deferred requests and
    /// report `false`.
    pub fn select(&mut self, item: ItemRef<T>) -> bool {
        self.selector.pending_select(item, false)
    }

    /// Request selection of `item` without checking the source.
    pub fn select_materialized(&mut self, item: ItemRef<T>) -> bool {
        self.selector.pending_select(item, true)
    }

    /// Request unselection of `item`.
    pub fn unselect(&mut self, item: ItemRef<T>) -> bool {
        self.selector.pending_unselect(item)
    }

    /// Read access to the selector while the transaction is open.
    #[must_use]
    pub fn selector(&self) -> &Selector<T, H> {
        self.selector
    }

    /// Apply pending requests and notify the host.
    pub fn commit(mut self) -> ChangeFlags {
        self.finished = true;
        self.selector.commit_pending()
    }

    /// Discard pending requests.
    pub fn cancel(mut self) {
        self.finished = true;
        self.selector.cancel_pending();
    }
}

impl<T, H> Drop for SelectionTransaction<'_, T, H>
where
    T: Eq + Hash + Clone,
    H: SelectionHost<T>,
{
    fn drop(&mut self) {
        if !self.finished {
            self.selector.cancel_pending();
        }
    }
}
