#![forbid(unsafe_code)]

//! The selection engine.
//!
//! [`Selector`] owns the live [`SelectionSet`], the pending scratch sets and
//! the host. All mutation of the live set goes through a transaction:
//!
//! ```text
//! begin ─► select / unselect (scratch only) ─► end
//!                                               │
//!          1. promote deferred requests now in the source
//!          2. policy pass (single-select collapse)
//!          3. apply delta: every unselect, then every select
//!          4. primary changed? tell the host
//!          5. push primary to the current-item cursor (if synchronized)
//!          6. one on_selection_changed(removed, added), unless both empty
//!          7. back to Idle, scratch cleared, deferred requests kept
//! ```
//!
//! Promotion runs before the policy pass so that promoted requests are
//! subject to the single-select collapse like any other request.
//!
//! # Resolution
//!
//! Requests that carry a verified source index are used as-is. The rest are
//! resolved by one forward walk over the source per commit, stopping as soon
//! as every outstanding request has been matched. A cached index that no
//! longer names the same item is treated as unknown and re-derived.

use std::hash::Hash;

use ahash::{AHashMap, AHashSet};
#[cfg(feature = "tracing")]
use web_time::Instant;

use crate::config::SelectorConfig;
use crate::error::{Result, SelectionError};
use crate::host::SelectionHost;
use crate::item::{EqualityMode, ItemRef};
use crate::policy::{SelectionMode, apply_policy};
use crate::set::SelectionSet;
use crate::snapshot::SelectionSnapshot;
use crate::sync::{CurrentItemSync, PullTarget};
use crate::transaction::{ChangeFlags, PendingChanges, SelectionTransaction, TransactionState};

/// Structural change to the host's backing collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceChange<T> {
    /// Items were added; deferred requests may now be satisfiable.
    Added,
    /// These items left the source.
    Removed(Vec<T>),
    /// The source was replaced wholesale.
    Reset,
}

/// Transactional selection engine for a selector widget.
#[derive(Debug)]
pub struct Selector<T, H> {
    host: H,
    config: SelectorConfig,
    selected: SelectionSet<T>,
    pending: PendingChanges<T>,
    state: TransactionState,
    sync: CurrentItemSync,
}

impl<T, H> Selector<T, H>
where
    T: Eq + Hash + Clone,
    H: SelectionHost<T>,
{
    /// Create a selector driving `host`.
    #[must_use]
    pub fn new(host: H, config: SelectorConfig) -> Self {
        let mut selected = SelectionSet::new();
        selected.set_identity_hashing(config.identity_hashing);
        Self {
            host,
            config,
            selected,
            pending: PendingChanges::new(config.identity_hashing),
            state: TransactionState::Idle,
            sync: CurrentItemSync::new(config.sync_with_current),
        }
    }

    // ── Accessors ───────────────────────────────────────────────────────

    /// The host collaborator.
    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutable access to the host, e.g. to edit the source.
    ///
    /// Structural edits should be followed by [`source_changed`](Self::source_changed).
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Consume the selector, returning the host.
    #[must_use]
    pub fn into_host(self) -> H {
        self.host
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> SelectorConfig {
        self.config
    }

    /// Current selection mode.
    #[must_use]
    pub fn mode(&self) -> SelectionMode {
        self.config.mode
    }

    /// Transaction state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Whether a transaction is open.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// The live selection.
    #[must_use]
    pub fn selection(&self) -> &SelectionSet<T> {
        &self.selected
    }

    /// Number of selected items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.selected.len()
    }

    /// Whether nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Selected entries in insertion order.
    pub fn selected(&self) -> impl Iterator<Item = &ItemRef<T>> {
        self.selected.iter()
    }

    /// Selected items in insertion order.
    #[must_use]
    pub fn selected_items(&self) -> Vec<T> {
        self.selected.items().cloned().collect()
    }

    /// The primary (first) selected entry.
    #[must_use]
    pub fn primary(&self) -> Option<&ItemRef<T>> {
        self.selected.first()
    }

    /// Source index of the primary selection.
    ///
    /// A cached index is verified against the source and re-derived when it
    /// has gone stale.
    #[must_use]
    pub fn primary_index(&self) -> Option<usize> {
        let primary = self.selected.first()?;
        match primary.index() {
            Some(index) if self.host.source_item(index) == Some(primary.item()) => Some(index),
            _ => self.host.source_index_of(primary.item()),
        }
    }

    /// Whether `item` is selected.
    #[must_use]
    pub fn is_selected(&self, item: &T) -> bool {
        self.selected.contains_item(item)
    }

    /// Whether this exact item/container pairing is selected.
    #[must_use]
    pub fn is_container_selected(&self, item: &ItemRef<T>) -> bool {
        self.selected
            .find_with(item, EqualityMode::Explicit)
            .is_some()
    }

    /// Items requested for selection but not yet present in the source.
    pub fn deferred(&self) -> impl Iterator<Item = &T> {
        self.pending.to_defer_select.items()
    }

    /// Drop every deferred request.
    ///
    /// Inside an open transaction the drop is undone by a cancel.
    pub fn clear_deferred(&mut self) {
        if self.is_active() {
            self.pending.unpark_all();
        } else {
            self.pending.to_defer_select.clear();
        }
    }

    /// Read the primary selection's value.
    #[must_use]
    pub fn selected_value<V>(&self, value_of: impl Fn(&T) -> V) -> Option<V> {
        self.selected.first().map(|p| value_of(p.item()))
    }

    // ── Configuration ───────────────────────────────────────────────────

    /// Change the selection mode. Narrowing to single-select collapses the
    /// live selection to its primary.
    pub fn set_mode(&mut self, mode: SelectionMode) -> Result<ChangeFlags> {
        if self.is_active() {
            return Err(SelectionError::AlreadyActive);
        }
        self.config.mode = mode;
        if !mode.allows_multiple() && self.selected.len() > 1 {
            return self.validate();
        }
        Ok(ChangeFlags::empty())
    }

    /// Enable or disable hash indexes. Observable behavior is unchanged.
    pub fn set_identity_hashing(&mut self, enabled: bool) {
        self.config.identity_hashing = enabled;
        self.selected.set_identity_hashing(enabled);
        self.pending.set_identity_hashing(enabled);
    }

    /// Enable or disable current-item synchronization.
    ///
    /// Enabling aligns the two sides: a set cursor wins; with no cursor the
    /// primary selection is pushed to it.
    pub fn set_sync_with_current(&mut self, enabled: bool) -> Result<ChangeFlags> {
        if self.is_active() {
            return Err(SelectionError::AlreadyActive);
        }
        self.config.sync_with_current = enabled;
        self.sync.set_enabled(enabled);
        if !enabled {
            return Ok(ChangeFlags::empty());
        }
        if self.host.current_item().is_none() {
            self.sync.push(&mut self.host, self.selected.first());
            return Ok(ChangeFlags::empty());
        }
        self.current_item_changed()
    }

    // ── Transaction primitives ──────────────────────────────────────────

    /// Open a transaction.
    pub fn begin(&mut self) -> Result<()> {
        if self.state != TransactionState::Idle {
            return Err(SelectionError::AlreadyActive);
        }
        debug_assert!(
            self.pending.scratch_is_empty(),
            "scratch sets must be empty outside a transaction"
        );
        self.state = TransactionState::Active;
        Ok(())
    }

    /// Open a transaction wrapped in an RAII handle that cancels on drop.
    pub fn transaction(&mut self) -> Result<SelectionTransaction<'_, T, H>> {
        self.begin()?;
        Ok(SelectionTransaction::new(self))
    }

    /// Request selection of `item` in the open transaction.
    ///
    /// Returns whether the request is pending for this commit. With
    /// `assume_materialized` the source is not consulted.
    pub fn select(&mut self, item: ItemRef<T>, assume_materialized: bool) -> Result<bool> {
        self.ensure_active()?;
        Ok(self.pending_select(item, assume_materialized))
    }

    /// Request unselection of `item` in the open transaction.
    pub fn unselect(&mut self, item: ItemRef<T>) -> Result<bool> {
        self.ensure_active()?;
        Ok(self.pending_unselect(item))
    }

    /// Commit the open transaction.
    pub fn end(&mut self) -> Result<ChangeFlags> {
        self.ensure_active()?;
        Ok(self.commit_pending())
    }

    /// Discard the open transaction.
    pub fn cancel(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.cancel_pending();
        Ok(())
    }

    /// Run an empty commit so policy and promotion are re-applied.
    pub fn validate(&mut self) -> Result<ChangeFlags> {
        self.begin()?;
        self.end()
    }

    fn ensure_active(&self) -> Result<()> {
        if self.state == TransactionState::Active {
            Ok(())
        } else {
            Err(SelectionError::NotActive)
        }
    }

    pub(crate) fn pending_select(&mut self, item: ItemRef<T>, assume_materialized: bool) -> bool {
        debug_assert_eq!(self.state, TransactionState::Active);
        if !self.host.is_selectable(item.item()) {
            return false;
        }

        if !assume_materialized
            && !self.selected.contains_item(item.item())
            && !self.host.source_contains(item.item())
        {
            if !self.pending.to_defer_select.contains_item(item.item()) {
                #[cfg(feature = "tracing")]
                tracing::trace!(
                    message = "selection.defer",
                    deferred = self.pending.to_defer_select.len().saturating_add(1)
                );
                self.pending.park(item);
            }
            return false;
        }
        self.pending.unpark(&item);

        if self
            .pending
            .to_unselect
            .take_with(&item, EqualityMode::KeyOnly)
            .is_some()
        {
            return true;
        }
        if self.selected.contains_item(item.item())
            || self.pending.to_select.contains_item(item.item())
        {
            return false;
        }
        if !self.config.mode.allows_multiple() && !self.pending.to_select.is_empty() {
            self.pending.to_select.clear();
        }
        self.pending.to_select.add(item);
        true
    }

    pub(crate) fn pending_unselect(&mut self, item: ItemRef<T>) -> bool {
        debug_assert_eq!(self.state, TransactionState::Active);
        self.pending.unpark(&item);

        if self
            .pending
            .to_select
            .take_with(&item, EqualityMode::KeyOnly)
            .is_some()
        {
            return true;
        }
        let Some(live) = self.selected.find_item(item.item()) else {
            return false;
        };
        if self.pending.to_unselect.contains_item(item.item()) {
            return false;
        }
        let live = live.clone();
        self.pending.to_unselect.add(live);
        true
    }

    pub(crate) fn commit_pending(&mut self) -> ChangeFlags {
        debug_assert_eq!(self.state, TransactionState::Active);
        self.state = TransactionState::Committing;

        #[cfg(feature = "tracing")]
        let commit_start = Instant::now();
        #[cfg(feature = "tracing")]
        let commit_span = tracing::debug_span!(
            "selection.commit",
            live_before = self.selected.len(),
            requested_select = self.pending.to_select.len(),
            requested_unselect = self.pending.to_unselect.len(),
            commit_duration_us = tracing::field::Empty
        );
        #[cfg(feature = "tracing")]
        let _commit_guard = commit_span.enter();

        let mut flags = ChangeFlags::empty();
        if promote_deferred(&self.host, self.config.mode, &self.selected, &mut self.pending) {
            flags |= ChangeFlags::PROMOTED;
        }
        if apply_policy(
            self.config.mode,
            &self.selected,
            &mut self.pending.to_select,
            &mut self.pending.to_unselect,
        ) {
            flags |= ChangeFlags::COLLAPSED;
        }

        let previous_primary = self.selected.first().map(|p| p.item().clone());
        let (removed, added) = apply_delta(&mut self.host, &mut self.selected, &self.pending);
        if !removed.is_empty() {
            flags |= ChangeFlags::REMOVED;
        }
        if !added.is_empty() {
            flags |= ChangeFlags::ADDED;
        }

        let primary = self.selected.first();
        if primary.map(ItemRef::item) != previous_primary.as_ref() {
            flags |= ChangeFlags::PRIMARY_CHANGED;
            self.host.primary_changed(primary);
            self.sync.push(&mut self.host, primary);
        }

        if !removed.is_empty() || !added.is_empty() {
            self.host.on_selection_changed(&removed, &added);
        }

        self.pending.clear_scratch();
        self.state = TransactionState::Idle;

        #[cfg(feature = "tracing")]
        {
            commit_span.record(
                "commit_duration_us",
                u64::try_from(commit_start.elapsed().as_micros()).unwrap_or(u64::MAX),
            );
            tracing::debug!(
                message = "selection.commit",
                removed = removed.len(),
                added = added.len(),
                live = self.selected.len(),
                deferred = self.pending.to_defer_select.len(),
                flags = ?flags
            );
        }
        flags
    }

    pub(crate) fn cancel_pending(&mut self) {
        debug_assert_eq!(self.state, TransactionState::Active);
        self.state = TransactionState::Cancelled;
        #[cfg(feature = "tracing")]
        tracing::debug!(
            message = "selection.cancel",
            discarded_select = self.pending.to_select.len(),
            discarded_unselect = self.pending.to_unselect.len()
        );
        self.pending.rollback_deferred();
        self.pending.clear_scratch();
        self.state = TransactionState::Idle;
    }

    // ── Batch operations ────────────────────────────────────────────────

    /// Select `item` in a transaction of its own.
    pub fn select_item(&mut self, item: T) -> Result<ChangeFlags> {
        self.begin()?;
        self.pending_select(ItemRef::new(item), false);
        self.end()
    }

    /// Unselect `item` in a transaction of its own.
    pub fn unselect_item(&mut self, item: T) -> Result<ChangeFlags> {
        self.begin()?;
        self.pending_unselect(ItemRef::new(item));
        self.end()
    }

    /// Select every selectable source item.
    pub fn select_all(&mut self) -> Result<ChangeFlags> {
        if !self.config.mode.allows_multiple() {
            return Err(SelectionError::MultipleSelectionNotAllowed {
                requested: self.host.source_len(),
            });
        }
        self.begin()?;
        for index in 0..self.host.source_len() {
            if let Some(item) = self.materialize(index) {
                self.pending_select(item, true);
            }
        }
        self.end()
    }

    /// Unselect everything and drop deferred requests.
    pub fn unselect_all(&mut self) -> Result<ChangeFlags> {
        self.begin()?;
        let live: Vec<ItemRef<T>> = self.selected.iter().cloned().collect();
        for entry in live {
            self.pending_unselect(entry);
        }
        self.pending.unpark_all();
        self.end()
    }

    /// Replace the selection with `items` atomically.
    ///
    /// Repeated items count once. Under single-select more than one distinct
    /// item is rejected. An item the host refuses cancels the whole batch;
    /// the error reports its position among the distinct items.
    pub fn set_selected_items(&mut self, items: impl IntoIterator<Item = T>) -> Result<ChangeFlags> {
        let mut seen = AHashSet::new();
        let requests: Vec<T> = items
            .into_iter()
            .filter(|item| seen.insert(item.clone()))
            .collect();
        if !self.config.mode.allows_multiple() && requests.len() > 1 {
            return Err(SelectionError::MultipleSelectionNotAllowed {
                requested: requests.len(),
            });
        }

        self.begin()?;
        let stale: Vec<ItemRef<T>> = self
            .selected
            .iter()
            .filter(|e| !requests.contains(e.item()))
            .cloned()
            .collect();
        for entry in stale {
            self.pending_unselect(entry);
        }
        for (position, item) in requests.into_iter().enumerate() {
            if !self.host.is_selectable(&item) {
                self.cancel_pending();
                return Err(SelectionError::NotSelectable { position });
            }
            self.pending_select(ItemRef::new(item), false);
        }
        self.end()
    }

    /// Select the first source item whose value equals `value`, replacing
    /// the current selection. Returns `false` when no item matches.
    pub fn select_value<V: PartialEq>(
        &mut self,
        value: &V,
        value_of: impl Fn(&T) -> V,
    ) -> Result<bool> {
        let found = (0..self.host.source_len()).find(|&index| {
            self.host
                .source_item(index)
                .is_some_and(|item| value_of(item) == *value)
        });
        let Some(item) = found.and_then(|index| self.host.source_item(index).cloned()) else {
            return Ok(false);
        };
        self.set_selected_items([item])?;
        Ok(true)
    }

    // ── Source and cursor notifications ─────────────────────────────────

    /// React to a structural change in the host's source collection.
    ///
    /// All resulting unselects and promotions land in one commit.
    pub fn source_changed(&mut self, change: SourceChange<T>) -> Result<ChangeFlags> {
        self.begin()?;
        match change {
            SourceChange::Added => {}
            SourceChange::Removed(items) => {
                for item in items {
                    if !self.host.source_contains(&item) {
                        self.pending_unselect(ItemRef::new(item));
                    }
                }
            }
            SourceChange::Reset => {
                self.selected.invalidate_resolution();
                let gone: Vec<ItemRef<T>> = self
                    .selected
                    .iter()
                    .filter(|e| !self.host.source_contains(e.item()))
                    .cloned()
                    .collect();
                for entry in gone {
                    self.pending_unselect(entry);
                }
            }
        }
        self.end()
    }

    /// React to the host's current-item cursor moving.
    ///
    /// Ignored while a transaction is open, while disabled, and when the
    /// move is an echo of a push.
    pub fn current_item_changed(&mut self) -> Result<ChangeFlags> {
        if self.is_active() {
            #[cfg(feature = "tracing")]
            tracing::trace!(message = "selection.sync_echo", reason = "transaction_active");
            return Ok(ChangeFlags::empty());
        }
        let PullTarget::Select(target) = self.sync.pull_target(&self.host, self.selected.first())
        else {
            return Ok(ChangeFlags::empty());
        };

        self.begin()?;
        self.sync.set_pulling(true);
        let others: Vec<ItemRef<T>> = self
            .selected
            .iter()
            .filter(|e| target.as_ref().is_none_or(|t| !t.key_eq(e)))
            .cloned()
            .collect();
        for entry in others {
            self.pending_unselect(entry);
        }
        if let Some(target) = target {
            self.pending_select(target, false);
        }
        let flags = self.commit_pending();
        self.sync.set_pulling(false);
        Ok(flags)
    }

    // ── Persistence ─────────────────────────────────────────────────────

    /// Capture the selection for later restoration.
    #[must_use]
    pub fn snapshot(&self) -> SelectionSnapshot<T> {
        SelectionSnapshot {
            mode: self.config.mode,
            selected: self.selected.items().cloned().collect(),
            deferred: self.pending.to_defer_select.items().cloned().collect(),
        }
    }

    /// Replace the selection with a snapshot in one commit.
    ///
    /// Items not present in the source become deferred requests.
    pub fn restore(&mut self, snapshot: SelectionSnapshot<T>) -> Result<ChangeFlags> {
        self.begin()?;
        self.config.mode = snapshot.mode;
        let stale: Vec<ItemRef<T>> = self
            .selected
            .iter()
            .filter(|e| !snapshot.selected.contains(e.item()))
            .cloned()
            .collect();
        for entry in stale {
            self.pending_unselect(entry);
        }
        for item in snapshot.selected.into_iter().chain(snapshot.deferred) {
            self.pending_select(ItemRef::new(item), false);
        }
        self.end()
    }

    fn materialize(&self, index: usize) -> Option<ItemRef<T>> {
        let item = self.host.source_item(index)?.clone();
        let mut entry = ItemRef::new(item).with_index(index);
        if let Some(container) = self.host.container_at(index) {
            entry = entry.with_container(container);
        }
        Some(entry)
    }
}

/// Move deferred requests whose items have appeared into `to_select`.
fn promote_deferred<T, H>(
    host: &H,
    mode: SelectionMode,
    live: &SelectionSet<T>,
    pending: &mut PendingChanges<T>,
) -> bool
where
    T: Eq + Hash + Clone,
    H: SelectionHost<T>,
{
    if pending.to_defer_select.is_empty() {
        return false;
    }
    if !mode.allows_multiple() && !pending.to_select.is_empty() {
        // An explicit request in this commit outranks older deferred ones.
        return false;
    }

    let ready: Vec<ItemRef<T>> = pending
        .to_defer_select
        .iter()
        .filter(|d| host.source_contains(d.item()))
        .cloned()
        .collect();
    let mut promoted = false;
    for request in ready {
        pending
            .to_defer_select
            .take_with(&request, EqualityMode::KeyOnly);
        if !host.is_selectable(request.item())
            || live.contains_item(request.item())
            || pending.to_select.contains_item(request.item())
        {
            continue;
        }
        pending.to_select.add(request);
        promoted = true;
    }

    #[cfg(feature = "tracing")]
    if promoted {
        tracing::debug!(
            message = "selection.promote",
            pending_select = pending.to_select.len(),
            still_deferred = pending.to_defer_select.len()
        );
    }
    promoted
}

/// Apply `to_unselect` then `to_select` to the live set inside one
/// deferred-removal scope. Returns `(removed, added)`.
fn apply_delta<T, H>(
    host: &mut H,
    live: &mut SelectionSet<T>,
    pending: &PendingChanges<T>,
) -> (Vec<ItemRef<T>>, Vec<ItemRef<T>>)
where
    T: Eq + Hash + Clone,
    H: SelectionHost<T>,
{
    let mut scope = live.with_deferred_removal();

    let mut removed = Vec::with_capacity(pending.to_unselect.len());
    for request in pending.to_unselect.iter() {
        let taken = scope
            .take_with(request, EqualityMode::Explicit)
            .or_else(|| scope.take_with(request, EqualityMode::KeyOnly));
        if let Some(entry) = taken {
            host.set_selected_flag(&entry, false);
            removed.push(entry);
        }
    }

    let mut requests: Vec<ItemRef<T>> = pending.to_select.iter().cloned().collect();
    resolve_requests(&*host, &mut requests);

    let mut added = Vec::with_capacity(requests.len());
    for request in requests {
        if scope.contains_item(request.item()) {
            continue;
        }
        scope.add(request.clone());
        host.set_selected_flag(&request, true);
        added.push(request);
    }
    (removed, added)
}

/// Fill in source indices and containers, walking the source at most once.
fn resolve_requests<T, H>(host: &H, requests: &mut [ItemRef<T>])
where
    T: Eq + Hash + Clone,
    H: SelectionHost<T>,
{
    let mut outstanding: AHashMap<T, usize> = AHashMap::new();
    for (slot, request) in requests.iter_mut().enumerate() {
        match request.index() {
            Some(index) if host.source_item(index) == Some(request.item()) => {
                if request.container().is_none() {
                    request.set_container(host.container_at(index));
                }
            }
            _ => {
                request.set_index(None);
                outstanding.insert(request.item().clone(), slot);
            }
        }
    }

    let len = host.source_len();
    let mut index = 0;
    while !outstanding.is_empty() && index < len {
        if let Some(slot) = host
            .source_item(index)
            .and_then(|item| outstanding.remove(item))
        {
            let request = &mut requests[slot];
            request.set_index(Some(index));
            if request.container().is_none() {
                request.set_container(host.container_at(index));
            }
        }
        index += 1;
    }
}
