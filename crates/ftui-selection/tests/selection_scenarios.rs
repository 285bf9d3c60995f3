//! End-to-end selection scenarios driven through the public API.

use ftui_selection::{
    ChangeFlags, ContainerId, ItemRef, Keyed, SelectionError, SelectionHost, SelectionMode,
    Selector, SelectorConfig, SourceChange, VecHost,
};

fn multi<T: Clone + Eq + std::hash::Hash>(items: Vec<T>) -> Selector<T, VecHost<T>> {
    Selector::new(VecHost::new(items), SelectorConfig::multiple())
}

// ── Idempotence ─────────────────────────────────────────────────────────

#[test]
fn selecting_an_already_selected_item_commits_nothing() {
    let mut s = multi(vec!['a', 'b', 'c']);
    s.select_item('b').unwrap();
    s.host_mut().clear_log();

    let flags = s.select_item('b').unwrap();
    assert!(flags.is_empty());
    assert_eq!(s.selected_items(), vec!['b']);
    assert!(s.host().changes().is_empty());
    assert!(s.host().flag_log().is_empty());
}

#[test]
fn unselecting_a_missing_item_commits_nothing() {
    let mut s = multi(vec!['a', 'b']);
    let flags = s.unselect_item('a').unwrap();
    assert!(flags.is_empty());
    assert!(s.host().changes().is_empty());
}

// ── Minimal delta ───────────────────────────────────────────────────────

#[test]
fn mixed_batch_notifies_once_with_net_difference() {
    let mut s = multi((1..=6).collect());
    s.set_selected_items([1, 2, 3]).unwrap();
    s.host_mut().clear_log();

    s.begin().unwrap();
    s.unselect(ItemRef::new(2)).unwrap();
    s.select(ItemRef::new(4), false).unwrap();
    s.select(ItemRef::new(5), false).unwrap();
    s.unselect(ItemRef::new(5)).unwrap();
    s.select(ItemRef::new(2), false).unwrap();
    s.unselect(ItemRef::new(3)).unwrap();
    s.end().unwrap();

    assert_eq!(s.selected_items(), vec![1, 2, 4]);
    let changes = s.host().changes();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].removed, vec![3]);
    assert_eq!(changes[0].added, vec![4]);
}

#[test]
fn unselects_are_applied_before_selects() {
    let mut s = multi(vec![1, 2, 3, 4]);
    s.set_selected_items([1, 2]).unwrap();
    s.host_mut().clear_log();

    s.begin().unwrap();
    s.select(ItemRef::new(3), false).unwrap();
    s.unselect(ItemRef::new(1)).unwrap();
    s.select(ItemRef::new(4), false).unwrap();
    s.unselect(ItemRef::new(2)).unwrap();
    s.end().unwrap();

    let log = s.host().flag_log();
    let last_clear = log.iter().rposition(|(_, on)| !on).expect("clears");
    let first_set = log.iter().position(|(_, on)| *on).expect("sets");
    assert!(last_clear < first_set, "flag log out of order: {log:?}");
}

// ── Single-select ───────────────────────────────────────────────────────

#[test]
fn single_select_replacement_is_one_event() {
    let mut s = Selector::new(VecHost::new(vec!["x", "y", "z"]), SelectorConfig::single());
    s.select_item("x").unwrap();
    s.host_mut().clear_log();

    s.begin().unwrap();
    s.select(ItemRef::new("y"), false).unwrap();
    s.select(ItemRef::new("z"), false).unwrap();
    let flags = s.end().unwrap();

    assert_eq!(s.selected_items(), vec!["z"]);
    assert!(flags.contains(ChangeFlags::PRIMARY_CHANGED));
    let changes = s.host().changes();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].removed, vec!["x"]);
    assert_eq!(changes[0].added, vec!["z"]);
}

#[test]
fn extended_mode_allows_many() {
    let config = SelectorConfig::default().with_mode(SelectionMode::Extended);
    let mut s = Selector::new(VecHost::new(vec![1, 2, 3]), config);
    s.select_all().unwrap();
    assert_eq!(s.len(), 3);

    assert_eq!(
        s.set_mode(SelectionMode::Multiple).unwrap(),
        ChangeFlags::empty()
    );
    assert_eq!(s.len(), 3);
}

// ── Deferred requests ───────────────────────────────────────────────────

#[test]
fn deferred_request_promotes_when_item_arrives() {
    let mut s = multi(vec![1, 2]);
    s.select_item(1).unwrap();
    s.select_item(9).unwrap();
    assert_eq!(s.selected_items(), vec![1]);
    assert_eq!(s.deferred().copied().collect::<Vec<_>>(), vec![9]);
    assert_eq!(s.host().changes().len(), 1);

    s.host_mut().push(9);
    let flags = s.source_changed(SourceChange::Added).unwrap();
    assert!(flags.contains(ChangeFlags::PROMOTED | ChangeFlags::ADDED));
    assert_eq!(s.selected_items(), vec![1, 9]);
    assert_eq!(s.deferred().count(), 0);
    let last = s.host().changes().last().expect("promotion notified");
    assert_eq!(last.added, vec![9]);
    assert!(last.removed.is_empty());
}

#[test]
fn cancelled_transaction_keeps_earlier_deferred_requests() {
    let mut s = multi(vec![1]);
    s.select_item(7).unwrap();

    let mut tx = s.transaction().unwrap();
    assert!(!tx.select(ItemRef::new(8)));
    assert!(!tx.unselect(ItemRef::new(7)));
    tx.cancel();

    assert_eq!(s.deferred().copied().collect::<Vec<_>>(), vec![7]);
}

#[test]
fn clear_deferred_forgets_requests() {
    let mut s = multi(vec![]);
    s.select_item(4).unwrap();
    s.clear_deferred();
    s.host_mut().push(4);
    s.source_changed(SourceChange::Added).unwrap();
    assert!(s.is_empty());
}

// ── Cancellation ────────────────────────────────────────────────────────

#[test]
fn early_return_through_question_mark_cancels() {
    fn pick(s: &mut Selector<u8, VecHost<u8>>, items: &[u8]) -> Result<(), SelectionError> {
        let mut tx = s.transaction()?;
        for &item in items {
            tx.select(ItemRef::new(item));
        }
        if items.contains(&0) {
            return Err(SelectionError::NotSelectable { position: 0 });
        }
        tx.commit();
        Ok(())
    }

    let mut s = Selector::new(VecHost::new(vec![0, 1, 2]), SelectorConfig::multiple());
    assert!(pick(&mut s, &[1, 0]).is_err());
    assert!(s.is_empty());
    assert!(!s.is_active());

    pick(&mut s, &[1, 2]).unwrap();
    assert_eq!(s.selected_items(), vec![1, 2]);
}

// ── Item identity ───────────────────────────────────────────────────────

#[test]
fn keyed_items_compare_by_key() {
    let mut s = multi(vec![Keyed::new(1, "one"), Keyed::new(2, "two")]);
    s.select_item(Keyed::new(2, "renamed")).unwrap();
    assert!(s.is_selected(&Keyed::new(2, "")));
    assert_eq!(s.selected_items()[0].key, 2);

    // Selecting by value stores the source's own item.
    assert!(s.select_value(&"one", |item| item.value).unwrap());
    assert_eq!(s.len(), 1);
    assert_eq!(s.selected_value(|item| item.value), Some("one"));
}

#[test]
fn container_handles_distinguish_entries_for_exact_queries() {
    let mut host = VecHost::new(vec![1, 2]);
    host.realize(1, ContainerId(11));
    let mut s = Selector::new(host, SelectorConfig::multiple());
    s.select_item(2).unwrap();

    assert!(s.is_selected(&2));
    assert!(s.is_container_selected(&ItemRef::new(2).with_container(ContainerId(11))));
    assert!(!s.is_container_selected(&ItemRef::new(2).with_container(ContainerId(12))));

    // Unselect by key even when the request carries a different container.
    s.begin().unwrap();
    assert!(s.unselect(ItemRef::new(2).with_container(ContainerId(99))).unwrap());
    s.end().unwrap();
    assert!(s.is_empty());
}

// ── Current-item synchronization ────────────────────────────────────────

#[test]
fn cursor_follows_primary_and_pull_ignores_its_own_echo() {
    let config = SelectorConfig::single().with_sync_with_current(true);
    let mut s = Selector::new(VecHost::new(vec!["a", "b", "c"]), config);

    s.select_item("b").unwrap();
    assert_eq!(s.host().cursor(), Some(&"b"));
    assert!(s.current_item_changed().unwrap().is_empty());

    s.host_mut().move_cursor(Some("c"));
    s.current_item_changed().unwrap();
    assert_eq!(s.selected_items(), vec!["c"]);
    assert_eq!(
        s.host().current_item().map(|c| *c.item()),
        Some("c"),
        "cursor untouched by the pull"
    );

    s.host_mut().move_cursor(None);
    s.current_item_changed().unwrap();
    assert!(s.is_empty());
}

#[test]
fn toggling_sync_inside_a_transaction_is_rejected() {
    let mut s = multi(vec![1]);
    s.begin().unwrap();
    assert_eq!(
        s.set_sync_with_current(true),
        Err(SelectionError::AlreadyActive)
    );
    s.cancel().unwrap();
    assert!(!s.config().sync_with_current);
}

// ── Snapshot ────────────────────────────────────────────────────────────

#[test]
fn snapshot_round_trips_through_restore() {
    let mut s = multi(vec![1, 2, 3]);
    s.set_selected_items([2, 3]).unwrap();
    let snap = s.snapshot();
    assert!(!snap.is_empty());

    s.unselect_all().unwrap();
    assert!(s.is_empty());
    s.restore(snap).unwrap();
    assert_eq!(s.selected_items(), vec![2, 3]);
}

#[cfg(feature = "state-persistence")]
#[test]
fn snapshot_serializes_with_serde_json() {
    use ftui_selection::SelectionSnapshot;

    let mut s = multi(vec![1, 2, 3]);
    s.set_selected_items([3, 1]).unwrap();
    s.select_item(8).unwrap();

    let json = serde_json::to_string(&s.snapshot()).expect("serialize snapshot");
    let back: SelectionSnapshot<i32> = serde_json::from_str(&json).expect("deserialize snapshot");
    assert_eq!(back.mode, SelectionMode::Multiple);
    assert_eq!(back.selected, vec![3, 1]);
    assert_eq!(back.deferred, vec![8]);
}
