//! Property-based tests for the history store
//!
//! These tests verify the version list is a strictly growing audit trail
//! and that versions never alias the live transcript.

use super::*;
use proptest::prelude::*;

// ============================================================================
// Generators
// ============================================================================

#[derive(Debug, Clone)]
enum Op {
    Append(String, String),
    Delete(Vec<usize>),
    Snapshot(String),
    Restore(usize),
}

fn arb_text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{0,24}"
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (arb_text(), arb_text()).prop_map(|(u, a)| Op::Append(u, a)),
        proptest::collection::vec(0usize..12, 0..5).prop_map(Op::Delete),
        "[a-z]{1,8}".prop_map(Op::Snapshot),
        (0usize..16).prop_map(Op::Restore),
    ]
}

fn arb_ops() -> impl Strategy<Value = Vec<Op>> {
    proptest::collection::vec(arb_op(), 0..40)
}

fn apply(store: &mut HistoryStore, op: &Op) {
    match op {
        Op::Append(u, a) => {
            store.append(Message::human(u.clone()), Message::assistant(a.clone()));
        }
        Op::Delete(idx) => {
            let _ = store.delete_messages(idx.iter().copied());
        }
        Op::Snapshot(label) => {
            store.snapshot(label.clone());
        }
        Op::Restore(i) => {
            let _ = store.restore(*i);
        }
    }
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Append and successful deletes add exactly one version each; no-op
    /// deletes add none.
    #[test]
    fn prop_version_count_grows_by_one(ops in arb_ops()) {
        let mut store = HistoryStore::new();
        for op in &ops {
            let before = store.versions().len();
            match op {
                Op::Append(u, a) => {
                    let index = store.append(Message::human(u.clone()), Message::assistant(a.clone()));
                    prop_assert_eq!(store.versions().len(), before + 1);
                    prop_assert_eq!(index, before);
                }
                Op::Delete(idx) => {
                    match store.delete_messages(idx.iter().copied()) {
                        Ok(index) => {
                            prop_assert_eq!(store.versions().len(), before + 1);
                            prop_assert_eq!(index, before);
                        }
                        Err(e) => {
                            prop_assert_eq!(e, HistoryError::NoOp);
                            prop_assert_eq!(store.versions().len(), before);
                        }
                    }
                }
                other => apply(&mut store, other),
            }
        }
    }

    /// Restore never changes the version list
    #[test]
    fn prop_restore_leaves_history_untouched(ops in arb_ops(), targets in proptest::collection::vec(0usize..16, 1..8)) {
        let mut store = HistoryStore::new();
        for op in &ops {
            apply(&mut store, op);
        }
        let versions = store.versions().to_vec();

        for target in targets {
            let result = store.restore(target);
            prop_assert_eq!(result.is_ok(), target < versions.len());
            prop_assert_eq!(store.versions(), versions.as_slice());
        }
    }

    /// Restored live transcript equals the version and edits to it do not
    /// leak back into the version
    #[test]
    fn prop_restore_round_trip_is_isolated(ops in arb_ops(), pick in any::<prop::sample::Index>()) {
        let mut store = HistoryStore::new();
        for op in &ops {
            apply(&mut store, op);
        }
        let target = pick.index(store.versions().len());
        let original = store.versions()[target].clone();

        store.restore(target).unwrap();
        prop_assert_eq!(store.live_transcript(), original.messages());
        prop_assert_eq!(store.current_version_index(), target);

        store.append(Message::human("after"), Message::assistant("restore"));
        if !store.live_transcript().is_empty() {
            let _ = store.delete_messages([0]);
        }
        prop_assert_eq!(&store.versions()[target], &original);
    }

    /// Deleting a set of indexes keeps every other message in order
    #[test]
    fn prop_delete_keeps_untargeted_in_order(
        turns in proptest::collection::vec((arb_text(), arb_text()), 1..6),
        targets in proptest::collection::btree_set(0usize..12, 1..6),
    ) {
        let mut store = HistoryStore::new();
        for (u, a) in &turns {
            store.append(Message::human(u.clone()), Message::assistant(a.clone()));
        }
        let before = store.live_transcript().to_vec();
        let expected: Vec<Message> = before
            .iter()
            .enumerate()
            .filter(|(i, _)| !targets.contains(i))
            .map(|(_, m)| m.clone())
            .collect();

        match store.delete_messages(targets.iter().copied()) {
            Ok(index) => {
                prop_assert_eq!(store.versions()[index].messages(), expected.as_slice());
                prop_assert_eq!(store.live_transcript(), expected.as_slice());
            }
            Err(_) => {
                prop_assert!(targets.iter().all(|&i| i >= before.len()));
                prop_assert_eq!(store.live_transcript(), before.as_slice());
            }
        }
    }

    /// Version 0 stays the empty pre-conversation baseline
    #[test]
    fn prop_version_zero_is_never_replaced(ops in arb_ops()) {
        let mut store = HistoryStore::new();
        for op in &ops {
            apply(&mut store, op);
        }
        prop_assert!(store.versions()[0].is_empty());
    }
}
