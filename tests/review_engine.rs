use std::collections::BTreeSet;

use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde_json::Value;
use tempfile::TempDir;

use flashy::auth::UserId;
use flashy::review::card::{CardFields, Flashcard};
use flashy::review::engine::{ReviewEngine, StoreAction, StoreCommand};
use flashy::review::fetcher;
use flashy::store::json_store::JsonStore;
use flashy::store::local::LocalRecordStore;
use flashy::store::{RecordPath, RecordStore, StoreError};

/// A store whose every call fails, as when the network is down.
struct FailingStore;

impl RecordStore for FailingStore {
    fn create_child(&mut self, _path: &RecordPath) -> Result<String, StoreError> {
        Err(StoreError::Remote("offline".into()))
    }

    fn write(&mut self, _path: &RecordPath, _value: Value) -> Result<(), StoreError> {
        Err(StoreError::Remote("offline".into()))
    }

    fn delete(&mut self, _path: &RecordPath) -> Result<(), StoreError> {
        Err(StoreError::Remote("offline".into()))
    }

    fn read_subtree(&mut self, _path: &RecordPath) -> Result<Value, StoreError> {
        Err(StoreError::Remote("offline".into()))
    }
}

fn user() -> UserId {
    UserId::new("reader")
}

fn engine_with(cards: &[(&str, &str)]) -> ReviewEngine {
    let mut engine = ReviewEngine::with_rng(1, SmallRng::seed_from_u64(42));
    engine.load(
        cards
            .iter()
            .enumerate()
            .map(|(i, (q, a))| Flashcard::new(Some(format!("-id{i}")), *q, *a))
            .collect(),
    );
    engine
}

fn questions(engine: &ReviewEngine) -> Vec<String> {
    engine.state().cards().map(|c| c.question().to_string()).collect()
}

fn local_store() -> (TempDir, LocalRecordStore) {
    let dir = TempDir::new().unwrap();
    let files = JsonStore::with_base_dir(dir.path().to_path_buf()).unwrap();
    (dir, LocalRecordStore::open(files))
}

fn run(engine: &mut ReviewEngine, store: &mut dyn RecordStore, command: StoreCommand) {
    let outcome = command.execute(store, &user());
    engine.complete(outcome);
}

#[test]
fn next_wraps_back_to_start_and_prev_undoes_next() {
    let mut engine = engine_with(&[("a", "1"), ("b", "2"), ("c", "3")]);
    for _ in 0..3 {
        engine.next();
    }
    assert_eq!(engine.state().cursor(), Some(0));

    engine.next();
    engine.prev();
    engine.next();
    engine.prev();
    assert_eq!(engine.state().cursor(), Some(0));
    engine.prev();
    assert_eq!(engine.state().cursor(), Some(2));
    assert_eq!(engine.state().visited(), &BTreeSet::from([0, 1, 2]));
}

#[test]
fn deleting_last_card_under_cursor_moves_cursor_back() {
    let mut engine = engine_with(&[("a", "1"), ("b", "2"), ("c", "3")]);
    engine.prev();
    assert_eq!(engine.state().cursor(), Some(2));

    let (_dir, mut store) = local_store();
    let command = engine.delete_at(2).unwrap();
    // Nothing changes until the store answers.
    assert_eq!(engine.state().len(), 3);
    run(&mut engine, &mut store, command);

    assert_eq!(engine.state().len(), 2);
    assert_eq!(engine.state().cursor(), Some(1));
    assert!(engine.state().visited().iter().all(|&p| p < 2));
}

#[test]
fn failed_delete_keeps_the_card() {
    let mut engine = engine_with(&[("a", "1"), ("b", "2")]);
    let command = engine.delete_at(0).unwrap();
    run(&mut engine, &mut FailingStore, command);
    assert_eq!(questions(&engine), vec!["a", "b"]);
}

#[test]
fn empty_draft_changes_nothing() {
    let mut engine = engine_with(&[("a", "1")]);
    engine.draft_mut().question = "   ".into();
    engine.draft_mut().answer = String::new();
    assert!(engine.submit_draft().is_none());
    assert_eq!(questions(&engine), vec!["a"]);
    assert_eq!(engine.draft().question, "   ");
}

#[test]
fn cancelled_edit_leaves_cards_alone() {
    let mut engine = engine_with(&[("a", "1"), ("b", "2")]);
    engine.start_edit(1);
    assert_eq!(engine.draft().editing, Some(1));
    engine.draft_mut().question = "changed".into();
    engine.cancel_edit();
    assert_eq!(questions(&engine), vec!["a", "b"]);
    assert!(!engine.draft().is_editing());
    assert!(engine.draft().question.is_empty());
}

#[test]
fn single_card_navigation_and_shuffle() {
    let mut engine = engine_with(&[("2+2", "4")]);
    engine.next();
    assert_eq!(engine.state().cursor(), Some(0));
    engine.shuffle();
    assert_eq!(engine.state().visited(), &BTreeSet::from([0]));
    assert_eq!(questions(&engine), vec!["2+2"]);
}

#[test]
fn delete_on_empty_collection_is_a_no_op() {
    let mut engine = engine_with(&[]);
    assert!(engine.delete_at(0).is_none());
    assert_eq!(engine.state().cursor(), None);
}

#[test]
fn create_rejected_by_store_is_rolled_back() {
    let mut engine = engine_with(&[]);
    engine.draft_mut().question = "A".into();
    engine.draft_mut().answer = "B".into();
    let command = engine.submit_draft().unwrap();
    assert_eq!(
        command.action,
        StoreAction::Create {
            fields: CardFields::new("A", "B")
        }
    );
    // Shown immediately.
    assert_eq!(questions(&engine), vec!["A"]);
    assert_eq!(engine.state().cursor(), Some(0));

    run(&mut engine, &mut FailingStore, command);
    assert!(engine.state().is_empty());
    assert_eq!(engine.state().cursor(), None);
    assert_eq!(engine.pending_count(), 0);
}

#[test]
fn rollback_finds_its_card_after_a_shuffle() {
    let mut engine = engine_with(&[("a", "1"), ("b", "2"), ("c", "3")]);
    engine.draft_mut().question = "new".into();
    engine.draft_mut().answer = "card".into();
    let command = engine.submit_draft().unwrap();
    engine.shuffle();

    run(&mut engine, &mut FailingStore, command);
    let mut remaining = questions(&engine);
    remaining.sort();
    assert_eq!(remaining, vec!["a", "b", "c"]);
}

#[test]
fn failed_update_restores_previous_contents() {
    let mut engine = engine_with(&[("capital of France", "Lyon")]);
    engine.start_edit(0);
    engine.draft_mut().answer = "Paris".into();
    let command = engine.submit_draft().unwrap();
    assert_eq!(engine.state().card(0).unwrap().answer(), "Paris");

    run(&mut engine, &mut FailingStore, command);
    assert_eq!(engine.state().card(0).unwrap().answer(), "Lyon");
}

#[test]
fn shuffle_is_a_permutation() {
    let cards: Vec<(String, String)> = (0..20).map(|i| (format!("q{i}"), format!("a{i}"))).collect();
    let refs: Vec<(&str, &str)> = cards.iter().map(|(q, a)| (q.as_str(), a.as_str())).collect();
    let mut engine = engine_with(&refs);
    engine.next();
    engine.next();
    let before: BTreeSet<String> = questions(&engine).into_iter().collect();

    engine.shuffle();
    let after: Vec<String> = questions(&engine);
    assert_eq!(after.len(), 20);
    assert_eq!(after.into_iter().collect::<BTreeSet<_>>(), before);
    assert_eq!(engine.state().cursor(), Some(2));
    assert_eq!(engine.state().visited(), &BTreeSet::from([2]));
}

#[test]
fn card_added_before_first_load_is_kept_and_saved() {
    let (_dir, mut store) = local_store();
    let mut engine = ReviewEngine::with_rng(1, SmallRng::seed_from_u64(7));
    engine.draft_mut().question = "A".into();
    engine.draft_mut().answer = "B".into();
    let command = engine.submit_draft().unwrap();

    engine.load(vec![Flashcard::new(Some("-old".into()), "old", "card")]);
    run(&mut engine, &mut store, command);

    assert_eq!(questions(&engine), vec!["old", "A"]);
    let saved = fetcher::fetch(&mut store, &user()).unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(engine.state().card(1).unwrap().id, saved[0].id);
}

#[test]
fn damaged_records_file_rolls_back_a_create() {
    let (dir, mut store) = local_store();
    let records = dir.path().join("records.json");
    std::fs::write(&records, "{\"users\": {\"other\": {}}}x").unwrap();

    let mut engine = engine_with(&[]);
    engine.draft_mut().question = "A".into();
    engine.draft_mut().answer = "B".into();
    let command = engine.submit_draft().unwrap();
    run(&mut engine, &mut store, command);

    assert!(engine.state().is_empty());
    assert_eq!(
        std::fs::read_to_string(&records).unwrap(),
        "{\"users\": {\"other\": {}}}x"
    );
}

#[test]
fn full_lifecycle_against_local_store() {
    let (_dir, mut store) = local_store();
    let mut engine = engine_with(&[]);

    for (q, a) in [("first", "1"), ("second", "2")] {
        engine.draft_mut().question = q.into();
        engine.draft_mut().answer = a.into();
        let command = engine.submit_draft().unwrap();
        run(&mut engine, &mut store, command);
    }
    assert!(engine.state().cards().all(|c| c.id.is_some()));

    engine.start_edit(1);
    engine.draft_mut().answer = "two".into();
    let command = engine.submit_draft().unwrap();
    assert!(matches!(command.action, StoreAction::Write { .. }));
    run(&mut engine, &mut store, command);

    let command = engine.delete_at(0).unwrap();
    run(&mut engine, &mut store, command);

    let fetched = fetcher::fetch(&mut store, &user()).unwrap();
    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched[0].fields, CardFields::new("second", "two"));
    assert_eq!(fetched[0].id, engine.state().card(0).unwrap().id);

    // A fresh session sees the same collection.
    let mut reloaded = ReviewEngine::new(2);
    reloaded.load(fetched);
    assert_eq!(reloaded.state().cursor(), Some(0));
    assert_eq!(reloaded.state().visited(), &BTreeSet::from([0]));
}
