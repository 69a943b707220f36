use std::collections::BTreeSet;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::review::card::Flashcard;

/// Process-local identity of a card, stable across reorders and id assignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalKey(u64);

#[derive(Clone, Debug)]
pub struct Entry {
    pub key: LocalKey,
    pub card: Flashcard,
}

/// Ordered cards plus the reviewer's position in them.
///
/// Invariants kept by every transition:
/// - `cursor` is `Some` exactly when there are cards, and always in range;
/// - `visited` only holds positions below `len()`.
#[derive(Clone, Debug, Default)]
pub struct ReviewState {
    entries: Vec<Entry>,
    cursor: Option<usize>,
    is_flipped: bool,
    visited: BTreeSet<usize>,
    next_key: u64,
}

impl ReviewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn is_flipped(&self) -> bool {
        self.is_flipped
    }

    pub fn visited(&self) -> &BTreeSet<usize> {
        &self.visited
    }

    pub fn cards(&self) -> impl Iterator<Item = &Flashcard> {
        self.entries.iter().map(|e| &e.card)
    }

    pub fn card(&self, position: usize) -> Option<&Flashcard> {
        self.entries.get(position).map(|e| &e.card)
    }

    pub fn current(&self) -> Option<&Flashcard> {
        self.cursor.and_then(|c| self.card(c))
    }

    pub fn key_at(&self, position: usize) -> Option<LocalKey> {
        self.entries.get(position).map(|e| e.key)
    }

    pub fn position_of(&self, key: LocalKey) -> Option<usize> {
        self.entries.iter().position(|e| e.key == key)
    }

    pub fn card_mut(&mut self, key: LocalKey) -> Option<&mut Flashcard> {
        self.entries.iter_mut().find(|e| e.key == key).map(|e| &mut e.card)
    }

    /// Replaces the whole collection.
    pub fn load(&mut self, cards: Vec<Flashcard>) {
        self.entries.clear();
        for card in cards {
            self.push(card);
        }
        self.visited.clear();
        self.cursor = if self.entries.is_empty() { None } else { Some(0) };
        if let Some(c) = self.cursor {
            self.visited.insert(c);
        }
    }

    /// Replaces the collection like [`ReviewState::load`], but carries over the
    /// entries whose keys `keep` accepts, appended after the loaded cards.
    pub fn load_keeping(&mut self, cards: Vec<Flashcard>, keep: impl Fn(LocalKey) -> bool) {
        let carried: Vec<Entry> = std::mem::take(&mut self.entries)
            .into_iter()
            .filter(|e| keep(e.key))
            .collect();
        self.load(cards);
        if carried.is_empty() {
            return;
        }
        self.entries.extend(carried);
        if self.cursor.is_none() {
            self.cursor = Some(0);
            self.visited.insert(0);
        }
    }

    /// Appends a card and returns its local key.
    pub fn push(&mut self, card: Flashcard) -> LocalKey {
        let key = LocalKey(self.next_key);
        self.next_key += 1;
        self.entries.push(Entry { key, card });
        if self.cursor.is_none() {
            self.cursor = Some(0);
            self.visited.insert(0);
        }
        key
    }

    pub fn next(&mut self) {
        let len = self.entries.len();
        if let Some(c) = self.cursor {
            let next = (c + 1) % len;
            self.cursor = Some(next);
            self.visited.insert(next);
        }
    }

    pub fn prev(&mut self) {
        let len = self.entries.len();
        if let Some(c) = self.cursor {
            let prev = if c == 0 { len - 1 } else { c - 1 };
            self.cursor = Some(prev);
            self.visited.insert(prev);
        }
    }

    pub fn flip(&mut self) {
        self.is_flipped = !self.is_flipped;
    }

    /// Jumps straight to `position`, question side up.
    pub fn select(&mut self, position: usize) {
        if position < self.entries.len() {
            self.cursor = Some(position);
            self.is_flipped = false;
            self.visited.insert(position);
        }
    }

    /// Uniformly permutes the cards. The cursor keeps its position, so it
    /// usually lands on a different card, and progress restarts from there.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.entries.shuffle(rng);
        self.visited.clear();
        if let Some(c) = self.cursor {
            self.visited.insert(c);
        }
    }

    /// Removes the card with `key`, returning where it was.
    pub fn remove(&mut self, key: LocalKey) -> Option<usize> {
        let position = self.position_of(key)?;
        let old_len = self.entries.len();
        self.entries.remove(position);
        let len = self.entries.len();

        if len == 0 {
            self.cursor = None;
            self.visited.clear();
            return Some(position);
        }

        if let Some(c) = self.cursor {
            let mut c = c;
            if c == position && position == old_len - 1 {
                c -= 1;
            }
            self.cursor = Some(c.min(len - 1));
        }
        self.visited.retain(|&p| p < len);
        Some(position)
    }

    /// `(viewed, total)` for the progress display.
    pub fn progress(&self) -> (usize, usize) {
        (self.visited.len(), self.entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn deck(n: usize) -> ReviewState {
        let mut state = ReviewState::new();
        state.load(
            (0..n)
                .map(|i| Flashcard::new(Some(format!("id{i}")), format!("q{i}"), format!("a{i}")))
                .collect(),
        );
        state
    }

    fn assert_invariants(state: &ReviewState) {
        assert_eq!(state.cursor().is_some(), !state.is_empty());
        if let Some(c) = state.cursor() {
            assert!(c < state.len());
        }
        assert!(state.visited().iter().all(|&p| p < state.len()));
    }

    #[test]
    fn test_load_resets_cursor_and_visited() {
        let mut state = deck(3);
        state.next();
        state.next();
        state.load(vec![Flashcard::new(None, "q", "a"), Flashcard::new(None, "q", "a")]);
        assert_eq!(state.cursor(), Some(0));
        assert_eq!(state.visited().iter().copied().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_load_empty() {
        let mut state = deck(2);
        state.load(Vec::new());
        assert_eq!(state.cursor(), None);
        assert!(state.visited().is_empty());
        assert_invariants(&state);
    }

    #[test]
    fn test_next_len_times_is_identity() {
        for len in 1..6 {
            for start in 0..len {
                let mut state = deck(len);
                state.select(start);
                for _ in 0..len {
                    state.next();
                }
                assert_eq!(state.cursor(), Some(start));
            }
        }
    }

    #[test]
    fn test_prev_then_next_is_identity() {
        let mut state = deck(5);
        state.select(2);
        state.prev();
        state.next();
        assert_eq!(state.cursor(), Some(2));
        state.next();
        state.prev();
        assert_eq!(state.cursor(), Some(2));
    }

    #[test]
    fn test_prev_wraps_to_last() {
        let mut state = deck(4);
        state.prev();
        assert_eq!(state.cursor(), Some(3));
        assert!(state.visited().contains(&3));
    }

    #[test]
    fn test_navigation_on_empty_is_noop() {
        let mut state = ReviewState::new();
        state.next();
        state.prev();
        state.select(0);
        assert_eq!(state.cursor(), None);
        assert_invariants(&state);
    }

    #[test]
    fn test_flip_persists_across_navigation() {
        let mut state = deck(3);
        state.flip();
        state.next();
        assert!(state.is_flipped());
        state.flip();
        assert!(!state.is_flipped());
    }

    #[test]
    fn test_select_unflips() {
        let mut state = deck(3);
        state.flip();
        state.select(2);
        assert!(!state.is_flipped());
        assert_eq!(state.cursor(), Some(2));
    }

    #[test]
    fn test_single_card_next_and_shuffle() {
        let mut state = ReviewState::new();
        state.load(vec![Flashcard::new(Some("k".into()), "2+2", "4")]);
        state.next();
        assert_eq!(state.cursor(), Some(0));
        state.shuffle(&mut SmallRng::seed_from_u64(1));
        assert_eq!(state.visited().iter().copied().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_shuffle_is_a_permutation_and_keeps_cursor() {
        let mut state = deck(10);
        state.select(4);
        state.next();
        let mut before: Vec<String> = state.cards().map(|c| c.question().to_string()).collect();
        state.shuffle(&mut SmallRng::seed_from_u64(42));
        let mut after: Vec<String> = state.cards().map(|c| c.question().to_string()).collect();
        before.sort();
        after.sort();
        assert_eq!(before, after);
        assert_eq!(state.cursor(), Some(5));
        assert_eq!(state.visited().iter().copied().collect::<Vec<_>>(), vec![5]);
    }

    #[test]
    fn test_remove_last_at_cursor_steps_back() {
        let mut state = deck(4);
        state.select(3);
        let key = state.key_at(3).unwrap();
        state.remove(key);
        assert_eq!(state.cursor(), Some(2));
        assert_invariants(&state);
    }

    #[test]
    fn test_remove_before_cursor_keeps_index() {
        let mut state = deck(4);
        state.select(2);
        let key = state.key_at(0).unwrap();
        state.remove(key);
        assert_eq!(state.cursor(), Some(2));
        assert_invariants(&state);
    }

    #[test]
    fn test_remove_clamps_cursor_past_end() {
        let mut state = deck(3);
        state.select(2);
        state.visited.insert(1);
        let key = state.key_at(1).unwrap();
        state.remove(key);
        assert_eq!(state.cursor(), Some(1));
        assert_invariants(&state);
    }

    #[test]
    fn test_remove_only_card_empties() {
        let mut state = deck(1);
        let key = state.key_at(0).unwrap();
        assert_eq!(state.remove(key), Some(0));
        assert_eq!(state.cursor(), None);
        assert!(state.visited().is_empty());
    }

    #[test]
    fn test_remove_unknown_key() {
        let mut state = deck(2);
        let key = state.key_at(0).unwrap();
        state.remove(key);
        assert_eq!(state.remove(key), None);
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_push_into_empty_sets_cursor() {
        let mut state = ReviewState::new();
        state.push(Flashcard::new(None, "q", "a"));
        assert_eq!(state.cursor(), Some(0));
        assert_eq!(state.progress(), (1, 1));
    }

    #[test]
    fn test_progress_counts_visited() {
        let mut state = deck(4);
        state.next();
        assert_eq!(state.progress(), (2, 4));
        assert_eq!(ReviewState::new().progress(), (0, 0));
    }

    #[test]
    fn test_load_keeping_appends_carried_entries() {
        let mut state = ReviewState::new();
        let kept = state.push(Flashcard::new(None, "unsaved", "a"));
        state.push(Flashcard::new(None, "dropped", "b"));

        state.load_keeping(vec![Flashcard::new(Some("k".into()), "fetched", "c")], |key| key == kept);
        let questions: Vec<&str> = state.cards().map(|c| c.question()).collect();
        assert_eq!(questions, vec!["fetched", "unsaved"]);
        assert_eq!(state.position_of(kept), Some(1));
        assert_eq!(state.cursor(), Some(0));
        assert_invariants(&state);
    }

    #[test]
    fn test_load_keeping_into_empty_fetch_sets_cursor() {
        let mut state = ReviewState::new();
        let kept = state.push(Flashcard::new(None, "unsaved", "a"));
        state.load_keeping(Vec::new(), |key| key == kept);
        assert_eq!(state.len(), 1);
        assert_eq!(state.cursor(), Some(0));
        assert_invariants(&state);
    }
}
