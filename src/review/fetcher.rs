use serde_json::Value;

use crate::auth::UserId;
use crate::review::card::{CardFields, Flashcard};
use crate::store::{RecordPath, RecordStore, StoreError};

/// Reads every flashcard the user owns, in key order.
pub fn fetch(store: &mut dyn RecordStore, user: &UserId) -> Result<Vec<Flashcard>, StoreError> {
    let subtree = store.read_subtree(&RecordPath::flashcards(user)?)?;
    Ok(cards_from_subtree(subtree))
}

/// Push ids sort chronologically, so key order is creation order.
pub fn cards_from_subtree(subtree: Value) -> Vec<Flashcard> {
    let Value::Object(map) = subtree else {
        if !subtree.is_null() {
            tracing::warn!("flashcard collection is not an object, ignoring it");
        }
        return Vec::new();
    };

    let mut entries: Vec<(String, Value)> = map.into_iter().collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    entries
        .into_iter()
        .filter_map(|(id, value)| match serde_json::from_value::<CardFields>(value) {
            Ok(fields) => Some(Flashcard {
                id: Some(id),
                fields,
            }),
            Err(e) => {
                tracing::warn!(%id, error = %e, "skipping malformed flashcard");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_is_empty() {
        assert!(cards_from_subtree(Value::Null).is_empty());
        assert!(cards_from_subtree(json!([1, 2])).is_empty());
    }

    #[test]
    fn test_sorted_by_key_and_malformed_skipped() {
        let subtree = json!({
            "-Nb": {"question": "second", "answer": "2"},
            "-Na": {"question": "first", "answer": "1"},
            "-Nc": {"question": "no answer"},
        });
        let cards = cards_from_subtree(subtree);
        assert_eq!(
            cards,
            vec![
                Flashcard::new(Some("-Na".into()), "first", "1"),
                Flashcard::new(Some("-Nb".into()), "second", "2"),
            ]
        );
    }
}
