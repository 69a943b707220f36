use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key of a flashcard in the record store.
pub type CardId = String;

/// The stored body of a flashcard. The id is the record key, never a field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardFields {
    pub question: String,
    pub answer: String,
}

impl CardFields {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({ "question": self.question, "answer": self.answer })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Flashcard {
    /// `None` until the store has acknowledged the first write.
    pub id: Option<CardId>,
    pub fields: CardFields,
}

impl Flashcard {
    pub fn new(id: Option<CardId>, question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            id,
            fields: CardFields::new(question, answer),
        }
    }

    pub fn question(&self) -> &str {
        &self.fields.question
    }

    pub fn answer(&self) -> &str {
        &self.fields.answer
    }
}
