use crate::review::card::{CardFields, Flashcard};

/// Unsaved input for one create-or-update.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EditDraft {
    pub question: String,
    pub answer: String,
    /// When set, submitting overwrites the card shown at this position.
    pub editing: Option<usize>,
}

impl EditDraft {
    pub fn for_card(position: usize, card: &Flashcard) -> Self {
        Self {
            question: card.question().to_string(),
            answer: card.answer().to_string(),
            editing: Some(position),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.question.trim().is_empty() && !self.answer.trim().is_empty()
    }

    pub fn is_editing(&self) -> bool {
        self.editing.is_some()
    }

    pub fn fields(&self) -> CardFields {
        CardFields::new(self.question.clone(), self.answer.clone())
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
