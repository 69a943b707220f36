//! Review and editing state paired with record store writes.
//!
//! Operations that touch the store update local state right away and return a
//! [`StoreCommand`]. Whoever owns the store runs the command and hands the
//! resulting [`StoreOutcome`] back to [`ReviewEngine::complete`], which keeps
//! or rolls back the local change. Outcomes find their card through its
//! [`LocalKey`], so reordering or deleting in between is harmless.

use std::collections::{HashMap, HashSet};

use rand::SeedableRng;
use rand::rngs::SmallRng;

use crate::auth::UserId;
use crate::review::card::{CardFields, CardId, Flashcard};
use crate::review::draft::EditDraft;
use crate::review::state::{LocalKey, ReviewState};
use crate::store::{RecordPath, RecordStore, StoreError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OpId(u64);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreAction {
    /// Reserve a new key under the user's collection, then write the fields there.
    Create { fields: CardFields },
    Write { id: CardId, fields: CardFields },
    Delete { id: CardId },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreCommand {
    pub op: OpId,
    pub action: StoreAction,
}

#[derive(Debug)]
pub struct StoreOutcome {
    pub op: OpId,
    /// The generated id for creates, `None` otherwise.
    pub result: Result<Option<CardId>, StoreError>,
}

impl StoreCommand {
    pub fn execute(&self, store: &mut dyn RecordStore, user: &UserId) -> StoreOutcome {
        StoreOutcome {
            op: self.op,
            result: self.run(store, user),
        }
    }

    fn run(&self, store: &mut dyn RecordStore, user: &UserId) -> Result<Option<CardId>, StoreError> {
        let collection = RecordPath::flashcards(user)?;
        match &self.action {
            StoreAction::Create { fields } => {
                let id = store.create_child(&collection)?;
                store.write(&collection.child(&id)?, fields.to_value())?;
                Ok(Some(id))
            }
            StoreAction::Write { id, fields } => {
                store.write(&collection.child(id)?, fields.to_value())?;
                Ok(None)
            }
            StoreAction::Delete { id } => {
                store.delete(&collection.child(id)?)?;
                Ok(None)
            }
        }
    }
}

#[derive(Clone, Debug)]
enum Pending {
    Create {
        key: LocalKey,
    },
    Update {
        key: LocalKey,
        previous: CardFields,
        written: CardFields,
    },
    Delete {
        key: LocalKey,
    },
}

pub struct ReviewEngine {
    state: ReviewState,
    draft: EditDraft,
    /// The card `draft.editing` was opened on, followed across reorders.
    edit_target: Option<LocalKey>,
    pending: HashMap<OpId, Pending>,
    next_op: u64,
    epoch: u64,
    rng: SmallRng,
}

impl ReviewEngine {
    /// `epoch` tags this engine's session; completions from other epochs are
    /// the caller's to discard.
    pub fn new(epoch: u64) -> Self {
        Self::with_rng(epoch, SmallRng::from_entropy())
    }

    pub fn with_rng(epoch: u64, rng: SmallRng) -> Self {
        Self {
            state: ReviewState::new(),
            draft: EditDraft::default(),
            edit_target: None,
            pending: HashMap::new(),
            next_op: 0,
            epoch,
            rng,
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn state(&self) -> &ReviewState {
        &self.state
    }

    pub fn draft(&self) -> &EditDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut EditDraft {
        &mut self.draft
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Replaces the collection with fetched cards. Cards whose create is
    /// still in flight were not part of the fetch and stay at the end.
    pub fn load(&mut self, cards: Vec<Flashcard>) {
        let unsaved: HashSet<LocalKey> = self
            .pending
            .values()
            .filter_map(|pending| match pending {
                Pending::Create { key } => Some(*key),
                _ => None,
            })
            .collect();
        tracing::debug!(count = cards.len(), unsaved = unsaved.len(), "loaded flashcards");
        self.state.load_keeping(cards, |key| unsaved.contains(&key));
        self.sync_edit_position();
    }

    pub fn next(&mut self) {
        self.state.next();
    }

    pub fn prev(&mut self) {
        self.state.prev();
    }

    pub fn flip(&mut self) {
        self.state.flip();
    }

    pub fn select(&mut self, position: usize) {
        self.state.select(position);
    }

    pub fn shuffle(&mut self) {
        self.state.shuffle(&mut self.rng);
    }

    /// Starts editing the card at `position`, discarding any unsaved draft.
    pub fn start_edit(&mut self, position: usize) {
        if let (Some(key), Some(card)) = (self.state.key_at(position), self.state.card(position)) {
            self.draft = EditDraft::for_card(position, card);
            self.edit_target = Some(key);
        }
    }

    pub fn cancel_edit(&mut self) {
        self.draft.clear();
        self.edit_target = None;
    }

    fn sync_edit_position(&mut self) {
        if let Some(position) = self.edit_target.and_then(|key| self.state.position_of(key)) {
            self.draft.editing = Some(position);
        }
    }

    fn issue(&mut self, pending: Pending, action: StoreAction) -> StoreCommand {
        let op = OpId(self.next_op);
        self.next_op += 1;
        self.pending.insert(op, pending);
        StoreCommand { op, action }
    }

    /// Saves the draft as a new card or over the card being edited.
    ///
    /// An incomplete draft is left untouched. Otherwise the draft is cleared,
    /// even if the edited card turns out to be gone.
    pub fn submit_draft(&mut self) -> Option<StoreCommand> {
        if !self.draft.is_complete() {
            return None;
        }
        let draft = std::mem::take(&mut self.draft);
        let target = self.edit_target.take();
        let fields = draft.fields();

        match draft.editing {
            Some(position) => {
                let key = match target {
                    Some(key) => key,
                    None => self.state.key_at(position)?,
                };
                let card = self.state.card_mut(key)?;
                let Some(id) = card.id.clone() else {
                    tracing::debug!(position, "edited card has no id yet, skipping update");
                    return None;
                };
                let previous = std::mem::replace(&mut card.fields, fields.clone());
                Some(self.issue(
                    Pending::Update {
                        key,
                        previous,
                        written: fields.clone(),
                    },
                    StoreAction::Write { id, fields },
                ))
            }
            None => {
                let key = self.state.push(Flashcard {
                    id: None,
                    fields: fields.clone(),
                });
                Some(self.issue(Pending::Create { key }, StoreAction::Create { fields }))
            }
        }
    }

    /// Asks the store to delete the card at `position`. The card stays until
    /// the store confirms.
    pub fn delete_at(&mut self, position: usize) -> Option<StoreCommand> {
        let key = self.state.key_at(position)?;
        let id = self.state.card(position)?.id.clone()?;
        Some(self.issue(Pending::Delete { key }, StoreAction::Delete { id }))
    }

    /// Reconciles local state with the store's answer to an earlier command.
    pub fn complete(&mut self, outcome: StoreOutcome) {
        let Some(pending) = self.pending.remove(&outcome.op) else {
            tracing::debug!(op = ?outcome.op, "ignoring outcome for unknown operation");
            return;
        };

        match (pending, outcome.result) {
            (Pending::Create { key }, Ok(id)) => {
                if let Some(card) = self.state.card_mut(key) {
                    card.id = id;
                }
                tracing::info!("flashcard saved");
            }
            (Pending::Create { key }, Err(e)) => {
                tracing::warn!(error = %e, "saving flashcard failed, removing it");
                self.state.remove(key);
            }
            (Pending::Update { .. }, Ok(_)) => {
                tracing::info!("flashcard updated");
            }
            (
                Pending::Update {
                    key,
                    previous,
                    written,
                },
                Err(e),
            ) => {
                tracing::warn!(error = %e, "updating flashcard failed, restoring it");
                if let Some(card) = self.state.card_mut(key) {
                    // A newer edit already replaced what we wrote; leave it.
                    if card.fields == written {
                        card.fields = previous;
                    }
                }
            }
            (Pending::Delete { key }, Ok(_)) => {
                self.state.remove(key);
                tracing::info!("flashcard deleted");
            }
            (Pending::Delete { .. }, Err(e)) => {
                tracing::warn!(error = %e, "deleting flashcard failed");
            }
        }
        self.sync_edit_position();
    }
}
