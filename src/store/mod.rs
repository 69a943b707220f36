pub mod json_store;
pub mod local;
pub mod push_id;

#[cfg(feature = "network")]
pub mod firebase;

use std::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::auth::UserId;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid key {0:?}")]
    InvalidKey(String),
    #[error("not signed in")]
    Unauthenticated,
    #[error("storage i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed record: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("remote store error: {0}")]
    Remote(String),
}

/// Slash-separated location in the hierarchical record tree.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RecordPath {
    segments: Vec<String>,
}

impl RecordPath {
    pub fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// `users/{uid}/flashcards`
    pub fn flashcards(user: &UserId) -> Result<Self, StoreError> {
        Self::root().child("users")?.child(user.as_str())?.child("flashcards")
    }

    pub fn child(mut self, key: &str) -> Result<Self, StoreError> {
        validate_key(key)?;
        self.segments.push(key.to_string());
        Ok(self)
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for RecordPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

fn validate_key(key: &str) -> Result<(), StoreError> {
    const FORBIDDEN: [char; 6] = ['/', '.', '#', '$', '[', ']'];
    if key.is_empty() || key.chars().any(|c| FORBIDDEN.contains(&c) || c.is_control()) {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Path-addressed hierarchical key-value store, provided by an external service.
///
/// There are no transactions: each call is a single atomic write or read.
pub trait RecordStore: Send {
    /// Reserves a fresh child key under `path`. Nothing is written.
    fn create_child(&mut self, path: &RecordPath) -> Result<String, StoreError>;

    /// Overwrites the value at `path`. Writing `null` deletes it.
    fn write(&mut self, path: &RecordPath, value: Value) -> Result<(), StoreError>;

    fn delete(&mut self, path: &RecordPath) -> Result<(), StoreError>;

    /// Everything at and below `path`, or `null` if nothing is stored there.
    fn read_subtree(&mut self, path: &RecordPath) -> Result<Value, StoreError>;
}
