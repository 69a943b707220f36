use serde_json::{Map, Value};

use crate::store::json_store::JsonStore;
use crate::store::push_id::PushIdGenerator;
use crate::store::{RecordPath, RecordStore, StoreError};

const RECORDS_FILE: &str = "records.json";

/// The whole record tree kept in one JSON document.
///
/// Every write rewrites the document, which is fine at flashcard scale.
pub struct LocalRecordStore {
    files: JsonStore,
    ids: PushIdGenerator,
}

impl LocalRecordStore {
    pub fn open(files: JsonStore) -> Self {
        Self {
            files,
            ids: PushIdGenerator::new(),
        }
    }

    fn load_tree(&self) -> Result<Value, StoreError> {
        Ok(self.files.try_load::<Value>(RECORDS_FILE)?.unwrap_or(Value::Null))
    }

    fn save_tree(&self, tree: &Value) -> Result<(), StoreError> {
        self.files
            .save(RECORDS_FILE, tree)
            .map_err(|e| StoreError::Io(std::io::Error::other(e.to_string())))
    }
}

/// Sets `value` at `segments` below `node`, creating objects on the way.
/// A `null` value removes the entry and prunes emptied parents.
fn set_at(node: &mut Value, segments: &[String], value: Value) {
    let Some((first, rest)) = segments.split_first() else {
        *node = value;
        return;
    };
    if value.is_null() && !node.is_object() {
        return;
    }
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    let Value::Object(map) = &mut *node else {
        return;
    };
    if rest.is_empty() {
        if value.is_null() {
            map.remove(first);
        } else {
            map.insert(first.clone(), value);
        }
    } else {
        let child = map.entry(first.clone()).or_insert(Value::Null);
        set_at(child, rest, value);
        if child.is_null() || child.as_object().is_some_and(Map::is_empty) {
            map.remove(first);
        }
    }
    if map.is_empty() {
        *node = Value::Null;
    }
}

fn get_at<'a>(node: &'a Value, segments: &[String]) -> Option<&'a Value> {
    segments.iter().try_fold(node, |current, key| current.get(key))
}

impl RecordStore for LocalRecordStore {
    fn create_child(&mut self, path: &RecordPath) -> Result<String, StoreError> {
        let id = self.ids.next_id();
        tracing::debug!(%path, %id, "reserved child key");
        Ok(id)
    }

    fn write(&mut self, path: &RecordPath, value: Value) -> Result<(), StoreError> {
        let mut tree = self.load_tree()?;
        set_at(&mut tree, path.segments(), value);
        self.save_tree(&tree)
    }

    fn delete(&mut self, path: &RecordPath) -> Result<(), StoreError> {
        self.write(path, Value::Null)
    }

    fn read_subtree(&mut self, path: &RecordPath) -> Result<Value, StoreError> {
        let tree = self.load_tree()?;
        Ok(get_at(&tree, path.segments()).cloned().unwrap_or(Value::Null))
    }
}
