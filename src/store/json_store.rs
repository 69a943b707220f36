use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Serialize, de::DeserializeOwned};

use crate::store::StoreError;

/// A directory of small JSON documents, each replaced atomically on save.
#[derive(Clone, Debug)]
pub struct JsonStore {
    base_dir: PathBuf,
}

impl JsonStore {
    pub fn with_base_dir(base_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn file_path(&self, name: &str) -> PathBuf {
        self.base_dir.join(name)
    }

    /// `Ok(None)` only when the document does not exist. A document that is
    /// there but cannot be read or parsed is an error, so callers never
    /// overwrite data they failed to see.
    pub fn try_load<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, StoreError> {
        let path = self.file_path(name);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&content).map(Some).map_err(|e| {
            tracing::error!(file = %path.display(), error = %e, "unparsable document");
            e.into()
        })
    }

    /// Best-effort read for disposable documents; anything unreadable is absent.
    pub fn load_opt<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        let content = fs::read_to_string(self.file_path(name)).ok()?;
        serde_json::from_str(&content).ok()
    }

    pub fn save<T: Serialize>(&self, name: &str, data: &T) -> Result<()> {
        let path = self.file_path(name);
        let tmp_path = path.with_extension("tmp");

        let json = serde_json::to_string_pretty(data)?;
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;

        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    pub fn remove(&self, name: &str) -> Result<()> {
        let path = self.file_path(name);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("flashy")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn make_test_store() -> (TempDir, JsonStore) {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::with_base_dir(dir.path().to_path_buf()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_missing_document_is_absent() {
        let (_dir, store) = make_test_store();
        let data: Option<BTreeMap<String, u32>> = store.try_load("nothing.json").unwrap();
        assert!(data.is_none());
        assert!(store.load_opt::<BTreeMap<String, u32>>("nothing.json").is_none());
    }

    #[test]
    fn test_save_leaves_no_tmp_file() {
        let (dir, store) = make_test_store();
        let mut data = BTreeMap::new();
        data.insert("a".to_string(), 1u32);
        store.save("doc.json", &data).unwrap();

        let loaded: Option<BTreeMap<String, u32>> = store.try_load("doc.json").unwrap();
        assert_eq!(loaded, Some(data));
        let tmp_files: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("tmp"))
            .collect();
        assert!(tmp_files.is_empty(), "no residual .tmp files");
    }

    #[test]
    fn test_corrupt_document_is_an_error() {
        let (_dir, store) = make_test_store();
        fs::write(store.file_path("doc.json"), "{not json").unwrap();
        let loaded = store.try_load::<BTreeMap<String, u32>>("doc.json");
        assert!(matches!(loaded, Err(StoreError::Serde(_))));
        assert!(store.load_opt::<BTreeMap<String, u32>>("doc.json").is_none());
    }

    #[test]
    fn test_unreadable_document_is_an_error() {
        let (_dir, store) = make_test_store();
        fs::create_dir(store.file_path("doc.json")).unwrap();
        let loaded = store.try_load::<BTreeMap<String, u32>>("doc.json");
        assert!(matches!(loaded, Err(StoreError::Io(_))));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let (_dir, store) = make_test_store();
        store.save("doc.json", &1u32).unwrap();
        store.remove("doc.json").unwrap();
        store.remove("doc.json").unwrap();
        assert!(!store.file_path("doc.json").exists());
    }
}
