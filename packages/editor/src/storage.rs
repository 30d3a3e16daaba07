//! # Persistence
//!
//! Key-value storage behind a trait so the session can run against the
//! filesystem or an in-memory map in tests.
//!
//! | Key                        | Value                         |
//! |----------------------------|-------------------------------|
//! | `article-editor-content`   | block array (never empty)     |
//! | `article-editor-meta`      | article metadata              |
//! | `article-editor-container` | container settings            |
//! | `article-preview`          | preview snapshot              |

use crate::block::Block;
use crate::document::{ArticleMeta, ContainerSettings, Document, PreviewArticle};
use crate::id_generator::IdGenerator;
use crate::serializer::blocks_from_value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

pub const CONTENT_KEY: &str = "article-editor-content";
pub const META_KEY: &str = "article-editor-meta";
pub const CONTAINER_KEY: &str = "article-editor-container";
pub const PREVIEW_KEY: &str = "article-preview";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Storage quota exceeded writing {key} ({size} bytes)")]
    QuotaExceeded { key: String, size: usize },
}

/// String key-value store
pub trait Storage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removing a missing key is not an error
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// In-memory storage with an optional per-value size limit
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    pub entries: HashMap<String, String>,
    quota: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject values larger than `bytes`
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            entries: HashMap::new(),
            quota: Some(bytes),
        }
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if let Some(quota) = self.quota {
            if value.len() > quota {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    size: value.len(),
                });
            }
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory
#[derive(Debug, Clone)]
pub struct DirectoryStorage {
    root: PathBuf,
}

impl DirectoryStorage {
    /// Create the directory if needed
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

impl Storage for DirectoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        std::fs::write(self.path_for(key), value)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Whatever survived from the previous session; absent or unreadable keys are `None`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistedState {
    pub blocks: Option<Vec<Block>>,
    pub meta: Option<ArticleMeta>,
    pub container: Option<ContainerSettings>,
}

impl PersistedState {
    /// Overlay the persisted parts onto `doc`
    pub fn into_document(self, mut doc: Document) -> Document {
        if let Some(blocks) = self.blocks {
            doc.blocks = blocks;
        }
        if let Some(meta) = self.meta {
            doc.article_meta = meta;
        }
        if let Some(container) = self.container {
            doc.container_settings = container;
        }
        doc
    }
}

/// Read the three persisted keys. Failures are logged and treated as absent.
pub fn load_persisted(storage: &dyn Storage, ids: &mut IdGenerator) -> PersistedState {
    let blocks = read_key(storage, CONTENT_KEY).and_then(|raw| {
        match serde_json::from_str(&raw)
            .map_err(|e| e.to_string())
            .and_then(|value| blocks_from_value(value, ids).map_err(|e| e.to_string()))
        {
            Ok(blocks) => Some(blocks),
            Err(error) => {
                warn!(key = CONTENT_KEY, %error, "Discarding unreadable saved blocks");
                None
            }
        }
    });

    PersistedState {
        blocks,
        meta: read_json(storage, META_KEY),
        container: read_json(storage, CONTAINER_KEY),
    }
}

fn read_key(storage: &dyn Storage, key: &str) -> Option<String> {
    match storage.get(key) {
        Ok(value) => value,
        Err(error) => {
            warn!(key, %error, "Failed to read saved state");
            None
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(storage: &dyn Storage, key: &str) -> Option<T> {
    let raw = read_key(storage, key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(error) => {
            warn!(key, %error, "Discarding unreadable saved state");
            None
        }
    }
}

/// Write the document. An empty block list leaves the saved blocks untouched.
pub fn save_persisted(storage: &mut dyn Storage, doc: &Document) -> Result<(), StorageError> {
    if !doc.blocks.is_empty() {
        storage.set(CONTENT_KEY, &serde_json::to_string(&doc.blocks)?)?;
    }
    storage.set(META_KEY, &serde_json::to_string(&doc.article_meta)?)?;
    storage.set(CONTAINER_KEY, &serde_json::to_string(&doc.container_settings)?)?;

    debug!(blocks = doc.blocks.len(), "Saved article");
    Ok(())
}

/// Remove the three document keys; the preview key is left alone
pub fn clear_persisted(storage: &mut dyn Storage) -> Result<(), StorageError> {
    for key in [CONTENT_KEY, META_KEY, CONTAINER_KEY] {
        storage.remove(key)?;
    }
    Ok(())
}

pub fn write_preview(storage: &mut dyn Storage, preview: &PreviewArticle) -> Result<(), StorageError> {
    storage.set(PREVIEW_KEY, &serde_json::to_string(preview)?)
}

pub fn read_preview(storage: &dyn Storage) -> Result<Option<PreviewArticle>, StorageError> {
    match storage.get(PREVIEW_KEY)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockType;

    fn ids() -> IdGenerator {
        IdGenerator::from_seed("st".to_string())
    }

    fn document() -> Document {
        let mut doc = Document::default();
        doc.article_meta.title = "Saved".to_string();
        doc.blocks = vec![Block::new_default("a", BlockType::Quote).with_content("q")];
        doc
    }

    #[test]
    fn test_save_and_load() {
        let mut storage = MemoryStorage::new();
        save_persisted(&mut storage, &document()).unwrap();

        let state = load_persisted(&storage, &mut ids());
        assert_eq!(state.blocks, Some(document().blocks));
        assert_eq!(state.meta.unwrap().title, "Saved");
        assert!(state.container.is_some());
    }

    #[test]
    fn test_empty_blocks_not_written() {
        let mut storage = MemoryStorage::new();
        save_persisted(&mut storage, &document()).unwrap();

        let mut emptied = document();
        emptied.blocks.clear();
        save_persisted(&mut storage, &emptied).unwrap();

        // The last non-empty tree survives
        let state = load_persisted(&storage, &mut ids());
        assert_eq!(state.blocks.unwrap().len(), 1);
    }

    #[test]
    fn test_corrupt_keys_are_absent() {
        let mut storage = MemoryStorage::new();
        storage.set(CONTENT_KEY, "{broken").unwrap();
        storage.set(META_KEY, "[1,2]").unwrap();

        let state = load_persisted(&storage, &mut ids());
        assert_eq!(state, PersistedState::default());
    }

    #[test]
    fn test_restored_tags_are_unique() {
        let mut storage = MemoryStorage::new();
        storage.set(META_KEY, r#"{"title":"T","tags":["x","y","x"]}"#).unwrap();

        let state = load_persisted(&storage, &mut ids());
        assert_eq!(state.meta.unwrap().tags, vec!["x", "y"]);
    }

    #[test]
    fn test_quota() {
        let mut storage = MemoryStorage::with_quota(16);
        let err = save_persisted(&mut storage, &document()).unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { .. }));
    }

    #[test]
    fn test_clear_keeps_preview() {
        let mut storage = MemoryStorage::new();
        save_persisted(&mut storage, &document()).unwrap();
        write_preview(&mut storage, &PreviewArticle::from(&document())).unwrap();

        clear_persisted(&mut storage).unwrap();
        assert_eq!(load_persisted(&storage, &mut ids()), PersistedState::default());
        assert!(read_preview(&storage).unwrap().is_some());
    }

    #[test]
    fn test_directory_storage() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = DirectoryStorage::open(dir.path().join("state")).unwrap();

        assert_eq!(storage.get(META_KEY).unwrap(), None);
        storage.set(META_KEY, "{}").unwrap();
        assert!(storage.root().join("article-editor-meta.json").exists());
        assert_eq!(storage.get(META_KEY).unwrap().as_deref(), Some("{}"));

        storage.remove(META_KEY).unwrap();
        storage.remove(META_KEY).unwrap();
        assert_eq!(storage.get(META_KEY).unwrap(), None);
    }
}
