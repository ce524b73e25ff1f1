//! In-memory storage with object-store semantics.
//!
//! Keys are full paths; directories exist only as key prefixes, the way
//! remote object stores model them. Used for tests and for templates
//! assembled programmatically.

use super::{Entry, Storage, StorageError};
use crate::naming;
use parking_lot::RwLock;
use std::collections::BTreeMap;

#[derive(Default)]
pub struct MemoryStorage {
    objects: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a storage from `(path, content)` pairs.
    pub fn with_files<'a>(files: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let storage = Self::new();
        {
            let mut objects = storage.objects.write();
            for (path, content) in files {
                objects.insert(naming::join(&[path]), content.as_bytes().to_vec());
            }
        }
        storage
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

impl Storage for MemoryStorage {
    fn list(&self, path: &str) -> Result<Vec<Entry>, StorageError> {
        let base = naming::join(&[path]);
        let prefix = if base.is_empty() {
            String::new()
        } else {
            format!("{base}/")
        };

        let objects = self.objects.read();
        let mut entries: BTreeMap<String, Entry> = BTreeMap::new();
        for key in objects.keys().filter(|k| k.starts_with(&prefix)) {
            let rest = &key[prefix.len()..];
            let entry = match rest.split_once('/') {
                Some((dir, _)) => Entry::dir(dir),
                None => Entry::file(rest),
            };
            entries.entry(entry.name.clone()).or_insert(entry);
        }

        if entries.is_empty() && !base.is_empty() {
            return Err(StorageError::NotFound(path.to_string()));
        }
        Ok(entries.into_values().collect())
    }

    fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        self.objects
            .read()
            .get(&naming::join(&[path]))
            .cloned()
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    fn exists(&self, path: &str) -> bool {
        let key = naming::join(&[path]);
        let objects = self.objects.read();
        if objects.contains_key(&key) {
            return true;
        }
        let prefix = format!("{key}/");
        objects.keys().any(|k| k.starts_with(&prefix))
    }

    fn write(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        self.objects
            .write()
            .insert(naming::join(&[path]), bytes.to_vec());
        Ok(())
    }
}
