//! Source units: one facet (markup, script, style, data) of a page,
//! block, or component.
//!
//! A unit records where its backing file would live and, once loaded, its
//! text. A file that does not exist loads as empty text; only a storage
//! failure on a file that *does* exist is an error.

use crate::storage::{Storage, StorageError};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceUnit {
    /// Logical file name as exposed to the editor (`404.js`, `/Hero/Hero.ts`).
    pub file: String,
    /// Loaded text. Empty until loaded, and empty for absent files.
    pub code: String,
    /// Full storage path of the backing file.
    path: String,
}

impl SourceUnit {
    pub fn new(file: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            code: String::new(),
            path: path.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Return a copy of this unit with `code` read from storage.
    pub fn loaded(&self, storage: &dyn Storage) -> Result<Self, StorageError> {
        let code = if storage.exists(&self.path) {
            match storage.read_to_string(&self.path) {
                Ok(code) => code,
                // Removed between `exists` and `read`: treat as absent.
                Err(StorageError::NotFound(_)) => String::new(),
                Err(e) => return Err(e),
            }
        } else {
            String::new()
        };
        debug!(path = %self.path, bytes = code.len(), "loaded source unit");
        Ok(Self {
            file: self.file.clone(),
            code,
            path: self.path.clone(),
        })
    }
}

/// Which of a plain/dialect pair (JS/TS, CSS/LESS) contributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pick<'a> {
    /// Served verbatim.
    Plain(&'a SourceUnit),
    /// Needs the dialect collaborator.
    Dialect(&'a SourceUnit),
    Neither,
}

/// Choose the contributing unit. When both exist, `prefer_dialect` decides.
pub fn pick<'a>(plain: &'a SourceUnit, dialect: &'a SourceUnit, prefer_dialect: bool) -> Pick<'a> {
    match (plain.is_empty(), dialect.is_empty()) {
        (true, true) => Pick::Neither,
        (false, true) => Pick::Plain(plain),
        (true, false) => Pick::Dialect(dialect),
        (false, false) if prefer_dialect => Pick::Dialect(dialect),
        (false, false) => Pick::Plain(plain),
    }
}
