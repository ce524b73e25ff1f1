//! Storage backends holding template sources.
//!
//! The [`Storage`] trait is the only contract the compiler pipeline sees:
//! list, read, exists, and write over logical `/`-separated paths relative
//! to the backend root. Pages, blocks, and templates hold an
//! `Arc<dyn Storage>` and never know which variant is behind it.
//!
//! | Backend | Keyspace | Directories |
//! |---|---|---|
//! | [`LocalStorage`] | files under a root directory | real directories |
//! | [`MemoryStorage`] | flat object-store style key map | implied by key prefixes |
//!
//! `write` is only used by template upload.

mod local;
mod memory;

pub use local::LocalStorage;
pub use memory::MemoryStorage;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("No such file or directory: {0}")]
    NotFound(String),
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Kind of a listed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
}

/// One entry returned by [`Storage::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub kind: EntryKind,
}

impl Entry {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
        }
    }

    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Dir,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }
}

/// Trait for template storage backends.
///
/// Implementations must be `Send + Sync`: a template and all of its pages
/// share one backend across worker threads.
pub trait Storage: Send + Sync {
    /// Entries directly under `path`, sorted by name (byte order).
    fn list(&self, path: &str) -> Result<Vec<Entry>, StorageError>;

    /// Full contents of the file at `path`.
    fn read(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    /// Whether a file or directory exists at `path`.
    fn exists(&self, path: &str) -> bool;

    /// Create or replace the file at `path`, creating parents as needed.
    fn write(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Read a file as UTF-8 text (lossy).
    fn read_to_string(&self, path: &str) -> Result<String, StorageError> {
        let bytes = self.read(path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
