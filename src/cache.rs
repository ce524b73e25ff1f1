//! Compile cache shared by every page, block, and component of a template.
//!
//! Transpiling TypeScript and compiling LESS are the only expensive steps in
//! the pipeline. Each entity memoizes its own artifact, but that memo dies
//! with the entity on [`Template::reload`](crate::template::Template::reload).
//! This cache sits underneath and survives reloads, so unchanged sources are
//! never recompiled.
//!
//! ## Cache keys
//!
//! Entries are keyed by the storage path of the source unit. Each entry
//! stores a SHA-256 fingerprint of the dialect tag plus the source text next
//! to the compiled output. A lookup is a hit only when the fingerprint still
//! matches; an edited source replaces its entry, so the cache holds at most
//! one entry per unit.
//!
//! - **`ts`**: TypeScript → JavaScript
//! - **`less`**: LESS → CSS
//!
//! Failures are not cached. A source that fails to compile is retried on
//! the next request, once the author has fixed it.

use parking_lot::{Mutex, RwLock};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// SHA-256 fingerprint of a dialect tag and source text, as a hex string.
pub fn fingerprint(dialect: &str, source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(dialect.as_bytes());
    hasher.update(b"\0");
    hasher.update(source.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone)]
struct Entry {
    fingerprint: String,
    compiled: String,
}

#[derive(Default)]
pub struct CompileCache {
    entries: RwLock<HashMap<String, Entry>>,
    stats: Mutex<CacheStats>,
}

impl CompileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached output for the unit at `path`, if it was compiled from the
    /// source with this fingerprint.
    pub fn get(&self, path: &str, fingerprint: &str) -> Option<String> {
        self.entries
            .read()
            .get(path)
            .filter(|entry| entry.fingerprint == fingerprint)
            .map(|entry| entry.compiled.clone())
    }

    /// Store output for the unit at `path`, replacing whatever it held.
    pub fn insert(&self, path: String, fingerprint: String, compiled: String) {
        self.entries.write().insert(
            path,
            Entry {
                fingerprint,
                compiled,
            },
        );
    }

    /// Return the cached output for the unit at `path`, or run `compile` on
    /// `source` and keep its result.
    pub fn get_or_compile<E>(
        &self,
        dialect: &str,
        path: &str,
        source: &str,
        compile: impl FnOnce(&str) -> Result<String, E>,
    ) -> Result<String, E> {
        let key = fingerprint(dialect, source);
        if let Some(hit) = self.get(path, &key) {
            debug!(dialect, path, key = &key[..12], "compile cache hit");
            self.stats.lock().hit();
            return Ok(hit);
        }
        let compiled = compile(source)?;
        self.stats.lock().miss();
        self.insert(path.to_string(), key, compiled.clone());
        Ok(compiled)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
        *self.stats.lock() = CacheStats::default();
    }

    /// Snapshot of hit/miss counters since creation or the last `clear`.
    pub fn stats(&self) -> CacheStats {
        self.stats.lock().clone()
    }
}

/// Summary of cache performance.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub misses: u32,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn miss(&mut self) {
        self.misses += 1;
    }

    pub fn total(&self) -> u32 {
        self.hits + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 {
            write!(
                f,
                "{} cached, {} compiled ({} total)",
                self.hits,
                self.misses,
                self.total()
            )
        } else {
            write!(f, "{} compiled", self.misses)
        }
    }
}
