//! Asset resolution for template files.
//!
//! An editor asks for `@assets/js/app.js` (or just `js/app.js`). The resolver
//! looks for the file in each search directory in order and returns the
//! first hit with its MIME type:
//!
//! 1. the template's own `__assets/` directory
//! 2. each shared library directory from `sui.toml`, in declaration order

use crate::error::{Kind, Result, SuiError};
use crate::naming;
use crate::storage::{Storage, StorageError};
use std::sync::Arc;
use tracing::debug;

/// Directory holding a template's own assets.
pub const ASSETS_DIR: &str = "__assets";

pub const JAVASCRIPT: &str = "text/javascript; charset=utf-8";
pub const CSS: &str = "text/css; charset=utf-8";

/// A file ready to be served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub content: Vec<u8>,
    pub mime_type: String,
}

impl Asset {
    pub fn new(content: impl Into<Vec<u8>>, mime_type: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn javascript(content: impl Into<Vec<u8>>) -> Self {
        Self::new(content, JAVASCRIPT)
    }

    pub fn css(content: impl Into<Vec<u8>>) -> Self {
        Self::new(content, CSS)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }
}

/// MIME type from a file's extension.
pub fn mime_type(file: &str) -> &'static str {
    let ext = naming::split_extension(naming::base_name(file))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => CSS,
        "js" | "mjs" => JAVASCRIPT,
        "ts" => "application/typescript; charset=utf-8",
        "less" => "text/less; charset=utf-8",
        "json" => "application/json; charset=utf-8",
        "txt" | "md" => "text/plain; charset=utf-8",
        "xml" => "application/xml",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "eot" => "application/vnd.ms-fontobject",
        "map" => "application/json",
        "pdf" => "application/pdf",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}

/// Ordered asset search over a storage backend.
pub struct AssetResolver {
    storage: Arc<dyn Storage>,
    search_paths: Vec<String>,
}

impl AssetResolver {
    /// Resolver for a template at `template_root` with shared `libraries`.
    pub fn new(storage: Arc<dyn Storage>, template_root: &str, libraries: &[String]) -> Self {
        let search_paths = std::iter::once(naming::join(&[template_root, ASSETS_DIR]))
            .chain(libraries.iter().map(|l| naming::join(&[l])))
            .collect();
        Self {
            storage,
            search_paths,
        }
    }

    pub fn search_paths(&self) -> &[String] {
        &self.search_paths
    }

    pub fn resolve(&self, file: &str) -> Result<Asset> {
        let relative = strip_assets_prefix(file);
        if relative.is_empty() || relative.split('/').any(|s| s == "..") {
            return Err(SuiError::not_found(Kind::Asset, file));
        }
        for dir in &self.search_paths {
            let path = naming::join(&[dir, relative]);
            if !self.storage.exists(&path) {
                continue;
            }
            match self.storage.read(&path) {
                Ok(content) => {
                    debug!(file, %path, "resolved asset");
                    return Ok(Asset::new(content, mime_type(relative)));
                }
                // A directory, or removed since `exists`.
                Err(StorageError::NotFound(_)) => continue,
                Err(source) => return Err(SuiError::SourceRead { path, source }),
            }
        }
        Err(SuiError::not_found(Kind::Asset, file))
    }
}

/// `@assets/js/a.js` → `js/a.js`; `/js/a.js` → `js/a.js`.
fn strip_assets_prefix(file: &str) -> &str {
    let trimmed = file.trim_start_matches('/');
    trimmed
        .strip_prefix(naming::ASSETS_PREFIX)
        .map(|rest| rest.trim_start_matches('/'))
        .unwrap_or(trimmed)
}
