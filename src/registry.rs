//! SUI instances and the registry that names them.
//!
//! A [`Sui`] is one namespace of templates over one storage backend: it
//! lists its templates, opens them on demand, and accepts uploads. A
//! [`Registry`] maps names to SUIs. It is constructed explicitly and handed
//! to whatever needs template lookup; nothing in the crate is global.
//!
//! Lookups share a read lock. Registering, unregistering, and uploading
//! take the write lock, so no lookup observes a half-copied template. An
//! upload reads and validates its whole source before writing.

use crate::config::{self, SuiConfig};
use crate::dialect::Dialects;
use crate::error::{Kind, Result, SuiError};
use crate::naming;
use crate::storage::{Storage, StorageError};
use crate::template::Template;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Files never copied by upload.
const IGNORED_FILES: &[&str] = &[".DS_Store"];

pub struct Sui {
    name: String,
    storage: Arc<dyn Storage>,
    config: SuiConfig,
    dialects: Dialects,
    templates: RwLock<BTreeMap<String, Arc<Template>>>,
}

impl std::fmt::Debug for Sui {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sui")
            .field("name", &self.name)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Sui {
    /// Open a SUI over `storage`, reading `sui.toml` from its root.
    pub fn open(name: impl Into<String>, storage: Arc<dyn Storage>) -> Result<Self> {
        let config = config::load_sui_config(storage.as_ref())?;
        Ok(Self::with_config(name, storage, config))
    }

    pub fn with_config(
        name: impl Into<String>,
        storage: Arc<dyn Storage>,
        config: SuiConfig,
    ) -> Self {
        Self {
            name: name.into(),
            storage,
            config,
            dialects: Dialects::default(),
            templates: RwLock::new(BTreeMap::new()),
        }
    }

    /// Replace the dialect collaborators used by templates opened from now on.
    pub fn with_dialects(mut self, dialects: Dialects) -> Self {
        self.dialects = dialects;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &SuiConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    fn template_root(&self, name: &str) -> String {
        naming::join(&[&self.config.templates_dir, name])
    }

    /// Every template, sorted by name.
    pub fn templates(&self) -> Result<Vec<Arc<Template>>> {
        let entries = match self.storage.list(&self.config.templates_dir) {
            Ok(entries) => entries,
            Err(StorageError::NotFound(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        entries
            .iter()
            .filter(|e| e.is_dir() && !naming::is_ignored_entry(&e.name))
            .map(|e| self.template(&e.name))
            .collect()
    }

    /// The template named `name`, opened on first lookup.
    pub fn template(&self, name: &str) -> Result<Arc<Template>> {
        if let Some(template) = self.templates.read().get(name) {
            return Ok(Arc::clone(template));
        }
        let mut templates = self.templates.write();
        if let Some(template) = templates.get(name) {
            return Ok(Arc::clone(template));
        }
        let template = Arc::new(self.open_template(name)?);
        templates.insert(name.to_string(), Arc::clone(&template));
        Ok(template)
    }

    fn open_template(&self, name: &str) -> Result<Template> {
        let root = self.template_root(name);
        if !is_valid_template_name(name) || !self.storage.exists(&root) {
            return Err(SuiError::not_found(Kind::Template, name));
        }
        Template::open(
            &root,
            Arc::clone(&self.storage),
            &self.config,
            self.dialects.clone(),
        )
    }

    /// Copy the local directory `src` into storage as template `dst`.
    ///
    /// Every file is read and `template.toml` is validated before anything
    /// is written, so a bad source leaves storage untouched. Fails with
    /// `Conflict` if `dst` already exists.
    pub fn upload_template(&self, src: &Path, dst: &str) -> Result<Arc<Template>> {
        if !is_valid_template_name(dst) {
            return Err(SuiError::Config(config::ConfigError::Validation(format!(
                "invalid template name {dst:?}"
            ))));
        }
        let mut templates = self.templates.write();
        let root = self.template_root(dst);
        if templates.contains_key(dst) || self.storage.exists(&root) {
            return Err(SuiError::Conflict(dst.to_string()));
        }

        let files = collect_upload(src)?;
        if let Some((_, bytes)) = files
            .iter()
            .find(|(relative, _)| relative == config::TEMPLATE_CONFIG_FILE)
        {
            let path = naming::join(&[&root, config::TEMPLATE_CONFIG_FILE]);
            config::parse_template_config(&String::from_utf8_lossy(bytes), &path)?;
        }

        for (relative, bytes) in &files {
            let target = naming::join(&[&root, relative]);
            debug!(%target, bytes = bytes.len(), "uploading file");
            self.storage.write(&target, bytes)?;
        }

        let template = Arc::new(Template::open(
            &root,
            Arc::clone(&self.storage),
            &self.config,
            self.dialects.clone(),
        )?);
        templates.insert(dst.to_string(), Arc::clone(&template));
        info!(sui = %self.name, template = dst, files = files.len(), "uploaded template");
        Ok(template)
    }

    /// Drop the cached instance of a template; it is reopened on next lookup.
    pub fn unload(&self, name: &str) -> bool {
        self.templates.write().remove(name).is_some()
    }
}

/// Read every uploadable file under `src` as `(relative path, bytes)`, in
/// file-name order.
fn collect_upload(src: &Path) -> Result<Vec<(String, Vec<u8>)>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = entry.map_err(|e| SuiError::Io {
            path: src.display().to_string(),
            source: e.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_str().unwrap_or_default();
        if IGNORED_FILES.contains(&name) {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(src)
            .unwrap_or(entry.path())
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let bytes = fs::read(entry.path()).map_err(|source| SuiError::Io {
            path: entry.path().display().to_string(),
            source,
        })?;
        files.push((relative, bytes));
    }
    if files.is_empty() {
        return Err(SuiError::Io {
            path: src.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no files to upload"),
        });
    }
    Ok(files)
}

/// A single directory name that is not hidden or internal.
fn is_valid_template_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains(['/', '\\'])
        && name != ".."
        && !naming::is_ignored_entry(name)
}

/// Named SUI instances.
#[derive(Default)]
pub struct Registry {
    suis: RwLock<BTreeMap<String, Arc<Sui>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `sui` under its name. Fails with `Conflict` if the name is taken.
    pub fn register(&self, sui: Sui) -> Result<Arc<Sui>> {
        let mut suis = self.suis.write();
        if suis.contains_key(sui.name()) {
            return Err(SuiError::Conflict(sui.name().to_string()));
        }
        let sui = Arc::new(sui);
        suis.insert(sui.name().to_string(), Arc::clone(&sui));
        debug!(sui = sui.name(), "registered SUI");
        Ok(sui)
    }

    /// Remove a SUI. Its templates are dropped once no caller holds them.
    pub fn unregister(&self, name: &str) -> Option<Arc<Sui>> {
        self.suis.write().remove(name)
    }

    pub fn get(&self, name: &str) -> Result<Arc<Sui>> {
        self.suis
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| SuiError::not_found(Kind::Sui, name))
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.suis.read().keys().cloned().collect()
    }
}
