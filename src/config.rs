//! Configuration for SUI roots and templates.
//!
//! Two files, both optional, both TOML:
//!
//! ```text
//! <storage root>/
//! ├── sui.toml                 # SuiConfig
//! └── templates/
//!     └── tech-blue/
//!         ├── template.toml    # TemplateConfig
//!         ├── __assets/
//!         └── ...
//! ```
//!
//! Stock defaults are serialized to a `toml::Value`, the user file is merged
//! over them key by key, and the result is deserialized and validated.
//! Unknown keys are rejected to catch typos early.
//!
//! ## sui.toml
//!
//! ```toml
//! templates_dir = "templates"   # where templates live, relative to the root
//! libraries = []                # shared asset dirs searched after __assets
//!
//! [processing]
//! max_processes = 4             # parallel precompile workers (omit for auto)
//! ```
//!
//! ## template.toml
//!
//! ```toml
//! name = "Tech Blue"
//! description = "Landing pages"
//! scripts = ["@assets/js/app.js"]        # library scripts, in load order
//! styles = ["@assets/css/tailwind.css"]  # library styles, in load order
//! script_precedence = "js"               # "js" or "ts" when both exist
//! style_precedence = "css"               # "css" or "less" when both exist
//!
//! [[locales]]
//! label = "English"
//! value = "en-us"
//!
//! [[themes]]
//! label = "Dark"
//! value = "dark"
//! ```

use crate::naming;
use crate::storage::{Storage, StorageError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const SUI_CONFIG_FILE: &str = "sui.toml";
pub const TEMPLATE_CONFIG_FILE: &str = "template.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("TOML parse error in {path}: {source}")]
    Toml {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// A selectable label/value pair (locale or theme).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
}

impl SelectOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Settings for one SUI root, loaded from `sui.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SuiConfig {
    /// Directory holding one sub-directory per template.
    pub templates_dir: String,
    /// Shared asset directories, searched after a template's own `__assets`.
    pub libraries: Vec<String>,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl Default for SuiConfig {
    fn default() -> Self {
        Self {
            templates_dir: "templates".to_string(),
            libraries: Vec::new(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl SuiConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if naming::join(&[&self.templates_dir]).is_empty() {
            return Err(ConfigError::Validation(
                "templates_dir must not be empty".into(),
            ));
        }
        if self.libraries.iter().any(|l| naming::join(&[l]).is_empty()) {
            return Err(ConfigError::Validation(
                "libraries entries must not be empty".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel precompile workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Which script dialect contributes when both `.js` and `.ts` exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptPrecedence {
    #[default]
    Js,
    Ts,
}

/// Which stylesheet dialect contributes when both `.css` and `.less` exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StylePrecedence {
    #[default]
    Css,
    Less,
}

/// Settings for one template, loaded from its `template.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemplateConfig {
    /// Display name. Falls back to the template directory name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub description: String,
    /// Library script references, emitted before the page's own script.
    pub scripts: Vec<String>,
    /// Library stylesheet references, emitted before the page's own style.
    pub styles: Vec<String>,
    pub script_precedence: ScriptPrecedence,
    pub style_precedence: StylePrecedence,
    pub locales: Vec<SelectOption>,
    pub themes: Vec<SelectOption>,
}

impl TemplateConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scripts.iter().any(|s| s.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "scripts entries must not be empty".into(),
            ));
        }
        if self.styles.iter().any(|s| s.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "styles entries must not be empty".into(),
            ));
        }
        for (section, options) in [("locales", &self.locales), ("themes", &self.themes)] {
            if options.iter().any(|o| o.value.trim().is_empty()) {
                return Err(ConfigError::Validation(format!(
                    "{section} values must not be empty"
                )));
            }
        }
        Ok(())
    }
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a TOML file from storage as a raw value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(
    storage: &dyn Storage,
    path: &str,
) -> Result<Option<toml::Value>, ConfigError> {
    if !storage.exists(path) {
        return Ok(None);
    }
    let content = storage.read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content).map_err(|source| ConfigError::Toml {
        path: path.to_string(),
        source,
    })?;
    Ok(Some(value))
}

/// Merge an optional overlay onto stock defaults, then deserialize.
fn resolve<T>(stock: &T, overlay: Option<toml::Value>, path: &str) -> Result<T, ConfigError>
where
    T: Serialize + for<'de> Deserialize<'de>,
{
    let base = toml::Value::try_from(stock)?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    merged.try_into().map_err(|source| ConfigError::Toml {
        path: path.to_string(),
        source,
    })
}

/// Load `sui.toml` from the storage root.
pub fn load_sui_config(storage: &dyn Storage) -> Result<SuiConfig, ConfigError> {
    let overlay = load_raw_config(storage, SUI_CONFIG_FILE)?;
    let config = resolve(&SuiConfig::default(), overlay, SUI_CONFIG_FILE)?;
    config.validate()?;
    Ok(config)
}

/// Load `template.toml` from a template root.
pub fn load_template_config(
    storage: &dyn Storage,
    template_root: &str,
) -> Result<TemplateConfig, ConfigError> {
    let path = naming::join(&[template_root, TEMPLATE_CONFIG_FILE]);
    let overlay = load_raw_config(storage, &path)?;
    resolve_template_config(overlay, &path)
}

/// Parse `template.toml` text that is not in storage yet.
pub fn parse_template_config(content: &str, path: &str) -> Result<TemplateConfig, ConfigError> {
    let overlay: toml::Value = toml::from_str(content).map_err(|source| ConfigError::Toml {
        path: path.to_string(),
        source,
    })?;
    resolve_template_config(Some(overlay), path)
}

fn resolve_template_config(
    overlay: Option<toml::Value>,
    path: &str,
) -> Result<TemplateConfig, ConfigError> {
    let config = resolve(&TemplateConfig::default(), overlay, path)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    // =========================================================================
    // Defaults
    // =========================================================================

    #[test]
    fn default_sui_config() {
        let config = SuiConfig::default();
        assert_eq!(config.templates_dir, "templates");
        assert!(config.libraries.is_empty());
        assert_eq!(config.processing.max_processes, None);
    }

    #[test]
    fn default_template_config_prefers_js_and_css() {
        let config = TemplateConfig::default();
        assert_eq!(config.script_precedence, ScriptPrecedence::Js);
        assert_eq!(config.style_precedence, StylePrecedence::Css);
        assert!(config.scripts.is_empty());
    }

    #[test]
    fn load_sui_config_returns_default_when_no_file() {
        let storage = MemoryStorage::new();
        assert_eq!(load_sui_config(&storage).unwrap(), SuiConfig::default());
    }

    // =========================================================================
    // Loading
    // =========================================================================

    #[test]
    fn load_template_config_reads_file() {
        let storage = MemoryStorage::with_files([(
            "templates/t/template.toml",
            r#"
name = "Tech Blue"
scripts = ["@assets/a.js", "@assets/b.js"]
script_precedence = "ts"

[[locales]]
label = "English"
value = "en-us"
"#,
        )]);
        let config = load_template_config(&storage, "templates/t").unwrap();
        assert_eq!(config.name.as_deref(), Some("Tech Blue"));
        assert_eq!(config.scripts, vec!["@assets/a.js", "@assets/b.js"]);
        assert_eq!(config.script_precedence, ScriptPrecedence::Ts);
        assert_eq!(config.style_precedence, StylePrecedence::Css);
        assert_eq!(config.locales, vec![SelectOption::new("English", "en-us")]);
    }

    #[test]
    fn load_sui_config_partial_override() {
        let storage = MemoryStorage::with_files([(
            "sui.toml",
            "libraries = [\"libs/shared\"]\n[processing]\nmax_processes = 2\n",
        )]);
        let config = load_sui_config(&storage).unwrap();
        assert_eq!(config.templates_dir, "templates");
        assert_eq!(config.libraries, vec!["libs/shared"]);
        assert_eq!(config.processing.max_processes, Some(2));
    }

    #[test]
    fn invalid_toml_is_error() {
        let storage = MemoryStorage::with_files([("sui.toml", "templates_dir = ")]);
        let err = load_sui_config(&storage).unwrap_err();
        assert!(matches!(err, ConfigError::Toml { .. }));
        assert!(err.to_string().contains("sui.toml"));
    }

    #[test]
    fn unknown_key_rejected() {
        let storage = MemoryStorage::with_files([("t/template.toml", "scrpits = []\n")]);
        let err = load_template_config(&storage, "t").unwrap_err();
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn parse_template_config_matches_storage_load() {
        let text = "name = \"Tee\"\nscripts = [\"@assets/a.js\"]\n";
        let storage = MemoryStorage::with_files([("t/template.toml", text)]);
        let loaded = load_template_config(&storage, "t").unwrap();
        assert_eq!(parse_template_config(text, "t/template.toml").unwrap(), loaded);

        let err = parse_template_config("scripts = [\"\"]\n", "t/template.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn unknown_precedence_rejected() {
        let result: Result<TemplateConfig, _> = toml::from_str("script_precedence = \"coffee\"");
        assert!(result.is_err());
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn validate_empty_script_reference() {
        let mut config = TemplateConfig::default();
        config.scripts = vec!["".into()];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn validate_empty_library() {
        let mut config = SuiConfig::default();
        config.libraries = vec!["/".into()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_zero_processes() {
        let mut config = SuiConfig::default();
        config.processing.max_processes = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_default_config_passes() {
        assert!(SuiConfig::default().validate().is_ok());
        assert!(TemplateConfig::default().validate().is_ok());
    }

    // =========================================================================
    // merge_toml
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str(r#"templates_dir = "templates""#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"templates_dir = "sites""#).unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("templates_dir").unwrap().as_str(), Some("sites"));
    }

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value = toml::from_str(
            r#"
a = 1
[processing]
max_processes = 4
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[processing]
max_processes = 2
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        let processing = merged.get("processing").unwrap();
        assert_eq!(processing.get("max_processes").unwrap().as_integer(), Some(2));
        assert_eq!(merged.get("a").unwrap().as_integer(), Some(1));
    }

    #[test]
    fn merge_toml_arrays_replace() {
        let base: toml::Value = toml::from_str(r#"scripts = ["a", "b"]"#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"scripts = ["c"]"#).unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("scripts").unwrap().as_array().unwrap().len(), 1);
    }

    // =========================================================================
    // effective_threads
    // =========================================================================

    #[test]
    fn effective_threads_auto() {
        let config = ProcessingConfig {
            max_processes: None,
        };
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_user_constrains_down() {
        let config = ProcessingConfig {
            max_processes: Some(1),
        };
        assert_eq!(effective_threads(&config), 1);
    }
}
