//! Template: the aggregate root over one template directory.
//!
//! A template owns its page tree, its blocks and components, an asset
//! resolver, and the compile cache all of them share. Everything is built
//! lazily on first use and kept until [`Template::reload`].
//!
//! ## Layout
//!
//! ```text
//! templates/tech-blue/
//! ├── template.toml            # optional, see config
//! ├── __assets/                # served through `asset()`
//! ├── __blocks/Hero/Hero.{html,js,ts}
//! ├── __components/Nav/Nav.{html,js,ts}
//! ├── __locales/en-us.yml      # locale list when template.toml has none
//! ├── index/index.{html,css,less,js,ts,json}
//! └── page/[id]/[id].{...}
//! ```

use crate::asset::{Asset, AssetResolver};
use crate::cache::{CacheStats, CompileCache};
use crate::config::{self, SelectOption, SuiConfig, TemplateConfig};
use crate::dialect::Dialects;
use crate::error::{Kind, Result, SuiError};
use crate::fragment::{Fragment, FragmentIndex, FragmentKind};
use crate::naming;
use crate::page::Page;
use crate::route;
use crate::source::SourceUnit;
use crate::storage::{Storage, StorageError};
use crate::tree::{self, PageTreeNode};
use parking_lot::RwLock;
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Directory whose entries name the template's locales.
pub const LOCALES_DIR: &str = "__locales";

/// Shared, immutable state every page and fragment of a template reads.
pub struct TemplateContext {
    /// Template directory name (`tech-blue`).
    pub name: String,
    /// Storage path of the template directory.
    pub root: String,
    pub storage: Arc<dyn Storage>,
    pub dialects: Dialects,
    pub cache: Arc<CompileCache>,
    pub config: TemplateConfig,
}

impl TemplateContext {
    /// Transpile a script unit through the shared cache.
    pub fn transpile(&self, unit: &SourceUnit) -> Result<String> {
        self.cache
            .get_or_compile("ts", unit.path(), &unit.code, |src| {
                self.dialects.script.transpile(src)
            })
            .map_err(|source| SuiError::Compile {
                file: unit.file.clone(),
                source,
            })
    }

    /// Compile a stylesheet unit through the shared cache.
    pub fn compile_style(&self, unit: &SourceUnit) -> Result<String> {
        self.cache
            .get_or_compile("less", unit.path(), &unit.code, |src| {
                self.dialects.style.compile(src)
            })
            .map_err(|source| SuiError::Compile {
                file: unit.file.clone(),
                source,
            })
    }

    #[cfg(test)]
    pub fn for_tests(root: &str, storage: Arc<dyn Storage>, dialects: Dialects) -> Self {
        Self {
            name: naming::base_name(root).to_string(),
            root: root.to_string(),
            storage,
            dialects,
            cache: Arc::new(CompileCache::new()),
            config: TemplateConfig::default(),
        }
    }
}

/// Outcome of compiling one page during [`Template::precompile`].
#[derive(Debug)]
pub struct PrecompileOutcome {
    pub route: String,
    pub result: Result<()>,
}

/// Summary of a [`Template::precompile`] run.
#[derive(Debug)]
pub struct PrecompileReport {
    pub outcomes: Vec<PrecompileOutcome>,
    pub fragments: usize,
    pub cache: CacheStats,
}

impl PrecompileReport {
    pub fn failures(&self) -> impl Iterator<Item = &PrecompileOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }
}

pub struct Template {
    ctx: Arc<TemplateContext>,
    fragments: Arc<FragmentIndex>,
    resolver: AssetResolver,
    tree: RwLock<Option<Arc<PageTreeNode>>>,
}

impl std::fmt::Debug for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Template")
            .field("name", &self.ctx.name)
            .field("root", &self.ctx.root)
            .finish_non_exhaustive()
    }
}

impl Template {
    /// Open the template at storage path `root`. Reads `template.toml`.
    pub fn open(
        root: &str,
        storage: Arc<dyn Storage>,
        sui: &SuiConfig,
        dialects: Dialects,
    ) -> Result<Self> {
        let root = naming::join(&[root]);
        let config = config::load_template_config(storage.as_ref(), &root)?;
        let ctx = Arc::new(TemplateContext {
            name: naming::base_name(&root).to_string(),
            root: root.clone(),
            storage: Arc::clone(&storage),
            dialects,
            cache: Arc::new(CompileCache::new()),
            config,
        });
        debug!(template = %ctx.name, %root, "opened template");
        Ok(Self {
            fragments: Arc::new(FragmentIndex::new(Arc::clone(&ctx))),
            resolver: AssetResolver::new(storage, &root, &sui.libraries),
            tree: RwLock::new(None),
            ctx,
        })
    }

    /// Directory name; the key templates are looked up by.
    pub fn name(&self) -> &str {
        &self.ctx.name
    }

    /// Display name from `template.toml`, or the directory name.
    pub fn label(&self) -> &str {
        self.ctx.config.name.as_deref().unwrap_or(&self.ctx.name)
    }

    pub fn description(&self) -> &str {
        &self.ctx.config.description
    }

    pub fn root(&self) -> &str {
        &self.ctx.root
    }

    pub fn config(&self) -> &TemplateConfig {
        &self.ctx.config
    }

    // =========================================================================
    // Pages
    // =========================================================================

    /// The page tree, built on first use.
    pub fn tree(&self) -> Result<Arc<PageTreeNode>> {
        if let Some(tree) = &*self.tree.read() {
            return Ok(Arc::clone(tree));
        }
        let mut slot = self.tree.write();
        if let Some(tree) = &*slot {
            return Ok(Arc::clone(tree));
        }
        let built = Arc::new(tree::build_tree(&self.ctx, &self.fragments)?);
        debug!(template = %self.ctx.name, nodes = built.len(), "built page tree");
        *slot = Some(Arc::clone(&built));
        Ok(built)
    }

    /// Every page, in tree pre-order.
    pub fn pages(&self) -> Result<Vec<Arc<Page>>> {
        Ok(self.tree()?.pages())
    }

    /// Top-level nodes with the path to `route` flagged active.
    pub fn page_tree(&self, route: &str) -> Result<Vec<PageTreeNode>> {
        let tree = self.tree()?;
        let path = route::match_route(&tree, route)
            .ok_or_else(|| SuiError::not_found(Kind::Page, route))?;
        Ok(tree::mark_active(&tree, &path))
    }

    pub fn page(&self, route: &str) -> Result<Arc<Page>> {
        let tree = self.tree()?;
        route::match_route(&tree, route)
            .and_then(|path| route::node_at(&tree, &path))
            .and_then(|node| node.page.clone())
            .ok_or_else(|| SuiError::not_found(Kind::Page, route))
    }

    /// The page owning an editor asset path (`/page/404/404.js`).
    pub fn get_page_from_asset(&self, asset: &str) -> Result<Arc<Page>> {
        for candidate in route::asset_routes(asset) {
            match self.page(&candidate) {
                Ok(page) => return Ok(page),
                Err(SuiError::NotFound { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(SuiError::not_found(Kind::Page, asset))
    }

    // =========================================================================
    // Blocks and components
    // =========================================================================

    pub fn blocks(&self) -> Result<Vec<Arc<Fragment>>> {
        Ok(self.fragments.list(FragmentKind::Block)?.values().cloned().collect())
    }

    pub fn block(&self, id: &str) -> Result<Arc<Fragment>> {
        self.fragments.get(FragmentKind::Block, id)
    }

    pub fn components(&self) -> Result<Vec<Arc<Fragment>>> {
        Ok(self
            .fragments
            .list(FragmentKind::Component)?
            .values()
            .cloned()
            .collect())
    }

    pub fn component(&self, id: &str) -> Result<Arc<Fragment>> {
        self.fragments.get(FragmentKind::Component, id)
    }

    // =========================================================================
    // Assets and options
    // =========================================================================

    /// Asset search directories, in lookup order.
    pub fn assets(&self) -> Vec<String> {
        self.resolver.search_paths().to_vec()
    }

    /// Serve `@assets/...` from the search directories, or `@pages/...` as
    /// the owning page's compiled script or style.
    pub fn asset(&self, file: &str) -> Result<Asset> {
        let trimmed = file.trim_start_matches('/');
        if trimmed.starts_with(naming::PAGES_PREFIX) {
            let page = self.get_page_from_asset(trimmed)?;
            return match naming::split_extension(naming::base_name(trimmed)) {
                Some((_, "js")) => page.asset_script(),
                Some((_, "css")) => page.asset_style(),
                _ => Err(SuiError::not_found(Kind::Asset, file)),
            };
        }
        self.resolver.resolve(file)
    }

    /// Locale options from `template.toml`, else one per `__locales` entry.
    pub fn locales(&self) -> Result<Vec<SelectOption>> {
        if !self.ctx.config.locales.is_empty() {
            return Ok(self.ctx.config.locales.clone());
        }
        let dir = naming::join(&[&self.ctx.root, LOCALES_DIR]);
        let entries = match self.ctx.storage.list(&dir) {
            Ok(entries) => entries,
            Err(StorageError::NotFound(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut values: Vec<String> = entries
            .iter()
            .filter(|e| !e.name.starts_with('.'))
            .map(|e| match naming::split_extension(&e.name) {
                Some((stem, _)) if !e.is_dir() => stem.to_string(),
                _ => e.name.clone(),
            })
            .collect();
        values.dedup();
        Ok(values
            .into_iter()
            .map(|v| SelectOption::new(v.clone(), v))
            .collect())
    }

    pub fn themes(&self) -> Vec<SelectOption> {
        self.ctx.config.themes.clone()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Compile every page's execution artifacts and every fragment, in
    /// parallel. Failures are reported per page, not raised.
    pub fn precompile(&self) -> Result<PrecompileReport> {
        let start = Instant::now();
        let pages = self.pages()?;
        let fragments: Vec<Arc<Fragment>> = self
            .blocks()?
            .into_iter()
            .chain(self.components()?)
            .collect();

        let mut outcomes: Vec<PrecompileOutcome> = pages
            .par_iter()
            .map(|page| PrecompileOutcome {
                route: page.route().to_string(),
                result: page.compile(),
            })
            .collect();
        outcomes.extend(
            fragments
                .par_iter()
                .map(|fragment| PrecompileOutcome {
                    route: format!("{}:{}", fragment.kind(), fragment.id()),
                    result: fragment.compile().map(|_| ()),
                })
                .collect::<Vec<_>>(),
        );

        let report = PrecompileReport {
            outcomes,
            fragments: fragments.len(),
            cache: self.ctx.cache.stats(),
        };
        info!(
            template = %self.ctx.name,
            pages = pages.len(),
            fragments = report.fragments,
            failures = report.failures().count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "precompiled template"
        );
        Ok(report)
    }

    /// Forget the page tree and all fragments. The compile cache is kept, so
    /// unchanged sources are not recompiled.
    pub fn reload(&self) {
        *self.tree.write() = None;
        self.fragments.clear();
        debug!(template = %self.ctx.name, "reloaded template");
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.ctx.cache.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::tests::CountingTranspiler;
    use crate::storage::MemoryStorage;

    fn template(files: &[(&str, &str)]) -> Template {
        template_with(files, Dialects::default())
    }

    fn template_with(files: &[(&str, &str)], dialects: Dialects) -> Template {
        let storage = Arc::new(MemoryStorage::with_files(files.iter().copied()));
        Template::open("templates/t", storage, &SuiConfig::default(), dialects).unwrap()
    }

    #[test]
    fn label_falls_back_to_directory_name() {
        let t = template(&[("templates/t/index/index.html", "")]);
        assert_eq!(t.name(), "t");
        assert_eq!(t.label(), "t");

        let named = template(&[("templates/t/template.toml", "name = \"Tee\"")]);
        assert_eq!(named.label(), "Tee");
    }

    #[test]
    fn unknown_route_is_not_found_with_route() {
        let t = template(&[("templates/t/index/index.html", "")]);
        let err = t.page("/nope/here").unwrap_err();
        assert_eq!(err.to_string(), "Page /nope/here not found");
        assert!(t.page_tree("/nope").unwrap_err().is_not_found());
    }

    #[test]
    fn page_asset_references_serve_compiled_output() {
        let t = template(&[
            ("templates/t/index/index.ts", "let a: number = 1;"),
            ("templates/t/index/index.less", "@c: red;\na { color: @c; }"),
        ]);
        assert_eq!(t.asset("@pages/index/index.js").unwrap().text(), "let a = 1;");
        assert_eq!(
            t.asset("@pages/index/index.css").unwrap().text(),
            "a {\n  color: red;\n}\n"
        );
        assert!(t.asset("@pages/index/index.png").unwrap_err().is_not_found());
    }

    #[test]
    fn locales_fall_back_to_locale_files() {
        let t = template(&[
            ("templates/t/__locales/en-us.yml", ""),
            ("templates/t/__locales/zh-cn.yml", ""),
        ]);
        let values: Vec<_> = t.locales().unwrap().into_iter().map(|o| o.value).collect();
        assert_eq!(values, vec!["en-us", "zh-cn"]);
        assert!(t.themes().is_empty());
    }

    #[test]
    fn reload_rebuilds_tree_and_reuses_cache() {
        let counter = Arc::new(CountingTranspiler::default());
        let dialects = Dialects {
            script: counter.clone(),
            ..Dialects::default()
        };
        let storage = Arc::new(MemoryStorage::with_files([(
            "templates/t/a/a.ts",
            "let a = 1;",
        )]));
        let t = Template::open(
            "templates/t",
            storage.clone(),
            &SuiConfig::default(),
            dialects,
        )
        .unwrap();
        t.page("/a").unwrap().asset_script().unwrap();

        storage.write("templates/t/b/b.html", b"<p></p>").unwrap();
        assert!(t.page("/b").is_err());
        t.reload();
        assert!(t.page("/b").is_ok());

        t.page("/a").unwrap().asset_script().unwrap();
        assert_eq!(counter.count(), 1);
        assert_eq!(t.cache_stats().hits, 1);
    }

    #[test]
    fn edits_across_reloads_do_not_grow_the_cache() {
        let storage = Arc::new(MemoryStorage::with_files([
            ("templates/t/a/a.ts", "let a: number = 0;"),
            ("templates/t/a/a.less", "a { b: c; }"),
        ]));
        let t = Template::open(
            "templates/t",
            storage.clone(),
            &SuiConfig::default(),
            Dialects::default(),
        )
        .unwrap();
        for n in 1..=5 {
            let source = format!("let a: number = {n};");
            storage.write("templates/t/a/a.ts", source.as_bytes()).unwrap();
            t.reload();
            let script = t.page("/a").unwrap().asset_script().unwrap();
            assert_eq!(script.text(), format!("let a = {n};"));
            t.page("/a").unwrap().asset_style().unwrap();
        }
        assert_eq!(t.ctx.cache.len(), 2);
        assert_eq!(t.cache_stats().hits, 4);
    }

    #[test]
    fn precompile_reports_each_page() {
        let t = template(&[
            ("templates/t/ok/ok.ts", "let a: number = 1;"),
            ("templates/t/bad/bad.less", "a { color: @nope; }"),
            ("templates/t/__blocks/Hero/Hero.html", "<h1></h1>"),
        ]);
        let report = t.precompile().unwrap();
        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.fragments, 1);
        let failed: Vec<_> = report.failures().map(|o| o.route.as_str()).collect();
        assert_eq!(failed, vec!["/bad"]);
        assert!(!report.is_success());
    }
}
