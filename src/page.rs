//! Pages and the page compiler.
//!
//! A page at directory `D` with base name `N` has six optional sources,
//! `D/N.{html,css,less,js,ts,json}`. It serves two audiences:
//!
//! | Audience | Operations | Transpiles? |
//! |---|---|---|
//! | visual editor | [`Page::editor_render`], `editor_*_source` | referenced fragments only |
//! | live renderer | [`Page::asset_script`], [`Page::asset_style`] | yes |
//!
//! ## Asset manifest
//!
//! `editor_render` returns the template's library `scripts`/`styles` in
//! declaration order, followed by the page's own compiled asset reference
//! when the page has script (or style):
//!
//! ```text
//! scripts: ["@assets/js/a.js", "@assets/js/b.js", "@pages/index/index.js"]
//! styles:  ["@assets/css/site.css", "@pages/index/index.css"]
//! ```
//!
//! ## State
//!
//! `Unloaded → Loaded → Compiled`, guarded per page. The script and the
//! style are memoized in separate slots, so each asset runs only its own
//! dialect and a broken stylesheet never blocks the script. `load()` always
//! rereads and drops both artifacts; everything else loads on first use and
//! reuses what is there.

use crate::asset::{self, Asset};
use crate::config::{ScriptPrecedence, StylePrecedence};
use crate::dialect::{self, CompiledEntry};
use crate::error::{Result, SuiError};
use crate::fragment::{FragmentIndex, FragmentKind};
use crate::naming;
use crate::source::{self, Pick, SourceUnit};
use crate::template::TemplateContext;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Editor request. Carried through to collaborators, not interpreted here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub method: String,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

/// Everything the editor needs to open a page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EditorResponse {
    pub html: String,
    pub css: String,
    pub scripts: Vec<String>,
    pub styles: Vec<String>,
}

/// One raw source for the editor's "view source" mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceResponse {
    pub file: String,
    pub source: String,
    pub mime_type: String,
}

impl SourceResponse {
    fn of(unit: &SourceUnit) -> Self {
        Self {
            file: unit.file.clone(),
            source: unit.code.clone(),
            mime_type: asset::mime_type(&unit.file).to_string(),
        }
    }
}

/// The six source units of a page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageCodes {
    pub html: SourceUnit,
    pub css: SourceUnit,
    pub less: SourceUnit,
    pub js: SourceUnit,
    pub ts: SourceUnit,
    pub data: SourceUnit,
}

impl PageCodes {
    fn units(&self) -> [&SourceUnit; 6] {
        [
            &self.html, &self.css, &self.less, &self.js, &self.ts, &self.data,
        ]
    }
}

/// Read-only snapshot of a page, for callers that want to inspect it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageInfo {
    pub route: String,
    pub path: String,
    pub name: String,
    pub codes: PageCodes,
    pub loaded: bool,
}

/// One execution artifact. `Missing` where the page has no such source.
#[derive(Debug, Clone)]
enum Artifact {
    Missing,
    Built(Arc<str>),
}

/// Loaded sources with each artifact memoized separately once built.
/// A page with no `Loaded` is unloaded.
struct Loaded {
    codes: Arc<PageCodes>,
    script: Option<Artifact>,
    style: Option<Artifact>,
}

impl Loaded {
    fn new(codes: Arc<PageCodes>) -> Self {
        Self {
            codes,
            script: None,
            style: None,
        }
    }
}

pub struct Page {
    route: String,
    path: String,
    name: String,
    ctx: Arc<TemplateContext>,
    fragments: Arc<FragmentIndex>,
    /// Unit paths, recorded at construction.
    codes: PageCodes,
    state: Mutex<Option<Loaded>>,
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("route", &self.route)
            .field("path", &self.path)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Page {
    /// A page named `name` whose sources live in storage directory `path`.
    pub(crate) fn new(
        route: String,
        path: String,
        name: &str,
        ctx: Arc<TemplateContext>,
        fragments: Arc<FragmentIndex>,
    ) -> Self {
        let unit = |ext: &str| {
            let file = format!("{name}.{ext}");
            let full = naming::join(&[&path, &file]);
            SourceUnit::new(file, full)
        };
        let codes = PageCodes {
            html: unit("html"),
            css: unit("css"),
            less: unit("less"),
            js: unit("js"),
            ts: unit("ts"),
            data: unit("json"),
        };
        Self {
            route,
            path,
            name: name.to_string(),
            ctx,
            fragments,
            codes,
            state: Mutex::new(None),
        }
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Snapshot of the page as it stands; does not load.
    pub fn get(&self) -> PageInfo {
        let (codes, loaded) = match &*self.state.lock() {
            None => (self.codes.clone(), false),
            Some(loaded) => ((*loaded.codes).clone(), true),
        };
        PageInfo {
            route: self.route.clone(),
            path: self.path.clone(),
            name: self.name.clone(),
            codes,
            loaded,
        }
    }

    /// Reread every source unit and drop compiled artifacts.
    pub fn load(&self) -> Result<()> {
        let codes = self.read_codes()?;
        *self.state.lock() = Some(Loaded::new(codes));
        debug!(route = %self.route, "loaded page");
        Ok(())
    }

    /// Loaded sources, loading on first use.
    pub fn codes(&self) -> Result<Arc<PageCodes>> {
        let mut state = self.state.lock();
        Ok(Arc::clone(&self.ensure_loaded(&mut state)?.codes))
    }

    /// Whether the page has a script source (JS or TS).
    pub fn has_script(&self) -> Result<bool> {
        let codes = self.codes()?;
        Ok(!codes.js.is_empty() || !codes.ts.is_empty())
    }

    /// Whether the page has a style source (CSS or LESS).
    pub fn has_style(&self) -> Result<bool> {
        let codes = self.codes()?;
        Ok(!codes.css.is_empty() || !codes.less.is_empty())
    }

    /// Editor reference for the page's compiled script.
    pub fn script_ref(&self) -> String {
        self.asset_ref("js")
    }

    /// Editor reference for the page's compiled style.
    pub fn style_ref(&self) -> String {
        self.asset_ref("css")
    }

    fn asset_ref(&self, ext: &str) -> String {
        let route = self.route.trim_end_matches('/');
        format!("{}{}/{}.{}", naming::PAGES_PREFIX, route, self.name, ext)
    }

    // =========================================================================
    // Editor view
    // =========================================================================

    pub fn editor_render(&self, request: &Request) -> Result<EditorResponse> {
        debug!(route = %self.route, method = %request.method, "editor render");
        let codes = self.codes()?;

        let entries = self.compile_references(&codes.html.code)?;
        let html = self.ctx.dialects.markup.expand(&codes.html.code, &entries);

        let mut css = codes.css.code.clone();
        if !codes.less.is_empty() {
            let compiled = self.ctx.compile_style(&codes.less)?;
            if !css.is_empty() && !compiled.is_empty() {
                css.push_str("\n\n");
            }
            css.push_str(&compiled);
        }

        let mut scripts = self.ctx.config.scripts.clone();
        if !codes.js.is_empty() || !codes.ts.is_empty() {
            scripts.push(self.script_ref());
        }
        let mut styles = self.ctx.config.styles.clone();
        if !codes.css.is_empty() || !codes.less.is_empty() {
            styles.push(self.style_ref());
        }

        Ok(EditorResponse {
            html,
            css,
            scripts,
            styles,
        })
    }

    /// Compile each block and component the markup references, once each.
    fn compile_references(&self, markup: &str) -> Result<Vec<CompiledEntry>> {
        let refs = dialect::collect_references(markup);
        let wanted = refs
            .blocks
            .iter()
            .map(|id| (FragmentKind::Block, id))
            .chain(refs.components.iter().map(|id| (FragmentKind::Component, id)));

        let mut entries = Vec::new();
        for (kind, id) in wanted {
            let Some(fragment) = self.fragments.find(kind, id)? else {
                // Editor built-in types share the attribute namespace.
                debug!(route = %self.route, %kind, %id, "reference is not a template fragment");
                continue;
            };
            entries.push(CompiledEntry {
                name: fragment.global_name(),
                script: fragment.compile()?,
            });
        }
        Ok(entries)
    }

    pub fn editor_page_source(&self) -> Result<SourceResponse> {
        Ok(SourceResponse::of(&self.codes()?.html))
    }

    /// Raw script: whichever of JS/TS contributes. Never transpiled.
    pub fn editor_script_source(&self) -> Result<SourceResponse> {
        let codes = self.codes()?;
        let unit = match self.pick_script(&codes) {
            Pick::Plain(unit) | Pick::Dialect(unit) => unit,
            Pick::Neither => &codes.js,
        };
        Ok(SourceResponse::of(unit))
    }

    /// Raw style: whichever of CSS/LESS contributes. Never compiled.
    pub fn editor_style_source(&self) -> Result<SourceResponse> {
        let codes = self.codes()?;
        let unit = match self.pick_style(&codes) {
            Pick::Plain(unit) | Pick::Dialect(unit) => unit,
            Pick::Neither => &codes.css,
        };
        Ok(SourceResponse::of(unit))
    }

    pub fn editor_data_source(&self) -> Result<SourceResponse> {
        Ok(SourceResponse::of(&self.codes()?.data))
    }

    // =========================================================================
    // Execution artifacts
    // =========================================================================

    /// Compiled script. Only the JS/TS units are involved.
    pub fn asset_script(&self) -> Result<Asset> {
        match self.script_artifact()? {
            Artifact::Built(script) => Ok(Asset::javascript(script.as_bytes())),
            Artifact::Missing => Err(SuiError::NoScript(self.route.clone())),
        }
    }

    /// Compiled style. Only the CSS/LESS units are involved.
    pub fn asset_style(&self) -> Result<Asset> {
        match self.style_artifact()? {
            Artifact::Built(style) => Ok(Asset::css(style.as_bytes())),
            Artifact::Missing => Err(SuiError::NoStyle(self.route.clone())),
        }
    }

    /// Build both execution artifacts now, if not already memoized.
    ///
    /// The script is built even when the style fails, so a later
    /// `asset_script` finds it memoized.
    pub fn compile(&self) -> Result<()> {
        let script = self.script_artifact();
        let style = self.style_artifact();
        script?;
        style?;
        Ok(())
    }

    /// Whether both artifacts are memoized.
    pub fn is_compiled(&self) -> bool {
        self.state
            .lock()
            .as_ref()
            .is_some_and(|loaded| loaded.script.is_some() && loaded.style.is_some())
    }

    fn script_artifact(&self) -> Result<Artifact> {
        let mut state = self.state.lock();
        let loaded = self.ensure_loaded(&mut state)?;
        if let Some(artifact) = &loaded.script {
            return Ok(artifact.clone());
        }
        let artifact = match self.pick_script(&loaded.codes) {
            Pick::Plain(unit) => Artifact::Built(unit.code.as_str().into()),
            Pick::Dialect(unit) => {
                let script = self.ctx.transpile(unit)?;
                if script.is_empty() {
                    warn!(route = %self.route, "script compiled to empty output");
                }
                Artifact::Built(script.into())
            }
            Pick::Neither => Artifact::Missing,
        };
        loaded.script = Some(artifact.clone());
        debug!(route = %self.route, "compiled page script");
        Ok(artifact)
    }

    fn style_artifact(&self) -> Result<Artifact> {
        let mut state = self.state.lock();
        let loaded = self.ensure_loaded(&mut state)?;
        if let Some(artifact) = &loaded.style {
            return Ok(artifact.clone());
        }
        let artifact = match self.pick_style(&loaded.codes) {
            Pick::Plain(unit) => Artifact::Built(unit.code.as_str().into()),
            Pick::Dialect(unit) => Artifact::Built(self.ctx.compile_style(unit)?.into()),
            Pick::Neither => Artifact::Missing,
        };
        loaded.style = Some(artifact.clone());
        debug!(route = %self.route, "compiled page style");
        Ok(artifact)
    }

    // =========================================================================
    // Loading
    // =========================================================================

    fn ensure_loaded<'s>(&self, state: &'s mut Option<Loaded>) -> Result<&'s mut Loaded> {
        let loaded = match state.take() {
            Some(loaded) => loaded,
            None => Loaded::new(self.read_codes()?),
        };
        Ok(state.insert(loaded))
    }

    fn read_codes(&self) -> Result<Arc<PageCodes>> {
        let storage = self.ctx.storage.as_ref();
        let read = |unit: &SourceUnit| {
            unit.loaded(storage).map_err(|source| SuiError::SourceRead {
                path: unit.path().to_string(),
                source,
            })
        };
        let [html, css, less, js, ts, data] = self.codes.units().map(read);
        Ok(Arc::new(PageCodes {
            html: html?,
            css: css?,
            less: less?,
            js: js?,
            ts: ts?,
            data: data?,
        }))
    }

    fn pick_script<'a>(&self, codes: &'a PageCodes) -> Pick<'a> {
        let prefer_ts = self.ctx.config.script_precedence == ScriptPrecedence::Ts;
        source::pick(&codes.js, &codes.ts, prefer_ts)
    }

    fn pick_style<'a>(&self, codes: &'a PageCodes) -> Pick<'a> {
        let prefer_less = self.ctx.config.style_precedence == StylePrecedence::Less;
        source::pick(&codes.css, &codes.less, prefer_less)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TemplateConfig;
    use crate::dialect::Dialects;
    use crate::dialect::tests::{CountingStyleCompiler, CountingTranspiler};
    use crate::storage::tests::UnreadableStorage;
    use crate::storage::{MemoryStorage, Storage};

    fn page_with(files: &[(&str, &str)], config: TemplateConfig, dialects: Dialects) -> Page {
        let storage = Arc::new(MemoryStorage::with_files(files.iter().copied()));
        page_on(storage, config, dialects)
    }

    fn page_on(storage: Arc<dyn Storage>, config: TemplateConfig, dialects: Dialects) -> Page {
        let mut ctx = TemplateContext::for_tests("t", storage, dialects);
        ctx.config = config;
        let ctx = Arc::new(ctx);
        let fragments = Arc::new(FragmentIndex::new(Arc::clone(&ctx)));
        Page::new("/p".into(), "t/p".into(), "p", ctx, fragments)
    }

    #[test]
    fn unit_files_are_name_dot_ext() {
        let page = page_with(&[], TemplateConfig::default(), Dialects::default());
        let info = page.get();
        assert!(!info.loaded);
        assert_eq!(info.codes.html.file, "p.html");
        assert_eq!(info.codes.less.file, "p.less");
        assert_eq!(info.codes.data.file, "p.json");
        assert_eq!(info.codes.ts.path(), "t/p/p.ts");
    }

    #[test]
    fn absent_units_load_empty() {
        let page = page_with(
            &[("t/p/p.html", "<p></p>")],
            TemplateConfig::default(),
            Dialects::default(),
        );
        page.load().unwrap();
        let info = page.get();
        assert!(info.loaded);
        assert_eq!(info.codes.html.code, "<p></p>");
        assert!(info.codes.js.is_empty());
        assert!(info.codes.data.is_empty());
    }

    #[test]
    fn manifest_is_library_then_page() {
        let config = TemplateConfig {
            scripts: vec!["A".into(), "B".into(), "C".into()],
            styles: vec!["S".into()],
            ..TemplateConfig::default()
        };
        let page = page_with(
            &[("t/p/p.html", "<p></p>"), ("t/p/p.ts", "let a = 1;"), ("t/p/p.less", "a { b: c; }")],
            config,
            Dialects::default(),
        );
        let res = page.editor_render(&Request::default()).unwrap();
        assert_eq!(res.scripts, vec!["A", "B", "C", "@pages/p/p.js"]);
        assert_eq!(res.styles, vec!["S", "@pages/p/p.css"]);
    }

    #[test]
    fn manifest_omits_missing_page_assets() {
        let config = TemplateConfig {
            scripts: vec!["A".into()],
            ..TemplateConfig::default()
        };
        let page = page_with(&[("t/p/p.html", "<p></p>")], config, Dialects::default());
        let res = page.editor_render(&Request::default()).unwrap();
        assert_eq!(res.scripts, vec!["A"]);
        assert!(res.styles.is_empty());
    }

    #[test]
    fn editor_css_is_css_then_compiled_less() {
        let page = page_with(
            &[("t/p/p.css", "body { margin: 0; }"), ("t/p/p.less", "@c: red;\na { color: @c; }")],
            TemplateConfig::default(),
            Dialects::default(),
        );
        let res = page.editor_render(&Request::default()).unwrap();
        assert_eq!(res.css, "body { margin: 0; }\n\na {\n  color: red;\n}\n");
    }

    #[test]
    fn asset_script_variants() {
        let plain = || (TemplateConfig::default(), Dialects::default());
        let (config, dialects) = plain();
        let ts_only = page_with(&[("t/p/p.ts", "let a: number = 1;")], config, dialects);
        let asset = ts_only.asset_script().unwrap();
        assert_eq!(asset.text(), "let a = 1;");
        assert_eq!(asset.mime_type, "text/javascript; charset=utf-8");

        let (config, dialects) = plain();
        let js_only = page_with(&[("t/p/p.js", "let a = 1; // raw")], config, dialects);
        assert_eq!(js_only.asset_script().unwrap().text(), "let a = 1; // raw");

        let (config, dialects) = plain();
        let neither = page_with(&[("t/p/p.html", "<p></p>")], config, dialects);
        let err = neither.asset_script().unwrap_err();
        assert_eq!(err.to_string(), "no script for page /p");
        assert!(matches!(neither.asset_style(), Err(SuiError::NoStyle(_))));
    }

    #[test]
    fn ts_precedence_is_configurable() {
        let config = TemplateConfig {
            script_precedence: ScriptPrecedence::Ts,
            ..TemplateConfig::default()
        };
        let page = page_with(
            &[("t/p/p.js", "var js = 1;"), ("t/p/p.ts", "var ts: number = 1;")],
            config,
            Dialects::default(),
        );
        assert_eq!(page.asset_script().unwrap().text(), "var ts = 1;");
        assert_eq!(page.editor_script_source().unwrap().file, "p.ts");
    }

    #[test]
    fn editor_sources_never_invoke_dialects() {
        let script = Arc::new(CountingTranspiler::default());
        let style = Arc::new(CountingStyleCompiler::default());
        let dialects = Dialects {
            script: script.clone(),
            style: style.clone(),
            ..Dialects::default()
        };
        let page = page_with(
            &[
                ("t/p/p.ts", "let a: number = 1;"),
                ("t/p/p.less", "@x: 1;"),
                ("t/p/p.json", "{\"a\":1}"),
            ],
            TemplateConfig::default(),
            dialects,
        );

        let script_src = page.editor_script_source().unwrap();
        assert_eq!(script_src.source, "let a: number = 1;");
        assert_eq!(script_src.file, "p.ts");
        let style_src = page.editor_style_source().unwrap();
        assert_eq!(style_src.source, "@x: 1;");
        assert_eq!(page.editor_data_source().unwrap().mime_type, "application/json; charset=utf-8");
        assert_eq!(script.count(), 0);
        assert_eq!(style.count(), 0);
    }

    #[test]
    fn artifacts_are_memoized_until_load() {
        let script = Arc::new(CountingTranspiler::default());
        let dialects = Dialects {
            script: script.clone(),
            ..Dialects::default()
        };
        let page = page_with(&[("t/p/p.ts", "let a = 1;")], TemplateConfig::default(), dialects);
        page.asset_script().unwrap();
        page.asset_script().unwrap();
        assert!(!page.is_compiled(), "style slot still empty");
        page.compile().unwrap();
        assert!(page.is_compiled());
        assert_eq!(script.count(), 1);

        page.load().unwrap();
        assert!(!page.is_compiled());
    }

    #[test]
    fn render_compiles_referenced_fragments_and_skips_unknown() {
        let page = page_with(
            &[
                (
                    "t/p/p.html",
                    "<div data-sui-block=\"Hero\"></div><div data-gjs-type=\"text\"></div>",
                ),
                ("t/__blocks/Hero/Hero.html", "<h1>Hi</h1>"),
            ],
            TemplateConfig::default(),
            Dialects::default(),
        );
        let res = page.editor_render(&Request::default()).unwrap();
        assert!(res.html.starts_with("<div data-sui-block=\"Hero\"></div>"));
        assert!(res.html.contains("<script data-sui-entry=\"block__Hero\">window.block__Hero = "));
        assert!(!res.html.contains("component__text"));
    }

    #[test]
    fn broken_style_does_not_block_script() {
        let page = page_with(
            &[("t/p/p.js", "ok();"), ("t/p/p.less", "a { color: @nope; }")],
            TemplateConfig::default(),
            Dialects::default(),
        );
        assert_eq!(page.asset_script().unwrap().text(), "ok();");
        let err = page.asset_style().unwrap_err();
        assert!(matches!(err, SuiError::Compile { .. }), "{err}");
        assert!(err.to_string().contains("@nope"), "{err}");

        // Compile reports the style failure but keeps the built script.
        assert!(page.compile().is_err());
        assert!(!page.is_compiled());
        assert_eq!(page.asset_script().unwrap().text(), "ok();");
    }

    #[test]
    fn script_and_style_run_only_their_own_dialect() {
        let script = Arc::new(CountingTranspiler::default());
        let style = Arc::new(CountingStyleCompiler::default());
        let dialects = Dialects {
            script: script.clone(),
            style: style.clone(),
            ..Dialects::default()
        };
        let page = page_with(
            &[("t/p/p.ts", "let a = 1;"), ("t/p/p.less", "a { b: c; }")],
            TemplateConfig::default(),
            dialects,
        );
        page.asset_script().unwrap();
        assert_eq!((script.count(), style.count()), (1, 0));
        page.asset_style().unwrap();
        assert_eq!((script.count(), style.count()), (1, 1));
        assert!(page.is_compiled());
    }

    #[test]
    fn storage_failure_on_existing_file_is_source_read() {
        let storage = UnreadableStorage::new([("t/p/p.html", "<p></p>")], &["t/p/p.ts"]);
        let page = page_on(Arc::new(storage), TemplateConfig::default(), Dialects::default());

        let err = page.load().unwrap_err();
        match &err {
            SuiError::SourceRead { path, .. } => assert_eq!(path, "t/p/p.ts"),
            other => panic!("expected SourceRead, got {other:?}"),
        }
        assert!(!page.get().loaded);
        assert!(matches!(page.asset_script(), Err(SuiError::SourceRead { .. })));
        assert!(matches!(page.editor_page_source(), Err(SuiError::SourceRead { .. })));
    }

    #[test]
    fn concurrent_asset_requests_transpile_once() {
        let script = Arc::new(CountingTranspiler::default());
        let dialects = Dialects {
            script: script.clone(),
            ..Dialects::default()
        };
        let page = Arc::new(page_with(
            &[("t/p/p.ts", "let a = 1;")],
            TemplateConfig::default(),
            dialects,
        ));
        std::thread::scope(|scope| {
            for _ in 0..8 {
                let page = Arc::clone(&page);
                scope.spawn(move || {
                    assert_eq!(
                        page.asset_script().unwrap().text(),
                        "/* transpiled */\nlet a = 1;"
                    );
                });
            }
        });
        assert_eq!(script.count(), 1);
    }
}
