//! Blocks and components: reusable markup+script fragments.
//!
//! A fragment `X` lives at `__blocks/X/` (or `__components/X/`) and has up to
//! three sources: `X.html`, `X.js`, `X.ts`. Compiling it produces a script
//! that registers a global entry carrying the script's exports and the
//! markup as its `template`:
//!
//! ```js
//! window.block__Hero = (function (template) {
//!   const entry = (function () {
//!   /* Hero.js, or Hero.ts transpiled */
//!   })() || {};
//!   return Object.assign({ id: "Hero", template: template }, entry);
//! })(`<section>...</section>`);
//! ```
//!
//! Each fragment moves through `Unloaded → Loaded → Compiled` under its own
//! lock, so concurrent compile requests for one fragment run the work once.

use crate::config::ScriptPrecedence;
use crate::error::{Kind, Result, SuiError};
use crate::naming;
use crate::storage::StorageError;
use crate::source::{self, Pick, SourceUnit};
use crate::template::TemplateContext;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

pub const BLOCKS_DIR: &str = "__blocks";
pub const COMPONENTS_DIR: &str = "__components";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentKind {
    Block,
    Component,
}

impl FragmentKind {
    /// Directory under the template root.
    pub fn dir(self) -> &'static str {
        match self {
            FragmentKind::Block => BLOCKS_DIR,
            FragmentKind::Component => COMPONENTS_DIR,
        }
    }

    /// Prefix of the registered global (`block__Hero`).
    pub fn prefix(self) -> &'static str {
        match self {
            FragmentKind::Block => "block",
            FragmentKind::Component => "component",
        }
    }
}

impl fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FragmentKind::Block => "Block",
            FragmentKind::Component => "Component",
        })
    }
}

/// The three source units of a fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FragmentCodes {
    pub html: SourceUnit,
    pub js: SourceUnit,
    pub ts: SourceUnit,
}

#[derive(Debug, Clone)]
enum State {
    Unloaded,
    Loaded(Arc<FragmentCodes>),
    Compiled(Arc<FragmentCodes>, Arc<str>),
}

pub struct Fragment {
    kind: FragmentKind,
    id: String,
    ctx: Arc<TemplateContext>,
    /// Unit paths, recorded at construction.
    codes: FragmentCodes,
    state: Mutex<State>,
}

impl fmt::Debug for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fragment")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl Fragment {
    pub(crate) fn new(kind: FragmentKind, id: &str, ctx: Arc<TemplateContext>) -> Self {
        let dir = naming::join(&[&ctx.root, kind.dir(), id]);
        let unit = |ext: &str| {
            SourceUnit::new(
                format!("/{id}/{id}.{ext}"),
                naming::join(&[&dir, &format!("{id}.{ext}")]),
            )
        };
        let codes = FragmentCodes {
            html: unit("html"),
            js: unit("js"),
            ts: unit("ts"),
        };
        Self {
            kind,
            id: id.to_string(),
            ctx,
            codes,
            state: Mutex::new(State::Unloaded),
        }
    }

    pub fn kind(&self) -> FragmentKind {
        self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Name of the global the compiled script registers (`block__Hero`).
    pub fn global_name(&self) -> String {
        format!("{}__{}", self.kind.prefix(), self.id)
    }

    /// Read all source units, replacing any earlier load or compile.
    pub fn load(&self) -> Result<()> {
        let mut state = self.state.lock();
        *state = State::Loaded(self.read_codes()?);
        Ok(())
    }

    /// Loaded sources, loading on first use.
    pub fn codes(&self) -> Result<Arc<FragmentCodes>> {
        let mut state = self.state.lock();
        self.ensure_loaded(&mut state)
    }

    /// Unloaded codes: file names and paths only.
    pub fn files(&self) -> &FragmentCodes {
        &self.codes
    }

    /// Raw script text, before transpilation.
    pub fn source(&self) -> Result<String> {
        let codes = self.codes()?;
        Ok(match self.pick(&codes) {
            Pick::Plain(unit) | Pick::Dialect(unit) => unit.code.clone(),
            Pick::Neither => String::new(),
        })
    }

    /// The self-registering script. Memoized until the next `load`.
    pub fn compile(&self) -> Result<String> {
        let mut state = self.state.lock();
        if let State::Compiled(_, compiled) = &*state {
            return Ok(compiled.to_string());
        }
        let codes = self.ensure_loaded(&mut state)?;
        let compiled: Arc<str> = self.render(&codes)?.into();
        debug!(fragment = %self.global_name(), bytes = compiled.len(), "compiled fragment");
        *state = State::Compiled(codes, Arc::clone(&compiled));
        Ok(compiled.to_string())
    }

    /// Whether a compiled artifact is currently memoized.
    pub fn is_compiled(&self) -> bool {
        matches!(&*self.state.lock(), State::Compiled(..))
    }

    fn ensure_loaded(&self, state: &mut State) -> Result<Arc<FragmentCodes>> {
        match state {
            State::Loaded(codes) | State::Compiled(codes, _) => Ok(Arc::clone(codes)),
            State::Unloaded => {
                let codes = self.read_codes()?;
                *state = State::Loaded(Arc::clone(&codes));
                Ok(codes)
            }
        }
    }

    fn read_codes(&self) -> Result<Arc<FragmentCodes>> {
        let storage = self.ctx.storage.as_ref();
        let read = |unit: &SourceUnit| {
            unit.loaded(storage).map_err(|source| SuiError::SourceRead {
                path: unit.path().to_string(),
                source,
            })
        };
        Ok(Arc::new(FragmentCodes {
            html: read(&self.codes.html)?,
            js: read(&self.codes.js)?,
            ts: read(&self.codes.ts)?,
        }))
    }

    fn pick<'a>(&self, codes: &'a FragmentCodes) -> Pick<'a> {
        let prefer_ts = self.ctx.config.script_precedence == ScriptPrecedence::Ts;
        source::pick(&codes.js, &codes.ts, prefer_ts)
    }

    fn render(&self, codes: &FragmentCodes) -> Result<String> {
        let body = match self.pick(codes) {
            Pick::Plain(unit) => unit.code.clone(),
            Pick::Dialect(unit) => self.ctx.transpile(unit)?,
            Pick::Neither => String::new(),
        };
        Ok(wrap(&self.global_name(), &self.id, &body, &codes.html.code))
    }
}

/// Fragments by id, sorted.
pub type FragmentMap = BTreeMap<String, Arc<Fragment>>;

/// Lazily listed blocks and components of one template.
///
/// The listing is built on first use and kept until [`FragmentIndex::clear`].
pub struct FragmentIndex {
    ctx: Arc<TemplateContext>,
    blocks: RwLock<Option<Arc<FragmentMap>>>,
    components: RwLock<Option<Arc<FragmentMap>>>,
}

impl FragmentIndex {
    pub fn new(ctx: Arc<TemplateContext>) -> Self {
        Self {
            ctx,
            blocks: RwLock::new(None),
            components: RwLock::new(None),
        }
    }

    fn slot(&self, kind: FragmentKind) -> &RwLock<Option<Arc<FragmentMap>>> {
        match kind {
            FragmentKind::Block => &self.blocks,
            FragmentKind::Component => &self.components,
        }
    }

    /// All fragments of `kind`, in id order.
    pub fn list(&self, kind: FragmentKind) -> Result<Arc<FragmentMap>> {
        if let Some(map) = &*self.slot(kind).read() {
            return Ok(Arc::clone(map));
        }
        let mut slot = self.slot(kind).write();
        if let Some(map) = &*slot {
            return Ok(Arc::clone(map));
        }
        let map = Arc::new(self.scan(kind)?);
        debug!(%kind, count = map.len(), "listed fragments");
        *slot = Some(Arc::clone(&map));
        Ok(map)
    }

    pub fn find(&self, kind: FragmentKind, id: &str) -> Result<Option<Arc<Fragment>>> {
        Ok(self.list(kind)?.get(id).cloned())
    }

    pub fn get(&self, kind: FragmentKind, id: &str) -> Result<Arc<Fragment>> {
        let not_found_kind = match kind {
            FragmentKind::Block => Kind::Block,
            FragmentKind::Component => Kind::Component,
        };
        self.find(kind, id)?
            .ok_or_else(|| SuiError::not_found(not_found_kind, id))
    }

    /// Forget the listings; fragments are rebuilt on next use.
    pub fn clear(&self) {
        *self.blocks.write() = None;
        *self.components.write() = None;
    }

    fn scan(&self, kind: FragmentKind) -> Result<FragmentMap> {
        let dir = naming::join(&[&self.ctx.root, kind.dir()]);
        let entries = match self.ctx.storage.list(&dir) {
            Ok(entries) => entries,
            Err(StorageError::NotFound(_)) => return Ok(FragmentMap::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(entries
            .into_iter()
            .filter(|e| e.is_dir() && !e.name.starts_with('.'))
            .map(|e| {
                let fragment = Fragment::new(kind, &e.name, Arc::clone(&self.ctx));
                (e.name, Arc::new(fragment))
            })
            .collect())
    }
}

/// Assemble the registration wrapper around a script body and markup.
fn wrap(global: &str, id: &str, body: &str, markup: &str) -> String {
    let target = if global
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
    {
        format!("window.{global}")
    } else {
        format!("window[{}]", js_string(global))
    };
    let body = body.trim_end_matches('\n');
    format!(
        concat!(
            "{target} = (function (template) {{\n",
            "  const entry = (function () {{\n{body}\n  }})() || {{}};\n",
            "  return Object.assign({{ id: {id}, template: template }}, entry);\n",
            "}})(`{markup}`);\n",
        ),
        target = target,
        body = body,
        id = js_string(id),
        markup = escape_template_literal(markup),
    )
}

fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{s}\""))
}

/// Escape text for a JavaScript template literal.
pub fn escape_template_literal(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('`', "\\`")
        .replace("${", "\\${")
}
