//! Centralized path and name conventions shared by the storage, tree, and
//! route modules.
//!
//! Storage paths are logical, `/`-separated, and relative to the storage
//! root. Routes always start with `/` and never end with one (except the root
//! route itself). A path segment wrapped in brackets (`[id]`) is parametric.
//!
//! ## File Conventions
//!
//! - A page at directory `D` with base name `N` keeps its sources at
//!   `D/N.html`, `D/N.css`, `D/N.less`, `D/N.js`, `D/N.ts`, `D/N.json`.
//! - A block or component `X` keeps its sources at `X/X.html`, `X/X.js`,
//!   `X/X.ts` under the template's `__blocks` or `__components` directory.

/// Extensions that make a file part of a page's file set.
pub const PAGE_EXTENSIONS: &[&str] = &["html", "css", "less", "js", "ts", "json"];

/// Prefix marking template-internal directories (`__assets`, `__blocks`, ...).
pub const INTERNAL_PREFIX: &str = "__";

/// Editor reference prefix for template assets.
pub const ASSETS_PREFIX: &str = "@assets";

/// Editor reference prefix for compiled page assets.
pub const PAGES_PREFIX: &str = "@pages";

/// One segment of a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Literal(&'a str),
    /// Bracketed segment; holds the parameter name without brackets.
    Param(&'a str),
}

impl<'a> Segment<'a> {
    pub fn parse(name: &'a str) -> Self {
        match name.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            Some(param) if !param.is_empty() => Segment::Param(param),
            _ => Segment::Literal(name),
        }
    }

    pub fn is_param(&self) -> bool {
        matches!(self, Segment::Param(_))
    }
}

/// Whether a node/segment name uses the bracket convention.
pub fn is_parametric(name: &str) -> bool {
    Segment::parse(name).is_param()
}

/// Join storage path parts with `/`, dropping empty parts and redundant slashes.
///
/// - `join(&["templates", "tech-blue"])` → `"templates/tech-blue"`
/// - `join(&["", "/index/", "index.html"])` → `"index/index.html"`
pub fn join(parts: &[&str]) -> String {
    parts
        .iter()
        .flat_map(|p| p.split('/'))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Normalize a route: leading `/`, no trailing `/`, no empty segments.
pub fn normalize_route(route: &str) -> String {
    let joined = join(&[route]);
    format!("/{joined}")
}

/// Split a route into its non-empty segments.
pub fn route_segments(route: &str) -> Vec<&str> {
    route.split('/').filter(|s| !s.is_empty()).collect()
}

/// Split `name.ext` into `(name, ext)`. Returns `None` without an extension.
pub fn split_extension(file: &str) -> Option<(&str, &str)> {
    let (stem, ext) = file.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }
    Some((stem, ext))
}

/// Last `/`-separated component of a path.
pub fn base_name(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
}

/// Everything before the last `/`-separated component. Empty for single parts.
pub fn parent(path: &str) -> &str {
    match path.trim_end_matches('/').rsplit_once('/') {
        Some((parent, _)) => parent,
        None => "",
    }
}

/// Entries that never take part in the page tree.
pub fn is_ignored_entry(name: &str) -> bool {
    name.starts_with('.') || name.starts_with(INTERNAL_PREFIX) || name == "template.toml"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bracket_segment_is_param() {
        assert_eq!(Segment::parse("[id]"), Segment::Param("id"));
        assert!(is_parametric("[invite]"));
    }

    #[test]
    fn plain_and_malformed_segments_are_literal() {
        assert_eq!(Segment::parse("404"), Segment::Literal("404"));
        assert_eq!(Segment::parse("[]"), Segment::Literal("[]"));
        assert_eq!(Segment::parse("[open"), Segment::Literal("[open"));
    }

    #[test]
    fn join_drops_empty_parts() {
        assert_eq!(join(&["templates", "tech-blue"]), "templates/tech-blue");
        assert_eq!(join(&["", "/index/", "index.html"]), "index/index.html");
        assert_eq!(join(&[]), "");
    }

    #[test]
    fn normalize_route_shapes() {
        assert_eq!(normalize_route("page/404/"), "/page/404");
        assert_eq!(normalize_route("//index"), "/index");
        assert_eq!(normalize_route(""), "/");
    }

    #[test]
    fn extension_split() {
        assert_eq!(split_extension("[id].ts"), Some(("[id]", "ts")));
        assert_eq!(split_extension("a.b.css"), Some(("a.b", "css")));
        assert_eq!(split_extension("README"), None);
        assert_eq!(split_extension(".hidden"), None);
    }

    #[test]
    fn base_and_parent() {
        assert_eq!(base_name("page/404/404.js"), "404.js");
        assert_eq!(parent("page/404/404.js"), "page/404");
        assert_eq!(parent("index"), "");
    }

    #[test]
    fn internal_entries_ignored() {
        assert!(is_ignored_entry("__assets"));
        assert!(is_ignored_entry(".DS_Store"));
        assert!(is_ignored_entry("template.toml"));
        assert!(!is_ignored_entry("index"));
    }
}
