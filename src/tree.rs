//! Page tree: the template's page sources as a route hierarchy.
//!
//! ```text
//! tech-blue/                    (root)
//! ├── error/error.html          /error           dir node with page
//! ├── index/index.html          /index           dir node with page
//! │   └── [invite]/[invite].ts  /index/[invite]  parametric, kept verbatim
//! ├── landing.html              /landing         leaf (is_dir = false)
//! └── page/                     (no page)
//!     ├── 404/404.js            /page/404
//!     └── [id]/[id].ts          /page/[id]
//! ```
//!
//! Siblings are ordered by name, byte-wise (`[id]` sorts after `404`).
//! Directories starting with `__` or `.` and `template.toml` never appear.

use crate::error::Result;
use crate::fragment::FragmentIndex;
use crate::naming;
use crate::page::Page;
use crate::storage::Entry;
use crate::template::TemplateContext;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::warn;

/// Extensions whose presence makes a file set a page (data alone does not).
const DEFINING_EXTENSIONS: &[&str] = &["html", "css", "less", "js", "ts"];

#[derive(Debug, Clone, Serialize)]
pub struct PageTreeNode {
    pub name: String,
    pub is_dir: bool,
    /// On the path from the root to the node a lookup matched.
    pub active: bool,
    /// Route of the attached page, if any.
    pub route: Option<String>,
    pub children: Vec<PageTreeNode>,
    #[serde(skip)]
    pub page: Option<Arc<Page>>,
}

impl PageTreeNode {
    fn dir(name: &str) -> Self {
        Self {
            name: name.to_string(),
            is_dir: true,
            active: false,
            route: None,
            children: Vec::new(),
            page: None,
        }
    }

    fn attach(&mut self, page: Page) {
        self.route = Some(page.route().to_string());
        self.page = Some(Arc::new(page));
    }

    /// Every page in the subtree, in pre-order (own page, then children).
    pub fn pages(&self) -> Vec<Arc<Page>> {
        let mut pages = Vec::new();
        self.collect_pages(&mut pages);
        pages
    }

    fn collect_pages(&self, out: &mut Vec<Arc<Page>>) {
        if let Some(page) = &self.page {
            out.push(Arc::clone(page));
        }
        for child in &self.children {
            child.collect_pages(out);
        }
    }

    /// Number of nodes in the subtree, including this one.
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(PageTreeNode::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty() && self.page.is_none()
    }
}

/// Walk the template root and build its page tree.
pub fn build_tree(
    ctx: &Arc<TemplateContext>,
    fragments: &Arc<FragmentIndex>,
) -> Result<PageTreeNode> {
    let builder = Builder { ctx, fragments };
    let mut root = PageTreeNode::dir(&ctx.name);
    builder.walk(&ctx.root, "", None, &mut root)?;
    Ok(root)
}

struct Builder<'a> {
    ctx: &'a Arc<TemplateContext>,
    fragments: &'a Arc<FragmentIndex>,
}

impl Builder<'_> {
    fn page(&self, route: String, dir: &str, name: &str) -> Page {
        Page::new(
            route,
            dir.to_string(),
            name,
            Arc::clone(self.ctx),
            Arc::clone(self.fragments),
        )
    }

    /// Fill `node` from storage directory `dir`, whose route is `route`.
    ///
    /// `own_name` is the directory's name; a file set with that name is the
    /// directory's own page. `None` at the template root.
    fn walk(
        &self,
        dir: &str,
        route: &str,
        own_name: Option<&str>,
        node: &mut PageTreeNode,
    ) -> Result<()> {
        let entries = self.ctx.storage.list(dir)?;
        let file_sets = file_sets(&entries);
        let dirs: BTreeSet<&str> = entries
            .iter()
            .filter(|e| e.is_dir() && !naming::is_ignored_entry(&e.name))
            .map(|e| e.name.as_str())
            .collect();

        let mut children: BTreeMap<String, PageTreeNode> = BTreeMap::new();
        for &name in &dirs {
            let mut child = PageTreeNode::dir(name);
            let child_route = format!("{route}/{name}");
            self.walk(
                &naming::join(&[dir, name]),
                &child_route,
                Some(name),
                &mut child,
            )?;
            children.insert(name.to_string(), child);
        }

        for name in file_sets {
            if Some(name) == own_name {
                node.attach(self.page(route.to_string(), dir, name));
                continue;
            }
            if dirs.contains(name) {
                warn!(dir, name, "file set shadowed by directory of the same name");
                continue;
            }
            let mut leaf = PageTreeNode::dir(name);
            leaf.is_dir = false;
            leaf.attach(self.page(format!("{route}/{name}"), dir, name));
            children.insert(name.to_string(), leaf);
        }

        node.children = children.into_values().collect();
        Ok(())
    }
}

/// Base names of the page-defining file sets in a listing.
fn file_sets(entries: &[Entry]) -> BTreeSet<&str> {
    entries
        .iter()
        .filter(|e| !e.is_dir() && !naming::is_ignored_entry(&e.name))
        .filter_map(|e| naming::split_extension(&e.name))
        .filter(|(_, ext)| DEFINING_EXTENSIONS.contains(ext))
        .map(|(stem, _)| stem)
        .collect()
}

/// Clone of `root`'s children with the nodes along `path` flagged active.
///
/// `path` holds child indices from the root down to the matched node.
pub fn mark_active(root: &PageTreeNode, path: &[usize]) -> Vec<PageTreeNode> {
    let mut children = root.children.clone();
    let mut level = &mut children;
    for &index in path {
        let Some(node) = level.get_mut(index) else {
            break;
        };
        node.active = true;
        level = &mut node.children;
    }
    children
}
