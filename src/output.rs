//! CLI output formatting.
//!
//! Each command has a `format_*` function that returns lines, for
//! testability, and a `print_*` wrapper that writes them to stdout. Format
//! functions never touch storage: callers resolve pages, trees, and reports
//! first and hand over plain data.
//!
//! # Output Format
//!
//! ## Templates
//!
//! ```text
//! 001 Tech Blue (tech-blue)
//!     Description: A blue technology theme
//! ```
//!
//! ## Tree
//!
//! ```text
//! error → /error
//! index → /index
//!     [invite] → /index/[invite]
//! page/
//!     404 → /page/404
//!     [id] → /page/[id]
//! ```
//!
//! ## Precompile
//!
//! ```text
//! /index: ok
//! /page/[id]: FAILED failed to compile /[id].ts: line 3: Unexpected token
//! Compiled 5 pages, 4 fragments, 1 failure
//! Cache: 2 cached, 3 compiled (5 total)
//! ```

use crate::fragment::Fragment;
use crate::template::{PrecompileReport, Template};
use crate::tree::PageTreeNode;
use std::sync::Arc;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate_desc(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

// ============================================================================
// Templates
// ============================================================================

/// One header per template: index, label, and the directory name when the
/// label differs from it.
pub fn format_templates(templates: &[Arc<Template>]) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, template) in templates.iter().enumerate() {
        let header = if template.label() == template.name() {
            format!("{} {}", format_index(i + 1), template.name())
        } else {
            format!(
                "{} {} ({})",
                format_index(i + 1),
                template.label(),
                template.name()
            )
        };
        lines.push(header);
        if !template.description().is_empty() {
            lines.push(format!(
                "{}Description: {}",
                indent(1),
                truncate_desc(template.description(), 60)
            ));
        }
    }
    if lines.is_empty() {
        lines.push("No templates".to_string());
    }
    lines
}

pub fn print_templates(templates: &[Arc<Template>]) {
    for line in format_templates(templates) {
        println!("{}", line);
    }
}

// ============================================================================
// Page tree
// ============================================================================

/// Indented page tree. Directories without a page end with `/`; active
/// nodes are starred.
pub fn format_tree(nodes: &[PageTreeNode]) -> Vec<String> {
    let mut lines = Vec::new();
    walk_tree(nodes, 0, &mut lines);
    lines
}

fn walk_tree(nodes: &[PageTreeNode], depth: usize, lines: &mut Vec<String>) {
    for node in nodes {
        let marker = if node.active { "* " } else { "" };
        let line = match &node.route {
            Some(route) => format!("{}{}{} → {}", indent(depth), marker, node.name, route),
            None => format!("{}{}{}/", indent(depth), marker, node.name),
        };
        lines.push(line);
        walk_tree(&node.children, depth + 1, lines);
    }
}

pub fn print_tree(nodes: &[PageTreeNode]) {
    for line in format_tree(nodes) {
        println!("{}", line);
    }
}

/// Flat route listing with the page's storage directory as context.
pub fn format_pages(tree: &PageTreeNode) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, page) in tree.pages().iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), page.route()));
        lines.push(format!("{}Source: {}/{}.*", indent(1), page.path(), page.name()));
    }
    lines
}

pub fn print_pages(tree: &PageTreeNode) {
    for line in format_pages(tree) {
        println!("{}", line);
    }
}

// ============================================================================
// Blocks and components
// ============================================================================

pub fn format_fragments(title: &str, fragments: &[Arc<Fragment>]) -> Vec<String> {
    let mut lines = vec![title.to_string()];
    for (i, fragment) in fragments.iter().enumerate() {
        lines.push(format!(
            "{} {} → window.{}",
            format_index(i + 1),
            fragment.id(),
            fragment.global_name()
        ));
    }
    lines
}

pub fn print_fragments(title: &str, fragments: &[Arc<Fragment>]) {
    for line in format_fragments(title, fragments) {
        println!("{}", line);
    }
}

// ============================================================================
// Precompile
// ============================================================================

pub fn format_precompile_report(report: &PrecompileReport) -> Vec<String> {
    let mut lines = Vec::new();
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(()) => lines.push(format!("{}: ok", outcome.route)),
            Err(e) => lines.push(format!("{}: FAILED {}", outcome.route, e)),
        }
    }
    let pages = report.outcomes.len() - report.fragments;
    let failures = report.failures().count();
    lines.push(format!(
        "Compiled {}, {}, {}",
        plural(pages, "page"),
        plural(report.fragments, "fragment"),
        plural(failures, "failure")
    ));
    lines.push(format!("Cache: {}", report.cache));
    lines
}

pub fn print_precompile_report(report: &PrecompileReport) {
    for line in format_precompile_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStats;
    use crate::dialect::DialectError;
    use crate::error::SuiError;
    use crate::template::PrecompileOutcome;

    fn node(name: &str, route: Option<&str>, children: Vec<PageTreeNode>) -> PageTreeNode {
        PageTreeNode {
            name: name.to_string(),
            is_dir: true,
            active: false,
            route: route.map(str::to_string),
            children,
            page: None,
        }
    }

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(100), "100");
    }

    #[test]
    fn truncate_desc_respects_char_boundaries() {
        assert_eq!(truncate_desc("short", 40), "short");
        assert_eq!(truncate_desc("ééééé", 3), "ééé...");
    }

    #[test]
    fn plural_forms() {
        assert_eq!(plural(1, "page"), "1 page");
        assert_eq!(plural(0, "failure"), "0 failures");
    }

    #[test]
    fn tree_lines_show_routes_and_bare_dirs() {
        let mut index = node(
            "index",
            Some("/index"),
            vec![node("[invite]", Some("/index/[invite]"), vec![])],
        );
        index.active = true;
        let nodes = vec![
            index,
            node("page", None, vec![node("404", Some("/page/404"), vec![])]),
        ];
        assert_eq!(
            format_tree(&nodes),
            vec![
                "* index → /index",
                "    [invite] → /index/[invite]",
                "page/",
                "    404 → /page/404",
            ]
        );
    }

    #[test]
    fn precompile_report_lines() {
        let report = PrecompileReport {
            outcomes: vec![
                PrecompileOutcome {
                    route: "/index".to_string(),
                    result: Ok(()),
                },
                PrecompileOutcome {
                    route: "/page/[id]".to_string(),
                    result: Err(SuiError::Compile {
                        file: "/[id].ts".to_string(),
                        source: DialectError::at(3, "Unexpected token"),
                    }),
                },
                PrecompileOutcome {
                    route: "Block:Hero".to_string(),
                    result: Ok(()),
                },
            ],
            fragments: 1,
            cache: CacheStats { hits: 0, misses: 2 },
        };
        assert_eq!(
            format_precompile_report(&report),
            vec![
                "/index: ok",
                "/page/[id]: FAILED failed to compile /[id].ts: line 3: Unexpected token",
                "Block:Hero: ok",
                "Compiled 2 pages, 1 fragment, 1 failure",
                "Cache: 2 compiled",
            ]
        );
    }
}
