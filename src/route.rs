//! Route matching over a page tree.
//!
//! Resolution order for a route:
//!
//! 1. a page whose route equals the request exactly
//! 2. segment-by-segment descent; at each depth literal children are tried
//!    before parametric `[name]` children, backtracking when a branch dead-ends
//!
//! So `/page/404` hits the literal `404` page while `/page/7` falls through
//! to `/page/[id]`.

use crate::naming;
use crate::tree::PageTreeNode;

/// Child indices from the root to the node whose page answers `route`.
pub fn match_route(root: &PageTreeNode, route: &str) -> Option<Vec<usize>> {
    let route = naming::normalize_route(route);
    if let Some(path) = exact(root, &route) {
        return Some(path);
    }
    let segments = naming::route_segments(&route);
    let mut path = Vec::with_capacity(segments.len());
    descend(root, &segments, &mut path).then_some(path)
}

/// Node reached by following `path` from `root`.
pub fn node_at<'a>(root: &'a PageTreeNode, path: &[usize]) -> Option<&'a PageTreeNode> {
    path.iter()
        .try_fold(root, |node, &index| node.children.get(index))
}

/// Candidate routes for an asset path, nearest first.
///
/// `@pages/page/404/404.js` → `/page/404`, `/page`.
pub fn asset_routes(asset: &str) -> Vec<String> {
    let trimmed = asset.trim_start_matches('/');
    let stripped = trimmed
        .strip_prefix(naming::PAGES_PREFIX)
        .unwrap_or(trimmed);
    let mut dir = naming::parent(&naming::join(&[stripped])).to_string();
    let mut routes = Vec::new();
    while !dir.is_empty() {
        routes.push(naming::normalize_route(&dir));
        dir = naming::parent(&dir).to_string();
    }
    routes
}

fn exact(node: &PageTreeNode, route: &str) -> Option<Vec<usize>> {
    for (index, child) in node.children.iter().enumerate() {
        if child.route.as_deref() == Some(route) {
            return Some(vec![index]);
        }
        if let Some(mut rest) = exact(child, route) {
            rest.insert(0, index);
            return Some(rest);
        }
    }
    None
}

fn descend(node: &PageTreeNode, segments: &[&str], path: &mut Vec<usize>) -> bool {
    let Some((segment, rest)) = segments.split_first() else {
        return node.route.is_some();
    };

    let literal = node
        .children
        .iter()
        .enumerate()
        .filter(|(_, child)| child.name == *segment);
    let parametric = node
        .children
        .iter()
        .enumerate()
        .filter(|(_, child)| naming::is_parametric(&child.name) && child.name != *segment);

    for (index, child) in literal.chain(parametric) {
        path.push(index);
        if descend(child, rest, path) {
            return true;
        }
        path.pop();
    }
    false
}
