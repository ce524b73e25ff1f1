//! Block/component references in page markup, and the default expander.
//!
//! A page references a block with `data-sui-block="Hero"` and a component
//! with `data-sui-component="Nav"` (or the editor's own `data-gjs-type="Nav"`).
//! Matching is attribute-based only; whatever templating syntax surrounds the
//! attribute is left alone.

use super::{CompiledEntry, MarkupExpander};
use maud::{PreEscaped, html};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bdata-(sui-block|sui-component|gjs-type)\s*=\s*["']([^"']+)["']"#)
        .expect("valid reference pattern")
});

/// Block and component ids named in a piece of markup, deduplicated and sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct References {
    pub blocks: BTreeSet<String>,
    pub components: BTreeSet<String>,
}

impl References {
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty() && self.components.is_empty()
    }
}

pub fn collect_references(markup: &str) -> References {
    let mut refs = References::default();
    for caps in REFERENCE.captures_iter(markup) {
        let id = caps[2].trim();
        if id.is_empty() {
            continue;
        }
        match &caps[1] {
            "sui-block" => refs.blocks.insert(id.to_string()),
            _ => refs.components.insert(id.to_string()),
        };
    }
    refs
}

/// Appends one `<script data-sui-entry="...">` per compiled entry.
///
/// Entries go before `</body>` when the markup has one, otherwise after the
/// markup.
pub struct ScriptTagExpander;

impl MarkupExpander for ScriptTagExpander {
    fn expand(&self, markup: &str, entries: &[CompiledEntry]) -> String {
        if entries.is_empty() {
            return markup.to_string();
        }
        let tags = html! {
            @for entry in entries {
                script data-sui-entry=(entry.name) {
                    (PreEscaped(entry.script.replace("</script", "<\\/script")))
                }
            }
        }
        .into_string();

        match markup.rfind("</body>") {
            Some(at) => format!("{}{}\n{}", &markup[..at], tags, &markup[at..]),
            None if markup.is_empty() => tags,
            None => format!("{markup}\n{tags}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_blocks_and_components() {
        let refs = collect_references(
            r#"<div data-sui-block="Hero"></div>
               <nav data-sui-component='Nav'></nav>
               <div data-gjs-type="Nav"></div>
               <section data-sui-block="Section"></section>
               <div data-sui-block="Hero"></div>"#,
        );
        assert_eq!(
            refs.blocks.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["Hero", "Section"]
        );
        assert_eq!(
            refs.components.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["Nav"]
        );
    }

    #[test]
    fn markup_without_references() {
        assert!(collect_references("<p data-role=\"x\">hi</p>").is_empty());
    }

    #[test]
    fn expands_before_body_close() {
        let entries = vec![CompiledEntry {
            name: "block__Hero".into(),
            script: "window.block__Hero = 1;".into(),
        }];
        let html = ScriptTagExpander.expand("<body><p>x</p></body>", &entries);
        assert_eq!(
            html,
            concat!(
                "<body><p>x</p>",
                "<script data-sui-entry=\"block__Hero\">window.block__Hero = 1;</script>\n",
                "</body>",
            )
        );
    }

    #[test]
    fn expands_fragment_by_appending() {
        let entries = vec![CompiledEntry {
            name: "component__Nav".into(),
            script: "var s = \"</script>\";".into(),
        }];
        let html = ScriptTagExpander.expand("<nav></nav>", &entries);
        assert_eq!(
            html,
            concat!(
                "<nav></nav>\n",
                "<script data-sui-entry=\"component__Nav\">var s = \"<\\/script>\";</script>",
            )
        );
    }

    #[test]
    fn no_entries_leaves_markup_untouched() {
        assert_eq!(ScriptTagExpander.expand("<p>x</p>", &[]), "<p>x</p>");
    }
}
