//! LESS → CSS for the subset templates use.
//!
//! Supported:
//! - `@name: value;` variables, lexically scoped, usable before definition
//! - `@{name}` interpolation in selectors and property names
//! - nested rules, with `&` for the parent selector
//! - `@media`/`@supports`/any block at-rule, bubbled out of rules
//! - `.mixin;` / `.mixin();` calls to plain top-level class rules
//! - `//` and `/* */` comments (dropped from the output)
//!
//! Not supported: operations, guards, parametric mixins, functions. Values
//! are copied through verbatim after variable substitution.

use super::{DialectError, StyleCompiler};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Default [`StyleCompiler`].
pub struct LessCompiler;

impl StyleCompiler for LessCompiler {
    fn compile(&self, source: &str) -> Result<String, DialectError> {
        let nodes = Parser::new(source).parse_block(true)?;
        let mixins = collect_mixins(&nodes);
        let mut out = String::new();
        Emitter {
            mixins: &mixins,
            scopes: Vec::new(),
        }
        .block(&nodes, &[], 0, &mut out)?;
        Ok(out)
    }
}

static INTERPOLATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@\{([\w-]+)\}").expect("valid interpolation pattern"));
static VARIABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@([A-Za-z_][\w-]*)").expect("valid variable pattern"));
static VARIABLE_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@([A-Za-z_][\w-]*)\s*:(.*)$").expect("valid declaration pattern")
});

/// Deepest variable-to-variable chain before we call it a cycle.
const MAX_VARIABLE_DEPTH: usize = 16;

#[derive(Debug, Clone)]
enum Node {
    Variable { name: String, value: String },
    Declaration { property: String, value: String },
    MixinCall { name: String, line: usize },
    Rule { selectors: Vec<String>, children: Vec<Node> },
    AtRule { prelude: String, children: Option<Vec<Node>> },
}

struct Parser {
    src: Vec<char>,
    pos: usize,
}

/// What ended a statement.
enum Terminator {
    OpenBrace,
    Semicolon,
    CloseBrace,
    End,
}

impl Parser {
    fn new(source: &str) -> Self {
        Self {
            src: source.chars().collect(),
            pos: 0,
        }
    }

    fn line(&self) -> usize {
        self.src[..self.pos.min(self.src.len())]
            .iter()
            .filter(|&&c| c == '\n')
            .count()
            + 1
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.src.get(self.pos + offset).copied()
    }

    fn skip_trivia(&mut self) -> Result<(), DialectError> {
        loop {
            match (self.peek(0), self.peek(1)) {
                (Some(c), _) if c.is_whitespace() => self.pos += 1,
                (Some('/'), Some('/')) => {
                    while self.peek(0).is_some_and(|c| c != '\n') {
                        self.pos += 1;
                    }
                }
                (Some('/'), Some('*')) => self.skip_block_comment()?,
                _ => return Ok(()),
            }
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), DialectError> {
        let line = self.line();
        self.pos += 2;
        loop {
            match (self.peek(0), self.peek(1)) {
                (Some('*'), Some('/')) => {
                    self.pos += 2;
                    return Ok(());
                }
                (Some(_), _) => self.pos += 1,
                (None, _) => return Err(DialectError::at(line, "unterminated comment")),
            }
        }
    }

    /// Read statement text up to `{`, `;`, `}` or end of input.
    fn statement(&mut self) -> Result<(String, Terminator), DialectError> {
        let mut text = String::new();
        let mut parens = 0usize;
        while let Some(c) = self.peek(0) {
            match c {
                '"' | '\'' => {
                    let line = self.line();
                    text.push(c);
                    self.pos += 1;
                    loop {
                        match self.peek(0) {
                            Some('\\') => {
                                text.push('\\');
                                if let Some(n) = self.peek(1) {
                                    text.push(n);
                                }
                                self.pos += 2;
                            }
                            Some(q) if q == c => {
                                text.push(q);
                                self.pos += 1;
                                break;
                            }
                            Some('\n') | None => {
                                return Err(DialectError::at(line, "unterminated string"));
                            }
                            Some(other) => {
                                text.push(other);
                                self.pos += 1;
                            }
                        }
                    }
                    continue;
                }
                '@' if self.peek(1) == Some('{') => {
                    while let Some(ch) = self.peek(0) {
                        text.push(ch);
                        self.pos += 1;
                        if ch == '}' {
                            break;
                        }
                    }
                    continue;
                }
                '/' if self.peek(1) == Some('*') => {
                    self.skip_block_comment()?;
                    continue;
                }
                // `//` inside parens is a URL (`url(//cdn/x.png)`), not a comment.
                '/' if self.peek(1) == Some('/') && parens == 0 => {
                    while self.peek(0).is_some_and(|c| c != '\n') {
                        self.pos += 1;
                    }
                    continue;
                }
                '(' => parens += 1,
                ')' => parens = parens.saturating_sub(1),
                '{' if parens == 0 => {
                    self.pos += 1;
                    return Ok((text, Terminator::OpenBrace));
                }
                ';' if parens == 0 => {
                    self.pos += 1;
                    return Ok((text, Terminator::Semicolon));
                }
                '}' if parens == 0 => return Ok((text, Terminator::CloseBrace)),
                _ => {}
            }
            text.push(c);
            self.pos += 1;
        }
        Ok((text, Terminator::End))
    }

    fn parse_block(&mut self, top: bool) -> Result<Vec<Node>, DialectError> {
        let open_line = self.line();
        let mut nodes = Vec::new();
        loop {
            self.skip_trivia()?;
            match self.peek(0) {
                None if top => return Ok(nodes),
                None => return Err(DialectError::at(open_line, "missing closing `}`")),
                Some('}') if top => return Err(DialectError::at(self.line(), "unexpected `}`")),
                Some('}') => {
                    self.pos += 1;
                    return Ok(nodes);
                }
                Some(_) => {}
            }

            let line = self.line();
            let (text, terminator) = self.statement()?;
            let text = text.trim().to_string();
            match terminator {
                Terminator::OpenBrace => {
                    let children = self.parse_block(false)?;
                    if text.starts_with('@') {
                        nodes.push(Node::AtRule {
                            prelude: text,
                            children: Some(children),
                        });
                    } else {
                        nodes.push(Node::Rule {
                            selectors: split_top_level(&text),
                            children,
                        });
                    }
                }
                Terminator::Semicolon | Terminator::CloseBrace | Terminator::End => {
                    if !text.is_empty() {
                        nodes.push(classify(&text, line)?);
                    }
                }
            }
        }
    }
}

fn classify(text: &str, line: usize) -> Result<Node, DialectError> {
    if let Some(caps) = VARIABLE_DECL.captures(text) {
        return Ok(Node::Variable {
            name: caps[1].to_string(),
            value: caps[2].trim().to_string(),
        });
    }
    if text.starts_with('@') {
        return Ok(Node::AtRule {
            prelude: text.to_string(),
            children: None,
        });
    }
    if (text.starts_with('.') || text.starts_with('#')) && !text.contains(':') {
        let name = text.trim_end_matches("()").trim().to_string();
        return Ok(Node::MixinCall { name, line });
    }
    match text.split_once(':') {
        Some((property, value)) if !property.trim().is_empty() => Ok(Node::Declaration {
            property: property.trim().to_string(),
            value: value.trim().to_string(),
        }),
        _ => Err(DialectError::at(line, format!("unexpected `{text}`"))),
    }
}

/// Split on commas outside parentheses.
fn split_top_level(selectors: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for c in selectors.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    parts.push(current.trim().to_string());
    parts.retain(|p| !p.is_empty());
    parts
}

/// Top-level single-class rules callable as mixins, by name.
fn collect_mixins(nodes: &[Node]) -> HashMap<String, Vec<Node>> {
    nodes
        .iter()
        .filter_map(|node| match node {
            Node::Rule {
                selectors,
                children,
            } if selectors.len() == 1 => {
                let name = selectors[0].trim_end_matches("()").trim();
                let callable = (name.starts_with('.') || name.starts_with('#'))
                    && !name.contains(|c: char| c.is_whitespace() || c == ':');
                callable.then(|| (name.to_string(), children.clone()))
            }
            _ => None,
        })
        .collect()
}

fn is_mixin_definition(selectors: &[String]) -> bool {
    selectors.len() == 1 && selectors[0].ends_with("()")
}

/// Byte spans of the quoted strings in `text`, quotes included.
fn quoted_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut open: Option<(char, usize)> = None;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (open, c) {
            (_, '\\') => escaped = true,
            (None, '"' | '\'') => open = Some((c, i)),
            (Some((quote, start)), c) if c == quote => {
                spans.push((start, i + 1));
                open = None;
            }
            _ => {}
        }
    }
    spans
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}

struct Emitter<'a> {
    mixins: &'a HashMap<String, Vec<Node>>,
    scopes: Vec<HashMap<String, String>>,
}

impl Emitter<'_> {
    fn lookup(&self, name: &str) -> Option<&String> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Replace `@name` and `@{name}` references in `text`.
    fn substitute(&self, text: &str, depth: usize) -> Result<String, DialectError> {
        if depth > MAX_VARIABLE_DEPTH {
            return Err(DialectError::new(format!("recursive variable in `{text}`")));
        }
        let interpolated = self.replace_all(&INTERPOLATION, text, depth, false)?;
        self.replace_all(&VARIABLE, &interpolated, depth, true)
    }

    /// Replace every `pattern` match with its variable's value. With
    /// `skip_quoted`, matches inside quoted strings are left as written.
    fn replace_all(
        &self,
        pattern: &Regex,
        text: &str,
        depth: usize,
        skip_quoted: bool,
    ) -> Result<String, DialectError> {
        let quoted = if skip_quoted {
            quoted_spans(text)
        } else {
            Vec::new()
        };
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for caps in pattern.captures_iter(text) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let start = whole.start();
            if quoted.iter().any(|&(open, close)| open < start && start < close) {
                continue;
            }
            let name = name.as_str();
            let raw = self
                .lookup(name)
                .ok_or_else(|| DialectError::new(format!("variable @{name} is undefined")))?;
            out.push_str(&text[last..whole.start()]);
            out.push_str(&self.substitute(raw, depth + 1)?);
            last = whole.end();
        }
        out.push_str(&text[last..]);
        Ok(out)
    }

    /// Substitute variables in an at-rule prelude, keeping the at-keyword.
    fn prelude(&self, prelude: &str) -> Result<String, DialectError> {
        let keyword_end = prelude
            .find(|c: char| c.is_whitespace() || c == '(')
            .unwrap_or(prelude.len());
        let (keyword, rest) = prelude.split_at(keyword_end);
        Ok(format!("{}{}", keyword, self.substitute(rest, 0)?))
    }

    fn declarations(
        &self,
        nodes: &[Node],
        out: &mut Vec<String>,
        depth: usize,
    ) -> Result<(), DialectError> {
        for node in nodes {
            match node {
                Node::Declaration { property, value } => {
                    let property = self.replace_all(&INTERPOLATION, property, 0, false)?;
                    out.push(format!("{}: {}", property, self.substitute(value, 0)?));
                }
                Node::MixinCall { name, line } => {
                    if depth > MAX_VARIABLE_DEPTH {
                        return Err(DialectError::at(*line, format!("recursive mixin {name}")));
                    }
                    let body = self
                        .mixins
                        .get(name)
                        .ok_or_else(|| DialectError::at(*line, format!("undefined mixin {name}")))?;
                    self.declarations(body, out, depth + 1)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn block(
        &mut self,
        nodes: &[Node],
        parents: &[String],
        depth: usize,
        out: &mut String,
    ) -> Result<(), DialectError> {
        let scope: HashMap<String, String> = nodes
            .iter()
            .filter_map(|node| match node {
                Node::Variable { name, value } => Some((name.clone(), value.clone())),
                _ => None,
            })
            .collect();
        self.scopes.push(scope);
        let result = self.block_in_scope(nodes, parents, depth, out);
        self.scopes.pop();
        result
    }

    fn block_in_scope(
        &mut self,
        nodes: &[Node],
        parents: &[String],
        depth: usize,
        out: &mut String,
    ) -> Result<(), DialectError> {
        let mut declarations = Vec::new();
        self.declarations(nodes, &mut declarations, 0)?;
        if !declarations.is_empty() {
            let pad = indent(depth);
            if parents.is_empty() {
                for declaration in &declarations {
                    out.push_str(&format!("{pad}{declaration};\n"));
                }
            } else {
                out.push_str(&format!("{pad}{} {{\n", parents.join(", ")));
                for declaration in &declarations {
                    out.push_str(&format!("{pad}  {declaration};\n"));
                }
                out.push_str(&format!("{pad}}}\n"));
            }
        }

        for node in nodes {
            match node {
                Node::Rule {
                    selectors,
                    children,
                } => {
                    if is_mixin_definition(selectors) {
                        continue;
                    }
                    let mut resolved = Vec::with_capacity(selectors.len());
                    for selector in selectors {
                        resolved.push(self.replace_all(&INTERPOLATION, selector, 0, false)?);
                    }
                    let combined = combine(parents, &resolved);
                    self.block(children, &combined, depth, out)?;
                }
                Node::AtRule {
                    prelude,
                    children: Some(children),
                } => {
                    let pad = indent(depth);
                    out.push_str(&format!("{pad}{} {{\n", self.prelude(prelude)?));
                    self.block(children, parents, depth + 1, out)?;
                    out.push_str(&format!("{pad}}}\n"));
                }
                Node::AtRule {
                    prelude,
                    children: None,
                } => {
                    out.push_str(&format!("{}{};\n", indent(depth), self.prelude(prelude)?));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Resolve nested selectors against their parents.
fn combine(parents: &[String], selectors: &[String]) -> Vec<String> {
    if parents.is_empty() {
        return selectors
            .iter()
            .map(|s| s.replace('&', "").trim().to_string())
            .collect();
    }
    parents
        .iter()
        .flat_map(|parent| {
            selectors.iter().map(move |child| {
                if child.contains('&') {
                    child.replace('&', parent)
                } else {
                    format!("{parent} {child}")
                }
            })
        })
        .collect()
}
