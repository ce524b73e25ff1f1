//! TypeScript → JavaScript by type erasure.
//!
//! A single forward scan over the source that copies everything except type
//! syntax. No type checking and no down-leveling: the output is the input
//! with these constructs removed:
//!
//! | Construct | Example |
//! |---|---|
//! | Parameter, variable, member, return annotations | `(a: number): void`, `name?: string;` |
//! | Interfaces, type aliases, `declare` statements | `interface P { .. }`, `type Id = string;` |
//! | Type-only imports/exports | `import type { A } from "./a";` |
//! | `as` casts, `satisfies` clauses, non-null assertions | `x as HTMLElement`, `el!.focus()` |
//! | Generic parameter lists on declarations | `function f<T>(..)`, `class Box<T>` |
//! | Type arguments on calls and generic arrows | `new Map<string, number>()`, `<T>(x: T) => x` |
//! | `implements` clauses, member modifiers, `abstract` | `private readonly id: string` |
//!
//! Constructs that cannot be erased without changing behavior are rejected
//! with a diagnostic instead: `enum`, constructor parameter properties
//! (`constructor(public name: string)`), and `<T>value` type assertions.

use super::{DialectError, ScriptTranspiler};

/// Default [`ScriptTranspiler`]: strips TypeScript type syntax.
pub struct TypeStripper;

impl ScriptTranspiler for TypeStripper {
    fn transpile(&self, source: &str) -> Result<String, DialectError> {
        Scanner::new(source).run()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Top,
    Block,
    Class,
    Object,
    Paren,
    Bracket,
}

#[derive(Debug)]
struct Frame {
    scope: Scope,
    /// `?` operators still waiting for their `:`.
    ternaries: usize,
}

/// Where a type annotation ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TypeMode {
    /// After a parameter or member name. Ends at `,` `)` `;` `=`.
    Binding,
    /// After a `)`. Also ends at a body `{` or an arrow `=>`.
    Return,
    /// After `as`. Also ends at binary operators.
    Cast,
}

const MODIFIERS: &[&str] = &["public", "private", "protected", "readonly", "override"];

/// Keywords after which a `<` starts an operand, never a comparison.
const OPERAND_KEYWORDS: &[&str] = &[
    "return", "yield", "await", "throw", "case", "typeof", "void", "delete", "in", "of",
];

struct Scanner {
    src: Vec<char>,
    pos: usize,
    out: String,
    stack: Vec<Frame>,
    /// Last significant character emitted.
    last: Option<char>,
    last_word: String,
    stmt_start: bool,
    /// First word of the current statement.
    stmt_word: String,
    /// Inside `let`/`const`/`var` bindings, before `=`.
    decl: bool,
    /// Between `class` and its body `{`.
    class_header: bool,
    /// Between `function` and its parameter list.
    fn_header: bool,
    /// Inside `import`/`export { .. }` specifiers, where `as` renames.
    specifiers: bool,
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

impl Scanner {
    fn new(source: &str) -> Self {
        Self {
            src: source.chars().collect(),
            pos: 0,
            out: String::with_capacity(source.len()),
            stack: vec![Frame {
                scope: Scope::Top,
                ternaries: 0,
            }],
            last: None,
            last_word: String::new(),
            stmt_start: true,
            stmt_word: String::new(),
            decl: false,
            class_header: false,
            fn_header: false,
            specifiers: false,
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

    /// Next non-whitespace character at or after `from`, with its index.
    fn next_significant(&self, from: usize) -> Option<(usize, char)> {
        self.src[from.min(self.src.len())..]
            .iter()
            .enumerate()
            .find(|(_, c)| !c.is_whitespace())
            .map(|(i, c)| (from + i, *c))
    }

    fn word_at(&self, from: usize) -> String {
        self.src[from.min(self.src.len())..]
            .iter()
            .take_while(|c| is_ident_char(**c))
            .collect()
    }

    /// The word following index `from`, skipping whitespace.
    fn next_word(&self, from: usize) -> String {
        match self.next_significant(from) {
            Some((i, c)) if is_ident_start(c) => self.word_at(i),
            _ => String::new(),
        }
    }

    fn scope(&self) -> Scope {
        self.stack.last().map(|f| f.scope).unwrap_or(Scope::Top)
    }

    fn emit(&mut self, c: char) {
        self.out.push(c);
        if !c.is_whitespace() {
            self.last = Some(c);
        }
    }

    fn begin_statement(&mut self) {
        self.stmt_start = true;
        self.stmt_word.clear();
        self.decl = false;
    }

    fn run(mut self) -> Result<String, DialectError> {
        while let Some(c) = self.peek(0) {
            match c {
                '\n' => {
                    self.emit(c);
                    self.pos += 1;
                    if matches!(self.scope(), Scope::Top | Scope::Block | Scope::Class)
                        && !matches!(self.last, Some(',') | Some('=') | Some('('))
                    {
                        self.begin_statement();
                    }
                }
                c if c.is_whitespace() => {
                    self.emit(c);
                    self.pos += 1;
                }
                '/' if self.peek(1) == Some('/') => self.copy_line_comment(),
                '/' if self.peek(1) == Some('*') => self.copy_block_comment()?,
                '/' if self.regex_allowed() => self.copy_regex()?,
                '"' | '\'' => self.copy_string(c)?,
                '`' => self.copy_template()?,
                c if is_ident_start(c) => self.word()?,
                _ => self.punct(c)?,
            }
        }
        if self.stack.len() > 1 {
            return Err(DialectError::at(self.line(), "unexpected end of input"));
        }
        Ok(self.out)
    }

    fn regex_allowed(&self) -> bool {
        match self.last {
            None => true,
            Some(c) => "(,=:[!&|?{};".contains(c) || self.last_word == "return",
        }
    }

    fn copy_line_comment(&mut self) {
        while let Some(c) = self.peek(0) {
            if c == '\n' {
                break;
            }
            self.out.push(c);
            self.pos += 1;
        }
    }

    fn copy_block_comment(&mut self) -> Result<(), DialectError> {
        let line = self.line();
        self.out.push_str("/*");
        self.pos += 2;
        loop {
            match (self.peek(0), self.peek(1)) {
                (Some('*'), Some('/')) => {
                    self.out.push_str("*/");
                    self.pos += 2;
                    return Ok(());
                }
                (Some(c), _) => {
                    self.out.push(c);
                    self.pos += 1;
                }
                (None, _) => return Err(DialectError::at(line, "unterminated comment")),
            }
        }
    }

    fn copy_string(&mut self, quote: char) -> Result<(), DialectError> {
        let end = self.skip_string(self.pos, quote)?;
        let text: String = self.src[self.pos..end].iter().collect();
        self.out.push_str(&text);
        self.pos = end;
        self.last = Some(quote);
        self.stmt_start = false;
        Ok(())
    }

    /// Index just past the string literal starting at `from`.
    fn skip_string(&self, from: usize, quote: char) -> Result<usize, DialectError> {
        let mut i = from + 1;
        while let Some(&c) = self.src.get(i) {
            match c {
                '\\' => i += 2,
                '\n' => break,
                c if c == quote => return Ok(i + 1),
                _ => i += 1,
            }
        }
        Err(DialectError::at(self.line(), "unterminated string literal"))
    }

    fn copy_template(&mut self) -> Result<(), DialectError> {
        let line = self.line();
        self.out.push('`');
        self.pos += 1;
        let mut depth = 0usize;
        while let Some(c) = self.peek(0) {
            match c {
                '\\' => {
                    self.out.push(c);
                    if let Some(next) = self.peek(1) {
                        self.out.push(next);
                    }
                    self.pos += 2;
                    continue;
                }
                '$' if self.peek(1) == Some('{') => {
                    depth += 1;
                    self.out.push_str("${");
                    self.pos += 2;
                    continue;
                }
                '}' if depth > 0 => depth -= 1,
                '`' if depth == 0 => {
                    self.out.push('`');
                    self.pos += 1;
                    self.last = Some('`');
                    self.stmt_start = false;
                    return Ok(());
                }
                _ => {}
            }
            self.out.push(c);
            self.pos += 1;
        }
        Err(DialectError::at(line, "unterminated template literal"))
    }

    fn copy_regex(&mut self) -> Result<(), DialectError> {
        let line = self.line();
        self.out.push('/');
        self.pos += 1;
        let mut in_class = false;
        while let Some(c) = self.peek(0) {
            self.out.push(c);
            self.pos += 1;
            match c {
                '\\' => {
                    if let Some(next) = self.peek(0) {
                        self.out.push(next);
                        self.pos += 1;
                    }
                }
                '[' => in_class = true,
                ']' => in_class = false,
                '/' if !in_class => {
                    while let Some(flag) = self.peek(0).filter(|c| c.is_ascii_alphabetic()) {
                        self.out.push(flag);
                        self.pos += 1;
                    }
                    self.last = Some('/');
                    return Ok(());
                }
                '\n' => break,
                _ => {}
            }
        }
        Err(DialectError::at(line, "unterminated regular expression"))
    }

    fn word(&mut self) -> Result<(), DialectError> {
        let start = self.pos;
        let word = self.word_at(start);
        let after = start + word.chars().count();
        let at_start = self.stmt_start;

        if at_start {
            match word.as_str() {
                "interface" => return self.skip_statement(start, true),
                "declare" => return self.skip_statement(start, true),
                "enum" => {
                    return Err(DialectError::at(
                        self.line(),
                        "enum declarations are not supported",
                    ));
                }
                "type" if self.is_type_alias(after) => return self.skip_statement(start, false),
                "abstract" if self.next_word(after) == "class" => {
                    self.pos = self.skip_whitespace(after);
                    return Ok(());
                }
                "import" if self.next_word(after) == "type" => {
                    return self.skip_statement(start, false);
                }
                "export" => {
                    let next = self.next_word(after);
                    let next_at = self.next_significant(after).map(|(i, _)| i).unwrap_or(after);
                    let next_after = next_at + next.chars().count();
                    let type_only = match next.as_str() {
                        "interface" | "declare" => true,
                        "type" => {
                            self.is_type_alias(next_after)
                                || self.next_significant(next_after).map(|(_, c)| c) == Some('{')
                        }
                        _ => false,
                    };
                    if type_only {
                        return self.skip_statement(start, next != "type");
                    }
                    if next == "enum" {
                        return Err(DialectError::at(
                            self.line(),
                            "enum declarations are not supported",
                        ));
                    }
                    if matches!(self.next_significant(after), Some((_, '{')) | Some((_, '*'))) {
                        self.specifiers = true;
                    }
                }
                "import" => self.specifiers = true,
                _ => {}
            }
        }

        if self.decl_keyword_followed_by_enum(&word, after) {
            return Err(DialectError::at(
                self.line(),
                "enum declarations are not supported",
            ));
        }

        if MODIFIERS.contains(&word.as_str())
            && matches!(self.scope(), Scope::Paren | Scope::Class)
            && matches!(
                self.next_significant(after),
                Some((_, c)) if is_ident_start(c) || c == '[' || c == '#'
            )
        {
            if self.scope() == Scope::Paren {
                // `this.name = name` would have to be synthesized.
                return Err(DialectError::at(
                    self.line(),
                    format!("parameter property `{word}` is not supported"),
                ));
            }
            self.pos = self.skip_whitespace(after);
            return Ok(());
        }

        if word == "implements" && self.class_header {
            // Drop the clause, keep the body brace.
            let mut i = after;
            while let Some(&c) = self.src.get(i) {
                if c == '{' {
                    break;
                }
                i += 1;
            }
            self.pos = i;
            return Ok(());
        }

        if (word == "as" || word == "satisfies")
            && !self.specifiers
            && !at_start
            && matches!(self.last, Some(c) if is_ident_char(c) || ")]}'\"`".contains(c))
            && self.out.ends_with(|c: char| c.is_whitespace())
        {
            // Remove the space before `as` as well.
            let trimmed = self.out.trim_end().len();
            self.out.truncate(trimmed);
            self.pos = after;
            self.skip_type(TypeMode::Cast);
            return Ok(());
        }

        match word.as_str() {
            "let" | "const" | "var" => self.decl = true,
            "class" => self.class_header = true,
            "function" => self.fn_header = true,
            "from" => self.specifiers = false,
            _ => {}
        }

        if at_start {
            self.stmt_word = word.clone();
        }
        self.out.push_str(&word);
        self.last = word.chars().last();
        self.last_word = word;
        self.stmt_start = false;
        self.pos = after;
        Ok(())
    }

    fn decl_keyword_followed_by_enum(&self, word: &str, after: usize) -> bool {
        matches!(word, "const" | "declare") && self.next_word(after) == "enum"
    }

    fn skip_whitespace(&self, mut i: usize) -> usize {
        while self.src.get(i).is_some_and(|c| c.is_whitespace() && *c != '\n') {
            i += 1;
        }
        i
    }

    /// `type Name =` or `type Name<..> =`.
    fn is_type_alias(&self, after: usize) -> bool {
        let Some((i, c)) = self.next_significant(after) else {
            return false;
        };
        if !is_ident_start(c) {
            return false;
        }
        let name_end = i + self.word_at(i).chars().count();
        matches!(self.next_significant(name_end), Some((_, '=')) | Some((_, '<')))
    }

    /// Drop a whole type-level statement starting at `start`.
    ///
    /// `close_ends` makes the closing `}` of the statement's first brace
    /// group terminate it (interfaces, `declare module`).
    fn skip_statement(&mut self, start: usize, close_ends: bool) -> Result<(), DialectError> {
        let line = self.line();
        let mut i = start;
        let mut depth = 0i32;
        let mut last: Option<char> = None;
        while let Some(&c) = self.src.get(i) {
            match c {
                '"' | '\'' => {
                    i = self.skip_string(i, c)?;
                    last = Some(c);
                    continue;
                }
                '=' if self.src.get(i + 1) == Some(&'>') => {
                    i += 2;
                    last = Some('>');
                    continue;
                }
                '(' | '[' | '{' | '<' => depth += 1,
                ')' | ']' | '>' => depth -= 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 && close_ends {
                        self.pos = i + 1;
                        self.begin_statement();
                        return Ok(());
                    }
                }
                ';' if depth <= 0 => {
                    self.pos = i + 1;
                    self.begin_statement();
                    return Ok(());
                }
                '\n' if depth <= 0 => {
                    let continues = matches!(last, Some('=') | Some('|') | Some('&') | Some(','))
                        || matches!(self.next_significant(i), Some((_, '|')) | Some((_, '&')));
                    if !continues && last.is_some() && !close_ends {
                        self.pos = i;
                        self.begin_statement();
                        return Ok(());
                    }
                }
                _ => {}
            }
            if !c.is_whitespace() {
                last = Some(c);
            }
            i += 1;
        }
        if depth > 0 {
            return Err(DialectError::at(line, "unterminated type declaration"));
        }
        self.pos = i;
        Ok(())
    }

    /// Skip a type expression starting at `self.pos`, leaving trailing
    /// whitespace in place.
    fn skip_type(&mut self, mode: TypeMode) {
        let mut i = self.pos;
        let mut end = self.pos;
        let mut depth = 0i32;
        let mut consumed = false;
        while let Some(&c) = self.src.get(i) {
            match c {
                '"' | '\'' => {
                    match self.skip_string(i, c) {
                        Ok(next) => i = next,
                        Err(_) => break,
                    }
                    end = i;
                    consumed = true;
                    continue;
                }
                '=' if self.src.get(i + 1) == Some(&'>') => {
                    if depth == 0 && mode != TypeMode::Binding {
                        break;
                    }
                    i += 2;
                    end = i;
                    consumed = true;
                    continue;
                }
                '(' | '[' | '<' => depth += 1,
                '{' => {
                    if depth == 0 && consumed && mode != TypeMode::Binding {
                        break;
                    }
                    depth += 1;
                }
                ')' | ']' | '}' | '>' => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                ',' | ';' | '=' if depth == 0 => break,
                '+' | '-' | '*' | '/' | '%' | '?' | ':' if depth == 0 && mode == TypeMode::Cast => {
                    break;
                }
                '\n' if depth == 0 && consumed => {
                    let continues =
                        matches!(self.next_significant(i), Some((_, '|')) | Some((_, '&')));
                    if !continues {
                        break;
                    }
                }
                _ => {}
            }
            if !c.is_whitespace() {
                consumed = true;
                end = i + 1;
            }
            i += 1;
        }
        self.pos = end;
    }

    /// Skip a `<..>` generic parameter list starting at `self.pos`.
    fn skip_generics(&mut self) {
        let mut depth = 0i32;
        while let Some(c) = self.peek(0) {
            self.pos += 1;
            match c {
                '<' => depth += 1,
                '>' => {
                    depth -= 1;
                    if depth == 0 {
                        return;
                    }
                }
                _ => {}
            }
        }
    }

    /// Whether a `<` here would start an operand rather than compare.
    fn in_operand_position(&self) -> bool {
        match self.last {
            None => true,
            Some(c) if is_ident_char(c) => {
                OPERAND_KEYWORDS.contains(&self.last_word.as_str())
                    && self.out.trim_end().ends_with(self.last_word.as_str())
            }
            Some(c) => !")]}'\"`<>/".contains(c),
        }
    }

    /// Index just past the `<..>` list opening at `from`, if the text there
    /// reads as type arguments and nothing else.
    fn type_arguments_end(&self, from: usize) -> Option<usize> {
        let mut i = from;
        let mut angles = 0i32;
        let mut nested = 0i32;
        while let Some(&c) = self.src.get(i) {
            match c {
                '<' => angles += 1,
                '>' => {
                    angles -= 1;
                    if angles == 0 {
                        return (nested == 0).then_some(i + 1);
                    }
                }
                '"' | '\'' => {
                    i = self.skip_string(i, c).ok()?;
                    continue;
                }
                '=' if self.src.get(i + 1) == Some(&'>') => {
                    i += 2;
                    continue;
                }
                '(' | '{' => nested += 1,
                ')' | '}' => {
                    nested -= 1;
                    if nested < 0 {
                        return None;
                    }
                }
                '&' | '|' if self.src.get(i + 1) == Some(&c) => return None,
                ':' | '?' | ';' if nested == 0 => return None,
                c if is_ident_char(c) || c.is_whitespace() || ",.[]|&:?;".contains(c) => {}
                _ => return None,
            }
            i += 1;
        }
        None
    }

    /// Whether the parameter list opening at `open` is followed by `=>` or
    /// a return annotation.
    fn is_arrow_parameters(&self, open: usize) -> bool {
        let mut i = open;
        let mut depth = 0i32;
        while let Some(&c) = self.src.get(i) {
            match c {
                '"' | '\'' => match self.skip_string(i, c) {
                    Ok(next) => {
                        i = next;
                        continue;
                    }
                    Err(_) => return false,
                },
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return match self.next_significant(i + 1) {
                            Some((j, '=')) => self.src.get(j + 1) == Some(&'>'),
                            Some((_, ':')) => true,
                            _ => false,
                        };
                    }
                }
                _ => {}
            }
            i += 1;
        }
        false
    }

    /// Drop type arguments at `self.pos`. Returns whether anything was
    /// dropped.
    fn erase_type_arguments(&mut self) -> Result<bool, DialectError> {
        let Some(end) = self.type_arguments_end(self.pos) else {
            return Ok(false);
        };
        let next = self.next_significant(end);
        if self.in_operand_position() {
            let arrow = matches!(next, Some((open, '(')) if self.is_arrow_parameters(open));
            if !arrow {
                return Err(DialectError::at(
                    self.line(),
                    "`<T>value` type assertions are not supported, use `value as T`",
                ));
            }
        } else if !matches!(next, Some((_, '('))) {
            return Ok(false);
        }
        self.pos = end;
        Ok(true)
    }

    fn is_annotation(&self) -> Option<TypeMode> {
        if self.last == Some(')') {
            if self.stmt_word == "case" {
                return None;
            }
            return Some(TypeMode::Return);
        }
        match self.scope() {
            Scope::Paren | Scope::Class => Some(TypeMode::Binding),
            Scope::Top | Scope::Block if self.decl => Some(TypeMode::Binding),
            _ => None,
        }
    }

    fn punct(&mut self, c: char) -> Result<(), DialectError> {
        self.stmt_start = false;
        match c {
            '<' if (self.fn_header || self.class_header)
                && matches!(self.last, Some(l) if is_ident_char(l)) =>
            {
                self.skip_generics();
                return Ok(());
            }
            '<' => {
                if self.erase_type_arguments()? {
                    return Ok(());
                }
            }
            '(' => {
                self.fn_header = false;
                self.stack.push(Frame {
                    scope: Scope::Paren,
                    ternaries: 0,
                });
            }
            '[' => self.stack.push(Frame {
                scope: Scope::Bracket,
                ternaries: 0,
            }),
            ')' | ']' => {
                let expected = if c == ')' { Scope::Paren } else { Scope::Bracket };
                if self.scope() != expected {
                    return Err(DialectError::at(self.line(), format!("unexpected `{c}`")));
                }
                self.stack.pop();
            }
            '{' => {
                let scope = if self.class_header {
                    Scope::Class
                } else if matches!(self.last, Some(l) if "=(,:[?!&|".contains(l))
                    || self.last_word == "return"
                {
                    Scope::Object
                } else {
                    Scope::Block
                };
                self.class_header = false;
                self.fn_header = false;
                self.stack.push(Frame {
                    scope,
                    ternaries: 0,
                });
                self.emit(c);
                self.pos += 1;
                if scope != Scope::Object {
                    self.begin_statement();
                }
                return Ok(());
            }
            '}' => {
                if self.stack.len() <= 1 || matches!(self.scope(), Scope::Paren | Scope::Bracket) {
                    return Err(DialectError::at(self.line(), "unexpected `}`"));
                }
                let closed = self.stack.pop().map(|f| f.scope);
                self.emit(c);
                self.pos += 1;
                // An object literal ends inside its statement.
                if closed != Some(Scope::Object)
                    && matches!(self.scope(), Scope::Top | Scope::Block | Scope::Class)
                {
                    self.begin_statement();
                }
                return Ok(());
            }
            ';' => {
                self.emit(c);
                self.pos += 1;
                self.specifiers = false;
                self.begin_statement();
                return Ok(());
            }
            '=' => {
                if self.peek(1) == Some('>') {
                    self.out.push_str("=>");
                    self.last = Some('>');
                    self.pos += 2;
                    return Ok(());
                }
                self.decl = false;
            }
            '?' => {
                if matches!(self.peek(1), Some('.') | Some('?')) {
                    self.out.push('?');
                    self.out.push(self.src[self.pos + 1]);
                    self.last = self.peek(1);
                    self.pos += 2;
                    return Ok(());
                }
                let next = self.next_significant(self.pos + 1).map(|(_, c)| c);
                let optional = matches!(self.scope(), Scope::Paren | Scope::Class)
                    && matches!(self.last, Some(l) if is_ident_char(l))
                    && matches!(next, Some(':') | Some(',') | Some(')') | Some(';') | Some('='));
                if optional {
                    self.pos += 1;
                    return Ok(());
                }
                if let Some(frame) = self.stack.last_mut() {
                    frame.ternaries += 1;
                }
            }
            '!' => {
                let after_operand =
                    matches!(self.last, Some(l) if is_ident_char(l) || l == ')' || l == ']');
                let non_null = after_operand
                    && matches!(self.peek(1), Some('.' | ')' | ';' | ',' | '[' | '\n'));
                if non_null && self.out.ends_with(|c: char| !c.is_whitespace()) {
                    self.pos += 1;
                    return Ok(());
                }
            }
            ':' => {
                let pending = self.stack.last().map(|f| f.ternaries).unwrap_or(0);
                if pending > 0 {
                    if let Some(frame) = self.stack.last_mut() {
                        frame.ternaries -= 1;
                    }
                } else if let Some(mode) = self.is_annotation() {
                    self.pos += 1;
                    self.skip_type(mode);
                    return Ok(());
                }
            }
            _ => {}
        }
        self.emit(c);
        self.pos += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip(source: &str) -> String {
        TypeStripper.transpile(source).unwrap()
    }

    #[test]
    fn plain_javascript_is_unchanged() {
        let js = "const a = 1;\nfunction f(x, y) {\n  return x ? y : a;\n}\n";
        assert_eq!(strip(js), js);
    }

    #[test]
    fn variable_annotation_removed() {
        assert_eq!(strip("let x: number = 1;"), "let x = 1;");
        assert_eq!(strip("const names: string[] = [];"), "const names = [];");
    }

    #[test]
    fn parameter_and_return_annotations_removed() {
        assert_eq!(
            strip("function f(a: number, b?: string): void {\n}"),
            "function f(a, b) {\n}"
        );
    }

    #[test]
    fn arrow_function_types_removed() {
        assert_eq!(
            strip("const double = (n: number): number => n * 2;"),
            "const double = (n) => n * 2;"
        );
    }

    #[test]
    fn function_type_parameter_removed() {
        assert_eq!(
            strip("function on(cb: (e: Event) => void) {}"),
            "function on(cb) {}"
        );
    }

    #[test]
    fn object_literal_colons_kept() {
        let js = "const o = { a: 1, b: { c: 2 } };";
        assert_eq!(strip(js), js);
    }

    #[test]
    fn ternary_inside_call_kept() {
        let js = "log(ok ? \"yes\" : \"no\");";
        assert_eq!(strip(js), js);
    }

    #[test]
    fn interface_and_type_alias_removed() {
        let ts = "interface Props {\n  id: string;\n}\ntype Id = string;\nconst a = 1;";
        assert_eq!(strip(ts), "\n\nconst a = 1;");
    }

    #[test]
    fn type_only_import_removed() {
        let ts = "import type { A } from \"./a\";\nimport { b as c } from \"./b\";";
        assert_eq!(strip(ts), "\nimport { b as c } from \"./b\";");
    }

    #[test]
    fn as_cast_removed() {
        assert_eq!(
            strip("const el = document.body as HTMLElement;"),
            "const el = document.body;"
        );
        assert_eq!(strip("f((x as any).y);"), "f((x).y);");
    }

    #[test]
    fn non_null_assertion_removed() {
        assert_eq!(strip("el!.focus();"), "el.focus();");
        assert_eq!(strip("if (a != b) {}"), "if (a != b) {}");
    }

    #[test]
    fn class_members_and_modifiers_removed() {
        let ts = concat!(
            "class Box<T> implements Shape {\n",
            "  private value: T;\n",
            "  constructor(name: string) {}\n",
            "}",
        );
        assert_eq!(
            strip(ts),
            "class Box {\n  value;\n  constructor(name) {}\n}"
        );
    }

    #[test]
    fn parameter_properties_are_rejected() {
        let ts = "class P {\n  constructor(public name: string) {}\n}";
        let err = TypeStripper.transpile(ts).unwrap_err();
        assert_eq!(err.line, Some(2));
        assert!(err.message.contains("parameter property `public`"), "{err}");
        let readonly = "class P { constructor(private readonly id: string) {} }";
        assert!(TypeStripper.transpile(readonly).is_err());
    }

    #[test]
    fn call_type_arguments_removed() {
        assert_eq!(
            strip("const m = new Map<string, number>();"),
            "const m = new Map();"
        );
        assert_eq!(
            strip("const el = document.querySelector<HTMLElement>(\".hero\");"),
            "const el = document.querySelector(\".hero\");"
        );
        assert_eq!(
            strip("const byId = new Map<string, Array<() => void>>();"),
            "const byId = new Map();"
        );
    }

    #[test]
    fn comparisons_are_not_type_arguments() {
        let js = "for (let i = 0; i < n; i++) {}\nif (a < b && c > (d)) {}\nx = a << 2;\n";
        assert_eq!(strip(js), js);
        assert_eq!(strip("ok = a < b || c > (d);"), "ok = a < b || c > (d);");
    }

    #[test]
    fn generic_arrow_parameters_removed() {
        assert_eq!(strip("const id = <T>(x: T) => x;"), "const id = (x) => x;");
        assert_eq!(
            strip("const pair = <A, B>(a: A, b: B): [A, B] => [a, b];"),
            "const pair = (a, b) => [a, b];"
        );
    }

    #[test]
    fn angle_bracket_assertions_are_rejected() {
        let err = TypeStripper.transpile("let v = <HTMLInputElement>el;").unwrap_err();
        assert_eq!(err.line, Some(1));
        assert!(err.message.contains("use `value as T`"), "{err}");
        assert!(TypeStripper.transpile("f(<any>(window));").is_err());
        assert!(TypeStripper.transpile("function f() {\n  return <T>x;\n}").is_err());
    }

    #[test]
    fn satisfies_clause_removed() {
        assert_eq!(
            strip("const limits = { a: 1 } satisfies Record<string, number>;"),
            "const limits = { a: 1 };"
        );
        assert_eq!(strip("const c = { a: 1 } as const;"), "const c = { a: 1 };");
    }

    #[test]
    fn generic_function_parameters_removed() {
        assert_eq!(
            strip("function id<T>(x: T): T { return x; }"),
            "function id(x) { return x; }"
        );
    }

    #[test]
    fn strings_and_templates_untouched() {
        let js = "const s = 'a: b';\nconst t = `x: ${y}`;";
        assert_eq!(strip(js), js);
    }

    #[test]
    fn enum_is_rejected() {
        let err = TypeStripper.transpile("const a = 1;\nenum Color { Red }").unwrap_err();
        assert_eq!(err.line, Some(2));
        assert!(err.message.contains("enum"));
    }

    #[test]
    fn unbalanced_brace_is_diagnosed() {
        let err = TypeStripper.transpile("function f() {\n}\n}").unwrap_err();
        assert_eq!(err.line, Some(3));
    }
}
