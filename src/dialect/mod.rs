//! Dialect collaborators: script transpilation, stylesheet compilation, and
//! markup expansion.
//!
//! The compiler pipeline only sees these traits. Each comes with a default
//! implementation so a template can be compiled without external tooling:
//!
//! | Trait | Default | Input → output |
//! |---|---|---|
//! | [`ScriptTranspiler`] | [`TypeStripper`] | TypeScript → JavaScript (type syntax removed) |
//! | [`StyleCompiler`] | [`LessCompiler`] | LESS → CSS (variables, nesting) |
//! | [`MarkupExpander`] | [`ScriptTagExpander`] | markup + compiled entries → editor markup |
//!
//! All three are pure functions of their input. Failures carry the
//! collaborator's own diagnostic, which the editor shows verbatim.

mod less;
pub mod markup;
mod typescript;

pub use less::LessCompiler;
pub use markup::{References, ScriptTagExpander, collect_references};
pub use typescript::TypeStripper;

use std::fmt;
use std::sync::Arc;

/// Diagnostic produced by a dialect collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialectError {
    pub message: String,
    /// 1-based source line, when the collaborator knows it.
    pub line: Option<usize>,
}

impl DialectError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
        }
    }

    pub fn at(line: usize, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: Some(line),
        }
    }
}

impl fmt::Display for DialectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {}: {}", line, self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for DialectError {}

/// Script-dialect transpiler: TypeScript source → JavaScript source.
pub trait ScriptTranspiler: Send + Sync {
    fn transpile(&self, source: &str) -> Result<String, DialectError>;
}

/// Stylesheet-dialect compiler: LESS source → CSS source.
pub trait StyleCompiler: Send + Sync {
    fn compile(&self, source: &str) -> Result<String, DialectError>;
}

/// A compiled block or component as handed to the markup expander.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledEntry {
    /// Global name the entry registers under (`block__Hero`).
    pub name: String,
    pub script: String,
}

/// Markup expander: substitutes block/component placeholders.
pub trait MarkupExpander: Send + Sync {
    fn expand(&self, markup: &str, entries: &[CompiledEntry]) -> String;
}

/// The set of collaborators a template compiles with.
#[derive(Clone)]
pub struct Dialects {
    pub script: Arc<dyn ScriptTranspiler>,
    pub style: Arc<dyn StyleCompiler>,
    pub markup: Arc<dyn MarkupExpander>,
}

impl Default for Dialects {
    fn default() -> Self {
        Self {
            script: Arc::new(TypeStripper),
            style: Arc::new(LessCompiler),
            markup: Arc::new(ScriptTagExpander),
        }
    }
}

impl fmt::Debug for Dialects {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dialects").finish_non_exhaustive()
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Transpiler that counts invocations and returns a marker.
    #[derive(Default)]
    pub struct CountingTranspiler {
        pub calls: AtomicUsize,
    }

    impl ScriptTranspiler for CountingTranspiler {
        fn transpile(&self, source: &str) -> Result<String, DialectError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("/* transpiled */\n{source}"))
        }
    }

    impl CountingTranspiler {
        pub fn count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    /// Style compiler that counts invocations and returns the input unchanged.
    #[derive(Default)]
    pub struct CountingStyleCompiler {
        pub calls: AtomicUsize,
    }

    impl StyleCompiler for CountingStyleCompiler {
        fn compile(&self, source: &str) -> Result<String, DialectError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(source.to_string())
        }
    }

    impl CountingStyleCompiler {
        pub fn count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    /// Transpiler that always fails with a fixed diagnostic.
    pub struct FailingTranspiler;

    impl ScriptTranspiler for FailingTranspiler {
        fn transpile(&self, _source: &str) -> Result<String, DialectError> {
            Err(DialectError::at(3, "Unexpected token"))
        }
    }

    #[test]
    fn diagnostic_display_includes_line() {
        assert_eq!(
            DialectError::at(3, "Unexpected token").to_string(),
            "line 3: Unexpected token"
        );
        assert_eq!(DialectError::new("boom").to_string(), "boom");
    }
}
