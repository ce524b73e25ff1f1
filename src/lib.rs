//! # SUI
//!
//! The compilation core of a visual page builder. A template is a directory
//! of pages, blocks, and components; this crate turns it into a route tree,
//! resolves editor requests against it, and compiles sources into what the
//! editor and the live renderer consume.
//!
//! # Architecture
//!
//! ```text
//! Registry ─┬─ Sui "default" ── storage root
//!           │   └── Template "tech-blue"
//!           │       ├── page tree   /index, /index/[invite], /page/404, /page/[id]
//!           │       ├── blocks      __blocks/Hero, __blocks/ColumnsTwo
//!           │       ├── components  __components/Nav
//!           │       ├── assets      __assets/ + configured libraries
//!           │       └── compile cache (shared by every page and fragment)
//!           └─ Sui "staging" ...
//! ```
//!
//! Everything under a template is built lazily and memoized. A page's
//! script and style each compile the first time they are requested;
//! blocks and components compile the first time a page references them.
//! Transpiled output is cached per source unit next to a fingerprint of its
//! text, so reloading a template after an edit only recompiles what changed.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`registry`] | Named SUI instances, template lookup, template upload |
//! | [`template`] | Aggregate root over one template directory; precompile |
//! | [`tree`] | Page tree construction from the storage layout |
//! | [`route`] | Route matching: exact, then literal-before-parametric descent |
//! | [`page`] | Page sources, editor render, live-renderer assets |
//! | [`fragment`] | Blocks and components: loading and self-registering scripts |
//! | [`source`] | Source units and dialect precedence |
//! | [`dialect`] | TypeScript, LESS, and markup collaborators behind traits |
//! | [`cache`] | Per-unit compile cache, validated by fingerprint |
//! | [`asset`] | `@assets/` resolution over search paths, MIME types |
//! | [`config`] | `sui.toml` and `template.toml` loading and validation |
//! | [`storage`] | Local-filesystem and in-memory storage backends |
//! | [`naming`] | Path, route, and parametric segment conventions |
//! | [`error`] | Error taxonomy shared by every operation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## No Global State
//!
//! A [`registry::Registry`] is constructed and passed explicitly. Tests
//! build as many as they like, each over its own storage.
//!
//! ## Dialects Behind Traits
//!
//! The pipeline never parses TypeScript or LESS itself. It calls a
//! [`dialect::ScriptTranspiler`] and a [`dialect::StyleCompiler`], so a real
//! toolchain can be plugged in without touching the compiler. The bundled
//! defaults cover the syntax templates actually use.

pub mod asset;
pub mod cache;
pub mod config;
pub mod dialect;
pub mod error;
pub mod fragment;
pub mod naming;
pub mod output;
pub mod page;
pub mod registry;
pub mod route;
pub mod source;
pub mod storage;
pub mod template;
pub mod tree;

pub use error::{Result, SuiError};

#[cfg(test)]
pub(crate) mod test_helpers;
