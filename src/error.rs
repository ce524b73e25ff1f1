//! Errors surfaced by the template model and compiler pipeline.
//!
//! | Variant | Meaning | Editor treatment |
//! |---|---|---|
//! | `NotFound` | unknown template, route, block, component, or asset | 404 |
//! | `SourceRead` | storage failed on a file that exists | 500 |
//! | `Compile` | transpiler/compiler diagnostic | shown verbatim |
//! | `Conflict` | upload target already exists | 409 |
//!
//! A source file that simply does not exist is never an error; it loads as
//! empty text.

use crate::config::ConfigError;
use crate::dialect::DialectError;
use crate::storage::StorageError;
use std::fmt;
use thiserror::Error;

/// What a `NotFound` was looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Sui,
    Template,
    Page,
    Block,
    Component,
    Asset,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Kind::Sui => "SUI",
            Kind::Template => "Template",
            Kind::Page => "Page",
            Kind::Block => "Block",
            Kind::Component => "Component",
            Kind::Asset => "Asset",
        })
    }
}

#[derive(Error, Debug)]
pub enum SuiError {
    #[error("{kind} {id} not found")]
    NotFound { kind: Kind, id: String },
    #[error("failed to read {path}: {source}")]
    SourceRead {
        path: String,
        #[source]
        source: StorageError,
    },
    #[error("failed to compile {file}: {source}")]
    Compile {
        file: String,
        #[source]
        source: DialectError,
    },
    #[error("{0} already exists")]
    Conflict(String),
    #[error("no script for page {0}")]
    NoScript(String),
    #[error("no style for page {0}")]
    NoStyle(String),
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl SuiError {
    pub fn not_found(kind: Kind, id: impl Into<String>) -> Self {
        SuiError::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SuiError::NotFound { .. })
    }
}

pub type Result<T, E = SuiError> = std::result::Result<T, E>;
