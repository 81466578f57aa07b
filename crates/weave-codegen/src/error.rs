//! Error types for binding synthesis and emission

use std::path::PathBuf;

use thiserror::Error;
use weave_core::{Ident, ModulePath};

/// Failure to synthesize one symbol or one generic implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SynthError {
    #[error("unsupported type {0}")]
    UnsupportedType(String),

    #[error("unknown type {0}")]
    UnknownType(Ident),

    #[error("unknown interface {0}")]
    UnknownInterface(Ident),

    #[error("no unique name for module {0}")]
    MissingModuleName(ModulePath),

    #[error("{count} arguments exceed the limit of {max}")]
    TooManyArguments { count: usize, max: usize },

    #[error("{0}")]
    Other(String),
}

#[derive(Error, Debug)]
pub enum CodegenError {
    #[error("unable to resolve naming conflict for {key}: no name candidates left")]
    NamingExhausted { key: String },

    #[error("generate generic interface impl {key}: {source}")]
    GenericImpl {
        key: String,
        #[source]
        source: SynthError,
    },

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Format error: {0}")]
    Fmt(#[from] std::fmt::Error),
}

impl CodegenError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CodegenError::Io {
            path: path.into(),
            source,
        }
    }
}
