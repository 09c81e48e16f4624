//! Diagnostics of one unit's compilation.
//!
//! Every kind is fatal: the pipeline aborts, the caller gets exactly one
//! diagnostic, and no partial source text ever leaves the backend.

use rhizome_sedge_ast::{ConfigError, Span, ValidationError};
use rhizome_sedge_meta::ExpandError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum Error {
    /// The frontend handed over a tree violating the resolved-AST contract.
    #[error("malformed unit: {0}")]
    Validation(#[from] ValidationError),

    /// A compile-time directive failed.
    #[error(transparent)]
    Meta(#[from] ExpandError),

    /// The construct has no valid lowering for the configured target.
    #[error("{construct} is not supported by the configured target at {span}")]
    UnsupportedConstruct { construct: &'static str, span: Span },

    /// A native import was requested on a backend without interop support.
    #[error("foreign import {symbol:?} requires a backend with native interop at {span}")]
    ForeignImportUnsupported { symbol: String, span: Span },

    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),
}
