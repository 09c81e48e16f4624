//! Directive failure kinds.

use rhizome_sedge_ast::{ConfigError, Span};
use thiserror::Error;

/// A directive script failed to parse or run.
#[derive(Debug, Error, PartialEq)]
pub enum MetaError {
    /// Position is relative to the directive payload, not the unit.
    #[error("parse error at {line}:{col}: {message}")]
    Parse { line: u32, col: u32, message: String },

    #[error("undefined variable {0:?}")]
    UndefinedVariable(String),

    #[error("unknown configuration field {0:?}")]
    UnknownField(String),

    #[error("unknown intrinsic {0:?}")]
    UnknownIntrinsic(String),

    #[error("{name} expects {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("type error: {0}")]
    Type(String),

    #[error("branch predicate must be a boolean, got {0}")]
    InvalidPredicate(&'static str),

    /// `error(...)` was called in a directive.
    #[error("{0}")]
    Raised(String),

    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),

    #[error("directive exceeded the evaluation budget")]
    BudgetExhausted,
}

/// A [`MetaError`] tied to the unit position of the directive that raised it.
#[derive(Debug, Error, PartialEq)]
#[error("directive at {span} failed")]
pub struct ExpandError {
    pub span: Span,
    #[source]
    pub cause: MetaError,
}

impl ExpandError {
    pub fn new(span: Span, cause: MetaError) -> Self {
        ExpandError { span, cause }
    }
}
