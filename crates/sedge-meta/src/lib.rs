//! Compile-time directive engine for sedge.
//!
//! Units carry two directive forms: evaluated blocks (`Stmt::MetaBlock`),
//! whose payload is a small Lua-flavored script, and conditional branch
//! selection (`Stmt::MetaIf`), whose predicates pick exactly one subtree at
//! compile time. [`expand`] runs both in strict source order against a
//! caller-owned [`Session`] and returns a tree free of meta nodes.
//!
//! ```
//! use rhizome_sedge_ast::builders::*;
//! use rhizome_sedge_meta::{expand, Session};
//!
//! let unit = chunk(vec![
//!     meta("if version_at_least(\"5.3\") then emit(\"-- modern\") end"),
//! ]);
//! let mut session = Session::default();
//! let expanded = expand(&unit, &mut session).unwrap();
//! assert_eq!(expanded.chunk.block.stmts.len(), 1);
//! ```

mod env;
mod error;
mod eval;
mod expand;
mod script;
mod session;
mod value;

pub use error::{ExpandError, MetaError};
pub use eval::Effect;
pub use expand::{expand, Expanded};
pub use session::Session;
pub use value::Value;
