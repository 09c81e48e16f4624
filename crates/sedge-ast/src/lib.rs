//! Resolved AST, literal model, and target configuration for the sedge
//! backend.
//!
//! A frontend hands the backend a [`Chunk`]: a fully resolved statement tree
//! with exact literals ([`NumberLiteral`] keeps digits, [`Expr::Str`] keeps
//! bytes) and optional static type annotations. The whole family derives
//! serde, so a unit can travel as JSON between processes.
//!
//! ```
//! use rhizome_sedge_ast::builders::*;
//!
//! let unit = chunk(vec![
//!     local_(vec![untyped("x")], vec![int(1)]),
//!     call_stmt(call(name("print"), vec![name("x")])),
//! ]);
//! assert!(rhizome_sedge_ast::validate(&unit).is_ok());
//! ```

pub mod builders;
mod config;
mod node;
mod number;
mod span;
mod validation;

pub use config::{Backend, Config, ConfigError, LuaVersion};
pub use node::{
    BinOp, Block, CallArgs, CallConv, Chunk, Expr, ForeignImport, IfArm, MetaArm, Stmt, SwitchArm,
    TableField, TypeName, TypedName, UnOp, VerbatimScope,
};
pub use number::{Base, NumberError, NumberLiteral};
pub use span::Span;
pub use validation::{KEYWORDS, ValidationError, is_identifier, is_keyword, validate};
