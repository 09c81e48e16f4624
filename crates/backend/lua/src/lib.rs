//! Lua source emission backend for sedge.
//!
//! [`generate`] takes a resolved unit and a caller-owned session and returns
//! Lua text for the session's configured target, or a single fatal
//! diagnostic. The pipeline is strictly ordered: directives run first (they
//! reshape the tree and may reconfigure the target), the fixed lowering
//! passes desugar what the target lacks, and the emitter renders the result
//! as a pure function of the final tree.
//!
//! ```
//! use rhizome_sedge_ast::builders::*;
//! use rhizome_sedge_meta::Session;
//!
//! let unit = chunk(vec![ret(vec![lit("0b10")])]);
//! let mut session = Session::default();
//! let text = rhizome_sedge_backend_lua::generate(&unit, &mut session).unwrap();
//! assert_eq!(text, "return 0x2\n");
//! ```

mod emit;
mod error;
mod literal;
mod lower;

pub use error::Error;

use rhizome_sedge_ast::{validate, Chunk};
use rhizome_sedge_meta::{expand, Session};
use tracing::debug;

/// Compile one unit against the session's configuration.
///
/// Nothing is returned on failure: partial text never leaves the backend.
/// The session may come out changed; that is the contract, not an accident —
/// directives mutate it and later units compiled with the same session are
/// meant to observe the result.
pub fn generate(chunk: &Chunk, session: &mut Session) -> Result<String, Error> {
    // A session deserialized from outside bypasses Session::new.
    session.config().validate()?;
    validate(chunk)?;

    let expanded = expand(chunk, session)?;
    let mut lowered = expanded.chunk;
    lower::lower(&mut lowered, session.config());
    let text = emit::emit(&lowered, &expanded.includes, session.config())?;
    debug!(
        target_version = %session.config().target_version,
        target_backend = %session.config().target_backend,
        bytes = text.len(),
        "unit generated"
    );
    Ok(text)
}

#[cfg(test)]
mod tests;
