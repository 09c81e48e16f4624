//! Structural validation of the resolved-AST contract.
//!
//! The frontend guarantees these shapes; a violation here means an upstream
//! bug, and flagging it early keeps it from surfacing as a garbled unit.

use thiserror::Error;

use crate::node::{Block, CallArgs, Chunk, Expr, Stmt, TableField, TypedName};
use crate::span::Span;

/// Reserved words of the emission target. None of them may appear as an
/// identifier anywhere in a unit.
pub const KEYWORDS: &[&str] = &[
    "and", "break", "do", "else", "elseif", "end", "false", "for", "function", "goto", "if", "in",
    "local", "nil", "not", "or", "repeat", "return", "then", "true", "until", "while",
];

/// True for reserved words of the emission target.
pub fn is_keyword(s: &str) -> bool {
    KEYWORDS.contains(&s)
}

/// True when `s` is a well-formed, non-reserved identifier.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    let head_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    head_ok && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') && !is_keyword(s)
}

/// Contract violations in a resolved tree.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid identifier {name:?} at {span}")]
    InvalidIdentifier { name: String, span: Span },

    #[error("assignment target is not a name or index expression at {span}")]
    InvalidAssignTarget { span: Span },

    #[error("{stmt} statement with no {what} at {span}")]
    Empty {
        stmt: &'static str,
        what: &'static str,
        span: Span,
    },

    #[error("statement position holds a non-call expression at {span}")]
    NonCallStatement { span: Span },
}

/// Validate a unit against the resolved-AST contract.
///
/// Checks identifiers (names, fields, labels, parameters) for
/// well-formedness, assignment targets for lvalue shape, and the arm/list
/// arities the node shapes cannot express on their own. All blocks are
/// walked, including unselected compile-time branches: structural validity
/// is a frontend obligation independent of the configuration.
pub fn validate(chunk: &Chunk) -> Result<(), ValidationError> {
    validate_block(&chunk.block)
}

fn validate_block(block: &Block) -> Result<(), ValidationError> {
    for stmt in &block.stmts {
        validate_stmt(stmt)?;
    }
    Ok(())
}

fn validate_stmt(stmt: &Stmt) -> Result<(), ValidationError> {
    let span = stmt.span();
    match stmt {
        Stmt::Local { targets, exprs, .. } => {
            if targets.is_empty() {
                return Err(ValidationError::Empty {
                    stmt: "local",
                    what: "targets",
                    span,
                });
            }
            for t in targets {
                validate_typed_name(t, span)?;
            }
            validate_exprs(exprs, span)
        }
        Stmt::Assign { targets, exprs, .. } => {
            if targets.is_empty() {
                return Err(ValidationError::Empty {
                    stmt: "assignment",
                    what: "targets",
                    span,
                });
            }
            if exprs.is_empty() {
                return Err(ValidationError::Empty {
                    stmt: "assignment",
                    what: "values",
                    span,
                });
            }
            for t in targets {
                match t {
                    Expr::Name(_) | Expr::Index { .. } => validate_expr(t, span)?,
                    _ => return Err(ValidationError::InvalidAssignTarget { span }),
                }
            }
            validate_exprs(exprs, span)
        }
        Stmt::Call { call, .. } => match call {
            Expr::Call { .. } | Expr::MethodCall { .. } => validate_expr(call, span),
            _ => Err(ValidationError::NonCallStatement { span }),
        },
        Stmt::Do { body, .. } => validate_block(body),
        Stmt::If {
            arms, else_body, ..
        } => {
            if arms.is_empty() {
                return Err(ValidationError::Empty {
                    stmt: "if",
                    what: "arms",
                    span,
                });
            }
            for arm in arms {
                validate_expr(&arm.cond, span)?;
                validate_block(&arm.body)?;
            }
            validate_else(else_body)
        }
        Stmt::Switch {
            expr,
            arms,
            else_body,
            ..
        } => {
            if arms.is_empty() {
                return Err(ValidationError::Empty {
                    stmt: "switch",
                    what: "arms",
                    span,
                });
            }
            validate_expr(expr, span)?;
            for arm in arms {
                validate_expr(&arm.value, span)?;
                validate_block(&arm.body)?;
            }
            validate_else(else_body)
        }
        Stmt::While { cond, body, .. } => {
            validate_expr(cond, span)?;
            validate_block(body)
        }
        Stmt::Repeat { body, cond, .. } => {
            validate_block(body)?;
            validate_expr(cond, span)
        }
        Stmt::NumericFor {
            var,
            start,
            end,
            step,
            body,
            ..
        } => {
            validate_typed_name(var, span)?;
            validate_expr(start, span)?;
            validate_expr(end, span)?;
            if let Some(step) = step {
                validate_expr(step, span)?;
            }
            validate_block(body)
        }
        Stmt::GenericFor {
            names, exprs, body, ..
        } => {
            if names.is_empty() {
                return Err(ValidationError::Empty {
                    stmt: "for",
                    what: "names",
                    span,
                });
            }
            if exprs.is_empty() {
                return Err(ValidationError::Empty {
                    stmt: "for",
                    what: "iterators",
                    span,
                });
            }
            for n in names {
                validate_typed_name(n, span)?;
            }
            validate_exprs(exprs, span)?;
            validate_block(body)
        }
        Stmt::Goto { label, .. } => validate_ident(label, span),
        Stmt::Label { name, .. } => validate_ident(name, span),
        Stmt::Break { .. } => Ok(()),
        Stmt::Return { exprs, .. } => validate_exprs(exprs, span),
        Stmt::ForeignImport(fi) => {
            validate_ident(&fi.name, fi.span)?;
            if fi.symbol.is_empty() {
                return Err(ValidationError::Empty {
                    stmt: "foreign import",
                    what: "symbol",
                    span: fi.span,
                });
            }
            Ok(())
        }
        Stmt::MetaBlock { .. } => Ok(()),
        Stmt::MetaIf {
            arms, else_body, ..
        } => {
            if arms.is_empty() {
                return Err(ValidationError::Empty {
                    stmt: "meta if",
                    what: "arms",
                    span,
                });
            }
            for arm in arms {
                validate_block(&arm.body)?;
            }
            validate_else(else_body)
        }
        Stmt::Verbatim { .. } => Ok(()),
    }
}

fn validate_else(else_body: &Option<Block>) -> Result<(), ValidationError> {
    match else_body {
        Some(b) => validate_block(b),
        None => Ok(()),
    }
}

fn validate_exprs(exprs: &[Expr], span: Span) -> Result<(), ValidationError> {
    for e in exprs {
        validate_expr(e, span)?;
    }
    Ok(())
}

fn validate_expr(expr: &Expr, span: Span) -> Result<(), ValidationError> {
    match expr {
        Expr::Nil | Expr::Bool(_) | Expr::Number(_) | Expr::Str(_) | Expr::Varargs => Ok(()),
        Expr::Name(name) => validate_ident(name, span),
        Expr::Index { obj, key } => {
            validate_expr(obj, span)?;
            validate_expr(key, span)
        }
        Expr::Call { callee, args } => {
            validate_expr(callee, span)?;
            validate_args(args, span)
        }
        Expr::MethodCall { obj, method, args } => {
            validate_expr(obj, span)?;
            validate_ident(method, span)?;
            validate_args(args, span)
        }
        Expr::Table(fields) => validate_fields(fields, span),
        Expr::Function { params, body, .. } => {
            for p in params {
                validate_typed_name(p, span)?;
            }
            validate_block(body)
        }
        Expr::Unary { expr, .. } => validate_expr(expr, span),
        Expr::Binary { lhs, rhs, .. } => {
            validate_expr(lhs, span)?;
            validate_expr(rhs, span)
        }
    }
}

fn validate_args(args: &CallArgs, span: Span) -> Result<(), ValidationError> {
    match args {
        CallArgs::List(exprs) => validate_exprs(exprs, span),
        CallArgs::Str(_) => Ok(()),
        CallArgs::Table(fields) => validate_fields(fields, span),
    }
}

fn validate_fields(fields: &[TableField], span: Span) -> Result<(), ValidationError> {
    for field in fields {
        match field {
            TableField::Item(e) => validate_expr(e, span)?,
            TableField::Named { name, value } => {
                validate_ident(name, span)?;
                validate_expr(value, span)?;
            }
            TableField::Keyed { key, value } => {
                validate_expr(key, span)?;
                validate_expr(value, span)?;
            }
        }
    }
    Ok(())
}

fn validate_typed_name(t: &TypedName, span: Span) -> Result<(), ValidationError> {
    validate_ident(&t.name, span)
}

fn validate_ident(name: &str, span: Span) -> Result<(), ValidationError> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(ValidationError::InvalidIdentifier {
            name: name.to_string(),
            span,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::*;

    #[test]
    fn test_identifier_rules() {
        assert!(is_identifier("x"));
        assert!(is_identifier("_private"));
        assert!(is_identifier("value2"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("2x"));
        assert!(!is_identifier("a-b"));
        assert!(!is_identifier("end"));
        assert!(is_keyword("goto"));
        assert!(!is_keyword("switch"));
    }

    #[test]
    fn test_validate_ok() {
        let unit = chunk(vec![
            local_(vec![untyped("x")], vec![int(1)]),
            assign(vec![name("x")], vec![binary(crate::BinOp::Add, name("x"), int(1))]),
            call_stmt(call(name("print"), vec![name("x")])),
        ]);
        assert_eq!(validate(&unit), Ok(()));
    }

    #[test]
    fn test_rejects_keyword_identifier() {
        let unit = chunk(vec![local_(vec![untyped("end")], vec![])]);
        assert!(matches!(
            validate(&unit),
            Err(ValidationError::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn test_rejects_literal_assign_target() {
        let unit = chunk(vec![assign(vec![int(1)], vec![int(2)])]);
        assert_eq!(
            validate(&unit),
            Err(ValidationError::InvalidAssignTarget {
                span: Span::default()
            })
        );
    }

    #[test]
    fn test_rejects_non_call_statement() {
        let unit = chunk(vec![call_stmt(name("f"))]);
        assert!(matches!(
            validate(&unit),
            Err(ValidationError::NonCallStatement { .. })
        ));
    }

    #[test]
    fn test_rejects_empty_switch() {
        let unit = chunk(vec![switch(name("x"), vec![], None)]);
        assert!(matches!(validate(&unit), Err(ValidationError::Empty { .. })));
    }

    #[test]
    fn test_walks_function_bodies() {
        let unit = chunk(vec![local_(
            vec![untyped("f")],
            vec![func(
                vec![untyped("a")],
                block(vec![ret(vec![name("not an identifier")])]),
            )],
        )]);
        assert!(matches!(
            validate(&unit),
            Err(ValidationError::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn test_walks_meta_arms() {
        let unit = chunk(vec![meta_if(
            vec![meta_arm(
                "true",
                block(vec![assign(vec![nil()], vec![int(1)])]),
            )],
            None,
        )]);
        assert!(matches!(
            validate(&unit),
            Err(ValidationError::InvalidAssignTarget { .. })
        ));
    }
}
