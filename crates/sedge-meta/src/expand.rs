//! Expansion: running directives against the tree they are embedded in.
//!
//! Walks a unit in source order, executes every `MetaBlock`, resolves every
//! `MetaIf`, and splices the results back in place. The output tree contains
//! no meta nodes; injected text survives as `Verbatim` statements at the
//! position the directive requested them, so later passes need no knowledge
//! of the engine at all.

use std::collections::HashSet;

use rhizome_sedge_ast::{Block, Chunk, Expr, Span, Stmt, VerbatimScope};
use tracing::debug;

use crate::error::ExpandError;
use crate::eval::{Effect, Evaluator};
use crate::session::Session;

/// A unit with all directives executed, plus the side-products emission
/// needs: dependencies requested through `include`, deduplicated, in
/// first-request order.
#[derive(Debug, Clone, PartialEq)]
pub struct Expanded {
    pub chunk: Chunk,
    pub includes: Vec<String>,
}

/// Execute all directives of `chunk` against `session`.
///
/// Configuration writes land on the session immediately, so a directive
/// observes everything earlier directives changed — including directives of
/// previous units compiled with the same session.
pub fn expand(chunk: &Chunk, session: &mut Session) -> Result<Expanded, ExpandError> {
    let mut cx = Expansion {
        ev: Evaluator::new(session),
        includes: Vec::new(),
        seen_includes: HashSet::new(),
    };
    let block = cx.block(&chunk.block)?;
    debug!(includes = cx.includes.len(), "unit expanded");
    Ok(Expanded {
        chunk: Chunk::new(block),
        includes: cx.includes,
    })
}

struct Expansion<'a> {
    ev: Evaluator<'a>,
    includes: Vec<String>,
    seen_includes: HashSet<String>,
}

impl Expansion<'_> {
    fn block(&mut self, block: &Block) -> Result<Block, ExpandError> {
        let mut stmts = Vec::with_capacity(block.stmts.len());
        for stmt in &block.stmts {
            self.stmt(stmt, &mut stmts)?;
        }
        Ok(Block::new(stmts))
    }

    fn stmt(&mut self, stmt: &Stmt, out: &mut Vec<Stmt>) -> Result<(), ExpandError> {
        match stmt {
            Stmt::MetaBlock { payload, span } => {
                let effects = self
                    .ev
                    .run_script(payload)
                    .map_err(|e| ExpandError::new(*span, e))?;
                self.apply(effects, *span, out);
                Ok(())
            }
            Stmt::MetaIf {
                arms,
                else_body,
                span,
            } => {
                for arm in arms {
                    let selected = self
                        .ev
                        .eval_predicate(&arm.cond)
                        .map_err(|e| ExpandError::new(*span, e))?;
                    if selected {
                        // Discarded arms are never expanded; their contents
                        // cost nothing and may be invalid for this target.
                        let body = self.block(&arm.body)?;
                        out.extend(body.stmts);
                        return Ok(());
                    }
                }
                if let Some(else_body) = else_body {
                    let body = self.block(else_body)?;
                    out.extend(body.stmts);
                }
                Ok(())
            }
            // Everything else passes through with nested blocks expanded;
            // directives are legal anywhere a statement is.
            Stmt::Local {
                targets,
                exprs,
                span,
            } => {
                out.push(Stmt::Local {
                    targets: targets.clone(),
                    exprs: self.exprs(exprs)?,
                    span: *span,
                });
                Ok(())
            }
            Stmt::Assign {
                targets,
                exprs,
                span,
            } => {
                out.push(Stmt::Assign {
                    targets: self.exprs(targets)?,
                    exprs: self.exprs(exprs)?,
                    span: *span,
                });
                Ok(())
            }
            Stmt::Call { call, span } => {
                out.push(Stmt::Call {
                    call: self.expr(call)?,
                    span: *span,
                });
                Ok(())
            }
            Stmt::Do { body, span } => {
                out.push(Stmt::Do {
                    body: self.block(body)?,
                    span: *span,
                });
                Ok(())
            }
            Stmt::If {
                arms,
                else_body,
                span,
            } => {
                let arms = arms
                    .iter()
                    .map(|arm| {
                        Ok(rhizome_sedge_ast::IfArm {
                            cond: self.expr(&arm.cond)?,
                            body: self.block(&arm.body)?,
                        })
                    })
                    .collect::<Result<_, ExpandError>>()?;
                out.push(Stmt::If {
                    arms,
                    else_body: self.else_body(else_body)?,
                    span: *span,
                });
                Ok(())
            }
            Stmt::Switch {
                expr,
                arms,
                else_body,
                span,
            } => {
                let arms = arms
                    .iter()
                    .map(|arm| {
                        Ok(rhizome_sedge_ast::SwitchArm {
                            value: self.expr(&arm.value)?,
                            body: self.block(&arm.body)?,
                        })
                    })
                    .collect::<Result<_, ExpandError>>()?;
                out.push(Stmt::Switch {
                    expr: self.expr(expr)?,
                    arms,
                    else_body: self.else_body(else_body)?,
                    span: *span,
                });
                Ok(())
            }
            Stmt::While { cond, body, span } => {
                out.push(Stmt::While {
                    cond: self.expr(cond)?,
                    body: self.block(body)?,
                    span: *span,
                });
                Ok(())
            }
            Stmt::Repeat { body, cond, span } => {
                out.push(Stmt::Repeat {
                    body: self.block(body)?,
                    cond: self.expr(cond)?,
                    span: *span,
                });
                Ok(())
            }
            Stmt::NumericFor {
                var,
                start,
                end,
                step,
                body,
                span,
            } => {
                out.push(Stmt::NumericFor {
                    var: var.clone(),
                    start: self.expr(start)?,
                    end: self.expr(end)?,
                    step: step.as_ref().map(|s| self.expr(s)).transpose()?,
                    body: self.block(body)?,
                    span: *span,
                });
                Ok(())
            }
            Stmt::GenericFor {
                names,
                exprs,
                body,
                span,
            } => {
                out.push(Stmt::GenericFor {
                    names: names.clone(),
                    exprs: self.exprs(exprs)?,
                    body: self.block(body)?,
                    span: *span,
                });
                Ok(())
            }
            Stmt::Return { exprs, span } => {
                out.push(Stmt::Return {
                    exprs: self.exprs(exprs)?,
                    span: *span,
                });
                Ok(())
            }
            Stmt::Goto { .. }
            | Stmt::Label { .. }
            | Stmt::Break { .. }
            | Stmt::ForeignImport(_)
            | Stmt::Verbatim { .. } => {
                out.push(stmt.clone());
                Ok(())
            }
        }
    }

    fn apply(&mut self, effects: Vec<Effect>, span: Span, out: &mut Vec<Stmt>) {
        for effect in effects {
            match effect {
                Effect::EmitStmt(text) => out.push(Stmt::Verbatim {
                    text,
                    scope: VerbatimScope::Statement,
                    span,
                }),
                Effect::EmitDecl(text) => out.push(Stmt::Verbatim {
                    text,
                    scope: VerbatimScope::Declaration,
                    span,
                }),
                Effect::Include(dep) => {
                    if self.seen_includes.insert(dep.clone()) {
                        self.includes.push(dep);
                    }
                }
            }
        }
    }

    fn else_body(&mut self, else_body: &Option<Block>) -> Result<Option<Block>, ExpandError> {
        else_body.as_ref().map(|b| self.block(b)).transpose()
    }

    fn exprs(&mut self, exprs: &[Expr]) -> Result<Vec<Expr>, ExpandError> {
        exprs.iter().map(|e| self.expr(e)).collect()
    }

    // Expressions carry no directives of their own, but function bodies
    // nested in them do.
    fn expr(&mut self, expr: &Expr) -> Result<Expr, ExpandError> {
        use rhizome_sedge_ast::TableField;
        let expanded = match expr {
            Expr::Nil
            | Expr::Bool(_)
            | Expr::Number(_)
            | Expr::Str(_)
            | Expr::Varargs
            | Expr::Name(_) => expr.clone(),
            Expr::Index { obj, key } => Expr::Index {
                obj: Box::new(self.expr(obj)?),
                key: Box::new(self.expr(key)?),
            },
            Expr::Call { callee, args } => Expr::Call {
                callee: Box::new(self.expr(callee)?),
                args: self.args(args)?,
            },
            Expr::MethodCall { obj, method, args } => Expr::MethodCall {
                obj: Box::new(self.expr(obj)?),
                method: method.clone(),
                args: self.args(args)?,
            },
            Expr::Table(fields) => Expr::Table(
                fields
                    .iter()
                    .map(|f| {
                        Ok(match f {
                            TableField::Item(e) => TableField::Item(self.expr(e)?),
                            TableField::Named { name, value } => TableField::Named {
                                name: name.clone(),
                                value: self.expr(value)?,
                            },
                            TableField::Keyed { key, value } => TableField::Keyed {
                                key: self.expr(key)?,
                                value: self.expr(value)?,
                            },
                        })
                    })
                    .collect::<Result<_, ExpandError>>()?,
            ),
            Expr::Function {
                params,
                varargs,
                body,
            } => Expr::Function {
                params: params.clone(),
                varargs: *varargs,
                body: self.block(body)?,
            },
            Expr::Unary { op, expr } => Expr::Unary {
                op: *op,
                expr: Box::new(self.expr(expr)?),
            },
            Expr::Binary { op, lhs, rhs } => Expr::Binary {
                op: *op,
                lhs: Box::new(self.expr(lhs)?),
                rhs: Box::new(self.expr(rhs)?),
            },
        };
        Ok(expanded)
    }

    fn args(
        &mut self,
        args: &rhizome_sedge_ast::CallArgs,
    ) -> Result<rhizome_sedge_ast::CallArgs, ExpandError> {
        use rhizome_sedge_ast::CallArgs;
        Ok(match args {
            CallArgs::List(exprs) => CallArgs::List(self.exprs(exprs)?),
            CallArgs::Str(bytes) => CallArgs::Str(bytes.clone()),
            CallArgs::Table(fields) => {
                let Expr::Table(fields) = self.expr(&Expr::Table(fields.clone()))? else {
                    unreachable!("table expansion yields a table");
                };
                CallArgs::Table(fields)
            }
        })
    }
}
