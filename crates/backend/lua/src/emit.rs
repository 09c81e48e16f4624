//! Rendering the lowered tree as Lua text.
//!
//! A pure function of the tree, the configuration, and the expansion
//! side-products. Parentheses appear exactly where the target parser would
//! otherwise read something else: operator precedence and associativity
//! follow the 5.3 table, and call/index targets that are not prefix
//! expressions get wrapped (`({})()`, `("a"):f()`).

use std::collections::HashSet;

use rhizome_sedge_ast::{
    BinOp, Block, CallArgs, CallConv, Chunk, Config, Expr, ForeignImport, Span, Stmt, TableField,
    TypedName, UnOp, VerbatimScope, is_identifier,
};

use crate::error::Error;
use crate::literal;

const INDENT: &str = "  ";

/// Render a lowered unit. `includes` are the dependencies expansion
/// collected, already deduplicated, in first-request order.
pub(crate) fn emit(chunk: &Chunk, includes: &[String], config: &Config) -> Result<String, Error> {
    let mut em = Emitter {
        config,
        body: String::new(),
        indent: 0,
        decls: Vec::new(),
        cdefs: Vec::new(),
        ffi_seen: HashSet::new(),
        uses_ffi: false,
    };
    em.block(&chunk.block)?;
    Ok(em.assemble(includes))
}

struct Emitter<'a> {
    config: &'a Config,
    body: String,
    indent: usize,
    /// Declaration-scope verbatims, hoisted in request order.
    decls: Vec<String>,
    /// FFI prototypes, one entry per distinct (symbol, header).
    cdefs: Vec<String>,
    ffi_seen: HashSet<(String, Option<String>)>,
    uses_ffi: bool,
}

impl Emitter<'_> {
    /// Preamble then body: the cdef block must precede any declaration that
    /// reaches through `ffi.C`, and includes never depend on unit names.
    fn assemble(self, includes: &[String]) -> String {
        let mut out = String::new();
        if self.uses_ffi {
            out.push_str("local ffi = require(\"ffi\")\n");
            if !self.cdefs.is_empty() {
                out.push_str("ffi.cdef[[\n");
                for cdef in &self.cdefs {
                    out.push_str(cdef);
                    out.push('\n');
                }
                out.push_str("]]\n");
            }
        }
        for dep in includes {
            out.push_str("require(");
            out.push_str(&literal::string(dep.as_bytes()));
            out.push_str(")\n");
        }
        for decl in &self.decls {
            out.push_str(decl);
            out.push('\n');
        }
        out.push_str(&self.body);
        out
    }

    /// One statement line at the current depth. A leading `(` would splice
    /// into the previous statement as a call, so it gets a `;` shield.
    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.body.push_str(INDENT);
        }
        if text.starts_with('(') {
            self.body.push(';');
        }
        self.body.push_str(text);
        self.body.push('\n');
    }

    fn block(&mut self, block: &Block) -> Result<(), Error> {
        for stmt in &block.stmts {
            self.stmt(stmt)?;
        }
        Ok(())
    }

    fn indented(&mut self, block: &Block) -> Result<(), Error> {
        self.indent += 1;
        self.block(block)?;
        self.indent -= 1;
        Ok(())
    }

    fn stmt(&mut self, stmt: &Stmt) -> Result<(), Error> {
        match stmt {
            Stmt::Local { targets, exprs, .. } => {
                let names = name_list(targets);
                let text = if exprs.is_empty() {
                    format!("local {names}")
                } else {
                    format!("local {names} = {}", self.expr_list(exprs)?)
                };
                self.line(&text);
            }
            Stmt::Assign { targets, exprs, .. } => {
                let text = format!(
                    "{} = {}",
                    self.expr_list(targets)?,
                    self.expr_list(exprs)?
                );
                self.line(&text);
            }
            Stmt::Call { call, .. } => {
                let text = self.expr(call)?;
                self.line(&text);
            }
            Stmt::Do { body, .. } => {
                self.line("do");
                self.indented(body)?;
                self.line("end");
            }
            Stmt::If {
                arms, else_body, ..
            } => {
                for (i, arm) in arms.iter().enumerate() {
                    let kw = if i == 0 { "if" } else { "elseif" };
                    let text = format!("{kw} {} then", self.expr(&arm.cond)?);
                    self.line(&text);
                    self.indented(&arm.body)?;
                }
                if let Some(else_body) = else_body {
                    self.line("else");
                    self.indented(else_body)?;
                }
                self.line("end");
            }
            Stmt::While { cond, body, .. } => {
                let text = format!("while {} do", self.expr(cond)?);
                self.line(&text);
                self.indented(body)?;
                self.line("end");
            }
            Stmt::Repeat { body, cond, .. } => {
                self.line("repeat");
                self.indented(body)?;
                let text = format!("until {}", self.expr(cond)?);
                self.line(&text);
            }
            Stmt::NumericFor {
                var,
                start,
                end,
                step,
                body,
                ..
            } => {
                let mut head = format!(
                    "for {} = {}, {}",
                    var.name,
                    self.expr(start)?,
                    self.expr(end)?
                );
                if let Some(step) = step {
                    head.push_str(", ");
                    head.push_str(&self.expr(step)?);
                }
                head.push_str(" do");
                self.line(&head);
                self.indented(body)?;
                self.line("end");
            }
            Stmt::GenericFor {
                names, exprs, body, ..
            } => {
                let text = format!(
                    "for {} in {} do",
                    name_list(names),
                    self.expr_list(exprs)?
                );
                self.line(&text);
                self.indented(body)?;
                self.line("end");
            }
            Stmt::Goto { label, span } => {
                self.goto_supported(span)?;
                self.line(&format!("goto {label}"));
            }
            Stmt::Label { name, span } => {
                self.goto_supported(span)?;
                self.line(&format!("::{name}::"));
            }
            Stmt::Break { .. } => self.line("break"),
            Stmt::Return { exprs, .. } => {
                if exprs.is_empty() {
                    self.line("return");
                } else {
                    let text = format!("return {}", self.expr_list(exprs)?);
                    self.line(&text);
                }
            }
            Stmt::ForeignImport(fi) => self.foreign_import(fi)?,
            Stmt::Verbatim { text, scope, .. } => match scope {
                // Raw in both positions: injected text owns its own layout.
                VerbatimScope::Statement => {
                    self.body.push_str(text);
                    self.body.push('\n');
                }
                VerbatimScope::Declaration => self.decls.push(text.clone()),
            },
            // Expansion precedes emission; a surviving directive is a
            // pipeline bug, not a user error, but it must not pass silently.
            Stmt::MetaBlock { span, .. } | Stmt::MetaIf { span, .. } => {
                return Err(Error::UnsupportedConstruct {
                    construct: "unexpanded compile-time directive",
                    span: *span,
                });
            }
            Stmt::Switch { span, .. } => {
                return Err(Error::UnsupportedConstruct {
                    construct: "unlowered switch",
                    span: *span,
                });
            }
        }
        Ok(())
    }

    fn goto_supported(&self, span: &Span) -> Result<(), Error> {
        if self.config.supports_goto() {
            Ok(())
        } else {
            Err(Error::UnsupportedConstruct {
                construct: "goto/label",
                span: *span,
            })
        }
    }

    fn foreign_import(&mut self, fi: &ForeignImport) -> Result<(), Error> {
        if !self.config.supports_ffi() {
            return Err(Error::ForeignImportUnsupported {
                symbol: fi.symbol.clone(),
                span: fi.span,
            });
        }
        if fi.convention != CallConv::C {
            return Err(Error::UnsupportedConstruct {
                construct: "non-C calling convention",
                span: fi.span,
            });
        }
        if !self
            .ffi_seen
            .insert((fi.symbol.clone(), fi.header.clone()))
        {
            // Same (symbol, header) already bound; nothing to emit.
            return Ok(());
        }
        self.uses_ffi = true;
        if let Some(cdecl) = &fi.cdecl {
            self.cdefs.push(cdecl.clone());
        }
        self.line(&format!("local {} = ffi.C.{}", fi.name, fi.symbol));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn expr(&mut self, expr: &Expr) -> Result<String, Error> {
        self.expr_prec(expr, 0)
    }

    fn expr_list(&mut self, exprs: &[Expr]) -> Result<String, Error> {
        let parts: Vec<String> = exprs
            .iter()
            .map(|e| self.expr(e))
            .collect::<Result<_, _>>()?;
        Ok(parts.join(", "))
    }

    /// Render with the caller's minimum binding power; anything looser gets
    /// parenthesized.
    fn expr_prec(&mut self, expr: &Expr, min: u8) -> Result<String, Error> {
        let text = match expr {
            Expr::Nil => "nil".to_string(),
            Expr::Bool(true) => "true".to_string(),
            Expr::Bool(false) => "false".to_string(),
            Expr::Varargs => "...".to_string(),
            // A sign carried in the literal binds exactly like unary minus.
            Expr::Number(n) if n.negative && !n.is_zero() => {
                let text = literal::number(n, self.config);
                return Ok(maybe_paren(text, UNARY_PREC, min));
            }
            Expr::Number(n) => literal::number(n, self.config),
            Expr::Str(bytes) => literal::string(bytes),
            Expr::Name(n) => n.clone(),
            Expr::Index { obj, key } => {
                let obj = self.prefix_expr(obj)?;
                match identifier_key(key) {
                    Some(field) => format!("{obj}.{field}"),
                    None => format!("{obj}[{}]", self.expr(key)?),
                }
            }
            Expr::Call { callee, args } => {
                format!("{}{}", self.prefix_expr(callee)?, self.args(args)?)
            }
            Expr::MethodCall { obj, method, args } => {
                format!("{}:{method}{}", self.prefix_expr(obj)?, self.args(args)?)
            }
            Expr::Table(fields) => self.table(fields)?,
            Expr::Function {
                params,
                varargs,
                body,
            } => self.function(params, *varargs, body)?,
            Expr::Unary { op, expr } => {
                let operand = self.expr_prec(expr, UNARY_PREC)?;
                let text = match op {
                    // `--` would open a comment.
                    UnOp::Neg if operand.starts_with('-') => format!("-({operand})"),
                    UnOp::Neg => format!("-{operand}"),
                    UnOp::Not => format!("not {operand}"),
                    UnOp::Len => format!("#{operand}"),
                    UnOp::BNot => format!("~{operand}"),
                };
                return Ok(maybe_paren(text, UNARY_PREC, min));
            }
            Expr::Binary { op, lhs, rhs } => {
                let (prec, right_assoc) = binop_prec(*op);
                let (lmin, rmin) = if right_assoc {
                    (prec + 1, prec)
                } else {
                    (prec, prec + 1)
                };
                let lhs = self.expr_prec(lhs, lmin)?;
                let rhs = self.expr_prec(rhs, rmin)?;
                let text = format!("{lhs} {} {rhs}", binop_token(*op));
                return Ok(maybe_paren(text, prec, min));
            }
        };
        Ok(text)
    }

    /// Call, index, and method targets must be prefix expressions; anything
    /// else is wrapped so the target parses it the way the tree means it.
    fn prefix_expr(&mut self, expr: &Expr) -> Result<String, Error> {
        let text = self.expr(expr)?;
        match expr {
            Expr::Name(_) | Expr::Index { .. } | Expr::Call { .. } | Expr::MethodCall { .. } => {
                Ok(text)
            }
            _ => Ok(format!("({text})")),
        }
    }

    fn args(&mut self, args: &CallArgs) -> Result<String, Error> {
        let inner = match args {
            CallArgs::List(exprs) => self.expr_list(exprs)?,
            CallArgs::Str(bytes) => literal::string(bytes),
            CallArgs::Table(fields) => self.table(fields)?,
        };
        Ok(format!("({inner})"))
    }

    fn table(&mut self, fields: &[TableField]) -> Result<String, Error> {
        if fields.is_empty() {
            return Ok("{}".to_string());
        }
        let mut parts = Vec::with_capacity(fields.len());
        for field in fields {
            let part = match field {
                TableField::Item(e) => self.expr(e)?,
                TableField::Named { name, value } => {
                    format!("{name} = {}", self.expr(value)?)
                }
                TableField::Keyed { key, value } => {
                    format!("[{}] = {}", self.expr(key)?, self.expr(value)?)
                }
            };
            parts.push(part);
        }
        Ok(format!("{{ {} }}", parts.join(", ")))
    }

    fn function(
        &mut self,
        params: &[TypedName],
        varargs: bool,
        body: &Block,
    ) -> Result<String, Error> {
        let mut sig: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
        if varargs {
            sig.push("...");
        }
        let mut text = format!("function({})\n", sig.join(", "));

        // Render the body through the ordinary statement path so nested
        // verbatims and imports land in the shared preamble collections.
        let saved = std::mem::take(&mut self.body);
        self.indent += 1;
        let result = self.block(body);
        self.indent -= 1;
        let rendered = std::mem::replace(&mut self.body, saved);
        result?;

        text.push_str(&rendered);
        for _ in 0..self.indent {
            text.push_str(INDENT);
        }
        text.push_str("end");
        Ok(text)
    }
}

fn name_list(names: &[TypedName]) -> String {
    names
        .iter()
        .map(|n| n.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// `obj["key"]` renders as `obj.key` for well-formed identifier keys.
fn identifier_key(key: &Expr) -> Option<&str> {
    let Expr::Str(bytes) = key else {
        return None;
    };
    let text = std::str::from_utf8(bytes).ok()?;
    is_identifier(text).then_some(text)
}

fn maybe_paren(text: String, prec: u8, min: u8) -> String {
    if prec < min {
        format!("({text})")
    } else {
        text
    }
}

const UNARY_PREC: u8 = 12;

/// 5.3 binding powers; `..` and `^` associate to the right.
fn binop_prec(op: BinOp) -> (u8, bool) {
    match op {
        BinOp::Or => (1, false),
        BinOp::And => (2, false),
        BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => (3, false),
        BinOp::BOr => (4, false),
        BinOp::BXor => (5, false),
        BinOp::BAnd => (6, false),
        BinOp::Shl | BinOp::Shr => (7, false),
        BinOp::Concat => (9, true),
        BinOp::Add | BinOp::Sub => (10, false),
        BinOp::Mul | BinOp::Div | BinOp::IDiv | BinOp::Mod => (11, false),
        BinOp::Pow => (14, true),
    }
}

fn binop_token(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::IDiv => "//",
        BinOp::Mod => "%",
        BinOp::Pow => "^",
        BinOp::Concat => "..",
        BinOp::Eq => "==",
        BinOp::Ne => "~=",
        BinOp::Lt => "<",
        BinOp::Le => "<=",
        BinOp::Gt => ">",
        BinOp::Ge => ">=",
        BinOp::And => "and",
        BinOp::Or => "or",
        BinOp::BAnd => "&",
        BinOp::BOr => "|",
        BinOp::BXor => "~",
        BinOp::Shl => "<<",
        BinOp::Shr => ">>",
    }
}
