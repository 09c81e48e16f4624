//! Lowering: the fixed, ordered desugaring passes applied before emission.
//!
//! Every pass is a tree-local rewrite and idempotent, so running the
//! sequence twice leaves the tree unchanged. The passes assume an expanded
//! tree (no meta nodes) and leave a tree the emitter can render directly.

use std::collections::HashSet;

use rhizome_sedge_ast::{
    Base, BinOp, Block, CallArgs, Chunk, Config, Expr, IfArm, NumberLiteral, Stmt, TableField,
    TypeName, TypedName, UnOp,
};
use tracing::debug;

/// Apply all lowering passes in order.
pub(crate) fn lower(chunk: &mut Chunk, config: &Config) {
    let mut temps = TempAlloc::new(chunk);
    desugar_switch(chunk, &mut temps);
    normalize_call_sugar(chunk);
    pad_arity(chunk);
    default_typed_decls(chunk);
    strip_types(chunk);
    lower_operators(chunk, config);
    debug!(temporaries = temps.allocated, "unit lowered");
}

// ============================================================================
// Tree walkers
// ============================================================================

/// Visit every block of the unit, including function bodies, outermost
/// first. The callback runs before the walk descends, so statements it
/// synthesizes are visited too.
fn each_block(block: &mut Block, f: &mut impl FnMut(&mut Block)) {
    f(block);
    for stmt in &mut block.stmts {
        match stmt {
            Stmt::Local { exprs, .. } | Stmt::Return { exprs, .. } => {
                for e in exprs {
                    expr_blocks(e, f);
                }
            }
            Stmt::Assign { targets, exprs, .. } => {
                for e in targets.iter_mut().chain(exprs) {
                    expr_blocks(e, f);
                }
            }
            Stmt::Call { call, .. } => expr_blocks(call, f),
            Stmt::Do { body, .. } => each_block(body, f),
            Stmt::If {
                arms, else_body, ..
            } => {
                for arm in arms {
                    expr_blocks(&mut arm.cond, f);
                    each_block(&mut arm.body, f);
                }
                if let Some(else_body) = else_body {
                    each_block(else_body, f);
                }
            }
            Stmt::Switch {
                expr,
                arms,
                else_body,
                ..
            } => {
                expr_blocks(expr, f);
                for arm in arms {
                    expr_blocks(&mut arm.value, f);
                    each_block(&mut arm.body, f);
                }
                if let Some(else_body) = else_body {
                    each_block(else_body, f);
                }
            }
            Stmt::While { cond, body, .. } => {
                expr_blocks(cond, f);
                each_block(body, f);
            }
            Stmt::Repeat { body, cond, .. } => {
                each_block(body, f);
                expr_blocks(cond, f);
            }
            Stmt::NumericFor {
                start,
                end,
                step,
                body,
                ..
            } => {
                expr_blocks(start, f);
                expr_blocks(end, f);
                if let Some(step) = step {
                    expr_blocks(step, f);
                }
                each_block(body, f);
            }
            Stmt::GenericFor { exprs, body, .. } => {
                for e in exprs {
                    expr_blocks(e, f);
                }
                each_block(body, f);
            }
            Stmt::Goto { .. }
            | Stmt::Label { .. }
            | Stmt::Break { .. }
            | Stmt::ForeignImport(_)
            | Stmt::MetaBlock { .. }
            | Stmt::MetaIf { .. }
            | Stmt::Verbatim { .. } => {}
        }
    }
}

fn expr_blocks(expr: &mut Expr, f: &mut impl FnMut(&mut Block)) {
    match expr {
        Expr::Nil
        | Expr::Bool(_)
        | Expr::Number(_)
        | Expr::Str(_)
        | Expr::Varargs
        | Expr::Name(_) => {}
        Expr::Index { obj, key } => {
            expr_blocks(obj, f);
            expr_blocks(key, f);
        }
        Expr::Call { callee, args } => {
            expr_blocks(callee, f);
            args_blocks(args, f);
        }
        Expr::MethodCall { obj, args, .. } => {
            expr_blocks(obj, f);
            args_blocks(args, f);
        }
        Expr::Table(fields) => fields_blocks(fields, f),
        Expr::Function { body, .. } => each_block(body, f),
        Expr::Unary { expr, .. } => expr_blocks(expr, f),
        Expr::Binary { lhs, rhs, .. } => {
            expr_blocks(lhs, f);
            expr_blocks(rhs, f);
        }
    }
}

fn args_blocks(args: &mut CallArgs, f: &mut impl FnMut(&mut Block)) {
    match args {
        CallArgs::List(exprs) => {
            for e in exprs {
                expr_blocks(e, f);
            }
        }
        CallArgs::Str(_) => {}
        CallArgs::Table(fields) => fields_blocks(fields, f),
    }
}

fn fields_blocks(fields: &mut [TableField], f: &mut impl FnMut(&mut Block)) {
    for field in fields {
        match field {
            TableField::Item(e) => expr_blocks(e, f),
            TableField::Named { value, .. } => expr_blocks(value, f),
            TableField::Keyed { key, value } => {
                expr_blocks(key, f);
                expr_blocks(value, f);
            }
        }
    }
}

/// Visit every expression of the unit post-order, children first.
fn each_expr(chunk: &mut Chunk, f: &mut impl FnMut(&mut Expr)) {
    each_block(&mut chunk.block, &mut |block| {
        for stmt in &mut block.stmts {
            match stmt {
                Stmt::Local { exprs, .. } | Stmt::Return { exprs, .. } => {
                    for e in exprs {
                        visit_expr(e, f);
                    }
                }
                Stmt::Assign { targets, exprs, .. } => {
                    for e in targets.iter_mut().chain(exprs) {
                        visit_expr(e, f);
                    }
                }
                Stmt::Call { call, .. } => visit_expr(call, f),
                Stmt::If { arms, .. } => {
                    for arm in arms {
                        visit_expr(&mut arm.cond, f);
                    }
                }
                Stmt::Switch { expr, arms, .. } => {
                    visit_expr(expr, f);
                    for arm in arms {
                        visit_expr(&mut arm.value, f);
                    }
                }
                Stmt::While { cond, .. } | Stmt::Repeat { cond, .. } => visit_expr(cond, f),
                Stmt::NumericFor {
                    start, end, step, ..
                } => {
                    visit_expr(start, f);
                    visit_expr(end, f);
                    if let Some(step) = step {
                        visit_expr(step, f);
                    }
                }
                Stmt::GenericFor { exprs, .. } => {
                    for e in exprs {
                        visit_expr(e, f);
                    }
                }
                _ => {}
            }
        }
    });
}

/// Post-order walk of one expression tree. Stops at function boundaries;
/// `each_expr` reaches nested bodies through the block walk.
fn visit_expr(expr: &mut Expr, f: &mut impl FnMut(&mut Expr)) {
    match expr {
        Expr::Nil
        | Expr::Bool(_)
        | Expr::Number(_)
        | Expr::Str(_)
        | Expr::Varargs
        | Expr::Name(_)
        | Expr::Function { .. } => {}
        Expr::Index { obj, key } => {
            visit_expr(obj, f);
            visit_expr(key, f);
        }
        Expr::Call { callee, args } => {
            visit_expr(callee, f);
            visit_args(args, f);
        }
        Expr::MethodCall { obj, args, .. } => {
            visit_expr(obj, f);
            visit_args(args, f);
        }
        Expr::Table(fields) => visit_fields(fields, f),
        Expr::Unary { expr, .. } => visit_expr(expr, f),
        Expr::Binary { lhs, rhs, .. } => {
            visit_expr(lhs, f);
            visit_expr(rhs, f);
        }
    }
    f(expr);
}

fn visit_args(args: &mut CallArgs, f: &mut impl FnMut(&mut Expr)) {
    match args {
        CallArgs::List(exprs) => {
            for e in exprs {
                visit_expr(e, f);
            }
        }
        CallArgs::Str(_) => {}
        CallArgs::Table(fields) => visit_fields(fields, f),
    }
}

fn visit_fields(fields: &mut [TableField], f: &mut impl FnMut(&mut Expr)) {
    for field in fields {
        match field {
            TableField::Item(e) => visit_expr(e, f),
            TableField::Named { value, .. } => visit_expr(value, f),
            TableField::Keyed { key, value } => {
                visit_expr(key, f);
                visit_expr(value, f);
            }
        }
    }
}

// ============================================================================
// Synthetic temporaries
// ============================================================================

/// Allocates temporaries that collide with nothing in the unit: every
/// identifier the unit mentions anywhere is off limits, as is every
/// previously allocated temporary.
struct TempAlloc {
    used: HashSet<String>,
    counter: u32,
    allocated: u32,
}

impl TempAlloc {
    fn new(chunk: &mut Chunk) -> Self {
        let mut used = HashSet::new();
        each_block(&mut chunk.block, &mut |block| {
            for stmt in &block.stmts {
                collect_stmt_names(stmt, &mut used);
            }
        });
        each_expr(chunk, &mut |e| {
            if let Expr::Name(n) = e {
                used.insert(n.clone());
            }
        });
        TempAlloc {
            used,
            counter: 0,
            allocated: 0,
        }
    }

    fn fresh(&mut self) -> String {
        loop {
            self.counter += 1;
            let name = format!("__switchval{}", self.counter);
            if self.used.insert(name.clone()) {
                self.allocated += 1;
                return name;
            }
        }
    }
}

fn collect_stmt_names(stmt: &Stmt, used: &mut HashSet<String>) {
    fn typed(names: &[TypedName], used: &mut HashSet<String>) {
        for t in names {
            used.insert(t.name.clone());
        }
    }
    match stmt {
        Stmt::Local { targets, .. } => typed(targets, used),
        Stmt::NumericFor { var, .. } => typed(std::slice::from_ref(var), used),
        Stmt::GenericFor { names, .. } => typed(names, used),
        Stmt::Goto { label, .. } => {
            used.insert(label.clone());
        }
        Stmt::Label { name, .. } => {
            used.insert(name.clone());
        }
        Stmt::ForeignImport(fi) => {
            used.insert(fi.name.clone());
        }
        _ => {}
    }
}

// ============================================================================
// Passes
// ============================================================================

/// Pass 1: rewrite each switch into a temporary binding plus an if/elseif
/// chain of equality tests.
fn desugar_switch(chunk: &mut Chunk, temps: &mut TempAlloc) {
    each_block(&mut chunk.block, &mut |block| {
        let stmts = std::mem::take(&mut block.stmts);
        let mut out = Vec::with_capacity(stmts.len());
        for stmt in stmts {
            let Stmt::Switch {
                expr,
                arms,
                else_body,
                span,
            } = stmt
            else {
                out.push(stmt);
                continue;
            };
            let temp = temps.fresh();
            out.push(Stmt::Local {
                targets: vec![TypedName {
                    name: temp.clone(),
                    ty: None,
                }],
                exprs: vec![expr],
                span,
            });
            let if_arms = arms
                .into_iter()
                .map(|arm| IfArm {
                    cond: Expr::Binary {
                        op: BinOp::Eq,
                        lhs: Box::new(Expr::Name(temp.clone())),
                        rhs: Box::new(arm.value),
                    },
                    body: arm.body,
                })
                .collect();
            out.push(Stmt::If {
                arms: if_arms,
                else_body,
                span,
            });
        }
        block.stmts = out;
    });
}

/// Pass 2: give juxtaposition calls (`f "a"`, `f {}`) an explicit
/// parenthesized argument list. Method-call syntax stays as written.
fn normalize_call_sugar(chunk: &mut Chunk) {
    each_expr(chunk, &mut |e| {
        let (Expr::Call { args, .. } | Expr::MethodCall { args, .. }) = e else {
            return;
        };
        match args {
            CallArgs::List(_) => {}
            CallArgs::Str(bytes) => {
                *args = CallArgs::List(vec![Expr::Str(std::mem::take(bytes))]);
            }
            CallArgs::Table(fields) => {
                *args = CallArgs::List(vec![Expr::Table(std::mem::take(fields))]);
            }
        }
    });
}

/// Pass 3: pad short value lists with explicit `nil` so target and value
/// arity match textually.
fn pad_arity(chunk: &mut Chunk) {
    each_block(&mut chunk.block, &mut |block| {
        for stmt in &mut block.stmts {
            let (targets, exprs) = match stmt {
                Stmt::Local { targets, exprs, .. } => (targets.len(), exprs),
                Stmt::Assign { targets, exprs, .. } => (targets.len(), exprs),
                _ => continue,
            };
            if !exprs.is_empty() {
                while exprs.len() < targets {
                    exprs.push(Expr::Nil);
                }
            }
        }
    });
}

/// Pass 4: materialize default initializers for typed declarations that
/// carry no value list.
fn default_typed_decls(chunk: &mut Chunk) {
    each_block(&mut chunk.block, &mut |block| {
        for stmt in &mut block.stmts {
            let Stmt::Local { targets, exprs, .. } = stmt else {
                continue;
            };
            if exprs.is_empty() && targets.iter().any(|t| t.ty.is_some()) {
                *exprs = targets.iter().map(|t| zero_value(t.ty)).collect();
            }
        }
    });
}

/// The explicit spelling of a type's implicit default.
fn zero_value(ty: Option<TypeName>) -> Expr {
    match ty {
        Some(TypeName::Integer | TypeName::Number) => Expr::Number(NumberLiteral {
            negative: false,
            base: Base::Dec,
            int_digits: "0".to_string(),
            frac_digits: String::new(),
            exponent: None,
        }),
        Some(TypeName::Boolean) => Expr::Bool(false),
        Some(TypeName::Table) => Expr::Table(Vec::new()),
        Some(TypeName::String) => Expr::Str(Vec::new()),
        Some(TypeName::Function | TypeName::Any) | None => Expr::Nil,
    }
}

/// Pass 5: erase static type annotations; the emitted form is untyped.
fn strip_types(chunk: &mut Chunk) {
    each_block(&mut chunk.block, &mut |block| {
        for stmt in &mut block.stmts {
            match stmt {
                Stmt::Local { targets, .. } => {
                    for t in targets {
                        t.ty = None;
                    }
                }
                Stmt::NumericFor { var, .. } => var.ty = None,
                Stmt::GenericFor { names, .. } => {
                    for n in names {
                        n.ty = None;
                    }
                }
                _ => {}
            }
        }
    });
    each_expr(chunk, &mut |e| {
        if let Expr::Function { params, .. } = e {
            for p in params {
                p.ty = None;
            }
        }
    });
}

/// Pass 6: substitute library-call shims for operators the configured
/// version lacks. At or above the threshold the native form survives.
fn lower_operators(chunk: &mut Chunk, config: &Config) {
    if config.has_native_bitops() {
        return;
    }
    each_expr(chunk, &mut |e| {
        let shim = match e {
            Expr::Unary {
                op: UnOp::BNot, ..
            } => Some("bit_bnot"),
            Expr::Binary { op, .. } => match op {
                BinOp::Pow => Some("math_pow"),
                BinOp::IDiv => Some("math_floor"),
                BinOp::BAnd => Some("bit_band"),
                BinOp::BOr => Some("bit_bor"),
                BinOp::BXor => Some("bit_bxor"),
                BinOp::Shl => Some("bit_lshift"),
                BinOp::Shr => Some("bit_rshift"),
                _ => None,
            },
            _ => None,
        };
        let Some(shim) = shim else {
            return;
        };
        let old = std::mem::replace(e, Expr::Nil);
        *e = match old {
            Expr::Unary { expr, .. } => shim_call(shim, vec![*expr]),
            Expr::Binary {
                op: BinOp::IDiv,
                lhs,
                rhs,
            } => shim_call(
                shim,
                vec![Expr::Binary {
                    op: BinOp::Div,
                    lhs,
                    rhs,
                }],
            ),
            Expr::Binary { lhs, rhs, .. } => shim_call(shim, vec![*lhs, *rhs]),
            other => other,
        };
    });
}

fn shim_call(name: &str, args: Vec<Expr>) -> Expr {
    Expr::Call {
        callee: Box::new(Expr::Name(name.to_string())),
        args: CallArgs::List(args),
    }
}
