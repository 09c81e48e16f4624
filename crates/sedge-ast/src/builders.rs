//! Ergonomic constructors for resolved AST nodes.
//!
//! Handy for tests and for tools that synthesize units without a frontend.
//! Statements built here carry the zero span; frontends attach real
//! positions through the serde contract instead.

use crate::node::{
    BinOp, Block, CallArgs, CallConv, Chunk, Expr, ForeignImport, IfArm, MetaArm, Stmt, SwitchArm,
    TableField, TypeName, TypedName, UnOp, VerbatimScope,
};
use crate::number::{Base, NumberLiteral};
use crate::span::Span;

// ============================================================================
// Literals
// ============================================================================

/// Nil literal.
pub fn nil() -> Expr {
    Expr::Nil
}

/// Boolean literal.
pub fn bool_(value: bool) -> Expr {
    Expr::Bool(value)
}

/// Integer literal with decimal digits.
pub fn int(value: i64) -> Expr {
    Expr::Number(NumberLiteral {
        negative: value < 0,
        base: Base::Dec,
        int_digits: value.unsigned_abs().to_string(),
        frac_digits: String::new(),
        exponent: None,
    })
}

/// Number literal from a finite float.
///
/// Panics when `value` is NaN or infinite; those have no literal form.
pub fn num(value: f64) -> Expr {
    assert!(value.is_finite(), "number literal must be finite");
    match format!("{value}").parse() {
        Ok(lit) => Expr::Number(lit),
        Err(_) => unreachable!("formatted finite float always decomposes"),
    }
}

/// Number literal parsed from source text, e.g. `lit("0x1.8p1")`.
///
/// Panics on malformed text; parse a [`NumberLiteral`] directly to handle
/// errors.
pub fn lit(text: &str) -> Expr {
    match text.parse() {
        Ok(lit) => Expr::Number(lit),
        Err(e) => panic!("bad number literal {text:?}: {e}"),
    }
}

/// String literal from UTF-8 text.
pub fn str_(value: &str) -> Expr {
    Expr::Str(value.as_bytes().to_vec())
}

/// String literal from raw bytes.
pub fn bytes(value: impl Into<Vec<u8>>) -> Expr {
    Expr::Str(value.into())
}

/// `...`
pub fn varargs() -> Expr {
    Expr::Varargs
}

// ============================================================================
// Names and access
// ============================================================================

/// Identifier reference.
pub fn name(n: &str) -> Expr {
    Expr::Name(n.to_string())
}

/// `obj[key]`
pub fn index(obj: Expr, key: Expr) -> Expr {
    Expr::Index {
        obj: Box::new(obj),
        key: Box::new(key),
    }
}

/// `obj.field` (string-keyed index).
pub fn dot(obj: Expr, field: &str) -> Expr {
    index(obj, str_(field))
}

/// Name without a type annotation.
pub fn untyped(n: &str) -> TypedName {
    TypedName {
        name: n.to_string(),
        ty: None,
    }
}

/// Name with a static type annotation.
pub fn typed(n: &str, ty: TypeName) -> TypedName {
    TypedName {
        name: n.to_string(),
        ty: Some(ty),
    }
}

// ============================================================================
// Calls
// ============================================================================

/// `callee(args...)`
pub fn call(callee: Expr, args: Vec<Expr>) -> Expr {
    Expr::Call {
        callee: Box::new(callee),
        args: CallArgs::List(args),
    }
}

/// `obj:method(args...)`
pub fn mcall(obj: Expr, method: &str, args: Vec<Expr>) -> Expr {
    Expr::MethodCall {
        obj: Box::new(obj),
        method: method.to_string(),
        args: CallArgs::List(args),
    }
}

// ============================================================================
// Tables and functions
// ============================================================================

/// Table constructor.
pub fn table(fields: Vec<TableField>) -> Expr {
    Expr::Table(fields)
}

/// Positional table item.
pub fn item(value: Expr) -> TableField {
    TableField::Item(value)
}

/// `name = value` table field.
pub fn named(n: &str, value: Expr) -> TableField {
    TableField::Named {
        name: n.to_string(),
        value,
    }
}

/// `[key] = value` table field.
pub fn keyed(key: Expr, value: Expr) -> TableField {
    TableField::Keyed { key, value }
}

/// Function expression with a fixed parameter list.
pub fn func(params: Vec<TypedName>, body: Block) -> Expr {
    Expr::Function {
        params,
        varargs: false,
        body,
    }
}

// ============================================================================
// Operators
// ============================================================================

/// Binary operator application.
pub fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

/// Unary operator application.
pub fn unary(op: UnOp, expr: Expr) -> Expr {
    Expr::Unary {
        op,
        expr: Box::new(expr),
    }
}

// ============================================================================
// Statements
// ============================================================================

/// `local targets = exprs`
pub fn local_(targets: Vec<TypedName>, exprs: Vec<Expr>) -> Stmt {
    Stmt::Local {
        targets,
        exprs,
        span: Span::default(),
    }
}

/// `targets = exprs`
pub fn assign(targets: Vec<Expr>, exprs: Vec<Expr>) -> Stmt {
    Stmt::Assign {
        targets,
        exprs,
        span: Span::default(),
    }
}

/// Call in statement position.
pub fn call_stmt(call: Expr) -> Stmt {
    Stmt::Call {
        call,
        span: Span::default(),
    }
}

/// `do body end`
pub fn do_(body: Block) -> Stmt {
    Stmt::Do {
        body,
        span: Span::default(),
    }
}

/// `if`/`elseif` chain with an optional `else`.
pub fn if_(arms: Vec<IfArm>, else_body: Option<Block>) -> Stmt {
    Stmt::If {
        arms,
        else_body,
        span: Span::default(),
    }
}

/// One `if`/`elseif` arm.
pub fn arm(cond: Expr, body: Block) -> IfArm {
    IfArm { cond, body }
}

/// Switch statement.
pub fn switch(expr: Expr, arms: Vec<SwitchArm>, else_body: Option<Block>) -> Stmt {
    Stmt::Switch {
        expr,
        arms,
        else_body,
        span: Span::default(),
    }
}

/// One `case value then body` arm.
pub fn case(value: Expr, body: Block) -> SwitchArm {
    SwitchArm { value, body }
}

/// `while cond do body end`
pub fn while_(cond: Expr, body: Block) -> Stmt {
    Stmt::While {
        cond,
        body,
        span: Span::default(),
    }
}

/// `repeat body until cond`
pub fn repeat(body: Block, cond: Expr) -> Stmt {
    Stmt::Repeat {
        body,
        cond,
        span: Span::default(),
    }
}

/// Numeric for loop.
pub fn for_num(var: TypedName, start: Expr, end: Expr, step: Option<Expr>, body: Block) -> Stmt {
    Stmt::NumericFor {
        var,
        start,
        end,
        step,
        body,
        span: Span::default(),
    }
}

/// Generic for loop.
pub fn for_in(names: Vec<TypedName>, exprs: Vec<Expr>, body: Block) -> Stmt {
    Stmt::GenericFor {
        names,
        exprs,
        body,
        span: Span::default(),
    }
}

/// `goto label`
pub fn goto(label: &str) -> Stmt {
    Stmt::Goto {
        label: label.to_string(),
        span: Span::default(),
    }
}

/// `::name::`
pub fn label(n: &str) -> Stmt {
    Stmt::Label {
        name: n.to_string(),
        span: Span::default(),
    }
}

/// `break`
pub fn break_() -> Stmt {
    Stmt::Break {
        span: Span::default(),
    }
}

/// `return exprs...`
pub fn ret(exprs: Vec<Expr>) -> Stmt {
    Stmt::Return {
        exprs,
        span: Span::default(),
    }
}

// ============================================================================
// Meta and foreign
// ============================================================================

/// Compile-time directive block.
pub fn meta(payload: &str) -> Stmt {
    Stmt::MetaBlock {
        payload: payload.to_string(),
        span: Span::default(),
    }
}

/// Compile-time branch selection.
pub fn meta_if(arms: Vec<MetaArm>, else_body: Option<Block>) -> Stmt {
    Stmt::MetaIf {
        arms,
        else_body,
        span: Span::default(),
    }
}

/// One compile-time arm; `cond` is directive expression text.
pub fn meta_arm(cond: &str, body: Block) -> MetaArm {
    MetaArm {
        cond: cond.to_string(),
        body,
    }
}

/// Foreign symbol binding with the C convention and no prototype.
pub fn foreign(name: &str, symbol: &str) -> Stmt {
    Stmt::ForeignImport(ForeignImport {
        name: name.to_string(),
        symbol: symbol.to_string(),
        header: None,
        convention: CallConv::C,
        cdecl: None,
        span: Span::default(),
    })
}

/// Raw target text.
pub fn verbatim(text: &str, scope: VerbatimScope) -> Stmt {
    Stmt::Verbatim {
        text: text.to_string(),
        scope,
        span: Span::default(),
    }
}

// ============================================================================
// Unit
// ============================================================================

/// Statement sequence.
pub fn block(stmts: Vec<Stmt>) -> Block {
    Block::new(stmts)
}

/// Compilation unit.
pub fn chunk(stmts: Vec<Stmt>) -> Chunk {
    Chunk::new(Block::new(stmts))
}
