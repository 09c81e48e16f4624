//! Resolved AST node shapes delivered by the frontend.
//!
//! These are post-semantic-analysis trees: names are plain strings the
//! analyzer already resolved, overloads are gone, and every node is owned by
//! exactly one parent. The whole family is serde-serializable so frontends
//! can deliver units as JSON.

use serde::{Deserialize, Serialize};

use crate::number::NumberLiteral;
use crate::span::Span;

/// A compilation unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub block: Block,
}

impl Chunk {
    pub fn new(block: Block) -> Self {
        Chunk { block }
    }
}

/// A statement sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>) -> Self {
        Block { stmts }
    }

    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }
}

/// Statements. Each carries the source position of its first token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    /// `local a: T, b = e1, e2`
    Local {
        targets: Vec<TypedName>,
        exprs: Vec<Expr>,
        span: Span,
    },
    /// `a, t.k = e1, e2`
    Assign {
        targets: Vec<Expr>,
        exprs: Vec<Expr>,
        span: Span,
    },
    /// A call or method call in statement position.
    Call { call: Expr, span: Span },
    /// `do ... end`
    Do { body: Block, span: Span },
    If {
        arms: Vec<IfArm>,
        else_body: Option<Block>,
        span: Span,
    },
    /// Multiway equality dispatch; desugared before emission.
    Switch {
        expr: Expr,
        arms: Vec<SwitchArm>,
        else_body: Option<Block>,
        span: Span,
    },
    While {
        cond: Expr,
        body: Block,
        span: Span,
    },
    /// `repeat ... until cond`
    Repeat {
        body: Block,
        cond: Expr,
        span: Span,
    },
    NumericFor {
        var: TypedName,
        start: Expr,
        end: Expr,
        step: Option<Expr>,
        body: Block,
        span: Span,
    },
    GenericFor {
        names: Vec<TypedName>,
        exprs: Vec<Expr>,
        body: Block,
        span: Span,
    },
    Goto { label: String, span: Span },
    Label { name: String, span: Span },
    Break { span: Span },
    Return { exprs: Vec<Expr>, span: Span },
    /// Binding of a native symbol; resolved by the backend bridge.
    ForeignImport(ForeignImport),
    /// Compile-time directive script, run during expansion.
    MetaBlock { payload: String, span: Span },
    /// Compile-time branch selection; exactly one arm survives expansion.
    MetaIf {
        arms: Vec<MetaArm>,
        else_body: Option<Block>,
        span: Span,
    },
    /// Raw target text injected by a directive.
    Verbatim {
        text: String,
        scope: VerbatimScope,
        span: Span,
    },
}

impl Stmt {
    /// Source position of the statement.
    pub fn span(&self) -> Span {
        match self {
            Stmt::Local { span, .. }
            | Stmt::Assign { span, .. }
            | Stmt::Call { span, .. }
            | Stmt::Do { span, .. }
            | Stmt::If { span, .. }
            | Stmt::Switch { span, .. }
            | Stmt::While { span, .. }
            | Stmt::Repeat { span, .. }
            | Stmt::NumericFor { span, .. }
            | Stmt::GenericFor { span, .. }
            | Stmt::Goto { span, .. }
            | Stmt::Label { span, .. }
            | Stmt::Break { span }
            | Stmt::Return { span, .. }
            | Stmt::MetaBlock { span, .. }
            | Stmt::MetaIf { span, .. }
            | Stmt::Verbatim { span, .. } => *span,
            Stmt::ForeignImport(fi) => fi.span,
        }
    }
}

/// One `if`/`elseif` arm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfArm {
    pub cond: Expr,
    pub body: Block,
}

/// One `case C then ...` arm of a switch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchArm {
    pub value: Expr,
    pub body: Block,
}

/// One arm of a compile-time branch selection. The condition is a directive
/// expression evaluated by the meta engine, not a target expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaArm {
    pub cond: String,
    pub body: Block,
}

/// Where verbatim text lands in the emitted unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerbatimScope {
    /// Hoisted to the unit preamble.
    Declaration,
    /// Emitted in place.
    Statement,
}

/// A foreign symbol binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignImport {
    /// Local name the unit binds the symbol to.
    pub name: String,
    /// Native symbol name.
    pub symbol: String,
    /// Header or module the symbol comes from, when known.
    pub header: Option<String>,
    pub convention: CallConv,
    /// C prototype text supplied by the semantic analyzer.
    pub cdecl: Option<String>,
    pub span: Span,
}

/// Calling convention of a foreign symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallConv {
    C,
    Stdcall,
    Fastcall,
}

/// Expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Nil,
    Bool(bool),
    Number(NumberLiteral),
    /// Exact byte content, straight from the frontend. No encoding applied.
    Str(Vec<u8>),
    /// `...`
    Varargs,
    Name(String),
    /// `obj[key]`
    Index { obj: Box<Expr>, key: Box<Expr> },
    Call { callee: Box<Expr>, args: CallArgs },
    /// `obj:method(args)`
    MethodCall {
        obj: Box<Expr>,
        method: String,
        args: CallArgs,
    },
    Table(Vec<TableField>),
    Function {
        params: Vec<TypedName>,
        varargs: bool,
        body: Block,
    },
    Unary { op: UnOp, expr: Box<Expr> },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

/// Argument shapes of a call site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CallArgs {
    /// Explicit parenthesized list.
    List(Vec<Expr>),
    /// Sugar: a lone string literal without parentheses.
    Str(Vec<u8>),
    /// Sugar: a lone table constructor without parentheses.
    Table(Vec<TableField>),
}

/// One entry of a table constructor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TableField {
    /// Positional item.
    Item(Expr),
    /// `name = value`
    Named { name: String, value: Expr },
    /// `[key] = value`
    Keyed { key: Expr, value: Expr },
}

/// A name with an optional static type annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedName {
    pub name: String,
    pub ty: Option<TypeName>,
}

/// Static types the frontend annotates declarations and parameters with.
/// All annotations are erased before emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeName {
    Integer,
    Number,
    Boolean,
    String,
    Table,
    Function,
    Any,
}

/// Binary operators of the source dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    IDiv,
    Mod,
    Pow,
    Concat,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    BAnd,
    BOr,
    BXor,
    Shl,
    Shr,
}

/// Unary operators of the source dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnOp {
    Neg,
    Not,
    Len,
    BNot,
}
