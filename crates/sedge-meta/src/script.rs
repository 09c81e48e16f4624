//! Lexer and parser for the directive language.
//!
//! Directives are a Lua-flavored scripting subset: `local` bindings, dotted
//! assignments into the configuration, `if`/`while` control flow, and
//! intrinsic calls. Payloads are short, so the lexer works over a char
//! vector and the parser is plain recursive descent with precedence
//! climbing.

use std::fmt;

use crate::error::MetaError;

// ============================================================================
// Tokens
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokKind {
    Name(String),
    Num(f64),
    Str(String),
    KwLocal,
    KwIf,
    KwThen,
    KwElseif,
    KwElse,
    KwEnd,
    KwWhile,
    KwDo,
    KwTrue,
    KwFalse,
    KwNil,
    KwAnd,
    KwOr,
    KwNot,
    Assign,
    EqEq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Concat,
    LParen,
    RParen,
    Comma,
    Dot,
    Eof,
}

impl fmt::Display for TokKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokKind::Name(n) => write!(f, "name {n:?}"),
            TokKind::Num(n) => write!(f, "number {n}"),
            TokKind::Str(_) => write!(f, "string"),
            TokKind::KwLocal => write!(f, "`local`"),
            TokKind::KwIf => write!(f, "`if`"),
            TokKind::KwThen => write!(f, "`then`"),
            TokKind::KwElseif => write!(f, "`elseif`"),
            TokKind::KwElse => write!(f, "`else`"),
            TokKind::KwEnd => write!(f, "`end`"),
            TokKind::KwWhile => write!(f, "`while`"),
            TokKind::KwDo => write!(f, "`do`"),
            TokKind::KwTrue => write!(f, "`true`"),
            TokKind::KwFalse => write!(f, "`false`"),
            TokKind::KwNil => write!(f, "`nil`"),
            TokKind::KwAnd => write!(f, "`and`"),
            TokKind::KwOr => write!(f, "`or`"),
            TokKind::KwNot => write!(f, "`not`"),
            TokKind::Assign => write!(f, "`=`"),
            TokKind::EqEq => write!(f, "`==`"),
            TokKind::Ne => write!(f, "`~=`"),
            TokKind::Lt => write!(f, "`<`"),
            TokKind::Le => write!(f, "`<=`"),
            TokKind::Gt => write!(f, "`>`"),
            TokKind::Ge => write!(f, "`>=`"),
            TokKind::Plus => write!(f, "`+`"),
            TokKind::Minus => write!(f, "`-`"),
            TokKind::Star => write!(f, "`*`"),
            TokKind::Slash => write!(f, "`/`"),
            TokKind::Percent => write!(f, "`%`"),
            TokKind::Concat => write!(f, "`..`"),
            TokKind::LParen => write!(f, "`(`"),
            TokKind::RParen => write!(f, "`)`"),
            TokKind::Comma => write!(f, "`,`"),
            TokKind::Dot => write!(f, "`.`"),
            TokKind::Eof => write!(f, "end of directive"),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Token {
    pub kind: TokKind,
    pub line: u32,
    pub col: u32,
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    col: u32,
}

impl Lexer {
    fn new(src: &str) -> Self {
        Lexer {
            chars: src.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek2(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn error(&self, line: u32, col: u32, message: impl Into<String>) -> MetaError {
        MetaError::Parse {
            line,
            col,
            message: message.into(),
        }
    }

    fn lex(mut self) -> Result<Vec<Token>, MetaError> {
        let mut toks = Vec::new();
        while let Some(c) = self.peek() {
            let (line, col) = (self.line, self.col);
            if c.is_whitespace() {
                self.bump();
                continue;
            }
            if c == '-' && self.peek2() == Some('-') {
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.bump();
                }
                continue;
            }
            let kind = match c {
                '0'..='9' => self.number(line, col)?,
                '"' | '\'' => self.string(line, col)?,
                _ if c.is_ascii_alphabetic() || c == '_' => self.name(),
                '.' => {
                    self.bump();
                    if self.peek() == Some('.') {
                        self.bump();
                        TokKind::Concat
                    } else {
                        TokKind::Dot
                    }
                }
                '=' => {
                    self.bump();
                    if self.peek() == Some('=') {
                        self.bump();
                        TokKind::EqEq
                    } else {
                        TokKind::Assign
                    }
                }
                '~' => {
                    self.bump();
                    if self.peek() == Some('=') {
                        self.bump();
                        TokKind::Ne
                    } else {
                        return Err(self.error(line, col, "unexpected character '~'"));
                    }
                }
                '<' => {
                    self.bump();
                    if self.peek() == Some('=') {
                        self.bump();
                        TokKind::Le
                    } else {
                        TokKind::Lt
                    }
                }
                '>' => {
                    self.bump();
                    if self.peek() == Some('=') {
                        self.bump();
                        TokKind::Ge
                    } else {
                        TokKind::Gt
                    }
                }
                '+' => {
                    self.bump();
                    TokKind::Plus
                }
                '-' => {
                    self.bump();
                    TokKind::Minus
                }
                '*' => {
                    self.bump();
                    TokKind::Star
                }
                '/' => {
                    self.bump();
                    TokKind::Slash
                }
                '%' => {
                    self.bump();
                    TokKind::Percent
                }
                '(' => {
                    self.bump();
                    TokKind::LParen
                }
                ')' => {
                    self.bump();
                    TokKind::RParen
                }
                ',' => {
                    self.bump();
                    TokKind::Comma
                }
                _ => {
                    return Err(self.error(line, col, format!("unexpected character {c:?}")));
                }
            };
            toks.push(Token { kind, line, col });
        }
        toks.push(Token {
            kind: TokKind::Eof,
            line: self.line,
            col: self.col,
        });
        Ok(toks)
    }

    fn number(&mut self, line: u32, col: u32) -> Result<TokKind, MetaError> {
        let mut text = String::new();
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            text.push(self.bump().unwrap_or('0'));
        }
        // A dot only continues the number when a digit follows, so `1 ..`
        // and `1..` both lex as a number and a concat.
        if self.peek() == Some('.') && self.peek2().is_some_and(|c| c.is_ascii_digit()) {
            text.push(self.bump().unwrap_or('.'));
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                text.push(self.bump().unwrap_or('0'));
            }
        }
        if self.peek() == Some('e') || self.peek() == Some('E') {
            let next = self.peek2();
            let signed = matches!(next, Some('+') | Some('-'));
            let exp_digit = if signed {
                self.chars.get(self.pos + 2).copied()
            } else {
                next
            };
            if exp_digit.is_some_and(|c| c.is_ascii_digit()) {
                text.push('e');
                self.bump();
                if signed {
                    text.push(self.bump().unwrap_or('+'));
                }
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    text.push(self.bump().unwrap_or('0'));
                }
            }
        }
        match text.parse::<f64>() {
            Ok(n) => Ok(TokKind::Num(n)),
            Err(_) => Err(self.error(line, col, format!("malformed number {text:?}"))),
        }
    }

    fn string(&mut self, line: u32, col: u32) -> Result<TokKind, MetaError> {
        let quote = self.bump().unwrap_or('"');
        let mut text = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error(line, col, "unterminated string")),
                Some('\n') => return Err(self.error(line, col, "unterminated string")),
                Some(c) if c == quote => break,
                Some('\\') => match self.bump() {
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some('r') => text.push('\r'),
                    Some('\\') => text.push('\\'),
                    Some('"') => text.push('"'),
                    Some('\'') => text.push('\''),
                    other => {
                        let what = other.map_or("end of directive".to_string(), |c| {
                            format!("{c:?}")
                        });
                        return Err(self.error(
                            self.line,
                            self.col,
                            format!("unknown escape {what}"),
                        ));
                    }
                },
                Some(c) => text.push(c),
            }
        }
        Ok(TokKind::Str(text))
    }

    fn name(&mut self) -> TokKind {
        let mut text = String::new();
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            text.push(self.bump().unwrap_or('_'));
        }
        match text.as_str() {
            "local" => TokKind::KwLocal,
            "if" => TokKind::KwIf,
            "then" => TokKind::KwThen,
            "elseif" => TokKind::KwElseif,
            "else" => TokKind::KwElse,
            "end" => TokKind::KwEnd,
            "while" => TokKind::KwWhile,
            "do" => TokKind::KwDo,
            "true" => TokKind::KwTrue,
            "false" => TokKind::KwFalse,
            "nil" => TokKind::KwNil,
            "and" => TokKind::KwAnd,
            "or" => TokKind::KwOr,
            "not" => TokKind::KwNot,
            _ => TokKind::Name(text),
        }
    }
}

// ============================================================================
// Script AST
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ScriptStmt {
    Local { name: String, value: ScriptExpr },
    /// Assignment through a (possibly dotted) path.
    Assign { path: Vec<String>, value: ScriptExpr },
    If {
        arms: Vec<(ScriptExpr, Vec<ScriptStmt>)>,
        else_body: Vec<ScriptStmt>,
    },
    While {
        cond: ScriptExpr,
        body: Vec<ScriptStmt>,
    },
    Call { name: String, args: Vec<ScriptExpr> },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ScriptExpr {
    Nil,
    Bool(bool),
    Num(f64),
    Str(String),
    Path(Vec<String>),
    Call { name: String, args: Vec<ScriptExpr> },
    Unary {
        op: UnOp,
        expr: Box<ScriptExpr>,
    },
    Binary {
        op: BinOp,
        lhs: Box<ScriptExpr>,
        rhs: Box<ScriptExpr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Concat,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnOp {
    Not,
    Neg,
}

// ============================================================================
// Parser
// ============================================================================

/// Parse a full directive payload.
pub(crate) fn parse_script(src: &str) -> Result<Vec<ScriptStmt>, MetaError> {
    let mut p = Parser::new(src)?;
    let stmts = p.block()?;
    p.expect(&TokKind::Eof)?;
    Ok(stmts)
}

/// Parse a branch predicate: a single expression and nothing else.
pub(crate) fn parse_predicate(src: &str) -> Result<ScriptExpr, MetaError> {
    let mut p = Parser::new(src)?;
    let expr = p.expr()?;
    p.expect(&TokKind::Eof)?;
    Ok(expr)
}

struct Parser {
    toks: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(src: &str) -> Result<Self, MetaError> {
        Ok(Parser {
            toks: Lexer::new(src).lex()?,
            pos: 0,
        })
    }

    fn peek(&self) -> &TokKind {
        // The token stream always ends with Eof.
        self.toks
            .get(self.pos)
            .map_or(&TokKind::Eof, |t| &t.kind)
    }

    fn here(&self) -> (u32, u32) {
        self.toks
            .get(self.pos.min(self.toks.len().saturating_sub(1)))
            .map_or((1, 1), |t| (t.line, t.col))
    }

    fn bump(&mut self) -> TokKind {
        let kind = self.peek().clone();
        if self.pos < self.toks.len() {
            self.pos += 1;
        }
        kind
    }

    fn eat(&mut self, kind: &TokKind) -> bool {
        if self.peek() == kind {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokKind) -> Result<(), MetaError> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.error(format!("expected {kind}, found {}", self.peek())))
        }
    }

    fn error(&self, message: String) -> MetaError {
        let (line, col) = self.here();
        MetaError::Parse { line, col, message }
    }

    fn block(&mut self) -> Result<Vec<ScriptStmt>, MetaError> {
        let mut stmts = Vec::new();
        loop {
            match self.peek() {
                TokKind::Eof | TokKind::KwEnd | TokKind::KwElseif | TokKind::KwElse => {
                    return Ok(stmts);
                }
                _ => stmts.push(self.stmt()?),
            }
        }
    }

    fn stmt(&mut self) -> Result<ScriptStmt, MetaError> {
        match self.peek() {
            TokKind::KwLocal => {
                self.bump();
                let name = self.name()?;
                self.expect(&TokKind::Assign)?;
                let value = self.expr()?;
                Ok(ScriptStmt::Local { name, value })
            }
            TokKind::KwIf => {
                self.bump();
                let mut arms = Vec::new();
                let cond = self.expr()?;
                self.expect(&TokKind::KwThen)?;
                arms.push((cond, self.block()?));
                let mut else_body = Vec::new();
                loop {
                    match self.peek() {
                        TokKind::KwElseif => {
                            self.bump();
                            let cond = self.expr()?;
                            self.expect(&TokKind::KwThen)?;
                            arms.push((cond, self.block()?));
                        }
                        TokKind::KwElse => {
                            self.bump();
                            else_body = self.block()?;
                            self.expect(&TokKind::KwEnd)?;
                            break;
                        }
                        _ => {
                            self.expect(&TokKind::KwEnd)?;
                            break;
                        }
                    }
                }
                Ok(ScriptStmt::If { arms, else_body })
            }
            TokKind::KwWhile => {
                self.bump();
                let cond = self.expr()?;
                self.expect(&TokKind::KwDo)?;
                let body = self.block()?;
                self.expect(&TokKind::KwEnd)?;
                Ok(ScriptStmt::While { cond, body })
            }
            TokKind::Name(_) => {
                let path = self.path()?;
                match self.peek() {
                    TokKind::LParen if path.len() == 1 => {
                        let args = self.call_args()?;
                        let name = path.into_iter().next().unwrap_or_default();
                        Ok(ScriptStmt::Call { name, args })
                    }
                    TokKind::Assign => {
                        self.bump();
                        let value = self.expr()?;
                        Ok(ScriptStmt::Assign { path, value })
                    }
                    other => Err(self.error(format!("expected `=` or `(`, found {other}"))),
                }
            }
            other => Err(self.error(format!("expected statement, found {other}"))),
        }
    }

    fn name(&mut self) -> Result<String, MetaError> {
        match self.bump() {
            TokKind::Name(n) => Ok(n),
            other => {
                self.pos = self.pos.saturating_sub(1);
                Err(self.error(format!("expected name, found {other}")))
            }
        }
    }

    fn path(&mut self) -> Result<Vec<String>, MetaError> {
        let mut path = vec![self.name()?];
        while self.eat(&TokKind::Dot) {
            path.push(self.name()?);
        }
        Ok(path)
    }

    fn call_args(&mut self) -> Result<Vec<ScriptExpr>, MetaError> {
        self.expect(&TokKind::LParen)?;
        let mut args = Vec::new();
        if self.eat(&TokKind::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.expr()?);
            if self.eat(&TokKind::Comma) {
                continue;
            }
            self.expect(&TokKind::RParen)?;
            return Ok(args);
        }
    }

    fn expr(&mut self) -> Result<ScriptExpr, MetaError> {
        self.binary(0)
    }

    fn binary(&mut self, min_bp: u8) -> Result<ScriptExpr, MetaError> {
        let mut lhs = self.unary()?;
        loop {
            let Some((op, bp, right_assoc)) = binop_of(self.peek()) else {
                return Ok(lhs);
            };
            if bp < min_bp {
                return Ok(lhs);
            }
            self.bump();
            let next_min = if right_assoc { bp } else { bp + 1 };
            let rhs = self.binary(next_min)?;
            lhs = ScriptExpr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn unary(&mut self) -> Result<ScriptExpr, MetaError> {
        let op = match self.peek() {
            TokKind::KwNot => Some(UnOp::Not),
            TokKind::Minus => Some(UnOp::Neg),
            _ => None,
        };
        if let Some(op) = op {
            self.bump();
            let expr = self.unary()?;
            return Ok(ScriptExpr::Unary {
                op,
                expr: Box::new(expr),
            });
        }
        self.atom()
    }

    fn atom(&mut self) -> Result<ScriptExpr, MetaError> {
        match self.peek().clone() {
            TokKind::KwNil => {
                self.bump();
                Ok(ScriptExpr::Nil)
            }
            TokKind::KwTrue => {
                self.bump();
                Ok(ScriptExpr::Bool(true))
            }
            TokKind::KwFalse => {
                self.bump();
                Ok(ScriptExpr::Bool(false))
            }
            TokKind::Num(n) => {
                self.bump();
                Ok(ScriptExpr::Num(n))
            }
            TokKind::Str(s) => {
                self.bump();
                Ok(ScriptExpr::Str(s))
            }
            TokKind::LParen => {
                self.bump();
                let expr = self.expr()?;
                self.expect(&TokKind::RParen)?;
                Ok(expr)
            }
            TokKind::Name(_) => {
                let path = self.path()?;
                if *self.peek() == TokKind::LParen && path.len() == 1 {
                    let args = self.call_args()?;
                    let name = path.into_iter().next().unwrap_or_default();
                    Ok(ScriptExpr::Call { name, args })
                } else {
                    Ok(ScriptExpr::Path(path))
                }
            }
            other => Err(self.error(format!("expected expression, found {other}"))),
        }
    }
}

fn binop_of(kind: &TokKind) -> Option<(BinOp, u8, bool)> {
    let entry = match kind {
        TokKind::KwOr => (BinOp::Or, 1, false),
        TokKind::KwAnd => (BinOp::And, 2, false),
        TokKind::EqEq => (BinOp::Eq, 3, false),
        TokKind::Ne => (BinOp::Ne, 3, false),
        TokKind::Lt => (BinOp::Lt, 3, false),
        TokKind::Le => (BinOp::Le, 3, false),
        TokKind::Gt => (BinOp::Gt, 3, false),
        TokKind::Ge => (BinOp::Ge, 3, false),
        TokKind::Concat => (BinOp::Concat, 4, true),
        TokKind::Plus => (BinOp::Add, 5, false),
        TokKind::Minus => (BinOp::Sub, 5, false),
        TokKind::Star => (BinOp::Mul, 6, false),
        TokKind::Slash => (BinOp::Div, 6, false),
        TokKind::Percent => (BinOp::Mod, 6, false),
        _ => return None,
    };
    Some(entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lex_symbols_and_comments() {
        let toks = Lexer::new("a = 1 -- trailing\nb ~= 2 .. 'x'").lex().unwrap();
        let kinds: Vec<TokKind> = toks.into_iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokKind::Name("a".to_string()),
                TokKind::Assign,
                TokKind::Num(1.0),
                TokKind::Name("b".to_string()),
                TokKind::Ne,
                TokKind::Num(2.0),
                TokKind::Concat,
                TokKind::Str("x".to_string()),
                TokKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lex_number_then_concat() {
        let toks = Lexer::new("1 .. 2").lex().unwrap();
        let kinds: Vec<TokKind> = toks.into_iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokKind::Num(1.0),
                TokKind::Concat,
                TokKind::Num(2.0),
                TokKind::Eof
            ]
        );
    }

    #[test]
    fn test_lex_number_forms() {
        for (src, want) in [("0", 0.0), ("3.25", 3.25), ("1e2", 100.0), ("2.5e-1", 0.25)] {
            let toks = Lexer::new(src).lex().unwrap();
            assert_eq!(toks[0].kind, TokKind::Num(want), "{src}");
        }
    }

    #[test]
    fn test_lex_error_position() {
        let err = Lexer::new("a = $").lex().unwrap_err();
        assert_eq!(
            err,
            MetaError::Parse {
                line: 1,
                col: 5,
                message: "unexpected character '$'".to_string()
            }
        );
    }

    #[test]
    fn test_parse_local_and_call() {
        let stmts = parse_script("local v = 1 + 2 * 3\nemit(\"x\")").unwrap();
        assert_eq!(stmts.len(), 2);
        let ScriptStmt::Local { name, value } = &stmts[0] else {
            panic!("expected local");
        };
        assert_eq!(name, "v");
        // * binds tighter than +
        let ScriptExpr::Binary { op: BinOp::Add, rhs, .. } = value else {
            panic!("expected addition at the top");
        };
        assert!(matches!(**rhs, ScriptExpr::Binary { op: BinOp::Mul, .. }));
        assert!(matches!(&stmts[1], ScriptStmt::Call { name, .. } if name == "emit"));
    }

    #[test]
    fn test_parse_path_assignment() {
        let stmts = parse_script("target.version = \"5.3\"").unwrap();
        let ScriptStmt::Assign { path, .. } = &stmts[0] else {
            panic!("expected assignment");
        };
        assert_eq!(path, &["target".to_string(), "version".to_string()]);
    }

    #[test]
    fn test_parse_if_chain() {
        let stmts =
            parse_script("if a then emit(\"1\") elseif b then emit(\"2\") else emit(\"3\") end")
                .unwrap();
        let ScriptStmt::If { arms, else_body } = &stmts[0] else {
            panic!("expected if");
        };
        assert_eq!(arms.len(), 2);
        assert_eq!(else_body.len(), 1);
    }

    #[test]
    fn test_concat_is_right_associative() {
        let expr = parse_predicate("\"a\" .. \"b\" .. \"c\"").unwrap();
        let ScriptExpr::Binary { op: BinOp::Concat, lhs, .. } = expr else {
            panic!("expected concat");
        };
        assert!(matches!(*lhs, ScriptExpr::Str(_)));
    }

    #[test]
    fn test_predicate_rejects_trailing_tokens() {
        let err = parse_predicate("true false").unwrap_err();
        assert!(matches!(err, MetaError::Parse { .. }));
    }

    #[test]
    fn test_parse_error_messages() {
        let err = parse_script("if true emit(\"x\") end").unwrap_err();
        let MetaError::Parse { message, .. } = err else {
            panic!("expected parse error");
        };
        assert!(message.contains("`then`"), "{message}");
    }
}
