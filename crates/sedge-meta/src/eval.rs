//! Tree-walking evaluator for directive scripts.
//!
//! The evaluator never touches an output buffer. Everything a directive does
//! to the unit comes back as an [`Effect`] for the expansion driver to apply,
//! so the ordering of injected text relative to ordinary emission stays in
//! one auditable place. Configuration writes are the one immediate side
//! effect: they land on the session as soon as they execute, because later
//! directives and passes must observe them.

use tracing::{debug, warn};

use crate::env::{Env, FrameId};
use crate::error::MetaError;
use crate::script::{self, BinOp, ScriptExpr, ScriptStmt, UnOp};
use crate::session::Session;
use crate::value::Value;

/// One requested change to the unit, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Verbatim text at the directive's statement position.
    EmitStmt(String),
    /// Verbatim text hoisted to the unit preamble.
    EmitDecl(String),
    /// A dependency to `require` once per unit.
    Include(String),
}

/// Evaluation steps one unit's directives may spend before the engine calls
/// the script runaway. Compilation must terminate; an unconditional `while`
/// interpreter cannot promise that on its own.
const FUEL: u32 = 100_000;

pub(crate) struct Evaluator<'a> {
    session: &'a mut Session,
    fuel: u32,
}

impl<'a> Evaluator<'a> {
    pub(crate) fn new(session: &'a mut Session) -> Self {
        Evaluator {
            session,
            fuel: FUEL,
        }
    }

    /// Run a full directive payload and collect its effects.
    pub(crate) fn run_script(&mut self, src: &str) -> Result<Vec<Effect>, MetaError> {
        let stmts = script::parse_script(src)?;
        let mut env = Env::new();
        let mut effects = Vec::new();
        self.exec_block(&stmts, &mut env, Env::ROOT, &mut effects)?;
        Ok(effects)
    }

    /// Evaluate a branch predicate. Anything but a boolean is a type error:
    /// truthiness would silently select branches on typos.
    pub(crate) fn eval_predicate(&mut self, src: &str) -> Result<bool, MetaError> {
        let expr = script::parse_predicate(src)?;
        let mut env = Env::new();
        let mut effects = Vec::new();
        match self.eval(&expr, &mut env, Env::ROOT, &mut effects)? {
            Value::Bool(b) => Ok(b),
            other => Err(MetaError::InvalidPredicate(other.type_name())),
        }
    }

    fn spend(&mut self) -> Result<(), MetaError> {
        if self.fuel == 0 {
            return Err(MetaError::BudgetExhausted);
        }
        self.fuel -= 1;
        Ok(())
    }

    fn exec_block(
        &mut self,
        stmts: &[ScriptStmt],
        env: &mut Env,
        frame: FrameId,
        effects: &mut Vec<Effect>,
    ) -> Result<(), MetaError> {
        for stmt in stmts {
            self.exec(stmt, env, frame, effects)?;
        }
        Ok(())
    }

    fn exec(
        &mut self,
        stmt: &ScriptStmt,
        env: &mut Env,
        frame: FrameId,
        effects: &mut Vec<Effect>,
    ) -> Result<(), MetaError> {
        self.spend()?;
        match stmt {
            ScriptStmt::Local { name, value } => {
                let value = self.eval(value, env, frame, effects)?;
                env.define(frame, name, value);
                Ok(())
            }
            ScriptStmt::Assign { path, value } => {
                let value = self.eval(value, env, frame, effects)?;
                self.write_path(path, value, env, frame)
            }
            ScriptStmt::If { arms, else_body } => {
                for (cond, body) in arms {
                    if self.eval(cond, env, frame, effects)?.truthy() {
                        let inner = env.push(frame);
                        return self.exec_block(body, env, inner, effects);
                    }
                }
                let inner = env.push(frame);
                self.exec_block(else_body, env, inner, effects)
            }
            ScriptStmt::While { cond, body } => {
                while self.eval(cond, env, frame, effects)?.truthy() {
                    self.spend()?;
                    let inner = env.push(frame);
                    self.exec_block(body, env, inner, effects)?;
                }
                Ok(())
            }
            ScriptStmt::Call { name, args } => {
                let args = self.eval_args(args, env, frame, effects)?;
                self.intrinsic(name, args, effects).map(drop)
            }
        }
    }

    fn eval(
        &mut self,
        expr: &ScriptExpr,
        env: &mut Env,
        frame: FrameId,
        effects: &mut Vec<Effect>,
    ) -> Result<Value, MetaError> {
        self.spend()?;
        match expr {
            ScriptExpr::Nil => Ok(Value::Nil),
            ScriptExpr::Bool(b) => Ok(Value::Bool(*b)),
            ScriptExpr::Num(n) => Ok(Value::Num(*n)),
            ScriptExpr::Str(s) => Ok(Value::Str(s.clone())),
            ScriptExpr::Path(path) => self.read_path(path, env, frame),
            ScriptExpr::Call { name, args } => {
                let args = self.eval_args(args, env, frame, effects)?;
                self.intrinsic(name, args, effects)
            }
            ScriptExpr::Unary { op, expr } => {
                let v = self.eval(expr, env, frame, effects)?;
                match op {
                    UnOp::Not => Ok(Value::Bool(!v.truthy())),
                    UnOp::Neg => match v {
                        Value::Num(n) => Ok(Value::Num(-n)),
                        other => Err(MetaError::Type(format!(
                            "cannot negate a {}",
                            other.type_name()
                        ))),
                    },
                }
            }
            ScriptExpr::Binary { op, lhs, rhs } => {
                // and/or short-circuit and yield operands, as in the target.
                match op {
                    BinOp::And => {
                        let l = self.eval(lhs, env, frame, effects)?;
                        if l.truthy() {
                            self.eval(rhs, env, frame, effects)
                        } else {
                            Ok(l)
                        }
                    }
                    BinOp::Or => {
                        let l = self.eval(lhs, env, frame, effects)?;
                        if l.truthy() {
                            Ok(l)
                        } else {
                            self.eval(rhs, env, frame, effects)
                        }
                    }
                    _ => {
                        let l = self.eval(lhs, env, frame, effects)?;
                        let r = self.eval(rhs, env, frame, effects)?;
                        binary(*op, l, r)
                    }
                }
            }
        }
    }

    fn eval_args(
        &mut self,
        args: &[ScriptExpr],
        env: &mut Env,
        frame: FrameId,
        effects: &mut Vec<Effect>,
    ) -> Result<Vec<Value>, MetaError> {
        args.iter()
            .map(|a| self.eval(a, env, frame, effects))
            .collect()
    }

    fn read_path(&self, path: &[String], env: &Env, frame: FrameId) -> Result<Value, MetaError> {
        match path {
            [name] => {
                if let Some(v) = env.lookup(frame, name) {
                    return Ok(v.clone());
                }
                if let Some(v) = self.session.global(name) {
                    return Ok(v.clone());
                }
                Err(MetaError::UndefinedVariable(name.clone()))
            }
            [head, field] if head == "target" => match field.as_str() {
                "version" => Ok(Value::Str(self.session.config().target_version.to_string())),
                "backend" => Ok(Value::Str(self.session.config().target_backend.to_string())),
                _ => Err(MetaError::UnknownField(format!("target.{field}"))),
            },
            [head, name] if head == "flags" => Ok(Value::Bool(self.session.config().flag(name))),
            _ => Err(MetaError::UnknownField(path.join("."))),
        }
    }

    fn write_path(
        &mut self,
        path: &[String],
        value: Value,
        env: &mut Env,
        frame: FrameId,
    ) -> Result<(), MetaError> {
        match path {
            [name] => {
                if !env.assign(frame, name, value.clone()) {
                    self.session.set_global(name.clone(), value);
                }
                Ok(())
            }
            [head, field] if head == "target" => {
                let Value::Str(text) = value else {
                    return Err(MetaError::Type(format!(
                        "target.{field} expects a string, got {}",
                        value.type_name()
                    )));
                };
                match field.as_str() {
                    "version" => self.session.config_mut().target_version = text.parse()?,
                    "backend" => self.session.config_mut().target_backend = text.parse()?,
                    _ => return Err(MetaError::UnknownField(format!("target.{field}"))),
                }
                debug!(field, value = %text, "directive reconfigured target");
                self.session.config().validate().map_err(MetaError::from)
            }
            [head, name] if head == "flags" => {
                let Value::Bool(b) = value else {
                    return Err(MetaError::Type(format!(
                        "flags.{name} expects a boolean, got {}",
                        value.type_name()
                    )));
                };
                self.session.config_mut().flags.insert(name.clone(), b);
                Ok(())
            }
            _ => Err(MetaError::UnknownField(path.join("."))),
        }
    }

    fn intrinsic(
        &mut self,
        name: &str,
        args: Vec<Value>,
        effects: &mut Vec<Effect>,
    ) -> Result<Value, MetaError> {
        match name {
            "emit" => {
                let text = one_string(name, args)?;
                effects.push(Effect::EmitStmt(text));
                Ok(Value::Nil)
            }
            "emit_decl" => {
                let text = one_string(name, args)?;
                effects.push(Effect::EmitDecl(text));
                Ok(Value::Nil)
            }
            "include" => {
                let dep = one_string(name, args)?;
                effects.push(Effect::Include(dep));
                Ok(Value::Nil)
            }
            "version_at_least" => {
                let text = one_string(name, args)?;
                let version = text.parse()?;
                Ok(Value::Bool(self.session.config().target_version >= version))
            }
            "flag" => {
                let flag = one_string(name, args)?;
                Ok(Value::Bool(self.session.config().flag(&flag)))
            }
            "warn" => {
                let [v] = one(name, args)?;
                warn!("directive: {v}");
                Ok(Value::Nil)
            }
            "error" => {
                let [v] = one(name, args)?;
                Err(MetaError::Raised(v.to_string()))
            }
            _ => Err(MetaError::UnknownIntrinsic(name.to_string())),
        }
    }
}

fn one(name: &str, args: Vec<Value>) -> Result<[Value; 1], MetaError> {
    let got = args.len();
    <[Value; 1]>::try_from(args).map_err(|_| MetaError::Arity {
        name: name.to_string(),
        expected: 1,
        got,
    })
}

fn one_string(name: &str, args: Vec<Value>) -> Result<String, MetaError> {
    let [v] = one(name, args)?;
    match v {
        Value::Str(s) => Ok(s),
        other => Err(MetaError::Type(format!(
            "{name} expects a string, got {}",
            other.type_name()
        ))),
    }
}

fn binary(op: BinOp, l: Value, r: Value) -> Result<Value, MetaError> {
    match op {
        // Equality never errors, matching the target semantics.
        BinOp::Eq => Ok(Value::Bool(l == r)),
        BinOp::Ne => Ok(Value::Bool(l != r)),
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => compare(op, l, r),
        BinOp::Concat => match (l, r) {
            (l @ (Value::Str(_) | Value::Num(_)), r @ (Value::Str(_) | Value::Num(_))) => {
                Ok(Value::Str(format!("{l}{r}")))
            }
            (l, r) => Err(MetaError::Type(format!(
                "cannot concatenate {} and {}",
                l.type_name(),
                r.type_name()
            ))),
        },
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => {
            let (Value::Num(a), Value::Num(b)) = (&l, &r) else {
                return Err(MetaError::Type(format!(
                    "cannot apply arithmetic to {} and {}",
                    l.type_name(),
                    r.type_name()
                )));
            };
            let n = match op {
                BinOp::Add => a + b,
                BinOp::Sub => a - b,
                BinOp::Mul => a * b,
                BinOp::Div => a / b,
                // Floored modulo, as in the target.
                BinOp::Mod => a - (a / b).floor() * b,
                _ => unreachable!(),
            };
            Ok(Value::Num(n))
        }
        BinOp::And | BinOp::Or => unreachable!("short-circuit ops handled by eval"),
    }
}

fn compare(op: BinOp, l: Value, r: Value) -> Result<Value, MetaError> {
    let ordering = match (&l, &r) {
        (Value::Num(a), Value::Num(b)) => a.partial_cmp(b),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => {
            return Err(MetaError::Type(format!(
                "cannot compare {} with {}",
                l.type_name(),
                r.type_name()
            )));
        }
    };
    let Some(ordering) = ordering else {
        // NaN compares false everywhere.
        return Ok(Value::Bool(false));
    };
    let b = match op {
        BinOp::Lt => ordering.is_lt(),
        BinOp::Le => ordering.is_le(),
        BinOp::Gt => ordering.is_gt(),
        BinOp::Ge => ordering.is_ge(),
        _ => unreachable!(),
    };
    Ok(Value::Bool(b))
}
