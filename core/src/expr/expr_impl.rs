use std::fmt::{self, Display};
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::op::{BinOp, UnaryOp};
use crate::rt::Context;
use crate::rt::error::ErrorKind;
use crate::stmt::Stmt;
use crate::val::{FunctionValue, TableKey, TableValue, Val};

/// Expression grammar (abridged):
/// expr     ::= or
/// or       ::= and {'or' and}
/// and      ::= cmp {'and' cmp}
/// cmp      ::= concat {('==' | '~=' | '<' | '<=' | '>' | '>=') concat}
/// concat   ::= addsub ['..' concat]            (right-associative)
/// addsub   ::= muldiv {('+' | '-') muldiv}
/// muldiv   ::= unary {('*' | '/' | '%') unary}
/// unary    ::= ('not' | '-') unary | suffixed
/// suffixed ::= primary { '.' Name | '[' expr ']' | call | ':' Name call | ':' Name }
/// primary  ::= nil | true | false | Int | Float | Str | Name | '(' expr ')'
///            | table | 'function' '(' params ')' block 'end'
///
/// The trailing `':' Name` suffix (no call syntax after it) is the method
/// reference form; it requires the operand to be a bare Name and it ends the
/// suffix chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Nil,
    True,
    False,
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    Var(String),
    Paren(Box<Expr>),
    Table(Vec<TableItem>),
    Function {
        params: Vec<String>,
        body: Arc<Vec<Stmt>>,
        line: u32,
    },
    Bin(Box<Expr>, BinOp, Box<Expr>),
    Unary(UnaryOp, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    /// expr.name
    Access(Box<Expr>, Arc<str>),
    /// expr[key]
    Index(Box<Expr>, Box<Expr>),
    /// callee(args) — also the `f "s"` and `f {..}` sugar forms
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        line: u32,
    },
    /// object:method(args)
    MethodCall {
        object: Box<Expr>,
        method: Arc<str>,
        args: Vec<Expr>,
        line: u32,
    },
    /// object:method used as a value: evaluates to a bound-method closure.
    /// Both operands are restricted to bare identifiers.
    MethodRef {
        object: String,
        method: Arc<str>,
        line: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TableItem {
    /// Appended at the next array index (1-based).
    Positional(Expr),
    /// name = expr
    Named(Arc<str>, Expr),
    /// [key] = expr
    Keyed(Expr, Expr),
}

impl Expr {
    pub fn eval_with_ctx(&self, ctx: &mut Context) -> Result<Val> {
        match self {
            Expr::Nil => Ok(Val::Nil),
            Expr::True => Ok(Val::Bool(true)),
            Expr::False => Ok(Val::Bool(false)),
            Expr::Int(i) => Ok(Val::Int(*i)),
            Expr::Float(x) => Ok(Val::Float(*x)),
            Expr::Str(s) => Ok(Val::Str(s.clone())),
            Expr::Var(name) => Ok(ctx.lookup(name)),
            Expr::Paren(inner) => inner.eval_with_ctx(ctx),
            Expr::Table(items) => eval_table(items, ctx),
            Expr::Function { params, body, line } => Ok(Val::Function(Arc::new(FunctionValue {
                name: None,
                params: params.clone(),
                body: body.clone(),
                captured: ctx.snapshot_scopes(),
                def_line: *line,
            }))),
            Expr::Bin(l, op, r) => {
                let lv = l.eval_with_ctx(ctx)?;
                let rv = r.eval_with_ctx(ctx)?;
                op.eval_vals(&lv, &rv)
                    .map_err(|e| ctx.runtime_error(ErrorKind::Runtime, e.to_string()))
            }
            Expr::Unary(op, operand) => {
                let v = operand.eval_with_ctx(ctx)?;
                op.eval_val(&v)
                    .map_err(|e| ctx.runtime_error(ErrorKind::Runtime, e.to_string()))
            }
            // `and`/`or` yield their operands, not booleans.
            Expr::And(l, r) => {
                let lv = l.eval_with_ctx(ctx)?;
                if lv.truthy() { r.eval_with_ctx(ctx) } else { Ok(lv) }
            }
            Expr::Or(l, r) => {
                let lv = l.eval_with_ctx(ctx)?;
                if lv.truthy() { Ok(lv) } else { r.eval_with_ctx(ctx) }
            }
            Expr::Access(object, name) => {
                let obj = object.eval_with_ctx(ctx)?;
                obj.index(&Val::Str(name.clone()), ctx)
            }
            Expr::Index(object, key) => {
                let obj = object.eval_with_ctx(ctx)?;
                let k = key.eval_with_ctx(ctx)?;
                obj.index(&k, ctx)
            }
            Expr::Call { callee, args, line } => {
                let callee_val = callee.eval_with_ctx(ctx)?;
                let mut argv = Vec::with_capacity(args.len());
                for arg in args {
                    argv.push(arg.eval_with_ctx(ctx)?);
                }
                ctx.set_current_line(*line);
                if !callee_val.callable() {
                    let message = match describe_callee(callee.as_ref(), ctx) {
                        Some(what) => {
                            format!("attempt to call a {} value ({})", callee_val.type_name(), what)
                        }
                        None => format!("attempt to call a {} value", callee_val.type_name()),
                    };
                    return Err(ctx.runtime_error(ErrorKind::NotCallable, message));
                }
                let hint = callee_name_hint(callee.as_ref());
                callee_val.call_named(&argv, ctx, hint.as_ref())
            }
            Expr::MethodCall {
                object,
                method,
                args,
                line,
            } => {
                let obj = object.eval_with_ctx(ctx)?;
                let mut argv = Vec::with_capacity(args.len());
                for arg in args {
                    argv.push(arg.eval_with_ctx(ctx)?);
                }
                ctx.set_current_line(*line);
                obj.call_method(method, &argv, ctx)
            }
            // A reference expression. Validation is split in two: "is there a
            // value" is checked here, eagerly; "is it invocable" is checked
            // only when the produced closure is invoked.
            Expr::MethodRef { object, method, line } => {
                ctx.set_current_line(*line);
                let obj = ctx.lookup(object);
                let table = match &obj {
                    Val::Table(t) => t.clone(),
                    other => {
                        let what = if ctx.is_local(object) { "local" } else { "global" };
                        return Err(ctx.runtime_error(
                            ErrorKind::Index,
                            format!(
                                "attempt to index a {} value ({} '{}')",
                                other.type_name(),
                                what,
                                object
                            ),
                        ));
                    }
                };
                // Eager index: any `__index` side effects run now, exactly
                // once per evaluation, as a method call would incur.
                let resolved = obj.index(&Val::Str(method.clone()), ctx)?;
                if resolved.is_nil() {
                    return Err(ctx.runtime_error(
                        ErrorKind::NilMethod,
                        format!("attempt to bind a nil value (method '{}')", method),
                    ));
                }
                Ok(Val::bind_method(&table, method))
            }
        }
    }
}

fn eval_table(items: &[TableItem], ctx: &mut Context) -> Result<Val> {
    let table = Arc::new(TableValue::new());
    let mut next_index: i64 = 1;
    for item in items {
        match item {
            TableItem::Positional(e) => {
                let v = e.eval_with_ctx(ctx)?;
                table.insert(TableKey::Int(next_index), v);
                next_index += 1;
            }
            TableItem::Named(name, e) => {
                let v = e.eval_with_ctx(ctx)?;
                table.insert(TableKey::Str(name.clone()), v);
            }
            TableItem::Keyed(k, e) => {
                let key = k.eval_with_ctx(ctx)?;
                let v = e.eval_with_ctx(ctx)?;
                Val::Table(table.clone()).set_index(&key, v, ctx)?;
            }
        }
    }
    Ok(Val::Table(table))
}

fn describe_callee(e: &Expr, ctx: &Context) -> Option<String> {
    match e {
        Expr::Var(name) => {
            let what = if ctx.is_local(name) { "local" } else { "global" };
            Some(format!("{} '{}'", what, name))
        }
        Expr::Access(_, name) => Some(format!("field '{}'", name)),
        _ => None,
    }
}

fn callee_name_hint(e: &Expr) -> Option<Arc<str>> {
    match e {
        Expr::Var(name) => Some(Arc::from(name.as_str())),
        Expr::Access(_, name) => Some(name.clone()),
        _ => None,
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Nil => write!(f, "nil"),
            Expr::True => write!(f, "true"),
            Expr::False => write!(f, "false"),
            Expr::Int(i) => write!(f, "{}", i),
            Expr::Float(x) => write!(f, "{}", x),
            Expr::Str(s) => write!(f, "\"{}\"", s),
            Expr::Var(name) => write!(f, "{}", name),
            Expr::Paren(inner) => write!(f, "({})", inner),
            Expr::Table(items) => {
                write!(f, "{{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match item {
                        TableItem::Positional(e) => write!(f, "{}", e)?,
                        TableItem::Named(name, e) => write!(f, "{} = {}", name, e)?,
                        TableItem::Keyed(k, e) => write!(f, "[{}] = {}", k, e)?,
                    }
                }
                write!(f, "}}")
            }
            Expr::Function { params, .. } => write!(f, "function({}) ... end", params.join(", ")),
            Expr::Bin(l, op, r) => write!(f, "{} {} {}", l, op.symbol(), r),
            Expr::Unary(UnaryOp::Not, e) => write!(f, "not {}", e),
            Expr::Unary(UnaryOp::Neg, e) => write!(f, "-{}", e),
            Expr::And(l, r) => write!(f, "{} and {}", l, r),
            Expr::Or(l, r) => write!(f, "{} or {}", l, r),
            Expr::Access(object, name) => write!(f, "{}.{}", object, name),
            Expr::Index(object, key) => write!(f, "{}[{}]", object, key),
            Expr::Call { callee, args, .. } => {
                let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                write!(f, "{}({})", callee, args.join(", "))
            }
            Expr::MethodCall {
                object, method, args, ..
            } => {
                let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                write!(f, "{}:{}({})", object, method, args.join(", "))
            }
            Expr::MethodRef { object, method, .. } => write!(f, "{}:{}", object, method),
        }
    }
}
