use std::fmt;
use std::sync::{Arc, RwLock};

use anyhow::Result;

use crate::rt::context::{Context, Scope};
use crate::rt::error::ErrorKind;
use crate::rt::trace::CallFrameInfo;
use crate::stmt::{Flow, Stmt, exec_block};
use crate::val::table::TableValue;

mod cache;
mod ops;

/// Native function installed into the global environment.
pub type NativeFn = fn(&[Val], &mut Context) -> Result<Val>;

/// Upper bound on `__index` metamethod chains, to turn cyclic metatables
/// into an error instead of an endless walk.
const MAX_INDEX_CHAIN: usize = 100;

#[derive(Debug, Clone)]
pub enum Val {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    Table(Arc<TableValue>),
    Function(Arc<FunctionValue>),
    Native(NativeFn),
    /// A bound-method closure produced by a reference expression. A distinct
    /// value kind from `Function`: equality is per-(receiver, name) identity
    /// and invocation re-resolves the method through the receiver.
    Bound(Arc<BoundMethodValue>),
}

/// A script function: parameters, body, and the lexical scope chain captured
/// at definition time. Scopes are shared, so assignments to captured locals
/// are visible across closures.
#[derive(Clone)]
pub struct FunctionValue {
    pub name: Option<Arc<str>>,
    pub params: Vec<String>,
    pub body: Arc<Vec<Stmt>>,
    pub captured: Vec<Arc<RwLock<Scope>>>,
    pub def_line: u32,
}

// The captured environment can reach the function itself; keep Debug shallow.
impl fmt::Debug for FunctionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name.as_deref().unwrap_or("?");
        f.debug_struct("FunctionValue")
            .field("name", &name)
            .field("params", &self.params)
            .field("def_line", &self.def_line)
            .finish()
    }
}

#[derive(Debug)]
pub struct BoundMethodValue {
    pub receiver: Val,
    pub name: Arc<str>,
}

impl Val {
    pub fn type_name(&self) -> &'static str {
        match self {
            Val::Nil => "nil",
            Val::Bool(_) => "boolean",
            Val::Int(_) | Val::Float(_) => "number",
            Val::Str(_) => "string",
            Val::Table(_) => "table",
            Val::Function(_) | Val::Native(_) | Val::Bound(_) => "function",
        }
    }

    #[inline]
    pub fn truthy(&self) -> bool {
        !matches!(self, Val::Nil | Val::Bool(false))
    }

    #[inline]
    pub fn is_nil(&self) -> bool {
        matches!(self, Val::Nil)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Val::Int(i) => Some(*i as f64),
            Val::Float(x) => Some(*x),
            _ => None,
        }
    }

    /// The indexing protocol: raw read, then the `__index` metamethod chain.
    /// A function handler runs exactly once per index operation.
    pub fn index(&self, key: &Val, ctx: &mut Context) -> Result<Val> {
        let mut current = self.clone();
        for _ in 0..MAX_INDEX_CHAIN {
            let next = match &current {
                Val::Table(t) => {
                    if let Some(v) = t.raw_get(key) {
                        return Ok(v);
                    }
                    match t.meta_field("__index") {
                        None => return Ok(Val::Nil),
                        Some(handler) => {
                            if handler.callable() && !matches!(handler, Val::Table(_)) {
                                return handler.call(&[current.clone(), key.clone()], ctx);
                            }
                            handler
                        }
                    }
                }
                other => {
                    return Err(ctx.runtime_error(
                        ErrorKind::Index,
                        format!("attempt to index a {} value", other.type_name()),
                    ));
                }
            };
            current = next;
        }
        Err(ctx.runtime_error(
            ErrorKind::Index,
            "'__index' chain too long; possible loop".to_string(),
        ))
    }

    /// Raw field write. `__newindex` is not supported.
    pub fn set_index(&self, key: &Val, value: Val, ctx: &mut Context) -> Result<()> {
        match self {
            Val::Table(t) => t
                .raw_set(key, value)
                .map_err(|e| ctx.runtime_error(ErrorKind::Runtime, e.to_string())),
            other => Err(ctx.runtime_error(
                ErrorKind::Index,
                format!("attempt to index a {} value", other.type_name()),
            )),
        }
    }

    /// Whether invoking this value can succeed: functions, natives, bound
    /// closures, and tables with a `__call` metamethod.
    pub fn callable(&self) -> bool {
        match self {
            Val::Function(_) | Val::Native(_) | Val::Bound(_) => true,
            Val::Table(t) => t.meta_field("__call").is_some(),
            _ => false,
        }
    }

    /// The call protocol.
    pub fn call(&self, args: &[Val], ctx: &mut Context) -> Result<Val> {
        self.call_named(args, ctx, None)
    }

    /// Call with a display name for the callee's stack frame (the variable,
    /// field or method name at the call site).
    pub fn call_named(&self, args: &[Val], ctx: &mut Context, name: Option<&Arc<str>>) -> Result<Val> {
        match self {
            Val::Function(f) => call_function(f, args, ctx, name),
            Val::Native(nf) => {
                ctx.check_depth()?;
                let display = name.cloned().unwrap_or_else(|| Arc::from("?"));
                ctx.push_frame(CallFrameInfo::native(display, ctx.current_line()));
                let result = nf(args, ctx);
                ctx.pop_frame();
                result
            }
            Val::Bound(b) => {
                ctx.check_depth()?;
                // The synthetic wrapper frame is elided so the traceback is
                // indistinguishable from a direct method call.
                ctx.push_frame(CallFrameInfo::elided(b.name.clone(), ctx.current_line()));
                let result = b.receiver.call_method(&b.name, args, ctx);
                ctx.pop_frame();
                result
            }
            Val::Table(t) => match t.meta_field("__call") {
                Some(handler) => {
                    let mut full = Vec::with_capacity(args.len() + 1);
                    full.push(self.clone());
                    full.extend_from_slice(args);
                    handler.call_named(&full, ctx, name)
                }
                None => Err(ctx.runtime_error(
                    ErrorKind::NotCallable,
                    "attempt to call a table value".to_string(),
                )),
            },
            other => Err(ctx.runtime_error(
                ErrorKind::NotCallable,
                format!("attempt to call a {} value", other.type_name()),
            )),
        }
    }

    /// `receiver:name(args...)`: resolve `receiver[name]` through the
    /// indexing protocol (once), then invoke it with the receiver prepended.
    /// Shared by direct method calls and bound-closure invocation, so the two
    /// are behaviorally identical by construction.
    pub fn call_method(&self, name: &Arc<str>, args: &[Val], ctx: &mut Context) -> Result<Val> {
        let target = self.index(&Val::Str(name.clone()), ctx)?;
        if !target.callable() {
            return Err(ctx.runtime_error(
                ErrorKind::NotCallable,
                format!(
                    "attempt to call a {} value (method '{}')",
                    target.type_name(),
                    name
                ),
            ));
        }
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push(self.clone());
        full.extend_from_slice(args);
        target.call_named(&full, ctx, Some(name))
    }

    /// Fetch the canonical bound-method closure for `(receiver, name)` from
    /// the cache, creating it on first use.
    pub fn bind_method(receiver: &Arc<TableValue>, name: &Arc<str>) -> Val {
        Val::Bound(cache::bound_method(receiver, name))
    }
}

fn call_function(f: &Arc<FunctionValue>, args: &[Val], ctx: &mut Context, name: Option<&Arc<str>>) -> Result<Val> {
    ctx.check_depth()?;
    let display = name
        .or(f.name.as_ref())
        .cloned()
        .unwrap_or_else(|| Arc::from(format!("<{}:{}>", ctx.chunk(), f.def_line)));
    ctx.push_frame(CallFrameInfo::script(display, ctx.current_line()));
    let saved = ctx.enter_function(&f.captured);
    let result = run_function_body(f, args, ctx);
    ctx.exit_function(saved);
    ctx.pop_frame();
    result
}

fn run_function_body(f: &Arc<FunctionValue>, args: &[Val], ctx: &mut Context) -> Result<Val> {
    for (i, param) in f.params.iter().enumerate() {
        ctx.define_local(param.clone(), args.get(i).cloned().unwrap_or(Val::Nil));
    }
    match exec_block(&f.body, ctx)? {
        Flow::Return(v) => Ok(v),
        _ => Ok(Val::Nil),
    }
}

impl fmt::Display for Val {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Val::Nil => write!(f, "nil"),
            Val::Bool(b) => write!(f, "{}", b),
            Val::Int(i) => {
                let mut buf = itoa::Buffer::new();
                f.write_str(buf.format(*i))
            }
            Val::Float(x) => {
                let mut buf = ryu::Buffer::new();
                f.write_str(buf.format(*x))
            }
            Val::Str(s) => f.write_str(s),
            Val::Table(t) => write!(f, "table: {:#x}", Arc::as_ptr(t) as usize),
            Val::Function(fv) => write!(f, "function: {:#x}", Arc::as_ptr(fv) as usize),
            Val::Native(nf) => write!(f, "function: builtin: {:#x}", *nf as usize),
            Val::Bound(b) => write!(f, "function: {:#x}", Arc::as_ptr(b) as usize),
        }
    }
}
