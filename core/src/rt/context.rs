use std::sync::{Arc, RwLock};

use anyhow::Result;

use crate::rt::error::{ErrorKind, RuntimeError};
use crate::rt::trace::{self, CallFrameInfo, TracebackFrame};
use crate::util::fast_map::{FastHashMap, fast_hash_map_new};
use crate::val::{TableValue, Val};

pub type Scope = FastHashMap<String, Val>;

/// Script-level recursion limit; hit well before the Rust stack is at risk.
const MAX_CALL_DEPTH: usize = 200;

/// Execution context: global environment, lexical scope chain, call stack
/// and source-line bookkeeping for diagnostics.
///
/// Local scopes are shared (`Arc<RwLock<..>>`) so closures capture them by
/// reference and see later assignments.
#[derive(Debug)]
pub struct Context {
    globals: FastHashMap<String, Val>,
    locals: Vec<Arc<RwLock<Scope>>>,
    call_stack: Vec<CallFrameInfo>,
    chunk: Arc<str>,
    current_line: u32,
}

impl Context {
    pub fn new() -> Self {
        let mut ctx = Self {
            globals: fast_hash_map_new(),
            locals: Vec::new(),
            call_stack: Vec::new(),
            chunk: Arc::from("input"),
            current_line: 0,
        };
        ctx.install_builtins();
        ctx
    }

    pub fn chunk(&self) -> &str {
        &self.chunk
    }

    pub fn set_chunk(&mut self, chunk: &str) {
        self.chunk = Arc::from(chunk);
    }

    #[inline]
    pub fn current_line(&self) -> u32 {
        self.current_line
    }

    #[inline]
    pub fn set_current_line(&mut self, line: u32) {
        self.current_line = line;
    }

    // --- variables ---

    /// Resolve a name: innermost scope outwards, then globals. An unbound
    /// name reads as nil, as in Lua.
    pub fn lookup(&self, name: &str) -> Val {
        for scope in self.locals.iter().rev() {
            if let Some(v) = scope.read().unwrap().get(name) {
                return v.clone();
            }
        }
        self.globals.get(name).cloned().unwrap_or(Val::Nil)
    }

    pub fn is_local(&self, name: &str) -> bool {
        self.locals
            .iter()
            .rev()
            .any(|scope| scope.read().unwrap().contains_key(name))
    }

    /// Introduce a local in the innermost scope.
    pub fn define_local(&mut self, name: String, value: Val) {
        match self.locals.last() {
            Some(scope) => {
                scope.write().unwrap().insert(name, value);
            }
            None => {
                self.globals.insert(name, value);
            }
        }
    }

    /// Plain assignment: the nearest scope holding the name, else a global.
    pub fn assign(&mut self, name: &str, value: Val) {
        for scope in self.locals.iter().rev() {
            let mut guard = scope.write().unwrap();
            if let Some(slot) = guard.get_mut(name) {
                *slot = value;
                return;
            }
        }
        self.globals.insert(name.to_string(), value);
    }

    pub fn set_global(&mut self, name: &str, value: Val) {
        self.globals.insert(name.to_string(), value);
    }

    pub fn get_global(&self, name: &str) -> Option<Val> {
        self.globals.get(name).cloned()
    }

    // --- scopes ---

    pub fn push_scope(&mut self) {
        self.locals.push(Arc::new(RwLock::new(fast_hash_map_new())));
    }

    pub fn pop_scope(&mut self) {
        self.locals.pop();
    }

    pub fn scope_depth(&self) -> usize {
        self.locals.len()
    }

    pub fn truncate_scopes(&mut self, depth: usize) {
        if depth < self.locals.len() {
            self.locals.truncate(depth);
        }
    }

    /// The scope chain as captured by a closure at its definition site.
    pub fn snapshot_scopes(&self) -> Vec<Arc<RwLock<Scope>>> {
        self.locals.clone()
    }

    /// Swap in a callee's captured chain plus a fresh scope for parameters
    /// and body locals. Returns the caller's chain for [`Self::exit_function`].
    pub fn enter_function(&mut self, captured: &[Arc<RwLock<Scope>>]) -> Vec<Arc<RwLock<Scope>>> {
        let mut incoming = captured.to_vec();
        incoming.push(Arc::new(RwLock::new(fast_hash_map_new())));
        std::mem::replace(&mut self.locals, incoming)
    }

    pub fn exit_function(&mut self, saved: Vec<Arc<RwLock<Scope>>>) {
        self.locals = saved;
    }

    // --- call stack ---

    pub fn push_frame(&mut self, frame: CallFrameInfo) {
        self.call_stack.push(frame);
    }

    pub fn pop_frame(&mut self) {
        if let Some(frame) = self.call_stack.pop() {
            self.current_line = frame.call_line;
        }
    }

    #[inline]
    pub fn call_stack_depth(&self) -> usize {
        self.call_stack.len()
    }

    pub fn truncate_call_stack(&mut self, depth: usize) {
        if depth < self.call_stack.len() {
            self.call_stack.truncate(depth);
        }
    }

    pub fn check_depth(&self) -> Result<()> {
        if self.call_stack.len() >= MAX_CALL_DEPTH {
            return Err(self.runtime_error(ErrorKind::Runtime, "stack overflow".to_string()));
        }
        Ok(())
    }

    pub fn capture_traceback(&self) -> Vec<TracebackFrame> {
        trace::capture(self.current_line, &self.call_stack)
    }

    // --- errors ---

    /// Build a runtime error with the current source position prefixed to
    /// the message, Lua style.
    pub fn runtime_error(&self, kind: ErrorKind, message: String) -> anyhow::Error {
        let positioned = format!("{}:{}: {}", self.chunk, self.current_line, message);
        self.raw_runtime_error(kind, positioned)
    }

    /// Build a runtime error whose message is used verbatim.
    pub fn raw_runtime_error(&self, kind: ErrorKind, message: String) -> anyhow::Error {
        anyhow::Error::new(RuntimeError {
            kind,
            message,
            chunk: self.chunk.clone(),
            traceback: self.capture_traceback(),
        })
    }

    fn install_builtins(&mut self) {
        let builtins: &[(&str, crate::val::NativeFn)] = &[
            ("print", builtin_print),
            ("type", builtin_type),
            ("tostring", builtin_tostring),
            ("assert", builtin_assert),
            ("error", builtin_error),
            ("setmetatable", builtin_setmetatable),
            ("getmetatable", builtin_getmetatable),
            ("rawget", builtin_rawget),
        ];
        for (name, func) in builtins {
            self.globals.insert((*name).to_string(), Val::Native(*func));
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

fn builtin_print(args: &[Val], _ctx: &mut Context) -> Result<Val> {
    let mut out = String::new();
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out.push('\t');
        }
        out.push_str(&arg.to_string());
    }
    println!("{}", out);
    Ok(Val::Nil)
}

fn builtin_type(args: &[Val], _ctx: &mut Context) -> Result<Val> {
    let v = args.first().unwrap_or(&Val::Nil);
    Ok(Val::Str(Arc::from(v.type_name())))
}

fn builtin_tostring(args: &[Val], _ctx: &mut Context) -> Result<Val> {
    let v = args.first().unwrap_or(&Val::Nil);
    Ok(Val::Str(Arc::from(v.to_string())))
}

fn builtin_assert(args: &[Val], ctx: &mut Context) -> Result<Val> {
    let v = args.first().cloned().unwrap_or(Val::Nil);
    if v.truthy() {
        return Ok(v);
    }
    let message = match args.get(1) {
        Some(Val::Str(s)) => s.to_string(),
        Some(other) => other.to_string(),
        None => "assertion failed!".to_string(),
    };
    Err(ctx.raw_runtime_error(ErrorKind::Runtime, message))
}

fn builtin_error(args: &[Val], ctx: &mut Context) -> Result<Val> {
    match args.first() {
        // String messages get the position of the `error` call prepended.
        Some(Val::Str(s)) => Err(ctx.runtime_error(ErrorKind::Runtime, s.to_string())),
        Some(other) => Err(ctx.raw_runtime_error(ErrorKind::Runtime, other.to_string())),
        None => Err(ctx.raw_runtime_error(ErrorKind::Runtime, "nil".to_string())),
    }
}

fn builtin_setmetatable(args: &[Val], ctx: &mut Context) -> Result<Val> {
    let table = match args.first() {
        Some(Val::Table(t)) => t.clone(),
        other => {
            let got = other.map(Val::type_name).unwrap_or("no value");
            return Err(ctx.runtime_error(
                ErrorKind::Runtime,
                format!("bad argument #1 to 'setmetatable' (table expected, got {})", got),
            ));
        }
    };
    match args.get(1) {
        Some(Val::Table(mt)) => table.set_metatable(Some(mt.clone())),
        Some(Val::Nil) | None => table.set_metatable(None),
        Some(other) => {
            return Err(ctx.runtime_error(
                ErrorKind::Runtime,
                format!(
                    "bad argument #2 to 'setmetatable' (nil or table expected, got {})",
                    other.type_name()
                ),
            ));
        }
    }
    Ok(Val::Table(table))
}

fn builtin_getmetatable(args: &[Val], _ctx: &mut Context) -> Result<Val> {
    match args.first() {
        Some(Val::Table(t)) => Ok(t.metatable().map(Val::Table).unwrap_or(Val::Nil)),
        _ => Ok(Val::Nil),
    }
}

fn builtin_rawget(args: &[Val], ctx: &mut Context) -> Result<Val> {
    let table: &Arc<TableValue> = match args.first() {
        Some(Val::Table(t)) => t,
        other => {
            let got = other.map(Val::type_name).unwrap_or("no value");
            return Err(ctx.runtime_error(
                ErrorKind::Runtime,
                format!("bad argument #1 to 'rawget' (table expected, got {})", got),
            ));
        }
    };
    let key = args.get(1).cloned().unwrap_or(Val::Nil);
    Ok(table.raw_get(&key).unwrap_or(Val::Nil))
}
