use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::expr::Expr;
use crate::rt::Context;
use crate::val::{FunctionValue, Val};

/// Statement grammar (abridged):
/// block     ::= {stat}
/// stat      ::= 'local' Name ['=' expr]
///             | 'local' 'function' Name funcbody
///             | 'function' funcname funcbody
///             | target '=' expr | callexpr
///             | 'if' expr 'then' block {'elseif' expr 'then' block}
///               ['else' block] 'end'
///             | 'while' expr 'do' block 'end'
///             | 'do' block 'end' | 'break' | 'return' [expr] | ';'
/// funcname  ::= Name {'.' Name} [':' Name]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Local {
        name: String,
        value: Option<Expr>,
        line: u32,
    },
    LocalFunction {
        name: String,
        params: Vec<String>,
        body: Arc<Vec<Stmt>>,
        line: u32,
    },
    /// `function a.b.c(...)` / `function a:m(...)` — for the method form the
    /// parser has already prepended the implicit `self` parameter.
    Function {
        path: Vec<String>,
        method: Option<String>,
        params: Vec<String>,
        body: Arc<Vec<Stmt>>,
        line: u32,
    },
    Assign {
        target: AssignTarget,
        value: Expr,
        line: u32,
    },
    If {
        arms: Vec<(Expr, Vec<Stmt>)>,
        else_body: Option<Vec<Stmt>>,
        line: u32,
    },
    While {
        condition: Expr,
        body: Vec<Stmt>,
        line: u32,
    },
    Do {
        body: Vec<Stmt>,
        line: u32,
    },
    Break {
        line: u32,
    },
    Return {
        value: Option<Expr>,
        line: u32,
    },
    Expr {
        expr: Expr,
        line: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AssignTarget {
    Name(String),
    Field { object: Expr, name: Arc<str> },
    Index { object: Expr, key: Expr },
}

/// Block-level control flow.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Break,
    Return(Val),
}

/// A parsed chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub body: Vec<Stmt>,
}

impl Program {
    /// Run the chunk in its own scope; yields the chunk's `return` value.
    /// Scope chain and call stack are restored even when execution fails, so
    /// a context can keep serving a REPL after an error.
    pub fn execute(&self, ctx: &mut Context) -> Result<Val> {
        let scope_depth = ctx.scope_depth();
        let stack_depth = ctx.call_stack_depth();
        ctx.push_scope();
        let result = exec_block(&self.body, ctx);
        ctx.truncate_scopes(scope_depth);
        ctx.truncate_call_stack(stack_depth);
        match result? {
            Flow::Return(v) => Ok(v),
            _ => Ok(Val::Nil),
        }
    }
}

pub fn exec_block(body: &[Stmt], ctx: &mut Context) -> Result<Flow> {
    for stmt in body {
        match exec_stmt(stmt, ctx)? {
            Flow::Normal => {}
            flow => return Ok(flow),
        }
    }
    Ok(Flow::Normal)
}

fn exec_scoped_block(body: &[Stmt], ctx: &mut Context) -> Result<Flow> {
    ctx.push_scope();
    let result = exec_block(body, ctx);
    ctx.pop_scope();
    result
}

fn exec_stmt(stmt: &Stmt, ctx: &mut Context) -> Result<Flow> {
    match stmt {
        Stmt::Local { name, value, line } => {
            ctx.set_current_line(*line);
            let v = match value {
                Some(e) => e.eval_with_ctx(ctx)?,
                None => Val::Nil,
            };
            ctx.define_local(name.clone(), v);
            Ok(Flow::Normal)
        }
        Stmt::LocalFunction { name, params, body, line } => {
            ctx.set_current_line(*line);
            // Declare first so the body can refer to itself.
            ctx.define_local(name.clone(), Val::Nil);
            let func = Val::Function(Arc::new(FunctionValue {
                name: Some(Arc::from(name.as_str())),
                params: params.clone(),
                body: body.clone(),
                captured: ctx.snapshot_scopes(),
                def_line: *line,
            }));
            ctx.assign(name, func);
            Ok(Flow::Normal)
        }
        Stmt::Function {
            path,
            method,
            params,
            body,
            line,
        } => {
            ctx.set_current_line(*line);
            let display = method.as_deref().unwrap_or_else(|| path.last().unwrap().as_str());
            let func = Val::Function(Arc::new(FunctionValue {
                name: Some(Arc::from(display)),
                params: params.clone(),
                body: body.clone(),
                captured: ctx.snapshot_scopes(),
                def_line: *line,
            }));
            if path.len() == 1 && method.is_none() {
                ctx.assign(&path[0], func);
                return Ok(Flow::Normal);
            }
            let (walk, last) = match method {
                Some(m) => (&path[1..], m.as_str()),
                None => (&path[1..path.len() - 1], path.last().unwrap().as_str()),
            };
            let mut target = ctx.lookup(&path[0]);
            for part in walk {
                target = target.index(&Val::Str(Arc::from(part.as_str())), ctx)?;
            }
            target.set_index(&Val::Str(Arc::from(last)), func, ctx)?;
            Ok(Flow::Normal)
        }
        Stmt::Assign { target, value, line } => {
            ctx.set_current_line(*line);
            match target {
                AssignTarget::Name(name) => {
                    let v = value.eval_with_ctx(ctx)?;
                    ctx.assign(name, v);
                }
                AssignTarget::Field { object, name } => {
                    let obj = object.eval_with_ctx(ctx)?;
                    let v = value.eval_with_ctx(ctx)?;
                    obj.set_index(&Val::Str(name.clone()), v, ctx)?;
                }
                AssignTarget::Index { object, key } => {
                    let obj = object.eval_with_ctx(ctx)?;
                    let k = key.eval_with_ctx(ctx)?;
                    let v = value.eval_with_ctx(ctx)?;
                    obj.set_index(&k, v, ctx)?;
                }
            }
            Ok(Flow::Normal)
        }
        Stmt::If { arms, else_body, line } => {
            ctx.set_current_line(*line);
            for (condition, body) in arms {
                if condition.eval_with_ctx(ctx)?.truthy() {
                    return exec_scoped_block(body, ctx);
                }
            }
            match else_body {
                Some(body) => exec_scoped_block(body, ctx),
                None => Ok(Flow::Normal),
            }
        }
        Stmt::While { condition, body, line } => {
            loop {
                ctx.set_current_line(*line);
                if !condition.eval_with_ctx(ctx)?.truthy() {
                    break;
                }
                match exec_scoped_block(body, ctx)? {
                    Flow::Normal => {}
                    Flow::Break => break,
                    flow @ Flow::Return(_) => return Ok(flow),
                }
            }
            Ok(Flow::Normal)
        }
        Stmt::Do { body, line } => {
            ctx.set_current_line(*line);
            exec_scoped_block(body, ctx)
        }
        Stmt::Break { line } => {
            ctx.set_current_line(*line);
            Ok(Flow::Break)
        }
        Stmt::Return { value, line } => {
            ctx.set_current_line(*line);
            let v = match value {
                Some(e) => e.eval_with_ctx(ctx)?,
                None => Val::Nil,
            };
            Ok(Flow::Return(v))
        }
        Stmt::Expr { expr, line } => {
            ctx.set_current_line(*line);
            expr.eval_with_ctx(ctx)?;
            Ok(Flow::Normal)
        }
    }
}
