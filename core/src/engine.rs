use anyhow::{Result, anyhow};

use crate::ast;
use crate::rt::Context;
use crate::stmt::{Program, StmtParser};
use crate::token::Tokenizer;
use crate::val::Val;

/// Parse-and-execute facade over the tokenizer, parsers and runtime context.
/// One engine keeps one global environment, so a REPL can feed it chunk by
/// chunk.
pub struct Engine {
    ctx: Context,
}

impl Engine {
    pub fn new() -> Self {
        Self { ctx: Context::new() }
    }

    pub fn context(&mut self) -> &mut Context {
        &mut self.ctx
    }

    /// Parse a chunk without executing it.
    pub fn parse_program(source: &str, chunk: &str) -> Result<Program> {
        let (tokens, positions) = Tokenizer::tokenize(source).map_err(|e| anyhow!("{}: {}", chunk, e))?;
        StmtParser::new(&tokens, &positions)
            .parse_program()
            .map_err(|e| anyhow!("{}: {}", chunk, e))
    }

    pub fn exec(&mut self, source: &str) -> Result<Val> {
        self.exec_named(source, "input")
    }

    /// Run a chunk; yields its `return` value (nil when it does not return).
    pub fn exec_named(&mut self, source: &str, chunk: &str) -> Result<Val> {
        self.ctx.set_chunk(chunk);
        let program = Self::parse_program(source, chunk)?;
        tracing::debug!(chunk, statements = program.body.len(), "executing chunk");
        program.execute(&mut self.ctx)
    }

    /// Evaluate a single expression in the engine's environment; REPL helper.
    pub fn eval_expr(&mut self, source: &str) -> Result<Val> {
        let chunk = "input";
        self.ctx.set_chunk(chunk);
        let (tokens, positions) = Tokenizer::tokenize(source).map_err(|e| anyhow!("{}: {}", chunk, e))?;
        let expr = ast::Parser::new(&tokens, &positions)
            .parse()
            .map_err(|e| anyhow!("{}: {}", chunk, e))?;
        let scope_depth = self.ctx.scope_depth();
        let stack_depth = self.ctx.call_stack_depth();
        self.ctx.push_scope();
        let result = expr.eval_with_ctx(&mut self.ctx);
        self.ctx.truncate_scopes(scope_depth);
        self.ctx.truncate_call_stack(stack_depth);
        result
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
