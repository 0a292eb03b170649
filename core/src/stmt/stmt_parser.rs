use std::sync::Arc;

use anyhow::{Result, anyhow};

use crate::ast::Parser;
use crate::expr::Expr;
use crate::stmt::{AssignTarget, Program, Stmt};
use crate::token::{Position, Token};

/// Recursive-descent statement parser over the token stream. Expression
/// positions delegate to [`crate::ast::Parser`], sharing the same cursor.
pub struct StmtParser<'a> {
    tokens: &'a [Token],
    positions: &'a [Position],
    pos: usize,
    len: usize,
    loop_depth: usize,
}

/// Parse one function body (after the parameter list) up to and including
/// its closing `end`. Returns the body and the cursor position after `end`.
pub(crate) fn parse_function_block(
    tokens: &[Token],
    positions: &[Position],
    pos: usize,
) -> Result<(Vec<Stmt>, usize)> {
    let mut parser = StmtParser::at(tokens, positions, pos);
    // A function body is a fresh loop context: break cannot cross it.
    parser.loop_depth = 0;
    let body = parser.parse_block()?;
    parser.expect(&Token::End, "'end' expected to close function")?;
    Ok((body, parser.pos))
}

impl<'a> StmtParser<'a> {
    pub fn new(tokens: &'a [Token], positions: &'a [Position]) -> Self {
        Self::at(tokens, positions, 0)
    }

    fn at(tokens: &'a [Token], positions: &'a [Position], pos: usize) -> Self {
        Self {
            tokens,
            positions,
            pos,
            len: tokens.len(),
            loop_depth: 0,
        }
    }

    pub fn parse_program(&mut self) -> Result<Program> {
        let body = self.parse_block()?;
        if !self.eof() {
            return Err(anyhow!(self.err("'<eof>' expected")));
        }
        Ok(Program { body })
    }

    fn eof(&self) -> bool {
        self.pos >= self.len
    }

    fn line(&self) -> u32 {
        if self.positions.is_empty() {
            return 0;
        }
        let idx = self.pos.min(self.positions.len() - 1);
        self.positions[idx].line
    }

    fn err<T: AsRef<str>>(&self, msg: T) -> String {
        let near = if self.eof() {
            "<eof>".to_string()
        } else {
            format!("'{}'", self.tokens[self.pos])
        };
        format!("{} near {} (line {})", msg.as_ref(), near, self.line())
    }

    fn check(&self, token: &Token) -> bool {
        !self.eof() && self.tokens[self.pos] == *token
    }

    fn accept(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token, msg: &str) -> Result<()> {
        if self.accept(token) {
            Ok(())
        } else {
            Err(anyhow!(self.err(msg)))
        }
    }

    fn expect_name(&mut self, msg: &str) -> Result<String> {
        match self.tokens.get(self.pos) {
            Some(Token::Id(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(anyhow!(self.err(msg))),
        }
    }

    fn block_terminator(&self) -> bool {
        self.eof() || matches!(self.tokens[self.pos], Token::End | Token::Else | Token::Elseif)
    }

    /// Statements until a block terminator (`end`/`else`/`elseif`/eof),
    /// which is left unconsumed.
    fn parse_block(&mut self) -> Result<Vec<Stmt>> {
        let mut body = Vec::new();
        loop {
            if self.accept(&Token::Semicolon) {
                continue;
            }
            if self.block_terminator() {
                return Ok(body);
            }
            body.push(self.parse_statement()?);
        }
    }

    fn parse_statement(&mut self) -> Result<Stmt> {
        let line = self.line();
        match &self.tokens[self.pos] {
            Token::Local => self.parse_local(line),
            Token::Function => self.parse_function_stmt(line),
            Token::If => self.parse_if(line),
            Token::While => self.parse_while(line),
            Token::Do => {
                self.pos += 1;
                let body = self.parse_block()?;
                self.expect(&Token::End, "'end' expected to close 'do'")?;
                Ok(Stmt::Do { body, line })
            }
            Token::Break => {
                if self.loop_depth == 0 {
                    return Err(anyhow!(self.err("break outside a loop")));
                }
                self.pos += 1;
                Ok(Stmt::Break { line })
            }
            Token::Return => {
                self.pos += 1;
                let value = if self.block_terminator() || self.check(&Token::Semicolon) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                Ok(Stmt::Return { value, line })
            }
            _ => self.parse_expr_statement(line),
        }
    }

    fn parse_local(&mut self, line: u32) -> Result<Stmt> {
        self.pos += 1;
        if self.accept(&Token::Function) {
            let name = self.expect_name("function name expected after 'local function'")?;
            let (params, body) = self.parse_function_rest()?;
            return Ok(Stmt::LocalFunction { name, params, body, line });
        }
        let name = self.expect_name("name expected after 'local'")?;
        let value = if self.accept(&Token::Assign) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        Ok(Stmt::Local { name, value, line })
    }

    fn parse_function_stmt(&mut self, line: u32) -> Result<Stmt> {
        self.pos += 1;
        let first = self.expect_name("function name expected")?;
        let mut path = vec![first];
        let mut method = None;
        loop {
            if self.accept(&Token::Dot) {
                path.push(self.expect_name("field name expected after '.'")?);
            } else if self.accept(&Token::Colon) {
                method = Some(self.expect_name("method name expected after ':'")?);
                break;
            } else {
                break;
            }
        }
        let (mut params, body) = self.parse_function_rest()?;
        if method.is_some() {
            params.insert(0, "self".to_string());
        }
        Ok(Stmt::Function {
            path,
            method,
            params,
            body,
            line,
        })
    }

    fn parse_if(&mut self, line: u32) -> Result<Stmt> {
        self.pos += 1;
        let mut arms = Vec::new();
        let condition = self.parse_expr()?;
        self.expect(&Token::Then, "'then' expected")?;
        let body = self.parse_block()?;
        arms.push((condition, body));
        let mut else_body = None;
        loop {
            if self.accept(&Token::Elseif) {
                let condition = self.parse_expr()?;
                self.expect(&Token::Then, "'then' expected")?;
                let body = self.parse_block()?;
                arms.push((condition, body));
            } else if self.accept(&Token::Else) {
                else_body = Some(self.parse_block()?);
                self.expect(&Token::End, "'end' expected to close 'if'")?;
                break;
            } else if self.accept(&Token::End) {
                break;
            } else {
                return Err(anyhow!(self.err("'end' expected to close 'if'")));
            }
        }
        Ok(Stmt::If { arms, else_body, line })
    }

    fn parse_while(&mut self, line: u32) -> Result<Stmt> {
        self.pos += 1;
        let condition = self.parse_expr()?;
        self.expect(&Token::Do, "'do' expected")?;
        self.loop_depth += 1;
        let body = self.parse_block();
        self.loop_depth -= 1;
        let body = body?;
        self.expect(&Token::End, "'end' expected to close 'while'")?;
        Ok(Stmt::While { condition, body, line })
    }

    /// Either an assignment (`target = expr`) or a call statement. Anything
    /// else is a syntax error: only call-shaped expressions are statements.
    fn parse_expr_statement(&mut self, line: u32) -> Result<Stmt> {
        let expr = self.parse_expr()?;
        if self.accept(&Token::Assign) {
            let target = match expr {
                Expr::Var(name) => AssignTarget::Name(name),
                Expr::Access(object, name) => AssignTarget::Field { object: *object, name },
                Expr::Index(object, key) => AssignTarget::Index {
                    object: *object,
                    key: *key,
                },
                _ => return Err(anyhow!(self.err("cannot assign to this expression"))),
            };
            let value = self.parse_expr()?;
            return Ok(Stmt::Assign { target, value, line });
        }
        match &expr {
            Expr::Call { .. } | Expr::MethodCall { .. } => Ok(Stmt::Expr { expr, line }),
            _ => Err(anyhow!(self.err("syntax error"))),
        }
    }

    fn parse_expr(&mut self) -> Result<Expr> {
        let mut parser = Parser::at(self.tokens, self.positions, self.pos);
        let result = parser.parse_expression();
        self.pos = parser.pos();
        result
    }

    fn parse_function_rest(&mut self) -> Result<(Vec<String>, Arc<Vec<Stmt>>)> {
        let mut parser = Parser::at(self.tokens, self.positions, self.pos);
        let result = parser.parse_function_params_and_body();
        self.pos = parser.pos();
        result
    }
}
