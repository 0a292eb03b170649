use std::sync::Arc;

use anyhow::{Result, anyhow};

use crate::expr::{Expr, TableItem};
use crate::op::{BinOp, UnaryOp};
use crate::stmt::{Stmt, parse_function_block};
use crate::token::{Position, Token};

/// Recursive-descent expression parser. Operator precedence, lowest first:
/// `or` < `and` < comparison < `..` (right-assoc) < `+ -` < `* / %` < unary
/// < suffixed.
pub struct Parser<'a> {
    tokens: &'a [Token],
    positions: &'a [Position],
    pos: usize,
    len: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token], positions: &'a [Position]) -> Self {
        Self::at(tokens, positions, 0)
    }

    /// Start parsing at an arbitrary cursor; the statement parser uses this
    /// to share one token stream.
    pub fn at(tokens: &'a [Token], positions: &'a [Position], pos: usize) -> Self {
        Self {
            tokens,
            positions,
            pos,
            len: tokens.len(),
        }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Parse a standalone expression; trailing tokens are an error.
    pub fn parse(&mut self) -> Result<Expr> {
        if self.eof() {
            return Err(anyhow!("unexpected end of input"));
        }
        let expr = self.parse_expression()?;
        if !self.eof() {
            return Err(anyhow!(self.err("unexpected token")));
        }
        Ok(expr)
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

    pub fn parse_expression(&mut self) -> Result<Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut expr = self.parse_and()?;
        while self.accept(&Token::Or) {
            let right = self.parse_and()?;
            expr = Expr::Or(Box::new(expr), Box::new(right));
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut expr = self.parse_cmp()?;
        while self.accept(&Token::And) {
            let right = self.parse_cmp()?;
            expr = Expr::And(Box::new(expr), Box::new(right));
        }
        Ok(expr)
    }

    fn parse_cmp(&mut self) -> Result<Expr> {
        let mut expr = self.parse_concat()?;
        loop {
            let op = match self.tokens.get(self.pos) {
                Some(Token::Eq) => BinOp::Eq,
                Some(Token::Ne) => BinOp::Ne,
                Some(Token::Lt) => BinOp::Lt,
                Some(Token::Le) => BinOp::Le,
                Some(Token::Gt) => BinOp::Gt,
                Some(Token::Ge) => BinOp::Ge,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_concat()?;
            expr = Expr::Bin(Box::new(expr), op, Box::new(right));
        }
        Ok(expr)
    }

    /// `..` is right-associative.
    fn parse_concat(&mut self) -> Result<Expr> {
        let expr = self.parse_add_sub()?;
        if self.accept(&Token::Concat) {
            let right = self.parse_concat()?;
            return Ok(Expr::Bin(Box::new(expr), BinOp::Concat, Box::new(right)));
        }
        Ok(expr)
    }

    fn parse_add_sub(&mut self) -> Result<Expr> {
        let mut expr = self.parse_mul_div()?;
        loop {
            let op = match self.tokens.get(self.pos) {
                Some(Token::Add) => BinOp::Add,
                Some(Token::Sub) => BinOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_mul_div()?;
            expr = Expr::Bin(Box::new(expr), op, Box::new(right));
        }
        Ok(expr)
    }

    fn parse_mul_div(&mut self) -> Result<Expr> {
        let mut expr = self.parse_unary()?;
        loop {
            let op = match self.tokens.get(self.pos) {
                Some(Token::Mul) => BinOp::Mul,
                Some(Token::Div) => BinOp::Div,
                Some(Token::Mod) => BinOp::Mod,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_unary()?;
            expr = Expr::Bin(Box::new(expr), op, Box::new(right));
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        if self.accept(&Token::Not) {
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(operand)));
        }
        if self.accept(&Token::Sub) {
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary(UnaryOp::Neg, Box::new(operand)));
        }
        self.parse_suffixed()
    }

    /// Does the current token open call arguments? Parentheses, a string
    /// literal, or a table constructor, as in Lua.
    fn at_call_args(&self) -> bool {
        matches!(
            self.tokens.get(self.pos),
            Some(Token::LParen) | Some(Token::Str(_)) | Some(Token::LBrace)
        )
    }

    fn parse_suffixed(&mut self) -> Result<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.tokens.get(self.pos) {
                Some(Token::Dot) => {
                    self.pos += 1;
                    let name = self.expect_name("field name expected after '.'")?;
                    expr = Expr::Access(Box::new(expr), Arc::from(name));
                }
                Some(Token::LBracket) => {
                    self.pos += 1;
                    let key = self.parse_expression()?;
                    self.expect(&Token::RBracket, "']' expected")?;
                    expr = Expr::Index(Box::new(expr), Box::new(key));
                }
                Some(Token::LParen) | Some(Token::Str(_)) | Some(Token::LBrace) => {
                    let line = self.line();
                    let args = self.parse_call_args()?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                        line,
                    };
                }
                Some(Token::Colon) => {
                    let line = self.line();
                    self.pos += 1;
                    let method = self.expect_name("method name expected after ':'")?;
                    if self.at_call_args() {
                        let args = self.parse_call_args()?;
                        expr = Expr::MethodCall {
                            object: Box::new(expr),
                            method: Arc::from(method),
                            args,
                            line,
                        };
                    } else if let Expr::Var(object) = expr {
                        // `object:method` without call syntax: a reference
                        // expression. Restricted to bare identifiers, and it
                        // ends the suffix chain.
                        return Ok(Expr::MethodRef {
                            object,
                            method: Arc::from(method),
                            line,
                        });
                    } else {
                        return Err(anyhow!(self.err("function arguments expected")));
                    }
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_call_args(&mut self) -> Result<Vec<Expr>> {
        match self.tokens.get(self.pos) {
            Some(Token::LParen) => {
                self.pos += 1;
                let mut args = Vec::new();
                if !self.check(&Token::RParen) {
                    loop {
                        args.push(self.parse_expression()?);
                        if !self.accept(&Token::Comma) {
                            break;
                        }
                    }
                }
                self.expect(&Token::RParen, "')' expected")?;
                Ok(args)
            }
            Some(Token::Str(s)) => {
                let arg = Expr::Str(Arc::from(s.as_str()));
                self.pos += 1;
                Ok(vec![arg])
            }
            Some(Token::LBrace) => Ok(vec![self.parse_table()?]),
            _ => Err(anyhow!(self.err("function arguments expected"))),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let token = match self.tokens.get(self.pos) {
            Some(t) => t,
            None => return Err(anyhow!(self.err("unexpected end of input"))),
        };
        match token {
            Token::Nil => {
                self.pos += 1;
                Ok(Expr::Nil)
            }
            Token::True => {
                self.pos += 1;
                Ok(Expr::True)
            }
            Token::False => {
                self.pos += 1;
                Ok(Expr::False)
            }
            Token::Int(i) => {
                let value = *i;
                self.pos += 1;
                Ok(Expr::Int(value))
            }
            Token::Float(x) => {
                let value = *x;
                self.pos += 1;
                Ok(Expr::Float(value))
            }
            Token::Str(s) => {
                let value = Arc::from(s.as_str());
                self.pos += 1;
                Ok(Expr::Str(value))
            }
            Token::Id(name) => {
                let name = name.clone();
                self.pos += 1;
                Ok(Expr::Var(name))
            }
            Token::LParen => {
                self.pos += 1;
                let inner = self.parse_expression()?;
                self.expect(&Token::RParen, "')' expected")?;
                Ok(Expr::Paren(Box::new(inner)))
            }
            Token::LBrace => self.parse_table(),
            Token::Function => {
                let line = self.line();
                self.pos += 1;
                let (params, body) = self.parse_function_params_and_body()?;
                Ok(Expr::Function { params, body, line })
            }
            _ => Err(anyhow!(self.err("unexpected symbol"))),
        }
    }

    /// Table constructor: `{ a = 1, [k] = v, positional, ... }` with `,` or
    /// `;` separators.
    fn parse_table(&mut self) -> Result<Expr> {
        self.expect(&Token::LBrace, "'{' expected")?;
        let mut items = Vec::new();
        loop {
            if self.accept(&Token::RBrace) {
                return Ok(Expr::Table(items));
            }
            if self.check(&Token::LBracket) {
                self.pos += 1;
                let key = self.parse_expression()?;
                self.expect(&Token::RBracket, "']' expected")?;
                self.expect(&Token::Assign, "'=' expected")?;
                let value = self.parse_expression()?;
                items.push(TableItem::Keyed(key, value));
            } else if matches!(self.tokens.get(self.pos), Some(Token::Id(_)))
                && self.tokens.get(self.pos + 1) == Some(&Token::Assign)
            {
                let name = self.expect_name("field name expected")?;
                self.pos += 1; // consume '='
                let value = self.parse_expression()?;
                items.push(TableItem::Named(Arc::from(name), value));
            } else {
                items.push(TableItem::Positional(self.parse_expression()?));
            }
            if !self.accept(&Token::Comma) && !self.accept(&Token::Semicolon) {
                self.expect(&Token::RBrace, "'}' expected")?;
                return Ok(Expr::Table(items));
            }
        }
    }

    /// `'(' params ')' block 'end'` — shared by function expressions and
    /// function statements.
    pub(crate) fn parse_function_params_and_body(&mut self) -> Result<(Vec<String>, Arc<Vec<Stmt>>)> {
        self.expect(&Token::LParen, "'(' expected")?;
        let mut params = Vec::new();
        if !self.check(&Token::RParen) {
            loop {
                params.push(self.expect_name("parameter name expected")?);
                if !self.accept(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(&Token::RParen, "')' expected")?;
        let (body, next) = parse_function_block(self.tokens, self.positions, self.pos)?;
        self.pos = next;
        Ok((params, Arc::new(body)))
    }
}
