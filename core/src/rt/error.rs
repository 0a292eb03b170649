use std::fmt;
use std::sync::Arc;

use crate::rt::trace::{TracebackFrame, render};

/// Runtime failure taxonomy.
///
/// Parse-time failures use [`crate::token::ParseError`] instead; none of
/// these kinds is ever raised by the parsers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The indexed operand does not support indexing. Raised eagerly when a
    /// reference expression (or any index operation) is evaluated.
    Index,
    /// A reference expression resolved its method to nil. Raised eagerly at
    /// evaluation time, since nil can never become callable.
    NilMethod,
    /// An invocation target is not callable. Raised only at call time.
    NotCallable,
    /// Everything else (arithmetic/concat/compare errors, `error(...)`,
    /// stack overflow, bad builtin arguments).
    Runtime,
}

/// A script-level error: positioned message plus the traceback captured at
/// the raise point.
#[derive(Debug, Clone)]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
    pub chunk: Arc<str>,
    pub traceback: Vec<TracebackFrame>,
}

impl RuntimeError {
    pub fn traceback_text(&self) -> String {
        render(&self.chunk, &self.traceback)
    }

    /// Message and traceback, the way the CLI reports an uncaught error.
    pub fn full_message(&self) -> String {
        format!("{}\n{}", self.message, self.traceback_text())
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for RuntimeError {}
