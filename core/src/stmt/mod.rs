mod stmt_impl;
mod stmt_parser;


pub use stmt_impl::{AssignTarget, Flow, Program, Stmt, exec_block};
pub use stmt_parser::StmtParser;

pub(crate) use stmt_parser::parse_function_block;
