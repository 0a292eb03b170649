mod expr_impl;

#[cfg(test)]
mod expr_test;

pub use expr_impl::{Expr, TableItem};
