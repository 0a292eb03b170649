use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::val::Val;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Concat,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl BinOp {
    pub fn is_arith(&self) -> bool {
        matches!(self, BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod)
    }

    pub fn is_cmp(&self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge
        )
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Concat => "..",
            BinOp::Eq => "==",
            BinOp::Ne => "~=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
        }
    }

    /// Value-level evaluation. Messages carry no source position; the
    /// expression evaluator attaches one.
    pub fn eval_vals(&self, l: &Val, r: &Val) -> Result<Val> {
        match self {
            BinOp::Add => l + r,
            BinOp::Sub => l - r,
            BinOp::Mul => l * r,
            BinOp::Div => l / r,
            BinOp::Mod => l % r,
            BinOp::Concat => Val::concat(l, r),
            _ => Ok(Val::Bool(self.cmp(l, r)?)),
        }
    }

    pub fn cmp(&self, l: &Val, r: &Val) -> Result<bool> {
        match self {
            BinOp::Eq => Ok(l == r),
            BinOp::Ne => Ok(l != r),
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                // Unordered operands (a NaN is involved) compare false, never error.
                let ordering = match order(l, r)? {
                    Some(ordering) => ordering,
                    None => return Ok(false),
                };
                Ok(match self {
                    BinOp::Lt => ordering == std::cmp::Ordering::Less,
                    BinOp::Le => ordering != std::cmp::Ordering::Greater,
                    BinOp::Gt => ordering == std::cmp::Ordering::Greater,
                    BinOp::Ge => ordering != std::cmp::Ordering::Less,
                    _ => unreachable!(),
                })
            }
            _ => Err(anyhow!("'{}' is not a comparison operator", self.symbol())),
        }
    }
}

fn order(l: &Val, r: &Val) -> Result<Option<std::cmp::Ordering>> {
    match (l, r) {
        (Val::Int(a), Val::Int(b)) => Ok(Some(a.cmp(b))),
        (Val::Str(a), Val::Str(b)) => Ok(Some(a.cmp(b))),
        _ => match (l.as_number(), r.as_number()) {
            (Some(a), Some(b)) => Ok(a.partial_cmp(&b)),
            _ => {
                if l.type_name() == r.type_name() {
                    Err(anyhow!("attempt to compare two {} values", l.type_name()))
                } else {
                    Err(anyhow!(
                        "attempt to compare {} with {}",
                        l.type_name(),
                        r.type_name()
                    ))
                }
            }
        },
    }
}

impl UnaryOp {
    pub fn eval_val(&self, v: &Val) -> Result<Val> {
        match self {
            UnaryOp::Not => Ok(Val::Bool(!v.truthy())),
            UnaryOp::Neg => match v {
                Val::Int(i) => Ok(Val::Int(i.wrapping_neg())),
                Val::Float(x) => Ok(Val::Float(-x)),
                other => Err(anyhow!(
                    "attempt to perform arithmetic on a {} value",
                    other.type_name()
                )),
            },
        }
    }
}
