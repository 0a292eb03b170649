use std::ops::{Add, Div, Mul, Rem, Sub};
use std::sync::Arc;

use anyhow::{Result, anyhow};

use super::Val;

fn arith_type_err(l: &Val, r: &Val) -> anyhow::Error {
    let bad = if l.as_number().is_none() { l } else { r };
    anyhow!("attempt to perform arithmetic on a {} value", bad.type_name())
}

impl Add for &Val {
    type Output = Result<Val>;

    #[inline]
    fn add(self, other: Self) -> Self::Output {
        match (self, other) {
            (Val::Int(a), Val::Int(b)) => Ok(Val::Int(a.wrapping_add(*b))),
            (Val::Float(a), Val::Float(b)) => Ok(Val::Float(a + b)),
            (Val::Int(a), Val::Float(b)) => Ok(Val::Float(*a as f64 + b)),
            (Val::Float(a), Val::Int(b)) => Ok(Val::Float(a + *b as f64)),
            _ => Err(arith_type_err(self, other)),
        }
    }
}

impl Sub for &Val {
    type Output = Result<Val>;

    #[inline]
    fn sub(self, other: Self) -> Self::Output {
        match (self, other) {
            (Val::Int(a), Val::Int(b)) => Ok(Val::Int(a.wrapping_sub(*b))),
            (Val::Float(a), Val::Float(b)) => Ok(Val::Float(a - b)),
            (Val::Int(a), Val::Float(b)) => Ok(Val::Float(*a as f64 - b)),
            (Val::Float(a), Val::Int(b)) => Ok(Val::Float(a - *b as f64)),
            _ => Err(arith_type_err(self, other)),
        }
    }
}

impl Mul for &Val {
    type Output = Result<Val>;

    #[inline]
    fn mul(self, other: Self) -> Self::Output {
        match (self, other) {
            (Val::Int(a), Val::Int(b)) => Ok(Val::Int(a.wrapping_mul(*b))),
            (Val::Float(a), Val::Float(b)) => Ok(Val::Float(a * b)),
            (Val::Int(a), Val::Float(b)) => Ok(Val::Float(*a as f64 * b)),
            (Val::Float(a), Val::Int(b)) => Ok(Val::Float(a * *b as f64)),
            _ => Err(arith_type_err(self, other)),
        }
    }
}

impl Div for &Val {
    type Output = Result<Val>;

    /// Division always produces a float, as in Lua.
    #[inline]
    fn div(self, other: Self) -> Self::Output {
        match (self.as_number(), other.as_number()) {
            (Some(a), Some(b)) => Ok(Val::Float(a / b)),
            _ => Err(arith_type_err(self, other)),
        }
    }
}

impl Rem for &Val {
    type Output = Result<Val>;

    /// Floor modulo: the result takes the sign of the divisor.
    #[inline]
    fn rem(self, other: Self) -> Self::Output {
        match (self, other) {
            (Val::Int(_), Val::Int(0)) => Err(anyhow!("attempt to perform 'n%%0'")),
            (Val::Int(a), Val::Int(b)) => Ok(Val::Int(((a % b) + b) % b)),
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => Ok(Val::Float(a - (a / b).floor() * b)),
                _ => Err(arith_type_err(self, other)),
            },
        }
    }
}

impl Val {
    pub fn concat(l: &Val, r: &Val) -> Result<Val> {
        let mut out = String::new();
        push_concat(&mut out, l)?;
        push_concat(&mut out, r)?;
        Ok(Val::Str(Arc::from(out)))
    }
}

fn push_concat(out: &mut String, v: &Val) -> Result<()> {
    match v {
        Val::Str(s) => out.push_str(s),
        Val::Int(i) => {
            let mut buf = itoa::Buffer::new();
            out.push_str(buf.format(*i));
        }
        Val::Float(x) => {
            let mut buf = ryu::Buffer::new();
            out.push_str(buf.format(*x));
        }
        other => {
            return Err(anyhow!("attempt to concatenate a {} value", other.type_name()));
        }
    }
    Ok(())
}

/// Equality. Numbers compare across the int/float split; everything with
/// identity (tables, functions, bound closures) compares by identity. A
/// bound closure never equals a plain function, even when the bound method
/// currently resolves to that same function.
impl PartialEq for Val {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Val::Nil, Val::Nil) => true,
            (Val::Bool(a), Val::Bool(b)) => a == b,
            (Val::Int(a), Val::Int(b)) => a == b,
            (Val::Float(a), Val::Float(b)) => a == b,
            (Val::Int(a), Val::Float(b)) | (Val::Float(b), Val::Int(a)) => *a as f64 == *b,
            (Val::Str(a), Val::Str(b)) => a == b,
            (Val::Table(a), Val::Table(b)) => Arc::ptr_eq(a, b),
            (Val::Function(a), Val::Function(b)) => Arc::ptr_eq(a, b),
            (Val::Native(a), Val::Native(b)) => *a as usize == *b as usize,
            (Val::Bound(a), Val::Bound(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}
