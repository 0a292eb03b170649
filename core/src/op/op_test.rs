use crate::op::{BinOp, UnaryOp};
use crate::val::Val;

#[test]
fn arithmetic() {
    let eval = |op: BinOp, l: Val, r: Val| op.eval_vals(&l, &r).expect("eval");
    assert_eq!(eval(BinOp::Add, Val::Int(2), Val::Int(3)), Val::Int(5));
    assert_eq!(eval(BinOp::Sub, Val::Int(2), Val::Float(0.5)), Val::Float(1.5));
    assert_eq!(eval(BinOp::Mul, Val::Int(4), Val::Int(5)), Val::Int(20));
    // Division always yields a float.
    assert_eq!(eval(BinOp::Div, Val::Int(3), Val::Int(2)), Val::Float(1.5));
    assert_eq!(eval(BinOp::Mod, Val::Int(7), Val::Int(3)), Val::Int(1));
    // Floor modulo, like Lua.
    assert_eq!(eval(BinOp::Mod, Val::Int(-5), Val::Int(3)), Val::Int(1));
}

#[test]
fn arithmetic_type_errors() {
    let err = BinOp::Add.eval_vals(&Val::Nil, &Val::Int(1)).unwrap_err();
    assert!(err.to_string().contains("attempt to perform arithmetic on a nil value"));
    let err = BinOp::Mod.eval_vals(&Val::Int(1), &Val::Int(0)).unwrap_err();
    assert!(err.to_string().contains("attempt to perform 'n%%0'"));
}

#[test]
fn concat() {
    let eval = |l: Val, r: Val| BinOp::Concat.eval_vals(&l, &r).expect("eval");
    assert_eq!(eval(Val::Str("a".into()), Val::Str("b".into())), Val::Str("ab".into()));
    assert_eq!(eval(Val::Str("n=".into()), Val::Int(4)), Val::Str("n=4".into()));
    assert_eq!(eval(Val::Int(1), Val::Str("x".into())), Val::Str("1x".into()));
    let err = BinOp::Concat.eval_vals(&Val::Bool(true), &Val::Str("x".into())).unwrap_err();
    assert!(err.to_string().contains("attempt to concatenate a boolean value"));
}

#[test]
fn comparisons() {
    let cmp = |op: BinOp, l: Val, r: Val| op.cmp(&l, &r).expect("cmp");
    assert!(cmp(BinOp::Lt, Val::Int(1), Val::Int(2)));
    assert!(cmp(BinOp::Le, Val::Int(2), Val::Float(2.0)));
    assert!(cmp(BinOp::Gt, Val::Str("b".into()), Val::Str("a".into())));
    assert!(cmp(BinOp::Eq, Val::Int(1), Val::Float(1.0)));
    assert!(cmp(BinOp::Ne, Val::Int(1), Val::Str("1".into())));

    // NaN is unordered: every ordering comparison is false.
    let nan = Val::Float(f64::NAN);
    assert!(!cmp(BinOp::Lt, nan.clone(), Val::Int(1)));
    assert!(!cmp(BinOp::Ge, nan.clone(), Val::Int(1)));
    assert!(!cmp(BinOp::Eq, nan.clone(), nan));
}

#[test]
fn comparison_type_errors() {
    let err = BinOp::Lt.cmp(&Val::Int(1), &Val::Nil).unwrap_err();
    assert!(err.to_string().contains("attempt to compare number with nil"));
    let err = BinOp::Lt.cmp(&Val::Bool(true), &Val::Bool(false)).unwrap_err();
    assert!(err.to_string().contains("attempt to compare two boolean values"));
}

#[test]
fn unary() {
    assert_eq!(UnaryOp::Neg.eval_val(&Val::Int(3)).unwrap(), Val::Int(-3));
    assert_eq!(UnaryOp::Neg.eval_val(&Val::Float(1.5)).unwrap(), Val::Float(-1.5));
    assert_eq!(UnaryOp::Not.eval_val(&Val::Nil).unwrap(), Val::Bool(true));
    assert_eq!(UnaryOp::Not.eval_val(&Val::Int(0)).unwrap(), Val::Bool(false));
    assert!(UnaryOp::Neg.eval_val(&Val::Str("x".into())).is_err());
}
