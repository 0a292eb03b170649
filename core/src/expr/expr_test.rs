use crate::engine::Engine;
use crate::val::Val;

fn eval(src: &str) -> Val {
    Engine::new()
        .exec(&format!("return {}", src))
        .unwrap_or_else(|e| panic!("eval of `{}` failed: {}", src, e))
}

fn eval_err(src: &str) -> String {
    Engine::new()
        .exec(&format!("return {}", src))
        .unwrap_err()
        .to_string()
}

#[test]
fn literals() {
    assert_eq!(eval("nil"), Val::Nil);
    assert_eq!(eval("true"), Val::Bool(true));
    assert_eq!(eval("42"), Val::Int(42));
    assert_eq!(eval("1.5"), Val::Float(1.5));
    assert_eq!(eval("\"hi\""), Val::Str("hi".into()));
}

#[test]
fn arithmetic_and_precedence() {
    assert_eq!(eval("1 + 2 * 3"), Val::Int(7));
    assert_eq!(eval("(1 + 2) * 3"), Val::Int(9));
    assert_eq!(eval("7 % 3 + 1"), Val::Int(2));
    assert_eq!(eval("4 / 2"), Val::Float(2.0));
    assert_eq!(eval("-2 + 5"), Val::Int(3));
    assert_eq!(eval("2 .. 3"), Val::Str("23".into()));
    assert_eq!(eval("\"v=\" .. 1 .. \".\" .. 5"), Val::Str("v=1.5".into()));
}

#[test]
fn logic_yields_operands() {
    assert_eq!(eval("1 and 2"), Val::Int(2));
    assert_eq!(eval("nil and 2"), Val::Nil);
    assert_eq!(eval("false or \"x\""), Val::Str("x".into()));
    assert_eq!(eval("1 or error(\"not evaluated\")"), Val::Int(1));
    assert_eq!(eval("not nil"), Val::Bool(true));
    assert_eq!(eval("not 0"), Val::Bool(false));
}

#[test]
fn comparisons() {
    assert_eq!(eval("1 < 2"), Val::Bool(true));
    assert_eq!(eval("1 == 1.0"), Val::Bool(true));
    assert_eq!(eval("\"a\" < \"b\""), Val::Bool(true));
    assert_eq!(eval("1 ~= \"1\""), Val::Bool(true));
}

#[test]
fn table_access() {
    assert_eq!(eval("{ a = 7 }.a"), Val::Int(7));
    assert_eq!(eval("{ 10, 20, 30 }[2]"), Val::Int(20));
    assert_eq!(eval("{ [\"k\"] = 1 }.k"), Val::Int(1));
    assert_eq!(eval("{ a = 1 }.missing"), Val::Nil);
    // Unbound globals read as nil.
    assert_eq!(eval("no_such_global"), Val::Nil);
}

#[test]
fn indexing_errors() {
    assert!(eval_err("nil.x").contains("attempt to index a nil value"));
    assert!(eval_err("(5)[1]").contains("attempt to index a number value"));
}

#[test]
fn call_errors_name_the_callee() {
    let err = eval_err("missing(1)");
    assert!(
        err.contains("attempt to call a nil value (global 'missing')"),
        "got: {}",
        err
    );
    let err = eval_err("{ f = 5 }.f()");
    assert!(err.contains("attempt to call a number value (field 'f')"), "got: {}", err);
}

#[test]
fn function_literals_and_calls() {
    assert_eq!(eval("(function(a, b) return a + b end)(3, 4)"), Val::Int(7));
    // Missing arguments become nil; extra arguments are dropped.
    assert_eq!(eval("(function(a, b) return b end)(1)"), Val::Nil);
    assert_eq!(eval("(function(a) return a end)(1, 2, 3)"), Val::Int(1));
}

#[test]
fn method_calls() {
    assert_eq!(eval("{ v = 5, get = function(self) return self.v end }:get()"), Val::Int(5));
}

#[test]
fn table_constructor_evaluation_order() {
    let mut engine = Engine::new();
    let out = engine
        .exec(
            "seen = \"\"\n\
             local function mark(s) seen = seen .. s return s end\n\
             local t = { mark(\"a\"), x = mark(\"b\"), [mark(\"c\")] = mark(\"d\") }\n\
             return seen",
        )
        .expect("exec");
    assert_eq!(out, Val::Str("abcd".into()));
}
